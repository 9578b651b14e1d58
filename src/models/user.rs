// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::config::OTP_LENGTH;
use crate::models::badge::Badge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

/// A signed-in user or a student listed by the admin console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,

    pub name: String,

    pub email: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// Badges held by the user. Points are summed client-side for ranking.
    #[serde(default)]
    pub badges: Vec<Badge>,

    #[serde(default)]
    pub avatar_url: Option<String>,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn badge_points(&self) -> i64 {
        self.badges.iter().map(|b| b.points).sum()
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Password login by email.
#[derive(Debug, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password is required."))]
    pub password: String,
}

/// Password login by username.
#[derive(Debug, Serialize, Validate)]
pub struct UsernameLoginRequest {
    #[validate(length(min = 3, max = 50, message = "Username length must be between 3 and 50 characters."))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    /// Checked locally, never sent.
    #[serde(skip)]
    #[validate(must_match(other = "password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

/// Body for endpoints that only need an email (send OTP, forgot password, login OTP).
#[derive(Debug, Serialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

#[derive(Debug, Serialize, Validate)]
pub struct OtpVerifyRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(custom(function = validate_otp))]
    pub otp: String,
}

#[derive(Debug, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(custom(function = validate_otp))]
    pub otp: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub new_password: String,
    #[serde(skip)]
    #[validate(must_match(other = "new_password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

/// Fields an admin may change on a student record.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    static OTP_RE: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"^\d+$").expect("static regex"));

    if otp.len() != OTP_LENGTH || !OTP_RE.is_match(otp) {
        let mut err = ValidationError::new("invalid_otp");
        err.message = Some(format!("The code must be {OTP_LENGTH} digits.").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            email: "ada@club.dev".to_string(),
            username: "ada".to_string(),
            password: password.to_string(),
            confirm_password: confirm.to_string(),
        }
    }

    #[test]
    fn register_rejects_password_mismatch() {
        let errors = register("secret123", "secret124").validate().unwrap_err();
        assert!(errors.field_errors().contains_key("confirm_password"));
    }

    #[test]
    fn register_accepts_matching_passwords() {
        assert!(register("secret123", "secret123").validate().is_ok());
    }

    #[test]
    fn confirm_password_is_not_serialized() {
        let body = serde_json::to_value(register("secret123", "secret123")).unwrap();
        assert!(body.get("confirmPassword").is_none());
        assert_eq!(body["password"], "secret123");
    }

    #[test]
    fn otp_must_be_six_digits() {
        assert!(validate_otp("123456").is_ok());
        assert!(validate_otp("12345").is_err());
        assert!(validate_otp("12a456").is_err());
    }

    #[test]
    fn user_accepts_mongo_style_id_and_sums_badges() {
        let user: User = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Ada",
            "email": "ada@club.dev",
            "role": "admin",
            "badges": [
                {"_id": "b1", "name": "First Blood", "points": 10},
                {"_id": "b2", "name": "Streak", "points": 25}
            ]
        }))
        .unwrap();

        assert_eq!(user.id, "u1");
        assert!(user.is_admin());
        assert_eq!(user.badge_points(), 35);
    }
}
