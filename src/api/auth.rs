// src/api/auth.rs

use crate::{
    error::AppError,
    models::user::{
        AuthResponse, EmailRequest, LoginRequest, OtpVerifyRequest, RegisterRequest,
        ResetPasswordRequest, User, UsernameLoginRequest,
    },
    state::AppState,
};

/// Registers a new student.
///
/// Validates locally first (password confirmation, email shape). The API then mails a
/// verification code to be confirmed with [`verify_otp`].
pub async fn register(state: &AppState, payload: &RegisterRequest) -> Result<(), AppError> {
    state.check(payload)?;
    state
        .mutate(
            &[],
            "Registration successful. Check your email for the verification code.",
            state.api.post_unit("/auth/register", payload),
        )
        .await
}

/// Sends (or re-sends) the email verification code.
pub async fn send_otp(state: &AppState, email: &str) -> Result<(), AppError> {
    let payload = EmailRequest {
        email: email.to_string(),
    };
    state.check(&payload)?;
    state
        .mutate(&[], "Verification code sent.", state.api.post_unit("/auth/send-otp", &payload))
        .await
}

/// Confirms an email address with the code from [`send_otp`].
pub async fn verify_otp(state: &AppState, email: &str, otp: &str) -> Result<(), AppError> {
    let payload = OtpVerifyRequest {
        email: email.to_string(),
        otp: otp.to_string(),
    };
    state.check(&payload)?;
    state
        .mutate(
            &[],
            "Email verified. You can now log in.",
            state.api.post_unit("/auth/verify-otp", &payload),
        )
        .await
}

/// Password login by email.
///
/// A 403 means the email is not verified yet; the form stays usable for a retry.
pub async fn login(state: &AppState, payload: &LoginRequest) -> Result<User, AppError> {
    state.check(payload)?;
    let response = state
        .mutate(&[], "Welcome back!", state.api.post("/auth/login", payload))
        .await?;
    establish(state, response).await
}

/// Password login by username.
pub async fn login_with_username(
    state: &AppState,
    payload: &UsernameLoginRequest,
) -> Result<User, AppError> {
    state.check(payload)?;
    let response = state
        .mutate(&[], "Welcome back!", state.api.post("/auth/login-username", payload))
        .await?;
    establish(state, response).await
}

/// First step of passwordless login: the API checks the account exists and is verified.
pub async fn begin_email_login(state: &AppState, email: &str) -> Result<(), AppError> {
    let payload = EmailRequest {
        email: email.to_string(),
    };
    state.check(&payload)?;
    state
        .mutate(&[], "Account found.", state.api.post_unit("/auth/login-email", &payload))
        .await
}

/// Second step: mails a one-time login code.
pub async fn send_login_otp(state: &AppState, email: &str) -> Result<(), AppError> {
    let payload = EmailRequest {
        email: email.to_string(),
    };
    state.check(&payload)?;
    state
        .mutate(&[], "Login code sent.", state.api.post_unit("/auth/login-send-otp", &payload))
        .await
}

/// Final step: exchanges the login code for a session.
pub async fn verify_login_otp(state: &AppState, email: &str, otp: &str) -> Result<User, AppError> {
    let payload = OtpVerifyRequest {
        email: email.to_string(),
        otp: otp.to_string(),
    };
    state.check(&payload)?;
    let response = state
        .mutate(&[], "Welcome back!", state.api.post("/auth/login-verify", &payload))
        .await?;
    establish(state, response).await
}

pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), AppError> {
    let payload = EmailRequest {
        email: email.to_string(),
    };
    state.check(&payload)?;
    state
        .mutate(
            &[],
            "Password reset code sent.",
            state.api.post_unit("/auth/forgot-password", &payload),
        )
        .await
}

pub async fn reset_password(
    state: &AppState,
    payload: &ResetPasswordRequest,
) -> Result<(), AppError> {
    state.check(payload)?;
    state
        .mutate(
            &[],
            "Password updated. Please log in.",
            state.api.post_unit("/auth/reset-password", payload),
        )
        .await
}

/// Re-reads the signed-in user (badges, role) and stores it in the session.
pub async fn refresh_user(state: &AppState) -> Result<User, AppError> {
    if !state.session.is_authenticated() {
        return Err(AppError::AuthError("Not signed in".to_string()));
    }
    let user: User = state.api.get("/auth/me").await?;
    state.session.update_user(user.clone()).await?;
    Ok(user)
}

/// Ends the session and forgets every cached read.
pub async fn logout(state: &AppState) -> Result<(), AppError> {
    state.session.sign_out().await?;
    state.cache.clear().await;
    Ok(())
}

async fn establish(state: &AppState, response: AuthResponse) -> Result<User, AppError> {
    let user = response.user;
    state.session.sign_in(response.token, user.clone()).await?;
    state.cache.clear().await;
    Ok(user)
}
