// src/models/badge.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A point-bearing achievement assignable to a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Badge {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct BadgeRequest {
    #[validate(length(min = 1, max = 100, message = "Badge name is required."))]
    pub name: String,
    #[validate(length(max = 200))]
    pub icon: Option<String>,
    #[validate(range(min = 0, max = 10000, message = "Points must be between 0 and 10000."))]
    pub points: i64,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

/// Body for assigning a badge to, or removing it from, a student.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeAssignment {
    pub student_id: String,
}
