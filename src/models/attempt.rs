// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::question::Question;

/// One student's answer to the question at the same index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub selected_option: String,
}

/// Payload of `POST /quizzes/:id/start`.
///
/// A resumed attempt carries the responses saved so far and the original `startedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizData {
    #[serde(default, alias = "_id")]
    pub attempt_id: Option<String>,
    pub questions: Vec<Question>,
    pub started_at: DateTime<Utc>,
    /// Duration in minutes.
    pub timer: u32,
    #[serde(default)]
    pub responses: Vec<Response>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    pub responses: Vec<Response>,
}

/// Result of a submitted attempt. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub quiz_id: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub responses: Vec<Response>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub wrong_answers: u32,
    #[serde(default)]
    pub rank: Option<u32>,
    /// Seconds.
    #[serde(default)]
    pub time_taken: Option<u64>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Row of a contest leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub student_name: String,
    pub score: i64,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub time_taken: Option<u64>,
}
