// src/models/contest.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::Question;

/// Server-driven lifecycle of a contest. The client only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContestStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

/// An admin-authored set of timed multiple-choice questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contest {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Duration in minutes.
    pub timer: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub status: ContestStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Contest {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.timer))
    }

    /// When an ongoing contest closes: the reported end, else start plus timer.
    pub fn closes_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
            .or_else(|| self.started_at.map(|start| start + self.duration()))
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContestRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(range(min = 1, max = 600, message = "Timer must be between 1 and 600 minutes."))]
    pub timer: u32,
    #[validate(length(min = 1, message = "Add at least one question."), nested)]
    pub questions: Vec<Question>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContestStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_at_prefers_reported_end() {
        let start = Utc::now();
        let mut contest = Contest {
            id: "q1".to_string(),
            title: "Weekly".to_string(),
            description: String::new(),
            timer: 10,
            questions: vec![],
            status: ContestStatus::Ongoing,
            started_at: Some(start),
            ended_at: None,
        };
        assert_eq!(contest.closes_at(), Some(start + Duration::minutes(10)));

        let end = start + Duration::minutes(3);
        contest.ended_at = Some(end);
        assert_eq!(contest.closes_at(), Some(end));
    }

    #[test]
    fn status_uses_lowercase_wire_names() {
        let status: ContestStatus = serde_json::from_str("\"ongoing\"").unwrap();
        assert_eq!(status, ContestStatus::Ongoing);
    }
}
