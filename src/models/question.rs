// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::config::OPTIONS_PER_QUESTION;

/// A multiple-choice contest question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_correct_answer))]
pub struct Question {
    #[validate(length(min = 1, max = 2000, message = "Question text is required."))]
    pub question_text: String,

    /// Exactly four options.
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,

    /// Present in admin-authored payloads; a hardened API omits it for students.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,

    #[serde(default = "default_points")]
    pub points: i64,
}

fn default_points() -> i64 {
    1
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() != OPTIONS_PER_QUESTION {
        return Err(ValidationError::new("options_must_have_four_entries"));
    }
    if options.iter().any(|opt| opt.trim().is_empty()) {
        return Err(ValidationError::new("option_cannot_be_empty"));
    }
    Ok(())
}

/// The correct answer must be one of the options.
fn validate_correct_answer(question: &Question) -> Result<(), ValidationError> {
    match &question.correct_answer {
        Some(answer) if question.options.iter().any(|opt| opt == answer) => Ok(()),
        Some(_) => Err(ValidationError::new("correct_answer_not_in_options")),
        None => Err(ValidationError::new("correct_answer_missing")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], answer: Option<&str>) -> Question {
        Question {
            question_text: "What does `cargo check` do?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: answer.map(str::to_string),
            points: 1,
        }
    }

    #[test]
    fn accepts_well_formed_question() {
        let q = question(&["A", "B", "C", "D"], Some("C"));
        assert!(q.validate().is_ok());
    }

    #[test]
    fn rejects_wrong_option_count() {
        let q = question(&["A", "B", "C"], Some("A"));
        assert!(q.validate().is_err());
    }

    #[test]
    fn rejects_answer_outside_options() {
        let q = question(&["A", "B", "C", "D"], Some("E"));
        assert!(q.validate().is_err());

        let q = question(&["A", "B", "C", "D"], None);
        assert!(q.validate().is_err());
    }

    #[test]
    fn rejects_blank_option() {
        let q = question(&["A", " ", "C", "D"], Some("A"));
        assert!(q.validate().is_err());
    }
}
