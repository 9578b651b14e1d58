// src/admin/generator.rs

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use url::Url;
use validator::Validate;

use crate::{
    config::{GenAiConfig, OPTIONS_PER_QUESTION},
    error::AppError,
    models::{contest::ContestRequest, question::Question},
};

/// Matches a fenced block such as ```json ... ```.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("static regex"));

const MAX_QUESTIONS: usize = 30;

/// Client for the generative-AI endpoint that drafts contest questions.
#[derive(Clone)]
pub struct QuestionGenerator {
    http: reqwest::Client,
    config: GenAiConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl QuestionGenerator {
    pub fn new(config: GenAiConfig, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Asks the model for `count` questions on `topic` and keeps them only if every
    /// one is structurally valid.
    pub async fn generate(&self, topic: &str, count: usize) -> Result<Vec<Question>, AppError> {
        if topic.trim().is_empty() {
            return Err(AppError::Validation("Enter a topic to generate questions.".to_string()));
        }
        if count == 0 || count > MAX_QUESTIONS {
            return Err(AppError::Validation(format!(
                "Question count must be between 1 and {MAX_QUESTIONS}."
            )));
        }

        let mut url = Url::parse(&format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        ))
        .map_err(|e| AppError::Config(format!("Invalid GENAI_ENDPOINT: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);

        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(topic, count) }] }]
        });

        tracing::info!("Generating {} questions about '{}'", count, topic);
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::from_status(status, &text));
        }

        let payload: GenerateResponse = response.json().await?;
        let text: String = payload
            .candidates
            .into_iter()
            .next()
            .map(|c| c.content.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let questions = parse_generated(&text)?;
        tracing::info!("Accepted {} generated questions", questions.len());
        Ok(questions)
    }
}

pub fn build_prompt(topic: &str, count: usize) -> String {
    format!(
        "Generate {count} multiple-choice questions about \"{topic}\" for a student coding contest. \
         Respond with only a JSON array. Each element must be an object with the fields \
         \"questionText\" (string), \"options\" (array of exactly {OPTIONS_PER_QUESTION} distinct strings), \
         \"correctAnswer\" (string, identical to one of the options) and \"points\" (integer)."
    )
}

/// Parses model output into questions. Code fences are tolerated.
///
/// The whole set is rejected when any question has the wrong number of options or a
/// correct answer outside its options.
pub fn parse_generated(text: &str) -> Result<Vec<Question>, AppError> {
    let body = FENCE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text.trim(), |m| m.as_str());

    let questions: Vec<Question> = serde_json::from_str(body).map_err(|e| {
        AppError::Validation(format!("The generated questions are not valid JSON: {e}"))
    })?;

    if questions.is_empty() {
        return Err(AppError::Validation("No questions were generated.".to_string()));
    }

    for (index, question) in questions.iter().enumerate() {
        question.validate().map_err(|e| {
            AppError::Validation(format!("Generated question {} is malformed: {e}", index + 1))
        })?;
    }
    Ok(questions)
}

/// Appends accepted questions to the contest form.
pub fn accept_into_form(form: &mut ContestRequest, questions: Vec<Question>) {
    form.questions.extend(questions);
}
