// src/api/contests.rs

use serde_json::json;

use crate::{
    cache,
    error::AppError,
    models::{
        attempt::{Attempt, LeaderboardEntry, QuizData, Response, SubmitRequest},
        contest::{Contest, ContestRequest, ContestStatus},
    },
    state::AppState,
};

pub async fn list_contests(state: &AppState) -> Result<Vec<Contest>, AppError> {
    state
        .cache
        .get_or_fetch("quizzes", || state.api.get("/quizzes"))
        .await
}

/// Bypasses freshness; used after admin mutations and by the contest view poller.
pub async fn refetch_contests(state: &AppState) -> Result<Vec<Contest>, AppError> {
    state
        .cache
        .refetch("quizzes", || state.api.get("/quizzes"))
        .await
}

pub async fn get_contest(state: &AppState, id: &str) -> Result<Contest, AppError> {
    let path = format!("/quizzes/{id}");
    state
        .cache
        .get_or_fetch(&cache::key("quizzes", id), || state.api.get(&path))
        .await
}

pub async fn refetch_contest(state: &AppState, id: &str) -> Result<Contest, AppError> {
    let path = format!("/quizzes/{id}");
    state
        .cache
        .refetch(&cache::key("quizzes", id), || state.api.get(&path))
        .await
}

/// Starts, or resumes, the signed-in student's attempt.
///
/// The API keeps one in-progress attempt per (student, contest); calling this for an
/// attempt that exists returns it with the responses saved so far.
pub async fn start_attempt(state: &AppState, id: &str) -> Result<QuizData, AppError> {
    tracing::info!("Starting attempt for contest {}", id);
    state
        .api
        .post(&format!("/quizzes/{id}/start"), &json!({}))
        .await
}

/// Posts the final answers. Answers are sent once; the attempt is immutable afterwards.
pub async fn submit_attempt(
    state: &AppState,
    id: &str,
    responses: Vec<Response>,
) -> Result<Attempt, AppError> {
    let body = SubmitRequest { responses };
    state
        .mutate(
            &["quizzes", "leaderboard"],
            "Contest submitted!",
            state.api.post(&format!("/quizzes/{id}/submit"), &body),
        )
        .await
}

pub async fn leaderboard(state: &AppState, id: &str) -> Result<Vec<LeaderboardEntry>, AppError> {
    let path = format!("/quizzes/{id}/leaderboard");
    state
        .cache
        .get_or_fetch(&cache::key("leaderboard", id), || state.api.get(&path))
        .await
}

pub async fn create_contest(state: &AppState, payload: &ContestRequest) -> Result<Contest, AppError> {
    state.check(payload)?;
    state
        .mutate(&["quizzes"], "Contest created.", state.api.post("/quizzes", payload))
        .await
}

pub async fn update_contest(
    state: &AppState,
    id: &str,
    payload: &ContestRequest,
) -> Result<Contest, AppError> {
    state.check(payload)?;
    state
        .mutate(
            &["quizzes"],
            "Contest updated.",
            state.api.put(&format!("/quizzes/{id}"), payload),
        )
        .await
}

/// Moves a contest to another lifecycle state (start now, end early).
pub async fn set_contest_status(
    state: &AppState,
    id: &str,
    status: ContestStatus,
) -> Result<(), AppError> {
    state
        .mutate(
            &["quizzes"],
            "Contest status updated.",
            state
                .api
                .put_unit(&format!("/quizzes/{id}/status"), &json!({ "status": status })),
        )
        .await
}

pub async fn delete_contest(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["quizzes", "leaderboard"],
            "Contest deleted.",
            state.api.delete(&format!("/quizzes/{id}")),
        )
        .await
}
