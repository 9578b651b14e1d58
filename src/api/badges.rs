// src/api/badges.rs

use crate::{
    error::AppError,
    models::badge::{Badge, BadgeAssignment, BadgeRequest},
    state::AppState,
};

pub async fn list_badges(state: &AppState) -> Result<Vec<Badge>, AppError> {
    state
        .cache
        .get_or_fetch("badges", || state.api.get("/badges"))
        .await
}

pub async fn refetch_badges(state: &AppState) -> Result<Vec<Badge>, AppError> {
    state
        .cache
        .refetch("badges", || state.api.get("/badges"))
        .await
}

pub async fn create_badge(state: &AppState, payload: &BadgeRequest) -> Result<Badge, AppError> {
    state.check(payload)?;
    state
        .mutate(&["badges"], "Badge created.", state.api.post("/badges", payload))
        .await
}

pub async fn update_badge(
    state: &AppState,
    id: &str,
    payload: &BadgeRequest,
) -> Result<Badge, AppError> {
    state.check(payload)?;
    state
        .mutate(
            &["badges"],
            "Badge updated.",
            state.api.put(&format!("/badges/{id}"), payload),
        )
        .await
}

/// Deleting a badge also strips it from every student holding it.
pub async fn delete_badge(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["badges", "students"],
            "Badge deleted.",
            state.api.delete(&format!("/badges/{id}")),
        )
        .await
}

pub async fn assign_badge(state: &AppState, badge_id: &str, student_id: &str) -> Result<(), AppError> {
    let body = BadgeAssignment {
        student_id: student_id.to_string(),
    };
    state
        .mutate(
            &["students"],
            "Badge assigned.",
            state.api.post_unit(&format!("/badges/{badge_id}/assign"), &body),
        )
        .await
}

pub async fn remove_badge(state: &AppState, badge_id: &str, student_id: &str) -> Result<(), AppError> {
    let body = BadgeAssignment {
        student_id: student_id.to_string(),
    };
    state
        .mutate(
            &["students"],
            "Badge removed.",
            state.api.post_unit(&format!("/badges/{badge_id}/remove"), &body),
        )
        .await
}
