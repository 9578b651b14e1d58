// src/api/notifications.rs

use crate::{error::AppError, models::notification::Notification, state::AppState};

pub async fn list_notifications(state: &AppState) -> Result<Vec<Notification>, AppError> {
    state
        .cache
        .get_or_fetch("notifications", || state.api.get("/notifications"))
        .await
}

pub async fn unread_count(state: &AppState) -> Result<usize, AppError> {
    Ok(list_notifications(state)
        .await?
        .iter()
        .filter(|n| !n.read)
        .count())
}

pub async fn mark_read(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["notifications"],
            "Marked as read.",
            state
                .api
                .put_unit(&format!("/notifications/{id}/read"), &serde_json::json!({})),
        )
        .await
}
