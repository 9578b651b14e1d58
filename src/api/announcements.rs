// src/api/announcements.rs

use crate::{
    error::AppError,
    models::announcement::{Announcement, AnnouncementRequest},
    state::AppState,
};

pub async fn list_announcements(state: &AppState) -> Result<Vec<Announcement>, AppError> {
    state
        .cache
        .get_or_fetch("announcements", || state.api.get("/announcements"))
        .await
}

pub async fn refetch_announcements(state: &AppState) -> Result<Vec<Announcement>, AppError> {
    state
        .cache
        .refetch("announcements", || state.api.get("/announcements"))
        .await
}

pub async fn create_announcement(
    state: &AppState,
    payload: &AnnouncementRequest,
) -> Result<Announcement, AppError> {
    state.check(payload)?;
    state
        .mutate(
            &["announcements", "notifications"],
            "Announcement published.",
            state.api.post("/announcements", payload),
        )
        .await
}

pub async fn update_announcement(
    state: &AppState,
    id: &str,
    payload: &AnnouncementRequest,
) -> Result<Announcement, AppError> {
    state.check(payload)?;
    state
        .mutate(
            &["announcements"],
            "Announcement updated.",
            state.api.put(&format!("/announcements/{id}"), payload),
        )
        .await
}

pub async fn delete_announcement(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["announcements"],
            "Announcement deleted.",
            state.api.delete(&format!("/announcements/{id}")),
        )
        .await
}
