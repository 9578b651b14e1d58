// src/api/events.rs

use crate::{
    error::AppError,
    models::event::{Event, EventRequest},
    state::AppState,
};

pub async fn list_events(state: &AppState) -> Result<Vec<Event>, AppError> {
    state
        .cache
        .get_or_fetch("events", || state.api.get("/events"))
        .await
}

pub async fn refetch_events(state: &AppState) -> Result<Vec<Event>, AppError> {
    state
        .cache
        .refetch("events", || state.api.get("/events"))
        .await
}

pub async fn create_event(state: &AppState, payload: &EventRequest) -> Result<Event, AppError> {
    state.check(payload)?;
    state
        .mutate(&["events"], "Event created.", state.api.post("/events", payload))
        .await
}

pub async fn update_event(
    state: &AppState,
    id: &str,
    payload: &EventRequest,
) -> Result<Event, AppError> {
    state.check(payload)?;
    state
        .mutate(
            &["events"],
            "Event updated.",
            state.api.put(&format!("/events/{id}"), payload),
        )
        .await
}

pub async fn delete_event(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["events"],
            "Event deleted.",
            state.api.delete(&format!("/events/{id}")),
        )
        .await
}
