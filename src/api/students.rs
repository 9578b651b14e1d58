// src/api/students.rs

use crate::{
    cache,
    error::AppError,
    models::user::{UpdateStudentRequest, User},
    state::AppState,
};

pub async fn list_students(state: &AppState) -> Result<Vec<User>, AppError> {
    state
        .cache
        .get_or_fetch("students", || state.api.get("/students"))
        .await
}

pub async fn refetch_students(state: &AppState) -> Result<Vec<User>, AppError> {
    state
        .cache
        .refetch("students", || state.api.get("/students"))
        .await
}

pub async fn get_student(state: &AppState, id: &str) -> Result<User, AppError> {
    let path = format!("/students/{id}");
    state
        .cache
        .get_or_fetch(&cache::key("students", id), || state.api.get(&path))
        .await
}

pub async fn update_student(
    state: &AppState,
    id: &str,
    payload: &UpdateStudentRequest,
) -> Result<User, AppError> {
    state
        .mutate(
            &["students"],
            "Student updated.",
            state.api.put(&format!("/students/{id}"), payload),
        )
        .await
}

pub async fn delete_student(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["students", "projects"],
            "Student removed.",
            state.api.delete(&format!("/students/{id}")),
        )
        .await
}
