// src/api/projects.rs

use crate::{
    error::AppError,
    models::project::{Project, ProjectRequest},
    state::AppState,
};

pub async fn list_projects(state: &AppState) -> Result<Vec<Project>, AppError> {
    state
        .cache
        .get_or_fetch("projects", || state.api.get("/projects"))
        .await
}

pub async fn refetch_projects(state: &AppState) -> Result<Vec<Project>, AppError> {
    state
        .cache
        .refetch("projects", || state.api.get("/projects"))
        .await
}

/// Submits a project owned by the signed-in student. It starts out pending approval.
pub async fn create_project(state: &AppState, payload: &ProjectRequest) -> Result<Project, AppError> {
    state.check(payload)?;
    state
        .mutate(
            &["projects"],
            "Project submitted for review.",
            state.api.post("/projects", payload),
        )
        .await
}

/// Edits a project. Only its owner may do so; admins moderate via approve/delete.
pub async fn update_project(
    state: &AppState,
    project: &Project,
    payload: &ProjectRequest,
) -> Result<Project, AppError> {
    ensure_owner(state, project)?;
    state.check(payload)?;
    state
        .mutate(
            &["projects"],
            "Project updated.",
            state.api.put(&format!("/projects/{}", project.id), payload),
        )
        .await
}

pub async fn approve_project(state: &AppState, id: &str) -> Result<(), AppError> {
    state
        .mutate(
            &["projects"],
            "Project approved.",
            state
                .api
                .put_unit(&format!("/projects/{id}/approve"), &serde_json::json!({})),
        )
        .await
}

/// Owners may withdraw their own project; admins may delete any.
pub async fn delete_project(state: &AppState, project: &Project) -> Result<(), AppError> {
    if !state.session.is_admin() {
        ensure_owner(state, project)?;
    }
    state
        .mutate(
            &["projects"],
            "Project deleted.",
            state.api.delete(&format!("/projects/{}", project.id)),
        )
        .await
}

fn ensure_owner(state: &AppState, project: &Project) -> Result<(), AppError> {
    let owns = state
        .session
        .current_user()
        .is_some_and(|user| user.id == project.student_id);

    if owns {
        Ok(())
    } else {
        let error = AppError::Forbidden("You can only change your own projects.".to_string());
        state.notifier.error(&error.user_message());
        Err(error)
    }
}
