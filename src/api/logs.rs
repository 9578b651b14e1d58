// src/api/logs.rs

use crate::{
    cache,
    error::AppError,
    models::activity_log::{ActivityLog, LogQuery},
    state::AppState,
};

/// One cache entry per distinct filter/page.
pub async fn list_logs(state: &AppState, query: &LogQuery) -> Result<Vec<ActivityLog>, AppError> {
    let filter = serde_json::to_string(query)?;
    state
        .cache
        .get_or_fetch(&cache::key("logs", &filter), || {
            state.api.get_with_query("/logs", query)
        })
        .await
}

/// Logs grow while the page is open; the admin console calls this on "refresh".
pub async fn refetch_logs(state: &AppState, query: &LogQuery) -> Result<Vec<ActivityLog>, AppError> {
    state.cache.invalidate("logs").await;
    list_logs(state, query).await
}
