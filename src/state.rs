use std::future::Future;
use std::sync::Arc;

use crate::{
    api::client::ApiClient,
    cache::QueryCache,
    config::Config,
    error::AppError,
    notify::Notifier,
    session::{SessionStorage, SessionStore},
};

/// Everything the data layer needs, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub api: ApiClient,
    pub session: SessionStore,
    pub cache: QueryCache,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn SessionStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let session = SessionStore::new(storage);
        let api = ApiClient::new(&config, session.clone())?;

        Ok(Self {
            config,
            api,
            session,
            cache: QueryCache::default(),
            notifier,
        })
    }

    /// Runs a mutation.
    ///
    /// On success the listed cache keys are invalidated and `success` is announced.
    /// On failure the error is announced to the user and then returned.
    pub async fn mutate<T, Fut>(
        &self,
        invalidates: &[&str],
        success: &str,
        mutation: Fut,
    ) -> Result<T, AppError>
    where
        Fut: Future<Output = Result<T, AppError>>,
    {
        match mutation.await {
            Ok(value) => {
                for key in invalidates {
                    self.cache.invalidate(key).await;
                }
                self.notifier.success(success);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("Mutation failed: {}", e);
                self.notifier.error(&e.user_message());
                Err(e)
            }
        }
    }

    /// Validates a request body locally; failures are announced without any network call.
    pub fn check<V: validator::Validate>(&self, payload: &V) -> Result<(), AppError> {
        payload.validate().map_err(|errors| {
            let error = AppError::from(errors);
            self.notifier.error(&error.user_message());
            error
        })
    }
}
