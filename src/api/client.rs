// src/api/client.rs

use reqwest::{Method, RequestBuilder, Response, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};

use crate::{config::Config, error::AppError, session::SessionStore};

/// HTTP wrapper for the club API.
///
/// Every request is resolved against the configured base URL and, when a session
/// exists, carries `Authorization: Bearer <token>`.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &Config, session: SessionStore) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        Ok(response.json().await?)
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, AppError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let response = self
            .execute(self.request(Method::GET, path).query(query))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.request(Method::POST, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    /// POST whose response body is irrelevant (e.g. `{"message": "OTP sent"}`).
    pub async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), AppError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(self.request(Method::POST, path).json(body))
            .await
            .map(|_| ())
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(self.request(Method::PUT, path).json(body))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn put_unit<B>(&self, path: &str, body: &B) -> Result<(), AppError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(self.request(Method::PUT, path).json(body))
            .await
            .map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.execute(self.request(Method::DELETE, path))
            .await
            .map(|_| ())
    }

    /// Request interceptor: base URL plus bearer token.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let request = builder.build()?;
        let authenticated = request.headers().contains_key(header::AUTHORIZATION);
        tracing::debug!("{} {}", request.method(), request.url().path());

        let response = self.http.execute(request).await.map_err(|e| {
            tracing::error!("Request failed: {}", e);
            AppError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = AppError::from_status(status, &body);
        tracing::warn!("API rejected request: {}", error);

        // A rejected bearer token means the session is over.
        if status == StatusCode::UNAUTHORIZED && authenticated {
            if let Err(e) = self.session.sign_out().await {
                tracing::error!("Failed to clear session after 401: {}", e);
            }
        }

        Err(error)
    }
}
