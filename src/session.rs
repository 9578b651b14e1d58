// src/session.rs

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::User, utils::jwt::peek_claims};

/// What survives a restart: the bearer token and the user it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

/// Durable storage for the session.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> Result<Option<StoredSession>, AppError>;
    async fn save(&self, session: &StoredSession) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable session file {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        let body = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: tokio::sync::Mutex<Option<StoredSession>>,
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<StoredSession>, AppError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<(), AppError> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

/// The auth context shared by the HTTP client, route guards and views.
///
/// Reads are synchronous so guards can decide without awaiting. Every change goes
/// through [`SessionStore::replace`], which updates memory first and then storage.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Option<StoredSession>>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            storage,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::default()))
    }

    /// Loads the persisted session. A token whose `exp` has passed is discarded.
    pub async fn restore(&self) -> Result<Option<User>, AppError> {
        let Some(stored) = self.storage.load().await? else {
            return Ok(None);
        };

        // Opaque (non-JWT) tokens are kept; the API will reject them if stale.
        if let Ok(claims) = peek_claims(&stored.token) {
            if claims.is_expired(Utc::now()) {
                tracing::info!("Stored session for {} has expired", stored.user.email);
                self.replace(None).await?;
                return Ok(None);
            }
        }

        let user = stored.user.clone();
        self.write(Some(stored));
        tracing::info!("Restored session for {}", user.email);
        Ok(Some(user))
    }

    pub fn token(&self) -> Option<String> {
        self.read(|s| s.map(|s| s.token.clone()))
    }

    pub fn current_user(&self) -> Option<User> {
        self.read(|s| s.map(|s| s.user.clone()))
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|s| s.is_some())
    }

    pub fn is_admin(&self) -> bool {
        self.read(|s| s.is_some_and(|s| s.user.is_admin()))
    }

    pub async fn sign_in(&self, token: String, user: User) -> Result<(), AppError> {
        tracing::info!("Signed in as {} ({:?})", user.email, user.role);
        self.replace(Some(StoredSession { token, user })).await
    }

    /// Swaps the user record while keeping the token. No-op when signed out.
    pub async fn update_user(&self, user: User) -> Result<(), AppError> {
        let Some(token) = self.token() else {
            return Ok(());
        };
        self.replace(Some(StoredSession { token, user })).await
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        if self.is_authenticated() {
            tracing::info!("Signed out");
        }
        self.replace(None).await
    }

    async fn replace(&self, next: Option<StoredSession>) -> Result<(), AppError> {
        self.write(next.clone());
        match next {
            Some(session) => self.storage.save(&session).await,
            None => self.storage.clear().await,
        }
    }

    fn read<R>(&self, f: impl FnOnce(Option<&StoredSession>) -> R) -> R {
        let guard = self.current.read().unwrap_or_else(|p| p.into_inner());
        f(guard.as_ref())
    }

    fn write(&self, next: Option<StoredSession>) {
        let mut guard = self.current.write().unwrap_or_else(|p| p.into_inner());
        *guard = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn user(role: Role) -> User {
        User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@club.dev".to_string(),
            username: Some("ada".to_string()),
            role,
            badges: vec![],
            avatar_url: None,
            is_verified: true,
            created_at: None,
        }
    }

    fn jwt(exp: i64) -> String {
        encode(
            &Header::default(),
            &serde_json::json!({ "sub": "u1", "exp": exp }),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sign_in_persists_and_restores() {
        let storage = Arc::new(MemoryStorage::default());
        let session = SessionStore::new(storage.clone());
        let token = jwt(Utc::now().timestamp() + 600);

        session.sign_in(token.clone(), user(Role::Admin)).await.unwrap();
        assert!(session.is_admin());

        let reopened = SessionStore::new(storage);
        assert!(!reopened.is_authenticated());
        let restored = reopened.restore().await.unwrap();
        assert_eq!(restored.map(|u| u.id), Some("u1".to_string()));
        assert_eq!(reopened.token(), Some(token));
    }

    #[tokio::test]
    async fn restore_drops_expired_token() {
        let storage = Arc::new(MemoryStorage::default());
        storage
            .save(&StoredSession {
                token: jwt(Utc::now().timestamp() - 60),
                user: user(Role::Student),
            })
            .await
            .unwrap();

        let session = SessionStore::new(storage.clone());
        assert_eq!(session.restore().await.unwrap(), None);
        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_user_is_noop_when_signed_out() {
        let session = SessionStore::in_memory();
        session.update_user(user(Role::Admin)).await.unwrap();
        assert!(session.current_user().is_none());
    }

    #[tokio::test]
    async fn file_storage_round_trips_and_clears() {
        let path = std::env::temp_dir().join(format!("club_session_{}.json", std::process::id()));
        let storage = FileStorage::new(&path);
        let stored = StoredSession {
            token: "opaque".to_string(),
            user: user(Role::Student),
        };

        storage.save(&stored).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), Some(stored));

        storage.clear().await.unwrap();
        assert_eq!(storage.load().await.unwrap(), None);
        // Clearing twice is fine.
        storage.clear().await.unwrap();
    }
}
