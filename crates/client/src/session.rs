//! Session persistence
//!
//! A [`SessionStore`] keeps the signed-in user and their token in memory and
//! mirrors every change to a [`SessionStorage`] backend, so a restarted client
//! comes back signed in. Holding a token is the only signed-in signal; the
//! stored token is trusted until the server rejects it.

use crate::error::Result;
use async_trait::async_trait;
use casebook_common::dto::UserProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// What survives a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// Durable home of the session
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn load(&self) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

/// Session kept as a JSON file
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for FileStorage {
    async fn load(&self) -> Result<Option<Session>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&contents) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // Unreadable file means signed out
                warn!(path = %self.path.display(), error = %e, "Discarding corrupt session file");
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage, gone with the process
#[derive(Default)]
pub struct MemoryStorage {
    session: RwLock<Option<Session>>,
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }
}

/// Current session, mirrored to storage
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    current: RwLock<Option<Session>>,
}

impl SessionStore {
    /// Restore whatever the storage holds
    pub async fn load(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let current = storage.load().await?;
        debug!(restored = current.is_some(), "Session store loaded");
        Ok(Self {
            storage,
            current: RwLock::new(current),
        })
    }

    /// Store with nothing persisted beyond the process
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::default()),
            current: RwLock::new(None),
        }
    }

    pub async fn is_logged_in(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.current.read().await.as_ref().and_then(|s| s.user.clone())
    }

    pub async fn session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Replace the session and persist it
    pub async fn set(&self, session: Session) -> Result<()> {
        self.storage.save(&session).await?;
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Attach the profile to the current session. No-op when signed out.
    pub async fn set_user(&self, user: UserProfile) -> Result<()> {
        let mut current = self.current.write().await;
        if let Some(session) = current.as_mut() {
            session.user = Some(user);
            self.storage.save(session).await?;
        }
        Ok(())
    }

    /// Forget the session in memory and in storage
    pub async fn clear(&self) -> Result<()> {
        *self.current.write().await = None;
        self.storage.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            email: "a@x.com".into(),
            token: "t0k3n".into(),
            user: None,
        }
    }

    fn profile() -> UserProfile {
        UserProfile {
            id: "u1".into(),
            email: "a@x.com".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            phone_number: None,
            roles: vec!["User".into()],
        }
    }

    #[tokio::test]
    async fn test_file_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let store = SessionStore::load(Arc::new(FileStorage::new(&path))).await.unwrap();
        assert!(!store.is_logged_in().await);
        store.set(session()).await.unwrap();
        store.set_user(profile()).await.unwrap();

        let restored = SessionStore::load(Arc::new(FileStorage::new(&path))).await.unwrap();
        assert!(restored.is_logged_in().await);
        assert_eq!(restored.token().await.as_deref(), Some("t0k3n"));
        assert_eq!(restored.user().await.unwrap().id, "u1");
    }

    #[tokio::test]
    async fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::load(Arc::new(FileStorage::new(&path))).await.unwrap();

        store.set(session()).await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert!(store.token().await.is_none());

        // Clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_means_signed_out() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{not json").unwrap();

        let store = SessionStore::load(Arc::new(FileStorage::new(file.path()))).await.unwrap();
        assert!(!store.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_set_user_requires_session() {
        let store = SessionStore::in_memory();
        store.set_user(profile()).await.unwrap();
        assert!(store.user().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_storage_shared_between_stores() {
        let storage: Arc<dyn SessionStorage> = Arc::new(MemoryStorage::default());
        let first = SessionStore::load(storage.clone()).await.unwrap();
        first.set(session()).await.unwrap();

        let second = SessionStore::load(storage).await.unwrap();
        assert_eq!(second.session().await, Some(session()));
    }
}
