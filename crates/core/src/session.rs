//! Process-wide session holding the bearer token used by every request.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authenticated,
    Unauthenticated,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    saved_at: DateTime<Utc>,
}

struct Inner {
    token: RwLock<Option<String>>,
    path: Option<PathBuf>,
    state: watch::Sender<AuthState>,
}

/// Cheap to clone; all clones share the same token and observers.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("path", &self.inner.path)
            .field("state", &self.state())
            .finish()
    }
}

impl SessionContext {
    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::build(None, None)
    }

    /// Restore the session persisted at `path`, if any.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let token = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file at {}", path.display()))?;
            match serde_json::from_str::<StoredSession>(&raw) {
                Ok(stored) => Some(stored.token),
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "ignoring corrupt session file"
                    );
                    None
                }
            }
        } else {
            None
        };
        Ok(Self::build(token, Some(path)))
    }

    fn build(token: Option<String>, path: Option<PathBuf>) -> Self {
        let initial = if token.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        };
        let (state, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                token: RwLock::new(token),
                path,
                state,
            }),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.inner.token.read().clone()
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if let Some(path) = &self.inner.path {
            persist(path, &token)?;
        }
        *self.inner.token.write() = Some(token);
        self.inner.state.send_replace(AuthState::Authenticated);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        *self.inner.token.write() = None;
        self.forget()
    }

    /// The backend rejected `rejected`: forget it and tell observers to route to login.
    ///
    /// Nothing happens when the session has moved on to another token since the
    /// rejected request was sent. Returns whether the session was cleared.
    pub fn expire(&self, rejected: Option<&str>) -> bool {
        {
            let mut current = self.inner.token.write();
            if current.as_deref() != rejected {
                tracing::debug!("ignoring rejection of a replaced session token");
                return false;
            }
            *current = None;
        }
        if let Err(err) = self.forget() {
            tracing::warn!(error = %err, "failed to clear persisted session");
        }
        true
    }

    fn forget(&self) -> Result<()> {
        self.inner.state.send_replace(AuthState::Unauthenticated);
        if let Some(path) = &self.inner.path {
            if path.exists() {
                fs::remove_file(path).with_context(|| {
                    format!("Failed to remove session file at {}", path.display())
                })?;
            }
        }
        Ok(())
    }

    pub fn state(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }
}

fn persist(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let stored = StoredSession {
        token: token.to_string(),
        saved_at: Utc::now(),
    };
    let body = serde_json::to_string_pretty(&stored)?;
    fs::write(path, body)
        .with_context(|| format!("Failed to write session file at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn token_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");

        let session = SessionContext::load(&path).unwrap();
        assert_eq!(session.state(), AuthState::Unauthenticated);
        session.set_token("tok-123").unwrap();

        let restored = SessionContext::load(&path).unwrap();
        assert_eq!(restored.token().as_deref(), Some("tok-123"));
        assert_eq!(restored.state(), AuthState::Authenticated);
    }

    #[test]
    fn unauthenticated_transition_is_observed_and_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        let session = SessionContext::load(&path).unwrap();
        session.set_token("tok").unwrap();

        let mut observer = session.subscribe();
        let clone = session.clone();
        assert!(clone.expire(Some("tok")));

        assert!(observer.has_changed().unwrap());
        assert_eq!(*observer.borrow_and_update(), AuthState::Unauthenticated);
        assert_eq!(session.token(), None);
        assert!(!path.exists());
    }

    #[test]
    fn rejection_of_a_replaced_token_keeps_the_new_one() {
        let session = SessionContext::in_memory();
        session.set_token("old").unwrap();
        session.set_token("new").unwrap();

        assert!(!session.expire(Some("old")));
        assert_eq!(session.token().as_deref(), Some("new"));
        assert_eq!(session.state(), AuthState::Authenticated);

        assert!(!session.expire(None));
        assert!(session.expire(Some("new")));
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn corrupt_file_is_treated_as_signed_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let session = SessionContext::load(&path).unwrap();
        assert_eq!(session.token(), None);
    }

    #[test]
    fn in_memory_session_never_touches_disk() {
        let session = SessionContext::in_memory();
        session.set_token("abc").unwrap();
        assert_eq!(session.path(), None);
        session.clear().unwrap();
        assert_eq!(session.state(), AuthState::Unauthenticated);
    }
}
