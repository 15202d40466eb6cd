//! Many independent sessions behind one handle.
//!
//! Each session sits behind its own mutex, so concurrent steps against the
//! same session serialize while different sessions proceed in parallel.

use crate::error::AgentError;
use crate::session::Session;
use organtwin_core::OrganTwinConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SharedSession = Arc<Mutex<Session>>;

pub struct SessionManager {
    config: OrganTwinConfig,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    /// Sessions ever created. Never decremented, so seeds are never reused.
    created: AtomicU64,
}

impl SessionManager {
    /// Config is validated once here; every session built later uses it.
    pub fn new(config: OrganTwinConfig) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            config,
            sessions: RwLock::new(HashMap::new()),
            created: AtomicU64::new(0),
        })
    }

    /// Create a session. Its seeds are offset by the number of sessions ever
    /// created, so no two sessions share a trajectory even after removals.
    pub async fn create(&self) -> Result<Uuid, AgentError> {
        let mut sessions = self.sessions.write().await;
        let offset = self.created.fetch_add(1, Ordering::Relaxed);
        let mut cfg = self.config.clone();
        cfg.simulation.seed = cfg.simulation.seed.wrapping_add(offset);
        cfg.learner.seed = cfg.learner.seed.wrapping_add(offset);
        let session = Session::new(&cfg)?;

        let id = Uuid::new_v4();
        sessions.insert(id, Arc::new(Mutex::new(session)));
        tracing::info!(%id, total = sessions.len(), "Session registered");
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> Result<SharedSession, AgentError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(AgentError::UnknownSession(id))
    }

    pub async fn remove(&self, id: Uuid) -> Result<(), AgentError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                tracing::info!(%id, "Session removed");
                Ok(())
            }
            None => Err(AgentError::UnknownSession(id)),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn ids(&self) -> Vec<Uuid> {
        self.sessions.read().await.keys().copied().collect()
    }
}
