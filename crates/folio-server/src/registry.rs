use crate::session::VoiceAgentSession;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Live chat sessions keyed by session id.
///
/// Uses `std::sync::RwLock` intentionally: all lock acquisitions are brief
/// HashMap operations (get/insert/remove) that never span `.await` points.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<VoiceAgentSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `session` under a fresh UUID and returns the id.
    pub fn insert(&self, session: VoiceAgentSession) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(session));
        id
    }

    pub fn get(&self, id: &str) -> Option<Arc<VoiceAgentSession>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<VoiceAgentSession>> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    /// Removes and returns every session.
    pub fn drain(&self) -> Vec<(String, Arc<VoiceAgentSession>)> {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
