//! Process-wide session cache
//!
//! Maps a bearer token to the user it belongs to. Any 401 answer invalidates
//! the entry for the token that was sent.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use shared::client::UserInfo;

#[derive(Debug, Default)]
pub struct SessionCache {
    sessions: DashMap<String, UserInfo>,
}

static GLOBAL: OnceLock<Arc<SessionCache>> = OnceLock::new();

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every client in this process
    pub fn global() -> Arc<SessionCache> {
        GLOBAL.get_or_init(|| Arc::new(SessionCache::new())).clone()
    }

    pub fn insert(&self, token: impl Into<String>, user: UserInfo) {
        self.sessions.insert(token.into(), user);
    }

    pub fn get(&self, token: &str) -> Option<UserInfo> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    /// Drop the session for `token`; returns whether one existed
    pub fn invalidate(&self, token: &str) -> bool {
        let removed = self.sessions.remove(token).is_some();
        if removed {
            tracing::debug!("Session invalidated");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
