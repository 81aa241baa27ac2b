// Server-side session store: opaque token -> user id, with sliding expiry

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    entries: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Opens a session for `user_id` and returns its token. Expired sessions
    /// are purged on the way.
    pub async fn create(&self, user_id: i64) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            token.clone(),
            SessionEntry {
                user_id,
                expires_at: now + self.ttl,
            },
        );

        token
    }

    /// Returns the user behind `token`, pushing its expiry forward.
    pub async fn resolve(&self, token: &str) -> Option<i64> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        let expired = match entries.get_mut(token) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.ttl;
                return Some(entry.user_id);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(token);
        }
        None
    }

    pub async fn revoke(&self, token: &str) -> bool {
        self.entries.write().await.remove(token).is_some()
    }
}
