//! Per-recipient session registry
//!
//! Holds the NLU session id and the cached Graph profile of every recipient
//! seen recently. Entries idle for longer than the TTL are dropped by a
//! background sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::time::interval;
use tracing::{debug, info};
use uuid::Uuid;

use mb_core::RecipientId;

use crate::types::UserProfile;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct SessionEntry {
    session_id: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct ProfileEntry {
    profile: UserProfile,
    updated_at: DateTime<Utc>,
}

/// Recipient-keyed session ids and profile cache
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<RecipientId, SessionEntry>>,
    profiles: Arc<DashMap<RecipientId, ProfileEntry>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            profiles: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// NLU session id for `recipient`, created on first contact. Marks the
    /// recipient active, so its cached profile stays alive too.
    pub fn session_id(&self, recipient: &RecipientId) -> String {
        let now = Utc::now();
        if let Some(mut profile) = self.profiles.get_mut(recipient) {
            profile.updated_at = now;
        }

        let mut entry = self.sessions.entry(recipient.clone()).or_insert_with(|| {
            debug!(recipient = %recipient, "New NLU session");
            SessionEntry {
                session_id: Uuid::new_v4().to_string(),
                updated_at: now,
            }
        });
        entry.updated_at = now;
        entry.session_id.clone()
    }

    pub fn has_session(&self, recipient: &RecipientId) -> bool {
        self.sessions.contains_key(recipient)
    }

    pub fn profile(&self, recipient: &RecipientId) -> Option<UserProfile> {
        self.profiles.get(recipient).map(|entry| entry.profile.clone())
    }

    pub fn has_profile(&self, recipient: &RecipientId) -> bool {
        self.profiles.contains_key(recipient)
    }

    pub fn store_profile(&self, recipient: &RecipientId, profile: UserProfile) {
        self.profiles.insert(
            recipient.clone(),
            ProfileEntry {
                profile,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start a background task to clean up expired entries
    pub fn start_cleanup_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                self.cleanup_expired(Utc::now());
            }
        })
    }

    /// Drop entries idle since before `now - ttl`. Returns how many
    /// recipients lost their session.
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let timeout = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);

        let candidates: Vec<RecipientId> = self
            .sessions
            .iter()
            .filter(|entry| now - entry.value().updated_at > timeout)
            .map(|entry| entry.key().clone())
            .collect();

        // Recheck under the shard lock: the recipient may have come back
        // since the scan.
        let mut removed = 0;
        for recipient in &candidates {
            if self
                .sessions
                .remove_if(recipient, |_, entry| now - entry.updated_at > timeout)
                .is_some()
            {
                info!("Cleaned up expired session for recipient: {}", recipient);
                removed += 1;
            }
        }

        self.profiles
            .retain(|_, entry| now - entry.updated_at <= timeout);

        removed
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}
