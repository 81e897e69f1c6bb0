//! Sliding-window spam detection layered with a cooldown timer.
//!
//! Every request that reaches the guard is recorded in a per-user sliding
//! window.  A burst of `spam_threshold` requests inside the window earns a long
//! spam cooldown; every allowed request earns a short per-action cooldown.
//! Both share one deadline, and the latest verdict always overwrites it.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use tokio::time::Instant;
use tracing::info;

use crate::{
    base::{config::ConfigInner, types::Verdict},
    service::store::{MemoryStore, UserStore},
};

/// Tunables of the abuse guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbusePolicy {
    /// Length of the trailing window.
    pub window: Duration,
    /// Requests inside the window that count as spam.
    pub spam_threshold: usize,
    /// Cooldown imposed when spam is detected.
    pub spam_cooldown: Duration,
    /// Cooldown imposed after every allowed request.
    pub cooldown: Duration,
}

impl From<&ConfigInner> for AbusePolicy {
    fn from(config: &ConfigInner) -> Self {
        Self {
            window: config.abuse_window(),
            spam_threshold: config.spam_threshold,
            spam_cooldown: config.spam_cooldown(),
            cooldown: config.cooldown(),
        }
    }
}

/// Per-user abuse state.
#[derive(Debug, Clone, Default)]
pub struct AbuseState {
    recent: VecDeque<Instant>,
    cooldown_until: Option<Instant>,
}

impl AbuseState {
    /// Record a request at `now` and decide whether it may proceed.
    pub fn check(&mut self, policy: &AbusePolicy, now: Instant) -> Verdict {
        self.recent.retain(|t| now.saturating_duration_since(*t) < policy.window);
        self.recent.push_back(now);

        let cooling_down = self.cooldown_until.is_some_and(|until| now < until);

        if self.recent.len() >= policy.spam_threshold && !cooling_down {
            self.cooldown_until = Some(now + policy.spam_cooldown);
            return Verdict::SpamDetected;
        }

        if let Some(until) = self.cooldown_until
            && now < until
        {
            return Verdict::CooldownActive { remaining: until - now };
        }

        self.cooldown_until = Some(now + policy.cooldown);
        Verdict::Allowed
    }

    /// Requests currently inside the window (as of the last check).
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    pub fn cooldown_until(&self) -> Option<Instant> {
        self.cooldown_until
    }
}

/// Per-user abuse guard.
///
/// This is trivially cloneable; clones share the same state.
pub struct AbuseGuard<S = MemoryStore<AbuseState>>
where
    S: UserStore<AbuseState>,
{
    policy: AbusePolicy,
    store: Arc<S>,
}

impl<S> Clone for AbuseGuard<S>
where
    S: UserStore<AbuseState>,
{
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            store: self.store.clone(),
        }
    }
}

impl AbuseGuard {
    /// Create a guard backed by an in-memory store.
    pub fn in_memory(policy: AbusePolicy) -> Self {
        Self::with_store(policy, MemoryStore::new())
    }
}

impl<S> AbuseGuard<S>
where
    S: UserStore<AbuseState>,
{
    pub fn with_store(policy: AbusePolicy, store: S) -> Self {
        Self { policy, store: Arc::new(store) }
    }

    /// Check a request from `user_id` at `now`, updating the user's state.
    ///
    /// The check and the update happen in one critical section; this never
    /// suspends.
    pub fn check(&self, user_id: &str, now: Instant) -> Verdict {
        let verdict = self.store.with_entry(user_id, |state| state.check(&self.policy, now));

        if verdict == Verdict::SpamDetected {
            info!("User {} tripped the spam detector; cooldown set.", user_id);
        }

        verdict
    }
}
