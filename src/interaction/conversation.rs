//! Bounded per-user conversation memory.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    base::types::{ConversationTurn, UserId},
    service::store::{MemoryStore, UserStore},
};

/// Ordered turns of one user's conversation with the bot.
///
/// Turns alternate user/model, starting with a user turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Append one exchange, then drop the oldest whole pairs beyond `pair_limit`.
    pub fn push_exchange(&mut self, user_text: &str, model_text: &str, pair_limit: usize) {
        self.turns.push(ConversationTurn::user(user_text));
        self.turns.push(ConversationTurn::model(model_text));

        let max_len = pair_limit * 2;
        if self.turns.len() > max_len {
            let excess = (self.turns.len() - max_len).div_ceil(2) * 2;
            self.turns.drain(..excess);
        }
    }
}

/// Per-user conversation store.
///
/// This is trivially cloneable; clones share the same state.
pub struct ConversationStore<S = MemoryStore<ConversationHistory>>
where
    S: UserStore<ConversationHistory>,
{
    pair_limit: usize,
    store: Arc<S>,
    locks: Arc<DashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S> Clone for ConversationStore<S>
where
    S: UserStore<ConversationHistory>,
{
    fn clone(&self) -> Self {
        Self {
            pair_limit: self.pair_limit,
            store: self.store.clone(),
            locks: self.locks.clone(),
        }
    }
}

impl ConversationStore {
    /// Create a store backed by an in-memory map.
    pub fn in_memory(pair_limit: usize) -> Self {
        Self::with_store(pair_limit, MemoryStore::new())
    }
}

impl<S> ConversationStore<S>
where
    S: UserStore<ConversationHistory>,
{
    pub fn with_store(pair_limit: usize, store: S) -> Self {
        Self {
            pair_limit,
            store: Arc::new(store),
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Snapshot of the user's history, oldest first.
    pub fn history(&self, user_id: &str) -> Vec<ConversationTurn> {
        self.store.with_entry(user_id, |history| history.turns().to_vec())
    }

    /// Record a completed exchange.
    pub fn append_turn(&self, user_id: &str, user_text: &str, model_text: &str) {
        self.store.with_entry(user_id, |history| history.push_exchange(user_text, model_text, self.pair_limit));
    }

    /// Serialize chat exchanges of one user.
    ///
    /// Hold the guard from reading the history until the exchange is appended.
    pub async fn lock_user(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(user_id.to_string()).or_default().clone();
        lock.lock_owned().await
    }
}
