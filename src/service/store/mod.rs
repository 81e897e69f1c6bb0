//! Per-user state storage.
//!
//! The abuse guard and the conversation store both keep a small piece of state
//! per user.  They reach it through [`UserStore`], so the in-memory map used
//! here can be swapped for a time-bounded cache or an external store without
//! touching the interaction logic.

use dashmap::DashMap;

use crate::base::types::UserId;

// Traits.

/// Generic per-user key-value store.
///
/// Implementations must run `f` as one uninterrupted critical section: no other
/// caller may observe or modify the same user's entry while `f` runs.
pub trait UserStore<V>: Send + Sync + 'static {
    /// Run `f` against the user's entry, creating a default entry if absent.
    fn with_entry<R>(&self, user_id: &str, f: impl FnOnce(&mut V) -> R) -> R;

    /// Number of users with an entry.
    fn len(&self) -> usize;

    /// Whether no user has an entry yet.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Structs.

/// In-memory store backed by a sharded concurrent map.
///
/// Entries live for the lifetime of the process.
#[derive(Debug)]
pub struct MemoryStore<V> {
    inner: DashMap<UserId, V>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self { inner: DashMap::new() }
    }
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V> UserStore<V> for MemoryStore<V>
where
    V: Default + Send + Sync + 'static,
{
    fn with_entry<R>(&self, user_id: &str, f: impl FnOnce(&mut V) -> R) -> R {
        let mut entry = self.inner.entry(user_id.to_string()).or_default();
        f(entry.value_mut())
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
