//! Process-wide opener registrations, scoped by guards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use gatefs_opener::Opener;

use crate::error::RegistrationError;
use crate::key::RegistrationKey;

type EntryMap = Arc<Mutex<HashMap<RegistrationKey, RegistryEntry>>>;

/// The key -> opener map shared between registering collaborators and the
/// runtime's callback threads.
///
/// Registration is scoped: `register` returns a guard and the entry lives
/// until that guard drops, also on panic or early return. Re-registering
/// the identical opener for an active key nests - a per-entry depth count
/// keeps the binding alive until the outermost guard is released - while a
/// different opener for an active key is a conflict. Resolution is a pure
/// lookup and always observes the most recent registration state.
#[derive(Clone, Default)]
pub struct OpenerRegistry {
    entries: EntryMap,
}

struct RegistryEntry {
    opener: Opener,
    depth: usize,
}

impl OpenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `opener` to `key` until the returned guard is dropped.
    pub fn register(
        &self,
        key: RegistrationKey,
        opener: Opener,
    ) -> Result<RegistrationGuard, RegistrationError> {
        let mut entries = self.entries.lock().expect("registry poisoned");
        match entries.get_mut(&key) {
            Some(entry) if entry.opener.same_source(&opener) => entry.depth += 1,
            Some(_) => return Err(RegistrationError::Conflict { key }),
            None => {
                entries.insert(key.clone(), RegistryEntry { opener, depth: 1 });
            }
        }
        drop(entries);

        debug!(key = %key, "opener registered");
        Ok(RegistrationGuard {
            entries: Arc::clone(&self.entries),
            key,
        })
    }

    /// The opener currently bound to `key`.
    pub fn resolve(&self, key: &RegistrationKey) -> Option<Opener> {
        self.entries
            .lock()
            .expect("registry poisoned")
            .get(key)
            .map(|entry| entry.opener.clone())
    }
}

/// Releases its registration when dropped.
pub struct RegistrationGuard {
    entries: EntryMap,
    key: RegistrationKey,
}

impl RegistrationGuard {
    pub fn key(&self) -> &RegistrationKey {
        &self.key
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().expect("registry poisoned");
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.depth -= 1;
            if entry.depth == 0 {
                entries.remove(&self.key);
                debug!(key = %self.key, "opener released");
            }
        }
    }
}
