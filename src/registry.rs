use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

use crate::peer::SessionHandle;

/// Nickname -> session directory shared by every connection.
///
/// Clones share the same map. Mutations lock only the shard owning the key,
/// so registration never waits on an unrelated broadcast.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<DashMap<String, SessionHandle>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `handle` under `nickname` unless the nickname is taken.
    ///
    /// The check and the insert happen under one shard lock, so among
    /// concurrent callers with the same nickname exactly one gets `true`.
    pub fn try_register(&self, nickname: &str, handle: SessionHandle) -> bool {
        match self.clients.entry(nickname.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    /// Removing an absent nickname is a no-op.
    pub fn remove(&self, nickname: &str) -> Option<SessionHandle> {
        self.clients.remove(nickname).map(|(_, handle)| handle)
    }

    /// Clones every entry out of the map so callers never hold a shard lock
    /// while they work through the result.
    pub fn snapshot(&self) -> Vec<(String, SessionHandle)> {
        self.clients
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, nickname: &str) -> Option<SessionHandle> {
        self.clients.get(nickname).map(|guard| guard.clone())
    }

    pub fn contains(&self, nickname: &str) -> bool {
        self.clients.contains_key(nickname)
    }

    pub fn nicknames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
