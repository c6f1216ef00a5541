use crate::container::{ContainerHistoryManager, SnapshotHooks};
use crate::error::HistoryError;
use crate::revision::RevisionManager;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::trace;

/// Keyed entries with per-entry revisions.
///
/// Live edits sit in `pending` (`None` marks a deletion) until the next
/// undo point moves them into the revision managers. A snapshot is the
/// list of keys whose value actually changed in that step. Undo and redo
/// drop pending edits of the keys they step; other keys keep theirs.
pub struct EntryStore<K, V> {
    pending: BTreeMap<K, Option<V>>,
    revisions: BTreeMap<K, RevisionManager<Option<V>>>,
}

/// History of a keyed collection such as chunks or entities.
pub type DatabaseHistoryManager<K, V> = ContainerHistoryManager<EntryStore<K, V>>;

impl<K, V> Default for EntryStore<K, V> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            revisions: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> EntryStore<K, V> {
    fn committed(&self, key: &K) -> Option<&V> {
        self.revisions
            .get(key)
            .and_then(|revisions| revisions.current().as_ref())
    }

    fn live(&self, key: &K) -> Option<&V> {
        match self.pending.get(key) {
            Some(entry) => entry.as_ref(),
            None => self.committed(key),
        }
    }
}

impl<K, V> SnapshotHooks for EntryStore<K, V>
where
    K: Ord + Clone + Debug,
    V: Clone + PartialEq,
{
    type Snapshot = Box<[K]>;

    fn capture(&mut self) -> Result<Option<Box<[K]>>, HistoryError> {
        let mut changed = Vec::new();
        for (key, entry) in std::mem::take(&mut self.pending) {
            let revisions = self
                .revisions
                .entry(key.clone())
                .or_insert_with(|| RevisionManager::new(None));
            if revisions.put_new_entry(entry) {
                trace!(?key, "entry revised");
                changed.push(key);
            }
        }
        Ok((!changed.is_empty()).then(|| changed.into_boxed_slice()))
    }

    fn check_snapshot(&self, snapshot: &Box<[K]>) -> Result<(), HistoryError> {
        match snapshot.iter().find(|key| !self.revisions.contains_key(key)) {
            Some(key) => Err(HistoryError::MalformedSnapshot(format!(
                "no revisions tracked for {key:?}"
            ))),
            None => Ok(()),
        }
    }

    fn undo_snapshot(&mut self, snapshot: &Box<[K]>) -> Result<(), HistoryError> {
        for key in snapshot.iter() {
            self.pending.remove(key);
            self.revisions
                .get_mut(key)
                .ok_or_else(|| not_found(key))?
                .undo();
        }
        Ok(())
    }

    fn redo_snapshot(&mut self, snapshot: &Box<[K]>) -> Result<(), HistoryError> {
        for key in snapshot.iter() {
            self.pending.remove(key);
            self.revisions
                .get_mut(key)
                .ok_or_else(|| not_found(key))?
                .redo();
        }
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        self.pending
            .iter()
            .any(|(key, entry)| self.committed(key) != entry.as_ref())
    }

    fn mark_saved(&mut self) -> Result<(), HistoryError> {
        for revisions in self.revisions.values_mut() {
            revisions.mark_saved();
        }
        Ok(())
    }

    fn discard_pending(&mut self) -> Result<(), HistoryError> {
        self.pending.clear();
        Ok(())
    }
}

impl<K, V> Default for ContainerHistoryManager<EntryStore<K, V>>
where
    K: Ord + Clone + Debug,
    V: Clone + PartialEq,
{
    fn default() -> Self {
        Self::with_hooks(EntryStore::default())
    }
}

impl<K, V> ContainerHistoryManager<EntryStore<K, V>>
where
    K: Ord + Clone + Debug,
    V: Clone + PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking with entries loaded from storage as the saved state.
    pub fn with_entries(entries: impl IntoIterator<Item = (K, V)>) -> Self {
        let mut store = EntryStore::default();
        for (key, value) in entries {
            store
                .revisions
                .insert(key, RevisionManager::new(Some(value)));
        }
        Self::with_hooks(store)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.hooks().live(key).is_some()
    }

    /// Live value of `key`, including uncommitted edits.
    pub fn get(&self, key: &K) -> Result<&V, HistoryError> {
        self.hooks().live(key).ok_or_else(|| not_found(key))
    }

    /// Mutable access to `key`. The entry is staged as pending; committing
    /// it unchanged does not create an undo point.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, HistoryError> {
        let store = self.hooks_mut();
        if !store.pending.contains_key(key) {
            let current = store.committed(key).cloned().ok_or_else(|| not_found(key))?;
            store.pending.insert(key.clone(), Some(current));
        }
        match store.pending.get_mut(key) {
            Some(Some(value)) => Ok(value),
            _ => Err(not_found(key)),
        }
    }

    pub fn put(&mut self, key: K, value: V) {
        self.hooks_mut().pending.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: &K) -> Result<(), HistoryError> {
        if !self.contains(key) {
            return Err(not_found(key));
        }
        self.hooks_mut().pending.insert(key.clone(), None);
        Ok(())
    }

    /// Every live entry in key order.
    pub fn entries(&self) -> BTreeMap<&K, &V> {
        let store = self.hooks();
        store
            .revisions
            .keys()
            .chain(store.pending.keys())
            .filter_map(|key| store.live(key).map(|value| (key, value)))
            .collect()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries().into_keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Committed entries whose current revision differs from the saved one.
    pub fn unsaved_keys(&self) -> Vec<K> {
        self.hooks()
            .revisions
            .iter()
            .filter(|(_, revisions)| revisions.changed())
            .map(|(key, _)| key.clone())
            .collect()
    }
}

fn not_found<K: Debug>(key: &K) -> HistoryError {
    HistoryError::EntryNotFound(format!("{key:?}"))
}
