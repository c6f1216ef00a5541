use crate::container::{ContainerHistoryManager, SnapshotHooks};
use crate::error::HistoryError;
use crate::revision::RevisionManager;

/// A single value edited in place, with its committed revisions.
pub struct TrackedValue<T> {
    live: T,
    revisions: RevisionManager<T>,
}

/// History of one object such as level metadata or the editor selection.
///
/// Every undo point is one revision of the value, so the snapshot carries
/// no payload.
pub type ObjectHistoryManager<T> = ContainerHistoryManager<TrackedValue<T>>;

impl<T: Clone + PartialEq> SnapshotHooks for TrackedValue<T> {
    type Snapshot = ();

    fn capture(&mut self) -> Result<Option<()>, HistoryError> {
        Ok(self.revisions.put_new_entry(self.live.clone()).then_some(()))
    }

    fn undo_snapshot(&mut self, _snapshot: &()) -> Result<(), HistoryError> {
        self.revisions.undo();
        self.live = self.revisions.current().clone();
        Ok(())
    }

    fn redo_snapshot(&mut self, _snapshot: &()) -> Result<(), HistoryError> {
        self.revisions.redo();
        self.live = self.revisions.current().clone();
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        self.live != *self.revisions.current()
    }

    fn mark_saved(&mut self) -> Result<(), HistoryError> {
        self.revisions.mark_saved();
        Ok(())
    }

    fn discard_pending(&mut self) -> Result<(), HistoryError> {
        self.live = self.revisions.current().clone();
        Ok(())
    }
}

impl<T: Clone + PartialEq> ContainerHistoryManager<TrackedValue<T>> {
    /// Track `value`, treating it as the saved state.
    pub fn new(value: T) -> Self {
        Self::with_hooks(TrackedValue {
            live: value.clone(),
            revisions: RevisionManager::new(value),
        })
    }

    pub fn value(&self) -> &T {
        &self.hooks().live
    }

    /// Edit the live value. The edit is pending until the next undo point.
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.hooks_mut().live
    }

    pub fn set(&mut self, value: T) {
        self.hooks_mut().live = value;
    }

    /// Value as of the last undo point.
    pub fn committed(&self) -> &T {
        self.hooks().revisions.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::HistoryManager;

    #[test]
    fn unchanged_value_commits_nothing() {
        let mut obj = ObjectHistoryManager::new(String::from("level"));
        assert!(!obj.create_undo_point().unwrap());
        obj.set("level".into());
        assert!(!obj.changed());
        assert!(!obj.create_undo_point().unwrap());
    }

    #[test]
    fn value_edits_undo_and_redo() {
        let mut obj = ObjectHistoryManager::new(1u8);
        obj.set(2);
        obj.create_undo_point().unwrap();
        *obj.value_mut() += 1;
        obj.create_undo_point().unwrap();
        assert_eq!(obj.undo_count(), 2);

        obj.undo().unwrap();
        assert_eq!(*obj.value(), 2);
        obj.undo().unwrap();
        assert_eq!(*obj.value(), 1);
        obj.redo().unwrap();
        obj.redo().unwrap();
        assert_eq!(*obj.value(), 3);
    }

    #[test]
    fn restore_returns_to_committed_value() {
        let mut obj = ObjectHistoryManager::new(vec![1, 2]);
        obj.value_mut().push(3);
        assert!(obj.changed());
        obj.restore_last_undo_point().unwrap();
        assert_eq!(obj.value(), &vec![1, 2]);
        assert_eq!(obj.committed(), &vec![1, 2]);
        assert!(!obj.changed());
    }

    #[test]
    fn save_clears_changed() {
        let mut obj = ObjectHistoryManager::new(0i32);
        obj.set(5);
        obj.create_undo_point().unwrap();
        assert!(obj.changed());
        obj.mark_saved().unwrap();
        assert!(!obj.changed());
        obj.undo().unwrap();
        assert!(obj.changed());
    }
}
