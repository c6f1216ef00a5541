use crate::error::HistoryError;
use crate::manager::HistoryManager;
use tracing::debug;

/// Ordered snapshots plus a cursor.
///
/// The cursor counts applied snapshots: `0` means nothing can be undone,
/// `len()` means nothing can be redone. The saved position is tracked the
/// same way so `changed` reports distance from the last save rather than
/// from the last snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotTimeline<S> {
    snapshots: Vec<S>,
    cursor: usize,
    saved: usize,
    /// Steps between the saved state and a branch that was cut off by a
    /// commit made after undoing past the save.
    branch_save_count: usize,
}

impl<S> Default for SnapshotTimeline<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SnapshotTimeline<S> {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
            cursor: 0,
            saved: 0,
            branch_save_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn snapshots(&self) -> &[S] {
        &self.snapshots
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.snapshots.len() - self.cursor
    }

    /// Number of steps separating the live position from the saved one.
    pub fn unsaved_changes(&self) -> usize {
        self.cursor.abs_diff(self.saved) + self.branch_save_count
    }

    pub fn changed(&self) -> bool {
        self.unsaved_changes() > 0
    }

    /// Snapshot the cursor sits on, i.e. the one `undo` would revert.
    pub fn current(&self) -> Option<&S> {
        self.cursor
            .checked_sub(1)
            .and_then(|index| self.snapshots.get(index))
    }

    /// Append a snapshot after the cursor, discarding the redo tail.
    pub fn push(&mut self, snapshot: S) {
        if self.saved > self.cursor {
            // The saved state lives on the tail we are about to cut off.
            self.branch_save_count += self.saved - self.cursor;
            self.saved = self.cursor;
        }
        self.snapshots.truncate(self.cursor);
        self.snapshots.push(snapshot);
        self.cursor += 1;
    }

    /// Move the cursor back one step. Returns `false` at the start.
    pub fn retreat(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Move the cursor forward one step and return the snapshot stepped into.
    pub fn advance(&mut self) -> Option<&S> {
        if self.cursor >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor - 1)
    }

    pub fn mark_saved(&mut self) {
        self.saved = self.cursor;
        self.branch_save_count = 0;
    }
}

/// State capture and replay for a [`ContainerHistoryManager`].
///
/// The container owns the stack mechanics. Implementors decide what a
/// snapshot holds and how to revert or re-apply one.
pub trait SnapshotHooks {
    type Snapshot;

    /// Collect pending state into a snapshot, or `None` when nothing changed.
    fn capture(&mut self) -> Result<Option<Self::Snapshot>, HistoryError>;

    /// Reject snapshots that this container could not replay.
    fn check_snapshot(&self, _snapshot: &Self::Snapshot) -> Result<(), HistoryError> {
        Ok(())
    }

    /// Revert the effect of `snapshot`.
    fn undo_snapshot(&mut self, snapshot: &Self::Snapshot) -> Result<(), HistoryError>;

    /// Re-apply the effect of `snapshot`.
    fn redo_snapshot(&mut self, snapshot: &Self::Snapshot) -> Result<(), HistoryError>;

    /// Live edits exist that have not been captured yet.
    fn has_pending_changes(&self) -> bool {
        false
    }

    fn mark_saved(&mut self) -> Result<(), HistoryError> {
        Ok(())
    }

    /// Throw away live edits made since the last capture.
    fn discard_pending(&mut self) -> Result<(), HistoryError>;
}

/// Undo/redo stack over opaque snapshots.
pub struct ContainerHistoryManager<H: SnapshotHooks> {
    timeline: SnapshotTimeline<H::Snapshot>,
    hooks: H,
}

impl<H: SnapshotHooks> ContainerHistoryManager<H> {
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            timeline: SnapshotTimeline::new(),
            hooks,
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    pub fn timeline(&self) -> &SnapshotTimeline<H::Snapshot> {
        &self.timeline
    }

    pub fn undo_count(&self) -> usize {
        self.timeline.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.timeline.redo_count()
    }

    pub fn unsaved_changes(&self) -> usize {
        self.timeline.unsaved_changes()
    }

    /// Validate `snapshot` and append it at the cursor.
    pub fn register_snapshot(&mut self, snapshot: H::Snapshot) -> Result<bool, HistoryError> {
        self.hooks.check_snapshot(&snapshot)?;
        self.timeline.push(snapshot);
        debug!(
            cursor = self.timeline.cursor(),
            len = self.timeline.len(),
            "undo point created"
        );
        Ok(true)
    }
}

impl<H: SnapshotHooks> HistoryManager for ContainerHistoryManager<H> {
    fn changed(&self) -> bool {
        self.timeline.changed() || self.hooks.has_pending_changes()
    }

    fn create_undo_point(&mut self) -> Result<bool, HistoryError> {
        match self.hooks.capture()? {
            Some(snapshot) => self.register_snapshot(snapshot),
            None => Ok(false),
        }
    }

    fn undo(&mut self) -> Result<(), HistoryError> {
        let Some(snapshot) = self.timeline.current() else {
            return Ok(());
        };
        self.hooks.undo_snapshot(snapshot)?;
        self.timeline.retreat();
        Ok(())
    }

    fn redo(&mut self) -> Result<(), HistoryError> {
        let Some(snapshot) = self.timeline.advance() else {
            return Ok(());
        };
        self.hooks.redo_snapshot(snapshot)
    }

    fn mark_saved(&mut self) -> Result<(), HistoryError> {
        self.hooks.mark_saved()?;
        self.timeline.mark_saved();
        Ok(())
    }

    fn restore_last_undo_point(&mut self) -> Result<(), HistoryError> {
        self.hooks.discard_pending()
    }
}
