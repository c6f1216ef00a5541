use crate::error::HistoryError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Anything that keeps an undo/redo history over its own slice of state.
///
/// Calling any method redundantly must be harmless: `create_undo_point`
/// with nothing pending returns `Ok(false)`, `undo` at the start and `redo`
/// at the tail do nothing.
pub trait HistoryManager {
    /// Whether the state differs from the last save or has uncommitted edits.
    fn changed(&self) -> bool;

    /// Commit pending state as a new undo point.
    ///
    /// Returns `true` only if a point was actually created.
    fn create_undo_point(&mut self) -> Result<bool, HistoryError>;

    /// Revert the most recent undo point.
    fn undo(&mut self) -> Result<(), HistoryError>;

    /// Re-apply the next undo point.
    fn redo(&mut self) -> Result<(), HistoryError>;

    /// Record the current position as the saved state.
    fn mark_saved(&mut self) -> Result<(), HistoryError>;

    /// Drop uncommitted edits, returning to the last undo point.
    fn restore_last_undo_point(&mut self) -> Result<(), HistoryError>;
}

/// How owners hand sub-managers to a [`crate::MetaHistoryManager`].
pub type SharedManager = Rc<RefCell<dyn HistoryManager>>;

/// Opaque handle to a sub-manager registered with a meta-manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerId(pub(crate) usize);

impl ManagerId {
    /// Registration index, in order of `register` calls.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
