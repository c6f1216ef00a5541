use crate::manager::ManagerId;

/// Errors raised by history managers.
///
/// Wiring mistakes (duplicate registration, snapshots naming unknown
/// managers) and failures reported by sub-managers both surface here.
/// Nothing in this crate swallows them.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history manager {0} is already registered")]
    DuplicateRegistration(ManagerId),
    #[error("history manager {0} was dropped by its owner")]
    ManagerDropped(ManagerId),
    #[error("history manager {0} is already borrowed")]
    ManagerBusy(ManagerId),
    #[error("snapshot references unregistered history manager {0}")]
    UnknownManager(ManagerId),
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
    #[error("entry {0} does not exist")]
    EntryNotFound(String),
}
