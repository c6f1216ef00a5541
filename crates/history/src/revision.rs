/// Linear revision list for a single entry.
///
/// Index `0` holds the value the entry had when tracking started. The saved
/// index becomes `None` once the saved revision has been cut off by a new
/// branch, after which the entry reports `changed` until the next save.
#[derive(Debug, Clone)]
pub struct RevisionManager<T> {
    revisions: Vec<T>,
    current: usize,
    saved: Option<usize>,
}

impl<T> RevisionManager<T> {
    /// Start tracking with `original` as the saved revision.
    pub fn new(original: T) -> Self {
        Self {
            revisions: vec![original],
            current: 0,
            saved: Some(0),
        }
    }

    pub fn current(&self) -> &T {
        &self.revisions[self.current]
    }

    pub fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    pub fn undo(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    pub fn redo(&mut self) {
        if self.current + 1 < self.revisions.len() {
            self.current += 1;
        }
    }

    pub fn mark_saved(&mut self) {
        self.saved = Some(self.current);
    }

    /// The current revision is not the saved one.
    pub fn changed(&self) -> bool {
        self.saved != Some(self.current)
    }
}

impl<T: PartialEq> RevisionManager<T> {
    /// Append `entry` as the newest revision if it differs from the current one.
    ///
    /// Revisions after the current one are discarded first. Returns whether a
    /// revision was added.
    pub fn put_new_entry(&mut self, entry: T) -> bool {
        if *self.current() == entry {
            return false;
        }
        self.revisions.truncate(self.current + 1);
        if self.saved.is_some_and(|saved| saved > self.current) {
            self.saved = None;
        }
        self.revisions.push(entry);
        self.current += 1;
        true
    }
}
