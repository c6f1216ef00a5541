use crate::container::{ContainerHistoryManager, SnapshotHooks};
use crate::error::HistoryError;
use crate::manager::{HistoryManager, ManagerId, SharedManager};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Which registration pools an operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagerScope {
    /// Managers tracking world data (chunks, entities).
    World,
    /// Managers tracking everything else (metadata, selection).
    NonWorld,
    All,
}

impl ManagerScope {
    pub fn includes_world(&self) -> bool {
        matches!(self, Self::World | Self::All)
    }

    pub fn includes_non_world(&self) -> bool {
        matches!(self, Self::NonWorld | Self::All)
    }
}

/// The sub-managers that took part in one meta undo point, in sweep order.
pub type MetaSnapshot = Box<[ManagerId]>;

struct Registration {
    manager: Weak<RefCell<dyn HistoryManager>>,
    is_world: bool,
}

/// Registered sub-managers split into world and non-world pools.
///
/// Pools are append-only. Each entry is a weak handle: the owning subsystem
/// decides how long a sub-manager lives.
#[derive(Default)]
pub struct ManagerPools {
    registrations: Vec<Registration>,
    world: Vec<ManagerId>,
    non_world: Vec<ManagerId>,
}

impl ManagerPools {
    fn register(
        &mut self,
        manager: SharedManager,
        is_world: bool,
    ) -> Result<ManagerId, HistoryError> {
        if let Some(index) = self.registrations.iter().position(|r| {
            r.manager
                .upgrade()
                .is_some_and(|existing| Rc::ptr_eq(&existing, &manager))
        }) {
            return Err(HistoryError::DuplicateRegistration(ManagerId(index)));
        }

        let id = ManagerId(self.registrations.len());
        self.registrations.push(Registration {
            manager: Rc::downgrade(&manager),
            is_world,
        });
        if is_world {
            self.world.push(id);
        } else {
            self.non_world.push(id);
        }
        debug!(%id, is_world, "history manager registered");
        Ok(id)
    }

    /// Ids in `scope`, non-world pool first, each pool in registration order.
    fn ids(&self, scope: ManagerScope) -> impl Iterator<Item = ManagerId> + '_ {
        let non_world = scope.includes_non_world().then_some(&self.non_world);
        let world = scope.includes_world().then_some(&self.world);
        non_world
            .into_iter()
            .chain(world)
            .flat_map(|pool| pool.iter().copied())
    }

    fn upgrade(&self, id: ManagerId) -> Result<SharedManager, HistoryError> {
        self.registrations
            .get(id.0)
            .ok_or(HistoryError::UnknownManager(id))?
            .manager
            .upgrade()
            .ok_or(HistoryError::ManagerDropped(id))
    }

    /// Run `op` on one sub-manager with an exclusive borrow.
    fn with_manager<T>(
        &self,
        id: ManagerId,
        op: impl FnOnce(&mut dyn HistoryManager) -> Result<T, HistoryError>,
    ) -> Result<T, HistoryError> {
        let manager = self.upgrade(id)?;
        let mut guard = manager
            .try_borrow_mut()
            .map_err(|_| HistoryError::ManagerBusy(id))?;
        op(&mut *guard)
    }

    fn for_each(
        &self,
        ids: impl IntoIterator<Item = ManagerId>,
        mut op: impl FnMut(&mut dyn HistoryManager) -> Result<(), HistoryError>,
    ) -> Result<(), HistoryError> {
        for id in ids {
            self.with_manager(id, &mut op)?;
        }
        Ok(())
    }

    fn capture_scope(&mut self, scope: ManagerScope) -> Result<Option<MetaSnapshot>, HistoryError> {
        let mut snapshot = Vec::new();
        for id in self.ids(scope) {
            let created = self.with_manager(id, |manager| manager.create_undo_point())?;
            trace!(%id, created, "sub-manager undo point");
            if created {
                snapshot.push(id);
            }
        }
        Ok((!snapshot.is_empty()).then(|| snapshot.into_boxed_slice()))
    }

    fn changed_scope(&self, scope: ManagerScope) -> bool {
        self.ids(scope).any(|id| {
            let Ok(manager) = self.upgrade(id) else {
                warn!(%id, "skipping dropped history manager in dirty check");
                return false;
            };
            let changed = match manager.try_borrow() {
                Ok(manager) => manager.changed(),
                Err(_) => {
                    warn!(%id, "skipping borrowed history manager in dirty check");
                    false
                }
            };
            changed
        })
    }
}

impl SnapshotHooks for ManagerPools {
    type Snapshot = MetaSnapshot;

    fn capture(&mut self) -> Result<Option<MetaSnapshot>, HistoryError> {
        self.capture_scope(ManagerScope::NonWorld)
    }

    fn check_snapshot(&self, snapshot: &MetaSnapshot) -> Result<(), HistoryError> {
        if snapshot.is_empty() {
            return Err(HistoryError::MalformedSnapshot(
                "meta snapshot names no managers".into(),
            ));
        }
        match snapshot.iter().find(|id| id.0 >= self.registrations.len()) {
            Some(id) => Err(HistoryError::UnknownManager(*id)),
            None => Ok(()),
        }
    }

    fn undo_snapshot(&mut self, snapshot: &MetaSnapshot) -> Result<(), HistoryError> {
        self.for_each(snapshot.iter().copied(), |manager| manager.undo())
    }

    fn redo_snapshot(&mut self, snapshot: &MetaSnapshot) -> Result<(), HistoryError> {
        self.for_each(snapshot.iter().copied(), |manager| manager.redo())
    }

    fn has_pending_changes(&self) -> bool {
        self.changed_scope(ManagerScope::World)
    }

    fn mark_saved(&mut self) -> Result<(), HistoryError> {
        self.for_each(self.ids(ManagerScope::All), |manager| manager.mark_saved())
    }

    fn discard_pending(&mut self) -> Result<(), HistoryError> {
        self.for_each(self.ids(ManagerScope::All), |manager| {
            manager.restore_last_undo_point()
        })
    }
}

/// One undo/redo timeline across many independent sub-managers.
///
/// Each meta undo point records which sub-managers committed a point of
/// their own in that step; undo and redo replay only those. Sweeps are not
/// atomic: an error from one sub-manager stops the sweep and is returned
/// as is, leaving earlier sub-managers already stepped.
pub type MetaHistoryManager = ContainerHistoryManager<ManagerPools>;

impl Default for ContainerHistoryManager<ManagerPools> {
    fn default() -> Self {
        Self::with_hooks(ManagerPools::default())
    }
}

impl ContainerHistoryManager<ManagerPools> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `manager` in the world or non-world pool.
    ///
    /// Only a weak handle is kept. Registering the same instance twice, in
    /// either pool, is rejected.
    pub fn register<M>(
        &mut self,
        manager: &Rc<RefCell<M>>,
        is_world_manager: bool,
    ) -> Result<ManagerId, HistoryError>
    where
        M: HistoryManager + 'static,
    {
        let shared: SharedManager = manager.clone();
        self.hooks_mut().register(shared, is_world_manager)
    }

    /// Commit an undo point on every manager in `scope` and record those
    /// that created one. Returns `false`, leaving the timeline untouched,
    /// when none did.
    pub fn create_undo_point_in(&mut self, scope: ManagerScope) -> Result<bool, HistoryError> {
        match self.hooks_mut().capture_scope(scope)? {
            Some(snapshot) => {
                debug!(?scope, managers = snapshot.len(), "meta undo point");
                self.register_snapshot(snapshot)
            }
            None => {
                debug!(?scope, "nothing to commit");
                Ok(false)
            }
        }
    }

    /// Whether the meta timeline or any manager in `scope` is dirty.
    pub fn changed_in(&self, scope: ManagerScope) -> bool {
        self.timeline().changed() || self.hooks().changed_scope(scope)
    }

    /// Registered ids in `scope`, in sweep order.
    pub fn managers(&self, scope: ManagerScope) -> Vec<ManagerId> {
        self.hooks().ids(scope).collect()
    }

    pub fn is_world_manager(&self, id: ManagerId) -> Option<bool> {
        self.hooks().registrations.get(id.0).map(|r| r.is_world)
    }

    /// Number of registered sub-managers across both pools.
    pub fn registered(&self) -> usize {
        self.hooks().registrations.len()
    }
}
