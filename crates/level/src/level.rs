use crate::chunk::{Chunk, EntityData, LevelMetadata};
use crate::seed::{EntityRecord, LevelSeed, PlacedBlock};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use strata_common::{
    Block, BlockPos, CHUNK_SIZE, ChunkKey, Dimension, EntityId, SelectionBox, Transform,
};
use strata_history::{
    DatabaseHistoryManager, HistoryError, HistoryManager, ManagerScope, MetaHistoryManager,
    ObjectHistoryManager,
};
use tracing::{debug, info};

/// Largest number of blocks a single `fill` may touch.
pub const MAX_FILL_VOLUME: u64 = 1 << 22;

pub type ChunkHistory = DatabaseHistoryManager<ChunkKey, Chunk>;
pub type EntityHistory = DatabaseHistoryManager<EntityId, EntityData>;
type MetadataHistory = ObjectHistoryManager<LevelMetadata>;
type SelectionHistory = ObjectHistoryManager<Option<SelectionBox>>;

/// Errors from level edits and history operations.
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),
    #[error("chunk {0} not found")]
    ChunkNotFound(ChunkKey),
    #[error("fill of {volume} blocks exceeds the limit of {limit}")]
    FillTooLarge { volume: u64, limit: u64 },
}

/// An editable level.
///
/// Chunks and entities are world data; metadata and the selection are not.
/// Each lives in its own sub-manager, owned here and registered with one
/// meta-manager so a single undo/redo timeline spans all of them.
pub struct Level {
    history: MetaHistoryManager,
    chunks: Rc<RefCell<ChunkHistory>>,
    entities: Rc<RefCell<EntityHistory>>,
    metadata: Rc<RefCell<MetadataHistory>>,
    selection: Rc<RefCell<SelectionHistory>>,
}

impl Level {
    /// Create an empty level.
    pub fn new(metadata: LevelMetadata) -> Result<Self, LevelError> {
        Self::assemble(
            ChunkHistory::new(),
            EntityHistory::new(),
            MetadataHistory::new(metadata),
        )
    }

    /// Load a level from its serialized description. The loaded state counts
    /// as saved.
    pub fn from_seed(seed: LevelSeed) -> Result<Self, LevelError> {
        let mut chunks: std::collections::BTreeMap<ChunkKey, Chunk> = Default::default();
        for placed in seed.blocks {
            chunks
                .entry(placed.pos.chunk_key(placed.dimension))
                .or_default()
                .set_block(placed.pos, placed.block);
        }
        let entities = seed
            .entities
            .into_iter()
            .map(|record| (record.id, record.data));
        Self::assemble(
            ChunkHistory::with_entries(chunks),
            EntityHistory::with_entries(entities),
            MetadataHistory::new(seed.metadata),
        )
    }

    fn assemble(
        chunks: ChunkHistory,
        entities: EntityHistory,
        metadata: MetadataHistory,
    ) -> Result<Self, LevelError> {
        let level = Self {
            history: MetaHistoryManager::new(),
            chunks: Rc::new(RefCell::new(chunks)),
            entities: Rc::new(RefCell::new(entities)),
            metadata: Rc::new(RefCell::new(metadata)),
            selection: Rc::new(RefCell::new(SelectionHistory::new(None))),
        };
        level.wire()
    }

    fn wire(mut self) -> Result<Self, LevelError> {
        self.history.register(&self.chunks, true)?;
        self.history.register(&self.entities, true)?;
        self.history.register(&self.metadata, false)?;
        self.history.register(&self.selection, false)?;
        Ok(self)
    }

    /// Serialize the live state, including uncommitted edits.
    pub fn export(&self) -> LevelSeed {
        let chunks = self.chunks.borrow();
        let blocks = chunks
            .entries()
            .into_iter()
            .flat_map(|(key, chunk)| {
                chunk.blocks().map(move |(pos, block)| PlacedBlock {
                    dimension: key.dimension,
                    pos: *pos,
                    block: block.clone(),
                })
            })
            .collect();
        let entities = self
            .entities
            .borrow()
            .entries()
            .into_iter()
            .map(|(id, data)| EntityRecord {
                id: *id,
                data: data.clone(),
            })
            .collect();
        LevelSeed {
            metadata: self.metadata(),
            blocks,
            entities,
        }
    }

    // ---- chunks ----

    pub fn block(&self, dimension: Dimension, pos: BlockPos) -> Option<Block> {
        let chunks = self.chunks.borrow();
        let chunk = chunks.get(&pos.chunk_key(dimension)).ok()?;
        chunk.block(pos).cloned()
    }

    /// Place a block, creating the chunk if it does not exist yet.
    pub fn set_block(
        &mut self,
        dimension: Dimension,
        pos: BlockPos,
        block: Block,
    ) -> Result<(), LevelError> {
        let key = pos.chunk_key(dimension);
        let mut chunks = self.chunks.borrow_mut();
        chunk_for_edit(&mut chunks, key)?.set_block(pos, block);
        Ok(())
    }

    /// Set every block in `area` to `block`. Returns the number of blocks written.
    pub fn fill(
        &mut self,
        dimension: Dimension,
        area: SelectionBox,
        block: Block,
    ) -> Result<u64, LevelError> {
        let volume = area.volume();
        if volume > MAX_FILL_VOLUME {
            return Err(LevelError::FillTooLarge {
                volume,
                limit: MAX_FILL_VOLUME,
            });
        }
        if volume == 0 {
            return Ok(0);
        }

        let mut chunks = self.chunks.borrow_mut();
        let first = area.min.chunk_key(dimension);
        let last = BlockPos::new(area.max.x - 1, area.min.y, area.max.z - 1).chunk_key(dimension);
        for cx in first.cx..=last.cx {
            for cz in first.cz..=last.cz {
                let key = ChunkKey::new(dimension, cx, cz);
                let part = clip_to_chunk(&area, key);
                let chunk = chunk_for_edit(&mut chunks, key)?;
                for pos in part.positions() {
                    chunk.set_block(pos, block.clone());
                }
            }
        }
        debug!(%dimension, volume, %block, "fill");
        Ok(volume)
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<Chunk> {
        self.chunks.borrow().get(&key).ok().cloned()
    }

    pub fn delete_chunk(&mut self, key: ChunkKey) -> Result<(), LevelError> {
        self.chunks
            .borrow_mut()
            .delete(&key)
            .map_err(|_| LevelError::ChunkNotFound(key))
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.borrow().len()
    }

    // ---- entities ----

    /// Spawn a new entity. Returns its id.
    pub fn spawn(
        &mut self,
        dimension: Dimension,
        kind: impl Into<String>,
        transform: Transform,
    ) -> EntityId {
        let id = EntityId::new();
        self.entities.borrow_mut().put(
            id,
            EntityData {
                dimension,
                kind: kind.into(),
                transform,
            },
        );
        id
    }

    /// Remove an entity. Returns the data it had.
    pub fn despawn(&mut self, id: EntityId) -> Result<EntityData, LevelError> {
        let mut entities = self.entities.borrow_mut();
        let data = entities
            .get(&id)
            .map_err(|_| LevelError::EntityNotFound(id))?
            .clone();
        entities.delete(&id)?;
        Ok(data)
    }

    pub fn set_transform(&mut self, id: EntityId, transform: Transform) -> Result<(), LevelError> {
        let mut entities = self.entities.borrow_mut();
        let data = entities
            .get_mut(&id)
            .map_err(|_| LevelError::EntityNotFound(id))?;
        data.transform = transform;
        Ok(())
    }

    pub fn entity(&self, id: EntityId) -> Option<EntityData> {
        self.entities.borrow().get(&id).ok().cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.borrow().len()
    }

    // ---- metadata & selection ----

    pub fn metadata(&self) -> LevelMetadata {
        self.metadata.borrow().value().clone()
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.metadata.borrow_mut().value_mut().name = name.into();
    }

    pub fn set_spawn(&mut self, spawn: BlockPos) {
        self.metadata.borrow_mut().value_mut().spawn = spawn;
    }

    pub fn selection(&self) -> Option<SelectionBox> {
        *self.selection.borrow().value()
    }

    pub fn select(&mut self, selection: Option<SelectionBox>) {
        self.selection.borrow_mut().set(selection);
    }

    // ---- history ----

    /// Commit staged edits of the sub-managers in `scope` as one undo point.
    pub fn create_undo_point(&mut self, scope: ManagerScope) -> Result<bool, LevelError> {
        Ok(self.history.create_undo_point_in(scope)?)
    }

    pub fn undo(&mut self) -> Result<(), LevelError> {
        Ok(self.history.undo()?)
    }

    pub fn redo(&mut self) -> Result<(), LevelError> {
        Ok(self.history.redo()?)
    }

    /// Whether world data differs from the last save.
    pub fn changed(&self) -> bool {
        self.history.changed()
    }

    pub fn changed_in(&self, scope: ManagerScope) -> bool {
        self.history.changed_in(scope)
    }

    /// Record the current state as saved across every sub-manager.
    pub fn mark_saved(&mut self) -> Result<(), LevelError> {
        self.history.mark_saved()?;
        info!(name = %self.metadata().name, "level marked saved");
        Ok(())
    }

    /// Drop every uncommitted edit.
    pub fn restore_last_undo_point(&mut self) -> Result<(), LevelError> {
        Ok(self.history.restore_last_undo_point()?)
    }

    pub fn undo_count(&self) -> usize {
        self.history.undo_count()
    }

    pub fn redo_count(&self) -> usize {
        self.history.redo_count()
    }

    pub fn unsaved_changes(&self) -> usize {
        self.history.unsaved_changes()
    }

    /// Chunks whose committed state differs from the last save.
    pub fn unsaved_chunks(&self) -> Vec<ChunkKey> {
        self.chunks.borrow().unsaved_keys()
    }

    pub fn history(&self) -> &MetaHistoryManager {
        &self.history
    }

    pub fn summary(&self) -> LevelSummary {
        LevelSummary {
            name: self.metadata().name,
            chunk_count: self.chunk_count(),
            entity_count: self.entity_count(),
            undo_count: self.undo_count(),
            redo_count: self.redo_count(),
            unsaved_changes: self.unsaved_changes(),
            changed: self.changed_in(ManagerScope::All),
        }
    }

    /// Deterministic hash of the live state for comparison.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        let seed = self.export();
        mix(&mut h, seed.metadata.name.as_bytes());
        for v in [seed.metadata.spawn.x, seed.metadata.spawn.y, seed.metadata.spawn.z] {
            mix(&mut h, &v.to_le_bytes());
        }
        for placed in &seed.blocks {
            mix(&mut h, placed.dimension.as_str().as_bytes());
            for v in [placed.pos.x, placed.pos.y, placed.pos.z] {
                mix(&mut h, &v.to_le_bytes());
            }
            mix(&mut h, placed.block.name().as_bytes());
        }
        for record in &seed.entities {
            let t = record.data.transform;
            mix(&mut h, record.id.0.as_bytes());
            mix(&mut h, record.data.dimension.as_str().as_bytes());
            mix(&mut h, record.data.kind.as_bytes());
            for f in t.position.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
            for f in t.rotation.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
            for f in t.scale.to_array() {
                mix(&mut h, &f.to_le_bytes());
            }
        }
        if let Some(sel) = self.selection() {
            for v in [sel.min.x, sel.min.y, sel.min.z, sel.max.x, sel.max.y, sel.max.z] {
                mix(&mut h, &v.to_le_bytes());
            }
        }
        h
    }
}

/// Stage `key` for editing, creating an empty chunk when it is missing.
fn chunk_for_edit(chunks: &mut ChunkHistory, key: ChunkKey) -> Result<&mut Chunk, LevelError> {
    if !chunks.contains(&key) {
        chunks.put(key, Chunk::new());
    }
    Ok(chunks.get_mut(&key)?)
}

/// Part of `area` inside the column of chunk `key`.
fn clip_to_chunk(area: &SelectionBox, key: ChunkKey) -> SelectionBox {
    let (ox, oz) = key.origin();
    SelectionBox {
        min: BlockPos::new(area.min.x.max(ox), area.min.y, area.min.z.max(oz)),
        max: BlockPos::new(
            area.max.x.min(ox.saturating_add(CHUNK_SIZE)),
            area.max.y,
            area.max.z.min(oz.saturating_add(CHUNK_SIZE)),
        ),
    }
}

/// Summary of level and history state.
#[derive(Debug, Clone)]
pub struct LevelSummary {
    pub name: String,
    pub chunk_count: usize,
    pub entity_count: usize,
    pub undo_count: usize,
    pub redo_count: usize,
    pub unsaved_changes: usize,
    pub changed: bool,
}

impl fmt::Display for LevelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Level {:?}: chunks={} entities={} undo={} redo={} unsaved={} changed={}",
            self.name,
            self.chunk_count,
            self.entity_count,
            self.undo_count,
            self.redo_count,
            self.unsaved_changes,
            self.changed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const OW: Dimension = Dimension::Overworld;

    fn stone() -> Block {
        Block::new("stone")
    }

    fn level() -> Level {
        Level::new(LevelMetadata::default()).unwrap()
    }

    #[test]
    fn sub_managers_are_registered_by_pool() {
        let level = level();
        let history = level.history();
        assert_eq!(history.registered(), 4);
        assert_eq!(history.managers(ManagerScope::World).len(), 2);
        assert_eq!(history.managers(ManagerScope::NonWorld).len(), 2);
    }

    #[test]
    fn block_edit_undo_redo() {
        let mut level = level();
        let pos = BlockPos::new(3, 64, -20);
        level.set_block(OW, pos, stone()).unwrap();
        assert!(level.create_undo_point(ManagerScope::All).unwrap());
        assert_eq!(level.block(OW, pos), Some(stone()));

        level.undo().unwrap();
        assert_eq!(level.block(OW, pos), None);
        assert_eq!(level.chunk_count(), 0);

        level.redo().unwrap();
        assert_eq!(level.block(OW, pos), Some(stone()));
    }

    #[test]
    fn non_world_commit_leaves_world_edits_pending() {
        let mut level = level();
        level.set_block(OW, BlockPos::new(0, 0, 0), stone()).unwrap();
        level.rename("Renamed");

        assert!(level.create_undo_point(ManagerScope::NonWorld).unwrap());
        assert_eq!(level.undo_count(), 1);

        level.undo().unwrap();
        assert_eq!(level.metadata().name, "Untitled");
        assert_eq!(
            level.block(OW, BlockPos::new(0, 0, 0)),
            Some(stone()),
            "pending chunk edit is untouched by a metadata undo"
        );

        assert!(level.create_undo_point(ManagerScope::All).unwrap());
        assert_eq!(level.redo_count(), 0);
    }

    #[test]
    fn commit_without_edits_does_not_grow_history() {
        let mut level = level();
        assert!(!level.create_undo_point(ManagerScope::All).unwrap());
        level.set_spawn(BlockPos::new(0, 64, 0));
        assert!(!level.create_undo_point(ManagerScope::All).unwrap());
        assert_eq!(level.undo_count(), 0);
    }

    #[test]
    fn undo_all_then_redo_all_restores_state() {
        let mut level = level();
        let pig = level.spawn(OW, "minecraft:pig", Transform::default());
        level.create_undo_point(ManagerScope::All).unwrap();

        let area = SelectionBox::new(BlockPos::new(-2, 60, -2), BlockPos::new(18, 62, 3));
        level.fill(OW, area, stone()).unwrap();
        level.create_undo_point(ManagerScope::All).unwrap();

        level
            .set_transform(pig, Transform::at(Vec3::new(4.0, 65.0, 1.0)))
            .unwrap();
        level.select(Some(SelectionBox::new(
            BlockPos::new(0, 0, 0),
            BlockPos::new(2, 2, 2),
        )));
        level.create_undo_point(ManagerScope::All).unwrap();

        let before = level.state_hash();
        for _ in 0..3 {
            level.undo().unwrap();
        }
        assert_eq!(level.entity_count(), 0);
        assert_eq!(level.chunk_count(), 0);
        assert_eq!(level.selection(), None);

        for _ in 0..3 {
            level.redo().unwrap();
        }
        assert_eq!(level.state_hash(), before);
    }

    #[test]
    fn fill_spans_chunk_boundaries() {
        let mut level = level();
        let area = SelectionBox::new(BlockPos::new(-1, 0, 15), BlockPos::new(17, 1, 17));
        let written = level.fill(OW, area, stone()).unwrap();
        assert_eq!(written, 18 * 2);
        // x: -1..17 spans chunks -1, 0, 1; z: 15..17 spans chunks 0, 1
        assert_eq!(level.chunk_count(), 6);
        assert_eq!(level.block(OW, BlockPos::new(16, 0, 16)), Some(stone()));
        assert_eq!(level.block(OW, BlockPos::new(17, 0, 16)), None);
    }

    #[test]
    fn fill_in_last_chunk_column_before_i32_max() {
        let mut level = level();
        let area = SelectionBox::new(
            BlockPos::new(i32::MAX - 7, 0, 0),
            BlockPos::new(i32::MAX, 1, 1),
        );
        assert_eq!(level.fill(OW, area, stone()).unwrap(), 7);
        assert_eq!(level.chunk_count(), 1);
        assert_eq!(level.block(OW, BlockPos::new(i32::MAX - 1, 0, 0)), Some(stone()));
    }

    #[test]
    fn full_width_fill_is_rejected_not_overflowed() {
        let mut level = level();
        let area = SelectionBox::new(
            BlockPos::new(i32::MIN, 0, 0),
            BlockPos::new(i32::MAX, 1, 1),
        );
        assert!(matches!(
            level.fill(OW, area, stone()),
            Err(LevelError::FillTooLarge { .. })
        ));
        assert_eq!(level.chunk_count(), 0);
    }

    #[test]
    fn oversized_fill_is_rejected() {
        let mut level = level();
        let area = SelectionBox::new(BlockPos::new(0, 0, 0), BlockPos::new(1024, 256, 1024));
        assert!(matches!(
            level.fill(OW, area, stone()),
            Err(LevelError::FillTooLarge { .. })
        ));
        assert!(!level.changed());
    }

    #[test]
    fn entity_lifecycle_is_undoable() {
        let mut level = level();
        let id = level.spawn(OW, "minecraft:cow", Transform::default());
        level.create_undo_point(ManagerScope::All).unwrap();

        let data = level.despawn(id).unwrap();
        assert_eq!(data.kind, "minecraft:cow");
        level.create_undo_point(ManagerScope::All).unwrap();
        assert!(level.entity(id).is_none());

        level.undo().unwrap();
        assert_eq!(level.entity(id).map(|e| e.kind), Some("minecraft:cow".into()));
        assert!(matches!(
            level.set_transform(EntityId::new(), Transform::default()),
            Err(LevelError::EntityNotFound(_))
        ));
    }

    #[test]
    fn save_tracks_world_changes_and_unsaved_chunks() {
        let mut level = level();
        level.set_block(OW, BlockPos::new(40, 5, 0), stone()).unwrap();
        level.create_undo_point(ManagerScope::All).unwrap();
        assert!(level.changed());
        assert_eq!(level.unsaved_chunks(), vec![ChunkKey::new(OW, 2, 0)]);

        level.mark_saved().unwrap();
        assert!(!level.changed());
        assert!(level.unsaved_chunks().is_empty());

        level.undo().unwrap();
        assert!(level.changed());
        assert_eq!(level.unsaved_chunks(), vec![ChunkKey::new(OW, 2, 0)]);
    }

    #[test]
    fn restore_discards_staged_edits_everywhere() {
        let mut level = level();
        level.set_block(OW, BlockPos::new(1, 1, 1), stone()).unwrap();
        level.rename("Scratch");
        level.select(Some(SelectionBox::default()));

        level.restore_last_undo_point().unwrap();
        assert_eq!(level.chunk_count(), 0);
        assert_eq!(level.metadata(), LevelMetadata::default());
        assert_eq!(level.selection(), None);
        assert!(!level.changed_in(ManagerScope::All));
    }

    #[test]
    fn seed_round_trip_matches_state() {
        let mut level = level();
        level
            .set_block(Dimension::Nether, BlockPos::new(-5, 30, 9), Block::new("netherrack"))
            .unwrap();
        level.spawn(OW, "minecraft:sheep", Transform::at(Vec3::new(1.0, 2.0, 3.0)));
        level.rename("Copy");

        let copy = Level::from_seed(level.export()).unwrap();
        assert_eq!(copy.state_hash(), level.state_hash());
        assert!(!copy.changed_in(ManagerScope::All), "loaded state counts as saved");
    }

    #[test]
    fn delete_missing_chunk_is_reported() {
        let mut level = level();
        let key = ChunkKey::new(OW, 9, 9);
        assert!(matches!(
            level.delete_chunk(key),
            Err(LevelError::ChunkNotFound(k)) if k == key
        ));
    }

    #[test]
    fn summary_reports_history_counts() {
        let mut level = level();
        level.rename("Summary");
        level.create_undo_point(ManagerScope::All).unwrap();
        level.undo().unwrap();
        let summary = level.summary();
        assert_eq!(summary.undo_count, 0);
        assert_eq!(summary.redo_count, 1);
        assert!(summary.to_string().contains("redo=1"));
    }
}
