use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strata_common::{Block, BlockPos, Dimension, Transform};

/// Block storage for one chunk column.
///
/// Positions are absolute. Air is never stored, so an empty chunk and a
/// chunk of air compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    blocks: BTreeMap<BlockPos, Block>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, pos: BlockPos) -> Option<&Block> {
        self.blocks.get(&pos)
    }

    /// Place `block` at `pos`. Placing air clears the position.
    pub fn set_block(&mut self, pos: BlockPos, block: Block) {
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = (&BlockPos, &Block)> {
        self.blocks.iter()
    }
}

/// Per-entity data stored in a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    pub dimension: Dimension,
    /// Namespaced entity type, e.g. `minecraft:pig`.
    pub kind: String,
    #[serde(default)]
    pub transform: Transform,
}

/// Level-wide settings that are not world data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelMetadata {
    pub name: String,
    pub spawn: BlockPos,
}

impl Default for LevelMetadata {
    fn default() -> Self {
        Self {
            name: "Untitled".to_owned(),
            spawn: BlockPos::new(0, 64, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn air_clears_a_position() {
        let mut chunk = Chunk::new();
        let pos = BlockPos::new(1, 2, 3);
        chunk.set_block(pos, Block::new("stone"));
        assert_eq!(chunk.block(pos), Some(&Block::new("stone")));

        chunk.set_block(pos, Block::air());
        assert!(chunk.block(pos).is_none());
        assert_eq!(chunk, Chunk::new());
    }

    #[test]
    fn blocks_iterate_in_position_order() {
        let mut chunk = Chunk::new();
        chunk.set_block(BlockPos::new(2, 0, 0), Block::new("dirt"));
        chunk.set_block(BlockPos::new(1, 5, 0), Block::new("stone"));
        let order: Vec<_> = chunk.blocks().map(|(pos, _)| pos.x).collect();
        assert_eq!(order, [1, 2]);
        assert_eq!(chunk.block_count(), 2);
    }
}
