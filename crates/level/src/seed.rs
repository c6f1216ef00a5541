use crate::chunk::{EntityData, LevelMetadata};
use serde::{Deserialize, Serialize};
use strata_common::{Block, BlockPos, Dimension, EntityId};

/// Serializable description of a whole level.
///
/// Used to load fixtures and to export the live state. Block and entity
/// lists are written in key order so equal levels export identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSeed {
    #[serde(default)]
    pub metadata: LevelMetadata,
    #[serde(default)]
    pub blocks: Vec<PlacedBlock>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedBlock {
    pub dimension: Dimension,
    pub pos: BlockPos,
    pub block: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default)]
    pub id: EntityId,
    #[serde(flatten)]
    pub data: EntityData,
}

impl LevelSeed {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_json_fills_defaults() {
        let seed = LevelSeed::from_json(r#"{ "metadata": { "name": "Test", "spawn": { "x": 1, "y": 2, "z": 3 } } }"#)
            .unwrap();
        assert_eq!(seed.metadata.name, "Test");
        assert!(seed.blocks.is_empty());
        assert!(seed.entities.is_empty());
    }

    #[test]
    fn entity_without_id_gets_one() {
        let seed = LevelSeed::from_json(
            r#"{ "entities": [ { "dimension": "overworld", "kind": "minecraft:pig" } ] }"#,
        )
        .unwrap();
        let record = &seed.entities[0];
        assert_eq!(record.data.kind, "minecraft:pig");
        assert_eq!(record.data.transform, Default::default());
        assert_eq!(seed.metadata, LevelMetadata::default());
    }

    #[test]
    fn json_round_trip_preserves_blocks() {
        let seed = LevelSeed {
            blocks: vec![PlacedBlock {
                dimension: Dimension::End,
                pos: BlockPos::new(-3, 10, 7),
                block: Block::new("end_stone"),
            }],
            ..LevelSeed::default()
        };
        let parsed = LevelSeed::from_json(&seed.to_json().unwrap()).unwrap();
        assert_eq!(parsed, seed);
    }
}
