use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Width and depth of a chunk column in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// Unique identifier for an entity in a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spatial transform of an entity: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform placed at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// The dimension a chunk or entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overworld => "overworld",
            Self::Nether => "nether",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown dimension {0:?}")]
pub struct ParseDimensionError(pub String);

impl FromStr for Dimension {
    type Err = ParseDimensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overworld" => Ok(Self::Overworld),
            "nether" | "the_nether" => Ok(Self::Nether),
            "end" | "the_end" => Ok(Self::End),
            other => Err(ParseDimensionError(other.to_owned())),
        }
    }
}

/// Absolute block coordinate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Key of the chunk column containing this block.
    pub fn chunk_key(&self, dimension: Dimension) -> ChunkKey {
        ChunkKey {
            dimension,
            cx: self.x.div_euclid(CHUNK_SIZE),
            cz: self.z.div_euclid(CHUNK_SIZE),
        }
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Identifies a chunk column within a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub dimension: Dimension,
    pub cx: i32,
    pub cz: i32,
}

impl ChunkKey {
    pub fn new(dimension: Dimension, cx: i32, cz: i32) -> Self {
        Self { dimension, cx, cz }
    }

    /// Lowest block x/z coordinate covered by this chunk.
    pub fn origin(&self) -> (i32, i32) {
        (self.cx * CHUNK_SIZE, self.cz * CHUNK_SIZE)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}, {}]", self.dimension, self.cx, self.cz)
    }
}

/// A namespaced block state name such as `minecraft:stone`.
///
/// Air is represented by absence in chunk storage; [`Block::is_air`] lets
/// callers detect it before writing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Block(pub String);

impl Block {
    pub const AIR: &'static str = "minecraft:air";

    /// Build a block, adding the `minecraft:` namespace when none is given.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.contains(':') {
            Self(name)
        } else {
            Self(format!("minecraft:{name}"))
        }
    }

    pub fn air() -> Self {
        Self(Self::AIR.to_owned())
    }

    pub fn is_air(&self) -> bool {
        self.0 == Self::AIR
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Axis-aligned box of blocks. `min` is inclusive, `max` is exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionBox {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl SelectionBox {
    /// Box spanning two corners in any order.
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y || self.min.z >= self.max.z
    }

    /// Number of blocks inside the box. Saturates at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let span = |min: i32, max: i32| (i64::from(max) - i64::from(min)) as u64;
        span(self.min.x, self.max.x)
            .checked_mul(span(self.min.y, self.max.y))
            .and_then(|area| area.checked_mul(span(self.min.z, self.max.z)))
            .unwrap_or(u64::MAX)
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        (self.min.x..self.max.x).contains(&pos.x)
            && (self.min.y..self.max.y).contains(&pos.y)
            && (self.min.z..self.max.z).contains(&pos.z)
    }

    /// Every block position in the box, x-major then z then y.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + '_ {
        (self.min.x..self.max.x).flat_map(move |x| {
            (self.min.z..self.max.z)
                .flat_map(move |z| (self.min.y..self.max.y).map(move |y| BlockPos::new(x, y, z)))
        })
    }
}
