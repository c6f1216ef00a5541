//! Shared value types used across the strata workspace.
//!
//! # Invariants
//! - Every type here is a plain value: cloning never shares state.
//! - `Ord` on coordinates is total so maps keyed by them iterate deterministically.

mod types;

pub use types::{
    Block, BlockPos, CHUNK_SIZE, ChunkKey, Dimension, EntityId, ParseDimensionError, SelectionBox,
    Transform,
};
