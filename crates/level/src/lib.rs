//! Level: editable world data whose undo/redo runs through one meta-manager.
//!
//! # Invariants
//! - Every mutation is staged in a sub-manager and only becomes an undo
//!   point through [`Level::create_undo_point`].
//! - The level owns its sub-managers; the meta-manager only holds weak handles.

mod chunk;
mod level;
mod seed;

pub use chunk::{Chunk, EntityData, LevelMetadata};
pub use level::{ChunkHistory, EntityHistory, Level, LevelError, LevelSummary, MAX_FILL_VOLUME};
pub use seed::{EntityRecord, LevelSeed, PlacedBlock};
