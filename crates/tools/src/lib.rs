//! Developer tooling: read-only level inspection.
//!
//! # Invariants
//! - Inspection never mutates the level.

mod inspector;

pub use inspector::{CellInfo, ComponentLine, EntityInfo, LevelInspector, LevelSummary};
