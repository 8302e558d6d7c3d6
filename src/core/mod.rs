//! Core primitives.
//!
//! Pure, deterministic building blocks with no I/O.

pub mod coord;
pub mod digest;
pub mod numbering;

// Re-export core types
pub use coord::{Coord, CoordParseError};
pub use numbering::SlotNumbering;
