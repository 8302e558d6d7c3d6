//! Grid Logic Module
//!
//! State, commands and the mutation service. Numbering lives in `core`.
//!
//! ## Module Structure
//!
//! - `state`: the grid state and its rendered layout
//! - `command`: validation and pure application of admin commands
//! - `events`: what a committed mutation changed
//! - `service`: owns the state, persists every mutation

pub mod command;
pub mod events;
pub mod service;
pub mod state;

// Re-export key types
pub use command::{GridCommand, Visibility};
pub use events::GridEvent;
pub use service::{Committed, GridService};
pub use state::{Cell, GridState, MAX_GRID_DIMENSION};
