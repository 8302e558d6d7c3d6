//! # Slotboard Server
//!
//! Shared slot grid with live updates. Anyone connected sees the grid;
//! one admin can regenerate it, hide slots and label them.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SLOTBOARD SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Pure primitives                          │
//! │  ├── coord.rs    - "row-col" cell coordinates               │
//! │  ├── numbering.rs- Snake (column boustrophedon) numbering   │
//! │  └── digest.rs   - Domain-separated SHA-256                 │
//! │                                                             │
//! │  grid/           - Grid rules                               │
//! │  ├── state.rs    - Grid state and text rendering            │
//! │  ├── command.rs  - Validated admin commands                 │
//! │  ├── events.rs   - What a committed command changed         │
//! │  └── service.rs  - Serialized apply + persist               │
//! │                                                             │
//! │  store/          - Persistence                              │
//! │  ├── sqlite.rs   - Single-row SQLite table                  │
//! │  ├── inspect.rs  - Read-only database report                │
//! │  └── memory.rs   - In-process store                         │
//! │                                                             │
//! │  network/        - Networking                               │
//! │  ├── auth.rs     - Admin login and signed tokens            │
//! │  ├── hub.rs      - Authorize, apply, broadcast              │
//! │  ├── protocol.rs - Message types                            │
//! │  └── server.rs   - WebSocket server                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Numbering
//!
//! Visible cells are numbered `1..=N` column by column. Even columns
//! (0-based) run bottom to top, odd columns top to bottom, hidden cells
//! are skipped. Labels are keyed by number, so hiding a cell shifts the
//! numbers of every later slot while labels stay on their numbers.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod grid;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use core::coord::Coord;
pub use core::numbering::SlotNumbering;
pub use error::{GridError, Result};
pub use grid::{GridCommand, GridService, GridState};
pub use network::{AccessGuard, GridHub, GridServer};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
