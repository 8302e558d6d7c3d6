//! Grid Events
//!
//! What a committed mutation did. Logged after every successful save.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::coord::Coord;

/// A committed change to the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GridEvent {
    /// Grid replaced with fresh dimensions.
    Generated {
        /// New row count.
        rows: u32,
        /// New column count.
        cols: u32,
    },

    /// Hidden cells and labels cleared.
    Reset {
        /// Cells that were hidden before the reset.
        cleared_blocked: usize,
        /// Labels removed by the reset.
        cleared_names: usize,
    },

    /// Slot hidden; later slots renumber.
    SlotHidden {
        /// Number the slot had before hiding.
        number: u32,
        /// Cell that became hidden.
        coord: Coord,
        /// Label removed together with the slot.
        dropped_label: Option<String>,
    },

    /// Label assigned or replaced.
    LabelSet {
        /// Slot number.
        number: u32,
        /// Trimmed label.
        label: String,
    },

    /// Label removed (no-op if there was none).
    LabelCleared {
        /// Slot number.
        number: u32,
        /// Whether a label was actually removed.
        existed: bool,
    },
}

impl GridEvent {
    /// Operation name, as reported back to the caller.
    pub fn operation(&self) -> &'static str {
        match self {
            GridEvent::Generated { .. } => "generate",
            GridEvent::Reset { .. } => "reset",
            GridEvent::SlotHidden { .. } | GridEvent::LabelSet { .. } | GridEvent::LabelCleared { .. } => {
                "update"
            }
        }
    }
}

impl fmt::Display for GridEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridEvent::Generated { rows, cols } => write!(f, "generated {rows}x{cols} grid"),
            GridEvent::Reset { cleared_blocked, cleared_names } => {
                write!(f, "reset ({cleared_blocked} hidden, {cleared_names} labels cleared)")
            }
            GridEvent::SlotHidden { number, coord, .. } => write!(f, "hid slot {number} at {coord}"),
            GridEvent::LabelSet { number, label } => write!(f, "labelled slot {number} {label:?}"),
            GridEvent::LabelCleared { number, existed: true } => write!(f, "cleared label of slot {number}"),
            GridEvent::LabelCleared { number, existed: false } => {
                write!(f, "slot {number} already unlabelled")
            }
        }
    }
}
