//! Grid State Definitions
//!
//! The single authoritative grid: dimensions, hidden cells, labels.
//! Uses BTreeSet/BTreeMap so snapshots serialize in a stable order.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::coord::Coord;
use crate::core::numbering::SlotNumbering;

/// Rows of a freshly created grid.
pub const DEFAULT_ROWS: u32 = 3;

/// Columns of a freshly created grid.
pub const DEFAULT_COLS: u32 = 3;

/// Largest accepted row or column count.
pub const MAX_GRID_DIMENSION: u32 = 1000;

// =============================================================================
// GRID STATE
// =============================================================================

/// Complete grid state, also the snapshot sent to every viewer.
///
/// Wire shape:
/// `{"rows":3,"cols":3,"blocked":["0-1"],"names":{"4":"Rice"}}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridState {
    /// Grid height.
    pub rows: u32,

    /// Grid width.
    pub cols: u32,

    /// Hidden cells, excluded from numbering and rendering.
    #[serde(default)]
    pub blocked: BTreeSet<Coord>,

    /// Slot number -> label. Keys serialize as decimal strings.
    #[serde(default)]
    pub names: BTreeMap<u32, String>,
}

impl Default for GridState {
    fn default() -> Self {
        Self::empty(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl GridState {
    /// A grid with nothing hidden and no labels.
    pub fn empty(rows: u32, cols: u32) -> Self {
        Self {
            rows,
            cols,
            blocked: BTreeSet::new(),
            names: BTreeMap::new(),
        }
    }

    /// Drop hidden cells that fall outside the grid.
    pub fn normalized(mut self) -> Self {
        let (rows, cols) = (self.rows, self.cols);
        self.blocked.retain(|c| c.within(rows, cols));
        self
    }

    /// Current slot numbering.
    pub fn numbering(&self) -> SlotNumbering {
        SlotNumbering::compute(self.rows, self.cols, &self.blocked)
    }

    /// Check if a cell is hidden.
    #[inline]
    pub fn is_blocked(&self, coord: &Coord) -> bool {
        self.blocked.contains(coord)
    }

    /// Label of a slot number, if any.
    pub fn label(&self, number: u32) -> Option<&str> {
        self.names.get(&number).map(String::as_str)
    }

    /// Number of visible slots.
    pub fn visible_count(&self) -> usize {
        (self.rows as usize * self.cols as usize).saturating_sub(self.blocked.len())
    }

    /// Row-major rendering of the grid, as the viewers draw it.
    pub fn layout(&self) -> Vec<Vec<Cell<'_>>> {
        let numbering = self.numbering();

        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| match numbering.number_of(&Coord::new(row, col)) {
                        Some(number) => Cell::Slot {
                            number,
                            label: self.label(number),
                        },
                        None => Cell::Hidden,
                    })
                    .collect()
            })
            .collect()
    }

    /// Plain-text rendering of [`layout`](Self::layout), one line per row.
    pub fn render_text(&self) -> String {
        self.layout()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Cell::Hidden => "[  ·  ]".to_string(),
                        Cell::Slot { number, label: Some(label) } => format!("[{number:>3} {label}]"),
                        Cell::Slot { number, label: None } => format!("[{number:>3}  ]"),
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One rendered cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cell<'a> {
    /// Hidden cell, drawn as a gap.
    Hidden,
    /// Visible slot with its number and optional label.
    Slot {
        /// Slot number.
        number: u32,
        /// Label, if assigned.
        label: Option<&'a str>,
    },
}
