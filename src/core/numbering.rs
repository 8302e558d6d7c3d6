//! Snake Numbering
//!
//! Assigns slot numbers to grid cells in a boustrophedon traversal:
//! columns left to right, even columns bottom-to-top, odd columns
//! top-to-bottom. Blocked cells are skipped and get no number.
//!
//! Numbers are never stored. They are recomputed from
//! `(rows, cols, blocked)` on every read, so hiding a cell shifts every
//! later slot down by one.

use std::collections::{BTreeMap, BTreeSet};

use super::coord::Coord;

/// Bidirectional mapping between visible cells and their slot numbers.
///
/// Numbers are contiguous from 1. Uses BTreeMap for deterministic iteration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotNumbering {
    coord_to_number: BTreeMap<Coord, u32>,
    number_to_coord: BTreeMap<u32, Coord>,
}

impl SlotNumbering {
    /// Number every non-blocked cell of a `rows x cols` grid.
    ///
    /// Blocked coordinates outside the grid are ignored.
    pub fn compute(rows: u32, cols: u32, blocked: &BTreeSet<Coord>) -> Self {
        let mut numbering = Self::default();
        let mut next = 1u32;

        for coord in traversal(rows, cols) {
            if blocked.contains(&coord) {
                continue;
            }
            numbering.coord_to_number.insert(coord, next);
            numbering.number_to_coord.insert(next, coord);
            next += 1;
        }

        numbering
    }

    /// Slot number of a cell, if it is visible.
    #[inline]
    pub fn number_of(&self, coord: &Coord) -> Option<u32> {
        self.coord_to_number.get(coord).copied()
    }

    /// Cell currently holding a slot number, if that number exists.
    #[inline]
    pub fn coord_of(&self, number: u32) -> Option<Coord> {
        self.number_to_coord.get(&number).copied()
    }

    /// Number of visible slots.
    pub fn len(&self) -> usize {
        self.number_to_coord.len()
    }

    /// True when no cell is visible.
    pub fn is_empty(&self) -> bool {
        self.number_to_coord.is_empty()
    }

    /// Visible slots in number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Coord)> + '_ {
        self.number_to_coord.iter().map(|(n, c)| (*n, *c))
    }

    /// Coordinate → number view.
    pub fn coord_to_number(&self) -> &BTreeMap<Coord, u32> {
        &self.coord_to_number
    }

    /// Number → coordinate view.
    pub fn number_to_coord(&self) -> &BTreeMap<u32, Coord> {
        &self.number_to_coord
    }
}

/// Visiting order of every cell, blocked or not.
pub fn traversal(rows: u32, cols: u32) -> impl Iterator<Item = Coord> {
    (0..cols).flat_map(move |col| {
        (0..rows).map(move |step| {
            let row = if col % 2 == 0 { rows - 1 - step } else { step };
            Coord::new(row, col)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn blocked(ids: &[&str]) -> BTreeSet<Coord> {
        ids.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_column_parity_direction() {
        let numbering = SlotNumbering::compute(3, 2, &BTreeSet::new());

        let expected = [
            ((2, 0), 1),
            ((1, 0), 2),
            ((0, 0), 3),
            ((0, 1), 4),
            ((1, 1), 5),
            ((2, 1), 6),
        ];
        for ((row, col), number) in expected {
            assert_eq!(numbering.number_of(&Coord::new(row, col)), Some(number));
        }
        assert_eq!(numbering.len(), 6);
    }

    #[test]
    fn test_blocked_cells_are_skipped() {
        // 3x3, hide the cell that would be slot 3 (top of column 0)
        let numbering = SlotNumbering::compute(3, 3, &blocked(&["0-0"]));

        assert_eq!(numbering.len(), 8);
        assert_eq!(numbering.number_of(&Coord::new(0, 0)), None);
        assert_eq!(numbering.number_of(&Coord::new(1, 0)), Some(2));
        // Column 1 now starts at 3 instead of 4
        assert_eq!(numbering.number_of(&Coord::new(0, 1)), Some(3));
        assert_eq!(numbering.coord_of(8), Some(Coord::new(0, 2)));
        assert_eq!(numbering.coord_of(9), None);
    }

    #[test]
    fn test_empty_geometry() {
        assert!(SlotNumbering::compute(0, 5, &BTreeSet::new()).is_empty());
        assert!(SlotNumbering::compute(5, 0, &BTreeSet::new()).is_empty());
        assert!(SlotNumbering::compute(0, 0, &BTreeSet::new()).is_empty());
    }

    #[test]
    fn test_all_blocked() {
        let all = blocked(&["0-0", "0-1", "1-0", "1-1"]);
        assert!(SlotNumbering::compute(2, 2, &all).is_empty());
    }

    #[test]
    fn test_out_of_range_blocked_ignored() {
        let numbering = SlotNumbering::compute(2, 2, &blocked(&["5-5", "0-9"]));
        assert_eq!(numbering.len(), 4);
    }

    #[test]
    fn test_traversal_single_row() {
        let order: Vec<Coord> = traversal(1, 3).collect();
        assert_eq!(order, vec![Coord::new(0, 0), Coord::new(0, 1), Coord::new(0, 2)]);
    }

    #[test]
    fn test_deterministic() {
        let b = blocked(&["1-1", "2-3"]);
        assert_eq!(SlotNumbering::compute(4, 4, &b), SlotNumbering::compute(4, 4, &b));
    }

    fn grid_with_blocked() -> impl Strategy<Value = (u32, u32, BTreeSet<Coord>)> {
        (0u32..12, 0u32..12).prop_flat_map(|(rows, cols)| {
            let cells = proptest::collection::btree_set(
                (0..rows.max(1), 0..cols.max(1)).prop_map(|(r, c)| Coord::new(r, c)),
                0..((rows * cols) as usize + 1),
            );
            (Just(rows), Just(cols), cells).prop_map(|(rows, cols, cells)| {
                let inside = cells.into_iter().filter(|c| c.within(rows, cols)).collect();
                (rows, cols, inside)
            })
        })
    }

    proptest! {
        #[test]
        fn prop_numbers_are_contiguous_and_inverse((rows, cols, blocked) in grid_with_blocked()) {
            let numbering = SlotNumbering::compute(rows, cols, &blocked);
            let expected = (rows * cols) as usize - blocked.len();

            prop_assert_eq!(numbering.len(), expected);
            prop_assert_eq!(numbering.coord_to_number().len(), expected);

            let numbers: Vec<u32> = numbering.number_to_coord().keys().copied().collect();
            let contiguous: Vec<u32> = (1..=expected as u32).collect();
            prop_assert_eq!(numbers, contiguous);

            for (coord, number) in numbering.coord_to_number() {
                prop_assert!(!blocked.contains(coord));
                prop_assert_eq!(numbering.coord_of(*number), Some(*coord));
            }
        }
    }
}
