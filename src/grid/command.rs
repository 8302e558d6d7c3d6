//! Grid Commands
//!
//! Validation and application of admin mutations.
//! `apply` is pure: it takes the current state by reference and returns the
//! next state plus the event describing the change. Persisting and
//! broadcasting happen in the service and hub.

use serde_json::Value;

use crate::error::{GridError, Result};
use crate::grid::events::GridEvent;
use crate::grid::state::{GridState, MAX_GRID_DIMENSION};

/// Requested visibility in an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Label update (any value other than `"hide"`).
    #[default]
    Show,
    /// Hide the slot.
    Hide,
}

impl Visibility {
    /// Parse the wire value. Only the exact string `"hide"` hides.
    pub fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("hide") => Visibility::Hide,
            _ => Visibility::Show,
        }
    }
}

/// A validated admin mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GridCommand {
    /// Replace the whole grid.
    Generate {
        /// Row count.
        rows: u32,
        /// Column count.
        cols: u32,
    },
    /// Clear hidden cells and labels, keep dimensions.
    Reset,
    /// Hide a slot or change its label.
    Update {
        /// Target slot number.
        box_num: u32,
        /// New label, untrimmed.
        subtitle: Option<String>,
        /// Hide or relabel.
        visibility: Visibility,
    },
}

impl GridCommand {
    /// Validate a generate request.
    pub fn generate(rows: Option<&Value>, cols: Option<&Value>) -> Result<Self> {
        let rows = positive_integer("rows", rows)?;
        let cols = positive_integer("cols", cols)?;

        for (field, value) in [("rows", rows), ("cols", cols)] {
            if value > MAX_GRID_DIMENSION {
                return Err(GridError::invalid(format!(
                    "{field} must be at most {MAX_GRID_DIMENSION}"
                )));
            }
        }

        Ok(GridCommand::Generate { rows, cols })
    }

    /// Validate an update request.
    pub fn update(
        box_num: Option<&Value>,
        subtitle: Option<String>,
        visibility: Option<&str>,
    ) -> Result<Self> {
        Ok(GridCommand::Update {
            box_num: positive_integer("boxNum", box_num)?,
            subtitle,
            visibility: Visibility::from_wire(visibility),
        })
    }

    /// Apply to `state`, returning the next state and what changed.
    ///
    /// On error nothing is returned, so the caller's state stays as it was.
    pub fn apply(&self, state: &GridState) -> Result<(GridState, GridEvent)> {
        match self {
            GridCommand::Generate { rows, cols } => Ok((
                GridState::empty(*rows, *cols),
                GridEvent::Generated { rows: *rows, cols: *cols },
            )),

            GridCommand::Reset => {
                let event = GridEvent::Reset {
                    cleared_blocked: state.blocked.len(),
                    cleared_names: state.names.len(),
                };
                Ok((GridState::empty(state.rows, state.cols), event))
            }

            GridCommand::Update { box_num, visibility: Visibility::Hide, .. } => {
                let coord = state
                    .numbering()
                    .coord_of(*box_num)
                    .ok_or(GridError::NotFound(*box_num))?;

                let mut next = state.clone();
                next.blocked.insert(coord);
                let dropped_label = next.names.remove(box_num);

                Ok((next, GridEvent::SlotHidden { number: *box_num, coord, dropped_label }))
            }

            GridCommand::Update { box_num, subtitle, visibility: Visibility::Show } => {
                let mut next = state.clone();
                let label = subtitle.as_deref().map(str::trim).filter(|s| !s.is_empty());

                let event = match label {
                    Some(label) => {
                        next.names.insert(*box_num, label.to_string());
                        GridEvent::LabelSet { number: *box_num, label: label.to_string() }
                    }
                    None => {
                        let existed = next.names.remove(box_num).is_some();
                        GridEvent::LabelCleared { number: *box_num, existed }
                    }
                };

                Ok((next, event))
            }
        }
    }
}

/// Accept a JSON integer, or a string holding a decimal integer.
fn positive_integer(field: &str, value: Option<&Value>) -> Result<u32> {
    let parsed = match value {
        None | Some(Value::Null) => return Err(GridError::invalid(format!("{field} required"))),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };

    let n = parsed.ok_or_else(|| GridError::invalid(format!("{field} must be an integer")))?;
    if n <= 0 {
        return Err(GridError::invalid(format!("{field} must be positive")));
    }
    u32::try_from(n).map_err(|_| GridError::invalid(format!("{field} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coord::Coord;
    use serde_json::json;

    fn generate(rows: u32, cols: u32) -> GridState {
        GridCommand::Generate { rows, cols }
            .apply(&GridState::default())
            .unwrap()
            .0
    }

    fn hide(box_num: u32) -> GridCommand {
        GridCommand::Update { box_num, subtitle: None, visibility: Visibility::Hide }
    }

    fn label(box_num: u32, subtitle: &str) -> GridCommand {
        GridCommand::Update {
            box_num,
            subtitle: Some(subtitle.to_string()),
            visibility: Visibility::Show,
        }
    }

    #[test]
    fn test_generate_validation() {
        assert_eq!(
            GridCommand::generate(Some(&json!(2)), Some(&json!("4"))).unwrap(),
            GridCommand::Generate { rows: 2, cols: 4 }
        );

        let bad = [
            (None, Some(json!(3))),
            (Some(json!(3)), Some(Value::Null)),
            (Some(json!(0)), Some(json!(3))),
            (Some(json!(-2)), Some(json!(3))),
            (Some(json!("abc")), Some(json!(3))),
            (Some(json!(2.5)), Some(json!(3))),
            (Some(json!(true)), Some(json!(3))),
            (Some(json!(3)), Some(json!(MAX_GRID_DIMENSION + 1))),
        ];
        for (rows, cols) in bad {
            let result = GridCommand::generate(rows.as_ref(), cols.as_ref());
            assert!(
                matches!(result, Err(GridError::InvalidArgument(_))),
                "rows={rows:?} cols={cols:?}"
            );
        }
    }

    #[test]
    fn test_update_validation() {
        assert!(matches!(
            GridCommand::update(None, None, Some("hide")),
            Err(GridError::InvalidArgument(_))
        ));
        assert!(matches!(
            GridCommand::update(Some(&json!(0)), Some("x".into()), None),
            Err(GridError::InvalidArgument(_))
        ));
        assert_eq!(
            GridCommand::update(Some(&json!(" 7 ")), None, Some("visible")).unwrap(),
            GridCommand::Update { box_num: 7, subtitle: None, visibility: Visibility::Show }
        );
    }

    #[test]
    fn test_visibility_from_wire() {
        assert_eq!(Visibility::from_wire(Some("hide")), Visibility::Hide);
        assert_eq!(Visibility::from_wire(Some("show")), Visibility::Show);
        assert_eq!(Visibility::from_wire(Some("HIDE")), Visibility::Show);
        assert_eq!(Visibility::from_wire(None), Visibility::Show);
    }

    #[test]
    fn test_generate_replaces_everything() {
        let mut state = GridState::default();
        state.blocked.insert(Coord::new(0, 0));
        state.names.insert(1, "Oil".into());

        let (next, event) = GridCommand::Generate { rows: 2, cols: 4 }.apply(&state).unwrap();
        assert_eq!(next, GridState::empty(2, 4));
        assert_eq!(event, GridEvent::Generated { rows: 2, cols: 4 });
    }

    #[test]
    fn test_reset_after_generate_is_identity() {
        let generated = generate(2, 4);
        let (reset, _) = GridCommand::Reset.apply(&generated).unwrap();
        assert_eq!(reset, generated);
    }

    #[test]
    fn test_reset_keeps_dimensions() {
        let mut state = generate(4, 5);
        state.blocked.insert(Coord::new(1, 1));
        state.names.insert(2, "Beans".into());

        let (next, event) = GridCommand::Reset.apply(&state).unwrap();
        assert_eq!(next, GridState::empty(4, 5));
        assert_eq!(event, GridEvent::Reset { cleared_blocked: 1, cleared_names: 1 });
    }

    #[test]
    fn test_hide_slot_three_renumbers() {
        let (state, _) = label(3, "Flour").apply(&generate(3, 3)).unwrap();
        let before = state.numbering();

        let (next, event) = hide(3).apply(&state).unwrap();

        // Slot 3 is the top of column 0
        assert_eq!(next.blocked.len(), 1);
        assert!(next.is_blocked(&Coord::new(0, 0)));
        assert_eq!(next.label(3), None);
        assert_eq!(
            event,
            GridEvent::SlotHidden {
                number: 3,
                coord: Coord::new(0, 0),
                dropped_label: Some("Flour".into()),
            }
        );

        let after = next.numbering();
        assert_eq!(after.len(), 8);
        assert_eq!(after.coord_of(1), before.coord_of(1));
        assert_eq!(after.coord_of(2), before.coord_of(2));
        for n in 3..=8 {
            assert_eq!(after.coord_of(n), before.coord_of(n + 1));
        }
    }

    #[test]
    fn test_hide_is_idempotent_per_coordinate() {
        let state = generate(1, 2);
        let (state, _) = hide(2).apply(&state).unwrap();
        assert_eq!(state.blocked.len(), 1);

        // Slot 2 no longer exists
        assert!(matches!(hide(2).apply(&state), Err(GridError::NotFound(2))));
    }

    #[test]
    fn test_hide_unknown_slot() {
        let state = generate(2, 2);
        assert!(matches!(hide(5).apply(&state), Err(GridError::NotFound(5))));
    }

    #[test]
    fn test_label_is_trimmed() {
        let (state, event) = label(2, "  Sugar ").apply(&generate(2, 2)).unwrap();
        assert_eq!(state.label(2), Some("Sugar"));
        assert_eq!(event, GridEvent::LabelSet { number: 2, label: "Sugar".into() });
    }

    #[test]
    fn test_blank_label_removes() {
        let (state, _) = label(2, "Sugar").apply(&generate(2, 2)).unwrap();

        let (state, event) = label(2, "   ").apply(&state).unwrap();
        assert_eq!(state.label(2), None);
        assert_eq!(event, GridEvent::LabelCleared { number: 2, existed: true });

        // Clearing again is not an error
        let (state, event) = label(2, "").apply(&state).unwrap();
        assert_eq!(state.label(2), None);
        assert_eq!(event, GridEvent::LabelCleared { number: 2, existed: false });

        let missing_subtitle = GridCommand::Update {
            box_num: 2,
            subtitle: None,
            visibility: Visibility::Show,
        };
        assert!(missing_subtitle.apply(&state).is_ok());
    }

    #[test]
    fn test_label_for_nonexistent_number_is_accepted() {
        let (state, _) = label(40, "Later").apply(&generate(2, 2)).unwrap();
        assert_eq!(state.label(40), Some("Later"));
        assert_eq!(state.numbering().coord_of(40), None);
    }
}
