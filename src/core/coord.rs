//! Grid Coordinates
//!
//! The `"{row}-{col}"` identifier used on the wire and in storage.
//! Zero-based, decimal, no leading zeros, literal hyphen separator.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// A zero-based grid cell position.
///
/// Orders by row, then column, so `BTreeSet<Coord>` iterates in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    /// Zero-based row (0 = top).
    pub row: u32,
    /// Zero-based column (0 = left).
    pub col: u32,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Check whether this coordinate lies inside a `rows x cols` grid.
    #[inline]
    pub fn within(&self, rows: u32, cols: u32) -> bool {
        self.row < rows && self.col < cols
    }
}

/// Coordinate identifier parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordParseError {
    /// No hyphen separator.
    #[error("missing '-' separator in {0:?}")]
    MissingSeparator(String),
    /// A component is not a canonical decimal integer.
    #[error("invalid coordinate component {0:?}")]
    InvalidComponent(String),
}

fn parse_component(part: &str) -> Result<u32, CoordParseError> {
    let canonical = !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'));
    if !canonical {
        return Err(CoordParseError::InvalidComponent(part.to_string()));
    }
    part.parse()
        .map_err(|_| CoordParseError::InvalidComponent(part.to_string()))
}

impl FromStr for Coord {
    type Err = CoordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once('-')
            .ok_or_else(|| CoordParseError::MissingSeparator(s.to_string()))?;
        Ok(Self::new(parse_component(row)?, parse_component(col)?))
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CoordVisitor;

        impl Visitor<'_> for CoordVisitor {
            type Value = Coord;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a coordinate string like \"2-0\"")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Coord, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(CoordVisitor)
    }
}
