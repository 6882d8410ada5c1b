//! Location codec: rack/shelf/bin keys to warehouse sheet coordinates and back.
//!
//! The warehouse floor plan is a spreadsheet. Racks are paired into aisles with a pitch of
//! twelve rows starting at row 15; the two racks of a pair face each other, so the even
//! rack's shelves run bottom-up. Bins run left to right after a fixed lateral offset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LocationError;
use crate::types::{LocationKey, Shelf};

/// Row directly above the first aisle.
pub const FIRST_AISLE_ROW: u64 = 15;
/// Rows occupied by one rack pair, including the walkway.
pub const AISLE_PITCH: u64 = 12;
/// Lateral offset of bin 1 in the near half of the floor.
pub const NEAR_COLUMN_BASE: u64 = 7;
/// Lateral offset of bin 1 past the aisle split.
pub const FAR_COLUMN_BASE: u64 = 17;

/// How bins are laid out horizontally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnLayout {
    /// Every rack starts at the same column.
    Simplified,
    /// Racks from `split_rack` onwards sit behind a cross aisle.
    Split { split_rack: u32 },
}

impl ColumnLayout {
    pub const DEFAULT_SPLIT_RACK: u32 = 51;

    /// Column offset added to the bin number for a given rack.
    pub fn column_base(&self, rack: u32) -> u64 {
        match self {
            ColumnLayout::Simplified => NEAR_COLUMN_BASE,
            ColumnLayout::Split { split_rack } if rack >= *split_rack => FAR_COLUMN_BASE,
            ColumnLayout::Split { .. } => NEAR_COLUMN_BASE,
        }
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout::Split {
            split_rack: Self::DEFAULT_SPLIT_RACK,
        }
    }
}

/// A sheet coordinate such as `BJ331`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellRef {
    pub column: u64,
    pub row: u64,
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_label(self.column), self.row)
    }
}

impl FromStr for CellRef {
    type Err = LocationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| LocationError::CellReference(raw.to_string()))?;
        let (letters, digits) = trimmed.split_at(split);
        let column = column_number(letters)?;
        let row = digits
            .parse::<u64>()
            .ok()
            .filter(|row| *row > 0)
            .ok_or_else(|| LocationError::CellReference(raw.to_string()))?;
        Ok(Self { column, row })
    }
}

impl TryFrom<String> for CellRef {
    type Error = LocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellRef> for String {
    fn from(cell: CellRef) -> Self {
        cell.to_string()
    }
}

/// Bijective base-26 label of a 1-based column number (`1 → A`, `27 → AA`).
///
/// Column 0 has no label and renders as an empty string.
pub fn column_label(mut column: u64) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        column -= 1;
        letters.push(b'A' + (column % 26) as u8);
        column /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Inverse of [`column_label`]. Case-insensitive.
pub fn column_number(label: &str) -> Result<u64, LocationError> {
    if label.is_empty() {
        return Err(LocationError::CellReference(label.to_string()));
    }
    label.chars().try_fold(0u64, |acc, ch| {
        let upper = ch.to_ascii_uppercase();
        if !upper.is_ascii_uppercase() {
            return Err(LocationError::CellReference(label.to_string()));
        }
        acc.checked_mul(26)
            .and_then(|acc| acc.checked_add(u64::from(upper as u8 - b'A' + 1)))
            .ok_or_else(|| LocationError::CellReference(label.to_string()))
    })
}

/// First row of the aisle that holds `rack` (before adding the shelf offset).
#[inline]
pub fn base_offset(rack: u32) -> u64 {
    FIRST_AISLE_ROW + u64::from(rack).saturating_sub(1) / 2 * AISLE_PITCH
}

/// Maps a location key to its sheet cell.
///
/// # Examples
/// ```
/// use slotting_engine::codec::{locate, ColumnLayout};
/// use slotting_engine::types::LocationKey;
///
/// let key: LocationKey = "53-d-45".parse().unwrap();
/// assert_eq!(locate(&key, ColumnLayout::default()).to_string(), "BJ331");
/// assert_eq!(locate(&key, ColumnLayout::Simplified).to_string(), "AZ331");
/// ```
pub fn locate(key: &LocationKey, layout: ColumnLayout) -> CellRef {
    let row = base_offset(key.rack()) + u64::from(key.shelf().row_offset(key.rack_is_odd()));
    let column = u64::from(key.bin()) + layout.column_base(key.rack());
    CellRef { column, row }
}

/// Parses a raw `"rack-shelf-bin"` string and maps it to its cell.
pub fn locate_str(raw: &str, layout: ColumnLayout) -> Result<CellRef, LocationError> {
    let key = raw.parse::<LocationKey>()?;
    Ok(locate(&key, layout))
}

/// Recovers the canonical key of a storage cell.
///
/// Shelf aliases collapse to their canonical letter, so `locate_inverse(locate(k))` returns
/// `k` only for canonical keys.
pub fn locate_inverse(cell: &CellRef, layout: ColumnLayout) -> Result<LocationKey, LocationError> {
    let off_grid = || LocationError::OffGrid(cell.to_string());

    let relative = cell
        .row
        .checked_sub(FIRST_AISLE_ROW + 1)
        .ok_or_else(off_grid)?;
    let pair = relative / AISLE_PITCH;
    let offset = (relative % AISLE_PITCH + 1) as u32;
    let (shelf, odd): (Shelf, bool) = Shelf::from_row_offset(offset).ok_or_else(off_grid)?;

    let rack = if odd { pair * 2 + 1 } else { pair * 2 + 2 };
    let rack = u32::try_from(rack).map_err(|_| off_grid())?;

    let bin = cell
        .column
        .checked_sub(layout.column_base(rack))
        .filter(|bin| *bin > 0)
        .ok_or_else(off_grid)?;
    let bin = u32::try_from(bin).map_err(|_| off_grid())?;

    LocationKey::new(rack, shelf, bin)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> LocationKey {
        raw.parse().unwrap()
    }

    #[test]
    fn column_labels_round_trip() {
        let cases = [
            (1, "A"),
            (26, "Z"),
            (27, "AA"),
            (52, "AZ"),
            (62, "BJ"),
            (702, "ZZ"),
            (703, "AAA"),
        ];
        for (number, label) in cases {
            assert_eq!(column_label(number), label);
            assert_eq!(column_number(label).unwrap(), number);
        }
        assert_eq!(column_number("aa").unwrap(), 27);
        assert!(column_number("").is_err());
        assert!(column_number("A1").is_err());
        assert_eq!(column_label(0), "");
    }

    #[test]
    fn odd_rack_uses_top_down_offsets() {
        // Rack 53 is odd: 15 + 26 * 12 + offset(d) = 15 + 312 + 4.
        let cell = locate(&key("53-d-45"), ColumnLayout::default());
        assert_eq!(cell.row, 331);
        assert_eq!(cell.column, 45 + FAR_COLUMN_BASE);
        assert_eq!(cell.to_string(), "BJ331");
    }

    #[test]
    fn even_rack_mirrors_offsets() {
        // Rack 52 shares the aisle of rack 51: 15 + 25 * 12 + offset(a, even) = 315 + 10.
        let cell = locate(&key("52-a1-15"), ColumnLayout::default());
        assert_eq!(cell.row, 325);
        assert_eq!(cell.column, 32);

        let first = locate(&key("1-a-1"), ColumnLayout::Simplified);
        assert_eq!(first.to_string(), "H16");
        let facing = locate(&key("2-a-1"), ColumnLayout::Simplified);
        assert_eq!(facing.to_string(), "H25");
    }

    #[test]
    fn split_layout_switches_at_threshold() {
        let near = locate(&key("50-a-3"), ColumnLayout::default());
        let far = locate(&key("51-a-3"), ColumnLayout::default());
        assert_eq!(near.column, 10);
        assert_eq!(far.column, 20);

        let custom = ColumnLayout::Split { split_rack: 10 };
        assert_eq!(locate(&key("10-a-1"), custom).column, 18);
        assert_eq!(locate(&key("9-a-1"), custom).column, 8);
    }

    #[test]
    fn locate_is_deterministic() {
        let k = key("17-c-9");
        assert_eq!(
            locate(&k, ColumnLayout::default()),
            locate(&k, ColumnLayout::default())
        );
    }

    #[test]
    fn inverse_recovers_canonical_key() {
        for layout in [ColumnLayout::Simplified, ColumnLayout::default()] {
            for raw in ["1-a-1", "2-e-7", "53-d-45", "52-b-3", "100-c-60"] {
                let k = key(raw);
                assert_eq!(locate_inverse(&locate(&k, layout), layout).unwrap(), k);
            }
        }
        let alias = key("52-a1-15");
        let cell = locate(&alias, ColumnLayout::default());
        assert_eq!(
            locate_inverse(&cell, ColumnLayout::default()).unwrap().to_string(),
            "52-a-15"
        );
    }

    #[test]
    fn inverse_rejects_cells_between_aisles() {
        let walkway = CellRef { column: 10, row: 26 };
        assert!(matches!(
            locate_inverse(&walkway, ColumnLayout::Simplified),
            Err(LocationError::OffGrid(_))
        ));
        let header = CellRef { column: 10, row: 3 };
        assert!(locate_inverse(&header, ColumnLayout::Simplified).is_err());
        let margin = CellRef { column: 7, row: 16 };
        assert!(locate_inverse(&margin, ColumnLayout::Simplified).is_err());
    }

    #[test]
    fn malformed_keys_are_errors_not_defaults() {
        assert!(locate_str("53-x-45", ColumnLayout::default()).is_err());
        assert!(locate_str("53-d", ColumnLayout::default()).is_err());
        assert!(locate_str("-1-d-4", ColumnLayout::default()).is_err());
    }

    #[test]
    fn cell_refs_parse() {
        let cell: CellRef = "bj331".parse().unwrap();
        assert_eq!(cell, CellRef { column: 62, row: 331 });
        assert!("331".parse::<CellRef>().is_err());
        assert!("BJ".parse::<CellRef>().is_err());
        assert!("BJ0".parse::<CellRef>().is_err());
    }
}
