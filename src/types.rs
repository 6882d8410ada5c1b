//! Location primitives shared by the codec, the allocator and the route planner.
//!
//! The shelf alphabet lives here exactly once. Both the spreadsheet row offsets and the
//! walking-distance ordinal are derived from [`Shelf`], so the two consumers can never
//! drift apart.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LocationError;

/// Shelf level inside a rack.
///
/// Declaration order is the raw letter order, which is also the order used when stock is
/// walked rack by rack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Shelf {
    A,
    B,
    C,
    D,
    E,
}

impl Shelf {
    pub const ALL: [Shelf; 5] = [Shelf::A, Shelf::B, Shelf::C, Shelf::D, Shelf::E];

    /// Position in the alphabet, `a = 1 … e = 5`.
    #[inline]
    pub const fn ordinal(self) -> u32 {
        match self {
            Shelf::A => 1,
            Shelf::B => 2,
            Shelf::C => 3,
            Shelf::D => 4,
            Shelf::E => 5,
        }
    }

    /// Lower-case letter used in location keys.
    pub const fn letter(self) -> char {
        match self {
            Shelf::A => 'a',
            Shelf::B => 'b',
            Shelf::C => 'c',
            Shelf::D => 'd',
            Shelf::E => 'e',
        }
    }

    /// Row offset within a rack pair.
    ///
    /// Odd racks count top-down (`a → 1 … e → 5`); even racks face them and count
    /// bottom-up (`a → 10 … e → 6`).
    #[inline]
    pub const fn row_offset(self, rack_is_odd: bool) -> u32 {
        if rack_is_odd {
            self.ordinal()
        } else {
            11 - self.ordinal()
        }
    }

    /// Inverse of [`Shelf::row_offset`]: returns the shelf and whether it belongs to the odd
    /// rack of the pair.
    pub fn from_row_offset(offset: u32) -> Option<(Shelf, bool)> {
        match offset {
            1..=5 => Some((Shelf::ALL[(offset - 1) as usize], true)),
            6..=10 => Some((Shelf::ALL[(10 - offset) as usize], false)),
            _ => None,
        }
    }
}

impl fmt::Display for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Shelf {
    type Err = LocationError;

    /// Accepts `a`–`e` in either case; `a1` and `a2` are aliases of `a`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a" | "a1" | "a2" => Ok(Shelf::A),
            "b" => Ok(Shelf::B),
            "c" => Ok(Shelf::C),
            "d" => Ok(Shelf::D),
            "e" => Ok(Shelf::E),
            _ => Err(LocationError::UnknownShelf(raw.trim().to_string())),
        }
    }
}

/// Canonical storage slot, serialized as `"rack-shelf-bin"`.
///
/// Ordering is `(rack, shelf, bin)`, the fixed aisle traversal used by the route planner.
///
/// # Examples
/// ```
/// use slotting_engine::types::{LocationKey, Shelf};
///
/// let key: LocationKey = "53-D-45".parse().unwrap();
/// assert_eq!(key, LocationKey::new(53, Shelf::D, 45).unwrap());
/// assert_eq!(key.to_string(), "53-d-45");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LocationKey {
    rack: u32,
    shelf: Shelf,
    bin: u32,
}

impl LocationKey {
    /// First bin of the top shelf of rack 1.
    pub const ORIGIN: LocationKey = LocationKey {
        rack: 1,
        shelf: Shelf::A,
        bin: 1,
    };

    /// Builds a key, rejecting a zero rack or bin.
    pub fn new(rack: u32, shelf: Shelf, bin: u32) -> Result<Self, LocationError> {
        let key = Self { rack, shelf, bin };
        if rack == 0 {
            return Err(LocationError::NonPositive {
                input: key.to_string(),
                part: "rack",
            });
        }
        if bin == 0 {
            return Err(LocationError::NonPositive {
                input: key.to_string(),
                part: "bin",
            });
        }
        Ok(key)
    }

    pub fn rack(&self) -> u32 {
        self.rack
    }

    pub fn shelf(&self) -> Shelf {
        self.shelf
    }

    pub fn bin(&self) -> u32 {
        self.bin
    }

    #[inline]
    pub fn rack_is_odd(&self) -> bool {
        self.rack % 2 != 0
    }

    /// Manhattan walking distance over `(rack, shelf ordinal, bin)`.
    pub fn distance_to(&self, other: &Self) -> u32 {
        self.rack.abs_diff(other.rack)
            + self.shelf.ordinal().abs_diff(other.shelf.ordinal())
            + self.bin.abs_diff(other.bin)
    }
}

impl Ord for LocationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rack
            .cmp(&other.rack)
            .then_with(|| self.shelf.cmp(&other.shelf))
            .then_with(|| self.bin.cmp(&other.bin))
    }
}

impl PartialOrd for LocationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.rack, self.shelf, self.bin)
    }
}

fn parse_positive(raw: &str, input: &str, part: &'static str) -> Result<u32, LocationError> {
    match raw.trim().parse::<u32>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(LocationError::NonPositive {
            input: input.to_string(),
            part,
        }),
    }
}

impl FromStr for LocationKey {
    type Err = LocationError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input.trim().split('-').collect();
        let [rack, shelf, bin] = parts.as_slice() else {
            return Err(LocationError::Shape(input.to_string()));
        };

        let rack = parse_positive(rack, input, "rack")?;
        let shelf = shelf.parse::<Shelf>()?;
        let bin = parse_positive(bin, input, "bin")?;
        Ok(Self { rack, shelf, bin })
    }
}

impl TryFrom<String> for LocationKey {
    type Error = LocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LocationKey> for String {
    fn from(key: LocationKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_and_case() {
        let key: LocationKey = "52-A1-15".parse().unwrap();
        assert_eq!(key.shelf(), Shelf::A);
        assert_eq!(key.rack(), 52);
        assert_eq!(key.bin(), 15);

        let key: LocationKey = "52-a2-03".parse().unwrap();
        assert_eq!(key.to_string(), "52-a-3");
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!(
            "1-a".parse::<LocationKey>(),
            Err(LocationError::Shape(_))
        ));
        assert!(matches!(
            "1-a-1-2".parse::<LocationKey>(),
            Err(LocationError::Shape(_))
        ));
        assert!(matches!(
            "0-a-1".parse::<LocationKey>(),
            Err(LocationError::NonPositive { part: "rack", .. })
        ));
        assert!(matches!(
            "3-b-0".parse::<LocationKey>(),
            Err(LocationError::NonPositive { part: "bin", .. })
        ));
        assert!(matches!(
            "x-b-1".parse::<LocationKey>(),
            Err(LocationError::NonPositive { part: "rack", .. })
        ));
        assert!(matches!(
            "3-f-1".parse::<LocationKey>(),
            Err(LocationError::UnknownShelf(_))
        ));
    }

    #[test]
    fn row_offsets_mirror_between_rack_parities() {
        assert_eq!(Shelf::A.row_offset(true), 1);
        assert_eq!(Shelf::E.row_offset(true), 5);
        assert_eq!(Shelf::E.row_offset(false), 6);
        assert_eq!(Shelf::A.row_offset(false), 10);

        for shelf in Shelf::ALL {
            for odd in [true, false] {
                assert_eq!(
                    Shelf::from_row_offset(shelf.row_offset(odd)),
                    Some((shelf, odd))
                );
            }
        }
        assert_eq!(Shelf::from_row_offset(0), None);
        assert_eq!(Shelf::from_row_offset(11), None);
    }

    #[test]
    fn distance_uses_shelf_ordinal() {
        let a: LocationKey = "1-a-1".parse().unwrap();
        let b: LocationKey = "10-c-2".parse().unwrap();
        assert_eq!(a.distance_to(&b), 9 + 2 + 1);
        assert_eq!(b.distance_to(&a), a.distance_to(&b));
    }

    #[test]
    fn ordering_is_rack_then_shelf_then_bin() {
        let mut keys: Vec<LocationKey> = ["2-a-1", "1-c-9", "1-b-10", "1-b-2"]
            .iter()
            .map(|k| k.parse().unwrap())
            .collect();
        keys.sort();
        let rendered: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(rendered, ["1-b-2", "1-b-10", "1-c-9", "2-a-1"]);
    }

    #[test]
    fn serde_uses_string_form() {
        let key: LocationKey = serde_json::from_str("\"4-c-6\"").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"4-c-6\"");
        assert!(serde_json::from_str::<LocationKey>("\"4-z-6\"").is_err());
    }
}
