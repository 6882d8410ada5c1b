//! Plain in-memory records exchanged with the upload and fulfillment collaborators.
//!
//! - `Item`: an inbound inventory line waiting for a slot
//! - `Pallet`: a partially filled unit already on the floor
//! - `Destination`: outbound destination with an optional preferred zone
//! - `StockRecord` / `Order`: inputs of the pick-route planner

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::types::LocationKey;

/// Lowest accepted demand score.
pub const MIN_PICK_FREQUENCY: f64 = 0.0;
/// Highest accepted demand score.
pub const MAX_PICK_FREQUENCY: f64 = 100.0;

/// ABC demand tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    A,
    B,
    C,
}

impl Category {
    /// Scores strictly above this are `A`.
    pub const A_THRESHOLD: f64 = 80.0;
    /// Scores strictly above this (and not `A`) are `B`.
    pub const B_THRESHOLD: f64 = 50.0;

    /// Classifies a demand score. Each edge belongs to the lower class.
    pub fn from_pick_frequency(pick_frequency: f64) -> Self {
        if pick_frequency > Self::A_THRESHOLD {
            Category::A
        } else if pick_frequency > Self::B_THRESHOLD {
            Category::B
        } else {
            Category::C
        }
    }

    /// Storage row band: eye level for `A`, lower rows for slower movers.
    pub fn row_band(&self) -> u8 {
        match self {
            Category::A => 1,
            Category::B => 2,
            Category::C => 3,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::A => "A",
            Category::B => "B",
            Category::C => "C",
        };
        f.write_str(label)
    }
}

/// Inbound inventory line.
///
/// `category` and `location` are filled in by the allocator; values supplied by the caller
/// are ignored.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Item {
    pub id: u64,
    pub sku: String,
    /// Demand score in `0..=100`.
    pub pick_frequency: f64,
    pub quantity: u32,
    pub destination_id: u64,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Item {
    pub fn new(
        id: u64,
        sku: impl Into<String>,
        pick_frequency: f64,
        quantity: u32,
        destination_id: u64,
    ) -> Self {
        Self {
            id,
            sku: sku.into(),
            pick_frequency,
            quantity,
            destination_id,
            category: None,
            location: None,
        }
    }

    /// Rejects demand scores the ABC thresholds cannot classify meaningfully.
    ///
    /// # Examples
    /// ```
    /// use slotting_engine::model::Item;
    ///
    /// assert!(Item::new(1, "sku1", 80.0, 5, 1).validate().is_ok());
    /// assert!(Item::new(1, "sku1", f64::NAN, 5, 1).validate().is_err());
    /// assert!(Item::new(1, "sku1", 140.0, 5, 1).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        let value = self.pick_frequency;
        if !value.is_finite() || !(MIN_PICK_FREQUENCY..=MAX_PICK_FREQUENCY).contains(&value) {
            return Err(ValidationError::InvalidCategoryInput {
                item_id: self.id,
                value,
            });
        }
        Ok(())
    }
}

/// Partially filled pallet already on the floor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pallet {
    pub item_id: u64,
    pub location: String,
    pub remaining_space: u32,
}

impl Pallet {
    /// Whether this pallet may absorb `item`. Space must strictly exceed the quantity.
    pub fn can_absorb(&self, item: &Item) -> bool {
        self.item_id == item.id && self.remaining_space > item.quantity
    }
}

/// Outbound destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Destination {
    pub id: u64,
    #[serde(default)]
    pub preferred_zone: Option<String>,
}

impl Destination {
    /// Preferred zone label, if present and not blank.
    pub fn zone(&self) -> Option<&str> {
        self.preferred_zone
            .as_deref()
            .map(str::trim)
            .filter(|zone| !zone.is_empty())
    }
}

/// Destination reference data for one allocation run.
#[derive(Clone, Debug, Default)]
pub struct DestinationTable {
    by_id: HashMap<u64, Destination>,
}

impl DestinationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Option<&Destination> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl FromIterator<Destination> for DestinationTable {
    fn from_iter<I: IntoIterator<Item = Destination>>(iter: I) -> Self {
        Self {
            by_id: iter.into_iter().map(|d| (d.id, d)).collect(),
        }
    }
}

/// On-hand quantity of one SKU at one location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StockRecord {
    #[schema(value_type = String, example = "10-a-2")]
    pub location: LocationKey,
    pub sku: String,
    pub quantity: u32,
}

impl StockRecord {
    pub fn new(location: LocationKey, sku: impl Into<String>, quantity: u32) -> Self {
        Self {
            location,
            sku: sku.into(),
            quantity,
        }
    }
}

/// Requested quantity of one SKU.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub sku: String,
    pub quantity_requested: u32,
}

impl Order {
    pub fn new(sku: impl Into<String>, quantity_requested: u32) -> Self {
        Self {
            sku: sku.into(),
            quantity_requested,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sku.trim().is_empty() {
            return Err(ValidationError::Empty("Order SKU"));
        }
        if self.quantity_requested == 0 {
            return Err(ValidationError::ZeroQuantity {
                what: format!("Requested quantity for '{}'", self.sku),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_boundaries_belong_to_lower_class() {
        assert_eq!(Category::from_pick_frequency(81.0), Category::A);
        assert_eq!(Category::from_pick_frequency(80.0), Category::B);
        assert_eq!(Category::from_pick_frequency(80.5), Category::A);
        assert_eq!(Category::from_pick_frequency(51.0), Category::B);
        assert_eq!(Category::from_pick_frequency(50.0), Category::C);
        assert_eq!(Category::from_pick_frequency(0.0), Category::C);
        assert_eq!(Category::from_pick_frequency(100.0), Category::A);
    }

    #[test]
    fn validate_rejects_out_of_domain_scores() {
        for bad in [f64::NAN, f64::INFINITY, -0.5, 100.1] {
            let err = Item::new(7, "sku", bad, 1, 1).validate().unwrap_err();
            assert!(matches!(err, ValidationError::InvalidCategoryInput { item_id: 7, .. }));
        }
        assert!(Item::new(7, "sku", 0.0, 1, 1).validate().is_ok());
        assert!(Item::new(7, "sku", 100.0, 1, 1).validate().is_ok());
    }

    #[test]
    fn pallet_needs_strictly_more_space() {
        let item = Item::new(3, "sku", 60.0, 10, 1);
        let exact = Pallet {
            item_id: 3,
            location: "1-a-1".into(),
            remaining_space: 10,
        };
        let roomy = Pallet {
            remaining_space: 11,
            ..exact.clone()
        };
        let other = Pallet {
            item_id: 4,
            ..roomy.clone()
        };
        assert!(!exact.can_absorb(&item));
        assert!(roomy.can_absorb(&item));
        assert!(!other.can_absorb(&item));
    }

    #[test]
    fn blank_zone_counts_as_absent() {
        let blank = Destination {
            id: 1,
            preferred_zone: Some("  ".into()),
        };
        let north = Destination {
            id: 2,
            preferred_zone: Some("North".into()),
        };
        assert_eq!(blank.zone(), None);
        assert_eq!(north.zone(), Some("North"));

        let table: DestinationTable = vec![blank, north].into_iter().collect();
        assert_eq!(table.len(), 2);
        assert!(table.get(3).is_none());
    }

    #[test]
    fn order_validation() {
        assert!(Order::new("sku1", 5).validate().is_ok());
        assert!(Order::new(" ", 5).validate().is_err());
        assert!(Order::new("sku1", 0).validate().is_err());
    }
}
