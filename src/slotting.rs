//! Slotting allocator.
//!
//! Assigns a storage location to every item of an inbound batch:
//! 1. ABC classification by pick frequency
//! 2. reuse of a partially filled pallet holding the same item
//! 3. category row band with a five-column round robin
//! 4. destination zone prefix
//! 5. clustering of neighbours inside a destination batch
//!
//! Pallets are never mutated in place. The outcome carries an updated copy plus one draw
//! record per absorbed item.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::model::{Category, DestinationTable, Item, Pallet};

/// Number of columns a row band cycles through.
pub const ZONE_COLUMNS: usize = 5;

/// How an item got its initial slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacementSource {
    /// Slot taken from an existing partial pallet.
    PartialPallet { pallet_index: usize },
    /// Slot derived from the category row band.
    Zone { row_band: u8, column: usize },
}

/// Why no destination prefix was applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotAdjustedReason {
    /// The item's destination is missing from the destination table.
    UnknownDestination,
    /// The destination exists but has no preferred zone.
    NoPreferredZone,
    /// Pallet reuse skips the zone steps entirely.
    PalletReuse,
}

/// Result of the destination adjustment step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DestinationAdjustment {
    Adjusted { zone: String },
    NotAdjusted { reason: NotAdjustedReason },
}

/// An item with its final location and the trail of decisions that produced it.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct LocatedItem {
    pub item: Item,
    /// Zero-based rank in processing order.
    pub rank: usize,
    pub placement: PlacementSource,
    pub adjustment: DestinationAdjustment,
    /// Location before clustering.
    pub initial_location: String,
    /// Item whose slot overwrote this one during clustering.
    pub clustered_with: Option<u64>,
}

impl LocatedItem {
    /// Final location. Always set for items produced by [`assign_locations`].
    pub fn location(&self) -> &str {
        self.item.location.as_deref().unwrap_or(&self.initial_location)
    }

    pub fn category(&self) -> Category {
        self.item
            .category
            .unwrap_or_else(|| Category::from_pick_frequency(self.item.pick_frequency))
    }
}

/// Item that could not be classified.
#[derive(Clone, Debug)]
pub struct RejectedItem {
    pub item: Item,
    pub reason: ValidationError,
}

/// Space taken from a pallet by one item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PalletDraw {
    pub pallet_index: usize,
    pub item_id: u64,
    pub quantity: u32,
    pub remaining_after: u32,
}

/// Result of an allocation pass.
#[derive(Clone, Debug)]
pub struct AllocationOutcome {
    /// Accepted items in processing order.
    pub items: Vec<LocatedItem>,
    pub rejected: Vec<RejectedItem>,
    /// Pallet state after the pass, same order as the input.
    pub pallets: Vec<Pallet>,
    pub pallet_draws: Vec<PalletDraw>,
}

impl AllocationOutcome {
    /// Whether every input item received a location.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    pub fn located_count(&self) -> usize {
        self.items.len()
    }

    pub fn clustered_count(&self) -> usize {
        self.items
            .iter()
            .filter(|entry| entry.clustered_with.is_some())
            .count()
    }
}

/// Base slot of a category band, e.g. `Row1-Column3`.
pub fn zone_location(category: Category, rank: usize) -> (String, usize) {
    let column = rank % ZONE_COLUMNS + 1;
    (format!("Row{}-Column{}", category.row_band(), column), column)
}

/// Prefixes `base` with the destination's preferred zone, if any.
pub fn adjust_for_destination(
    item: &Item,
    base: String,
    destinations: &DestinationTable,
) -> (String, DestinationAdjustment) {
    let Some(destination) = destinations.get(item.destination_id) else {
        return (
            base,
            DestinationAdjustment::NotAdjusted {
                reason: NotAdjustedReason::UnknownDestination,
            },
        );
    };
    match destination.zone() {
        Some(zone) => (
            format!("{zone}-{base}"),
            DestinationAdjustment::Adjusted {
                zone: zone.to_string(),
            },
        ),
        None => (
            base,
            DestinationAdjustment::NotAdjusted {
                reason: NotAdjustedReason::NoPreferredZone,
            },
        ),
    }
}

/// First pallet in collection order that can absorb the item. No best-fit search.
fn find_partial_pallet(item: &Item, pallets: &[Pallet]) -> Option<usize> {
    pallets.iter().position(|pallet| pallet.can_absorb(item))
}

/// Assigns a location to every valid item.
///
/// Items are processed by descending pick frequency; ties keep their input order. Items
/// whose pick frequency is outside `0..=100` are rejected without stopping the pass.
pub fn assign_locations(
    items: Vec<Item>,
    pallets: &[Pallet],
    destinations: &DestinationTable,
) -> AllocationOutcome {
    let mut rejected = Vec::new();
    let mut accepted = Vec::with_capacity(items.len());
    for item in items {
        match item.validate() {
            Ok(()) => accepted.push(item),
            Err(reason) => {
                tracing::warn!(item_id = item.id, %reason, "item rejected");
                rejected.push(RejectedItem { item, reason });
            }
        }
    }

    accepted.sort_by(|a, b| {
        b.pick_frequency
            .partial_cmp(&a.pick_frequency)
            .unwrap_or(Ordering::Equal)
    });

    let mut pallets = pallets.to_vec();
    let mut pallet_draws = Vec::new();
    let mut located = Vec::with_capacity(accepted.len());

    for (rank, mut item) in accepted.into_iter().enumerate() {
        let category = Category::from_pick_frequency(item.pick_frequency);
        item.category = Some(category);

        let (location, placement, adjustment) = match find_partial_pallet(&item, &pallets) {
            Some(pallet_index) => {
                let pallet = &mut pallets[pallet_index];
                pallet.remaining_space -= item.quantity;
                pallet_draws.push(PalletDraw {
                    pallet_index,
                    item_id: item.id,
                    quantity: item.quantity,
                    remaining_after: pallet.remaining_space,
                });
                (
                    pallet.location.clone(),
                    PlacementSource::PartialPallet { pallet_index },
                    DestinationAdjustment::NotAdjusted {
                        reason: NotAdjustedReason::PalletReuse,
                    },
                )
            }
            None => {
                let (base, column) = zone_location(category, rank);
                let (location, adjustment) = adjust_for_destination(&item, base, destinations);
                (
                    location,
                    PlacementSource::Zone {
                        row_band: category.row_band(),
                        column,
                    },
                    adjustment,
                )
            }
        };

        tracing::debug!(
            item_id = item.id,
            sku = %item.sku,
            %category,
            %location,
            "item placed"
        );

        item.location = Some(location.clone());
        located.push(LocatedItem {
            item,
            rank,
            placement,
            adjustment,
            initial_location: location,
            clustered_with: None,
        });
    }

    cluster_batches(&mut located);

    let outcome = AllocationOutcome {
        items: located,
        rejected,
        pallets,
        pallet_draws,
    };
    tracing::info!(
        located = outcome.located_count(),
        rejected = outcome.rejected.len(),
        pallet_draws = outcome.pallet_draws.len(),
        clustered = outcome.clustered_count(),
        "allocation pass finished"
    );
    outcome
}

/// Groups item indices by destination. Batches appear in order of first occurrence and keep
/// processing order inside.
fn create_batches(items: &[LocatedItem]) -> Vec<Vec<usize>> {
    let mut batches: Vec<(u64, Vec<usize>)> = Vec::new();
    for (idx, entry) in items.iter().enumerate() {
        let destination = entry.item.destination_id;
        match batches.iter_mut().find(|(id, _)| *id == destination) {
            Some((_, members)) => members.push(idx),
            None => batches.push((destination, vec![idx])),
        }
    }
    batches.into_iter().map(|(_, members)| members).collect()
}

fn needs_clustering(a: &LocatedItem, b: &LocatedItem) -> bool {
    a.item.category == b.item.category || a.item.destination_id == b.item.destination_id
}

/// Pulls each item onto its successor's slot. The later item wins, even when the earlier
/// one sat on a reused pallet.
fn cluster_batches(items: &mut [LocatedItem]) {
    for batch in create_batches(items) {
        for pair in batch.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if !needs_clustering(&items[current], &items[next]) {
                continue;
            }
            let location = items[next].item.location.clone();
            let next_id = items[next].item.id;
            let entry = &mut items[current];
            entry.item.location = location;
            entry.clustered_with = Some(next_id);
        }
    }
}
