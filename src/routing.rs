//! Pick-route planning.
//!
//! Orders are served one after another in input order. Three strategies decide which
//! locations feed an order:
//!
//! * [`PlanStrategy::Nearest`] walks the candidates rack by rack, buckets them into full and
//!   partial pallets, scores them by Manhattan distance to a reference slot and consumes them
//!   nearest first.
//! * [`PlanStrategy::ShelfPriority`] hands out whole pallets by shelf level (keeping a reserve
//!   on shelf A) and serves small remainders from shelf A only.
//! * [`PlanStrategy::Sequenced`] ranks every candidate into one of eight tiers and takes the
//!   best one, re-ranking after each pick.
//!
//! Stock is drawn from the planner's own copy; the caller's records are never touched.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::model::{Order, StockRecord};
use crate::types::{LocationKey, Shelf};

/// Full pallets shelf A must hold before [`PlanStrategy::ShelfPriority`] draws from it.
pub const SHELF_A_RESERVE: usize = 2;

/// How candidate locations are chosen for an order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// Nearest location first, full pallets winning distance ties.
    #[default]
    Nearest,
    /// Whole pallets by shelf level, small remainders from shelf A.
    ShelfPriority,
    /// Eight-tier ranking by pallet state, shelf and fit.
    Sequenced,
}

impl std::fmt::Display for PlanStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlanStrategy::Nearest => "nearest",
            PlanStrategy::ShelfPriority => "shelf_priority",
            PlanStrategy::Sequenced => "sequenced",
        };
        f.write_str(name)
    }
}

/// Configuration for the route planner.
#[derive(Copy, Clone, Debug)]
pub struct PlannerConfig {
    /// Units on a full pallet.
    pub pallet_size: u32,
    /// Slot distances are measured from.
    pub reference: LocationKey,
    /// Use the legacy bucket rule, which drops partial pallets for large orders and
    /// overfilled locations altogether. Only read by [`PlanStrategy::Nearest`].
    pub strict_pallet_buckets: bool,
    pub strategy: PlanStrategy,
}

impl PlannerConfig {
    pub const DEFAULT_PALLET_SIZE: u32 = 24;
    pub const DEFAULT_REFERENCE: LocationKey = LocationKey::ORIGIN;
    pub const DEFAULT_STRICT_PALLET_BUCKETS: bool = false;

    pub fn builder() -> PlannerConfigBuilder {
        PlannerConfigBuilder::default()
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            pallet_size: Self::DEFAULT_PALLET_SIZE,
            reference: Self::DEFAULT_REFERENCE,
            strict_pallet_buckets: Self::DEFAULT_STRICT_PALLET_BUCKETS,
            strategy: PlanStrategy::default(),
        }
    }
}

/// Builder for [`PlannerConfig`].
#[derive(Clone, Debug, Default)]
pub struct PlannerConfigBuilder {
    config: PlannerConfig,
}

impl PlannerConfigBuilder {
    pub fn pallet_size(mut self, size: u32) -> Self {
        self.config.pallet_size = size;
        self
    }

    pub fn reference(mut self, reference: LocationKey) -> Self {
        self.config.reference = reference;
        self
    }

    pub fn strict_pallet_buckets(mut self, strict: bool) -> Self {
        self.config.strict_pallet_buckets = strict;
        self
    }

    pub fn strategy(mut self, strategy: PlanStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn build(self) -> PlannerConfig {
        self.config
    }
}

/// Pallet bucket of a candidate location. Full sorts before partial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PalletBucket {
    Full,
    Partial,
}

/// Why a location holding the SKU was left out of an order's route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Partial pallet while the order still needs at least a full pallet.
    PartialForLargeOrder,
    /// More units than a full pallet.
    AboveFullPallet,
    /// Full pallet on shelf A while the shelf holds fewer than [`SHELF_A_RESERVE`].
    ShelfAReserve,
}

impl ExclusionReason {
    pub fn code(&self) -> &'static str {
        match self {
            ExclusionReason::PartialForLargeOrder => "partial_for_large_order",
            ExclusionReason::AboveFullPallet => "above_full_pallet",
            ExclusionReason::ShelfAReserve => "shelf_a_reserve",
        }
    }
}

impl std::fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExclusionReason::PartialForLargeOrder => {
                write!(f, "Partial pallet skipped for an order of a full pallet or more")
            }
            ExclusionReason::AboveFullPallet => {
                write!(f, "Location holds more than one full pallet")
            }
            ExclusionReason::ShelfAReserve => write!(
                f,
                "Shelf A holds fewer than {SHELF_A_RESERVE} full pallets, kept in reserve"
            ),
        }
    }
}

/// Why an order could not be filled completely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallReason {
    /// Every usable location for the SKU has been drawn.
    StockExhausted,
    /// The order needs more than a pallet and no full pallet is left to hand out.
    NoFullPallet,
    /// The remainder fits on one pallet but shelf A has no pallet that can serve it.
    NoShelfAPallet,
}

impl ShortfallReason {
    pub fn code(&self) -> &'static str {
        match self {
            ShortfallReason::StockExhausted => "stock_exhausted",
            ShortfallReason::NoFullPallet => "no_full_pallet",
            ShortfallReason::NoShelfAPallet => "no_shelf_a_pallet",
        }
    }
}

impl std::fmt::Display for ShortfallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShortfallReason::StockExhausted => write!(f, "No locations available for allocation"),
            ShortfallReason::NoFullPallet => write!(
                f,
                "No full pallets available for allocation. Consolidate or wait for replenishment"
            ),
            ShortfallReason::NoShelfAPallet => write!(
                f,
                "No pallet on shelf A holds enough for the remainder. Force allocate, \
                 consolidate or wait for replenishment"
            ),
        }
    }
}

/// Outcome of bucketing one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Included(PalletBucket),
    Excluded(ExclusionReason),
}

/// Buckets a location for an order that still needs `remaining` units.
pub fn classify(quantity: u32, remaining: u32, config: &PlannerConfig) -> Classification {
    let size = config.pallet_size;
    if !config.strict_pallet_buckets {
        return if quantity >= size {
            Classification::Included(PalletBucket::Full)
        } else {
            Classification::Included(PalletBucket::Partial)
        };
    }

    if quantity < size && remaining < size {
        Classification::Included(PalletBucket::Partial)
    } else if quantity == size {
        Classification::Included(PalletBucket::Full)
    } else if quantity < size {
        Classification::Excluded(ExclusionReason::PartialForLargeOrder)
    } else {
        Classification::Excluded(ExclusionReason::AboveFullPallet)
    }
}

/// Tier of a candidate under [`PlanStrategy::Sequenced`]; lower tiers are drawn first.
///
/// `untouched` marks a pallet nobody has picked from yet.
///
/// | tier | pallet    | shelf | remaining vs. on hand |
/// |------|-----------|-------|-----------------------|
/// | 1    | untouched | A     | equal                 |
/// | 2    | untouched | other | equal                 |
/// | 3    | untouched | other | more                  |
/// | 4    | untouched | A     | more                  |
/// | 5    | opened    | A     | equal or more         |
/// | 6    | opened    | other | equal or more         |
/// | 7    | any       | A     | less                  |
/// | 8    | any       | other | less                  |
pub fn sequence_tier(quantity: u32, remaining: u32, on_shelf_a: bool, untouched: bool) -> u8 {
    use std::cmp::Ordering::{Equal, Greater, Less};

    match (untouched, remaining.cmp(&quantity), on_shelf_a) {
        (true, Equal, true) => 1,
        (true, Equal, false) => 2,
        (true, Greater, false) => 3,
        (true, Greater, true) => 4,
        (false, Greater | Equal, true) => 5,
        (false, Greater | Equal, false) => 6,
        (_, Less, true) => 7,
        (_, Less, false) => 8,
    }
}

/// One stop of the pick route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PickInstruction {
    pub sku: String,
    #[schema(value_type = String, example = "10-a-2")]
    pub location: LocationKey,
    pub quantity_picked: u32,
    pub distance: u32,
    pub pallet: PalletBucket,
}

/// Unsatisfied part of an order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Shortfall {
    pub sku: String,
    pub requested: u32,
    pub picked: u32,
    pub missing: u32,
    pub reason: ShortfallReason,
}

/// A stock location left out of an order's route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Exclusion {
    pub sku: String,
    #[schema(value_type = String, example = "50-a-3")]
    pub location: LocationKey,
    pub quantity: u32,
    pub reason: ExclusionReason,
}

/// Order that failed validation and was not planned.
#[derive(Clone, Debug)]
pub struct RejectedOrder {
    pub order: Order,
    pub reason: ValidationError,
}

/// Result of a planning pass.
#[derive(Clone, Debug, Default)]
pub struct PickPlan {
    pub instructions: Vec<PickInstruction>,
    pub shortfalls: Vec<Shortfall>,
    pub exclusions: Vec<Exclusion>,
    pub rejected_orders: Vec<RejectedOrder>,
    /// Stock after all picks, in input order.
    pub stock: Vec<StockRecord>,
}

impl PickPlan {
    /// Whether every order was planned and fully satisfied.
    pub fn is_complete(&self) -> bool {
        self.shortfalls.is_empty() && self.rejected_orders.is_empty()
    }

    pub fn total_picked(&self, sku: &str) -> u64 {
        self.instructions
            .iter()
            .filter(|pick| pick.sku == sku)
            .map(|pick| u64::from(pick.quantity_picked))
            .sum()
    }

    pub fn total_missing(&self) -> u64 {
        self.shortfalls.iter().map(|s| u64::from(s.missing)).sum()
    }
}

/// Events emitted while planning, suitable for SSE streaming.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PlanEvent {
    /// A stock line the caller sent could not be read. Emitted by the HTTP shell before
    /// planning starts; the planner itself only sees parsed records.
    StockSkipped {
        location: String,
        sku: String,
        quantity: u32,
        reason_code: String,
        reason: String,
    },
    OrderStarted {
        sku: String,
        requested: u32,
    },
    OrderRejected {
        sku: String,
        reason_code: String,
        reason_text: String,
    },
    CandidateExcluded {
        sku: String,
        location: String,
        quantity: u32,
        reason_code: String,
        reason_text: String,
    },
    Picked {
        sku: String,
        location: String,
        quantity: u32,
        distance: u32,
        pallet: PalletBucket,
    },
    Shortfall {
        sku: String,
        requested: u32,
        picked: u32,
        missing: u32,
        reason_code: String,
        reason_text: String,
    },
    Finished {
        instructions: usize,
        shortfalls: usize,
    },
}

/// Plans picks with the default configuration.
pub fn plan_picks(orders: &[Order], stock: &[StockRecord]) -> PickPlan {
    plan_picks_with_config(orders, stock, PlannerConfig::default())
}

/// Plans picks with a custom configuration.
pub fn plan_picks_with_config(
    orders: &[Order],
    stock: &[StockRecord],
    config: PlannerConfig,
) -> PickPlan {
    plan_picks_with_progress(orders, stock, config, |_| {})
}

type EventSink<'a> = &'a mut dyn FnMut(&PlanEvent);

/// Plans picks and reports every decision through `on_event`.
pub fn plan_picks_with_progress(
    orders: &[Order],
    stock: &[StockRecord],
    config: PlannerConfig,
    mut on_event: impl FnMut(&PlanEvent),
) -> PickPlan {
    let on_event: EventSink<'_> = &mut on_event;
    let mut plan = PickPlan {
        stock: stock.to_vec(),
        ..PickPlan::default()
    };

    // Traversal order through the aisles; stable so duplicate keys keep input order.
    let mut walk: Vec<usize> = (0..plan.stock.len()).collect();
    walk.sort_by_key(|&idx| plan.stock[idx].location);

    for order in orders {
        if let Err(reason) = order.validate() {
            tracing::warn!(sku = %order.sku, %reason, "order rejected");
            on_event(&PlanEvent::OrderRejected {
                sku: order.sku.clone(),
                reason_code: reason.code().to_string(),
                reason_text: reason.to_string(),
            });
            plan.rejected_orders.push(RejectedOrder {
                order: order.clone(),
                reason,
            });
            continue;
        }

        on_event(&PlanEvent::OrderStarted {
            sku: order.sku.clone(),
            requested: order.quantity_requested,
        });

        let (remaining, reason) = match config.strategy {
            PlanStrategy::Nearest => route_nearest(&mut plan, &walk, order, &config, on_event),
            PlanStrategy::ShelfPriority => {
                route_shelf_priority(&mut plan, &walk, order, &config, on_event)
            }
            PlanStrategy::Sequenced => route_sequenced(&mut plan, &walk, order, &config, on_event),
        };

        if remaining > 0 {
            let shortfall = Shortfall {
                sku: order.sku.clone(),
                requested: order.quantity_requested,
                picked: order.quantity_requested - remaining,
                missing: remaining,
                reason,
            };
            tracing::info!(
                sku = %shortfall.sku,
                requested = shortfall.requested,
                missing = shortfall.missing,
                reason = reason.code(),
                "order partially fulfilled"
            );
            on_event(&PlanEvent::Shortfall {
                sku: shortfall.sku.clone(),
                requested: shortfall.requested,
                picked: shortfall.picked,
                missing: shortfall.missing,
                reason_code: reason.code().to_string(),
                reason_text: reason.to_string(),
            });
            plan.shortfalls.push(shortfall);
        }
    }

    on_event(&PlanEvent::Finished {
        instructions: plan.instructions.len(),
        shortfalls: plan.shortfalls.len(),
    });
    tracing::info!(
        orders = orders.len(),
        strategy = %config.strategy,
        picks = plan.instructions.len(),
        shortfalls = plan.shortfalls.len(),
        exclusions = plan.exclusions.len(),
        "planning pass finished"
    );
    plan
}

/// Draws `quantity` units from a stock line and records the pick.
fn record_pick(
    plan: &mut PickPlan,
    index: usize,
    quantity: u32,
    pallet: PalletBucket,
    config: &PlannerConfig,
    on_event: EventSink<'_>,
) {
    let record = &mut plan.stock[index];
    record.quantity -= quantity;
    let location = record.location;
    let sku = record.sku.clone();
    let distance = location.distance_to(&config.reference);

    on_event(&PlanEvent::Picked {
        sku: sku.clone(),
        location: location.to_string(),
        quantity,
        distance,
        pallet,
    });
    plan.instructions.push(PickInstruction {
        sku,
        location,
        quantity_picked: quantity,
        distance,
        pallet,
    });
}

fn record_exclusion(
    plan: &mut PickPlan,
    index: usize,
    reason: ExclusionReason,
    on_event: EventSink<'_>,
) {
    let record = &plan.stock[index];
    on_event(&PlanEvent::CandidateExcluded {
        sku: record.sku.clone(),
        location: record.location.to_string(),
        quantity: record.quantity,
        reason_code: reason.code().to_string(),
        reason_text: reason.to_string(),
    });
    plan.exclusions.push(Exclusion {
        sku: record.sku.clone(),
        location: record.location,
        quantity: record.quantity,
        reason,
    });
}

struct Candidate {
    index: usize,
    bucket: PalletBucket,
    distance: u32,
}

fn route_nearest(
    plan: &mut PickPlan,
    walk: &[usize],
    order: &Order,
    config: &PlannerConfig,
    on_event: EventSink<'_>,
) -> (u32, ShortfallReason) {
    let mut remaining = order.quantity_requested;
    let mut candidates = Vec::new();
    for &index in walk {
        let record = &plan.stock[index];
        if record.sku != order.sku || record.quantity == 0 {
            continue;
        }
        match classify(record.quantity, remaining, config) {
            Classification::Included(bucket) => candidates.push(Candidate {
                index,
                bucket,
                distance: record.location.distance_to(&config.reference),
            }),
            Classification::Excluded(reason) => record_exclusion(plan, index, reason, on_event),
        }
    }

    // Stable: equal keys keep walk order.
    candidates.sort_by_key(|candidate| (candidate.distance, candidate.bucket));

    for candidate in candidates {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(plan.stock[candidate.index].quantity);
        record_pick(plan, candidate.index, taken, candidate.bucket, config, on_event);
        remaining -= taken;
    }
    (remaining, ShortfallReason::StockExhausted)
}

fn route_shelf_priority(
    plan: &mut PickPlan,
    walk: &[usize],
    order: &Order,
    config: &PlannerConfig,
    on_event: EventSink<'_>,
) -> (u32, ShortfallReason) {
    let size = config.pallet_size;
    let mut remaining = order.quantity_requested;
    // Pallets handed out whole or opened for this order are not revisited.
    let mut used: Vec<usize> = Vec::new();
    let mut reserved: Vec<usize> = Vec::new();

    while remaining > 0 {
        let available: Vec<usize> = walk
            .iter()
            .copied()
            .filter(|index| {
                let record = &plan.stock[*index];
                record.sku == order.sku && record.quantity > 0 && !used.contains(index)
            })
            .collect();
        if available.is_empty() {
            return (remaining, ShortfallReason::StockExhausted);
        }

        if remaining > size {
            let mut chosen = None;
            for shelf in Shelf::ALL {
                let full: Vec<usize> = available
                    .iter()
                    .copied()
                    .filter(|index| {
                        let record = &plan.stock[*index];
                        record.location.shelf() == shelf && record.quantity >= size
                    })
                    .collect();
                if shelf == Shelf::A && full.len() < SHELF_A_RESERVE {
                    for index in full {
                        if !reserved.contains(&index) {
                            reserved.push(index);
                            record_exclusion(plan, index, ExclusionReason::ShelfAReserve, on_event);
                        }
                    }
                    continue;
                }
                // Highest bin; reversed so ties resolve to the earliest in walk order.
                chosen = full
                    .iter()
                    .rev()
                    .copied()
                    .max_by_key(|index| plan.stock[*index].location.bin());
                if chosen.is_some() {
                    break;
                }
            }

            let Some(index) = chosen else {
                return (remaining, ShortfallReason::NoFullPallet);
            };
            let taken = remaining.min(plan.stock[index].quantity);
            record_pick(plan, index, taken, PalletBucket::Full, config, on_event);
            remaining -= taken;
            used.push(index);
        } else {
            let on_a = |index: &usize| plan.stock[*index].location.shelf() == Shelf::A;
            let partial = available
                .iter()
                .copied()
                .filter(|index| {
                    let quantity = plan.stock[*index].quantity;
                    on_a(index) && quantity > remaining && quantity < size
                })
                .min_by_key(|index| plan.stock[*index].quantity)
                .map(|index| (index, PalletBucket::Partial));
            let source = partial.or_else(|| {
                available
                    .iter()
                    .copied()
                    .find(|index| on_a(index) && plan.stock[*index].quantity >= size)
                    .map(|index| (index, PalletBucket::Full))
            });

            let Some((index, bucket)) = source else {
                return (remaining, ShortfallReason::NoShelfAPallet);
            };
            record_pick(plan, index, remaining, bucket, config, on_event);
            remaining = 0;
        }
    }
    (remaining, ShortfallReason::StockExhausted)
}

fn route_sequenced(
    plan: &mut PickPlan,
    walk: &[usize],
    order: &Order,
    config: &PlannerConfig,
    on_event: EventSink<'_>,
) -> (u32, ShortfallReason) {
    let size = config.pallet_size;
    let mut remaining = order.quantity_requested;
    let mut used: Vec<usize> = Vec::new();

    while remaining > 0 {
        let best = walk
            .iter()
            .copied()
            .filter(|index| {
                let record = &plan.stock[*index];
                record.sku == order.sku && record.quantity > 0 && !used.contains(index)
            })
            .map(|index| {
                let record = &plan.stock[index];
                let untouched = record.quantity >= size;
                let on_a = record.location.shelf() == Shelf::A;
                let tier = sequence_tier(record.quantity, remaining, on_a, untouched);
                // Tiers 1-6 prefer the fullest location, tier 7 the emptiest.
                let within = match tier {
                    1..=6 => -i64::from(record.quantity),
                    7 => i64::from(record.quantity),
                    _ => 0,
                };
                (index, tier, within, untouched)
            })
            .min_by_key(|&(_, tier, within, _)| (tier, within));

        let Some((index, tier, _, untouched)) = best else {
            return (remaining, ShortfallReason::StockExhausted);
        };
        let bucket = if untouched {
            PalletBucket::Full
        } else {
            PalletBucket::Partial
        };
        let taken = remaining.min(plan.stock[index].quantity);
        tracing::debug!(sku = %order.sku, tier, taken, "sequenced pick");
        record_pick(plan, index, taken, bucket, config, on_event);
        remaining -= taken;
        used.push(index);
    }
    (remaining, ShortfallReason::StockExhausted)
}
