//! Error types shared by the slotting core.
//!
//! Errors here are per-record: a malformed location or an out-of-range demand score
//! invalidates one lookup or one item, never the surrounding batch.

use thiserror::Error;

/// Failure to interpret a location key or a warehouse coordinate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The key does not have the `rack-shelf-bin` shape.
    #[error("malformed location '{0}': expected 'rack-shelf-bin'")]
    Shape(String),

    /// Rack or bin is not a positive integer.
    #[error("malformed location '{input}': {part} must be a positive integer")]
    NonPositive { input: String, part: &'static str },

    /// Shelf letter is not part of the shelf alphabet.
    #[error("malformed location: unknown shelf '{0}'")]
    UnknownShelf(String),

    /// A spreadsheet column label contains something other than A-Z.
    #[error("malformed cell reference '{0}'")]
    CellReference(String),

    /// The coordinate lies between aisles or left of the first bin column.
    #[error("cell {0} does not correspond to a storage location")]
    OffGrid(String),
}

impl LocationError {
    /// Stable machine-readable code used by the HTTP shell.
    pub fn code(&self) -> &'static str {
        match self {
            LocationError::Shape(_) => "malformed_location",
            LocationError::NonPositive { .. } => "malformed_location",
            LocationError::UnknownShelf(_) => "unknown_shelf",
            LocationError::CellReference(_) => "malformed_cell_reference",
            LocationError::OffGrid(_) => "off_grid_cell",
        }
    }
}

/// Validation error for inbound records.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Demand score is NaN, infinite or outside 0..=100.
    #[error("invalid pick frequency for item {item_id}: {value} (expected 0..=100)")]
    InvalidCategoryInput { item_id: u64, value: f64 },

    /// Demand score that is not a number at all.
    #[error("invalid pick frequency for item {item_id}: {raw} is not a number")]
    NonNumericCategoryInput { item_id: u64, raw: String },

    /// A quantity that must be positive was zero.
    #[error("{what} must be positive")]
    ZeroQuantity { what: String },

    /// A required text field is empty.
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::InvalidCategoryInput { .. }
            | ValidationError::NonNumericCategoryInput { .. } => "invalid_category_input",
            ValidationError::ZeroQuantity { .. } => "zero_quantity",
            ValidationError::Empty(_) => "empty_field",
        }
    }
}
