//! Highlight plan for the warehouse floor sheet.
//!
//! Produces, for each stocked location, the cell to paint, a pastel fill colour per SKU and
//! the `"sku: quantity"` label. Writing the workbook is left to the rendering collaborator.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::codec::{ColumnLayout, locate};
use crate::error::LocationError;
use crate::types::LocationKey;

const PASTEL_LIGHTNESS: f64 = 0.8;
const PASTEL_SATURATION: f64 = 0.5;

/// One location to highlight.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct HighlightRequestEntry {
    #[schema(example = "53-d-45")]
    pub location: String,
    pub sku: String,
    pub quantity: u32,
}

/// Paint instruction for one cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HighlightCell {
    pub location: String,
    #[schema(example = "BJ331")]
    pub cell: String,
    /// `RRGGBB` fill colour.
    pub fill: String,
    pub label: String,
}

/// Entry whose location could not be mapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HighlightFailure {
    pub location: String,
    pub reason_code: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize, ToSchema)]
pub struct HighlightPlan {
    pub cells: Vec<HighlightCell>,
    pub failures: Vec<HighlightFailure>,
}

/// `n` evenly spaced pastel colours as hex strings.
pub fn pastel_palette(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let hue = i as f64 / n as f64;
            let (r, g, b) = hls_to_rgb(hue, PASTEL_LIGHTNESS, PASTEL_SATURATION);
            format!(
                "{:02X}{:02X}{:02X}",
                (r * 255.0) as u8,
                (g * 255.0) as u8,
                (b * 255.0) as u8
            )
        })
        .collect()
}

fn hls_to_rgb(hue: f64, lightness: f64, saturation: f64) -> (f64, f64, f64) {
    if saturation == 0.0 {
        return (lightness, lightness, lightness);
    }
    let m2 = if lightness <= 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let m1 = 2.0 * lightness - m2;
    (
        hue_channel(m1, m2, hue + 1.0 / 3.0),
        hue_channel(m1, m2, hue),
        hue_channel(m1, m2, hue - 1.0 / 3.0),
    )
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

/// Builds the paint plan. SKUs get colours in order of first appearance.
pub fn highlight_plan(entries: &[HighlightRequestEntry], layout: ColumnLayout) -> HighlightPlan {
    let mut skus: Vec<&str> = Vec::new();
    for entry in entries {
        if !skus.contains(&entry.sku.as_str()) {
            skus.push(&entry.sku);
        }
    }
    let palette = pastel_palette(skus.len());

    let mut plan = HighlightPlan::default();
    for entry in entries {
        match entry.location.parse::<LocationKey>() {
            Ok(key) => {
                let colour = skus
                    .iter()
                    .position(|sku| *sku == entry.sku)
                    .and_then(|idx| palette.get(idx))
                    .cloned()
                    .unwrap_or_default();
                plan.cells.push(HighlightCell {
                    location: entry.location.clone(),
                    cell: locate(&key, layout).to_string(),
                    fill: colour,
                    label: format!("{}: {}", entry.sku, entry.quantity),
                });
            }
            Err(err) => plan.failures.push(failure(&entry.location, &err)),
        }
    }
    plan
}

fn failure(location: &str, err: &LocationError) -> HighlightFailure {
    HighlightFailure {
        location: location.to_string(),
        reason_code: err.code().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(location: &str, sku: &str, quantity: u32) -> HighlightRequestEntry {
        HighlightRequestEntry {
            location: location.into(),
            sku: sku.into(),
            quantity,
        }
    }

    #[test]
    fn single_colour_is_red_pastel() {
        assert_eq!(pastel_palette(1), vec!["E5B2B2".to_string()]);
        assert!(pastel_palette(0).is_empty());
    }

    #[test]
    fn palette_colours_are_distinct() {
        let palette = pastel_palette(6);
        for (i, a) in palette.iter().enumerate() {
            assert_eq!(a.len(), 6);
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn same_sku_shares_a_colour() {
        let entries = vec![
            entry("53-d-45", "OLN-ERGOACE-CRM", 8),
            entry("52-a1-15", "OLN-ERGOACE-CRM", 4),
            entry("1-a-1", "sku1", 12),
        ];
        let plan = highlight_plan(&entries, ColumnLayout::default());
        assert!(plan.failures.is_empty());
        assert_eq!(plan.cells[0].cell, "BJ331");
        assert_eq!(plan.cells[0].label, "OLN-ERGOACE-CRM: 8");
        assert_eq!(plan.cells[0].fill, plan.cells[1].fill);
        assert_ne!(plan.cells[0].fill, plan.cells[2].fill);
        assert_eq!(plan.cells[2].cell, "H16");
    }

    #[test]
    fn bad_locations_are_reported_individually() {
        let entries = vec![entry("53-q-45", "a", 1), entry("2-b-2", "a", 1)];
        let plan = highlight_plan(&entries, ColumnLayout::Simplified);
        assert_eq!(plan.cells.len(), 1);
        assert_eq!(plan.failures.len(), 1);
        assert_eq!(plan.failures[0].reason_code, "unknown_shelf");
    }
}
