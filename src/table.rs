use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Final placement of one bubble, in input order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacedBubble {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Scaled area in plot units.
    pub size: f64,
    pub weight: f64,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BubbleTable {
    pub plot_diameter: f64,
    pub spacing: f64,
    pub rows: Vec<PlacedBubble>,
}

impl BubbleTable {
    /// Row index pairs whose outlines are closer than `spacing`.
    pub fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.rows.iter().enumerate() {
            for (offset, b) in self.rows[i + 1..].iter().enumerate() {
                let distance = (a.x - b.x).hypot(a.y - b.y);
                if distance - a.radius - b.radius - self.spacing < 0.0 {
                    pairs.push((i, i + 1 + offset));
                }
            }
        }
        pairs
    }

    /// Smallest and largest corner of the box enclosing every circle.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut rows = self.rows.iter();
        let first = rows.next()?;
        let mut min = (first.x - first.radius, first.y - first.radius);
        let mut max = (first.x + first.radius, first.y + first.radius);
        for row in rows {
            min.0 = min.0.min(row.x - row.radius);
            min.1 = min.1.min(row.y - row.radius);
            max.0 = max.0.max(row.x + row.radius);
            max.1 = max.1.max(row.y + row.radius);
        }
        Some((min, max))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize bubble table")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json + "\n")
            .with_context(|| format!("failed to write bubble table to {}", path.display()))
    }
}
