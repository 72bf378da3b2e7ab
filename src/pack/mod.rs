//! Circle packing for bubble charts.
//!
//! Items are sized so their combined area fills a fixed share of an enclosing
//! disk, laid out on a square grid, then pulled toward their area-weighted
//! centroid one step at a time. A move is only accepted when it keeps every
//! pair of outlines at least `spacing` apart, so the layout never overlaps.

mod error;
mod geometry;
mod query;

use std::f64::consts::PI;

use serde::Deserialize;
use tracing::{debug, info_span, trace};

pub use error::PackError;
pub use geometry::Point;
use query::{Circle, check_collisions, nearest_colliding};

use crate::table::{BubbleTable, PlacedBubble};

/// Share of the enclosing disk covered by the sum of all bubble areas.
pub const OCCUPANCY_FRACTION: f64 = 0.6;
/// `plot_radius = plot_diameter / PLOT_RADIUS_DIVISOR`; leaves a margin around the packing.
pub const PLOT_RADIUS_DIVISOR: f64 = 2.5;
/// A pass in which fewer than this share of bubbles moved halves the step distance.
pub const COOLDOWN_MOVE_RATIO: f64 = 0.05;

/// Packing settings; missing fields in a config file take the defaults.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    pub spacing: f64,
    pub plot_diameter: f64,
    pub iterations: usize,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            plot_diameter: 600.0,
            iterations: 100,
        }
    }
}

/// One record to place. `image_url` is carried through to the export untouched.
#[derive(Clone, Debug, PartialEq)]
pub struct BubbleInput {
    pub label: String,
    pub weight: f64,
    pub image_url: Option<String>,
}

impl BubbleInput {
    pub fn new(label: impl Into<String>, weight: f64) -> Self {
        Self {
            label: label.into(),
            weight,
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }
}

/// Stable handle of a bubble; equal to its position in the input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BubbleId(pub usize);

#[derive(Clone, Debug)]
pub struct Bubble {
    pub id: BubbleId,
    pub label: String,
    pub image_url: Option<String>,
    pub weight: f64,
    /// Scaled area: `weight * scale_factor`.
    pub area: f64,
    pub radius: f64,
    pub position: Point,
}

impl Bubble {
    fn circle_at(&self, center: Point) -> Circle {
        Circle {
            center,
            radius: self.radius,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollapseSummary {
    pub passes: usize,
    pub moves: usize,
    pub step_distance: f64,
}

#[derive(Clone, Debug)]
pub struct BubbleLayout {
    bubbles: Vec<Bubble>,
    spacing: f64,
    plot_diameter: f64,
    scale_factor: f64,
    step_distance: f64,
    centroid: Point,
}

impl BubbleLayout {
    pub fn new(
        inputs: impl IntoIterator<Item = BubbleInput>,
        config: &PackConfig,
    ) -> Result<Self, PackError> {
        let inputs = inputs.into_iter().collect::<Vec<_>>();
        if !config.plot_diameter.is_finite() || config.plot_diameter <= 0.0 {
            return Err(PackError::InvalidDiameter(config.plot_diameter));
        }
        if !config.spacing.is_finite() || config.spacing < 0.0 {
            return Err(PackError::InvalidSpacing(config.spacing));
        }
        if inputs.is_empty() {
            return Err(PackError::Empty);
        }
        if let Some(bad) = inputs
            .iter()
            .find(|input| !input.weight.is_finite() || input.weight < 0.0)
        {
            return Err(PackError::InvalidWeight {
                label: bad.label.clone(),
                weight: bad.weight,
            });
        }

        let total_weight = inputs.iter().map(|input| input.weight).sum::<f64>();
        if total_weight <= 0.0 {
            return Err(PackError::ZeroTotalWeight);
        }

        let plot_radius = config.plot_diameter / PLOT_RADIUS_DIVISOR;
        let scale_factor = OCCUPANCY_FRACTION * PI * plot_radius * plot_radius / total_weight;
        // Radii and grid positions are only finite while both of these are.
        if !total_weight.is_finite() || !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(PackError::UnscalableWeights {
                total_weight,
                scale_factor,
            });
        }

        let mut bubbles = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                let area = input.weight * scale_factor;
                Bubble {
                    id: BubbleId(index),
                    label: input.label,
                    image_url: input.image_url,
                    weight: input.weight,
                    area,
                    radius: (area / PI).sqrt(),
                    position: Point::ZERO,
                }
            })
            .collect::<Vec<_>>();

        let max_radius = bubbles
            .iter()
            .map(|bubble| bubble.radius)
            .fold(0.0_f64, f64::max);
        let cell = 2.0 * max_radius + config.spacing;
        let side = (bubbles.len() as f64).sqrt().ceil() as usize;
        for (index, bubble) in bubbles.iter_mut().enumerate() {
            let column = index % side;
            let row = index / side;
            bubble.position = Point::new(column as f64 * cell, row as f64 * cell);
        }

        let mut layout = Self {
            bubbles,
            spacing: config.spacing,
            plot_diameter: config.plot_diameter,
            scale_factor,
            step_distance: cell / 2.0,
            centroid: Point::ZERO,
        };
        layout.centroid = layout.center_of_mass();
        Ok(layout)
    }

    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn bubble(&self, id: BubbleId) -> Option<&Bubble> {
        self.bubbles.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn plot_diameter(&self) -> f64 {
        self.plot_diameter
    }

    pub fn plot_radius(&self) -> f64 {
        self.plot_diameter / PLOT_RADIUS_DIVISOR
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn step_distance(&self) -> f64 {
        self.step_distance
    }

    pub fn centroid(&self) -> Point {
        self.centroid
    }

    fn center_of_mass(&self) -> Point {
        let mut weighted = Point::ZERO;
        let mut total = 0.0;
        for bubble in &self.bubbles {
            weighted += bubble.position * bubble.area;
            total += bubble.area;
        }
        if total > 0.0 {
            Point::new(weighted.x / total, weighted.y / total)
        } else {
            weighted
        }
    }

    fn is_clear(&self, id: BubbleId, probe: Circle) -> bool {
        check_collisions(probe, &self.bubbles, self.spacing, id) == 0
    }

    fn move_bubble(&mut self, id: BubbleId, position: Point) {
        self.bubbles[id.0].position = position;
        self.centroid = self.center_of_mass();
    }

    /// Runs up to `max_iterations` relaxation passes.
    pub fn collapse(&mut self, max_iterations: usize) -> CollapseSummary {
        let _span = info_span!("collapse", bubbles = self.bubbles.len(), max_iterations).entered();

        let mut moves = 0;
        for pass in 0..max_iterations {
            let moved = self.collapse_pass();
            debug!(pass, moved, step_distance = self.step_distance, "collapse pass");
            moves += moved;
        }

        CollapseSummary {
            passes: max_iterations,
            moves,
            step_distance: self.step_distance,
        }
    }

    /// One relaxation pass over every bubble in input order. Returns how many
    /// bubbles stepped directly toward the centroid; sidesteps are not counted.
    pub fn collapse_pass(&mut self) -> usize {
        let mut moves = 0;
        for index in 0..self.bubbles.len() {
            let id = BubbleId(index);
            let current = self.bubbles[index].position;
            let Some(direction) = (self.centroid - current).normalized() else {
                continue;
            };

            let proposal = current + direction * self.step_distance;
            let probe = self.bubbles[index].circle_at(proposal);
            if self.is_clear(id, probe) {
                self.move_bubble(id, proposal);
                moves += 1;
                continue;
            }

            if let Some(sidestep) = self.sidestep(id, probe) {
                self.move_bubble(id, sidestep);
            }
        }

        if (moves as f64) / (self.bubbles.len() as f64) < COOLDOWN_MOVE_RATIO {
            self.step_distance /= 2.0;
            trace!(step_distance = self.step_distance, "cooling down");
        }

        moves
    }

    /// Steps perpendicular to the deepest collision of `blocked`, toward
    /// whichever side lands closer to the centroid. `None` when that spot is
    /// also occupied.
    fn sidestep(&self, id: BubbleId, blocked: Circle) -> Option<Point> {
        let neighbour = nearest_colliding(blocked, &self.bubbles, self.spacing, id)?;
        let current = self.bubbles[id.0].position;
        let toward = (self.bubbles[neighbour.0].position - current).normalized()?;
        let orthogonal = toward.orthogonal();

        let first = current + orthogonal * self.step_distance;
        let second = current + orthogonal * -self.step_distance;
        let candidate = if self.centroid.distance(first) < self.centroid.distance(second) {
            first
        } else {
            second
        };

        self.is_clear(id, self.bubbles[id.0].circle_at(candidate))
            .then_some(candidate)
    }

    /// Number of bubble pairs whose outlines are closer than `spacing`.
    pub fn overlapping_pairs(&self) -> usize {
        self.bubbles
            .iter()
            .map(|bubble| {
                let later = &self.bubbles[bubble.id.0 + 1..];
                check_collisions(bubble.circle_at(bubble.position), later, self.spacing, bubble.id)
            })
            .sum()
    }

    pub fn to_table(&self) -> BubbleTable {
        BubbleTable {
            plot_diameter: self.plot_diameter,
            spacing: self.spacing,
            rows: self
                .bubbles
                .iter()
                .map(|bubble| PlacedBubble {
                    label: bubble.label.clone(),
                    x: bubble.position.x,
                    y: bubble.position.y,
                    radius: bubble.radius,
                    size: bubble.area,
                    weight: bubble.weight,
                    image_url: bubble.image_url.clone(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equal_config() -> PackConfig {
        PackConfig {
            spacing: 1.0,
            plot_diameter: 100.0,
            iterations: 50,
        }
    }

    fn inputs(weights: &[f64]) -> Vec<BubbleInput> {
        weights
            .iter()
            .enumerate()
            .map(|(index, &weight)| BubbleInput::new(format!("member-{index}"), weight))
            .collect()
    }

    fn skewed(count: usize) -> Vec<BubbleInput> {
        let mut weights = vec![1000.0];
        weights.extend(std::iter::repeat_n(1.0, count - 1));
        inputs(&weights)
    }

    fn min_outline_gap(layout: &BubbleLayout) -> f64 {
        let bubbles = layout.bubbles();
        let mut min_gap = f64::INFINITY;
        for (i, a) in bubbles.iter().enumerate() {
            for b in &bubbles[i + 1..] {
                let gap = a.position.distance(b.position) - a.radius - b.radius - layout.spacing();
                min_gap = min_gap.min(gap);
            }
        }
        min_gap
    }

    fn mean_distance_to_centroid(layout: &BubbleLayout) -> f64 {
        let centroid = layout.centroid();
        layout
            .bubbles()
            .iter()
            .map(|bubble| bubble.position.distance(centroid))
            .sum::<f64>()
            / layout.len() as f64
    }

    #[test]
    fn test_radii_fill_occupancy_fraction() {
        let layout = BubbleLayout::new(inputs(&[3.0, 1.0, 7.5, 0.25, 12.0]), &equal_config())
            .unwrap();

        let plot_radius = layout.plot_radius();
        let target = OCCUPANCY_FRACTION * PI * plot_radius * plot_radius;
        let total = layout
            .bubbles()
            .iter()
            .map(|bubble| PI * bubble.radius * bubble.radius)
            .sum::<f64>();

        assert!(layout.bubbles().iter().all(|b| b.radius.is_finite() && b.radius > 0.0));
        assert!((total - target).abs() < target * 1e-9);
        assert_eq!(plot_radius, 40.0);
    }

    #[test]
    fn test_radius_matches_scaled_area() {
        let layout = BubbleLayout::new(inputs(&[2.0, 8.0]), &equal_config()).unwrap();
        for bubble in layout.bubbles() {
            let area = bubble.weight * layout.scale_factor();
            assert!((bubble.area - area).abs() < 1e-9);
            assert!((bubble.radius - (area / PI).sqrt()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_initial_grid_has_no_overlap() {
        let layout = BubbleLayout::new(skewed(50), &equal_config()).unwrap();
        assert!(min_outline_gap(&layout) >= 0.0);
        assert_eq!(layout.overlapping_pairs(), 0);
    }

    #[test]
    fn test_initial_grid_is_row_major() {
        let layout = BubbleLayout::new(inputs(&[1.0; 5]), &equal_config()).unwrap();
        let cell = 2.0 * layout.bubbles()[0].radius + 1.0;
        let positions = layout
            .bubbles()
            .iter()
            .map(|bubble| bubble.position)
            .collect::<Vec<_>>();

        assert_eq!(positions[0], Point::new(0.0, 0.0));
        assert_eq!(positions[1], Point::new(cell, 0.0));
        assert_eq!(positions[2], Point::new(cell * 2.0, 0.0));
        assert_eq!(positions[3], Point::new(0.0, cell));
        assert_eq!(positions[4], Point::new(cell, cell));
        assert_eq!(layout.step_distance(), cell / 2.0);
    }

    #[test]
    fn test_centroid_is_area_weighted_mean() {
        let layout = BubbleLayout::new(inputs(&[1.0, 2.0, 3.0, 4.0]), &equal_config()).unwrap();

        let total = layout.bubbles().iter().map(|b| b.area).sum::<f64>();
        let x = layout.bubbles().iter().map(|b| b.position.x * b.area).sum::<f64>() / total;
        let y = layout.bubbles().iter().map(|b| b.position.y * b.area).sum::<f64>() / total;

        assert!((layout.centroid().x - x).abs() < 1e-9);
        assert!((layout.centroid().y - y).abs() < 1e-9);
    }

    #[test]
    fn test_collapse_zero_iterations_is_noop() {
        let mut layout = BubbleLayout::new(skewed(10), &equal_config()).unwrap();
        let before = layout.to_table();
        let centroid = layout.centroid();
        let step = layout.step_distance();

        let summary = layout.collapse(0);

        assert_eq!(summary.passes, 0);
        assert_eq!(layout.to_table(), before);
        assert_eq!(layout.centroid(), centroid);
        assert_eq!(layout.step_distance(), step);
    }

    #[test]
    fn test_collapse_is_deterministic() {
        let config = equal_config();
        let mut first = BubbleLayout::new(skewed(20), &config).unwrap();
        let mut second = BubbleLayout::new(skewed(20), &config).unwrap();

        first.collapse(40);
        second.collapse(40);

        assert_eq!(first.to_table(), second.to_table());
    }

    #[test]
    fn test_equal_weights_stay_equal_and_apart() {
        let mut layout = BubbleLayout::new(inputs(&[10.0; 4]), &equal_config()).unwrap();
        layout.collapse(50);
        let table = layout.to_table();

        let radius = table.rows[0].radius;
        assert!(table.rows.iter().all(|row| (row.radius - radius).abs() < 1e-12));
        assert!(min_outline_gap(&layout) >= -1e-9);
        let labels = table.rows.iter().map(|row| row.label.as_str()).collect::<Vec<_>>();
        assert_eq!(labels, ["member-0", "member-1", "member-2", "member-3"]);
    }

    #[test]
    fn test_single_bubble_never_moves() {
        let mut layout = BubbleLayout::new(inputs(&[5.0]), &equal_config()).unwrap();
        let start = layout.bubbles()[0].position;
        assert_eq!(layout.centroid(), start);

        layout.collapse(25);

        assert_eq!(layout.bubbles()[0].position, start);
        assert_eq!(layout.centroid(), start);
    }

    #[test]
    fn test_skewed_weights_never_overlap_between_passes() {
        let mut layout = BubbleLayout::new(skewed(50), &PackConfig::default()).unwrap();
        let spread_before = mean_distance_to_centroid(&layout);

        for _ in 0..100 {
            layout.collapse_pass();
            assert_eq!(layout.overlapping_pairs(), 0);
            assert!(
                layout
                    .bubbles()
                    .iter()
                    .all(|b| b.position.x.is_finite() && b.position.y.is_finite())
            );
        }

        assert!(mean_distance_to_centroid(&layout) < spread_before);
    }

    #[test]
    fn test_collapse_pulls_small_bubbles_inward() {
        let mut weights = vec![100.0];
        weights.extend([1.0; 8]);
        let mut layout = BubbleLayout::new(inputs(&weights), &equal_config()).unwrap();
        let spread_before = mean_distance_to_centroid(&layout);

        let summary = layout.collapse(100);

        assert!(summary.moves > 0);
        assert!(mean_distance_to_centroid(&layout) < spread_before);
        assert!(min_outline_gap(&layout) >= -1e-9);
    }

    #[test]
    fn test_step_distance_halves_when_stalled() {
        let mut layout = BubbleLayout::new(inputs(&[5.0]), &equal_config()).unwrap();
        let step = layout.step_distance();
        layout.collapse(3);
        assert_eq!(layout.step_distance(), step / 8.0);
    }

    #[test]
    fn test_zero_weight_items_are_placed() {
        let layout = BubbleLayout::new(inputs(&[0.0, 4.0]), &equal_config()).unwrap();
        assert_eq!(layout.bubbles()[0].radius, 0.0);
        assert!(layout.bubbles()[1].radius > 0.0);
        assert!(layout.centroid().distance(layout.bubbles()[1].position) < 1e-9);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let config = equal_config();
        assert_eq!(
            BubbleLayout::new(inputs(&[0.0, 0.0]), &config).unwrap_err(),
            PackError::ZeroTotalWeight
        );
        assert_eq!(
            BubbleLayout::new(Vec::<BubbleInput>::new(), &config).unwrap_err(),
            PackError::Empty
        );
        assert!(matches!(
            BubbleLayout::new(inputs(&[1.0, -2.0]), &config),
            Err(PackError::InvalidWeight { weight, .. }) if weight == -2.0
        ));
        assert!(matches!(
            BubbleLayout::new(inputs(&[f64::NAN]), &config),
            Err(PackError::InvalidWeight { .. })
        ));

        let flat = PackConfig {
            plot_diameter: 0.0,
            ..config
        };
        assert_eq!(
            BubbleLayout::new(inputs(&[1.0]), &flat).unwrap_err(),
            PackError::InvalidDiameter(0.0)
        );

        let negative = PackConfig {
            spacing: -1.0,
            ..config
        };
        assert_eq!(
            BubbleLayout::new(inputs(&[1.0]), &negative).unwrap_err(),
            PackError::InvalidSpacing(-1.0)
        );
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let config: PackConfig = serde_json::from_str(r#"{"spacing": 3.5}"#).unwrap();
        assert_eq!(
            config,
            PackConfig {
                spacing: 3.5,
                ..PackConfig::default()
            }
        );
        assert!(serde_json::from_str::<PackConfig>(r#"{"iterations": -1}"#).is_err());
    }

    #[test]
    fn test_rejects_weights_outside_float_range() {
        let config = equal_config();
        assert!(matches!(
            BubbleLayout::new(inputs(&[1e308, 1e308]), &config),
            Err(PackError::UnscalableWeights { total_weight, .. }) if total_weight.is_infinite()
        ));
        assert!(matches!(
            BubbleLayout::new(inputs(&[5e-324]), &config),
            Err(PackError::UnscalableWeights { scale_factor, .. }) if scale_factor.is_infinite()
        ));

        let huge = PackConfig {
            plot_diameter: 1e200,
            ..config
        };
        assert!(matches!(
            BubbleLayout::new(inputs(&[1.0]), &huge),
            Err(PackError::UnscalableWeights { .. })
        ));
    }

    #[test]
    fn test_large_but_finite_weights_stay_finite() {
        let mut layout = BubbleLayout::new(inputs(&[1e300, 3e300, 2e300]), &equal_config()).unwrap();
        layout.collapse(20);
        for bubble in layout.bubbles() {
            assert!(bubble.radius.is_finite() && bubble.radius > 0.0);
            assert!(bubble.position.x.is_finite() && bubble.position.y.is_finite());
        }
        assert!(layout.centroid().x.is_finite() && layout.centroid().y.is_finite());
    }

    #[test]
    fn test_export_carries_metadata() {
        let input = vec![
            BubbleInput::new("a", 1.0).with_image("https://example.org/a.jpg"),
            BubbleInput::new("b", 3.0),
        ];
        let layout = BubbleLayout::new(input, &equal_config()).unwrap();
        let table = layout.to_table();

        assert_eq!(table.plot_diameter, 100.0);
        assert_eq!(table.spacing, 1.0);
        assert_eq!(table.rows[0].image_url.as_deref(), Some("https://example.org/a.jpg"));
        assert_eq!(table.rows[1].image_url, None);
        assert_eq!(table.rows[1].weight, 3.0);
        assert!((table.rows[1].size - 3.0 * layout.scale_factor()).abs() < 1e-9);
    }
}
