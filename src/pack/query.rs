use super::geometry::Point;
use super::{Bubble, BubbleId};

/// A probe circle tested against the placed bubbles.
#[derive(Clone, Copy, Debug)]
pub(super) struct Circle {
    pub(super) center: Point,
    pub(super) radius: f64,
}

fn others(bubbles: &[Bubble], exclude: BubbleId) -> impl Iterator<Item = &Bubble> {
    bubbles.iter().filter(move |bubble| bubble.id != exclude)
}

pub(super) fn center_distance(
    probe: Point,
    bubbles: &[Bubble],
    exclude: BubbleId,
) -> impl Iterator<Item = (&Bubble, f64)> {
    others(bubbles, exclude).map(move |bubble| (bubble, probe.distance(bubble.position)))
}

/// Gap between outlines minus `spacing`; negative means the circles overlap.
pub(super) fn outline_distance(
    probe: Circle,
    bubbles: &[Bubble],
    spacing: f64,
    exclude: BubbleId,
) -> impl Iterator<Item = (BubbleId, f64)> {
    center_distance(probe.center, bubbles, exclude).map(move |(bubble, distance)| {
        (bubble.id, distance - probe.radius - bubble.radius - spacing)
    })
}

pub(super) fn check_collisions(
    probe: Circle,
    bubbles: &[Bubble],
    spacing: f64,
    exclude: BubbleId,
) -> usize {
    outline_distance(probe, bubbles, spacing, exclude)
        .filter(|(_, gap)| *gap < 0.0)
        .count()
}

/// The bubble with the smallest outline distance; earliest id wins ties.
pub(super) fn nearest_colliding(
    probe: Circle,
    bubbles: &[Bubble],
    spacing: f64,
    exclude: BubbleId,
) -> Option<BubbleId> {
    outline_distance(probe, bubbles, spacing, exclude)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}
