use std::path::Path;

use anyhow::{Context, Result};
use svg::node::Text as TextNode;
use svg::node::element::{Circle, ClipPath, Definitions, Element, Group, Image};
use svg::{Document, Node};

use crate::table::{BubbleTable, PlacedBubble};

/// Extra room around the packed circles, as a share of the larger extent.
const VIEW_PADDING: f64 = 0.02;
const DISC_FILL: &str = "#3c6e9f";

fn coord(value: f64) -> String {
    format!("{value:.3}")
}

fn clip_id(index: usize) -> String {
    format!("bubble-{index}")
}

fn title(label: &str) -> Element {
    let mut title = Element::new("title");
    title.append(TextNode::new(label));
    title
}

fn bubble_group(index: usize, row: &PlacedBubble) -> Group {
    let group = Group::new().set("class", "bubble").add(title(&row.label));
    let diameter = coord(row.radius * 2.0);

    match row.image_url.as_deref() {
        Some(url) => group.add(
            Image::new()
                .set("href", url)
                .set("x", coord(row.x - row.radius))
                .set("y", coord(-(row.y + row.radius)))
                .set("width", diameter.clone())
                .set("height", diameter)
                .set("preserveAspectRatio", "xMidYMid slice")
                .set("clip-path", format!("url(#{})", clip_id(index))),
        ),
        None => group.add(
            Circle::new()
                .set("cx", coord(row.x))
                .set("cy", coord(-row.y))
                .set("r", coord(row.radius))
                .set("fill", DISC_FILL),
        ),
    }
}

/// Builds the chart as a square SVG figure `plot_diameter` pixels wide.
///
/// Chart coordinates are y-up, so every y is negated on the way out. Each
/// bubble draws its image clipped to the circle (or a plain disc when it has
/// none) and carries its label as a hover title.
pub fn chart_document(table: &BubbleTable) -> Document {
    let (min, max) = table.bounds().unwrap_or(((0.0, 0.0), (0.0, 0.0)));
    let extent = (max.0 - min.0).max(max.1 - min.1).max(1.0);
    let padding = extent * VIEW_PADDING;
    let view_box = format!(
        "{} {} {} {}",
        coord(min.0 - padding),
        coord(-max.1 - padding),
        coord((max.0 - min.0) + padding * 2.0),
        coord((max.1 - min.1) + padding * 2.0),
    );

    let clips = table
        .rows
        .iter()
        .enumerate()
        .fold(Definitions::new(), |defs, (index, row)| {
            defs.add(
                ClipPath::new().set("id", clip_id(index)).add(
                    Circle::new()
                        .set("cx", coord(row.x))
                        .set("cy", coord(-row.y))
                        .set("r", coord(row.radius)),
                ),
            )
        });

    let document = Document::new()
        .set("width", table.plot_diameter)
        .set("height", table.plot_diameter)
        .set("viewBox", view_box)
        .set("preserveAspectRatio", "xMidYMid meet")
        .add(clips);

    table
        .rows
        .iter()
        .enumerate()
        .fold(document, |document, (index, row)| document.add(bubble_group(index, row)))
}

pub fn render_svg(table: &BubbleTable) -> String {
    chart_document(table).to_string()
}

pub fn write_svg(path: &Path, table: &BubbleTable) -> Result<()> {
    svg::save(path, &chart_document(table))
        .with_context(|| format!("failed to write bubble chart to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BubbleTable {
        BubbleTable {
            plot_diameter: 600.0,
            spacing: 1.0,
            rows: vec![
                PlacedBubble {
                    label: "Somchai & Co".to_owned(),
                    x: 10.0,
                    y: 20.0,
                    radius: 5.0,
                    size: 78.5,
                    weight: 0.4,
                    image_url: Some("https://example.org/a.jpg?s=1&d=mp".to_owned()),
                },
                PlacedBubble {
                    label: "Malee".to_owned(),
                    x: -10.0,
                    y: 3.0,
                    radius: 2.0,
                    size: 12.6,
                    weight: 0.1,
                    image_url: None,
                },
            ],
        }
    }

    #[test]
    fn test_figure_is_square_plot_diameter() {
        let svg = render_svg(&table());
        assert!(svg.contains("<svg"));
        assert!(svg.contains(r#"width="600""#));
        assert!(svg.contains(r#"height="600""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_image_top_left_is_flipped() {
        let svg = render_svg(&table());
        assert!(svg.contains(r#"x="5.000""#));
        assert!(svg.contains(r#"y="-25.000""#));
        assert!(svg.contains(r#"width="10.000""#));
        assert!(svg.contains(r#"clip-path="url(#bubble-0)""#));
        assert!(svg.contains(r#"id="bubble-0""#));
        assert!(svg.contains(r#"cy="-20.000""#));
    }

    #[test]
    fn test_labels_and_urls_are_escaped() {
        let svg = render_svg(&table());
        assert!(svg.contains("Somchai &amp; Co"));
        assert!(!svg.contains("Somchai & Co"));
        assert!(svg.contains("a.jpg?s=1&amp;d=mp"));
    }

    #[test]
    fn test_bubble_without_image_is_a_disc() {
        let svg = render_svg(&table());
        assert!(svg.contains(r#"cx="-10.000""#));
        assert!(svg.contains(r#"cy="-3.000""#));
        assert!(svg.contains(r#"r="2.000""#));
        assert!(svg.contains(r##"fill="#3c6e9f""##));
    }

    #[test]
    fn test_view_box_encloses_circles() {
        let svg = render_svg(&table());
        // x spans -12..15 and y spans 1..25, padded by 2% of 27
        assert!(svg.contains(r#"viewBox="-12.540 -25.540 28.080 25.080""#));
    }

    #[test]
    fn test_write_svg_saves_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        write_svg(&path, &table()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), render_svg(&table()));
    }
}
