mod app;
mod chart;
mod pack;
mod records;
mod table;
mod util;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{Level, debug, info, warn};

use pack::{BubbleLayout, PackConfig};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON records: `[{"label": ..., "size": ..., "image_url": ...}, ...]`
    input: PathBuf,
    /// JSON packing settings (`spacing`, `plot_diameter`, `iterations`); flags override it
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Minimum gap between bubble outlines [default: 1]
    #[arg(long)]
    spacing: Option<f64>,
    /// Figure size the bubble areas are scaled against [default: 600]
    #[arg(long)]
    diameter: Option<f64>,
    /// Relaxation passes toward the centroid [default: 100]
    #[arg(long)]
    iterations: Option<usize>,
    /// Pack only the first N records
    #[arg(long, default_value_t = records::DEFAULT_RECORD_LIMIT)]
    limit: usize,
    /// Write the placement table here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
    /// Also render the chart as SVG
    #[arg(long)]
    svg: Option<PathBuf>,
    /// Open the interactive viewer
    #[arg(long)]
    view: bool,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn pack_config(&self) -> Result<PackConfig> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => PackConfig::default(),
        };
        Ok(PackConfig {
            spacing: self.spacing.unwrap_or(base.spacing),
            plot_diameter: self.diameter.unwrap_or(base.plot_diameter),
            iterations: self.iterations.unwrap_or(base.iterations),
        })
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn load_config(path: &Path) -> Result<PackConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config in {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(args.log_level())
        .init();

    let config = args.pack_config()?;
    debug!(?config, "packing settings");
    let inputs = records::load_records(&args.input, args.limit)?;

    let mut layout = BubbleLayout::new(inputs.clone(), &config)
        .with_context(|| format!("cannot pack records from {}", args.input.display()))?;
    info!(
        bubbles = layout.len(),
        plot_radius = layout.plot_radius(),
        scale_factor = layout.scale_factor(),
        "placed bubbles on grid"
    );

    let summary = layout.collapse(config.iterations);
    info!(
        passes = summary.passes,
        moves = summary.moves,
        step_distance = summary.step_distance,
        "relaxation finished"
    );

    let table = layout.to_table();
    let overlaps = table.overlapping_pairs();
    if !overlaps.is_empty() {
        warn!(pairs = overlaps.len(), "layout still has overlapping bubbles");
    }

    match &args.output {
        Some(path) => table.write_json(path)?,
        None => println!("{}", table.to_json()?),
    }

    if let Some(path) = &args.svg {
        chart::write_svg(path, &table)?;
        info!(path = %path.display(), "wrote bubble chart");
    }

    if args.view {
        let options = eframe::NativeOptions {
            viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 860.0]),
            ..Default::default()
        };

        eframe::run_native(
            "bubble-pack",
            options,
            Box::new(move |cc| {
                Ok(Box::new(app::BubbleViewerApp::new(
                    cc, inputs, layout, config,
                )))
            }),
        )
        .map_err(|error| anyhow!("viewer failed: {error}"))?;
    }

    Ok(())
}
