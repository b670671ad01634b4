//! orbitrack - live constellation tracker
//!
//! Loads a TLE file, keeps every object's geodetic position up to date on a
//! fixed cadence, and samples orbit paths for the selected object.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use serde::Serialize;

use orbitrack::analysis::{run_export, ExportArgs};
use orbitrack::data::{find_by_designation, load_element_sets, ParseOptions, DEFAULT_LIMIT};
use orbitrack::propagation::{
    propagate_one, sample_path_with, start_with, LoopConfig, PathOptions, DEFAULT_SAMPLE_COUNT,
};
use orbitrack::renderer::MarkerLayer;

#[derive(Parser, Debug)]
#[command(name = "orbitrack", version, about = "Live SGP4 tracking of TLE constellations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Propagate a constellation on a fixed cadence
    Track(TrackArgs),
    /// Sample one orbit of a single object
    Path(PathArgs),
    /// Write snapshots over a time horizon to JSON
    Export(ExportArgs),
}

#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Element set file (plain text or .gz)
    #[arg(long)]
    tle: PathBuf,
    /// Maximum number of element sets to load
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,
    /// Reject element sets with bad line checksums
    #[arg(long)]
    verify_checksums: bool,
}

impl SourceArgs {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            limit: self.limit,
            verify_checksums: self.verify_checksums,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct TrackArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Milliseconds between ticks
    #[arg(long, default_value_t = 30_000)]
    interval_ms: u64,
    /// Stop after this many ticks (runs until killed when omitted)
    #[arg(long)]
    ticks: Option<usize>,
    /// Threads used to propagate one tick
    #[arg(long, default_value_t = 1)]
    workers: usize,
    /// Print every snapshot as one JSON line
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct PathArgs {
    #[command(flatten)]
    source: SourceArgs,
    /// Designation of the object (first element set when omitted)
    #[arg(long)]
    name: Option<String>,
    /// Intervals across one orbital period
    #[arg(long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    samples: usize,
    /// Reference instant (RFC 3339); defaults to now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
    /// Do not pin the path through the object's current position
    #[arg(long)]
    no_anchor: bool,
    /// Output JSON file (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PathDocument {
    designation: String,
    reference_utc: String,
    anchored: bool,
    points: Vec<[f32; 3]>,
}

fn run_track(args: TrackArgs) -> Result<()> {
    let sets = load_element_sets(&args.source.tle, &args.source.parse_options())?;
    let config = LoopConfig {
        interval: std::time::Duration::from_millis(args.interval_ms),
        workers: args.workers,
    };

    let layer = Arc::new(Mutex::new(MarkerLayer::new()));
    let (tick_tx, tick_rx) = mpsc::channel::<()>();

    let callback_layer = Arc::clone(&layer);
    let json = args.json;
    let handle = start_with(sets, config, move |snapshot| {
        if json {
            match serde_json::to_string(&snapshot) {
                Ok(line) => println!("{}", line),
                Err(e) => log::error!("Failed to encode snapshot: {}", e),
            }
        }

        let mut layer = callback_layer.lock();
        layer.apply(snapshot);
        if let Some(marker) = layer.selected() {
            log::info!(
                "{} objects at {} | {} ({}): lat {:.2} lon {:.2} alt {:.1} km",
                layer.markers().len(),
                layer.instant().map(|t| t.to_rfc3339()).unwrap_or_default(),
                marker.designation,
                marker.identifier,
                marker.geo.latitude_deg,
                marker.geo.longitude_deg,
                marker.geo.altitude_km
            );
        } else {
            log::info!("No objects could be propagated this tick");
        }

        let _ = tick_tx.send(());
    })?;

    let mut seen = 0;
    while tick_rx.recv().is_ok() {
        seen += 1;
        if args.ticks.is_some_and(|limit| seen >= limit) {
            break;
        }
    }

    handle.join();

    let layer = layer.lock();
    log::info!(
        "Tracked {} ticks, {} objects in the last snapshot",
        seen,
        layer.markers().len()
    );
    Ok(())
}

fn run_path(args: PathArgs) -> Result<()> {
    let sets = load_element_sets(&args.source.tle, &args.source.parse_options())?;
    let elements = match &args.name {
        Some(name) => find_by_designation(&sets, name)
            .ok_or_else(|| anyhow!("No element set named {:?}", name))?,
        None => sets
            .first()
            .ok_or_else(|| anyhow!("No element sets loaded"))?,
    };

    let reference = args.at.unwrap_or_else(Utc::now);
    let anchor = if args.no_anchor {
        None
    } else {
        match propagate_one(elements, &reference) {
            Ok(position) => Some(position.geo()),
            Err(e) => {
                log::warn!("Drawing path without anchor: {}", e);
                None
            }
        }
    };

    let options = PathOptions {
        sample_count: args.samples,
        force_through_anchor: anchor.is_some(),
    };
    let points = sample_path_with(Some(elements), anchor.as_ref(), &reference, &options)
        .ok_or_else(|| anyhow!("No orbit path for {}", elements.designation()))?;

    log::info!(
        "Sampled {} points for {} around {}",
        points.len(),
        elements.designation(),
        reference.to_rfc3339()
    );

    let document = PathDocument {
        designation: elements.designation().to_string(),
        reference_utc: reference.to_rfc3339(),
        anchored: anchor.is_some(),
        points: points.iter().map(|p| p.to_array()).collect(),
    };

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {:?}", path))?;
            serde_json::to_writer_pretty(file, &document)?;
            log::info!("Wrote orbit path to {:?}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&document)?),
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Track(args) => run_track(args),
        Command::Path(args) => run_path(args),
        Command::Export(args) => run_export(args),
    }
}
