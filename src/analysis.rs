use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::data::{load_element_sets, ParseOptions, DEFAULT_LIMIT};
use crate::propagation::{Propagator, Snapshot};

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Element set file (plain text or .gz)
    #[arg(long)]
    pub tle: PathBuf,
    /// Output JSON file path
    #[arg(long, default_value = "out/ephemeris.json")]
    pub output: PathBuf,
    /// Time horizon in hours
    #[arg(long, default_value_t = 2.0)]
    pub hours: f64,
    /// Propagation step in seconds
    #[arg(long, default_value_t = 60)]
    pub step_seconds: u64,
    /// Start time (RFC 3339); defaults to now
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,
    /// Maximum number of element sets to load
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,
    /// Threads used per step
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
}

#[derive(Debug, Serialize)]
struct EphemerisDocument {
    generated_at: String,
    start_time_utc: String,
    hours: f64,
    step_seconds: u64,
    total_objects: usize,
    snapshots: Vec<Snapshot>,
}

pub fn run_export(args: ExportArgs) -> Result<()> {
    if args.step_seconds == 0 {
        return Err(anyhow!("step-seconds must be > 0"));
    }
    if !(args.hours > 0.0) {
        return Err(anyhow!("hours must be > 0"));
    }

    let options = ParseOptions {
        limit: args.limit,
        ..Default::default()
    };
    let sets = load_element_sets(&args.tle, &options)?;
    let propagator = Propagator::new(&sets);

    let start = args.start.unwrap_or_else(Utc::now);
    let snapshots = sweep(&propagator, start, args.hours, args.step_seconds, args.workers);

    let document = EphemerisDocument {
        generated_at: Utc::now().to_rfc3339(),
        start_time_utc: start.to_rfc3339(),
        hours: args.hours,
        step_seconds: args.step_seconds,
        total_objects: propagator.len(),
        snapshots,
    };

    if let Some(parent) = args.output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("Failed to create {:?}", args.output))?;
    serde_json::to_writer_pretty(file, &document)?;

    log::info!("Wrote ephemeris to {:?}", args.output);
    Ok(())
}

/// Propagate the whole collection at `start + k * step` across the horizon
fn sweep(
    propagator: &Propagator,
    start: DateTime<Utc>,
    hours: f64,
    step_seconds: u64,
    workers: usize,
) -> Vec<Snapshot> {
    let steps = ((hours * 3600.0) / step_seconds as f64).ceil() as u64;
    let total_steps = steps + 1;

    log::info!(
        "Propagating {} objects for {} hours ({} samples)...",
        propagator.len(),
        hours,
        total_steps
    );

    let progress = ProgressBar::new(total_steps);
    if let Ok(style) = ProgressStyle::with_template(
        "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
    ) {
        progress.set_style(style.progress_chars("##-"));
    }

    let mut snapshots = Vec::with_capacity(total_steps as usize);
    for step in 0..=steps {
        let instant = start + Duration::seconds((step * step_seconds) as i64);
        let positions = propagator.propagate_all_parallel(&instant, workers);
        snapshots.push(Snapshot { instant, positions });
        progress.inc(1);
    }

    progress.finish_and_clear();
    snapshots
}
