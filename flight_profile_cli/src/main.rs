use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use flight_profile::{
    extract_profiles, load_trajectory, write_report_file, write_run_json, Params, ProfileError,
    SameKindPolicy,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod plot;

use plot::{flight_title, render_chart_guard, ChartKind, FlightPlot, PlotFailure};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Extract climb/descent flight profiles from a trajectory file",
    long_about = None
)]
struct Cli {
    /// Input trajectory (.mat, .csv/.tsv/.txt, or .nc with the `netcdf` feature)
    #[arg(long, value_hint = ValueHint::FilePath)]
    ifile: PathBuf,

    /// Output base path without extension (`<obase>.txt`, `<obase>_cart.svg`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    obase: PathBuf,

    /// JSON file with parameter overrides
    #[arg(long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,

    /// Minimum peak altitude (m)
    #[arg(long)]
    peak_threshold: Option<f64>,

    /// Maximum valley altitude (m)
    #[arg(long)]
    valley_threshold: Option<f64>,

    /// Altitude excursion required between neighbouring peaks or valleys (m)
    #[arg(long)]
    min_separation: Option<f64>,

    /// Collapse consecutive same-kind extrema instead of skipping them
    #[arg(long, action = ArgAction::SetTrue)]
    collapse_same_kind: bool,

    /// Keep only segments shorter than the mean segment span
    #[arg(long, action = ArgAction::SetTrue)]
    drop_long_segments: bool,

    /// Additional PNG plot path
    #[arg(long, value_hint = ValueHint::FilePath)]
    png: Option<PathBuf>,

    /// Disable plot generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Write the full run (extrema, segments, summaries) as JSON
    #[arg(long, value_hint = ValueHint::FilePath)]
    json: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Log stage timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    handle_extract(cli)
}

fn handle_extract(cli: Cli) -> Result<()> {
    let params = build_params(&cli)?;
    let (report_path, plot_path) = output_paths(&cli.obase);
    let timings = cli.profile || cli.verbose;

    let t_load = Instant::now();
    let trajectory = load_trajectory(&cli.ifile, &params.variables)
        .with_context(|| format!("failed to load {}", cli.ifile.display()))?;
    let (trajectory, dropped) = trajectory.drop_non_finite();
    if dropped > 0 {
        warn!("Dropped {} samples with non-finite values", dropped);
    }
    if !trajectory.is_time_monotonic() {
        warn!("Time axis of {} is not monotonic", cli.ifile.display());
    }
    if timings {
        info!(
            "Load stage: {:.1} ms ({} samples)",
            t_load.elapsed().as_secs_f64() * 1000.0,
            trajectory.len()
        );
    }

    let t_compute = Instant::now();
    let run = extract_profiles(&trajectory, &params)?;
    if timings {
        info!(
            "Compute stage: {:.1} ms",
            t_compute.elapsed().as_secs_f64() * 1000.0
        );
    }
    debug!(
        "Candidates: {} peaks, {} valleys; {} long segments dropped",
        run.diagnostics.peak_candidates,
        run.diagnostics.valley_candidates,
        run.diagnostics.long_segments_dropped
    );
    info!(
        "Profiles: {} segments from {} peaks and {} valleys",
        run.segments.len(),
        run.peaks.len(),
        run.valleys.len()
    );
    if run.is_empty() {
        warn!("{}; writing empty outputs", ProfileError::NoProfilesFound);
    }

    write_report_file(&run.summaries, &report_path)?;
    info!("Wrote report: {}", report_path.display());

    if let Some(json_path) = cli.json.as_ref() {
        write_run_json(&run, json_path)?;
        info!("Wrote run JSON: {}", json_path.display());
    }

    if !cli.no_plot {
        let t_plot = Instant::now();
        let plot = FlightPlot {
            trajectory: &trajectory,
            run: &run,
            title: flight_title(&cli.ifile),
        };
        let mut targets = vec![(plot_path, ChartKind::Svg)];
        if let Some(png) = cli.png.clone() {
            targets.push((png, ChartKind::Png));
        }
        for (path, kind) in targets {
            match render_chart_guard(&plot, &path, kind) {
                Ok(()) => info!("Wrote plot: {}", path.display()),
                Err(PlotFailure::Render(msg)) => {
                    warn!("Skipping plot ({}): {}", path.display(), msg)
                }
                Err(PlotFailure::Write(msg)) => {
                    return Err(ProfileError::OutputWrite(format!(
                        "{}: {}",
                        path.display(),
                        msg
                    ))
                    .into());
                }
            }
        }
        if timings {
            info!(
                "Plot stage: {:.1} ms",
                t_plot.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    match trajectory.mean_wind_direction() {
        Some(deg) => println!("{:03}", deg as u32),
        None => println!("---"),
    }
    Ok(())
}

fn build_params(cli: &Cli) -> Result<Params> {
    let mut params = match cli.params.as_ref() {
        Some(path) => load_params(path)?,
        None => Params::default(),
    };
    if let Some(v) = cli.peak_threshold {
        params.peak_threshold_m = v;
    }
    if let Some(v) = cli.valley_threshold {
        params.valley_threshold_m = v;
    }
    if let Some(v) = cli.min_separation {
        params.min_separation_m = v;
    }
    if cli.collapse_same_kind {
        params.same_kind_policy = SameKindPolicy::Collapse;
    }
    if cli.drop_long_segments {
        params.drop_long_segments = true;
    }
    params.validate()?;
    if params.valley_threshold_m >= params.peak_threshold_m {
        warn!(
            "Valley threshold {} m is not below peak threshold {} m",
            params.valley_threshold_m, params.peak_threshold_m
        );
    }
    Ok(params)
}

fn load_params(path: &Path) -> Result<Params> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read parameter file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid parameter file", path.display()))
}

/// Append the report and plot suffixes to `obase` (which may itself contain dots).
fn output_paths(obase: &Path) -> (PathBuf, PathBuf) {
    let with_suffix = |suffix: &str| {
        let mut name: OsString = obase.as_os_str().to_owned();
        name.push(suffix);
        PathBuf::from(name)
    };
    (with_suffix(".txt"), with_suffix("_cart.svg"))
}
