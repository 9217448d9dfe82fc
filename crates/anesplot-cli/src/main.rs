mod render;

use anesplot_lib::{
    conditioning::fix_baseline_wander,
    config::PipelineConfig,
    detectors::{detect_beats, insert_beat, locate_beats, remove_beats, Species},
    io::{
        tables::{
            read_beats_csv, read_interpolated_csv, write_beats_csv, write_interpolated_csv,
            write_intervals_csv,
        },
        trend::{read_trend_csv, write_trend_csv},
        wave::{read_wave_csv, write_wave_csv},
    },
    metrics::{compute_intervals, hrv_time, interpolate_intervals, HRVTime},
    pipeline::run_heart_rate_pipeline,
    plot::{beat_review_figure, rr_review_figure, Figure, PlotBackend, RrLowerPanel},
    reconcile::{agreement_figure, merge_back},
    signal::SampleWindow,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use render::PngBackend;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "anesplot",
    version,
    about = "anesplot: heart rate from anesthesia ekg recordings"
)]
struct Cli {
    /// TOML file overriding the pipeline defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Condition the ekg of a wave recording and detect its beats
    DetectBeats {
        #[arg(long)]
        wave: PathBuf,
        #[arg(long, default_value_t = 300.0, value_parser = parse_fs)]
        fs: f64,
        #[arg(long, default_value = "horse")]
        species: Species,
        #[arg(long)]
        out: PathBuf,
        /// Beat review figure (PNG)
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Print the row indices of the beats strictly inside a sample window
    LocateBeats {
        #[arg(long)]
        beats: PathBuf,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
    },
    /// Drop beats by row index
    RemoveBeats {
        #[arg(long)]
        beats: PathBuf,
        #[arg(long = "index", required = true)]
        indices: Vec<usize>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Search a sample window for a missed beat and add it to the table
    InsertBeat {
        #[arg(long)]
        wave: PathBuf,
        #[arg(long, default_value_t = 300.0, value_parser = parse_fs)]
        fs: f64,
        #[arg(long, default_value = "horse")]
        species: Species,
        #[arg(long)]
        beats: PathBuf,
        #[arg(long)]
        start: usize,
        #[arg(long)]
        end: usize,
        #[arg(long)]
        out: PathBuf,
    },
    /// Beats to rr intervals and per-sample rr series; prints HRV as JSON
    HeartRate {
        #[arg(long)]
        beats: PathBuf,
        #[arg(long, default_value_t = 300.0, value_parser = parse_fs)]
        fs: f64,
        #[arg(long)]
        intervals_out: Option<PathBuf>,
        #[arg(long)]
        series_out: PathBuf,
        /// rr review figure (PNG)
        #[arg(long)]
        plot: Option<PathBuf>,
        /// Show squared rr variation instead of heart rate in the lower panel
        #[arg(long)]
        variation: bool,
    },
    /// Conditioning, detection and rr extraction in one pass; prints a JSON summary
    Pipeline {
        #[arg(long)]
        wave: PathBuf,
        #[arg(long, default_value_t = 300.0, value_parser = parse_fs)]
        fs: f64,
        #[arg(long, default_value = "horse")]
        species: Species,
        #[arg(long)]
        beats_out: Option<PathBuf>,
        #[arg(long)]
        series_out: Option<PathBuf>,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Merge an rr series back into the wave and trend recordings
    Reconcile {
        #[arg(long)]
        wave: PathBuf,
        #[arg(long, default_value_t = 300.0, value_parser = parse_fs)]
        fs: f64,
        #[arg(long)]
        trend: PathBuf,
        #[arg(long)]
        series: PathBuf,
        #[arg(long)]
        trend_out: PathBuf,
        #[arg(long)]
        wave_out: Option<PathBuf>,
        /// Monitor against derived heart rate (PNG)
        #[arg(long)]
        plot: Option<PathBuf>,
    },
}

/// Sampling rate in Hz; must be finite and positive.
fn parse_fs(value: &str) -> Result<f64, String> {
    let fs: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if fs.is_finite() && fs > 0.0 {
        Ok(fs)
    } else {
        Err(format!("sampling rate must be positive, got {value}"))
    }
}

#[derive(Serialize)]
struct PipelineSummary {
    fs: f64,
    sample_count: usize,
    beats: usize,
    hrv: HRVTime,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    match cli.command {
        Commands::DetectBeats {
            wave,
            fs,
            species,
            out,
            plot,
        } => cmd_detect_beats(&cfg, &wave, fs, &species, &out, plot.as_deref()),
        Commands::LocateBeats { beats, start, end } => cmd_locate_beats(&beats, start, end),
        Commands::RemoveBeats {
            beats,
            indices,
            out,
        } => cmd_remove_beats(&beats, &indices, &out),
        Commands::InsertBeat {
            wave,
            fs,
            species,
            beats,
            start,
            end,
            out,
        } => cmd_insert_beat(&cfg, &wave, fs, &species, &beats, start, end, &out),
        Commands::HeartRate {
            beats,
            fs,
            intervals_out,
            series_out,
            plot,
            variation,
        } => cmd_heart_rate(
            &cfg,
            &beats,
            fs,
            intervals_out.as_deref(),
            &series_out,
            plot.as_deref(),
            variation,
        ),
        Commands::Pipeline {
            wave,
            fs,
            species,
            beats_out,
            series_out,
            plot,
        } => cmd_pipeline(
            &cfg,
            &wave,
            fs,
            &species,
            beats_out.as_deref(),
            series_out.as_deref(),
            plot.as_deref(),
        ),
        Commands::Reconcile {
            wave,
            fs,
            trend,
            series,
            trend_out,
            wave_out,
            plot,
        } => cmd_reconcile(
            &cfg,
            &wave,
            fs,
            &trend,
            &series,
            &trend_out,
            wave_out.as_deref(),
            plot.as_deref(),
        ),
    }
}

fn render(path: &Path, fig: &Figure) -> Result<()> {
    PngBackend::new(path)
        .draw(fig)
        .with_context(|| format!("rendering {}", path.display()))?;
    info!("figure written to {}", path.display());
    Ok(())
}

fn cmd_detect_beats(
    cfg: &PipelineConfig,
    wave: &Path,
    fs: f64,
    species: &Species,
    out: &Path,
    plot: Option<&Path>,
) -> Result<()> {
    let wave = read_wave_csv(wave, fs)?;
    let conditioned = fix_baseline_wander(&wave.ekg(), &cfg.conditioner);
    let beats = detect_beats(&conditioned, species, &cfg.detection);
    write_beats_csv(out, &beats)?;
    info!("{} beats written to {}", beats.len(), out.display());
    if let Some(path) = plot {
        render(path, &beat_review_figure(&conditioned, &beats))?;
    }
    Ok(())
}

fn cmd_locate_beats(beats: &Path, start: usize, end: usize) -> Result<()> {
    let beats = read_beats_csv(beats)?;
    let found = locate_beats(&beats, SampleWindow::new(start, end));
    println!("{}", serde_json::to_string(&found)?);
    Ok(())
}

fn cmd_remove_beats(beats: &Path, indices: &[usize], out: &Path) -> Result<()> {
    let beats = read_beats_csv(beats)?;
    let curated = remove_beats(&beats, indices)?;
    write_beats_csv(out, &curated)?;
    info!("{} beats left", curated.len());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_insert_beat(
    cfg: &PipelineConfig,
    wave: &Path,
    fs: f64,
    species: &Species,
    beats: &Path,
    start: usize,
    end: usize,
    out: &Path,
) -> Result<()> {
    let params = cfg.detection.apply(species.profile()?);
    let wave = read_wave_csv(wave, fs)?;
    let conditioned = fix_baseline_wander(&wave.ekg(), &cfg.conditioner);
    let beats = read_beats_csv(beats)?;
    let curated = insert_beat(&beats, &conditioned, SampleWindow::new(start, end), &params)?;
    write_beats_csv(out, &curated)?;
    Ok(())
}

fn cmd_heart_rate(
    cfg: &PipelineConfig,
    beats: &Path,
    fs: f64,
    intervals_out: Option<&Path>,
    series_out: &Path,
    plot: Option<&Path>,
    variation: bool,
) -> Result<()> {
    let beats = read_beats_csv(beats)?;
    let intervals = compute_intervals(&beats, fs, &cfg.intervals);
    let series = interpolate_intervals(&intervals);
    if let Some(path) = intervals_out {
        write_intervals_csv(path, &intervals)?;
    }
    write_interpolated_csv(series_out, &series)?;
    if let Some(path) = plot {
        let lower = if variation {
            RrLowerPanel::SqVariation
        } else {
            RrLowerPanel::HeartRate
        };
        render(path, &rr_review_figure(&series, fs, lower))?;
    }
    println!("{}", serde_json::to_string(&hrv_time(&intervals))?);
    Ok(())
}

fn cmd_pipeline(
    cfg: &PipelineConfig,
    wave: &Path,
    fs: f64,
    species: &Species,
    beats_out: Option<&Path>,
    series_out: Option<&Path>,
    plot: Option<&Path>,
) -> Result<()> {
    let wave = read_wave_csv(wave, fs)?;
    let result = run_heart_rate_pipeline(&wave.ekg(), species, cfg);
    if let Some(path) = beats_out {
        write_beats_csv(path, &result.beats)?;
    }
    if let Some(path) = series_out {
        write_interpolated_csv(path, &result.series)?;
    }
    if let Some(path) = plot {
        render(path, &beat_review_figure(&result.conditioned, &result.beats))?;
    }
    let summary = PipelineSummary {
        fs,
        sample_count: wave.len(),
        beats: result.beats.len(),
        hrv: result.hrv,
    };
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_reconcile(
    cfg: &PipelineConfig,
    wave: &Path,
    fs: f64,
    trend: &Path,
    series: &Path,
    trend_out: &Path,
    wave_out: Option<&Path>,
    plot: Option<&Path>,
) -> Result<()> {
    let wave = read_wave_csv(wave, fs)?;
    let trend = read_trend_csv(trend)?;
    let series = read_interpolated_csv(series)?;
    let merged = merge_back(&trend, &wave, &series, &cfg.reconcile);
    info!("{} heart rate bins", merged.bins.len());
    write_trend_csv(trend_out, &merged.trend)?;
    if let Some(path) = wave_out {
        write_wave_csv(path, &merged.wave)?;
    }
    if let Some(path) = plot {
        render(path, &agreement_figure(&trend, &wave, &series))?;
    }
    Ok(())
}
