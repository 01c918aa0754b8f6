//! ExamSentry - camera scan for unauthorized exam materials
//!
//! Samples a short burst of frames from a video source, combines an
//! object-classifier signal with a blank-paper heuristic, and emits one
//! verdict with photographic evidence when something is found.

mod capture;
mod config;
mod error;
mod notify;
mod scan;
mod vision;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::capture::FileSource;
use crate::config::AppConfig;
use crate::notify::WebhookSink;
use crate::scan::{FrameReport, ScanGate, ScanObserver, ScanSession, SubjectRegistry, Verdict};
use crate::vision::{PaperHeuristic, StubClassifier};

/// ExamSentry - short-burst exam material scan
#[derive(Parser, Debug)]
#[command(name = "exam-sentry")]
#[command(about = "Camera scan for unauthorized exam materials")]
struct Args {
    /// Image file or directory of stills standing in for the camera
    #[arg(short, long)]
    input: PathBuf,

    /// Scan duration in seconds (overrides config)
    #[arg(long)]
    seconds: Option<f64>,

    /// Frames sampled per second (overrides config)
    #[arg(long)]
    fps: Option<u32>,

    /// Student name recorded on the verdict
    #[arg(long)]
    name: Option<String>,

    /// Roll number recorded on the verdict
    #[arg(long)]
    roll: Option<String>,

    /// Where to write the evidence still on a positive verdict
    #[arg(long, default_value = "evidence.png")]
    evidence_out: PathBuf,

    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("ExamSentry starting...");

    let mut config = load_or_create_config(args.config.as_deref());
    if let Some(seconds) = args.seconds {
        config.scan.seconds = seconds;
    }
    if let Some(fps) = args.fps {
        config.scan.fps = fps;
    }

    // Operator input happens before the scan; the scan snapshots it
    let registry = SubjectRegistry::new();
    if args.name.is_some() || args.roll.is_some() {
        registry.set(
            args.name.as_deref().unwrap_or(""),
            args.roll.as_deref().unwrap_or(""),
        );
    }

    let mut source =
        FileSource::open(&args.input).context("Failed to open the frame source")?;

    // No model bundled with the CLI: the classifier stays quiet and the
    // paper heuristic carries the scan.
    let mut classifier = StubClassifier::new();
    warn!("no classifier model configured; scanning with the paper heuristic only");

    let mut progress = ProgressReporter;
    let session = ScanSession::new(
        &mut classifier,
        PaperHeuristic::new(config.heuristic.clone()),
        config.allow_list.clone(),
        config.scan.window(),
        ScanGate::new(),
    )
    .with_observer(&mut progress);

    let verdict = session.run(&mut source, registry.snapshot()).await?;

    print_verdict(&verdict);

    if let Some(png) = &verdict.evidence_png {
        match std::fs::write(&args.evidence_out, png) {
            Ok(()) => info!("evidence written to {:?}", args.evidence_out),
            Err(err) => warn!("could not write evidence to {:?}: {err}", args.evidence_out),
        }
    }

    if config.alert.enabled {
        let sink = WebhookSink::new(&config.alert.endpoint);
        notify::dispatch(&sink, &verdict, &config.alert.recipient, true).await;
    }

    Ok(())
}

/// Logs per-frame progress during the scan
struct ProgressReporter;

impl ScanObserver for ProgressReporter {
    fn on_frame(&mut self, report: &FrameReport) {
        info!(
            "frame {}/{}: {} detection(s), class={} paper={}",
            report.frame_index + 1,
            report.frame_count,
            report.signals.detections.len(),
            report.signals.class_flag,
            report.signals.paper_flag
        );
    }
}

/// Load configuration from file or create default
fn load_or_create_config(explicit: Option<&std::path::Path>) -> AppConfig {
    if let Some(path) = explicit {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
            Err(err) => {
                warn!("Failed to load {:?}: {err:#}; using defaults", path);
                return AppConfig::default();
            }
        }
    }

    if let Ok(config_dir) = config::get_config_dir() {
        let config_path = config_dir.join("config.toml");
        if config_path.exists() {
            if let Ok(config) = config::load_config(&config_path) {
                info!("Loaded configuration from {:?}", config_path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    AppConfig::default()
}

/// Print the operator-facing result line
fn print_verdict(verdict: &Verdict) {
    if verdict.has_unauthorized_material {
        println!("Result: PAPERS/SLIPS — YES");
    } else {
        println!("Result: PAPERS/SLIPS — NO");
    }
    println!(
        "Student: {} (Roll: {})  at {}",
        verdict.subject.name,
        verdict.subject.roll_number,
        verdict.timestamp.to_rfc3339()
    );
}
