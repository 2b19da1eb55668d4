//! Event Stream Simulation
//!
//! Generates synthetic timed-event streams and runs them through the
//! harmonic pipeline. Four stream shapes are simulated:
//! - Periodic: a steady beat with an accent every fourth event
//! - Jittered: alternating short/long intervals with heavy timing noise
//! - Bursty: tight bursts separated by long gaps
//! - Sparse: long, irregular gaps with exponential extra delay
//!
//! Reference fingerprints are derived from noise-free versions of the same
//! shapes unless the config file supplies its own `[fingerprints]` table.
//!
//! # Usage
//! ```bash
//! ./simulation --runs 20 --events 256 --seed 7 --rows 32 --cols 32
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Exp, Normal};
use std::io;
use std::path::PathBuf;
use std::time::Instant;

use harmonic_pipeline::{AnalysisPipeline, AsciiRenderer, FingerprintDecoder, FingerprintLibrary, PipelineConfig};

// ============================================================================
// Stream Constants
// ============================================================================

/// Interval cycle for periodic streams (seconds)
const PERIODIC_CYCLE: &[f64] = &[1.0, 1.0, 1.0, 2.0];
/// Interval cycle for jittered streams
const JITTERED_CYCLE: &[f64] = &[1.0, 1.5];
/// Interval cycle for bursty streams: five quick events then a gap
const BURSTY_CYCLE: &[f64] = &[0.1, 0.1, 0.1, 0.1, 0.1, 5.0];
/// Interval cycle for sparse streams
const SPARSE_CYCLE: &[f64] = &[4.0, 9.0, 6.0, 12.0];

/// Timing noise standard deviation per stream kind (seconds)
const PERIODIC_NOISE: f64 = 0.02;
const JITTERED_NOISE: f64 = 0.15;
const BURSTY_NOISE: f64 = 0.01;
/// Mean of the exponential extra delay on sparse streams
const SPARSE_EXTRA_DELAY: f64 = 2.0;

/// Intervals never shrink below this, so timestamps stay increasing
const MIN_INTERVAL: f64 = 0.01;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "harmonic-simulation")]
#[command(about = "Synthetic event-stream simulation for the harmonic pipeline")]
#[command(version = "1.0")]
struct Args {
    /// Number of streams to analyse
    #[arg(short, long, default_value = "12", value_parser = clap::value_parser!(u32).range(1..=10_000))]
    runs: u32,

    /// Events per stream
    #[arg(short, long, default_value = "128", value_parser = clap::value_parser!(u32).range(2..=1_000_000))]
    events: u32,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Pipeline config file (otherwise HARMONIC_CONFIG, ./harmonic_config.toml, defaults)
    #[arg(short, long, env = "HARMONIC_CONFIG")]
    config: Option<PathBuf>,

    /// Override field rows
    #[arg(long)]
    rows: Option<usize>,

    /// Override field columns
    #[arg(long)]
    cols: Option<usize>,

    /// Suppress mission log (only output results)
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Stream Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Periodic,
    Jittered,
    Bursty,
    Sparse,
}

impl StreamKind {
    const ALL: [StreamKind; 4] = [
        StreamKind::Periodic,
        StreamKind::Jittered,
        StreamKind::Bursty,
        StreamKind::Sparse,
    ];

    fn name(&self) -> &'static str {
        match self {
            StreamKind::Periodic => "periodic",
            StreamKind::Jittered => "jittered",
            StreamKind::Bursty => "bursty",
            StreamKind::Sparse => "sparse",
        }
    }

    fn cycle(&self) -> &'static [f64] {
        match self {
            StreamKind::Periodic => PERIODIC_CYCLE,
            StreamKind::Jittered => JITTERED_CYCLE,
            StreamKind::Bursty => BURSTY_CYCLE,
            StreamKind::Sparse => SPARSE_CYCLE,
        }
    }
}

// ============================================================================
// Stream Generation
// ============================================================================

struct StreamGenerator {
    rng: StdRng,
    sparse_delay: Exp<f64>,
}

impl StreamGenerator {
    fn new(seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let sparse_delay = Exp::new(1.0 / SPARSE_EXTRA_DELAY)
            .map_err(|e| anyhow!("invalid sparse delay distribution: {e}"))?;
        Ok(Self { rng, sparse_delay })
    }

    fn pick_kind(&mut self) -> StreamKind {
        StreamKind::ALL[self.rng.gen_range(0..StreamKind::ALL.len())]
    }

    /// Noise-free timestamps following the kind's interval cycle.
    fn clean(kind: StreamKind, events: usize) -> Vec<f64> {
        let cycle = kind.cycle();
        let mut t = 0.0;
        (0..events)
            .map(|i| {
                if i > 0 {
                    t += cycle[(i - 1) % cycle.len()];
                }
                t
            })
            .collect()
    }

    /// Timestamps with the kind's timing noise applied to every interval.
    fn noisy(&mut self, kind: StreamKind, events: usize) -> Result<Vec<f64>> {
        let sigma = match kind {
            StreamKind::Periodic => PERIODIC_NOISE,
            StreamKind::Jittered => JITTERED_NOISE,
            StreamKind::Bursty => BURSTY_NOISE,
            StreamKind::Sparse => 0.0,
        };
        let noise = Normal::new(0.0, sigma).map_err(|e| anyhow!("invalid timing noise: {e}"))?;

        let cycle = kind.cycle();
        let mut t = self.rng.gen_range(0.0..10.0);
        let mut stream = Vec::with_capacity(events);
        for i in 0..events {
            if i > 0 {
                let mut interval = cycle[(i - 1) % cycle.len()] + noise.sample(&mut self.rng);
                if kind == StreamKind::Sparse {
                    interval += self.sparse_delay.sample(&mut self.rng);
                }
                t += interval.max(MIN_INTERVAL);
            }
            stream.push(t);
        }
        Ok(stream)
    }
}

/// One reference fingerprint per stream kind, from its clean stream.
fn reference_library(config: &PipelineConfig, events: usize) -> FingerprintLibrary {
    let mut reference = FingerprintDecoder::with_config(FingerprintLibrary::new(), &config.decoder);
    StreamKind::ALL
        .iter()
        .filter_map(|kind| {
            reference.decode(&StreamGenerator::clean(*kind, events)).ok()?;
            let spectrum = reference.last_spectrum()?.to_vec();
            Some((kind.name(), spectrum))
        })
        .collect()
}

// ============================================================================
// Logging Utilities
// ============================================================================

fn log_mission(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[sim] {}", message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let events = args.events as usize;

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::load(),
    };
    if let Some(rows) = args.rows {
        config.reconstruction.rows = rows;
    }
    if let Some(cols) = args.cols {
        config.reconstruction.cols = cols;
    }
    config.validate().context("invalid pipeline configuration")?;

    let library = if config.fingerprints.is_empty() {
        reference_library(&config, events)
    } else {
        config.fingerprint_library()
    };

    log_mission(&"=".repeat(70), args.quiet);
    log_mission("HARMONIC PIPELINE SIMULATION v1.0", args.quiet);
    log_mission(&"=".repeat(70), args.quiet);
    log_mission(&format!("  Runs: {}", args.runs), args.quiet);
    log_mission(&format!("  Events per stream: {}", events), args.quiet);
    log_mission(
        &format!(
            "  Field: {}x{}",
            config.reconstruction.rows, config.reconstruction.cols
        ),
        args.quiet,
    );
    log_mission(&format!("  Clusters: {}", config.classifier.cluster_count), args.quiet);
    log_mission(
        &format!(
            "  Fingerprints: {}",
            library.names().collect::<Vec<_>>().join(", ")
        ),
        args.quiet,
    );
    if let Some(seed) = args.seed {
        log_mission(&format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(&"=".repeat(70), args.quiet);

    let mut generator = StreamGenerator::new(args.seed)?;
    let mut pipeline = AnalysisPipeline::with_library(&config, library)
        .context("building analysis pipeline")?
        .with_renderer(Box::new(AsciiRenderer::new(io::stdout())));

    let start_time = Instant::now();
    println!("{:>4}  {:<9} {:>6}  {:<9} {:>6}", "run", "kind", "group", "tag", "score");
    for run in 0..args.runs {
        let kind = generator.pick_kind();
        let stream = generator.noisy(kind, events)?;
        let group = pipeline.analyze(&stream)?;

        let (tag, score) = match pipeline.decoder().last_match() {
            Some(m) => (m.tag.clone(), format!("{:.3}", m.score)),
            None => ("-".to_string(), "-".to_string()),
        };
        let group = group.map_or_else(|| "-".to_string(), |g| g.to_string());
        println!("{:>4}  {:<9} {:>6}  {:<9} {:>6}", run, kind.name(), group, tag, score);
    }
    let elapsed = start_time.elapsed();

    let stats = pipeline.get_history().stats();
    let run_stats = pipeline.stats();
    println!();
    println!("History: {} recorded, {} retained, {} evicted", stats.total_recorded, stats.retained, stats.evicted);
    for (group, count) in &stats.per_group {
        println!("  group {}: {} entries", group, count);
    }
    if let Some(last) = pipeline.get_history().last() {
        println!("  last signature: {}", last.signature());
    }
    println!(
        "Runs: {} classified, {} too short, {} empty, {} fingerprint matches",
        run_stats.classified, run_stats.insufficient_data, run_stats.empty_feature, run_stats.fingerprint_matches
    );
    println!();
    pipeline.visualize_last();

    log_mission(&"=".repeat(70), args.quiet);
    log_mission("SIMULATION COMPLETE", args.quiet);
    log_mission(&format!("Real time: {:.2}s", elapsed.as_secs_f64()), args.quiet);
    log_mission(&"=".repeat(70), args.quiet);

    Ok(())
}
