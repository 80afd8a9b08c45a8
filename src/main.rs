use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use streamwatch::config::{AppConfig, OutputFormat};

#[derive(Parser)]
#[command(
    name = "streamwatch",
    about = "Sliding-window Z-score anomaly detection for numeric streams",
    version,
    long_about = None
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DetectorArgs {
    /// Number of trailing values in the window
    #[arg(long)]
    window_size: Option<usize>,

    /// Z-score above which a value is flagged
    #[arg(long)]
    threshold: Option<f64>,

    /// Fail on NaN or infinite input instead of passing it through
    #[arg(long)]
    reject_non_finite: bool,

    /// Emit one JSON object per point
    #[arg(long)]
    json: bool,
}

impl DetectorArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(window_size) = self.window_size {
            config.detector.window_size = window_size;
        }
        if let Some(threshold) = self.threshold {
            config.detector.threshold = threshold;
        }
        if self.reject_non_finite {
            config.detector.reject_non_finite = true;
        }
        if self.json {
            config.sink.format = OutputFormat::Json;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the synthetic seasonal stream through the detector
    Run {
        #[command(flatten)]
        detector: DetectorArgs,

        /// Stop once a point past this time has been printed
        #[arg(long)]
        max_time: Option<u64>,

        /// RNG seed for a reproducible stream
        #[arg(long)]
        seed: Option<u64>,

        /// Pause between points in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Probability of injecting an outlier at each step
        #[arg(long)]
        anomaly_probability: Option<f64>,
    },

    /// Classify numbers read one per line from a file or stdin
    Score {
        #[command(flatten)]
        detector: DetectorArgs,

        /// Input file (defaults to stdin)
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = tracing::subscriber::with_default(
        streamwatch::logging::bootstrap_subscriber(),
        || match &cli.config {
            Some(path) => AppConfig::load(path),
            None => Ok(AppConfig::load_or_default()),
        },
    );
    let mut config = loaded?;

    streamwatch::logging::init(&config.logging)?;

    match cli.command {
        Commands::Run {
            detector,
            max_time,
            seed,
            interval_ms,
            anomaly_probability,
        } => {
            detector.apply(&mut config);
            if let Some(max_time) = max_time {
                config.sink.max_time = max_time;
            }
            if seed.is_some() {
                config.source.seed = seed;
            }
            if let Some(interval_ms) = interval_ms {
                config.sink.interval_ms = interval_ms;
            }
            if let Some(p) = anomaly_probability {
                config.source.anomaly_probability = p;
            }

            tracing::info!(
                window_size = config.detector.window_size,
                threshold = config.detector.threshold,
                max_time = config.sink.max_time,
                "Running synthetic stream"
            );
            let report = streamwatch::run(&config, io::stdout().lock()).await?;
            let summary = &report.summary;

            match config.sink.format {
                OutputFormat::Json => {
                    // Last stdout line, after the points.
                    println!("{}", serde_json::to_string(summary)?);
                }
                OutputFormat::Text => {
                    eprintln!("\n=== streamwatch run {} ===", summary.run_id);
                    eprintln!("Points:     {}", summary.points);
                    eprintln!("Warm-up:    {}", summary.warmup_points);
                    eprintln!("Anomalies:  {}", summary.anomalies);
                    eprintln!("Rate:       {:.2}%", summary.anomaly_rate() * 100.0);
                    let recent: Vec<String> = report
                        .recent
                        .iter()
                        .filter(|p| p.is_anomaly)
                        .map(|p| format!("t={} ({:.1})", p.time, p.value))
                        .collect();
                    if !recent.is_empty() {
                        eprintln!("Recent:     {}", recent.join(", "));
                    }
                }
            }
        }
        Commands::Score { detector, input } => {
            detector.apply(&mut config);
            let out = io::stdout().lock();
            let summary = match input {
                Some(path) => {
                    let file = std::fs::File::open(&path)
                        .with_context(|| format!("failed to open input: {}", path.display()))?;
                    streamwatch::score(BufReader::new(file), out, &config).await?
                }
                None => streamwatch::score(io::stdin().lock(), out, &config).await?,
            };
            tracing::info!(
                points = summary.points,
                anomalies = summary.anomalies,
                "Scoring complete"
            );
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
