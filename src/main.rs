use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use matchx::{Dataset, JobConfig, RecordKey, ThresholdMatcher, Thresholds};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Entity resolution over JSON datasets
#[derive(Parser, Debug)]
#[command(name = "matchx")]
#[command(about = "Link and deduplicate records with blocking and fuzzy field similarity", long_about = None)]
struct Args {
    /// Path to the JSON job file
    #[arg(short, long, global = true, default_value = "./job.json")]
    config: PathBuf,

    /// Log level
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scored pairs within the thresholds
    Pairs {
        #[command(flatten)]
        window: Window,
        /// Keep each record in at most one pair (match mode only)
        #[arg(long)]
        one_to_one: bool,
        /// Print only the key pairs
        #[arg(long)]
        keys_only: bool,
    },
    /// Up to N pairs from each score range, for threshold review
    Samples {
        #[command(flatten)]
        window: Window,
        #[arg(long, default_value_t = 0.05)]
        step: f64,
        #[arg(long, default_value_t = 5)]
        samples: usize,
    },
    /// Connected groups of matching records (dedup mode)
    Clusters {
        #[command(flatten)]
        window: Window,
        /// Print only member keys per cluster
        #[arg(long)]
        keys_only: bool,
    },
    /// Share of each dataset matched at a threshold
    Decision {
        #[arg(long)]
        threshold: f64,
    },
    /// Per-field scores for one pair of records
    Explain {
        #[arg(long)]
        left: String,
        #[arg(long)]
        right: String,
    },
}

#[derive(ClapArgs, Debug)]
struct Window {
    /// Lower score bound, defaults to the job file's
    #[arg(long)]
    lower: Option<f64>,
    /// Upper score bound, defaults to the job file's
    #[arg(long)]
    upper: Option<f64>,
    /// Drop pairs scoring exactly 1.0
    #[arg(long)]
    exclude_exact: bool,
}

impl Window {
    fn resolve(&self, defaults: Thresholds) -> anyhow::Result<Thresholds> {
        let thresholds = Thresholds {
            lower: self.lower.unwrap_or(defaults.lower),
            upper: self.upper.unwrap_or(defaults.upper),
            include_exact_matches: defaults.include_exact_matches && !self.exclude_exact,
        };
        thresholds.validate()?;
        Ok(thresholds)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting matchX v{}", env!("CARGO_PKG_VERSION"));
    info!("Job file: {:?}", args.config);

    let config = JobConfig::from_file(&args.config)
        .with_context(|| format!("failed to read job file {}", args.config.display()))?;
    let started = Instant::now();
    let matcher = config.build_matcher()?;
    info!(
        "Loaded {} mode job: {} x {} records in {:?}",
        matcher.mode(),
        matcher.left().len(),
        matcher.right().len(),
        started.elapsed()
    );

    match &args.command {
        Command::Pairs {
            window,
            one_to_one,
            keys_only,
        } => {
            let thresholds = window.resolve(config.thresholds)?;
            if *keys_only {
                print_json(&matcher.get_index_pairs_within_thresholds(&thresholds)?)
            } else if *one_to_one {
                print_json(&matcher.get_one_to_one_pairs(&thresholds)?)
            } else {
                print_json(&matcher.get_pairs_within_thresholds(&thresholds)?)
            }
        }
        Command::Samples {
            window,
            step,
            samples,
        } => {
            let thresholds = window.resolve(config.thresholds)?;
            let ranges = matcher.get_sample_pairs_within(&thresholds, *step, *samples)?;
            for range in &ranges {
                info!("Range {}: {} sampled pairs", range.label(), range.pairs.len());
            }
            print_json(&ranges)
        }
        Command::Clusters { window, keys_only } => {
            let thresholds = window.resolve(config.thresholds)?;
            if *keys_only {
                print_json(&matcher.get_index_clusters_within_thresholds(&thresholds)?)
            } else {
                print_json(&matcher.get_clusters_within_threshold(&thresholds)?)
            }
        }
        Command::Decision { threshold } => print_json(&matcher.decision(*threshold)?),
        Command::Explain { left, right } => {
            let left_key = resolve_key(matcher.left(), left);
            let right_key = resolve_key(matcher.right(), right);
            print_json(&matcher.explain(&left_key, &right_key)?)
        }
    }?;

    log_summary(&matcher);
    Ok(())
}

/// Command-line keys are text; prefer the integer key when the dataset has one.
fn resolve_key(dataset: &Dataset, raw: &str) -> RecordKey {
    match raw.parse::<u64>() {
        Ok(n) if dataset.position(&RecordKey::Integer(n)).is_some() => RecordKey::Integer(n),
        _ => RecordKey::from(raw),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value)?;
    println!();
    Ok(())
}

fn log_summary(matcher: &ThresholdMatcher) {
    if matcher.is_scored() {
        if let Ok(table) = matcher.compute() {
            let stats = table.stats();
            info!(
                "Scored {} pairs (avg {:.3}, best {:.3}), {} rejected by filters",
                stats.count,
                stats.avg_score,
                stats.best_score,
                matcher.rejected_pairs()
            );
        }
    }
}
