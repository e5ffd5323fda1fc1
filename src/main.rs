//! Command-line front end: evaluates cross-entropy or focal loss over a
//! batch stored as JSON and prints the mean, per-image means and the share
//! of the total loss carried by each unit.
//!
//!   ferrite-loss eval batch.json --gamma 2
//!   ferrite-loss compare batch.json --gammas 0,2,5

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ferrite_loss::{BatchFile, FocalVariant, LossConfig, LossEvaluator, LossReport, LossType, Scores};

/// Largest number of units whose shares are printed.
const MAX_SHARES: usize = 16;

#[derive(Parser)]
#[command(name = "ferrite-loss")]
#[command(about = "Cross-entropy and focal loss for classification and segmentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one loss over a batch file
    Eval {
        /// Batch JSON file (shape, prediction, target)
        batch: String,

        /// Loss config JSON file; the flags below override it
        #[arg(short, long)]
        config: Option<String>,

        /// Use focal loss with this gamma
        #[arg(short, long)]
        gamma: Option<f64>,

        /// Focal variant (true-class-only, all-classes)
        #[arg(long)]
        variant: Option<String>,

        /// Comma-separated class weights, one per class
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,

        /// Read prediction values as logits
        #[arg(long)]
        logits: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare cross-entropy with focal loss at several gammas
    Compare {
        /// Batch JSON file (shape, prediction, target)
        batch: String,

        /// Comma-separated focal exponents
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 2.0, 5.0])]
        gammas: Vec<f64>,

        /// Focal variant (true-class-only, all-classes)
        #[arg(long, default_value = "true-class-only")]
        variant: String,

        /// Comma-separated class weights, one per class
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,

        /// Read prediction values as logits
        #[arg(long)]
        logits: bool,
    },
}

fn parse_variant(s: &str) -> Result<FocalVariant> {
    match s {
        "true-class-only" | "true_class_only" => Ok(FocalVariant::TrueClassOnly),
        "all-classes" | "all_classes" => Ok(FocalVariant::AllClasses),
        _ => anyhow::bail!("Invalid focal variant: {}", s),
    }
}

fn parse_level(s: &str) -> Result<Level> {
    match s {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {} (expected trace, debug, info, warn or error)", s),
    }
}

fn describe(loss: &LossType) -> String {
    match loss {
        LossType::CrossEntropy => "cross-entropy".to_string(),
        LossType::Focal { gamma, variant: FocalVariant::TrueClassOnly } => format!("focal (gamma = {gamma})"),
        LossType::Focal { gamma, variant: FocalVariant::AllClasses } => {
            format!("focal, all classes (gamma = {gamma})")
        }
    }
}

fn print_report(title: &str, report: &LossReport) {
    println!("{title}");
    println!("{:-<60}", "");
    println!("  units:      {}", report.units);
    println!("  mean loss:  {:.6}", report.mean);
    if report.per_image.len() > 1 && report.per_image.len() < report.units {
        println!("  per image:");
        for (i, mean) in report.per_image.iter().enumerate() {
            println!("    image {i:>3}: {mean:.6}");
        }
    }
    println!("  share of total loss:");
    for (i, share) in report.shares.iter().take(MAX_SHARES).enumerate() {
        println!("    unit {i:>4}: {:>8.4}%", share * 100.0);
    }
    if report.shares.len() > MAX_SHARES {
        println!("    ... {} more units", report.shares.len() - MAX_SHARES);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = parse_level(&cli.log_level)?;

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Eval { batch, config, gamma, variant, weights, logits, json } => {
            let mut config = match config {
                Some(path) => LossConfig::load_json(&path)
                    .with_context(|| format!("failed to load loss config {path}"))?,
                None => LossConfig::default(),
            };
            let variant = variant.as_deref().map(parse_variant).transpose()?;
            config.loss = match (config.loss, gamma) {
                (LossType::Focal { variant: current, .. }, Some(gamma)) => {
                    LossType::Focal { gamma, variant: variant.unwrap_or(current) }
                }
                (LossType::CrossEntropy, Some(gamma)) => {
                    LossType::Focal { gamma, variant: variant.unwrap_or_default() }
                }
                (LossType::Focal { gamma, variant: current }, None) => {
                    LossType::Focal { gamma, variant: variant.unwrap_or(current) }
                }
                (LossType::CrossEntropy, None) => LossType::CrossEntropy,
            };
            if weights.is_some() {
                config.class_weights = weights;
            }
            if logits {
                config.scores = Scores::Logits;
            }

            info!("Evaluating {} over {}", config.loss.name(), batch);
            let evaluator = LossEvaluator::from_config(&config)?;
            let (prediction, target) = BatchFile::load_json(&batch)
                .with_context(|| format!("failed to load batch {batch}"))?
                .into_inputs(config.scores)?;
            let report = evaluator.report(&prediction, &target)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&describe(&config.loss), &report);
            }
        }

        Commands::Compare { batch, gammas, variant, weights, logits } => {
            let variant = parse_variant(&variant)?;
            let scores = if logits { Scores::Logits } else { Scores::Probabilities };
            let (prediction, target) = BatchFile::load_json(&batch)
                .with_context(|| format!("failed to load batch {batch}"))?
                .into_inputs(scores)?;

            let losses = std::iter::once(LossType::CrossEntropy)
                .chain(gammas.iter().map(|&gamma| LossType::Focal { gamma, variant }));

            for loss in losses {
                info!("Evaluating {}", loss.name());
                let evaluator = LossEvaluator::new(loss, weights.clone())?;
                let report = evaluator.report(&prediction, &target)?;
                print_report(&describe(&loss), &report);
                println!();
            }
        }
    }

    Ok(())
}
