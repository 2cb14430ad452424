//! LISA Shadow Robustness CLI
//!
//! Entry point for training, testing and sequence evaluation of the
//! shadow-robust traffic-sign classifier.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use lisa_shadow::backend::{backend_name, device_for, Device, DefaultBackend, TrainingBackend};
use lisa_shadow::config::RunConfig;
use lisa_shadow::inference::{Evaluator, SequenceHarness, SignPredictor};
use lisa_shadow::preprocess::crop_frames;
use lisa_shadow::training::train_classifier;
use lisa_shadow::utils::logging::{init_logging, LogConfig};
use lisa_shadow::utils::{format_duration, RunLogger};
use lisa_shadow::{DEFAULT_SEQUENCE_LABEL, VERSION};

/// Shadow-robust traffic sign classification with Burn
#[derive(Parser, Debug)]
#[command(name = "lisa_shadow")]
#[command(version)]
#[command(about = "Adversarial shadow training and evaluation for LISA traffic signs", long_about = None)]
struct Cli {
    /// Path to the JSON run configuration
    #[arg(short, long, default_value = "params.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify every frame of a sequence and report the failures
    Run {
        /// Frame directory, relative to the configured videos directory
        frames_dir: PathBuf,

        /// Where the run log is written
        log_path: PathBuf,

        /// Ground-truth label shared by every frame
        #[arg(long, default_value_t = DEFAULT_SEQUENCE_LABEL)]
        label: usize,

        /// Use the adversarially trained model
        #[arg(long, default_value = "false")]
        adversarial: bool,
    },

    /// Train a classifier and save its checkpoint
    Train {
        /// Double every epoch's training set with shadowed twins
        #[arg(long, default_value = "false")]
        adversarial: bool,

        /// Where the run log is written
        #[arg(long, default_value = "log.txt")]
        log: PathBuf,
    },

    /// Report test-set accuracy of a saved checkpoint
    Test {
        /// Evaluate the adversarially trained model
        #[arg(long, default_value = "false")]
        adversarial: bool,

        /// Where the run log is written
        #[arg(long, default_value = "log.txt")]
        log: PathBuf,
    },

    /// Classify a single image
    Infer {
        /// Image file of any size
        image: PathBuf,

        /// Expected class label
        #[arg(long)]
        label: usize,

        /// Use the adversarially trained model
        #[arg(long, default_value = "false")]
        adversarial: bool,

        /// Where the run log is written
        #[arg(long, default_value = "log.txt")]
        log: PathBuf,
    },

    /// Crop annotated objects out of extracted video frames
    Crop {
        /// Directory of decoded frames named `{index}.{ext}`
        frames_dir: PathBuf,

        /// Label Studio video annotation export
        annotation: PathBuf,

        /// Output root; one subdirectory per object
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    match cli.command {
        Commands::Crop {
            frames_dir,
            annotation,
            out_dir,
        } => {
            let written = crop_frames(&frames_dir, &annotation, &out_dir)
                .with_context(|| format!("failed to crop frames from {:?}", frames_dir))?;
            println!("  {} {} crops written to {:?}", "✓".green(), written, out_dir);
        }
        command => run_with_config(&cli.config, command)?,
    }

    Ok(())
}

/// Commands that need a loaded configuration and a device
fn run_with_config(config_path: &Path, command: Commands) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("failed to load configuration {:?}", config_path))?;
    let device: Device = device_for(config.device_kind()?)?;
    info!("Using backend {} on {:?}", backend_name(), device);

    match command {
        Commands::Run {
            frames_dir,
            log_path,
            label,
            adversarial,
        } => cmd_run(&config, device, &frames_dir, log_path, label, adversarial)?,

        Commands::Train { adversarial, log } => cmd_train(&config, device, adversarial, log)?,

        Commands::Test { adversarial, log } => {
            let mut logger = RunLogger::new(log);
            Evaluator::<DefaultBackend>::test_accuracy(&config, adversarial, &device, &mut logger)
                .context("test-set evaluation failed")?;
            logger.save()?;
        }

        Commands::Infer {
            image,
            label,
            adversarial,
            log,
        } => {
            let predictor = SignPredictor::<DefaultBackend>::load(&config, adversarial, device)?;
            let mut logger = RunLogger::new(log);
            let result = predictor
                .predict_file(&image, label, &mut logger)
                .with_context(|| format!("failed to classify {:?}", image))?;
            logger.save()?;
            let verdict = if result.correct {
                "correct".green()
            } else {
                "wrong".red()
            };
            println!("  {} {}", "→".cyan(), verdict);
        }

        Commands::Crop { .. } => unreachable!("crop runs without a configuration"),
    }

    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", "LISA Shadow Robustness".green().bold());
    println!("  version {}", VERSION);
    println!();
}

fn cmd_run(
    config: &RunConfig,
    device: Device,
    frames_dir: &Path,
    log_path: PathBuf,
    label: usize,
    adversarial: bool,
) -> Result<()> {
    let dir = config.paths.videos_dir.join(frames_dir);
    println!("{}", "Evaluating frame sequence...".cyan());
    println!("  Frames:       {:?}", dir);
    println!("  Ground truth: {}", label);

    let predictor = SignPredictor::<DefaultBackend>::load(config, adversarial, device)?;
    let mut logger = RunLogger::new(log_path);
    let report = SequenceHarness::new(&predictor)
        .run(&dir, label, &mut logger)
        .with_context(|| format!("sequence evaluation of {:?} failed", dir))?;
    logger.save()?;

    if report.all_failed() {
        println!("{}", "Every frame was misclassified".red().bold());
    }
    Ok(())
}

fn cmd_train(config: &RunConfig, device: Device, adversarial: bool, log: PathBuf) -> Result<()> {
    println!("{}", "Starting Training...".green().bold());
    println!("  Mode:   {}", if adversarial { "adversarial" } else { "clean" });
    println!("  Epochs: {}", config.training.epochs);
    println!();

    let started = std::time::Instant::now();
    let mut logger = RunLogger::new(log);
    let summary = train_classifier::<TrainingBackend>(config, adversarial, device, &mut logger)
        .context("training failed")?;
    logger.save()?;

    println!();
    println!("{}", "Training Complete!".green().bold());
    println!("  Checkpoint: {:?}", summary.checkpoint);
    println!("  Duration:   {}", format_duration(started.elapsed().as_secs_f64()));
    Ok(())
}
