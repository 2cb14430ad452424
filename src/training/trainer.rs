//! Training Pipeline for the LISA sign classifier
//!
//! This module implements the epoch loop using the Burn framework directly:
//! - optional per-epoch shadow augmentation of the training split
//! - forward/backward passes with label-smoothed cross-entropy
//! - SGD with momentum and weight decay, multi-step rate decay per epoch
//! - a no-grad evaluation pass on the test split after every epoch
//! - one checkpoint written after the final epoch
//!
//! The trainer walks through [`TrainerPhase`]:
//! `Init -> (EpochStart -> TrainPass -> EvalPass -> LogEpoch -> EpochEnd) x epochs -> Checkpoint -> Done`

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Instant;

use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    optim::{decay::WeightDecayConfig, momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::dataset::{
    shuffled_indices, AugmentationStage, MaskRegistry, SampleSet, SampleStore, SignBatcher,
    SignDataset,
};
use crate::inference::evaluator::{smoothed_loss, EpochTally, Evaluator};
use crate::model::{LisaCnn, LisaCnnConfig};
use crate::training::checkpoint::save_classifier;
use crate::training::scheduler::MultiStepLr;
use crate::utils::{round_decimals, Result, RunLogger};

/// Where the trainer is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerPhase {
    Init,
    EpochStart { epoch: usize },
    TrainPass { epoch: usize },
    EvalPass { epoch: usize },
    LogEpoch { epoch: usize },
    EpochEnd { epoch: usize },
    Checkpoint,
    Done,
}

/// Metrics of one finished epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    /// 1-based epoch index
    pub epoch: usize,
    /// Wall time of the train and eval passes
    pub seconds: f64,
    pub train_accuracy: f64,
    pub train_loss: f64,
    pub test_accuracy: f64,
    pub test_loss: f64,
}

impl EpochMetrics {
    fn from_tallies(epoch: usize, seconds: f64, train: &EpochTally, test: &EpochTally) -> Self {
        Self {
            epoch,
            seconds,
            train_accuracy: train.accuracy(),
            train_loss: train.mean_loss(),
            test_accuracy: test.accuracy(),
            test_loss: test.mean_loss(),
        }
    }

    /// Run-log line, e.g. `[3/100] 1.25 Train Acc: 0.8125 Loss: 0.6 | Test Acc: 0.75 Loss: 0.7`
    pub fn to_line(&self, total_epochs: usize) -> String {
        format!(
            "[{}/{}] {} Train Acc: {} Loss: {} | Test Acc: {} Loss: {}",
            self.epoch,
            total_epochs,
            round_decimals(self.seconds, 2),
            round_decimals(self.train_accuracy, 4),
            round_decimals(self.train_loss, 4),
            round_decimals(self.test_accuracy, 4),
            round_decimals(self.test_loss, 4),
        )
    }
}

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs: Vec<EpochMetrics>,
    pub checkpoint: PathBuf,
}

impl TrainingSummary {
    pub fn final_metrics(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Epoch-loop driver
pub struct Trainer<'a, B: AutodiffBackend> {
    config: &'a RunConfig,
    device: B::Device,
    rng: ChaCha8Rng,
    scheduler: MultiStepLr,
    phase: TrainerPhase,
}

impl<'a, B: AutodiffBackend> Trainer<'a, B> {
    /// Create a trainer and seed the backend and sampling RNG from the config
    pub fn new(config: &'a RunConfig, device: B::Device) -> Self {
        B::seed(config.seed);
        Self {
            config,
            device,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            scheduler: MultiStepLr::from_config(&config.training),
            phase: TrainerPhase::Init,
        }
    }

    /// Freshly initialised classifier for the configured class count
    pub fn new_model(&self) -> LisaCnn<B> {
        LisaCnnConfig::new()
            .with_num_classes(self.config.class_count)
            .init(&self.device)
    }

    pub fn phase(&self) -> TrainerPhase {
        self.phase
    }

    fn enter(&mut self, phase: TrainerPhase) {
        debug!("Trainer phase: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Train `model` for the configured number of epochs and write its checkpoint
    ///
    /// With `adversarial`, every epoch trains on the original split doubled with
    /// freshly shadowed twins. The test split is never augmented.
    pub fn fit(
        &mut self,
        mut model: LisaCnn<B>,
        store: &SampleStore,
        registry: &MaskRegistry,
        adversarial: bool,
        logger: &mut RunLogger,
    ) -> Result<(LisaCnn<B>, TrainingSummary)> {
        let config = self.config;
        let training = &config.training;
        let total_epochs = training.epochs;
        let batch_size = training.batch_size.max(1);

        let mut optimizer = SgdConfig::new()
            .with_momentum(Some(
                MomentumConfig::new()
                    .with_momentum(training.momentum)
                    .with_dampening(0.0),
            ))
            .with_weight_decay(Some(WeightDecayConfig::new(training.weight_decay as f32)))
            .init();
        let loss_fn = smoothed_loss::<B>(training.label_smoothing, &self.device);
        let batcher = SignBatcher::<B>::new(self.device.clone());
        let evaluator = Evaluator::<B::InnerBackend>::new(
            &self.device,
            batch_size,
            training.label_smoothing,
        );
        let stage = AugmentationStage::new(registry);
        let test_data = SignDataset::from_set(&store.test);

        info!(
            "Training {} epochs on {} samples ({})",
            total_epochs,
            store.train.len(),
            if adversarial { "adversarial" } else { "clean" }
        );

        let mut epochs = Vec::with_capacity(total_epochs);

        for epoch in 0..total_epochs {
            self.enter(TrainerPhase::EpochStart { epoch });

            // Always derived from the untouched split, never from last epoch's copy
            let train_set: Cow<SampleSet> = if adversarial {
                Cow::Owned(stage.augment(&store.train, &mut self.rng)?)
            } else {
                Cow::Borrowed(&store.train)
            };
            let train_data = SignDataset::from_set(&train_set);
            let order = shuffled_indices(train_set.len(), &mut self.rng);
            let num_batches = (order.len() + batch_size - 1) / batch_size;

            let epoch_start = Instant::now();

            self.enter(TrainerPhase::TrainPass { epoch });
            let lr = self.scheduler.current_lr();
            let progress = batch_progress(num_batches, epoch + 1, total_epochs);
            let mut train_tally = EpochTally::default();

            for chunk in order.chunks(batch_size) {
                let items = train_data.gather(chunk);
                if items.is_empty() {
                    continue;
                }
                let batch = batcher.batch(items);

                let logits = model.forward(batch.images);
                let loss = loss_fn.forward(logits.clone(), batch.targets.clone());
                train_tally.record(logits.detach(), batch.targets, loss.clone().detach());

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(lr, model, grads);
                progress.inc(1);
            }
            progress.finish_and_clear();
            let next_lr = self.scheduler.step();
            if next_lr != lr {
                info!("Learning rate decayed to {}", next_lr);
            }

            self.enter(TrainerPhase::EvalPass { epoch });
            let test_tally = evaluator.evaluate(&model.valid(), &test_data);

            self.enter(TrainerPhase::LogEpoch { epoch });
            let metrics = EpochMetrics::from_tallies(
                epoch + 1,
                epoch_start.elapsed().as_secs_f64(),
                &train_tally,
                &test_tally,
            );
            logger.add(metrics.to_line(total_epochs));
            epochs.push(metrics);

            self.enter(TrainerPhase::EpochEnd { epoch });
            drop(train_data);
            drop(train_set);
        }

        self.enter(TrainerPhase::Checkpoint);
        let checkpoint = save_classifier(&model, &config.paths.model_dir, adversarial)?;

        self.enter(TrainerPhase::Done);
        Ok((model, TrainingSummary { epochs, checkpoint }))
    }
}

fn batch_progress(num_batches: usize, epoch: usize, total_epochs: usize) -> ProgressBar {
    let progress = ProgressBar::new(num_batches as u64);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} batches ({eta})")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress.set_message(format!("Epoch {}/{}", epoch, total_epochs));
    progress
}

/// Load the archives, train a fresh classifier and save its checkpoint
pub fn train_classifier<B: AutodiffBackend>(
    config: &RunConfig,
    adversarial: bool,
    device: B::Device,
    logger: &mut RunLogger,
) -> Result<TrainingSummary> {
    let store = SampleStore::load(config)?;
    let registry = MaskRegistry::from_config(config);

    let mut trainer = Trainer::<B>::new(config, device);
    let model = trainer.new_model();
    let (_, summary) = trainer.fit(model, &store, &registry, adversarial, logger)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LabeledImage;
    use crate::inference::evaluator::Evaluator;
    use crate::training::checkpoint::{checkpoint_path, load_classifier};
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    type TestBackend = Autodiff<NdArray<f32>>;

    fn two_sample_store() -> SampleStore {
        let set = SampleSet::new(vec![
            LabeledImage {
                pixels: RgbImage::from_pixel(32, 32, Rgb([220, 30, 30])),
                label: 0,
            },
            LabeledImage {
                pixels: RgbImage::from_pixel(32, 32, Rgb([30, 30, 220])),
                label: 1,
            },
        ]);
        SampleStore {
            train: set.clone(),
            test: set,
        }
    }

    fn one_epoch_config(model_dir: &std::path::Path) -> RunConfig {
        let mut config = RunConfig::new(2, "cpu", 0);
        config.training.epochs = 1;
        config.paths.model_dir = model_dir.to_path_buf();
        config
    }

    #[test]
    fn test_epoch_line_format() {
        let metrics = EpochMetrics {
            epoch: 3,
            seconds: 1.2549,
            train_accuracy: 0.5,
            train_loss: 0.693147,
            test_accuracy: 0.75,
            test_loss: 1.0,
        };
        assert_eq!(
            metrics.to_line(100),
            "[3/100] 1.25 Train Acc: 0.5 Loss: 0.6931 | Test Acc: 0.75 Loss: 1"
        );
    }

    #[test]
    fn test_same_seed_reproduces_shuffle_and_shadows() {
        let tmp = tempdir().unwrap();
        let config = one_epoch_config(tmp.path());
        let store = two_sample_store();
        let registry = MaskRegistry::from_config(&config);
        let stage = AugmentationStage::new(&registry);

        let mut first = Trainer::<TestBackend>::new(&config, Default::default());
        let mut second = Trainer::<TestBackend>::new(&config, Default::default());

        let augmented_first = stage.augment(&store.train, &mut first.rng).unwrap();
        let augmented_second = stage.augment(&store.train, &mut second.rng).unwrap();
        assert_eq!(augmented_first.samples, augmented_second.samples);

        assert_eq!(
            shuffled_indices(augmented_first.len(), &mut first.rng),
            shuffled_indices(augmented_second.len(), &mut second.rng)
        );
    }

    #[test]
    fn test_single_clean_epoch_writes_one_line_and_one_checkpoint() {
        let tmp = tempdir().unwrap();
        let config = one_epoch_config(tmp.path());
        let store = two_sample_store();
        let registry = MaskRegistry::from_config(&config);
        let mut logger = RunLogger::silent(tmp.path().join("log.txt"));

        let mut trainer = Trainer::<TestBackend>::new(&config, Default::default());
        assert_eq!(trainer.phase(), TrainerPhase::Init);
        let model = trainer.new_model();
        let (_, summary) = trainer
            .fit(model, &store, &registry, false, &mut logger)
            .unwrap();

        assert_eq!(trainer.phase(), TrainerPhase::Done);
        assert_eq!(summary.epochs.len(), 1);
        assert_eq!(logger.entries().len(), 1);
        assert!(logger.entries()[0].starts_with("[1/1] "));
        assert!(logger.entries()[0].contains("| Test Acc: "));

        let files: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "bin"))
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(summary.checkpoint, checkpoint_path(tmp.path(), false));
    }

    #[test]
    fn test_checkpoint_round_trip_preserves_accuracy() {
        let tmp = tempdir().unwrap();
        let config = one_epoch_config(tmp.path());
        let store = two_sample_store();
        let registry = MaskRegistry::from_config(&config);
        let mut logger = RunLogger::silent(tmp.path().join("log.txt"));

        let mut trainer = Trainer::<TestBackend>::new(&config, Default::default());
        let model = trainer.new_model();
        let (_, summary) = trainer
            .fit(model, &store, &registry, false, &mut logger)
            .unwrap();

        let device = Default::default();
        let restored = load_classifier::<NdArray<f32>>(tmp.path(), false, 2, &device).unwrap();
        let tally = Evaluator::<NdArray<f32>>::new(&device, 64, 0.1)
            .evaluate(&restored, &SignDataset::from_set(&store.test));

        let logged = summary.final_metrics().unwrap();
        assert_eq!(tally.accuracy(), logged.test_accuracy);
    }

    #[test]
    fn test_adversarial_run_uses_its_own_checkpoint() {
        let tmp = tempdir().unwrap();
        let config = one_epoch_config(tmp.path());
        let store = two_sample_store();
        let registry = MaskRegistry::from_config(&config);
        let mut logger = RunLogger::silent(tmp.path().join("log.txt"));

        let mut trainer = Trainer::<TestBackend>::new(&config, Default::default());
        let model = trainer.new_model();
        let (_, summary) = trainer
            .fit(model, &store, &registry, true, &mut logger)
            .unwrap();

        assert_eq!(summary.checkpoint, checkpoint_path(tmp.path(), true));
        assert!(summary.checkpoint.exists());
        assert!(!checkpoint_path(tmp.path(), false).exists());
    }

    #[test]
    fn test_adversarial_run_fails_on_unregistered_label() {
        let tmp = tempdir().unwrap();
        let mut config = one_epoch_config(tmp.path());
        config.masks.remove(&1);
        let store = two_sample_store();
        let registry = MaskRegistry::from_config(&config);
        let mut logger = RunLogger::silent(tmp.path().join("log.txt"));

        let mut trainer = Trainer::<TestBackend>::new(&config, Default::default());
        let model = trainer.new_model();
        let result = trainer.fit(model, &store, &registry, true, &mut logger);

        assert!(result.is_err());
        assert!(!checkpoint_path(tmp.path(), true).exists());
    }
}
