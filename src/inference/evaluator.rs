//! Batch evaluation
//!
//! The no-grad metric pass shared by per-epoch evaluation during training
//! and by standalone test-set accuracy runs.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use tracing::info;

use crate::config::RunConfig;
use crate::dataset::{SampleStore, SignBatcher, SignDataset};
use crate::model::LisaCnn;
use crate::training::checkpoint::load_classifier;
use crate::utils::{round_decimals, Result, RunLogger};

/// Running correct-count and batch-size-weighted loss over one pass
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochTally {
    pub correct: usize,
    pub loss_mass: f64,
    pub samples: usize,
}

impl EpochTally {
    /// Accumulate one batch given its logits, targets and mean loss
    pub fn record<B: Backend>(
        &mut self,
        logits: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
        loss: Tensor<B, 1>,
    ) {
        let [batch_size, _] = logits.dims();
        let predictions = logits.argmax(1).reshape([batch_size]);
        let batch_correct: i64 = predictions
            .equal(targets)
            .int()
            .sum()
            .into_scalar()
            .elem();
        let batch_loss: f64 = loss.into_scalar().elem();

        self.correct += batch_correct as usize;
        self.loss_mass += batch_loss * batch_size as f64;
        self.samples += batch_size;
    }

    /// Fraction of samples classified correctly
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.correct as f64 / self.samples as f64
        }
    }

    /// Mean per-sample loss
    pub fn mean_loss(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.loss_mass / self.samples as f64
        }
    }
}

/// Build the label-smoothed cross-entropy used for training and evaluation
pub fn smoothed_loss<B: Backend>(smoothing: f32, device: &B::Device) -> CrossEntropyLoss<B> {
    let smoothing = if smoothing > 0.0 { Some(smoothing) } else { None };
    CrossEntropyLossConfig::new()
        .with_smoothing(smoothing)
        .init(device)
}

/// No-grad evaluator over a fixed-order dataset
pub struct Evaluator<B: Backend> {
    batcher: SignBatcher<B>,
    loss: CrossEntropyLoss<B>,
    batch_size: usize,
}

impl<B: Backend> Evaluator<B> {
    pub fn new(device: &B::Device, batch_size: usize, label_smoothing: f32) -> Self {
        Self {
            batcher: SignBatcher::new(device.clone()),
            loss: smoothed_loss(label_smoothing, device),
            batch_size: batch_size.max(1),
        }
    }

    /// Score every item once, in dataset order
    pub fn evaluate(&self, model: &LisaCnn<B>, dataset: &SignDataset) -> EpochTally {
        let mut tally = EpochTally::default();
        let len = dataset.len();

        for start in (0..len).step_by(self.batch_size) {
            let end = (start + self.batch_size).min(len);
            let indices: Vec<usize> = (start..end).collect();
            let items = dataset.gather(&indices);
            if items.is_empty() {
                continue;
            }

            let batch = self.batcher.batch(items);
            let logits = model.forward(batch.images);
            let loss = self.loss.forward(logits.clone(), batch.targets.clone());
            tally.record(logits, batch.targets, loss);
        }

        tally
    }

    /// Load the checkpoint for a mode and log its accuracy on the test split
    pub fn test_accuracy(
        config: &RunConfig,
        adversarial: bool,
        device: &B::Device,
        logger: &mut RunLogger,
    ) -> Result<f64> {
        let model = load_classifier::<B>(
            &config.paths.model_dir,
            adversarial,
            config.class_count,
            device,
        )?;
        let test = SignDataset::from_set(&SampleStore::load_test(config)?);

        let evaluator = Self::new(
            device,
            config.training.test_batch_size,
            config.training.label_smoothing,
        );
        let tally = evaluator.evaluate(&model, &test);
        info!(
            "Evaluated {} test samples ({} correct)",
            tally.samples, tally.correct
        );

        let accuracy = round_decimals(tally.accuracy(), 4);
        logger.add(format!("Test Acc: {}", accuracy));
        Ok(accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{LabeledImage, SampleSet};
    use crate::model::LisaCnnConfig;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_tally_record() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[2.0, 0.0], [0.0, 1.0], [3.0, 1.0]], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1], &device);
        let loss = Tensor::<TestBackend, 1>::from_floats([0.5], &device);

        let mut tally = EpochTally::default();
        tally.record(logits, targets, loss);

        assert_eq!(tally.correct, 2);
        assert_eq!(tally.samples, 3);
        assert!((tally.loss_mass - 1.5).abs() < 1e-6);
        assert!((tally.accuracy() - 2.0 / 3.0).abs() < 1e-9);
        assert!((tally.mean_loss() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_empty_tally() {
        let tally = EpochTally::default();
        assert_eq!(tally.accuracy(), 0.0);
        assert_eq!(tally.mean_loss(), 0.0);
    }

    #[test]
    fn test_accuracy_independent_of_batch_size() {
        let device = Default::default();
        let model = LisaCnnConfig::new()
            .with_num_classes(3)
            .init::<TestBackend>(&device);
        let set = SampleSet::new(
            (0..7)
                .map(|i| LabeledImage {
                    pixels: RgbImage::from_pixel(32, 32, Rgb([i * 30, 255 - i * 30, 90])),
                    label: i as usize % 3,
                })
                .collect(),
        );
        let dataset = SignDataset::from_set(&set);

        let small = Evaluator::<TestBackend>::new(&device, 2, 0.1).evaluate(&model, &dataset);
        let large = Evaluator::<TestBackend>::new(&device, 64, 0.1).evaluate(&model, &dataset);

        assert_eq!(small.samples, 7);
        assert_eq!(small.correct, large.correct);
        assert!((small.mean_loss() - large.mean_loss()).abs() < 1e-4);
    }
}
