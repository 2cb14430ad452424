//! Inference Predictor Module
//!
//! Single-image inference with a trained checkpoint. Inputs of any size are
//! resized to the 32x32 model input before the softmax forward pass.

use std::path::Path;

use burn::prelude::*;
use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::dataset::burn_dataset::to_chw;
use crate::dataset::class_name;
use crate::inference::harness::FrameClassifier;
use crate::model::LisaCnn;
use crate::training::checkpoint::load_classifier;
use crate::utils::{Result, RunLogger, ShadowError};
use crate::IMAGE_SIZE;

/// Softmax output for one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted class index
    pub predicted_class: usize,
    /// Probability mass on the predicted class
    pub confidence: f32,
    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Argmax over a probability vector; ties resolve to the lowest index
    pub fn from_probabilities(probabilities: Vec<f32>) -> Self {
        let (predicted_class, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        Self {
            predicted_class,
            confidence: confidence.max(0.0),
            probabilities,
        }
    }

    pub fn class_name(&self) -> &'static str {
        class_name(self.predicted_class).unwrap_or("unknown")
    }
}

/// Verdict of one single-image test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub predicted_class: usize,
    pub confidence: f32,
    pub correct: bool,
}

/// Runs a trained classifier on individual images
pub struct SignPredictor<B: Backend> {
    model: LisaCnn<B>,
    device: B::Device,
}

impl<B: Backend> SignPredictor<B> {
    pub fn new(model: LisaCnn<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Load the checkpoint of the given training mode
    pub fn load(config: &RunConfig, adversarial: bool, device: B::Device) -> Result<Self> {
        let model = load_classifier::<B>(
            &config.paths.model_dir,
            adversarial,
            config.class_count,
            &device,
        )?;
        Ok(Self::new(model, device))
    }

    /// Classify an in-memory image
    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let size = IMAGE_SIZE as u32;
        let resized = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();

        let input = Tensor::<B, 4>::from_floats(
            TensorData::new(to_chw(&resized), [1, 3, IMAGE_SIZE, IMAGE_SIZE]),
            &self.device,
        );
        let probabilities: Vec<f32> = self
            .model
            .forward_softmax(input)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| ShadowError::Tensor(format!("{:?}", e)))?;

        Ok(Prediction::from_probabilities(probabilities))
    }

    /// Classify an image file and log the verdict against `ground_truth`
    pub fn predict_file(
        &self,
        path: &Path,
        ground_truth: usize,
        logger: &mut RunLogger,
    ) -> Result<InferenceResult> {
        if !path.exists() {
            return Err(ShadowError::MissingFile(path.to_path_buf()));
        }
        let image = image::open(path)
            .map_err(|e| ShadowError::ImageLoad(path.to_path_buf(), e.to_string()))?;
        let prediction = self.predict_image(&image)?;

        let correct = prediction.predicted_class == ground_truth;
        logger.add_with(format!("Correct: {}", correct), " ", true);
        logger.add(format!(
            "Predict: {} Confidence: {}%",
            prediction.predicted_class,
            prediction.confidence as f64 * 100.0
        ));

        Ok(InferenceResult {
            predicted_class: prediction.predicted_class,
            confidence: prediction.confidence,
            correct,
        })
    }
}

impl<B: Backend> FrameClassifier for SignPredictor<B> {
    fn classify(
        &self,
        path: &Path,
        ground_truth: usize,
        logger: &mut RunLogger,
    ) -> Result<InferenceResult> {
        self.predict_file(path, ground_truth, logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LisaCnnConfig;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    type TestBackend = NdArray<f32>;

    fn predictor(classes: usize) -> SignPredictor<TestBackend> {
        let device = Default::default();
        let model = LisaCnnConfig::new()
            .with_num_classes(classes)
            .init::<TestBackend>(&device);
        SignPredictor::new(model, device)
    }

    #[test]
    fn test_from_probabilities() {
        let prediction = Prediction::from_probabilities(vec![0.1, 0.7, 0.2]);
        assert_eq!(prediction.predicted_class, 1);
        assert_eq!(prediction.confidence, 0.7);
    }

    #[test]
    fn test_probabilities_are_normalised() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(97, 41, Rgb([200, 40, 10])));
        let prediction = predictor(16).predict_image(&image).unwrap();

        assert_eq!(prediction.probabilities.len(), 16);
        assert!(prediction.probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert_eq!(
            prediction.confidence,
            prediction.probabilities[prediction.predicted_class]
        );
    }

    #[test]
    fn test_predict_file_logs_verdict() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("0.png");
        RgbImage::from_pixel(64, 64, Rgb([10, 200, 30])).save(&path).unwrap();

        let predictor = predictor(4);
        let mut logger = RunLogger::silent(tmp.path().join("log.txt"));
        let result = predictor.predict_file(&path, 2, &mut logger).unwrap();

        assert_eq!(result.correct, result.predicted_class == 2);
        assert_eq!(logger.entries().len(), 2);
        assert_eq!(logger.entries()[0], format!("Correct: {} ", result.correct));
        assert!(logger.entries()[1].starts_with(&format!("Predict: {} Confidence: ", result.predicted_class)));
        assert!(logger.entries()[1].ends_with("%\n"));
    }

    #[test]
    fn test_saved_log_holds_verdict() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("3.png");
        RgbImage::from_pixel(40, 20, Rgb([90, 90, 200])).save(&path).unwrap();
        let log_path = tmp.path().join("infer.txt");

        let mut logger = RunLogger::silent(&log_path);
        let result = predictor(4).predict_file(&path, 1, &mut logger).unwrap();
        logger.save().unwrap();

        let written = std::fs::read_to_string(&log_path).unwrap();
        assert!(written.starts_with(&format!("Correct: {} Predict: {}", result.correct, result.predicted_class)));
        assert!(written.ends_with("%\n"));
    }

    #[test]
    fn test_missing_image_is_error() {
        let tmp = tempdir().unwrap();
        let mut logger = RunLogger::silent(tmp.path().join("log.txt"));
        let result = predictor(4).predict_file(&tmp.path().join("7.jpg"), 0, &mut logger);
        assert!(matches!(result, Err(ShadowError::MissingFile(_))));
        assert!(logger.entries().is_empty());
    }
}
