//! LISA sample archives
//!
//! The training and test splits are stored as `train.json` and `test.json`,
//! each holding index-aligned `data` (row-major HWC RGB bytes) and `labels`.

use std::fs;
use std::path::Path;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::utils::{Result, ShadowError};
use crate::IMAGE_SIZE;

/// Bytes in one 32x32 RGB image
pub const IMAGE_BYTES: usize = IMAGE_SIZE * IMAGE_SIZE * 3;

/// A sign image with its class label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImage {
    pub pixels: RgbImage,
    pub label: usize,
}

/// Ordered collection of labeled images
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    pub samples: Vec<LabeledImage>,
}

impl SampleSet {
    pub fn new(samples: Vec<LabeledImage>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LabeledImage> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabeledImage> {
        self.samples.iter()
    }

    /// Labels in sample order
    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Sample count per class
    pub fn class_distribution(&self, class_count: usize) -> Vec<usize> {
        let mut counts = vec![0; class_count];
        for sample in &self.samples {
            if let Some(count) = counts.get_mut(sample.label) {
                *count += 1;
            }
        }
        counts
    }
}

/// On-disk layout of one split
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleArchive {
    pub data: Vec<Vec<u8>>,
    pub labels: Vec<usize>,
}

impl SampleArchive {
    /// Read an archive file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShadowError::MissingFile(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write an archive file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Build an archive from a sample set
    pub fn from_set(set: &SampleSet) -> Self {
        Self {
            data: set.iter().map(|s| s.pixels.as_raw().clone()).collect(),
            labels: set.labels(),
        }
    }

    /// Validate and decode into a sample set
    pub fn into_set(self, class_count: usize) -> Result<SampleSet> {
        if self.data.len() != self.labels.len() {
            return Err(ShadowError::DataMismatch {
                data: self.data.len(),
                labels: self.labels.len(),
            });
        }

        let mut samples = Vec::with_capacity(self.data.len());
        for (index, (bytes, label)) in self.data.into_iter().zip(self.labels).enumerate() {
            if label >= class_count {
                return Err(ShadowError::LabelOutOfRange { label, class_count });
            }
            let invalid = ShadowError::InvalidImage {
                index,
                expected: IMAGE_BYTES,
                actual: bytes.len(),
            };
            if bytes.len() != IMAGE_BYTES {
                return Err(invalid);
            }
            let pixels =
                RgbImage::from_raw(IMAGE_SIZE as u32, IMAGE_SIZE as u32, bytes).ok_or(invalid)?;
            samples.push(LabeledImage { pixels, label });
        }

        Ok(SampleSet::new(samples))
    }
}

/// The train and test splits
#[derive(Debug, Clone)]
pub struct SampleStore {
    pub train: SampleSet,
    pub test: SampleSet,
}

impl SampleStore {
    /// Load both splits from the configured dataset directory
    pub fn load(config: &RunConfig) -> Result<Self> {
        let dir = &config.paths.dataset_dir;
        info!("Loading LISA archives from: {:?}", dir);

        let train = Self::load_split(&dir.join("train.json"), config.class_count)?;
        let test = Self::load_split(&dir.join("test.json"), config.class_count)?;

        info!("Loaded {} training and {} test samples", train.len(), test.len());
        debug!("Train distribution: {:?}", train.class_distribution(config.class_count));

        Ok(Self { train, test })
    }

    /// Load only the test split
    pub fn load_test(config: &RunConfig) -> Result<SampleSet> {
        Self::load_split(&config.paths.dataset_dir.join("test.json"), config.class_count)
    }

    fn load_split(path: &Path, class_count: usize) -> Result<SampleSet> {
        SampleArchive::load(path)?.into_set(class_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn archive(n: usize) -> SampleArchive {
        SampleArchive {
            data: (0..n).map(|i| vec![i as u8; IMAGE_BYTES]).collect(),
            labels: (0..n).map(|i| i % 2).collect(),
        }
    }

    #[test]
    fn test_into_set_decodes_hwc() {
        let mut raw = archive(1);
        raw.data[0][0] = 10; // R of (0, 0)
        raw.data[0][1] = 20; // G of (0, 0)
        raw.data[0][3] = 30; // R of (1, 0)

        let set = raw.into_set(2).unwrap();
        let pixels = &set.get(0).unwrap().pixels;
        assert_eq!(pixels.get_pixel(0, 0)[0], 10);
        assert_eq!(pixels.get_pixel(0, 0)[1], 20);
        assert_eq!(pixels.get_pixel(1, 0)[0], 30);
    }

    #[test]
    fn test_length_mismatch() {
        let mut raw = archive(3);
        raw.labels.pop();
        assert!(matches!(
            raw.into_set(2),
            Err(ShadowError::DataMismatch { data: 3, labels: 2 })
        ));
    }

    #[test]
    fn test_wrong_buffer_size() {
        let mut raw = archive(2);
        raw.data[1].truncate(100);
        assert!(matches!(
            raw.into_set(2),
            Err(ShadowError::InvalidImage { index: 1, actual: 100, .. })
        ));
    }

    #[test]
    fn test_label_out_of_range() {
        let raw = archive(2);
        assert!(matches!(
            raw.into_set(1),
            Err(ShadowError::LabelOutOfRange { label: 1, class_count: 1 })
        ));
    }

    #[test]
    fn test_store_load() {
        let tmp = tempdir().unwrap();
        let mut config = RunConfig::new(2, "cpu", 0);
        config.paths.dataset_dir = tmp.path().join("LISA");

        archive(4).save(&config.paths.dataset_dir.join("train.json")).unwrap();
        archive(2).save(&config.paths.dataset_dir.join("test.json")).unwrap();

        let store = SampleStore::load(&config).unwrap();
        assert_eq!(store.train.len(), 4);
        assert_eq!(store.test.labels(), vec![0, 1]);
        assert_eq!(store.train.class_distribution(2), vec![2, 2]);
    }

    #[test]
    fn test_missing_archive() {
        let tmp = tempdir().unwrap();
        let mut config = RunConfig::new(2, "cpu", 0);
        config.paths.dataset_dir = tmp.path().to_path_buf();
        assert!(matches!(
            SampleStore::load(&config),
            Err(ShadowError::MissingFile(_))
        ));
    }
}
