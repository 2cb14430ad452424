//! Burn Dataset Integration for LISA signs
//!
//! Implements Burn's `Dataset` trait over a [`SampleSet`] and a `Batcher`
//! that stacks items into `[batch, 3, 32, 32]` tensors scaled to `[0, 1]`.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::dataset::store::{LabeledImage, SampleSet};
use crate::IMAGE_SIZE;

/// A single sign ready for Burn
#[derive(Clone, Debug)]
pub struct SignItem {
    /// Image data as flattened CHW float array [3 * H * W]
    pub image: Vec<f32>,
    /// Class label
    pub label: usize,
}

impl SignItem {
    pub fn from_labeled(sample: &LabeledImage) -> Self {
        Self {
            image: to_chw(&sample.pixels),
            label: sample.label,
        }
    }
}

/// Convert an RGB image to a CHW float buffer in `[0, 1]`
pub fn to_chw(img: &image::RgbImage) -> Vec<f32> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = y as usize * width + x as usize;
        data[offset] = pixel[0] as f32 / 255.0;
        data[plane + offset] = pixel[1] as f32 / 255.0;
        data[2 * plane + offset] = pixel[2] as f32 / 255.0;
    }

    data
}

/// In-memory dataset of preprocessed sign items
#[derive(Debug, Clone, Default)]
pub struct SignDataset {
    items: Vec<SignItem>,
}

impl SignDataset {
    /// Preprocess every sample of a set, keeping its order
    pub fn from_set(set: &SampleSet) -> Self {
        Self {
            items: set.iter().map(SignItem::from_labeled).collect(),
        }
    }

    /// Items at the given indices
    ///
    /// Indices must come from a permutation of `0..len`; an out-of-range
    /// index would shrink the batch and skew the epoch tallies.
    pub fn gather(&self, indices: &[usize]) -> Vec<SignItem> {
        debug_assert!(
            indices.iter().all(|&i| i < self.items.len()),
            "batch index out of range for {} items",
            self.items.len()
        );
        indices.iter().filter_map(|&i| self.get(i)).collect()
    }
}

impl Dataset<SignItem> for SignDataset {
    fn get(&self, index: usize) -> Option<SignItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of sign images with their labels
#[derive(Clone, Debug)]
pub struct SignBatch<B: Backend> {
    /// Images with shape [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher placing sign batches on one device
#[derive(Clone, Debug)]
pub struct SignBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SignBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SignItem, SignBatch<B>> for SignBatcher<B> {
    fn batch(&self, items: Vec<SignItem>) -> SignBatch<B> {
        let batch_size = items.len();

        let images_data: Vec<f32> = items.iter().flat_map(|item| item.image.iter().copied()).collect();
        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [batch_size, 3, IMAGE_SIZE, IMAGE_SIZE]),
            &self.device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), &self.device);

        SignBatch { images, targets }
    }
}

/// A fresh random permutation of `0..len`
pub fn shuffled_indices(len: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}
