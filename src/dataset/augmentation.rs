//! Adversarial Shadow Augmentation
//!
//! Doubles a training set by pairing every original sign with a shadowed twin.
//!
//! # Layout
//!
//! For an input of `N` samples the output has `2N`:
//! - slot `2i` holds original `i`, unchanged
//! - slot `2i + 1` holds a freshly shadowed copy of it with the same label
//!
//! Shadows are redrawn on every call, so each epoch trains on new twins.

use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::dataset::masks::MaskRegistry;
use crate::dataset::shadow::ShadowAugmentor;
use crate::dataset::store::{LabeledImage, SampleSet};
use crate::utils::Result;

/// Pairs each sample with a shadow-perturbed twin
#[derive(Debug, Clone)]
pub struct AugmentationStage<'a> {
    registry: &'a MaskRegistry,
    augmentor: ShadowAugmentor,
}

impl<'a> AugmentationStage<'a> {
    /// Create a stage using the default shadow augmentor
    pub fn new(registry: &'a MaskRegistry) -> Self {
        Self::with_augmentor(registry, ShadowAugmentor::default())
    }

    pub fn with_augmentor(registry: &'a MaskRegistry, augmentor: ShadowAugmentor) -> Self {
        Self {
            registry,
            augmentor,
        }
    }

    /// Build the doubled set
    ///
    /// # Errors
    /// Fails on the first sample whose label has no mask template.
    pub fn augment(&self, set: &SampleSet, rng: &mut ChaCha8Rng) -> Result<SampleSet> {
        let mut samples = Vec::with_capacity(set.len() * 2);

        for sample in set.iter() {
            let template = self.registry.template(sample.label)?;
            let shadowed = self.augmentor.cast(&sample.pixels, template, rng);

            samples.push(sample.clone());
            samples.push(LabeledImage {
                pixels: shadowed,
                label: sample.label,
            });
        }

        debug!("Augmented {} samples into {}", set.len(), samples.len());
        Ok(SampleSet::new(samples))
    }
}
