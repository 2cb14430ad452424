//! Learning Rate Scheduler Module
//!
//! Multi-step decay: the rate is multiplied by `gamma` each time the number of
//! finished epochs reaches a milestone. The trainer calls [`MultiStepLr::step`]
//! once per epoch, after the training batches and before evaluation.

use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;

/// Step decay at fixed epoch milestones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiStepLr {
    initial_lr: f64,
    gamma: f64,
    milestones: Vec<usize>,
    epochs_done: usize,
}

impl MultiStepLr {
    pub fn new(initial_lr: f64, gamma: f64, milestones: Vec<usize>) -> Self {
        Self {
            initial_lr,
            gamma,
            milestones,
            epochs_done: 0,
        }
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::new(
            config.learning_rate,
            config.lr_gamma,
            config.lr_milestones.clone(),
        )
    }

    /// Learning rate in effect after `epoch` finished epochs
    pub fn lr_at(&self, epoch: usize) -> f64 {
        let mut lr = self.initial_lr;
        for &milestone in &self.milestones {
            if epoch >= milestone {
                lr *= self.gamma;
            }
        }
        lr
    }

    /// Rate for the epoch currently running
    pub fn current_lr(&self) -> f64 {
        self.lr_at(self.epochs_done)
    }

    /// Mark one epoch as finished and return the new rate
    pub fn step(&mut self) -> f64 {
        self.epochs_done += 1;
        self.current_lr()
    }

    pub fn epochs_done(&self) -> usize {
        self.epochs_done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_milestone() {
        let scheduler = MultiStepLr::new(0.02, 0.2, vec![50]);
        assert_eq!(scheduler.lr_at(0), 0.02);
        assert_eq!(scheduler.lr_at(49), 0.02);
        assert!((scheduler.lr_at(50) - 0.004).abs() < 1e-12);
        assert!((scheduler.lr_at(99) - 0.004).abs() < 1e-12);
    }

    #[test]
    fn test_step_advances_epochs() {
        let mut scheduler = MultiStepLr::new(1.0, 0.5, vec![1, 3]);
        assert_eq!(scheduler.current_lr(), 1.0);
        assert_eq!(scheduler.step(), 0.5);
        assert_eq!(scheduler.step(), 0.5);
        assert_eq!(scheduler.step(), 0.25);
        assert_eq!(scheduler.epochs_done(), 3);
    }

    #[test]
    fn test_from_config_defaults() {
        let scheduler = MultiStepLr::from_config(&TrainingConfig::default());
        assert_eq!(scheduler.current_lr(), 0.02);
    }
}
