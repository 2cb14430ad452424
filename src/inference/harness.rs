//! Frame-sequence robustness harness
//!
//! Replays a directory of numbered frames through a classifier with one
//! ground-truth label for the whole sequence. Every frame is scored exactly
//! once, in ascending numeric order, and every failure is kept.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::inference::predictor::InferenceResult;
use crate::utils::{Result, RunLogger, ShadowError};

/// Anything that can give a verdict on one frame
pub trait FrameClassifier {
    fn classify(
        &self,
        path: &Path,
        ground_truth: usize,
        logger: &mut RunLogger,
    ) -> Result<InferenceResult>;
}

/// A frame file and its numeric index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
    pub path: PathBuf,
    pub file_name: String,
}

/// Outcome of one sequence run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    pub total_frames: usize,
    /// File names of misclassified frames, in evaluation order
    pub failed_frames: Vec<String>,
}

impl SequenceReport {
    pub fn failed(&self) -> usize {
        self.failed_frames.len()
    }

    /// Whether the perturbation defeated the classifier on every frame
    pub fn all_failed(&self) -> bool {
        self.total_frames > 0 && self.failed() == self.total_frames
    }
}

/// List the regular files of `dir` sorted by their integer stem
///
/// # Errors
/// Any file whose stem is not an unsigned integer is a fatal input error.
pub fn sorted_frames(dir: &Path) -> Result<Vec<Frame>> {
    if !dir.is_dir() {
        return Err(ShadowError::MissingFile(dir.to_path_buf()));
    }

    let mut frames = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let index = file_name
            .split('.')
            .next()
            .and_then(|stem| stem.parse::<u64>().ok())
            .ok_or_else(|| ShadowError::InvalidFrameName(file_name.clone()))?;

        frames.push(Frame {
            index,
            path: entry.path().to_path_buf(),
            file_name,
        });
    }

    frames.sort_by_key(|frame| frame.index);
    Ok(frames)
}

/// Drives a classifier over a frame directory
pub struct SequenceHarness<'a, C: FrameClassifier> {
    classifier: &'a C,
}

impl<'a, C: FrameClassifier> SequenceHarness<'a, C> {
    pub fn new(classifier: &'a C) -> Self {
        Self { classifier }
    }

    /// Score every frame of `dir` against `ground_truth`
    pub fn run(&self, dir: &Path, ground_truth: usize, logger: &mut RunLogger) -> Result<SequenceReport> {
        let frames = sorted_frames(dir)?;
        info!("Evaluating {} frames from {:?}", frames.len(), dir);
        logger.add(format!("Total frames: {}", frames.len()));

        let mut report = SequenceReport {
            total_frames: frames.len(),
            failed_frames: Vec::new(),
        };

        for frame in &frames {
            let verdict = self.classifier.classify(&frame.path, ground_truth, logger)?;
            if !verdict.correct {
                debug!("Frame {} misclassified as {}", frame.file_name, verdict.predicted_class);
                report.failed_frames.push(frame.file_name.clone());
            }
        }

        logger.add(format!("Failed: {}", report.failed()));
        logger.add(format!("{:?}", report.failed_frames));
        Ok(report)
    }
}
