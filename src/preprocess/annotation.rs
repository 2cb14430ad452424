//! Key-framed bounding-box annotations
//!
//! Reads a Label Studio video export and fills in the boxes between key
//! frames by linear interpolation. Box coordinates stay in percent of the
//! frame size.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::{Result, ShadowError};

/// Box position and size at one frame, in percent of the frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyFrame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub frame: u64,
}

/// One annotated object and its key frames
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    pub id: String,
    pub labels: Vec<String>,
    pub sequence: Vec<KeyFrame>,
}

impl TrackedObject {
    /// Frames covered by the annotation, up to and including the last key frame
    pub fn frame_count(&self) -> u64 {
        self.sequence.last().map_or(0, |k| k.frame + 1)
    }

    /// Per-frame boxes between the first and last key frame
    pub fn interpolated(&self) -> Vec<KeyFrame> {
        interpolate_sequence(&self.sequence, self.frame_count())
    }
}

#[derive(Deserialize)]
struct TaskExport {
    annotations: Vec<AnnotationExport>,
}

#[derive(Deserialize)]
struct AnnotationExport {
    result: Vec<RegionExport>,
}

#[derive(Deserialize)]
struct RegionExport {
    id: String,
    value: RegionValue,
}

#[derive(Deserialize)]
struct RegionValue {
    #[serde(default)]
    labels: Option<Vec<String>>,
    sequence: Vec<KeyFrame>,
}

/// Parse the tracked objects of the first task's first annotation
pub fn load_objects(path: &Path) -> Result<Vec<TrackedObject>> {
    if !path.exists() {
        return Err(ShadowError::MissingFile(path.to_path_buf()));
    }
    let json = fs::read_to_string(path)?;
    parse_objects(&json)
}

/// Parse an export document already in memory
pub fn parse_objects(json: &str) -> Result<Vec<TrackedObject>> {
    let tasks: Vec<TaskExport> =
        serde_json::from_str(json).map_err(|e| ShadowError::Annotation(e.to_string()))?;
    let task = tasks
        .into_iter()
        .next()
        .ok_or_else(|| ShadowError::Annotation("export contains no tasks".to_string()))?;
    let annotation = task
        .annotations
        .into_iter()
        .next()
        .ok_or_else(|| ShadowError::Annotation("task has no annotations".to_string()))?;

    annotation
        .result
        .into_iter()
        .map(|region| {
            if region.value.sequence.is_empty() {
                return Err(ShadowError::Annotation(format!(
                    "object {} has no key frames",
                    region.id
                )));
            }
            debug!(
                "Object {} with {} key frames",
                region.id,
                region.value.sequence.len()
            );
            Ok(TrackedObject {
                id: region.id,
                labels: region
                    .value
                    .labels
                    .unwrap_or_else(|| vec!["blank".to_string()]),
                sequence: region.value.sequence,
            })
        })
        .collect()
}

/// Linear blend of two key frames at `frame`
pub fn interpolate(a: &KeyFrame, b: &KeyFrame, frame: u64) -> KeyFrame {
    if a.frame == b.frame {
        return *a;
    }
    let ratio = (frame as f64 - a.frame as f64) / (b.frame as f64 - a.frame as f64);
    let lerp = |from: f64, to: f64| from + (to - from) * ratio;

    KeyFrame {
        x: lerp(a.x, b.x),
        y: lerp(a.y, b.y),
        width: lerp(a.width, b.width),
        height: lerp(a.height, b.height),
        frame,
    }
}

/// Expand key frames into one box per frame below `frame_count`
///
/// Each frame uses the first consecutive key-frame pair that brackets it,
/// `seq[j].frame <= i < seq[j + 1].frame`. Frames outside every pair are
/// skipped, so the last key frame itself is never emitted.
pub fn interpolate_sequence(sequence: &[KeyFrame], frame_count: u64) -> Vec<KeyFrame> {
    (0..frame_count)
        .filter_map(|i| {
            sequence
                .windows(2)
                .find(|pair| pair[0].frame <= i && i < pair[1].frame)
                .map(|pair| interpolate(&pair[0], &pair[1], i))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(frame: u64, x: f64, width: f64) -> KeyFrame {
        KeyFrame {
            x,
            y: 10.0,
            width,
            height: 20.0,
            frame,
        }
    }

    const EXPORT: &str = r#"[{
        "id": 1,
        "annotations": [{
            "id": 7,
            "result": [
                { "id": "sign-a", "type": "videorectangle",
                  "value": { "labels": ["speedLimit30"], "framesCount": 40,
                             "sequence": [
                               { "x": 10, "y": 20, "width": 5, "height": 5, "frame": 2, "enabled": true },
                               { "x": 30, "y": 20, "width": 15, "height": 5, "frame": 6, "enabled": false }
                             ] } },
                { "id": "sign-b",
                  "value": { "sequence": [ { "x": 0, "y": 0, "width": 1, "height": 1, "frame": 0 } ] } }
            ]
        }]
    }]"#;

    #[test]
    fn test_parse_export() {
        let objects = parse_objects(EXPORT).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id, "sign-a");
        assert_eq!(objects[0].labels, vec!["speedLimit30".to_string()]);
        assert_eq!(objects[0].sequence.len(), 2);
        assert_eq!(objects[0].frame_count(), 7);
        assert_eq!(objects[1].labels, vec!["blank".to_string()]);
    }

    #[test]
    fn test_malformed_export() {
        assert!(matches!(parse_objects("{}"), Err(ShadowError::Annotation(_))));
        assert!(matches!(parse_objects("[]"), Err(ShadowError::Annotation(_))));
        assert!(matches!(
            parse_objects(r#"[{"annotations": []}]"#),
            Err(ShadowError::Annotation(_))
        ));
    }

    #[test]
    fn test_load_objects_from_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("clip.json");
        fs::write(&path, EXPORT).unwrap();
        assert_eq!(load_objects(&path).unwrap().len(), 2);
        assert!(matches!(
            load_objects(&tmp.path().join("missing.json")),
            Err(ShadowError::MissingFile(_))
        ));
    }

    #[test]
    fn test_interpolate_midpoint() {
        let mid = interpolate(&key(0, 10.0, 4.0), &key(4, 30.0, 8.0), 2);
        assert_eq!(mid.frame, 2);
        assert!((mid.x - 20.0).abs() < 1e-9);
        assert!((mid.width - 6.0).abs() < 1e-9);
        assert_eq!(mid.y, 10.0);
    }

    #[test]
    fn test_interpolate_same_frame_returns_first() {
        let a = key(3, 1.0, 1.0);
        assert_eq!(interpolate(&a, &key(3, 9.0, 9.0), 3), a);
    }

    #[test]
    fn test_interpolate_sequence_covers_key_frame_gaps() {
        let sequence = vec![key(2, 10.0, 5.0), key(6, 30.0, 15.0)];
        let frames = interpolate_sequence(&sequence, 7);

        let indices: Vec<u64> = frames.iter().map(|k| k.frame).collect();
        assert_eq!(indices, vec![2, 3, 4, 5]);
        assert_eq!(frames[0], sequence[0]);
        assert!((frames[2].x - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_key_frame_emits_nothing() {
        assert!(interpolate_sequence(&[key(0, 0.0, 1.0)], 1).is_empty());
    }
}
