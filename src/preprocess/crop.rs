//! Per-object crops from an extracted frame directory
//!
//! Frames must already be decoded to `{index}.{ext}` files. Every tracked
//! object gets its own output directory holding `{frame}.jpg` crops.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use image::{imageops, RgbImage};
use tracing::{debug, info, warn};

use crate::inference::harness::sorted_frames;
use crate::preprocess::annotation::{load_objects, KeyFrame};
use crate::utils::{Result, ShadowError};

/// Pixel rectangle `(x, y, width, height)` of a percent box, clipped to the frame
///
/// Edges are truncated toward zero after scaling. Returns `None` when the
/// clipped box is empty.
pub fn pixel_box(key: &KeyFrame, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
    let w = frame_width as f64;
    let h = frame_height as f64;
    let px = key.x / 100.0 * w;
    let py = key.y / 100.0 * h;
    let pw = key.width / 100.0 * w;
    let ph = key.height / 100.0 * h;

    let clip = |v: f64, max: u32| (v.trunc().max(0.0) as u32).min(max);
    let (x0, x1) = (clip(px, frame_width), clip(px + pw, frame_width));
    let (y0, y1) = (clip(py, frame_height), clip(py + ph, frame_height));

    if x1 <= x0 || y1 <= y0 {
        None
    } else {
        Some((x0, y0, x1 - x0, y1 - y0))
    }
}

/// Crop every interpolated box of every annotated object
///
/// Returns the number of crops written. Boxes whose frame is missing from
/// `frames_dir` or that fall outside the frame are skipped.
pub fn crop_frames(frames_dir: &Path, annotation: &Path, out_dir: &Path) -> Result<usize> {
    let objects = load_objects(annotation)?;
    let frames: BTreeMap<u64, _> = sorted_frames(frames_dir)?
        .into_iter()
        .map(|frame| (frame.index, frame.path))
        .collect();
    info!(
        "Cropping {} objects across {} frames from {:?}",
        objects.len(),
        frames.len(),
        frames_dir
    );

    // frame index -> (object id, box)
    let mut jobs: BTreeMap<u64, Vec<(&str, KeyFrame)>> = BTreeMap::new();
    for object in &objects {
        fs::create_dir_all(out_dir.join(&object.id))?;
        for key in object.interpolated() {
            jobs.entry(key.frame).or_default().push((object.id.as_str(), key));
        }
    }

    let mut written = 0;
    for (index, boxes) in &jobs {
        let Some(path) = frames.get(index) else {
            debug!("No frame {} on disk, skipping {} boxes", index, boxes.len());
            continue;
        };
        let frame: RgbImage = image::open(path)
            .map_err(|e| ShadowError::ImageLoad(path.clone(), e.to_string()))?
            .to_rgb8();

        for (object_id, key) in boxes {
            let Some((x, y, width, height)) = pixel_box(key, frame.width(), frame.height()) else {
                warn!("Box of {} at frame {} is outside the frame", object_id, index);
                continue;
            };
            let crop = imageops::crop_imm(&frame, x, y, width, height).to_image();
            crop.save(out_dir.join(object_id).join(format!("{}.jpg", index)))?;
            written += 1;
        }
    }

    info!("Wrote {} crops to {:?}", written, out_dir);
    Ok(written)
}
