//! Frame-extraction preprocessing
//!
//! Turns a directory of decoded video frames plus a key-framed annotation
//! export into per-object crop directories, the raw material for the
//! sample archives.

pub mod annotation;
pub mod crop;

pub use annotation::{interpolate, interpolate_sequence, load_objects, KeyFrame, TrackedObject};
pub use crop::{crop_frames, pixel_box};
