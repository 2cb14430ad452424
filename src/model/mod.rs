//! Model module for the sign classifier built with Burn

pub mod cnn;

pub use cnn::{LisaCnn, LisaCnnConfig};
