//! Stem audio encoding.

pub mod wav;

pub use wav::{AudioEncoder, WavEncoder};
