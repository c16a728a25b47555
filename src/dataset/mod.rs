//! Dataset enumeration.
//!
//! A dataset yields tracks in a fixed order. Each track names the stems it
//! provides; the raw audio for a stem is decoded only when a unit actually
//! needs it.

pub mod musdb;
pub mod track;

pub use musdb::WavStemDataset;
pub use track::{AudioBuffer, Dataset, MemoryDataset, Track};
