//! Offline speech feature pipeline for a two-cohort Alzheimer's-detection
//! study: decode diarized recordings, extract segment-level acoustic
//! functionals for the participant's turns, persist feature/label tables as
//! CSV, and train a Random Forest on the result.

pub mod audio;
pub mod extract;
pub mod features;
pub mod model;
pub mod preprocess;
pub mod store;
pub mod types;
