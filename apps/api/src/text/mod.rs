//! Text preparation applied to résumé and job-description text before embedding.

pub mod normalizer;

pub use normalizer::{normalize, StopWords};
