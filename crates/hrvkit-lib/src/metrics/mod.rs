pub mod hrv;

pub use hrv::{compute_metrics, compute_metrics_with, EngineConfig, MIN_NN_INTERVALS};
