//! Volmarch - ray generation, box intersection, voxel volumes and ray marching

pub mod core;
pub mod math;
pub mod parallel;
pub mod stage;
pub mod rays;
pub mod volume;
pub mod march;
pub mod config;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineStats};
