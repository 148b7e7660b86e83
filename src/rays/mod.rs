//! Camera ray generation and box intersection

pub mod generator;
pub mod intersector;

pub use generator::{RayGenerator, RayGenParams};
pub use intersector::{BoxIntersector, IntersectionResult};
