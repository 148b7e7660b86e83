//! Voxel grid generation, density population and sampling

pub mod grid;
pub mod density;
pub mod sampler;

pub use grid::{GridLayout, Voxel, VoxelGrid, VoxelGridBuilder};
pub use density::{BufferDensity, DensitySource, NoiseDensity};
pub use sampler::{VolumeSampler, VoxelVolume};
