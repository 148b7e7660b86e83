//! Deterministic per-ray jitter in the plane orthogonal to the ray.
//!
//! Each ray owns a ChaCha8 stream selected by its index under a shared seed,
//! so results do not depend on scheduling and repeat exactly across runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::types::{Vec2, Vec3};

/// Below this squared length the primary tangent is considered degenerate
const DEGENERATE_TANGENT: f32 = 1e-8;

/// Two unit vectors orthogonal to a ray direction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TangentBasis {
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl TangentBasis {
    /// `tangent = dir × +Y`, `bitangent = dir × tangent`. Directions parallel
    /// to +Y use +X instead.
    pub fn new(direction: Vec3) -> Self {
        let dir = direction.normalize_or_zero();
        let mut tangent = dir.cross(Vec3::Y);
        if tangent.length_squared() < DEGENERATE_TANGENT {
            tangent = dir.cross(Vec3::X);
        }
        let tangent = tangent.normalize_or_zero();
        let bitangent = dir.cross(tangent).normalize_or_zero();
        Self { tangent, bitangent }
    }
}

/// Uniform offsets in `[-amount, amount]` for one ray
pub struct JitterStream {
    rng: ChaCha8Rng,
    amount: f32,
}

impl JitterStream {
    pub fn for_ray(seed: u64, ray_index: usize, amount: f32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(ray_index as u64);
        Self { rng, amount }
    }

    fn next(&mut self) -> f32 {
        (self.rng.random::<f32>() * 2.0 - 1.0) * self.amount
    }

    /// Next (x, y) pair
    pub fn next_pair(&mut self) -> Vec2 {
        let x = self.next();
        let y = self.next();
        Vec2::new(x, y)
    }

    /// Next world-space offset in the tangent plane of `basis`
    pub fn offset(&mut self, basis: &TangentBasis) -> Vec3 {
        let r = self.next_pair();
        basis.tangent * r.x + basis.bitangent * r.y
    }
}
