//! Geometry utilities: boxes, rays, planes and the view frustum

pub mod aabb;
pub mod ray;
pub mod frustum;

pub use aabb::Aabb;
pub use ray::{Ray, SlabHit, viewport_point_to_ray, viewport_point_to_world};
pub use frustum::{Plane, Frustum};
