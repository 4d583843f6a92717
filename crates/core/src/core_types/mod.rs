//! Core types and utilities

pub mod orientation;
pub mod vec3;

pub use orientation::{Orientation, Pose};
pub use vec3::Vec3;
