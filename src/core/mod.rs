//! Client-side state: the local avatar, what it collides with, where it
//! triggers ambience, and the client's view of everyone else.

pub mod chat;
pub mod collision;
pub mod motion;
pub mod registry;
pub mod scene;
pub mod session;
pub mod zone;

use nalgebra as na;

/// World-space vector. +Y is up, the ground is the XZ plane.
pub type Vec3 = na::Vector3<f32>;
