/*!
Discrete collision between the local avatar and static scene geometry.

The avatar is a bounding sphere, obstacles are world-space AABBs. A move is
checked after it has been applied: if the sphere touches any obstacle the
whole move is undone. There is no sliding and no sweep, so a step longer than
an obstacle is thick can pass through it.
*/

use nalgebra as na;

use crate::core::session::LocalAvatar;
use crate::core::Vec3;

/// Index of an obstacle in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleId(pub usize);

/// Axis-aligned box in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.inf(&max),
            max: min.sup(&max),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Closest point of the box to `point` (the point itself when inside).
    pub fn clamp(&self, point: &Vec3) -> Vec3 {
        point.sup(&self.min).inf(&self.max)
    }
}

/// Sphere used as the avatar's bounding volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    /// Touching counts as intersecting.
    pub fn intersects(&self, aabb: &Aabb) -> bool {
        let closest = aabb.clamp(&self.center);
        (closest - self.center).norm_squared() <= self.radius * self.radius
    }
}

/// Static obstacle. Immutable once the scene is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub bounds: Aabb,
}

impl Obstacle {
    pub fn from_box(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            bounds: Aabb::from_center(center, half_extents),
        }
    }

    /// World AABB of a cuboid with local `half_extents` placed by `pose`.
    pub fn from_transform(half_extents: Vec3, pose: &na::Isometry3<f32>) -> Self {
        let rot = pose.rotation.to_rotation_matrix();
        let m = rot.matrix();
        let mut world_half = Vec3::zeros();
        for row in 0..3 {
            world_half[row] = (0..3)
                .map(|col| m[(row, col)].abs() * half_extents[col])
                .sum::<f32>();
        }
        let center = pose.translation.vector;
        Self {
            bounds: Aabb::from_center(center, world_half),
        }
    }
}

/// Outcome of resolving one candidate move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    /// The move was undone because it touched `obstacle` (the first hit in
    /// creation order).
    Rejected { obstacle: ObstacleId },
}

impl Resolution {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Resolution::Accepted)
    }
}

/// Accepts or rolls back a candidate move against a fixed obstacle set.
#[derive(Debug, Clone, Default)]
pub struct CollisionResolver {
    obstacles: Vec<Obstacle>,
}

impl CollisionResolver {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    /// First obstacle (in creation order) that `sphere` touches.
    pub fn first_hit(&self, sphere: &BoundingSphere) -> Option<ObstacleId> {
        self.obstacles
            .iter()
            .position(|o| sphere.intersects(&o.bounds))
            .map(ObstacleId)
    }

    /// Check the avatar at its current (candidate) position and revert to the
    /// recorded pre-move position on any hit.
    pub fn resolve(&self, avatar: &mut LocalAvatar) -> Resolution {
        match self.first_hit(&avatar.bounding_sphere()) {
            Some(obstacle) => {
                avatar.rollback();
                Resolution::Rejected { obstacle }
            }
            None => Resolution::Accepted,
        }
    }
}

/// The three boxes of a gate (left post, right post, top beam) standing on
/// `(x, y, z)`.
pub fn gate(x: f32, y: f32, z: f32) -> [Obstacle; 3] {
    const WIDTH: f32 = 2.0;
    const HEIGHT: f32 = 2.2;
    const DEPTH: f32 = 0.5;

    let post = Vec3::new(DEPTH, HEIGHT, DEPTH) * 0.5;
    let beam = Vec3::new(WIDTH + DEPTH, DEPTH, DEPTH) * 0.5;
    [
        Obstacle::from_box(Vec3::new(x - WIDTH / 2.0, y + HEIGHT / 2.0, z), post),
        Obstacle::from_box(Vec3::new(x + WIDTH / 2.0, y + HEIGHT / 2.0, z), post),
        Obstacle::from_box(Vec3::new(x, y + HEIGHT + DEPTH / 2.0, z), beam),
    ]
}
