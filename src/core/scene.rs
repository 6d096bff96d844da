use crate::core::collision::{gate, Obstacle};
use crate::core::zone::Zone;
use crate::core::Vec3;

/// Static layout the client plays in. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct Scene {
    pub spawn: Vec3,
    pub obstacles: Vec<Obstacle>,
    pub zones: Vec<Zone>,
    /// Half the side of the square ground plane.
    pub ground_half_extent: f32,
}

impl Scene {
    /// The default plaza: a row of three gates north of spawn and one
    /// relaxation meadow.
    pub fn plaza() -> Self {
        let obstacles = (0..3)
            .flat_map(|i| gate(i as f32 * 5.0 - 5.0, 0.0, 10.0))
            .collect();
        Self {
            spawn: Vec3::new(0.0, 0.25, 4.0),
            obstacles,
            zones: vec![Zone::new("relaxation", Vec3::new(5.0, 0.0, -5.0), 20.0)],
            ground_half_extent: 150.0,
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::plaza()
    }
}
