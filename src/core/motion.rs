use nalgebra as na;

use crate::core::session::LocalAvatar;
use crate::core::Vec3;

/// Distance covered by one directional keypress.
pub const DEFAULT_STEP: f32 = 0.05;

/// Discrete directional input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCommand {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
}

/// Where the camera looks, in world space.
///
/// Yaw 0 / pitch 0 looks down -Z. Positive yaw turns left, positive pitch
/// looks up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraHeading {
    yaw: f32,
    pitch: f32,
}

impl CameraHeading {
    pub fn new(yaw: f32, pitch: f32) -> Self {
        Self { yaw, pitch }
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn turn(&mut self, delta_yaw: f32) {
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
    }

    /// Full view direction (unit length).
    pub fn direction(&self) -> Vec3 {
        // Yaw-then-pitch, same order as a "YXZ" euler camera.
        let yaw = na::UnitQuaternion::from_axis_angle(&Vec3::y_axis(), self.yaw);
        let pitch = na::UnitQuaternion::from_axis_angle(&Vec3::x_axis(), self.pitch);
        (yaw * pitch) * Vec3::new(0.0, 0.0, -1.0)
    }

    /// View direction projected onto the ground plane and renormalized.
    ///
    /// `None` when the camera looks straight up or down.
    pub fn horizontal(&self) -> Option<Vec3> {
        let mut dir = self.direction();
        dir.y = 0.0;
        dir.try_normalize(1.0e-6)
    }
}

impl Default for CameraHeading {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Turns directional input plus camera heading into a candidate position.
#[derive(Debug, Clone, Copy)]
pub struct MotionController {
    step: f32,
}

impl MotionController {
    pub fn new(step: f32) -> Self {
        Self { step }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Displacement for `command` under `heading`, or `None` if the heading
    /// has no horizontal component.
    pub fn displacement(&self, command: MoveCommand, heading: &CameraHeading) -> Option<Vec3> {
        let forward = heading.horizontal()?;
        let right = forward.cross(&Vec3::y());
        let delta = match command {
            MoveCommand::Forward => forward * self.step,
            MoveCommand::Back => -forward * self.step,
            MoveCommand::StrafeLeft => -right * self.step,
            MoveCommand::StrafeRight => right * self.step,
        };
        Some(delta)
    }

    /// Record the pre-move position on `avatar` and move it to the candidate.
    ///
    /// Returns the candidate position. A degenerate heading still records the
    /// rollback point but leaves the avatar where it is.
    pub fn apply(
        &self,
        avatar: &mut LocalAvatar,
        command: MoveCommand,
        heading: &CameraHeading,
    ) -> Vec3 {
        avatar.remember_position();
        if let Some(delta) = self.displacement(command, heading) {
            avatar.position += delta;
        }
        avatar.position
    }
}

impl Default for MotionController {
    fn default() -> Self {
        Self::new(DEFAULT_STEP)
    }
}
