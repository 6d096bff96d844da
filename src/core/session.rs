//! Everything one client knows during a page-load-length session, in one
//! place. Components take `&mut SessionContext` instead of reaching for
//! globals.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::chat::ChatRelay;
use crate::core::collision::{BoundingSphere, CollisionResolver, Obstacle, Resolution};
use crate::core::motion::{CameraHeading, MotionController, MoveCommand};
use crate::core::registry::{ApplyReport, ProxyExpiry, RemotePlayerRegistry, RemoteSnapshot};
use crate::core::scene::Scene;
use crate::core::zone::{AudioCommand, SpatialTriggers, ZoneId};
use crate::core::Vec3;

/// Radius of every avatar's bounding sphere.
pub const AVATAR_RADIUS: f32 = 0.25;

/// CSS-style color string as handed out by the server (`#rrggbb`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvatarColor(String);

impl AvatarColor {
    pub fn parse(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// RGB components for `#rrggbb`, `#rgb` or a handful of color names.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let raw = self.0.as_str();
        if let Some(hex) = raw.strip_prefix('#') {
            return match hex.len() {
                6 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    Some(((v >> 16) as u8, (v >> 8) as u8, v as u8))
                }
                3 => {
                    let v = u32::from_str_radix(hex, 16).ok()?;
                    let expand = |n: u32| (n as u8 & 0xf) * 0x11;
                    Some((expand(v >> 8), expand(v >> 4), expand(v)))
                }
                _ => None,
            };
        }
        match raw.to_ascii_lowercase().as_str() {
            "red" => Some((255, 0, 0)),
            "green" => Some((0, 128, 0)),
            "lime" => Some((0, 255, 0)),
            "blue" => Some((0, 0, 255)),
            "white" => Some((255, 255, 255)),
            "black" => Some((0, 0, 0)),
            "yellow" => Some((255, 255, 0)),
            _ => None,
        }
    }
}

impl Default for AvatarColor {
    fn default() -> Self {
        Self("#ffffff".to_string())
    }
}

/// Server-assigned id and color, fixed for the session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionIdentity {
    pub user_id: String,
    pub color: AvatarColor,
}

/// The client's own avatar.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalAvatar {
    pub position: Vec3,
    pub color: AvatarColor,
    pub radius: f32,
    previous: Vec3,
}

impl LocalAvatar {
    pub fn new(position: Vec3, color: AvatarColor) -> Self {
        Self {
            position,
            color,
            radius: AVATAR_RADIUS,
            previous: position,
        }
    }

    pub fn previous_position(&self) -> Vec3 {
        self.previous
    }

    pub fn remember_position(&mut self) {
        self.previous = self.position;
    }

    pub fn rollback(&mut self) {
        self.position = self.previous;
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.position,
            radius: self.radius,
        }
    }
}

/// Result of one directional command.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    pub resolution: Resolution,
    pub position: Vec3,
    pub audio: Vec<AudioCommand>,
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    identity: Option<SessionIdentity>,
    avatar: LocalAvatar,
    heading: CameraHeading,
    motion: MotionController,
    collision: CollisionResolver,
    triggers: SpatialTriggers,
    registry: RemotePlayerRegistry,
    chat: ChatRelay,
    ground_half_extent: f32,
}

impl SessionContext {
    pub fn new(scene: Scene, motion: MotionController, expiry: ProxyExpiry, username: &str) -> Self {
        Self {
            identity: None,
            avatar: LocalAvatar::new(scene.spawn, AvatarColor::default()),
            heading: CameraHeading::default(),
            motion,
            collision: CollisionResolver::new(scene.obstacles),
            triggers: SpatialTriggers::new(scene.zones),
            registry: RemotePlayerRegistry::new(expiry),
            chat: ChatRelay::new(username),
            ground_half_extent: scene.ground_half_extent,
        }
    }

    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.identity.as_ref().map(|id| id.user_id.as_str())
    }

    pub fn avatar(&self) -> &LocalAvatar {
        &self.avatar
    }

    pub fn heading(&self) -> &CameraHeading {
        &self.heading
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        self.collision.obstacles()
    }

    pub fn triggers(&self) -> &SpatialTriggers {
        &self.triggers
    }

    pub fn registry(&self) -> &RemotePlayerRegistry {
        &self.registry
    }

    pub fn chat(&self) -> &ChatRelay {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatRelay {
        &mut self.chat
    }

    pub fn ground_half_extent(&self) -> f32 {
        self.ground_half_extent
    }

    /// Adopt the server-assigned identity. Only the first call takes effect.
    pub fn establish(&mut self, identity: SessionIdentity) -> bool {
        if let Some(current) = &self.identity {
            warn!(
                current = %current.user_id,
                offered = %identity.user_id,
                "session identity already established; ignoring"
            );
            return false;
        }

        info!(user_id = %identity.user_id, color = identity.color.as_str(), "session established");
        self.avatar.color = identity.color.clone();
        // A pull may have landed before we knew who we are.
        if self.registry.forget(&identity.user_id).is_some() {
            debug!("dropped proxy that turned out to be ourselves");
        }
        self.identity = Some(identity);
        true
    }

    pub fn turn(&mut self, delta_yaw: f32) {
        self.heading.turn(delta_yaw);
    }

    /// Move, resolve collisions, then re-evaluate zones.
    pub fn apply_move(&mut self, command: MoveCommand) -> MoveReport {
        let candidate = self.motion.apply(&mut self.avatar, command, &self.heading);
        let resolution = self.collision.resolve(&mut self.avatar);
        if let Resolution::Rejected { obstacle } = resolution {
            debug!(?candidate, obstacle = obstacle.0, "move blocked");
        }
        let audio = self.triggers.evaluate(&self.avatar.position);
        MoveReport {
            resolution,
            position: self.avatar.position,
            audio,
        }
    }

    pub fn mark_audio_loaded(&mut self, zone: ZoneId) -> bool {
        self.triggers.mark_loaded(zone)
    }

    pub fn apply_snapshot(&mut self, snapshot: &RemoteSnapshot) -> ApplyReport {
        let self_id = self.identity.as_ref().map(|id| id.user_id.as_str());
        self.registry.apply(snapshot, self_id)
    }
}
