use tracing::debug;

use crate::core::Vec3;

/// Index of a zone in scene order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoneId(pub usize);

/// Circular region on the ground. Only the inner half of the radius triggers
/// its ambience.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub name: String,
    pub center: Vec3,
    pub radius: f32,
}

impl Zone {
    pub fn new(name: impl Into<String>, center: Vec3, radius: f32) -> Self {
        Self {
            name: name.into(),
            center,
            radius,
        }
    }

    pub fn trigger_radius(&self) -> f32 {
        self.radius / 2.0
    }

    pub fn contains(&self, position: &Vec3) -> bool {
        (position - self.center).norm() < self.trigger_radius()
    }
}

/// Loop state of one zone's ambient sound.
///
/// `loaded` flips once and never back; `playing` is only ever set while
/// loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmbientTrack {
    loaded: bool,
    playing: bool,
}

impl AmbientTrack {
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCommand {
    Start(ZoneId),
    Stop(ZoneId),
}

/// Plays and stops zone ambience. Decoding and output live behind this.
pub trait AudioSink {
    fn start(&mut self, zone: ZoneId, name: &str);
    fn stop(&mut self, zone: ZoneId, name: &str);
}

/// Maps avatar position to zone membership and ambience transitions.
#[derive(Debug, Clone, Default)]
pub struct SpatialTriggers {
    zones: Vec<Zone>,
    tracks: Vec<AmbientTrack>,
}

impl SpatialTriggers {
    pub fn new(zones: Vec<Zone>) -> Self {
        let tracks = vec![AmbientTrack::default(); zones.len()];
        Self { zones, tracks }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.0)
    }

    pub fn track(&self, id: ZoneId) -> Option<&AmbientTrack> {
        self.tracks.get(id.0)
    }

    /// Mark a zone's audio asset as loaded. Does not start playback; the next
    /// evaluation does.
    pub fn mark_loaded(&mut self, id: ZoneId) -> bool {
        match self.tracks.get_mut(id.0) {
            Some(track) => {
                track.loaded = true;
                true
            }
            None => false,
        }
    }

    /// Re-evaluate every zone for `position` and return the transitions this
    /// produced. Repeated calls at the same position return nothing.
    pub fn evaluate(&mut self, position: &Vec3) -> Vec<AudioCommand> {
        let mut commands = Vec::new();
        for (index, (zone, track)) in self.zones.iter().zip(self.tracks.iter_mut()).enumerate() {
            let id = ZoneId(index);
            let inside = zone.contains(position);
            if inside && !track.loaded {
                debug!(zone = %zone.name, "inside zone before ambience loaded; ignoring");
            }

            let should_play = inside && track.loaded;
            if should_play && !track.playing {
                track.playing = true;
                commands.push(AudioCommand::Start(id));
            } else if !should_play && track.playing {
                track.playing = false;
                commands.push(AudioCommand::Stop(id));
            }
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meadow() -> SpatialTriggers {
        SpatialTriggers::new(vec![Zone::new("meadow", Vec3::new(5.0, 0.0, -5.0), 20.0)])
    }

    #[test]
    fn membership_uses_half_radius() {
        let zone = Zone::new("z", Vec3::zeros(), 20.0);
        assert!(zone.contains(&Vec3::new(9.99, 0.0, 0.0)));
        assert!(!zone.contains(&Vec3::new(10.0, 0.0, 0.0)));
        assert!(!zone.contains(&Vec3::new(15.0, 0.0, 0.0)));
    }

    #[test]
    fn enter_and_leave_emit_exactly_one_transition_each() {
        let mut triggers = meadow();
        triggers.mark_loaded(ZoneId(0));
        let inside = Vec3::new(5.0, 0.25, -5.0);
        let outside = Vec3::new(30.0, 0.25, 30.0);

        assert!(triggers.evaluate(&outside).is_empty());
        assert_eq!(triggers.evaluate(&inside), vec![AudioCommand::Start(ZoneId(0))]);
        assert!(triggers.evaluate(&inside).is_empty());
        assert!(triggers.evaluate(&inside).is_empty());
        assert_eq!(triggers.evaluate(&outside), vec![AudioCommand::Stop(ZoneId(0))]);
        assert!(triggers.evaluate(&outside).is_empty());
    }

    #[test]
    fn nothing_plays_before_load_and_load_is_not_queued() {
        let mut triggers = meadow();
        let inside = Vec3::new(5.0, 0.25, -5.0);

        assert!(triggers.evaluate(&inside).is_empty());
        assert!(triggers.mark_loaded(ZoneId(0)));
        assert!(!triggers.track(ZoneId(0)).unwrap().is_playing());

        // The next tick inside picks it up.
        assert_eq!(triggers.evaluate(&inside), vec![AudioCommand::Start(ZoneId(0))]);
        assert!(triggers.track(ZoneId(0)).unwrap().is_playing());
    }

    #[test]
    fn unknown_zone_cannot_be_loaded() {
        let mut triggers = meadow();
        assert!(!triggers.mark_loaded(ZoneId(3)));
    }
}
