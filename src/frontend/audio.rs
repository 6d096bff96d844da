use std::path::PathBuf;

use tracing::info;

use crate::core::zone::{AudioSink, ZoneId};

/// A terminal cannot play sound, so zone ambience is reported instead of
/// heard. The map view shows the playing state from the session itself.
#[derive(Debug, Clone, Default)]
pub struct TerminalAudio {
    source: Option<PathBuf>,
}

impl TerminalAudio {
    pub fn new(source: Option<PathBuf>) -> Self {
        Self { source }
    }
}

impl AudioSink for TerminalAudio {
    fn start(&mut self, zone: ZoneId, name: &str) {
        info!(zone = zone.0, %name, source = ?self.source, "ambient loop started");
    }

    fn stop(&mut self, zone: ZoneId, name: &str) {
        info!(zone = zone.0, %name, "ambient loop stopped");
    }
}
