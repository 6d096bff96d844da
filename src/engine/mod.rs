pub mod runner;
pub mod schedule;

#[cfg(test)]
mod tests;

pub use runner::ClientEngine;
pub use schedule::PeriodicTask;

use tokio::sync::mpsc;

use crate::client::SyncError;
use crate::core::chat::ChatMessage;
use crate::core::motion::MoveCommand;
use crate::core::registry::RemoteSnapshot;
use crate::core::session::{SessionContext, SessionIdentity};
use crate::core::zone::ZoneId;

/// Draws the current session state. Called on the render tick; never
/// mutates anything.
pub trait Frontend {
    fn draw(&mut self, ctx: &SessionContext) -> anyhow::Result<()>;
}

/// What the outside world can ask of a running engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Move(MoveCommand),
    /// Rotate the camera heading by this many radians.
    Turn(f32),
    ChatChar(char),
    ChatBackspace,
    /// Enter pressed on the chat input.
    Submit,
    /// A zone's ambience asset finished loading.
    AudioLoaded(ZoneId),
    Quit,
}

/// Completions of spawned network calls, fed back into the loop.
#[derive(Debug)]
pub(crate) enum Event {
    SessionLoaded(Result<SessionIdentity, SyncError>),
    PositionsPulled(Result<RemoteSnapshot, SyncError>),
    PositionPushed(Result<(), SyncError>),
    MessagesPulled(Result<Vec<ChatMessage>, SyncError>),
    MessageSent(Result<(), SyncError>),
    MessagesCleared(Result<(), SyncError>),
}

/// Cloneable sender side of a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Returns false once the engine has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn quit(&self) {
        let _ = self.tx.send(Command::Quit);
    }
}
