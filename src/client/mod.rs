//! Request/response contracts the client depends on, and the HTTP
//! implementation of them.

pub mod http;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::chat::ChatMessage;
use crate::core::registry::{RemoteSnapshot, RemoteState};
use crate::core::session::{AvatarColor, SessionIdentity};
use crate::core::Vec3;

pub use http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The landing page; visiting it is what makes the server open a session.
    Landing,
    Session,
    PullPositions,
    PushPosition,
    PullMessages,
    PostMessage,
    ClearMessages,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Landing => "/",
            Endpoint::Session => "/api/session",
            Endpoint::PullPositions | Endpoint::PushPosition => "/api/positions",
            Endpoint::PullMessages | Endpoint::PostMessage => "/api/messages",
            Endpoint::ClearMessages => "/api/clear_messages",
        }
    }

    pub fn method(self) -> &'static str {
        match self {
            Endpoint::Landing
            | Endpoint::Session
            | Endpoint::PullPositions
            | Endpoint::PullMessages => "GET",
            Endpoint::PushPosition | Endpoint::PostMessage | Endpoint::ClearMessages => "POST",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

/// Why a single sync call produced nothing. None of these are fatal; the
/// caller logs and waits for the next cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint}: server answered {status}")]
    Status { endpoint: Endpoint, status: u16 },
    #[error("{endpoint}: malformed response: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },
}

impl SyncError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            SyncError::Transport { endpoint, .. }
            | SyncError::Status { endpoint, .. }
            | SyncError::Decode { endpoint, .. } => *endpoint,
        }
    }
}

/// Form body of a position push.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionUpdate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl PositionUpdate {
    pub fn new(user_id: &str, position: Vec3) -> Self {
        Self {
            user_id: user_id.to_string(),
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }
}

/// One entry of the position pull as it arrives on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub color: Option<AvatarColor>,
}

impl From<WirePosition> for RemoteState {
    fn from(wire: WirePosition) -> Self {
        RemoteState {
            position: Vec3::new(wire.x, wire.y, wire.z),
            color: wire.color.unwrap_or_default(),
        }
    }
}

pub fn decode_snapshot(body: &str) -> Result<RemoteSnapshot, serde_json::Error> {
    let wire: HashMap<String, WirePosition> = serde_json::from_str(body)?;
    Ok(wire.into_iter().map(|(id, p)| (id, p.into())).collect())
}

/// The server contract. Every call is independent: no ordering, no retries.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn fetch_session(&self) -> Result<SessionIdentity, SyncError>;
    async fn fetch_positions(&self) -> Result<RemoteSnapshot, SyncError>;
    async fn push_position(&self, update: PositionUpdate) -> Result<(), SyncError>;
    async fn fetch_messages(&self) -> Result<Vec<ChatMessage>, SyncError>;
    async fn post_message(&self, message: ChatMessage) -> Result<(), SyncError>;
    async fn clear_messages(&self) -> Result<(), SyncError>;
}
