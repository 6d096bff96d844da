use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{Endpoint, PositionUpdate, SyncError, Transport};
use crate::config::SyncSchedule;
use crate::core::chat::ChatMessage;
use crate::core::motion::{MotionController, MoveCommand};
use crate::core::registry::{ProxyExpiry, RemoteSnapshot, RemoteState};
use crate::core::scene::Scene;
use crate::core::session::{AvatarColor, SessionContext, SessionIdentity};
use crate::core::zone::{AudioSink, ZoneId};
use crate::core::Vec3;
use crate::engine::{ClientEngine, Command, EngineHandle, Frontend};
use crate::storage::ProfileStore;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Session,
    PullPositions,
    Push(PositionUpdate),
    PullMessages,
    Post(ChatMessage),
    Clear,
}

fn refused(endpoint: Endpoint) -> SyncError {
    SyncError::Status {
        endpoint,
        status: 500,
    }
}

/// Answers instantly and remembers every call in order.
#[derive(Default)]
struct MockTransport {
    calls: Mutex<Vec<Call>>,
    identity: Option<SessionIdentity>,
    /// Consumed one per pull; an exhausted queue fails the pull.
    snapshots: Mutex<VecDeque<RemoteSnapshot>>,
    messages: Vec<ChatMessage>,
    fail_post: bool,
    fail_clear: bool,
}

impl MockTransport {
    fn with_identity(user_id: &str) -> Self {
        Self {
            identity: Some(SessionIdentity {
                user_id: user_id.into(),
                color: AvatarColor::parse("#00ff00"),
            }),
            ..Self::default()
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn chat_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::PullMessages | Call::Post(_) | Call::Clear))
            .collect()
    }

    fn pushes(&self) -> Vec<PositionUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Push(update) => Some(update),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_session(&self) -> Result<SessionIdentity, SyncError> {
        self.record(Call::Session);
        self.identity.clone().ok_or(SyncError::Status {
            endpoint: Endpoint::Session,
            status: 401,
        })
    }

    async fn fetch_positions(&self) -> Result<RemoteSnapshot, SyncError> {
        self.record(Call::PullPositions);
        let next = self.snapshots.lock().unwrap().pop_front();
        next.ok_or_else(|| refused(Endpoint::PullPositions))
    }

    async fn push_position(&self, update: PositionUpdate) -> Result<(), SyncError> {
        self.record(Call::Push(update));
        Ok(())
    }

    async fn fetch_messages(&self) -> Result<Vec<ChatMessage>, SyncError> {
        self.record(Call::PullMessages);
        Ok(self.messages.clone())
    }

    async fn post_message(&self, message: ChatMessage) -> Result<(), SyncError> {
        self.record(Call::Post(message));
        if self.fail_post {
            return Err(refused(Endpoint::PostMessage));
        }
        Ok(())
    }

    async fn clear_messages(&self) -> Result<(), SyncError> {
        self.record(Call::Clear);
        if self.fail_clear {
            return Err(refused(Endpoint::ClearMessages));
        }
        Ok(())
    }
}

struct NullFrontend;

impl Frontend for NullFrontend {
    fn draw(&mut self, _ctx: &SessionContext) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingAudio(Arc<Mutex<Vec<(ZoneId, bool)>>>);

impl AudioSink for RecordingAudio {
    fn start(&mut self, zone: ZoneId, _name: &str) {
        self.0.lock().unwrap().push((zone, true));
    }

    fn stop(&mut self, zone: ZoneId, _name: &str) {
        self.0.lock().unwrap().push((zone, false));
    }
}

fn schedule(chat: Duration) -> SyncSchedule {
    SyncSchedule {
        chat,
        ..SyncSchedule::default()
    }
}

fn context(username: &str, step: f32) -> SessionContext {
    SessionContext::new(
        Scene::plaza(),
        MotionController::new(step),
        ProxyExpiry::default(),
        username,
    )
}

/// Runs an engine alongside `script`, which quits it when done.
async fn drive<S, Fut>(
    transport: Arc<MockTransport>,
    ctx: SessionContext,
    schedule: SyncSchedule,
    audio: RecordingAudio,
    script: S,
) -> SessionContext
where
    S: FnOnce(EngineHandle) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let (engine, handle) =
        ClientEngine::new(ctx, schedule, transport, audio, ProfileStore::in_memory());
    let mut frontend = NullFrontend;
    let quit = handle.clone();
    let (ctx, ()) = tokio::join!(engine.run(&mut frontend), async move {
        script(handle).await;
        quit.quit();
    });
    ctx.expect("engine run")
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

fn type_text(handle: &EngineHandle, text: &str) {
    for c in text.chars() {
        handle.send(Command::ChatChar(c));
    }
}

#[tokio::test(start_paused = true)]
async fn clear_happens_once_before_any_chat_poll() {
    let transport = Arc::new(MockTransport::with_identity("me"));
    drive(
        transport.clone(),
        context("User", 0.05),
        schedule(Duration::from_secs(2)),
        RecordingAudio::default(),
        |_| async {
            tokio::time::sleep(Duration::from_secs(7)).await;
        },
    )
    .await;

    let chat = transport.chat_calls();
    assert_eq!(chat.first(), Some(&Call::Clear));
    assert_eq!(chat.iter().filter(|c| **c == Call::Clear).count(), 1);
    // Immediate fetch after the clear, then polls at 2s, 4s and 6s.
    assert_eq!(chat.iter().filter(|c| **c == Call::PullMessages).count(), 4);
}

#[tokio::test(start_paused = true)]
async fn failed_clear_still_opens_chat_polling() {
    let transport = Arc::new(MockTransport {
        fail_clear: true,
        ..MockTransport::default()
    });
    drive(
        transport.clone(),
        context("User", 0.05),
        schedule(Duration::from_secs(2)),
        RecordingAudio::default(),
        |_| async { settle().await },
    )
    .await;

    assert_eq!(transport.chat_calls(), vec![Call::Clear, Call::PullMessages]);
}

#[tokio::test(start_paused = true)]
async fn no_position_push_without_identity() {
    let transport = Arc::new(MockTransport::default());
    drive(
        transport.clone(),
        context("User", 0.05),
        SyncSchedule::default(),
        RecordingAudio::default(),
        |handle| async move {
            handle.send(Command::Move(MoveCommand::Forward));
            tokio::time::sleep(Duration::from_secs(9)).await;
        },
    )
    .await;

    assert!(transport.calls().contains(&Call::Session));
    assert!(transport.pushes().is_empty());
    // Pulls do not depend on identity.
    assert!(transport.calls().contains(&Call::PullPositions));
}

#[tokio::test(start_paused = true)]
async fn pushes_carry_user_id_and_current_position() {
    let transport = Arc::new(MockTransport::with_identity("me"));
    let ctx = drive(
        transport.clone(),
        context("User", 0.5),
        SyncSchedule::default(),
        RecordingAudio::default(),
        |handle| async move {
            settle().await;
            handle.send(Command::Move(MoveCommand::Forward));
            tokio::time::sleep(Duration::from_secs(3)).await;
        },
    )
    .await;

    let pushes = transport.pushes();
    let last = pushes.last().expect("a push after identity arrived");
    assert_eq!(last.user_id, "me");
    assert_eq!(Vec3::new(last.x, last.y, last.z), ctx.avatar().position);
    assert_eq!(ctx.avatar().color, AvatarColor::parse("#00ff00"));
}

#[tokio::test(start_paused = true)]
async fn empty_chat_submission_sends_nothing() {
    let transport = Arc::new(MockTransport::with_identity("me"));
    drive(
        transport.clone(),
        context("Bob", 0.05),
        schedule(Duration::from_secs(600)),
        RecordingAudio::default(),
        |handle| async move {
            settle().await;
            handle.send(Command::Submit);
            type_text(&handle, "   ");
            handle.send(Command::Submit);
            settle().await;
        },
    )
    .await;

    assert!(!transport.calls().iter().any(|c| matches!(c, Call::Post(_))));
}

#[tokio::test(start_paused = true)]
async fn sent_message_clears_input_and_refetches() {
    let transport = Arc::new(MockTransport::with_identity("me"));
    let ctx = drive(
        transport.clone(),
        context("Bob", 0.05),
        schedule(Duration::from_secs(600)),
        RecordingAudio::default(),
        |handle| async move {
            settle().await;
            type_text(&handle, "hello");
            handle.send(Command::Submit);
            settle().await;
        },
    )
    .await;

    assert_eq!(
        transport.chat_calls(),
        vec![
            Call::Clear,
            Call::PullMessages,
            Call::Post(ChatMessage {
                username: "Bob".into(),
                text: "hello".into(),
            }),
            Call::PullMessages,
        ]
    );
    assert_eq!(ctx.chat().input(), "");
}

#[tokio::test(start_paused = true)]
async fn failed_send_keeps_input_and_reports() {
    let transport = Arc::new(MockTransport {
        fail_post: true,
        ..MockTransport::with_identity("me")
    });
    let ctx = drive(
        transport.clone(),
        context("Bob", 0.05),
        schedule(Duration::from_secs(600)),
        RecordingAudio::default(),
        |handle| async move {
            settle().await;
            type_text(&handle, "hello");
            handle.send(Command::Submit);
            settle().await;
        },
    )
    .await;

    assert_eq!(ctx.chat().input(), "hello");
    assert!(ctx.chat().status().is_some());
    assert_eq!(transport.chat_calls().last(), Some(&Call::Post(ChatMessage {
        username: "Bob".into(),
        text: "hello".into(),
    })));
}

#[tokio::test(start_paused = true)]
async fn rename_is_not_sent_as_chat() {
    let transport = Arc::new(MockTransport::with_identity("me"));
    let ctx = drive(
        transport.clone(),
        context("User", 0.05),
        schedule(Duration::from_secs(600)),
        RecordingAudio::default(),
        |handle| async move {
            settle().await;
            type_text(&handle, "/name Alice");
            handle.send(Command::Submit);
            settle().await;
        },
    )
    .await;

    assert_eq!(ctx.chat().username(), "Alice");
    assert_eq!(ctx.chat().input(), "");
    assert!(!transport.calls().iter().any(|c| matches!(c, Call::Post(_))));
}

#[tokio::test(start_paused = true)]
async fn pulled_snapshot_populates_registry_and_survives_failures() {
    let first: RemoteSnapshot = [(
        "A".to_string(),
        RemoteState {
            position: Vec3::new(1.0, 0.0, 1.0),
            color: AvatarColor::parse("red"),
        },
    )]
    .into_iter()
    .collect();
    let transport = Arc::new(MockTransport {
        snapshots: Mutex::new(VecDeque::from([first])),
        ..MockTransport::with_identity("me")
    });

    let ctx = drive(
        transport.clone(),
        context("User", 0.05),
        SyncSchedule::default(),
        RecordingAudio::default(),
        |_| async {
            // Pulls at 0s (ok), then 2s, 4s and 6s (all failing).
            tokio::time::sleep(Duration::from_secs(7)).await;
        },
    )
    .await;

    let pulls = transport
        .calls()
        .iter()
        .filter(|c| **c == Call::PullPositions)
        .count();
    assert_eq!(pulls, 4);
    let proxy = ctx.registry().get("A").expect("proxy kept");
    assert_eq!(proxy.position, Vec3::new(1.0, 0.0, 1.0));
    assert_eq!(proxy.color, AvatarColor::parse("red"));
}

#[tokio::test(start_paused = true)]
async fn ambience_starts_once_when_walking_into_the_zone() {
    let transport = Arc::new(MockTransport::with_identity("me"));
    let audio = RecordingAudio::default();
    drive(
        transport,
        context("User", 0.5),
        SyncSchedule::default(),
        audio.clone(),
        |handle| async move {
            // Before the asset loads, entering the zone is silent.
            handle.send(Command::Move(MoveCommand::Forward));
            handle.send(Command::AudioLoaded(ZoneId(0)));
            handle.send(Command::Move(MoveCommand::Forward));
            handle.send(Command::Move(MoveCommand::Forward));
            settle().await;
        },
    )
    .await;

    assert_eq!(*audio.0.lock().unwrap(), vec![(ZoneId(0), true)]);
}
