use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::client::{PositionUpdate, Transport};
use crate::config::SyncSchedule;
use crate::core::chat::Submission;
use crate::core::session::SessionContext;
use crate::core::zone::{AudioCommand, AudioSink};
use crate::engine::{Command, EngineHandle, Event, Frontend, PeriodicTask};
use crate::storage::{ProfileStore, USERNAME_KEY};

/// Drives one client session: local input, the sync timers and rendering,
/// all from a single `select!` loop. Network calls run as spawned tasks and
/// report back through the event channel, so a slow server never stalls
/// input or drawing.
pub struct ClientEngine<T: Transport, A: AudioSink> {
    ctx: SessionContext,
    transport: Arc<T>,
    audio: A,
    profile: ProfileStore,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    push: PeriodicTask,
    pull: PeriodicTask,
    chat: PeriodicTask,
    render: PeriodicTask,
}

impl<T: Transport, A: AudioSink> ClientEngine<T, A> {
    pub fn new(
        ctx: SessionContext,
        schedule: SyncSchedule,
        transport: Arc<T>,
        audio: A,
        profile: ProfileStore,
    ) -> (Self, EngineHandle) {
        let (cmd_tx, commands) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let engine = Self {
            ctx,
            transport,
            audio,
            profile,
            commands,
            events_tx,
            events_rx,
            push: PeriodicTask::new("position-push", schedule.push),
            pull: PeriodicTask::new("position-pull", schedule.pull),
            chat: PeriodicTask::new("chat-poll", schedule.chat),
            render: PeriodicTask::new("render", schedule.frame),
        };
        (engine, EngineHandle::new(cmd_tx))
    }

    /// Run until `Command::Quit` or every handle is dropped. Returns the
    /// final session state.
    pub async fn run<F: Frontend>(mut self, frontend: &mut F) -> anyhow::Result<SessionContext> {
        self.bootstrap();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Quit) | None => break,
                    Some(command) => self.handle_command(command),
                },

                Some(event) = self.events_rx.recv() => self.handle_event(event),

                _ = self.push.tick() => self.push_position(),

                _ = self.pull.tick() => self.spawn_request(|t| async move {
                    Event::PositionsPulled(t.fetch_positions().await)
                }),

                _ = self.chat.tick() => self.fetch_messages(),

                _ = self.render.tick() => frontend.draw(&self.ctx)?,
            }
        }

        for task in [&mut self.push, &mut self.pull, &mut self.chat, &mut self.render] {
            task.cancel();
        }
        info!("client engine stopped");
        Ok(self.ctx)
    }

    /// Page-load work: ask for our identity, wipe the chat log, start the
    /// position timers. Chat polling waits for the wipe to finish.
    fn bootstrap(&mut self) {
        self.spawn_request(|t| async move { Event::SessionLoaded(t.fetch_session().await) });
        self.spawn_request(|t| async move { Event::MessagesCleared(t.clear_messages().await) });
        self.push.start();
        self.pull.start();
        self.render.start();
    }

    fn spawn_request<Fut>(&self, request: impl FnOnce(Arc<T>) -> Fut)
    where
        Fut: Future<Output = Event> + Send + 'static,
    {
        let request = request(Arc::clone(&self.transport));
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            // The receiver only goes away when the engine has stopped.
            let _ = events.send(request.await);
        });
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Move(direction) => {
                let report = self.ctx.apply_move(direction);
                trace!(?direction, position = ?report.position, "moved");
                for audio in report.audio {
                    self.dispatch_audio(audio);
                }
            }
            Command::Turn(delta) => self.ctx.turn(delta),
            Command::ChatChar(c) => self.ctx.chat_mut().push_char(c),
            Command::ChatBackspace => self.ctx.chat_mut().backspace(),
            Command::Submit => self.submit_chat(),
            Command::AudioLoaded(zone) => {
                if self.ctx.mark_audio_loaded(zone) {
                    info!(zone = zone.0, "ambient track loaded");
                } else {
                    warn!(zone = zone.0, "ambient track loaded for unknown zone");
                }
            }
            Command::Quit => {}
        }
    }

    fn dispatch_audio(&mut self, command: AudioCommand) {
        let (zone, start) = match command {
            AudioCommand::Start(zone) => (zone, true),
            AudioCommand::Stop(zone) => (zone, false),
        };
        let Some(name) = self.ctx.triggers().zone(zone).map(|z| z.name.as_str()) else {
            return;
        };
        if start {
            self.audio.start(zone, name);
        } else {
            self.audio.stop(zone, name);
        }
    }

    fn submit_chat(&mut self) {
        match self.ctx.chat().submission() {
            Submission::Empty => debug!("empty chat input; nothing sent"),
            Submission::Say(message) => {
                self.spawn_request(move |t| async move {
                    Event::MessageSent(t.post_message(message).await)
                });
            }
            Submission::Rename(name) => {
                let saved = self.profile.save_username(self.ctx.user_id(), &name);
                let chat = self.ctx.chat_mut();
                chat.set_username(name.as_str());
                chat.clear_input();
                match saved {
                    Ok(()) => {
                        info!(username = %name, "username saved");
                        chat.set_status(format!("you are now {name}"));
                    }
                    Err(error) => {
                        warn!(%error, "could not save username");
                        chat.set_status(format!("you are now {name} (not saved)"));
                    }
                }
            }
        }
    }

    fn push_position(&mut self) {
        let Some(user_id) = self.ctx.user_id() else {
            debug!("no session identity yet; skipping position push");
            return;
        };
        let update = PositionUpdate::new(user_id, self.ctx.avatar().position);
        self.spawn_request(move |t| async move { Event::PositionPushed(t.push_position(update).await) });
    }

    fn fetch_messages(&self) {
        self.spawn_request(|t| async move { Event::MessagesPulled(t.fetch_messages().await) });
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::SessionLoaded(Ok(identity)) => {
                let user_id = identity.user_id.clone();
                if self.ctx.establish(identity) {
                    let name = self
                        .profile
                        .get(&user_id)
                        .or_else(|| self.profile.get(USERNAME_KEY))
                        .map(str::to_string);
                    if let Some(name) = name {
                        self.ctx.chat_mut().set_username(name);
                    }
                }
            }
            Event::SessionLoaded(Err(error)) => {
                warn!(%error, "no session identity; position pushes are disabled");
            }

            Event::PositionsPulled(Ok(snapshot)) => {
                let report = self.ctx.apply_snapshot(&snapshot);
                trace!(
                    created = report.created.len(),
                    updated = report.updated,
                    expired = report.expired.len(),
                    "snapshot applied"
                );
            }
            Event::PositionsPulled(Err(error)) => {
                warn!(%error, "position pull failed; keeping last known proxies");
            }

            Event::PositionPushed(Ok(())) => trace!("position pushed"),
            Event::PositionPushed(Err(error)) => warn!(%error, "position push failed"),

            Event::MessagesPulled(Ok(messages)) => self.ctx.chat_mut().replace_messages(messages),
            Event::MessagesPulled(Err(error)) => warn!(%error, "chat poll failed"),

            Event::MessageSent(Ok(())) => {
                self.ctx.chat_mut().clear_input();
                self.fetch_messages();
            }
            Event::MessageSent(Err(error)) => {
                warn!(%error, "chat message not sent");
                self.ctx.chat_mut().set_status(format!("send failed: {error}"));
            }

            Event::MessagesCleared(result) => {
                match result {
                    Ok(()) => {
                        debug!("chat log cleared");
                        self.fetch_messages();
                        self.chat.start_delayed();
                    }
                    Err(error) => {
                        warn!(%error, "could not clear chat log");
                        self.chat.start();
                    }
                }
            }
        }
    }
}
