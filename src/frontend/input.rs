use std::thread;
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use tracing::warn;

use crate::core::motion::MoveCommand;
use crate::engine::{Command, EngineHandle};

/// Radians per Home/End press.
pub const TURN_STEP: f32 = 0.1;
/// Radians per terminal column of mouse drag.
pub const DRAG_TURN: f32 = 0.02;

const POLL: Duration = Duration::from_millis(100);

/// Turns raw terminal events into engine commands. Tracks the last drag
/// column so drags become relative turns.
#[derive(Debug, Default)]
pub struct InputMapper {
    drag_from: Option<u16>,
}

impl InputMapper {
    pub fn map(&mut self, event: &Event) -> Option<Command> {
        match event {
            Event::Key(key) => map_key(key),
            Event::Mouse(mouse) => self.map_mouse(mouse),
            _ => None,
        }
    }

    fn map_mouse(&mut self, mouse: &MouseEvent) -> Option<Command> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.drag_from = Some(mouse.column);
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let from = self.drag_from.replace(mouse.column)?;
                let dx = f32::from(mouse.column) - f32::from(from);
                (dx != 0.0).then(|| Command::Turn(-dx * DRAG_TURN))
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.drag_from = None;
                None
            }
            _ => None,
        }
    }
}

fn map_key(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }
    let command = match key.code {
        KeyCode::Up => Command::Move(MoveCommand::Forward),
        KeyCode::Down => Command::Move(MoveCommand::Back),
        KeyCode::Left => Command::Move(MoveCommand::StrafeLeft),
        KeyCode::Right => Command::Move(MoveCommand::StrafeRight),
        KeyCode::Home => Command::Turn(TURN_STEP),
        KeyCode::End => Command::Turn(-TURN_STEP),
        KeyCode::Enter => Command::Submit,
        KeyCode::Backspace => Command::ChatBackspace,
        KeyCode::Char(c) => Command::ChatChar(c),
        KeyCode::Esc => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Read terminal events on a blocking thread until the engine goes away.
pub fn spawn_input_thread(handle: EngineHandle) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut mapper = InputMapper::default();
        while !handle.is_closed() {
            match event::poll(POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(error) => {
                    warn!(%error, "terminal input failed");
                    handle.quit();
                    return;
                }
            }
            let event = match event::read() {
                Ok(event) => event,
                Err(error) => {
                    warn!(%error, "terminal input failed");
                    handle.quit();
                    return;
                }
            };
            if let Some(command) = mapper.map(&event) {
                if !handle.send(command) {
                    return;
                }
            }
        }
    })
}
