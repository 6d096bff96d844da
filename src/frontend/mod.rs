//! Terminal presentation: the ratatui view, crossterm input and the audio
//! stand-in.

pub mod audio;
pub mod input;
pub mod terminal;

pub use audio::TerminalAudio;
pub use input::spawn_input_thread;
pub use terminal::TerminalFrontend;
