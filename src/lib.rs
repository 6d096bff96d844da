pub mod client;
pub mod config;
pub mod core;
pub mod engine;
pub mod frontend;
pub mod storage;

pub use crate::config::{Cli, ClientConfig};
pub use crate::engine::{ClientEngine, Command, EngineHandle, Frontend};
