//! Small persistent key/value profile, the terminal stand-in for browser
//! local storage. Holds the chosen username.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::core::chat::DEFAULT_USERNAME;

/// Key the username is stored under before a session id is known.
pub const USERNAME_KEY: &str = "username";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("profile {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write profile {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, String>,
}

impl ProfileStore {
    /// Load `path`. A missing file is an empty profile.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StorageError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no profile yet");
                BTreeMap::new()
            }
            Err(source) => return Err(StorageError::Read { path, source }),
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// A profile that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Username stored under `key`, or the default.
    pub fn username(&self, key: &str) -> String {
        self.get(key).unwrap_or(DEFAULT_USERNAME).to_string()
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    /// Save `name` under the generic key and, once known, the session's key.
    pub fn save_username(&mut self, user_id: Option<&str>, name: &str) -> Result<(), StorageError> {
        self.entries.insert(USERNAME_KEY.to_string(), name.to_string());
        if let Some(user_id) = user_id {
            self.entries.insert(user_id.to_string(), name.to_string());
        }
        self.flush()
    }

    fn flush(&self) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        // Serializing a map of strings cannot fail.
        let text = serde_json::to_string_pretty(&self.entries).unwrap_or_default();
        write_text_atomic(path, &text).map_err(|source| StorageError::Write {
            path: path.clone(),
            source,
        })
    }
}

fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("profile.json");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, text)?;
    if let Err(error) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }
    Ok(())
}
