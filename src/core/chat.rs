use serde::{Deserialize, Serialize};

/// Username used until one is saved.
pub const DEFAULT_USERNAME: &str = "User";

const RENAME_PREFIX: &str = "/name ";

/// One chat line as the server lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub username: String,
    #[serde(rename = "message")]
    pub text: String,
}

/// What pressing enter on the chat input means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Nothing to send.
    Empty,
    Say(ChatMessage),
    Rename(String),
}

/// Chat input line plus the last fetched message list.
#[derive(Debug, Clone)]
pub struct ChatRelay {
    username: String,
    input: String,
    messages: Vec<ChatMessage>,
    status: Option<String>,
}

impl ChatRelay {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            input: String::new(),
            messages: Vec::new(),
            status: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_username(&mut self, name: impl Into<String>) {
        self.username = name.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Last send/rename outcome worth showing to the user.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn push_char(&mut self, c: char) {
        self.input.push(c);
    }

    pub fn backspace(&mut self) {
        self.input.pop();
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
    }

    /// Interpret the current input. Leaves the input untouched; callers clear
    /// it once the outcome is known.
    pub fn submission(&self) -> Submission {
        let text = self.input.trim();
        if text.is_empty() {
            return Submission::Empty;
        }
        if let Some(name) = self.input.trim_start().strip_prefix(RENAME_PREFIX) {
            let name = name.trim();
            if !name.is_empty() {
                return Submission::Rename(name.to_string());
            }
        }
        Submission::Say(ChatMessage {
            username: self.username.clone(),
            text: self.input.clone(),
        })
    }

    /// Swap in a freshly fetched list. The server always returns everything,
    /// so there is nothing to merge.
    pub fn replace_messages(&mut self, messages: Vec<ChatMessage>) {
        self.messages = messages;
    }
}

impl Default for ChatRelay {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME)
    }
}
