//! Conversation history and its flat-text encoding.
//!
//! Providers that cannot take a structured message list receive the history as
//! a blob of alternating lines:
//!
//! ```text
//! User: <text>
//! OmniAssist: <text>
//! ```
//!
//! Turn text is escaped before it goes into the blob so a multi-line turn stays
//! on one line and can never start a line with a role prefix.

use serde::{Deserialize, Serialize};

use crate::conversation::ChatMessage;

pub const USER_PREFIX: &str = "User: ";
pub const ASSISTANT_PREFIX: &str = "OmniAssist: ";

/// Append one exchange to a blob and return the new blob.
pub fn append(history: &str, user_text: &str, assistant_text: &str) -> String {
    let blob = format!(
        "{}\n{}{}\n{}{}",
        history,
        USER_PREFIX,
        escape(user_text),
        ASSISTANT_PREFIX,
        escape(assistant_text)
    );
    // Only separators are raw newlines, so this never touches turn text.
    blob.trim_matches('\n').to_string()
}

/// Parse a blob back into role-tagged messages. Lines without a known prefix are dropped.
pub fn to_messages(history: &str) -> Vec<ChatMessage> {
    history
        .split('\n')
        .filter_map(|line| {
            if let Some(text) = line.strip_prefix(USER_PREFIX) {
                Some(ChatMessage::user(unescape(text)))
            } else {
                line.strip_prefix(ASSISTANT_PREFIX)
                    .map(|text| ChatMessage::assistant(unescape(text)))
            }
        })
        .collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Unknown escape: keep it as written
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// One completed user/assistant exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Append-only record of completed exchanges for the current session.
///
/// The exchange list is authoritative; the blob is derived on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    exchanges: Vec<Exchange>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.exchanges.push(Exchange {
            user: user.into(),
            assistant: assistant.into(),
        });
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn to_blob(&self) -> String {
        self.exchanges
            .iter()
            .fold(String::new(), |blob, ex| append(&blob, &ex.user, &ex.assistant))
    }

    pub fn to_messages(&self) -> Vec<ChatMessage> {
        to_messages(&self.to_blob())
    }
}
