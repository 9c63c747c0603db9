//! Events pushed from the dispatcher to the presentation layer.

use serde::{Deserialize, Serialize};
use shared::{Turn, TurnId};

/// Titles longer than this are shortened for artifact headers
const TITLE_MAX_CHARS: usize = 30;
const TITLE_KEEP_CHARS: usize = 27;

/// Transient toast-style error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArtifactKind {
    Text,
    Code { language: String },
    Image,
}

/// Content for the side panel, produced once per dispatched turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub title: String,
    pub content: String,
}

impl Artifact {
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Text,
            title: title.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
    TurnAppended(Turn),
    /// A turn's content, kind or audio changed in place
    TurnUpdated(Turn),
    TurnRemoved(TurnId),
    /// The transcript was emptied; a greeting may follow as `TurnAppended`
    Cleared,
    Loading(bool),
    Notification(Notification),
    Artifact(Artifact),
}

/// Shortens user text for use in an artifact title.
pub fn title_base(text: &str) -> String {
    if text.chars().count() > TITLE_MAX_CHARS {
        let head: String = text.chars().take(TITLE_KEEP_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_base() {
        assert_eq!(title_base("short prompt"), "short prompt");
        let exactly_thirty = "a".repeat(30);
        assert_eq!(title_base(&exactly_thirty), exactly_thirty);
        assert_eq!(
            title_base("write a function that reverses a linked list"),
            "write a function that rever..."
        );
    }

    #[test]
    fn test_title_base_counts_chars() {
        let text = "é".repeat(31);
        let title = title_base(&text);
        assert_eq!(title.chars().count(), 30);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_notification_wire_shape() {
        let note = Notification::error("Error", "Failed to get response from AI: boom");
        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Error",
                "description": "Failed to get response from AI: boom"
            })
        );
    }
}
