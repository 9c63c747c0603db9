//! Decoding structured replies from models that do not reliably emit bare JSON.
//!
//! Each strategy extracts one candidate string from the raw reply; the first
//! candidate that deserializes into the target type wins.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use crate::error::ProviderError;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json)?[ \t]*\r?\n?(.*?)```").expect("valid fenced block pattern")
});

type Extract = fn(&str) -> Option<&str>;

/// Strategies in the order they are tried
const STRATEGIES: &[(&str, Extract)] = &[
    ("whole reply", whole_reply),
    ("fenced block", fenced_block),
    ("embedded object", embedded_object),
];

fn whole_reply(raw: &str) -> Option<&str> {
    Some(raw.trim())
}

fn fenced_block(raw: &str) -> Option<&str> {
    FENCED_JSON
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// From the first `{` to the last `}`
fn embedded_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Decode `raw` into `T`, trying each extraction strategy in turn.
///
/// Fails with a single [`ProviderError::MalformedResponse`] only when every
/// strategy fails. The raw payload is logged and kept on the error.
pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, ProviderError> {
    let mut failures = Vec::new();
    for (name, extract) in STRATEGIES {
        let Some(candidate) = extract(raw) else {
            continue;
        };
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => {
                if !failures.is_empty() {
                    tracing::debug!("decoded reply using {} strategy", name);
                }
                return Ok(value);
            }
            Err(e) => failures.push(format!("{}: {}", name, e)),
        }
    }

    tracing::warn!(payload = raw, "could not decode provider reply");
    Err(ProviderError::MalformedResponse {
        message: failures.join("; "),
        payload: raw.to_string(),
    })
}
