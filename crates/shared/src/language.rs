//! Programming-language guess for code requests.

/// Keywords checked in priority order; the first one found in the text wins.
pub const LANGUAGE_KEYWORDS: &[&str] = &["javascript", "python", "typescript", "html", "css"];

/// Used when no keyword appears in the text.
pub const DEFAULT_LANGUAGE: &str = "code";

/// Case-insensitive substring match against [`LANGUAGE_KEYWORDS`].
pub fn infer_language(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    LANGUAGE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| lower.contains(keyword))
        .unwrap_or(DEFAULT_LANGUAGE)
}
