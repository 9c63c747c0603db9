use shared::{Turn, TurnId};

/// Ordered list of displayed turns.
///
/// Lookups go by turn id so that a result arriving late can find the turn it
/// belongs to, or learn that it is gone.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TurnId) -> bool {
        self.get(id).is_some()
    }

    /// Applies `f` to the turn with `id` and returns the updated copy.
    pub fn update<F>(&mut self, id: TurnId, f: F) -> Option<Turn>
    where
        F: FnOnce(&mut Turn),
    {
        let turn = self.turns.iter_mut().find(|t| t.id == id)?;
        f(turn);
        Some(turn.clone())
    }

    pub fn replace_content(&mut self, id: TurnId, content: impl Into<String>) -> bool {
        let content = content.into();
        self.update(id, |turn| turn.content = content).is_some()
    }

    pub fn set_audio(&mut self, id: TurnId, audio_data_uri: impl Into<String>) -> Option<Turn> {
        let uri = audio_data_uri.into();
        self.update(id, |turn| turn.audio_data_uri = Some(uri))
    }

    pub fn remove(&mut self, id: TurnId) -> Option<Turn> {
        let index = self.turns.iter().position(|t| t.id == id)?;
        Some(self.turns.remove(index))
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Mode, TurnKind};

    #[test]
    fn test_replace_by_id() {
        let mut transcript = Transcript::new();
        let user = Turn::user("draw a cat", Mode::Image);
        let placeholder = Turn::placeholder("Generating image for: \"draw a cat\"...", Mode::Image);
        let placeholder_id = placeholder.id;
        transcript.push(user);
        transcript.push(placeholder);

        assert!(transcript.replace_content(placeholder_id, "![cat](data:image/png;base64,AA)"));
        assert_eq!(transcript.len(), 2);
        assert_eq!(
            transcript.get(placeholder_id).unwrap().content,
            "![cat](data:image/png;base64,AA)"
        );
    }

    #[test]
    fn test_missing_id() {
        let mut transcript = Transcript::new();
        transcript.push(Turn::user("hi", Mode::General));
        let stranger = Turn::assistant("?", Mode::General).id;
        assert!(!transcript.replace_content(stranger, "x"));
        assert!(transcript.set_audio(stranger, "data:audio/mpeg;base64,AA").is_none());
        assert!(transcript.remove(stranger).is_none());
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_update_returns_copy() {
        let mut transcript = Transcript::new();
        let turn = Turn::placeholder("...", Mode::Image);
        let id = turn.id;
        transcript.push(turn);
        let updated = transcript
            .update(id, |t| t.kind = TurnKind::Error)
            .unwrap();
        assert_eq!(updated.kind, TurnKind::Error);
        assert_eq!(transcript.get(id).unwrap().kind, TurnKind::Error);
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut transcript = Transcript::new();
        let a = Turn::user("a", Mode::General);
        let b = Turn::assistant("b", Mode::General);
        let c = Turn::user("c", Mode::General);
        let b_id = b.id;
        transcript.push(a);
        transcript.push(b);
        transcript.push(c);

        assert_eq!(transcript.remove(b_id).unwrap().content, "b");
        let contents: Vec<&str> = transcript.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "c"]);
    }
}
