use slide_common::{ChatTurn, Speaker};

/// Append-only chat log of a project.
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    turns: Vec<ChatTurn>,
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a turn stamped with the current time and returns it.
    pub fn append(&mut self, speaker: Speaker, text: impl Into<String>) -> &ChatTurn {
        self.turns.push(ChatTurn::new(speaker, text));
        &self.turns[self.turns.len() - 1]
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
