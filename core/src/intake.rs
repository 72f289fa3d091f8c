use slide_common::{GenerationRequest, OutputMode};

/// Prompt composer state: a draft buffer plus the output-mode toggle.
#[derive(Debug, Clone, Default)]
pub struct PromptIntake {
    draft: String,
    mode: OutputMode,
}

impl PromptIntake {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            draft: String::new(),
            mode,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OutputMode) {
        self.mode = mode;
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggled();
    }

    pub fn push_char(&mut self, c: char) {
        self.draft.push(c);
    }

    pub fn backspace(&mut self) {
        self.draft.pop();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.draft = prompt.into();
    }

    pub fn is_blank(&self) -> bool {
        self.draft.trim().is_empty()
    }

    /// Hands off the draft and clears it. A blank draft stays put and yields
    /// nothing.
    pub fn take_request(&mut self) -> Option<GenerationRequest> {
        if self.is_blank() {
            return None;
        }
        let prompt = std::mem::take(&mut self.draft);
        Some(GenerationRequest::new(prompt.trim(), self.mode))
    }
}
