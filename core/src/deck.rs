use slide_common::{validate_deck, Slide, SlideValidationError};

/// Ordered slides of a project plus the current-slide cursor.
///
/// The cursor is always `< len()` when the deck is non-empty and `0` when it
/// is empty.
#[derive(Debug, Clone, Default)]
pub struct DeckState {
    slides: Vec<Slide>,
    cursor: usize,
}

impl DeckState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Slide> {
        self.slides.get(self.cursor)
    }

    /// Returns true when the cursor moved.
    pub fn next(&mut self) -> bool {
        if self.cursor + 1 < self.slides.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Returns true when the cursor moved.
    pub fn prev(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.slides.len() {
            self.cursor = index;
            true
        } else {
            false
        }
    }

    /// Swaps in a whole new deck and rewinds the cursor in the same step.
    /// Nothing changes if any slide fails validation.
    pub fn replace_all(&mut self, slides: Vec<Slide>) -> Result<(), SlideValidationError> {
        validate_deck(&slides)?;
        self.slides = slides;
        self.cursor = 0;
        Ok(())
    }
}
