use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use slide_common::OutputMode;
use slide_core::{PromptIntake, ProjectSnapshot};
use slide_protocol::{Event, JobStatus, Navigation, Op};

/// Quick revision chips, bound to F1 and F2.
pub const REVISION_SUGGESTIONS: [&str; 2] = ["Make it shorter", "Change Style"];

/// View state of the workspace screen, independent of the terminal.
pub struct App {
    pub running: bool,
    pub intake: PromptIntake,
    pub snapshot: Option<ProjectSnapshot>,
    pub notice: Option<String>,
}

impl App {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            running: true,
            intake: PromptIntake::new(mode),
            snapshot: None,
            notice: None,
        }
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.snapshot.as_ref().and_then(|s| s.status)
    }

    /// Whether Enter sends the draft as a revision rather than a new prompt.
    pub fn composing_revision(&self) -> bool {
        self.status() == Some(JobStatus::Ready)
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Translates a key press into an operation for the orchestrator.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Op> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Char('q') if ctrl => {
                self.quit();
                Some(Op::Shutdown)
            }
            KeyCode::Esc => {
                self.quit();
                Some(Op::Shutdown)
            }
            KeyCode::Char('n') if ctrl => self.take_prompt(),
            KeyCode::Char(c) if alt && c.is_ascii_digit() => {
                let index = c.to_digit(10).map_or(0, |d| d as usize).saturating_sub(1);
                Some(Op::Navigate(Navigation::Select(index)))
            }
            KeyCode::Char(c) => {
                self.intake.push_char(c);
                None
            }
            KeyCode::Backspace => {
                self.intake.backspace();
                None
            }
            KeyCode::Tab => {
                self.intake.toggle_mode();
                None
            }
            KeyCode::F(n @ 1..=2) => {
                self.intake
                    .set_prompt(REVISION_SUGGESTIONS[usize::from(n - 1)]);
                None
            }
            KeyCode::Left => Some(Op::Navigate(Navigation::Prev)),
            KeyCode::Right => Some(Op::Navigate(Navigation::Next)),
            KeyCode::Home => Some(Op::Navigate(Navigation::Select(0))),
            KeyCode::Enter if self.composing_revision() => {
                if self.intake.is_blank() {
                    return None;
                }
                let text = self.intake.draft().trim().to_string();
                self.intake.set_prompt(String::new());
                Some(Op::Revise { text })
            }
            KeyCode::Enter => self.take_prompt(),
            _ => None,
        }
    }

    fn take_prompt(&mut self) -> Option<Op> {
        // Keep the draft until the build finishes.
        if self.status() == Some(JobStatus::Building) {
            return None;
        }
        self.intake
            .take_request()
            .map(|request| Op::Submit {
                prompt: request.prompt,
                mode: request.mode,
            })
    }

    /// Keeps the notice line in sync with the event stream. The snapshot is
    /// refreshed separately.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::Error { message } => self.notice = Some(message.clone()),
            Event::JobStatusChanged { status, .. } => {
                self.notice = match status {
                    JobStatus::Building => Some("Building presentation...".to_string()),
                    JobStatus::Failed => Some("Generation failed".to_string()),
                    JobStatus::Pending | JobStatus::Ready => None,
                };
            }
            Event::ShutdownComplete => self.running = false,
            Event::ChatTurnAppended { .. } | Event::DeckReplaced { .. } | Event::CursorMoved { .. } => {}
        }
    }
}
