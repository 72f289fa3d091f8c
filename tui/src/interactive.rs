use anyhow::Result;
use crossterm::{
    event::{self, Event as TermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use slide_common::{GenerationRequest, ProjectId, SlideConfig, Speaker};
use slide_core::{DemoBackend, GenerationOrchestrator, OrchestratorConfig};
use slide_protocol::{Event, Op, Submission};

use crate::app::App;
use crate::preview::render_presentation;

pub struct InteractiveApp {
    app: App,
    orchestrator: GenerationOrchestrator,
    initial: Option<GenerationRequest>,
}

impl InteractiveApp {
    pub fn new(config: &SlideConfig, initial: Option<GenerationRequest>) -> Self {
        let orchestrator = GenerationOrchestrator::spawn(
            ProjectId::generate(),
            Arc::new(DemoBackend::new(config.build_delay())),
            OrchestratorConfig::from(config),
        );
        Self {
            app: App::new(config.default_mode),
            orchestrator,
            initial,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        if let Some(request) = self.initial.take() {
            self.dispatch(Op::Submit {
                prompt: request.prompt,
                mode: request.mode,
            })
            .await;
        }

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        if !self.orchestrator.is_shut_down() {
            self.orchestrator.shutdown().await;
        }
        result
    }

    async fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while self.app.running {
            self.app.snapshot = Some(self.orchestrator.snapshot().await);
            terminal.draw(|f| self.draw(f))?;

            let orchestrator = self.orchestrator.clone();
            tokio::select! {
                maybe_ev = orchestrator.next_event() => {
                    if let Some(ev) = maybe_ev {
                        self.app.apply_event(&ev);
                    }
                }
                event_result = tokio::task::spawn_blocking(|| event::poll(Duration::from_millis(100))) => {
                    if let Ok(Ok(true)) = event_result {
                        if let Ok(TermEvent::Key(key)) = event::read() {
                            if key.kind == KeyEventKind::Press {
                                if let Some(op) = self.app.handle_key(key) {
                                    self.dispatch(op).await;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn dispatch(&mut self, op: Op) {
        if let Err(err) = self.orchestrator.handle(Submission::new(op)).await {
            tracing::debug!("Rejected: {err}");
        }
    }

    fn draw(&self, f: &mut Frame) {
        let Some(snapshot) = self.app.snapshot.as_ref() else {
            return;
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(8)])
            .split(f.area());

        let status = snapshot
            .status
            .map_or_else(|| "new".to_string(), |s| s.to_string());
        let mut top = vec![
            Span::styled(" Slide Studio ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!("project {} · {status}", snapshot.id)),
        ];
        if let Some(notice) = &self.app.notice {
            top.push(Span::styled(format!("  {notice}"), Style::default().fg(Color::Yellow)));
        }
        f.render_widget(Paragraph::new(Line::from(top)), rows[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(48), Constraint::Min(40)])
            .split(rows[1]);

        self.draw_chat(f, columns[0]);
        render_presentation(f, columns[1], snapshot);
    }

    fn draw_chat(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(4)])
            .split(area);

        let turns = self
            .app
            .snapshot
            .as_ref()
            .map(|s| s.turns.as_slice())
            .unwrap_or_default();
        let items: Vec<ListItem> = turns
            .iter()
            .map(|turn| {
                let color = match turn.speaker {
                    Speaker::User => Color::Green,
                    Speaker::Agent => Color::Cyan,
                };
                ListItem::new(vec![
                    Line::from(Span::styled(
                        format!("{} • {}", turn.speaker.label(), turn.display_time()),
                        Style::default().fg(color),
                    )),
                    Line::from(turn.text.clone()),
                    Line::default(),
                ])
            })
            .collect();
        let chat = List::new(items).block(Block::default().title("Chat").borders(Borders::ALL));
        f.render_widget(chat, chunks[0]);

        let title = if self.app.composing_revision() {
            "Ask for revisions (F1/F2 suggestions, Ctrl+N new prompt)".to_string()
        } else {
            format!("Prompt · {} (Tab to switch)", self.app.intake.mode().label())
        };
        let composer = Paragraph::new(self.app.intake.draft())
            .wrap(Wrap { trim: false })
            .block(Block::default().title(title).borders(Borders::ALL));
        f.render_widget(composer, chunks[1]);
    }
}
