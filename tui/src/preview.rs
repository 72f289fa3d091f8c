use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use slide_common::{Slide, SlideContent};
use slide_core::ProjectSnapshot;
use slide_protocol::JobStatus;

/// Text lines for one slide, header first.
pub fn slide_lines(slide: &Slide) -> Vec<Line<'static>> {
    let heading = |s: &str| {
        Line::from(Span::styled(
            s.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
    };
    let muted = |s: &str| Line::from(Span::styled(s.to_string(), Style::default().fg(Color::DarkGray)));

    let mut lines = Vec::new();
    match &slide.content {
        SlideContent::Metrics(p) => {
            lines.push(muted(&p.kicker.to_uppercase()));
            lines.push(heading(&p.title));
            lines.push(muted(&p.category));
            lines.push(Line::default());
            let mut hero = vec![
                Span::raw(format!("{}: ", p.hero.label)),
                Span::styled(
                    p.hero.value.clone(),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ),
            ];
            if let Some(badge) = &p.hero.badge {
                hero.push(Span::styled(format!("  [{badge}]"), Style::default().fg(Color::Green)));
            }
            lines.push(Line::from(hero));
            if !p.hero.description.is_empty() {
                lines.push(Line::from(p.hero.description.clone()));
            }
            lines.push(Line::default());
            for metric in &p.secondary {
                let mut spans = vec![
                    Span::raw(format!("{} ", metric.trend.arrow())),
                    Span::styled(metric.value.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!("  {}", metric.label)),
                ];
                if let Some(badge) = &metric.badge {
                    spans.push(Span::styled(format!("  {badge}"), Style::default().fg(Color::Green)));
                }
                if let Some(target) = &metric.target {
                    spans.push(Span::styled(format!("  {target}"), Style::default().fg(Color::DarkGray)));
                }
                lines.push(Line::from(spans));
            }
        }
        SlideContent::Bullets(p) => {
            lines.push(heading(&p.title));
            lines.push(Line::default());
            lines.extend(p.items.iter().map(|item| Line::from(format!("• {item}"))));
        }
        SlideContent::Chart(p) => {
            lines.push(heading(&p.title));
            lines.push(Line::default());
            lines.push(Line::from(p.caption.clone()));
        }
        SlideContent::Title(p) => {
            lines.push(heading(&p.title));
            if !p.subtitle.is_empty() {
                lines.push(Line::from(p.subtitle.clone()));
            }
            lines.push(Line::default());
            if !p.body.is_empty() {
                lines.push(muted(&p.body));
            }
        }
    }
    lines
}

/// `"2 Strategic Expan…"`-style label that fits in `width` columns.
pub fn thumbnail_label(index: usize, slide: &Slide, width: usize) -> String {
    let full = format!("{} {}", index + 1, slide.title());
    if full.width() <= width {
        return full;
    }
    let mut label = String::new();
    for c in full.chars() {
        if label.width() + c.to_string().width() + 1 > width {
            break;
        }
        label.push(c);
    }
    label.push('…');
    label
}

/// Renders the current slide and the thumbnail strip below it. The building
/// placeholder only shows while there is no earlier deck to keep on screen.
pub fn render_presentation(f: &mut Frame, area: Rect, snapshot: &ProjectSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(area);

    let building = snapshot.status == Some(JobStatus::Building);
    match snapshot.current_slide() {
        Some(slide) => {
            let mut title = format!(
                "Slide {} of {} · {}",
                snapshot.cursor + 1,
                snapshot.slides.len(),
                slide.variant()
            );
            if building {
                title.push_str(" · drafting a new version");
            }
            let paragraph = Paragraph::new(slide_lines(slide))
                .block(Block::default().title(title).borders(Borders::ALL))
                .wrap(Wrap { trim: true });
            f.render_widget(paragraph, chunks[0]);
        }
        None => {
            let text = if building {
                vec![
                    Line::from(Span::styled(
                        "Building presentation...",
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        "SYNTHESIZING STRUCTURES",
                        Style::default().fg(Color::DarkGray),
                    )),
                ]
            } else {
                vec![Line::from("No slide content")]
            };
            let paragraph = Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(Block::default().title("Slide Preview").borders(Borders::ALL));
            f.render_widget(paragraph, chunks[0]);
        }
    }

    render_thumbnails(f, chunks[1], snapshot);
}

fn render_thumbnails(f: &mut Frame, area: Rect, snapshot: &ProjectSnapshot) {
    let count = snapshot.slides.len().max(1);
    let inner_width = usize::from(area.width.saturating_sub(2));
    let cell = (inner_width / count).clamp(4, 24);

    let spans: Vec<Span> = snapshot
        .slides
        .iter()
        .enumerate()
        .map(|(i, slide)| {
            let label = format!("{:<width$}", thumbnail_label(i, slide, cell - 1), width = cell);
            if i == snapshot.cursor {
                Span::styled(label, Style::default().fg(Color::Black).bg(Color::Cyan))
            } else {
                Span::raw(label)
            }
        })
        .collect();

    let strip = Paragraph::new(Line::from(spans))
        .block(Block::default().title("Slides").borders(Borders::ALL));
    f.render_widget(strip, area);
}
