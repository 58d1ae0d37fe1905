use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::App,
    history::BlobStore,
    render::{history_lines, RenderModel},
    scorer::Outcome,
    session::{Clock, SessionState},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

fn outcome_style(outcome: Outcome) -> Style {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    match outcome {
        Outcome::Correct => bold_style.fg(Color::Green),
        Outcome::Incorrect => bold_style.fg(Color::Red),
        Outcome::Untyped => bold_style.add_modifier(Modifier::DIM),
    }
}

/// Paragraph spans, one per run of characters sharing an outcome.
pub fn feedback_spans(model: &RenderModel) -> Vec<Span<'static>> {
    let mut spans = model
        .feedback
        .iter()
        .chunk_by(|f| f.outcome)
        .into_iter()
        .map(|(outcome, run)| {
            let text: String = run
                .map(|f| match (outcome, f.shown) {
                    (Outcome::Incorrect, ' ') => '·',
                    (_, c) => c,
                })
                .collect();
            Span::styled(text, outcome_style(outcome))
        })
        .collect::<Vec<_>>();

    if !model.overflow.is_empty() {
        spans.push(Span::styled(
            model.overflow.clone(),
            outcome_style(Outcome::Incorrect).add_modifier(Modifier::CROSSED_OUT),
        ));
    }
    spans
}

fn lines_needed(width: usize, per_line: u16) -> u16 {
    (width as f64 / per_line as f64).ceil().max(1.0) as u16
}

fn stats_line(model: &RenderModel) -> Line<'static> {
    let label = Style::default().add_modifier(Modifier::DIM);
    let value = Style::default().add_modifier(Modifier::BOLD);
    Line::from(vec![
        Span::styled("time ", label),
        Span::styled(model.time_left.clone(), value),
        Span::styled("   mistakes ", label),
        Span::styled(model.stats.mistakes.to_string(), value),
        Span::styled("   words ", label),
        Span::styled(model.stats.words.to_string(), value),
        Span::styled("   chars ", label),
        Span::styled(model.stats.chars.to_string(), value),
        Span::styled("   accuracy ", label),
        Span::styled(format!("{}%", model.stats.accuracy), value),
    ])
}

impl<S: BlobStore, C: Clock + Clone> Widget for &App<S, C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let model = self.render_model();
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let prompt_width = self.session().target().width() + model.overflow.width();
        let prompt_lines = lines_needed(prompt_width, max_chars_per_line);
        let summary_lines = model
            .summary
            .as_deref()
            .map_or(1, |summary| lines_needed(summary.width(), max_chars_per_line));

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),                   // difficulty
                Constraint::Length(1),                   // counters
                Constraint::Length(1),                   // padding
                Constraint::Length(prompt_lines),        // paragraph
                Constraint::Length(1),                   // padding
                Constraint::Length(summary_lines),       // summary
                Constraint::Min(3),                      // history
                Constraint::Length(1),                   // legend
            ])
            .split(area);

        let state = match model.state {
            SessionState::Idle => "start typing to begin",
            SessionState::Running => "running",
            SessionState::Finished => "finished",
        };
        Paragraph::new(Line::from(vec![
            Span::styled(
                format!("difficulty: {}", model.difficulty),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("   {state}"), italic_style),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

        Paragraph::new(stats_line(&model))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        Paragraph::new(Line::from(feedback_spans(&model)))
            .alignment(if prompt_lines <= 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(chunks[3], buf);

        if let Some(summary) = &model.summary {
            Paragraph::new(Span::styled(
                summary.clone(),
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[5], buf);
        }

        let items = history_lines(self.history())
            .into_iter()
            .map(ListItem::new)
            .collect::<Vec<_>>();
        List::new(items)
            .block(Block::default().borders(Borders::ALL).title("History"))
            .render(chunks[6], buf);

        Paragraph::new(Span::styled(
            "(enter) submit / (tab) new / (ctrl-r) reset / (↑↓) difficulty / (ctrl-l) clear history / (esc)ape",
            italic_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[7], buf);
    }
}
