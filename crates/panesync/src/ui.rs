//! UI rendering for the TUI

use crate::app::App;
use crate::views::render_pane;
use panesync_core::{PaneId, SyncPhase, ViewKind};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Main drawing function
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Panes
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_panes(frame, app, chunks[0]);
    draw_status_bar(frame, app, chunks[1]);

    if app.show_help {
        draw_help_popover(frame);
    }
}

/// Old and new side by side on top, the rendered diff below
fn draw_panes(frame: &mut Frame, app: &mut App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let inputs = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    render_pane(frame, app, PaneId::Old, inputs[0]);
    render_pane(frame, app, PaneId::New, inputs[1]);
    render_pane(frame, app, PaneId::Result, rows[1]);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let badge = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(format!(" {} ", app.granularity.name().to_uppercase()), badge),
        Span::raw(" "),
    ];
    if app.view() == ViewKind::Structured {
        spans.push(Span::styled("tree ", Style::default().fg(Color::Yellow)));
    }

    let (insertions, deletions) = app.stats();
    spans.push(Span::styled(
        format!("+{insertions}"),
        Style::default().fg(Color::Green),
    ));
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("-{deletions}"),
        Style::default().fg(Color::Red),
    ));
    spans.push(Span::styled("  │  ", muted));
    spans.push(Span::raw(format!("focus {}", app.focus)));
    spans.push(Span::styled("  │  ", muted));
    spans.push(sync_span(app));

    if let Some(status) = &app.status {
        spans.push(Span::styled("  │  ", muted));
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::Yellow),
        ));
    }

    let help = Span::styled(" ? help ", muted);
    let left = Paragraph::new(Line::from(spans));
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(help.width() as u16)])
        .split(area);
    frame.render_widget(left, chunks[0]);
    frame.render_widget(Paragraph::new(Line::from(help)), chunks[1]);
}

/// Sync indicator: off, the active source, or how panes will be positioned
fn sync_span(app: &App) -> Span<'static> {
    let coordinator = &app.coordinator;
    if !coordinator.config().enabled {
        return Span::styled("sync off", Style::default().fg(Color::DarkGray));
    }
    if let SyncPhase::SyncingFrom(source) = coordinator.state().phase {
        return Span::styled(
            format!("sync ← {source}"),
            Style::default().fg(Color::Cyan),
        );
    }
    if coordinator.alignment().is_some() {
        Span::raw("sync aligned")
    } else {
        Span::raw("sync proportional")
    }
}

fn draw_help_popover(frame: &mut Frame) {
    let keys: &[(&str, &str)] = &[
        ("j/k ↓/↑", "scroll focused pane"),
        ("d/u", "half page down/up"),
        ("PgDn/PgUp", "page down/up"),
        ("g/G", "top/bottom"),
        ("Tab/S-Tab", "focus next/previous pane"),
        ("m", "cycle granularity"),
        ("v", "toggle structured JSON view"),
        ("z/Enter", "fold JSON node at center"),
        ("Z", "expand or collapse all"),
        ("w", "toggle line wrap"),
        ("n", "toggle line numbers"),
        ("s", "toggle scroll sync"),
        ("?", "toggle help"),
        ("q/Esc", "quit"),
    ];

    let lines: Vec<Line> = keys
        .iter()
        .map(|(key, action)| {
            Line::from(vec![
                Span::styled(
                    format!("{key:>10}  "),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(*action),
            ])
        })
        .collect();

    let width = 44;
    let height = lines.len() as u16 + 2;
    let area = centered_rect(width, height, frame.area());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Keys ")
        .title_alignment(Alignment::Center);
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
