//! Rendering of the old, new and result panes

use crate::app::{App, Row};
use panesync_core::json::NodeChange;
use panesync_core::{AlignmentTable, ChangeKind, PaneId};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use std::ops::Range;

/// A char range of a pane's text and how the diff marks it
pub type KindRange = (Range<usize>, ChangeKind);

/// Render one pane, recording its size and screen area on the app
pub fn render_pane(frame: &mut Frame, app: &mut App, id: PaneId, area: Rect) {
    app.pane_areas[id.index()] = area;

    let focused = app.focus == id;
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(pane_title(app, id));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let show_gutter = app.line_numbers && id != PaneId::Result;
    let gutter_width = if show_gutter {
        gutter_width(app.coordinator.pane(id).rows().last().map_or(0, |r| r.line))
    } else {
        0
    };
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(gutter_width), Constraint::Min(0)])
        .split(inner);
    let (gutter_area, content_area) = (chunks[0], chunks[1]);

    app.coordinator
        .pane_mut(id)
        .resize(content_area.width, content_area.height);

    let kinds = kind_ranges(app.coordinator.alignment(), id);
    let pane = app.coordinator.pane(id);
    let first = pane.first_row();
    let mut gutter_lines: Vec<Line> = Vec::new();
    let mut content_lines: Vec<Line> = Vec::new();

    for (i, row) in pane.visible_rows().iter().enumerate() {
        let text = pane.row_text(row);
        let spans = match (&app.structured, id) {
            (Some(rows), PaneId::Result) => {
                let style = rows
                    .get(row.line)
                    .map_or_else(Style::default, |r| node_style(r.change));
                vec![Span::styled(text.to_string(), style)]
            }
            _ => styled_row(text, row, &kinds),
        };
        content_lines.push(Line::from(spans));

        if show_gutter {
            let continuation = (first + i)
                .checked_sub(1)
                .and_then(|prev| pane.rows().get(prev))
                .is_some_and(|prev| prev.line == row.line);
            let number = if continuation {
                String::new()
            } else {
                format!("{:>width$} ", row.line + 1, width = gutter_width as usize - 1)
            };
            gutter_lines.push(Line::from(Span::styled(
                number,
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    if show_gutter {
        frame.render_widget(Paragraph::new(gutter_lines), gutter_area);
    }
    frame.render_widget(Paragraph::new(content_lines), content_area);
}

fn pane_title(app: &App, id: PaneId) -> String {
    let inputs = app.inputs();
    match id {
        PaneId::Old => format!(" old: {} ", inputs.old_name),
        PaneId::New => format!(" new: {} ", inputs.new_name),
        PaneId::Result => format!(" diff ({}) ", app.granularity),
    }
}

/// Columns needed to number lines up to `last_line`, plus a space
fn gutter_width(last_line: usize) -> u16 {
    let digits = (last_line + 1).to_string().len().max(3);
    digits as u16 + 1
}

/// Diff-marked char ranges of the text shown in pane `id`, in text order
pub fn kind_ranges(table: Option<&AlignmentTable>, id: PaneId) -> Vec<KindRange> {
    let Some(table) = table else {
        return Vec::new();
    };
    table
        .entries
        .iter()
        .filter(|e| e.kind != ChangeKind::Unchanged)
        .filter_map(|e| {
            let range = match id.side() {
                Some(side) => e.source(side)?.clone(),
                None => e.result.clone(),
            };
            Some((range, e.kind))
        })
        .collect()
}

/// Split a row into spans at the boundaries of the marked ranges
pub fn styled_row(text: &str, row: &Row, kinds: &[KindRange]) -> Vec<Span<'static>> {
    let first = kinds.partition_point(|(range, _)| range.end <= row.start);
    let mut spans = Vec::new();
    let mut chars = text.chars();
    let mut pos = row.start;

    for (range, kind) in &kinds[first..] {
        if range.start >= row.end {
            break;
        }
        if range.start > pos {
            let plain: String = chars.by_ref().take(range.start - pos).collect();
            spans.push(Span::raw(plain));
            pos = range.start;
        }
        let end = range.end.min(row.end);
        let marked: String = chars.by_ref().take(end - pos).collect();
        spans.push(Span::styled(marked, change_style(*kind)));
        pos = end;
    }

    let rest: String = chars.collect();
    if !rest.is_empty() {
        spans.push(Span::raw(rest));
    }
    spans
}

fn change_style(kind: ChangeKind) -> Style {
    match kind {
        ChangeKind::Added => Style::default().fg(Color::Green),
        ChangeKind::Removed => Style::default()
            .fg(Color::Red)
            .add_modifier(Modifier::CROSSED_OUT),
        ChangeKind::Unchanged => Style::default(),
    }
}

fn node_style(change: NodeChange) -> Style {
    match change {
        NodeChange::Added => Style::default().fg(Color::Green),
        NodeChange::Removed => Style::default().fg(Color::Red),
        NodeChange::Modified => Style::default().fg(Color::Yellow),
        NodeChange::Unchanged => Style::default(),
    }
}
