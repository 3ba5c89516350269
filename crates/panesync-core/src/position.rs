//! Mapping between scroll offsets and text positions

use crate::pane::{Pane, PaneId, DEFAULT_LINE_HEIGHT};
use serde::Serialize;
use std::ops::Range;

/// How a position was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMethod {
    /// Answered by the pane's text layout
    Precise,
    /// Derived from the line height
    Estimated,
}

/// Text position at the vertical center of a pane's viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedPosition {
    pub line: usize,
    pub char_offset: usize,
    pub method: ResolveMethod,
}

/// Char offsets where each line of a text begins
#[derive(Debug, Clone)]
pub struct LineStarts {
    starts: Vec<usize>,
    total_chars: usize,
}

impl LineStarts {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        let mut total_chars = 0;
        for c in text.chars() {
            total_chars += 1;
            if c == '\n' {
                starts.push(total_chars);
            }
        }
        Self {
            starts,
            total_chars,
        }
    }

    /// Number of lines, counting a trailing empty line after a final newline
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Newlines in the text
    pub fn newline_count(&self) -> usize {
        self.starts.len() - 1
    }

    pub fn total_chars(&self) -> usize {
        self.total_chars
    }

    pub fn start_of(&self, line: usize) -> usize {
        self.starts[line.min(self.starts.len() - 1)]
    }

    /// Chars spanned by a range of lines, newlines included
    pub fn char_range(&self, lines: &Range<usize>) -> Range<usize> {
        let end = match self.starts.get(lines.end) {
            Some(&start) => start,
            None => self.total_chars,
        };
        self.start_of(lines.start).min(end)..end
    }

    /// Line holding `offset` (newlines strictly before it)
    pub fn line_of(&self, offset: usize) -> usize {
        let offset = offset.min(self.total_chars);
        self.starts.partition_point(|&start| start <= offset) - 1
    }
}

/// Resolves viewport centers and scroll targets for a pane.
///
/// Uses the pane's [`TextLayout`](crate::pane::TextLayout) when it has one
/// and falls back to line-height arithmetic when it does not, or when a
/// layout query fails.
pub struct PositionResolver;

impl PositionResolver {
    /// Position at the center of `pane` when scrolled to `scroll_offset`
    pub fn resolve_center<P: Pane + ?Sized>(
        id: PaneId,
        pane: &P,
        scroll_offset: f64,
    ) -> ResolvedPosition {
        let viewport = pane.viewport();
        let center = (scroll_offset + viewport.client_height / 2.0).max(0.0);
        let lines = LineStarts::new(pane.text());

        if let Some(layout) = pane.layout() {
            match layout.offset_at_y(center) {
                Ok(offset) => {
                    let offset = offset.min(lines.total_chars());
                    return ResolvedPosition {
                        line: lines.line_of(offset),
                        char_offset: offset,
                        method: ResolveMethod::Precise,
                    };
                }
                Err(err) => {
                    log::debug!("{id} pane layout query failed at y={center}: {err}");
                }
            }
        }

        let line_height = Self::line_height(pane);
        let estimated = (center / line_height).floor() as usize;
        if id == PaneId::Result {
            // Rich rendering: lines may not be uniform, so the char offset
            // comes from the scroll fraction rather than the line.
            let line = estimated.min(lines.newline_count());
            let total = lines.total_chars();
            let char_offset = if viewport.scroll_height > 0.0 && total > 0 {
                let fraction = (center / viewport.scroll_height).clamp(0.0, 1.0);
                ((fraction * total as f64).floor() as usize).min(total - 1)
            } else {
                0
            };
            ResolvedPosition {
                line,
                char_offset,
                method: ResolveMethod::Estimated,
            }
        } else {
            let line = estimated.min(lines.line_count() - 1);
            ResolvedPosition {
                line,
                char_offset: lines.start_of(line),
                method: ResolveMethod::Estimated,
            }
        }
    }

    /// Scroll offset that centers `line` in `pane`
    pub fn target_for_line<P: Pane + ?Sized>(pane: &P, line: usize) -> f64 {
        let lines = LineStarts::new(pane.text());
        let line = line.min(lines.line_count() - 1);
        let line_height = Self::line_height(pane);
        let top = pane
            .layout()
            .and_then(|layout| layout.line_top(line).ok())
            .unwrap_or(line as f64 * line_height);
        Self::centered(pane, top, line_height)
    }

    /// Scroll offset that centers char `offset` in `pane`
    pub fn target_for_char<P: Pane + ?Sized>(pane: &P, offset: usize) -> f64 {
        let lines = LineStarts::new(pane.text());
        let offset = offset.min(lines.total_chars());
        let line_height = Self::line_height(pane);
        let top = pane
            .layout()
            .and_then(|layout| layout.offset_top(offset).ok())
            .unwrap_or(lines.line_of(offset) as f64 * line_height);
        Self::centered(pane, top, line_height)
    }

    fn centered<P: Pane + ?Sized>(pane: &P, top: f64, line_height: f64) -> f64 {
        let viewport = pane.viewport();
        viewport.clamp(top + line_height / 2.0 - viewport.client_height / 2.0)
    }

    fn line_height<P: Pane + ?Sized>(pane: &P) -> f64 {
        pane.line_height()
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(DEFAULT_LINE_HEIGHT)
    }
}
