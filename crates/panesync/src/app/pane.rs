//! Terminal pane: text laid out in rows of terminal cells

use panesync_core::{GeometryError, Pane, TextLayout, Viewport};
use unicode_width::UnicodeWidthChar;

/// One screen row: chars `start..end` of the text, belonging to logical `line`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub line: usize,
    pub start: usize,
    pub end: usize,
    /// Byte offset of `start`
    pub byte: usize,
    pub byte_end: usize,
}

/// A scrollable text view measured in terminal rows
#[derive(Debug, Clone)]
pub struct TextPane {
    text: String,
    wrap: bool,
    /// Content width in columns; zero until the pane is first drawn
    width: u16,
    height: u16,
    scroll_top: f64,
    rows: Vec<Row>,
    /// A programmatic scroll moved the pane and was not reported yet
    moved: bool,
}

impl TextPane {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let rows = layout_rows(&text, None);
        Self {
            text,
            wrap: false,
            width: 0,
            height: 0,
            scroll_top: 0.0,
            rows,
            moved: false,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Text of one row, without its newline
    pub fn row_text(&self, row: &Row) -> &str {
        &self.text[row.byte..row.byte_end]
    }

    /// First row shown at the top of the pane
    pub fn first_row(&self) -> usize {
        self.scroll_top.round() as usize
    }

    /// Rows currently on screen
    pub fn visible_rows(&self) -> &[Row] {
        let start = self.first_row().min(self.rows.len());
        let end = (start + self.height as usize).min(self.rows.len());
        &self.rows[start..end]
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.relayout();
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        if self.wrap != wrap {
            self.wrap = wrap;
            self.relayout();
        }
    }

    /// Record the drawn size; relayout when the wrap width changed
    pub fn resize(&mut self, width: u16, height: u16) {
        let relayout = self.width != width;
        self.width = width;
        self.height = height;
        if relayout {
            self.relayout();
        } else {
            self.scroll_top = self.viewport().clamp(self.scroll_top);
        }
    }

    /// User scroll by `delta` rows; true if the pane moved
    pub fn scroll_by(&mut self, delta: f64) -> bool {
        self.scroll_to(self.scroll_top + delta)
    }

    /// User scroll to `top`; true if the pane moved
    pub fn scroll_to(&mut self, top: f64) -> bool {
        let top = self.viewport().clamp(top);
        let moved = top != self.scroll_top;
        self.scroll_top = top;
        moved
    }

    /// True once per programmatic scroll that moved the pane
    pub fn take_moved(&mut self) -> bool {
        std::mem::take(&mut self.moved)
    }

    fn relayout(&mut self) {
        let wrap_width = (self.wrap && self.width > 0).then_some(self.width as usize);
        self.rows = layout_rows(&self.text, wrap_width);
        self.scroll_top = self.viewport().clamp(self.scroll_top);
    }

    fn measured(&self) -> Result<(), GeometryError> {
        if self.width == 0 {
            Err(GeometryError::Stale)
        } else {
            Ok(())
        }
    }
}

/// Split `text` into rows, wrapping at `wrap_width` columns when given
pub fn layout_rows(text: &str, wrap_width: Option<usize>) -> Vec<Row> {
    let mut rows = Vec::new();
    let (mut offset, mut byte_offset) = (0, 0);
    for (line, content) in text.split('\n').enumerate() {
        let mut row = Row {
            line,
            start: offset,
            end: offset,
            byte: byte_offset,
            byte_end: byte_offset,
        };
        let mut col = 0;
        for c in content.chars() {
            let width = c.width().unwrap_or(0);
            if let Some(max) = wrap_width {
                if col > 0 && col + width > max {
                    rows.push(row);
                    row.start = row.end;
                    row.byte = row.byte_end;
                    col = 0;
                }
            }
            col += width;
            row.end += 1;
            row.byte_end += c.len_utf8();
        }
        rows.push(row);
        // skip the newline
        offset = row.end + 1;
        byte_offset = row.byte_end + 1;
    }
    rows
}

impl TextLayout for TextPane {
    fn offset_at_y(&self, y: f64) -> Result<usize, GeometryError> {
        self.measured()?;
        let height = self.rows.len() as f64;
        if !(0.0..height).contains(&y) {
            return Err(GeometryError::OutOfBounds { y, height });
        }
        Ok(self.rows[y.floor() as usize].start)
    }

    fn line_top(&self, line: usize) -> Result<f64, GeometryError> {
        self.measured()?;
        let row = self.rows.partition_point(|r| r.line < line);
        Ok(row.min(self.rows.len().saturating_sub(1)) as f64)
    }

    fn offset_top(&self, offset: usize) -> Result<f64, GeometryError> {
        self.measured()?;
        let row = self.rows.partition_point(|r| r.start <= offset);
        Ok(row.saturating_sub(1) as f64)
    }
}

impl Pane for TextPane {
    fn viewport(&self) -> Viewport {
        Viewport {
            scroll_top: self.scroll_top,
            client_height: self.height as f64,
            scroll_height: self.rows.len() as f64,
        }
    }

    fn set_scroll_top(&mut self, top: f64) {
        let top = self.viewport().clamp(top);
        if top != self.scroll_top {
            self.moved = true;
        }
        self.scroll_top = top;
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn line_height(&self) -> Option<f64> {
        Some(1.0)
    }

    fn layout(&self) -> Option<&dyn TextLayout> {
        Some(self)
    }
}
