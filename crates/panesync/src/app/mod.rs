//! Application state and logic

use anyhow::{Context, Result};
use panesync_core::json::{self, StructuredRow};
use panesync_core::{
    ChangeList, DiffEngine, Granularity, PaneId, ScrollCoordinator, SyncConfig, ViewKind,
};
use ratatui::layout::{Position, Rect};
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::{Duration, Instant};

mod pane;

pub use pane::{Row, TextPane};


/// The two texts being compared
#[derive(Debug, Clone)]
pub struct Inputs {
    pub old_name: String,
    pub new_name: String,
    pub old: String,
    pub new: String,
    /// A change list loaded from disk; the engine is not run when present
    pub changes: Option<ChangeList>,
}

/// Startup settings, after merging config and CLI flags
#[derive(Debug, Clone)]
pub struct Settings {
    pub granularity: Granularity,
    pub view: ViewKind,
    pub engine: DiffEngine,
    pub sync: SyncConfig,
    pub line_wrap: bool,
    pub line_numbers: bool,
    pub frame: Duration,
}

/// The main application state
pub struct App {
    /// Owns the three panes and keeps them aligned
    pub coordinator: ScrollCoordinator<TextPane>,
    engine: DiffEngine,
    inputs: Inputs,
    pub granularity: Granularity,
    /// Shared with the coordinator, which reads it on every rebuild
    view: Rc<Cell<ViewKind>>,
    /// Visible rows of the structured JSON view, when active
    pub structured: Option<Vec<StructuredRow>>,
    /// Paths of collapsed containers in the structured view
    collapsed: HashSet<String>,
    /// Pane receiving keyboard scrolls
    pub focus: PaneId,
    pub line_wrap: bool,
    pub line_numbers: bool,
    /// Frame interval of the event loop
    pub frame: Duration,
    /// One-line message for the status bar
    pub status: Option<String>,
    pub show_help: bool,
    pub should_quit: bool,
    /// Screen areas of the panes at the last draw, indexed by `PaneId::index`
    pub pane_areas: [Rect; 3],
}

impl App {
    pub fn new(inputs: Inputs, settings: Settings) -> Result<Self> {
        let view = Rc::new(Cell::new(settings.view));
        let view_fn = {
            let view = Rc::clone(&view);
            move || view.get()
        };
        let coordinator = ScrollCoordinator::init(
            TextPane::new(""),
            TextPane::new(""),
            TextPane::new(""),
            view_fn,
            settings.sync,
        );

        let mut app = Self {
            coordinator,
            engine: settings.engine,
            inputs,
            granularity: settings.granularity,
            view,
            structured: None,
            collapsed: HashSet::new(),
            focus: PaneId::Result,
            line_wrap: false,
            line_numbers: settings.line_numbers,
            frame: settings.frame,
            status: None,
            show_help: false,
            should_quit: false,
            pane_areas: [Rect::default(); 3],
        };
        app.set_line_wrap(settings.line_wrap);
        app.recompute()?;
        Ok(app)
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn view(&self) -> ViewKind {
        self.view.get()
    }

    /// Whether the change list came from a file rather than the engine
    pub fn is_fixed(&self) -> bool {
        self.inputs.changes.is_some()
    }

    /// Rerun the diff and rebuild the alignment
    pub fn recompute(&mut self) -> Result<()> {
        let granularity = self.granularity;
        let (old_text, new_text, changes) = match &self.inputs.changes {
            Some(changes) => (changes.old_text(), changes.new_text(), Some(changes.clone())),
            None => {
                let changes = self
                    .engine
                    .clone()
                    .with_granularity(granularity)
                    .diff(&self.inputs.old, &self.inputs.new)
                    .with_context(|| format!("Failed to diff by {granularity}"))?;
                let (old_text, new_text) = self.source_texts()?;
                (old_text, new_text, changes)
            }
        };

        let structured = if granularity == Granularity::Json && self.view() == ViewKind::Structured
        {
            let rows = json::structured_rows(&self.inputs.old, &self.inputs.new)
                .context("Failed to build structured view")?;
            Some(json::collapse_rows(&rows, &self.collapsed))
        } else {
            None
        };

        self.coordinator.pane_mut(PaneId::Old).set_text(old_text.as_str());
        self.coordinator.pane_mut(PaneId::New).set_text(new_text.as_str());

        match changes {
            Some(changes) => {
                let result_text = match &structured {
                    Some(rows) => structured_text(rows),
                    None => changes.result_text(),
                };
                self.coordinator.pane_mut(PaneId::Result).set_text(result_text);
                self.coordinator
                    .rebuild_alignment(changes, &old_text, &new_text, granularity);
                self.status = None;
            }
            None => {
                log::debug!("diff by {granularity} exceeded its limits");
                self.coordinator.pane_mut(PaneId::Result).set_text("");
                self.coordinator.clear_alignment();
                self.status = Some("Diff too large; limits exceeded".to_string());
            }
        }
        self.structured = structured;
        Ok(())
    }

    /// Texts shown in the input panes; JSON is shown canonicalized
    fn source_texts(&self) -> Result<(String, String)> {
        if self.granularity == Granularity::Json {
            let old = json::canonicalize(&self.inputs.old)
                .with_context(|| format!("Invalid JSON in {}", self.inputs.old_name))?;
            let new = json::canonicalize(&self.inputs.new)
                .with_context(|| format!("Invalid JSON in {}", self.inputs.new_name))?;
            Ok((old, new))
        } else {
            Ok((self.inputs.old.clone(), self.inputs.new.clone()))
        }
    }

    /// Switch granularity, keeping the old one if the diff fails
    pub fn set_granularity(&mut self, granularity: Granularity) {
        if self.is_fixed() {
            self.status = Some("Granularity is fixed by the loaded change list".to_string());
            return;
        }
        let previous = self.granularity;
        self.granularity = granularity;
        if let Err(err) = self.recompute() {
            log::debug!("granularity {granularity} rejected: {err:#}");
            self.granularity = previous;
            if let Err(err) = self.recompute() {
                log::warn!("failed to restore {previous} diff: {err:#}");
            }
            self.status = Some(format!("{err:#}"));
        }
    }

    pub fn cycle_granularity(&mut self) {
        self.set_granularity(self.granularity.cycle());
    }

    /// Toggle the structured JSON view
    pub fn toggle_view(&mut self) {
        if self.granularity != Granularity::Json {
            self.status = Some("Structured view needs json granularity".to_string());
            return;
        }
        let next = match self.view() {
            ViewKind::Text => ViewKind::Structured,
            ViewKind::Structured => ViewKind::Text,
        };
        self.view.set(next);
        if let Err(err) = self.recompute() {
            self.status = Some(format!("{err:#}"));
        }
    }

    pub fn is_collapsed(&self, path: &str) -> bool {
        self.collapsed.contains(path)
    }

    /// Collapse or expand the container at the center of the result pane,
    /// or the innermost container holding the leaf there
    pub fn toggle_node(&mut self) {
        let Some(rows) = &self.structured else {
            self.status = Some("Folding needs the structured view".to_string());
            return;
        };
        let result = self.coordinator.pane(PaneId::Result);
        let center = result.first_row() + usize::from(result.height()) / 2;
        let Some(line) = result
            .rows()
            .get(center)
            .or_else(|| result.rows().last())
            .map(|row| row.line)
        else {
            return;
        };
        let Some(path) = container_at(rows, line) else {
            return;
        };
        if !self.collapsed.remove(&path) {
            self.collapsed.insert(path);
        }
        self.refold();
    }

    /// Expand everything if any container is collapsed, else collapse all
    /// containers below the root
    pub fn toggle_expand_all(&mut self) {
        if self.structured.is_none() {
            self.status = Some("Folding needs the structured view".to_string());
            return;
        }
        if self.collapsed.is_empty() {
            match json::structured_rows(&self.inputs.old, &self.inputs.new) {
                Ok(rows) => {
                    self.collapsed = rows
                        .into_iter()
                        .filter(|r| r.is_container() && r.depth > 0)
                        .map(|r| r.path)
                        .collect();
                }
                Err(err) => {
                    self.status = Some(format!("{err}"));
                    return;
                }
            }
        } else {
            self.collapsed.clear();
        }
        self.refold();
    }

    fn refold(&mut self) {
        if let Err(err) = self.recompute() {
            self.status = Some(format!("{err:#}"));
        }
    }

    pub fn set_line_wrap(&mut self, wrap: bool) {
        self.line_wrap = wrap;
        for id in PaneId::ALL {
            self.coordinator.pane_mut(id).set_wrap(wrap);
        }
    }

    pub fn toggle_line_wrap(&mut self) {
        self.set_line_wrap(!self.line_wrap);
    }

    pub fn toggle_line_numbers(&mut self) {
        self.line_numbers = !self.line_numbers;
    }

    pub fn toggle_sync(&mut self) {
        let enabled = !self.coordinator.config().enabled;
        self.coordinator.set_enabled(enabled);
        self.status = Some(if enabled { "Sync on" } else { "Sync off" }.to_string());
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn focus_next(&mut self) {
        self.focus = match self.focus {
            PaneId::Old => PaneId::New,
            PaneId::New => PaneId::Result,
            PaneId::Result => PaneId::Old,
        };
    }

    pub fn focus_prev(&mut self) {
        self.focus = match self.focus {
            PaneId::Old => PaneId::Result,
            PaneId::New => PaneId::Old,
            PaneId::Result => PaneId::New,
        };
    }

    /// User scroll of `pane` by `delta` rows
    pub fn scroll_pane(&mut self, pane: PaneId, delta: f64) {
        if self.coordinator.pane_mut(pane).scroll_by(delta) {
            self.coordinator.on_scroll(pane);
        }
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll_pane(self.focus, rows as f64);
    }

    pub fn scroll_up(&mut self, rows: usize) {
        self.scroll_pane(self.focus, -(rows as f64));
    }

    pub fn scroll_half_page_down(&mut self) {
        let half = self.half_page();
        self.scroll_down(half);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half = self.half_page();
        self.scroll_up(half);
    }

    pub fn scroll_page_down(&mut self) {
        let page = self.page();
        self.scroll_down(page);
    }

    pub fn scroll_page_up(&mut self) {
        let page = self.page();
        self.scroll_up(page);
    }

    pub fn goto_start(&mut self) {
        if self.coordinator.pane_mut(self.focus).scroll_to(0.0) {
            self.coordinator.on_scroll(self.focus);
        }
    }

    pub fn goto_end(&mut self) {
        if self.coordinator.pane_mut(self.focus).scroll_to(f64::MAX) {
            self.coordinator.on_scroll(self.focus);
        }
    }

    fn page(&self) -> usize {
        (self.coordinator.pane(self.focus).height() as usize).max(1)
    }

    fn half_page(&self) -> usize {
        (self.page() / 2).max(1)
    }

    /// Pane drawn at the given screen cell
    pub fn pane_at(&self, column: u16, row: u16) -> Option<PaneId> {
        let position = Position::new(column, row);
        PaneId::ALL
            .into_iter()
            .find(|id| self.pane_areas[id.index()].contains(position))
    }

    /// Mouse wheel over a pane scrolls it and moves focus there
    pub fn mouse_scroll(&mut self, column: u16, row: u16, delta: f64) {
        if let Some(pane) = self.pane_at(column, row) {
            self.focus = pane;
            self.scroll_pane(pane, delta);
        }
    }

    /// Advance one frame: run the sync, then report the panes it moved
    pub fn tick(&mut self, now: Instant) {
        self.coordinator.on_frame(now);
        for id in PaneId::ALL {
            if self.coordinator.pane_mut(id).take_moved() {
                self.coordinator.on_scroll(id);
            }
        }
    }

    /// Added and removed token counts of the current diff
    pub fn stats(&self) -> (usize, usize) {
        self.coordinator
            .changes()
            .map(ChangeList::stats)
            .unwrap_or((0, 0))
    }
}

/// Path of the container on `line`, or of the nearest container above it
/// that holds it
fn container_at(rows: &[StructuredRow], line: usize) -> Option<String> {
    let row = rows.get(line)?;
    if row.is_container() {
        return Some(row.path.clone());
    }
    rows[..line]
        .iter()
        .rev()
        .find(|r| r.is_container() && r.depth < row.depth)
        .map(|r| r.path.clone())
}

/// One row per structured node, as shown in the result pane
pub fn structured_text(rows: &[StructuredRow]) -> String {
    let lines: Vec<String> = rows.iter().map(structured_line).collect();
    lines.join("\n")
}

pub fn structured_line(row: &StructuredRow) -> String {
    let indent = "  ".repeat(row.depth);
    let key = if row.key.is_empty() {
        String::new()
    } else {
        format!("{}: ", row.key)
    };
    match &row.old_text {
        Some(old) => format!("{indent}{key}{old} -> {}", row.text),
        None => format!("{indent}{key}{}", row.text),
    }
}
