//! Host-side pane abstraction
//!
//! A pane is any independently scrollable view of text. Hosts implement
//! [`Pane`] for their widgets; panes that can answer exact layout queries
//! also expose a [`TextLayout`].

use crate::align::Side;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Used when a pane cannot report its line height
pub const DEFAULT_LINE_HEIGHT: f64 = 20.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Layout query unsupported")]
    Unsupported,
    #[error("Position {y} is outside the laid out text (height {height})")]
    OutOfBounds { y: f64, height: f64 },
    #[error("Layout is stale")]
    Stale,
}

/// The three synchronized panes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneId {
    Old,
    New,
    Result,
}

impl PaneId {
    pub const ALL: [PaneId; 3] = [PaneId::Old, PaneId::New, PaneId::Result];

    pub fn index(self) -> usize {
        match self {
            PaneId::Old => 0,
            PaneId::New => 1,
            PaneId::Result => 2,
        }
    }

    /// Source text shown by an input pane
    pub fn side(self) -> Option<Side> {
        match self {
            PaneId::Old => Some(Side::Old),
            PaneId::New => Some(Side::New),
            PaneId::Result => None,
        }
    }

    /// The two panes other than `self`
    pub fn others(self) -> [PaneId; 2] {
        match self {
            PaneId::Old => [PaneId::New, PaneId::Result],
            PaneId::New => [PaneId::Old, PaneId::Result],
            PaneId::Result => [PaneId::Old, PaneId::New],
        }
    }
}

impl From<Side> for PaneId {
    fn from(side: Side) -> Self {
        match side {
            Side::Old => PaneId::Old,
            Side::New => PaneId::New,
        }
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneId::Old => f.write_str("old"),
            PaneId::New => f.write_str("new"),
            PaneId::Result => f.write_str("result"),
        }
    }
}

/// Scroll metrics of a pane, in the host's vertical unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Viewport {
    pub scroll_top: f64,
    /// Visible height
    pub client_height: f64,
    /// Full content height
    pub scroll_height: f64,
}

impl Viewport {
    /// Largest meaningful `scroll_top`
    pub fn scroll_range(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    pub fn center(&self) -> f64 {
        self.scroll_top + self.client_height / 2.0
    }

    pub fn clamp(&self, top: f64) -> f64 {
        top.clamp(0.0, self.scroll_range())
    }
}

/// Precise text geometry, when the host can lay text out
pub trait TextLayout {
    /// Char offset of the text at vertical position `y` (content coordinates)
    fn offset_at_y(&self, y: f64) -> Result<usize, GeometryError>;

    /// Top of the row holding `line` (content coordinates)
    fn line_top(&self, line: usize) -> Result<f64, GeometryError>;

    /// Top of the row holding char `offset`, accounting for wrapping
    fn offset_top(&self, offset: usize) -> Result<f64, GeometryError>;
}

/// A scrollable view of text driven by the coordinator
pub trait Pane {
    fn viewport(&self) -> Viewport;

    /// Programmatic scroll; hosts report the resulting scroll event back
    /// through `ScrollCoordinator::on_scroll` like any other.
    fn set_scroll_top(&mut self, top: f64);

    /// The text the pane displays
    fn text(&self) -> &str;

    /// Rendered line height, if known
    fn line_height(&self) -> Option<f64> {
        None
    }

    /// Exact layout queries; `None` when unsupported
    fn layout(&self) -> Option<&dyn TextLayout> {
        None
    }
}
