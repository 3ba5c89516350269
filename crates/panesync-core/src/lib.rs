//! panesync-core - alignment and scroll synchronization for three-pane diffs
//!
//! A diff is shown three times: the old text, the new text, and a rendered
//! result that interleaves both. This crate diffs the inputs into a
//! [`ChangeList`], aligns every change unit across the three texts with
//! [`AlignmentBuilder`], and keeps the panes looking at the same content
//! with [`ScrollCoordinator`].
//!
//! ```
//! use panesync_core::{AlignmentBuilder, DiffEngine, Granularity, ViewKind};
//!
//! let old = "a\nb\nc\n";
//! let new = "a\nB\nc\n";
//! let changes = DiffEngine::new().diff(old, new).unwrap().unwrap();
//! let table =
//!     AlignmentBuilder::build(&changes, old, new, Granularity::Line, ViewKind::Text).unwrap();
//! // "b" removed then "B" added: rendered line 2 is the new line 1
//! let target = table.line_target(2).unwrap();
//! assert_eq!(target.new_line, Some(1));
//! ```

pub mod align;
pub mod change;
pub mod coordinator;
pub mod diff;
pub mod json;
pub mod pane;
pub mod patch;
pub mod position;
pub mod state;
pub mod tokenize;

pub use align::{
    AlignmentBuilder, AlignmentEntry, AlignmentTable, LineLookupTable, LineTarget, Side, ViewKind,
};
pub use change::{ChangeKind, ChangeList, ChangeListError, ChangeUnit};
pub use coordinator::{Panes, ScrollCoordinator};
pub use diff::{DiffAlgorithm, DiffEngine, DiffError};
pub use json::{NodeChange, StructuredRow};
pub use pane::{GeometryError, Pane, PaneId, TextLayout, Viewport, DEFAULT_LINE_HEIGHT};
pub use position::{PositionResolver, ResolveMethod, ResolvedPosition};
pub use state::{SyncConfig, SyncMethod, SyncOutcome, SyncPhase, SyncState, Transition};
pub use tokenize::Granularity;
