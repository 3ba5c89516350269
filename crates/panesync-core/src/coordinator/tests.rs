use super::*;
use crate::change::ChangeUnit;
use crate::diff::DiffEngine;
use crate::pane::Viewport;
use crate::position::LineStarts;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

const FRAME: Duration = Duration::from_millis(16);

/// Host-side pane with one row per line
struct TestPane {
    text: String,
    viewport: Viewport,
    /// Set when a programmatic scroll moved the pane
    moved: bool,
}

impl TestPane {
    fn new(text: &str) -> Self {
        let lines = LineStarts::new(text).line_count();
        Self {
            text: text.to_string(),
            viewport: Viewport {
                scroll_top: 0.0,
                client_height: 10.0,
                scroll_height: lines as f64,
            },
            moved: false,
        }
    }

    fn sized(scroll_height: f64) -> Self {
        Self {
            text: String::new(),
            viewport: Viewport {
                scroll_top: 0.0,
                client_height: 10.0,
                scroll_height,
            },
            moved: false,
        }
    }
}

impl Pane for TestPane {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_scroll_top(&mut self, top: f64) {
        if top != self.viewport.scroll_top {
            self.moved = true;
        }
        self.viewport.scroll_top = top;
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn line_height(&self) -> Option<f64> {
        Some(1.0)
    }
}

/// 100 old lines; line 50 rewritten, five lines inserted after line 70
fn fixture() -> ChangeList {
    let block = |range: std::ops::Range<usize>| -> String {
        range.map(|i| format!("line {i}\n")).collect()
    };
    let inserted: String = (0..5).map(|i| format!("extra {i}\n")).collect();
    ChangeList::new(vec![
        ChangeUnit::unchanged(block(0..50)),
        ChangeUnit::removed("line 50\n"),
        ChangeUnit::added("changed 50\n"),
        ChangeUnit::unchanged(block(51..71)),
        ChangeUnit::added(inserted),
        ChangeUnit::unchanged(block(71..100)),
    ])
}

fn text_view() -> impl Fn() -> ViewKind {
    || ViewKind::Text
}

fn coordinator(changes: Option<ChangeList>, granularity: Granularity) -> ScrollCoordinator<TestPane> {
    let changes = changes.unwrap_or_else(fixture);
    let old = changes.old_text();
    let new = changes.new_text();
    let mut coord = ScrollCoordinator::init(
        TestPane::new(&old),
        TestPane::new(&new),
        TestPane::new(&changes.result_text()),
        text_view(),
        SyncConfig::default(),
    );
    coord.rebuild_alignment(changes, &old, &new, granularity);
    coord
}

fn user_scroll(coord: &mut ScrollCoordinator<TestPane>, id: PaneId, top: f64) {
    coord.pane_mut(id).viewport.scroll_top = top;
    coord.on_scroll(id);
}

/// Report programmatic scrolls back as scroll events, as a host would
fn deliver_echoes(coord: &mut ScrollCoordinator<TestPane>) -> Vec<PaneId> {
    let mut echoed = Vec::new();
    for id in PaneId::ALL {
        if coord.pane(id).moved {
            coord.pane_mut(id).moved = false;
            coord.on_scroll(id);
            echoed.push(id);
        }
    }
    echoed
}

fn top(coord: &ScrollCoordinator<TestPane>, id: PaneId) -> f64 {
    coord.pane(id).viewport.scroll_top
}

fn entered_count(coord: &ScrollCoordinator<TestPane>, id: PaneId) -> usize {
    coord
        .transitions()
        .iter()
        .filter(|t| **t == Transition::Entered(id))
        .count()
}

#[test]
fn test_result_scroll_centers_inputs_before_changes() {
    let mut coord = coordinator(None, Granularity::Line);
    // center = 25 + 5 -> result line 30 -> old/new line 30
    user_scroll(&mut coord, PaneId::Result, 25.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.method, SyncMethod::Aligned);
    assert_eq!(outcome.position.unwrap().line, 30);
    assert_eq!(top(&coord, PaneId::Old), 25.5);
    assert_eq!(top(&coord, PaneId::New), 25.5);
    assert_eq!(outcome.wrote(PaneId::Result), None, "source pane is never written");
}

#[test]
fn test_result_scroll_past_changes_offsets_inputs() {
    let mut coord = coordinator(None, Granularity::Line);
    // result line 86 = old line 80 (+1 replaced line, +5 inserted) = new line 85
    user_scroll(&mut coord, PaneId::Result, 81.0);
    coord.on_frame(Instant::now());

    assert_eq!(top(&coord, PaneId::Old), 75.5);
    assert_eq!(top(&coord, PaneId::New), 80.5);
}

#[test]
fn test_removed_line_leaves_new_pane_untouched() {
    let mut coord = coordinator(None, Granularity::Line);
    // result line 50 is the removed "line 50"
    user_scroll(&mut coord, PaneId::Result, 45.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.wrote(PaneId::Old), Some(45.5));
    assert_eq!(outcome.wrote(PaneId::New), None);
    assert_eq!(top(&coord, PaneId::New), 0.0);
}

#[test]
fn test_added_line_leaves_old_pane_untouched() {
    let mut coord = coordinator(None, Granularity::Line);
    // new line 72 sits in the inserted block (new lines 71..76)
    user_scroll(&mut coord, PaneId::New, 67.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    // inserted block renders at result lines 72..77
    assert_eq!(outcome.wrote(PaneId::Result), Some(68.5));
    assert_eq!(outcome.wrote(PaneId::Old), None);
    assert_eq!(top(&coord, PaneId::Old), 0.0);
}

#[test]
fn test_input_scroll_aligns_result_and_other_input() {
    let mut coord = coordinator(None, Granularity::Line);
    // old line 80 -> result line 86 -> new line 85
    user_scroll(&mut coord, PaneId::Old, 75.0);
    coord.on_frame(Instant::now());

    assert_eq!(top(&coord, PaneId::Result), 81.5);
    assert_eq!(top(&coord, PaneId::New), 80.5);
}

#[test]
fn test_char_granularity_maps_through_offsets() {
    let old: String = (0..40).map(|i| format!("row {i}\n")).collect();
    let new = old.replace("row 20\n", "row twenty\n");
    let changes = crate::diff::DiffEngine::new()
        .with_granularity(Granularity::Char)
        .diff(&old, &new)
        .unwrap()
        .unwrap();
    let mut coord = coordinator(Some(changes), Granularity::Char);
    assert!(coord.alignment().unwrap().lines.is_none());

    // center on old line 30, below the edit; the edit adds chars to every
    // text but no newlines
    user_scroll(&mut coord, PaneId::Old, 25.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.method, SyncMethod::Aligned);
    assert_eq!(top(&coord, PaneId::New), 25.5);
    assert_eq!(top(&coord, PaneId::Result), 25.5);
}

#[test]
fn test_no_feedback_loop() {
    let mut coord = coordinator(None, Granularity::Line);
    let t0 = Instant::now();

    user_scroll(&mut coord, PaneId::Old, 40.0);
    coord.on_frame(t0);
    assert_eq!(coord.state().phase, SyncPhase::SyncingFrom(PaneId::Old));

    let echoed = deliver_echoes(&mut coord);
    assert_eq!(echoed, vec![PaneId::New, PaneId::Result]);

    let result_top = top(&coord, PaneId::Result);
    let old_top = top(&coord, PaneId::Old);
    assert!(coord.on_frame(t0 + FRAME).is_none());

    assert!(!coord.transitions().entered(PaneId::New));
    assert!(!coord.transitions().entered(PaneId::Result));
    assert!(coord.transitions().iter().any(|t| *t
        == Transition::Suppressed {
            pane: PaneId::Result,
            source: PaneId::Old
        }));
    assert_eq!(top(&coord, PaneId::Old), old_top, "source pane not pulled back");
    assert_eq!(top(&coord, PaneId::Result), result_top);

    // Window elapses; nothing left to do
    assert!(coord.on_frame(t0 + Duration::from_millis(60)).is_none());
    assert_eq!(coord.state().phase, SyncPhase::Idle);
    assert_eq!(coord.transitions().last(), Some(&Transition::Idle));
    assert!(deliver_echoes(&mut coord).is_empty());
}

#[test]
fn test_late_echo_outside_window_starts_new_sync() {
    // Fixed-delay suppression only covers echoes that arrive in time
    let mut coord = coordinator(None, Granularity::Line);
    let t0 = Instant::now();

    user_scroll(&mut coord, PaneId::Old, 40.0);
    coord.on_frame(t0);
    deliver_echoes(&mut coord);
    coord.on_frame(t0 + Duration::from_millis(80));

    assert!(coord.transitions().entered(PaneId::New));
}

#[test]
fn test_same_source_requests_are_coalesced() {
    let mut coord = coordinator(None, Granularity::Line);
    let t0 = Instant::now();

    user_scroll(&mut coord, PaneId::Old, 10.0);
    user_scroll(&mut coord, PaneId::Old, 20.0);
    coord.on_frame(t0);
    assert_eq!(entered_count(&coord, PaneId::Old), 1, "pending request replaced");

    // Keeps scrolling inside the window: deferred, not dropped
    user_scroll(&mut coord, PaneId::Old, 75.0);
    assert!(coord.on_frame(t0 + FRAME).is_none());
    assert!(coord.has_pending(PaneId::Old));

    let outcome = coord
        .on_frame(t0 + Duration::from_millis(64))
        .cloned()
        .unwrap();
    assert_eq!(outcome.source, PaneId::Old);
    assert_eq!(entered_count(&coord, PaneId::Old), 2);
    assert_eq!(top(&coord, PaneId::New), 80.5);
}

#[test]
fn test_proportional_sync_without_alignment() {
    let mut coord = ScrollCoordinator::init(
        TestPane::sized(100.0),
        TestPane::sized(210.0),
        TestPane::sized(60.0),
        text_view(),
        SyncConfig::default(),
    );
    assert!(coord.alignment().is_none());

    // 45 of 90 -> half of each range
    user_scroll(&mut coord, PaneId::Old, 45.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.method, SyncMethod::Proportional);
    assert_eq!(top(&coord, PaneId::New), 100.0);
    assert_eq!(top(&coord, PaneId::Result), 25.0);
}

#[test]
fn test_proportional_sync_skips_unscrollable_panes() {
    let mut coord = ScrollCoordinator::init(
        TestPane::sized(5.0),
        TestPane::sized(110.0),
        TestPane::sized(8.0),
        text_view(),
        SyncConfig::default(),
    );
    user_scroll(&mut coord, PaneId::New, 100.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.writes, Vec::new());
    assert_eq!(top(&coord, PaneId::Old), 0.0);

    // Source without a scroll range writes nothing either
    let t1 = Instant::now() + Duration::from_millis(100);
    user_scroll(&mut coord, PaneId::Old, 0.0);
    let outcome = coord.on_frame(t1).cloned().unwrap();
    assert!(outcome.writes.is_empty());
}

#[test]
fn test_structured_view_falls_back_to_proportional() {
    let view = Rc::new(Cell::new(ViewKind::Structured));
    let view_fn = {
        let view = Rc::clone(&view);
        move || view.get()
    };
    let changes = fixture();
    let old = changes.old_text();
    let new = changes.new_text();
    let mut coord = ScrollCoordinator::init(
        TestPane::new(&old),
        TestPane::new(&new),
        TestPane::sized(30.0),
        view_fn,
        SyncConfig::default(),
    );

    coord.rebuild_alignment(changes.clone(), &old, &new, Granularity::Json);
    assert!(coord.alignment().is_none());
    assert!(coord.changes().is_some());

    user_scroll(&mut coord, PaneId::Old, 45.5);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();
    assert_eq!(outcome.method, SyncMethod::Proportional);
    assert_eq!(top(&coord, PaneId::Result), 10.0);

    // Switching back to the text view restores content alignment
    view.set(ViewKind::Text);
    coord.rebuild_alignment(changes, &old, &new, Granularity::Json);
    assert!(coord.alignment().is_some());
}

#[test]
fn test_disabled_sync_writes_nothing() {
    let mut coord = coordinator(None, Granularity::Line);
    coord.set_enabled(false);

    user_scroll(&mut coord, PaneId::Old, 40.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.method, SyncMethod::Disabled);
    assert!(outcome.writes.is_empty());
    assert_eq!(top(&coord, PaneId::New), 0.0);
    assert!(deliver_echoes(&mut coord).is_empty());
}

#[test]
fn test_rebuild_replaces_table_wholesale() {
    let mut coord = coordinator(None, Granularity::Line);
    assert_eq!(coord.alignment().unwrap().granularity, Granularity::Line);
    assert!(coord.alignment().unwrap().lines.is_some());

    let changes = fixture();
    let (old, new) = (changes.old_text(), changes.new_text());
    coord.rebuild_alignment(changes, &old, &new, Granularity::Word);
    let table = coord.alignment().unwrap();
    assert_eq!(table.granularity, Granularity::Word);
    assert!(table.lines.is_none());

    coord.clear_alignment();
    assert!(coord.alignment().is_none());
    assert!(coord.changes().is_none());
}

#[test]
fn test_empty_change_list_degrades_to_proportional() {
    let mut coord = ScrollCoordinator::init(
        TestPane::sized(100.0),
        TestPane::sized(100.0),
        TestPane::sized(100.0),
        text_view(),
        SyncConfig::default(),
    );
    coord.rebuild_alignment(ChangeList::default(), "", "", Granularity::Line);
    user_scroll(&mut coord, PaneId::Result, 90.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();

    assert_eq!(outcome.method, SyncMethod::Proportional);
    assert_eq!(top(&coord, PaneId::Old), 90.0);
}

/// Coordinator over the raw inputs and their unified patch
fn patch_coordinator(old: &str, new: &str) -> ScrollCoordinator<TestPane> {
    let changes = DiffEngine::new()
        .with_granularity(Granularity::Patch)
        .diff(old, new)
        .unwrap()
        .unwrap();
    let mut coord = ScrollCoordinator::init(
        TestPane::new(old),
        TestPane::new(new),
        TestPane::new(&changes.result_text()),
        text_view(),
        SyncConfig::default(),
    );
    coord.rebuild_alignment(changes, old, new, Granularity::Patch);
    coord
}

#[test]
fn test_patch_rows_map_to_input_lines() {
    let old: String = (0..100).map(|i| format!("line {i}\n")).collect();
    let new = old.replace("line 80\n", "line eighty\n");
    let mut coord = patch_coordinator(&old, &new);
    let patch = coord.pane(PaneId::Result).text().to_string();
    let added_row = patch.lines().position(|l| l == "+line eighty").unwrap();
    assert_eq!(added_row, 8, "separator, file and hunk headers, three context lines");

    // Center the added row: New lands on input line 80, Old is untouched
    user_scroll(&mut coord, PaneId::Result, added_row as f64 - 5.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();
    assert_eq!(outcome.writes, vec![(PaneId::New, 75.5)]);
    assert_eq!(top(&coord, PaneId::Old), 0.0);

    // Context row " line 79" moves both inputs
    let later = Instant::now() + Duration::from_secs(1);
    user_scroll(&mut coord, PaneId::Result, 1.0);
    let outcome = coord.on_frame(later).cloned().unwrap();
    assert_eq!(
        outcome.writes,
        vec![(PaneId::Old, 74.5), (PaneId::New, 74.5)]
    );
}

#[test]
fn test_input_scroll_centers_patch_row() {
    let old: String = (0..100).map(|i| format!("line {i}\n")).collect();
    let new = old.replace("line 80\n", "line eighty\n");
    let mut coord = patch_coordinator(&old, &new);

    // Old centered on line 80 -> the "-line 80" row (row 7)
    user_scroll(&mut coord, PaneId::Old, 75.0);
    let outcome = coord.on_frame(Instant::now()).cloned().unwrap();
    assert_eq!(outcome.writes, vec![(PaneId::Result, 2.5)]);
    assert_eq!(top(&coord, PaneId::New), 0.0);
}
