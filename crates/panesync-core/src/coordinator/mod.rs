//! Scroll synchronization between the old, new and result panes
//!
//! The coordinator owns the three panes, the current change list and its
//! alignment table. Hosts report every scroll event with
//! [`ScrollCoordinator::on_scroll`] and call [`ScrollCoordinator::on_frame`]
//! once per paint frame; the coordinator then positions the other panes.
//!
//! Programmatic scrolls come back as scroll events too. They are ignored
//! for a short window after each sync ([`SyncConfig::echo_window_ms`]),
//! which keeps the panes from chasing each other.

use crate::align::{AlignmentBuilder, AlignmentEntry, AlignmentTable, Side, ViewKind};
use crate::change::ChangeList;
use crate::pane::{Pane, PaneId};
use crate::position::{PositionResolver, ResolvedPosition};
use crate::state::{
    SyncConfig, SyncMethod, SyncOutcome, SyncPhase, SyncState, Transition, TransitionLog,
};
use crate::tokenize::Granularity;
use std::ops::Range;
use std::time::Instant;

#[cfg(test)]
mod tests;

/// The three panes, addressable by [`PaneId`]
#[derive(Debug, Clone, Default)]
pub struct Panes<P> {
    pub old: P,
    pub new: P,
    pub result: P,
}

impl<P> Panes<P> {
    pub fn new(old: P, new: P, result: P) -> Self {
        Self { old, new, result }
    }

    pub fn get(&self, id: PaneId) -> &P {
        match id {
            PaneId::Old => &self.old,
            PaneId::New => &self.new,
            PaneId::Result => &self.result,
        }
    }

    pub fn get_mut(&mut self, id: PaneId) -> &mut P {
        match id {
            PaneId::Old => &mut self.old,
            PaneId::New => &mut self.new,
            PaneId::Result => &mut self.result,
        }
    }
}

/// Where a target pane should be centered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Line(usize),
    Char(usize),
}

pub struct ScrollCoordinator<P: Pane> {
    panes: Panes<P>,
    /// Reports whether the result pane shows text or a tree
    view_mode: Box<dyn Fn() -> ViewKind>,
    config: SyncConfig,
    changes: Option<ChangeList>,
    alignment: Option<AlignmentTable>,
    state: SyncState,
    /// One pending request per pane; newer requests replace older ones
    pending: [bool; 3],
    transitions: TransitionLog,
    last_outcome: Option<SyncOutcome>,
}

impl<P: Pane> ScrollCoordinator<P> {
    /// Take ownership of the three panes and start listening.
    ///
    /// Until [`rebuild_alignment`](Self::rebuild_alignment) is called, panes
    /// are synced proportionally.
    pub fn init(
        old: P,
        new: P,
        result: P,
        view_mode: impl Fn() -> ViewKind + 'static,
        config: SyncConfig,
    ) -> Self {
        Self {
            panes: Panes::new(old, new, result),
            view_mode: Box::new(view_mode),
            config,
            changes: None,
            alignment: None,
            state: SyncState::default(),
            pending: [false; 3],
            transitions: TransitionLog::default(),
            last_outcome: None,
        }
    }

    /// Replace the change list and rebuild the alignment table.
    ///
    /// Call every time a new change list is rendered, and when the result
    /// view switches between text and tree.
    pub fn rebuild_alignment(
        &mut self,
        changes: ChangeList,
        old_text: &str,
        new_text: &str,
        granularity: Granularity,
    ) {
        let view = (self.view_mode)();
        self.alignment = AlignmentBuilder::build(&changes, old_text, new_text, granularity, view);
        if self.alignment.is_none() {
            log::debug!("no alignment for {granularity} in {view:?} view, using proportional sync");
        }
        self.changes = Some(changes);
    }

    /// Drop the change list and table; syncing becomes proportional
    pub fn clear_alignment(&mut self) {
        self.changes = None;
        self.alignment = None;
    }

    /// A scroll event was observed on `pane`
    pub fn on_scroll(&mut self, pane: PaneId) {
        self.pending[pane.index()] = true;
    }

    /// Service pending scroll requests for this frame.
    ///
    /// Returns the outcome of the sync cycle run in this frame, if any.
    pub fn on_frame(&mut self, now: Instant) -> Option<&SyncOutcome> {
        if self.state.expire(now) {
            self.transitions.push(Transition::Idle);
        }

        let mut ran = false;
        for id in PaneId::ALL {
            if !self.pending[id.index()] {
                continue;
            }
            match self.state.phase {
                // Still settling from this pane's last sync; retry next frame
                SyncPhase::SyncingFrom(source) if source == id => {}
                SyncPhase::SyncingFrom(source) => {
                    self.pending[id.index()] = false;
                    log::trace!("ignoring scroll on {id} while syncing from {source}");
                    self.transitions.push(Transition::Suppressed { pane: id, source });
                }
                SyncPhase::Idle => {
                    self.pending[id.index()] = false;
                    self.state.enter(id, now, self.config.echo_window());
                    self.transitions.push(Transition::Entered(id));
                    let outcome = self.sync_from(id);
                    log::trace!("synced from {id}: {:?} {:?}", outcome.method, outcome.writes);
                    self.last_outcome = Some(outcome);
                    ran = true;
                }
            }
        }

        if ran {
            self.last_outcome.as_ref()
        } else {
            None
        }
    }

    fn sync_from(&mut self, source: PaneId) -> SyncOutcome {
        if !self.config.enabled {
            return SyncOutcome {
                source,
                method: SyncMethod::Disabled,
                position: None,
                writes: Vec::new(),
            };
        }

        let aligned = self
            .alignment
            .as_ref()
            .filter(|table| !table.entries.is_empty())
            .map(|table| {
                let pane = self.panes.get(source);
                let position =
                    PositionResolver::resolve_center(source, pane, pane.viewport().scroll_top);
                (position, aligned_targets(table, source, position))
            });

        match aligned {
            Some((position, targets)) => {
                let writes = targets
                    .into_iter()
                    .filter(|(id, _)| *id != source)
                    .map(|(id, target)| self.apply(id, target))
                    .collect();
                SyncOutcome {
                    source,
                    method: SyncMethod::Aligned,
                    position: Some(position),
                    writes,
                }
            }
            None => SyncOutcome {
                source,
                method: SyncMethod::Proportional,
                position: None,
                writes: self.sync_proportional(source),
            },
        }
    }

    /// Scroll `id` so that `target` is centered
    fn apply(&mut self, id: PaneId, target: Target) -> (PaneId, f64) {
        let pane = self.panes.get_mut(id);
        let top = match target {
            Target::Line(line) => PositionResolver::target_for_line(&*pane, line),
            Target::Char(offset) => PositionResolver::target_for_char(&*pane, offset),
        };
        pane.set_scroll_top(top);
        (id, top)
    }

    /// Give the other panes the same fraction of their scroll range
    fn sync_proportional(&mut self, source: PaneId) -> Vec<(PaneId, f64)> {
        let viewport = self.panes.get(source).viewport();
        let range = viewport.scroll_range();
        if range <= 0.0 {
            return Vec::new();
        }
        let fraction = (viewport.scroll_top / range).clamp(0.0, 1.0);

        let mut writes = Vec::with_capacity(2);
        for id in source.others() {
            let pane = self.panes.get_mut(id);
            let target_range = pane.viewport().scroll_range();
            if target_range > 0.0 {
                let top = fraction * target_range;
                pane.set_scroll_top(top);
                writes.push((id, top));
            }
        }
        writes
    }

    pub fn pane(&self, id: PaneId) -> &P {
        self.panes.get(id)
    }

    pub fn pane_mut(&mut self, id: PaneId) -> &mut P {
        self.panes.get_mut(id)
    }

    pub fn panes(&self) -> &Panes<P> {
        &self.panes
    }

    /// Current change list, if one was rendered
    pub fn changes(&self) -> Option<&ChangeList> {
        self.changes.as_ref()
    }

    /// Current alignment table; `None` means proportional sync
    pub fn alignment(&self) -> Option<&AlignmentTable> {
        self.alignment.as_ref()
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn is_syncing(&self) -> bool {
        self.state.is_syncing()
    }

    pub fn has_pending(&self, pane: PaneId) -> bool {
        self.pending[pane.index()]
    }

    pub fn transitions(&self) -> &TransitionLog {
        &self.transitions
    }

    pub fn last_outcome(&self) -> Option<&SyncOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }
}

/// Positions in the other two panes matching `position` in `source`
fn aligned_targets(
    table: &AlignmentTable,
    source: PaneId,
    position: ResolvedPosition,
) -> Vec<(PaneId, Target)> {
    let mut targets: Vec<(PaneId, Target)> = Vec::with_capacity(2);
    match source.side() {
        None if table.is_line_based() => {
            if let Some(target) = table.line_target(position.line) {
                targets.extend(target.old_line.map(|l| (PaneId::Old, Target::Line(l))));
                targets.extend(target.new_line.map(|l| (PaneId::New, Target::Line(l))));
            }
        }
        None => {
            if let Some(entry) = table.entry_at_result_char(position.char_offset) {
                for side in [Side::Old, Side::New] {
                    if let Some(range) = entry.source(side) {
                        let offset = map_offset(&entry.result, range, position.char_offset);
                        targets.push((side.into(), Target::Char(offset)));
                    }
                }
            }
        }
        Some(side) if table.is_line_based() => {
            if let Some(entry) = table.entry_at_source_line(side, position.line) {
                if let Some(result_line) = entry.result_line_for(side, position.line) {
                    targets.push((PaneId::Result, Target::Line(result_line)));
                    if let Some(line) = entry.line_in(other(side), result_line) {
                        targets.push((other(side).into(), Target::Line(line)));
                    }
                }
            }
        }
        Some(side) => {
            if let Some(entry) = table.entry_at_source_char(side, position.char_offset) {
                targets.extend(char_targets(entry, side, position.char_offset));
            }
        }
    }
    targets
}

fn char_targets(entry: &AlignmentEntry, side: Side, offset: usize) -> Vec<(PaneId, Target)> {
    let Some(source) = entry.source(side) else {
        return Vec::new();
    };
    let result = map_offset(source, &entry.result, offset);
    let mut targets = vec![(PaneId::Result, Target::Char(result))];
    if let Some(range) = entry.source(other(side)) {
        targets.push((other(side).into(), Target::Char(map_offset(source, range, offset))));
    }
    targets
}

fn other(side: Side) -> Side {
    match side {
        Side::Old => Side::New,
        Side::New => Side::Old,
    }
}

/// Same relative offset in `to` as `pos` has in `from`, clamped into `to`
fn map_offset(from: &Range<usize>, to: &Range<usize>, pos: usize) -> usize {
    let relative = pos.saturating_sub(from.start);
    to.start + relative.min(to.len().saturating_sub(1))
}
