//! Synchronization state and settings

use crate::pane::PaneId;
use crate::position::ResolvedPosition;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Echo window used when none is configured
pub const DEFAULT_ECHO_WINDOW_MS: u64 = 50;

/// Transitions kept for inspection
const TRANSITION_LOG_LEN: usize = 64;

/// Synchronization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sync other panes when one scrolls
    pub enabled: bool,
    /// How long scroll events are ignored after a programmatic scroll.
    /// Must exceed the time the host takes to report those scrolls back.
    pub echo_window_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            echo_window_ms: DEFAULT_ECHO_WINDOW_MS,
        }
    }
}

impl SyncConfig {
    pub fn echo_window(&self) -> Duration {
        Duration::from_millis(self.echo_window_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SyncPhase {
    #[default]
    Idle,
    SyncingFrom(PaneId),
}

/// Current phase and when it ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub phase: SyncPhase,
    /// When a `SyncingFrom` phase returns to idle
    pub until: Option<Instant>,
}

impl SyncState {
    pub fn is_syncing(&self) -> bool {
        matches!(self.phase, SyncPhase::SyncingFrom(_))
    }

    /// Pane that triggered the current sync
    pub fn source(&self) -> Option<PaneId> {
        match self.phase {
            SyncPhase::SyncingFrom(pane) => Some(pane),
            SyncPhase::Idle => None,
        }
    }

    pub(crate) fn enter(&mut self, pane: PaneId, now: Instant, window: Duration) {
        self.phase = SyncPhase::SyncingFrom(pane);
        self.until = Some(now + window);
    }

    /// Return to idle once the window has elapsed; true if it did
    pub(crate) fn expire(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now >= until => {
                *self = SyncState::default();
                true
            }
            _ => false,
        }
    }
}

/// Recorded state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    /// Idle -> SyncingFrom(pane)
    Entered(PaneId),
    /// A scroll on `pane` was ignored while syncing from `source`
    Suppressed { pane: PaneId, source: PaneId },
    /// SyncingFrom -> Idle
    Idle,
}

/// Bounded log of the most recent transitions
#[derive(Debug, Clone, Default)]
pub struct TransitionLog {
    entries: VecDeque<Transition>,
}

impl TransitionLog {
    pub(crate) fn push(&mut self, transition: Transition) {
        if self.entries.len() == TRANSITION_LOG_LEN {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Transition> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True if a sync from `pane` was ever entered
    pub fn entered(&self, pane: PaneId) -> bool {
        self.entries.iter().any(|t| *t == Transition::Entered(pane))
    }
}

/// How a sync cycle positioned the other panes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMethod {
    /// Content positions through the alignment table
    Aligned,
    /// Same fraction of the scroll range
    Proportional,
    /// Sync turned off; nothing written
    Disabled,
}

/// Result of one sync cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub source: PaneId,
    pub method: SyncMethod,
    /// Center of the source pane, when content alignment was used
    pub position: Option<ResolvedPosition>,
    /// Scroll offsets written to other panes
    pub writes: Vec<(PaneId, f64)>,
}

impl SyncOutcome {
    pub fn wrote(&self, pane: PaneId) -> Option<f64> {
        self.writes.iter().find(|(id, _)| *id == pane).map(|(_, top)| *top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_expires_after_window() {
        let start = Instant::now();
        let mut state = SyncState::default();
        state.enter(PaneId::Old, start, Duration::from_millis(50));
        assert_eq!(state.source(), Some(PaneId::Old));

        assert!(!state.expire(start + Duration::from_millis(49)));
        assert!(state.is_syncing());
        assert!(state.expire(start + Duration::from_millis(50)));
        assert_eq!(state.phase, SyncPhase::Idle);
        assert_eq!(state.until, None);
    }

    #[test]
    fn test_transition_log_is_bounded() {
        let mut log = TransitionLog::default();
        for _ in 0..TRANSITION_LOG_LEN + 10 {
            log.push(Transition::Idle);
        }
        log.push(Transition::Entered(PaneId::New));
        assert_eq!(log.len(), TRANSITION_LOG_LEN);
        assert_eq!(log.last(), Some(&Transition::Entered(PaneId::New)));
        assert!(log.entered(PaneId::New));
        assert!(!log.entered(PaneId::Old));
    }

    #[test]
    fn test_config_defaults() {
        let config: SyncConfig = serde_json::from_str("{}").unwrap();
        assert!(config.enabled);
        assert_eq!(config.echo_window(), Duration::from_millis(50));
    }
}
