//! Widget state machine
//!
//! The dropdown moves between four phases:
//!
//! ```text
//!            OPEN                 LOAD_START
//!   Closed ───────→ Open   Closed ──────────→ Loading ──LOAD_OK──→ Closed
//!      ↑              │                          │
//!      └───CLOSE──────┘                      LOAD_FAIL
//!                                                ↓
//!                         Failed ──LOAD_START──→ Loading
//! ```
//!
//! Open is only reachable from Closed, so the list can never be open while a
//! load is running or after one failed. The user-controlled disabled flag
//! lives next to the phase in [`WidgetState`].

use std::hash::Hash;

/// Event ids driving [`Phase`] transitions
pub mod dropdown_events {
    /// Show the option list (Closed -> Open)
    pub const OPEN: u32 = 31001;
    /// Hide the option list (Open -> Closed)
    pub const CLOSE: u32 = 31002;
    /// A remote load began
    pub const LOAD_START: u32 = 31003;
    /// The remote load produced option data (Loading -> Closed)
    pub const LOAD_OK: u32 = 31004;
    /// The remote load failed (Loading -> Failed)
    pub const LOAD_FAIL: u32 = 31005;
}

/// Event-driven state transitions
pub trait StateTransitions:
    Clone + Copy + PartialEq + Eq + Hash + Send + Sync + std::fmt::Debug + 'static
{
    /// Handle an event and return the new state, or None if no transition
    fn on_event(&self, event: u32) -> Option<Self>;
}

/// Interaction phase of a dropdown
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// List hidden, ready for interaction
    #[default]
    Closed,
    /// List shown
    Open,
    /// Remote options are being fetched
    Loading,
    /// The last remote load failed; only a reload leaves this phase
    Failed,
}

impl StateTransitions for Phase {
    fn on_event(&self, event: u32) -> Option<Self> {
        use dropdown_events::*;
        use Phase::*;

        match (self, event) {
            (Closed, OPEN) => Some(Open),
            (Open, CLOSE) => Some(Closed),

            // Reload replaces whatever load was running
            (Closed, LOAD_START) | (Failed, LOAD_START) | (Loading, LOAD_START) => Some(Loading),

            (Loading, LOAD_OK) => Some(Closed),
            (Loading, LOAD_FAIL) => Some(Failed),

            _ => None,
        }
    }
}

impl Phase {
    pub fn is_open(&self) -> bool {
        matches!(self, Phase::Open)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Phase::Loading)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Phase::Failed)
    }

    /// Whether the phase itself blocks interaction
    pub fn blocks_interaction(&self) -> bool {
        matches!(self, Phase::Loading | Phase::Failed)
    }
}

/// Snapshot of the observable widget state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WidgetState {
    /// Selected value, `None` when nothing is selected
    pub selected_value: Option<String>,
    /// Label of the selection; empty exactly when `selected_value` is `None`
    pub selected_text: String,
    pub phase: Phase,
    /// Current lowercase search term
    pub search_term: String,
    /// Set through `disable()`
    pub user_disabled: bool,
}

impl WidgetState {
    pub fn is_open(&self) -> bool {
        self.phase.is_open()
    }

    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    /// Disabled by the caller, while loading, or after a failed load
    pub fn is_disabled(&self) -> bool {
        self.user_disabled || self.phase.blocks_interaction()
    }

    /// Apply a transition; returns whether the phase changed
    pub fn apply(&mut self, event: u32) -> bool {
        match self.phase.on_event(event) {
            Some(next) => {
                tracing::debug!(from = ?self.phase, to = ?next, event, "dropdown transition");
                self.phase = next;
                true
            }
            None => {
                tracing::trace!(phase = ?self.phase, event, "transition ignored");
                false
            }
        }
    }
}
