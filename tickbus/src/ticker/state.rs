//! Ticker lifecycle state

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of the ticker loop
///
/// `Idle -> Running` on start, `Running -> Stopping` on a stop request,
/// back to `Idle` once the loop has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TickerState {
    Idle,
    Running,
    Stopping,
}

impl TickerState {
    fn as_u8(self) -> u8 {
        match self {
            TickerState::Idle => 0,
            TickerState::Running => 1,
            TickerState::Stopping => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => TickerState::Running,
            2 => TickerState::Stopping,
            _ => TickerState::Idle,
        }
    }
}

impl fmt::Display for TickerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TickerState::Idle => "idle",
            TickerState::Running => "running",
            TickerState::Stopping => "stopping",
        };
        write!(f, "{}", s)
    }
}

/// Atomic cell holding a [`TickerState`]
#[derive(Debug)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: TickerState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub fn load(&self) -> TickerState {
        TickerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn store(&self, state: TickerState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Move from `from` to `to`; on mismatch returns the state actually held
    pub fn transition(&self, from: TickerState, to: TickerState) -> Result<(), TickerState> {
        self.0
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(TickerState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_succeeds_from_expected_state() {
        let state = AtomicState::new(TickerState::Idle);
        assert!(state.transition(TickerState::Idle, TickerState::Running).is_ok());
        assert_eq!(state.load(), TickerState::Running);
    }

    #[test]
    fn test_transition_reports_actual_state() {
        let state = AtomicState::new(TickerState::Running);
        assert_eq!(
            state.transition(TickerState::Idle, TickerState::Running),
            Err(TickerState::Running)
        );
        assert_eq!(state.load(), TickerState::Running);
    }

    #[test]
    fn test_display() {
        assert_eq!(TickerState::Stopping.to_string(), "stopping");
        assert_eq!(serde_json::to_string(&TickerState::Idle).unwrap(), "\"idle\"");
    }
}
