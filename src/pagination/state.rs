use crate::FetchError;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Progress of one listing's pagination
///
/// Owned by a single resolver invocation. `attempts_made` only grows and never
/// passes the ceiling; `exhausted` is set once the listing stops growing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    pub listing_url: String,
    pub last_known_product_count: usize,
    pub attempts_made: u32,
    pub exhausted: bool,
}

impl PaginationState {
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self {
            listing_url: listing_url.into(),
            last_known_product_count: 0,
            attempts_made: 0,
            exhausted: false,
        }
    }
}

/// Which count a Counting step produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStage {
    Initial,
    Post,
}

/// Resolver state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverPhase {
    Idle,
    Counting(CountStage),
    Loading,
    Expanded,
    Exhausted,
    Error,
    Cancelled,
}

impl fmt::Display for ResolverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Counting(CountStage::Initial) => f.write_str("counting(initial)"),
            Self::Counting(CountStage::Post) => f.write_str("counting(post)"),
            Self::Loading => f.write_str("loading"),
            Self::Expanded => f.write_str("expanded"),
            Self::Exhausted => f.write_str("exhausted"),
            Self::Error => f.write_str("error"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Why a listing was considered fully expanded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustReason {
    /// Consecutive attempts produced no new products
    NoGrowth,
    /// The attempt ceiling was reached
    Ceiling,
    /// No reveal control remains after expansion was confirmed in this run
    NoControl,
}

/// Why a listing could not be resolved
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("No reveal control found on {url} before any expansion was confirmed")]
    ControlNotFound { url: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Terminal state of a resolver invocation
#[derive(Debug)]
pub enum Terminal {
    Exhausted(ExhaustReason),
    Error(PaginationError),
    /// The run shut down mid-listing; the listing is neither done nor failed
    Cancelled,
}

impl Terminal {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<FetchError> for Terminal {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Cancelled { .. } => Self::Cancelled,
            other => Self::Error(other.into()),
        }
    }
}

/// Run-wide pagination signals shared by every resolver invocation
#[derive(Debug, Default)]
pub struct RunSignals {
    expansion_confirmed: AtomicBool,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that some listing in the run grew after a reveal
    pub fn confirm_expansion(&self) {
        self.expansion_confirmed.store(true, Ordering::Release);
    }

    pub fn expansion_confirmed(&self) -> bool {
        self.expansion_confirmed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = PaginationState::new("https://www.samsung.com/uk/tvs/all-tvs");
        assert_eq!(state.attempts_made, 0);
        assert_eq!(state.last_known_product_count, 0);
        assert!(!state.exhausted);
    }

    #[test]
    fn test_run_signals() {
        let signals = RunSignals::new();
        assert!(!signals.expansion_confirmed());
        signals.confirm_expansion();
        assert!(signals.expansion_confirmed());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(
            ResolverPhase::Counting(CountStage::Initial).to_string(),
            "counting(initial)"
        );
        assert_eq!(ResolverPhase::Exhausted.to_string(), "exhausted");
    }

    #[test]
    fn test_cancelled_fetch_is_not_an_error() {
        let terminal = Terminal::from(FetchError::Cancelled {
            url: "https://www.samsung.com/uk/tvs/all-tvs".to_string(),
        });
        assert!(terminal.is_cancelled());
        assert!(!terminal.is_exhausted());

        let terminal = Terminal::from(FetchError::Http {
            url: "https://www.samsung.com/uk/tvs/all-tvs".to_string(),
            status: 500,
        });
        assert!(matches!(terminal, Terminal::Error(PaginationError::Fetch(_))));
    }
}
