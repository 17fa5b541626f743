//! Pagination resolver for "load more" listing pages
//!
//! Listings reveal products a page at a time behind a reveal control. The
//! resolver repeatedly locates that control, activates it, and recounts the
//! product links until the listing stops growing.

mod controls;
mod resolver;
mod session;
mod state;

pub use controls::{select_control, ControlHints};
pub use resolver::{PaginationOutcome, PaginationResolver};
pub use session::{Activation, ListingSession, RevealControl};
pub use state::{
    CountStage, ExhaustReason, PaginationError, PaginationState, ResolverPhase, RunSignals,
    Terminal,
};
