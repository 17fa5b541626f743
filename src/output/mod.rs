//! Output module for phase artifacts and run summaries
//!
//! This module handles:
//! - Append-only record, quarantine and failure-ledger files
//! - The discovery hand-off (`product_urls.txt` and `url_metadata.json`)
//! - Per-phase statistics printed at the end of a run

mod files;
mod metadata;
mod sink;
pub mod stats;
mod traits;

pub use files::{read_ledger, FileOutput};
pub use metadata::{read_metadata, write_metadata, UrlMetadata};
pub use sink::{write_lines, AppendLog};
pub use stats::{print_summary, PhaseCounters, PhaseSummary};
pub use traits::{OutputError, OutputHandler, OutputResult};
