//! Evidence Core - Shared runtime plumbing for the evidence tools
//!
//! Logging and terminal progress reporting used by the provenance
//! store and the `evidence` CLI.

pub mod logging;
pub mod progress;

// Re-exports for convenience
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, fmt_bytes, fmt_num};
