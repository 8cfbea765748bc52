//! repo-updater daemon runtime: config loading, tracing and the long-running
//! reconciliation loop.

pub mod config;
mod error;
pub mod paths;
mod runtime;

pub use config::{DaemonConfig, LogFormat, SourceConfig};
pub use error::{ConfigError, DaemonError};
pub use runtime::{build_syncer, init_tracing, run, run_until, start_blocking};
