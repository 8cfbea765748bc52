//! # repo-updater-sync
//!
//! Periodic reconciliation of a repository [`Store`] against its [`Source`]s.
//!
//! Build a [`Syncer`] and call [`Syncer::run`] to reconcile on an interval, or
//! [`Syncer::sync`] to run a single cycle.

pub mod apply;
pub mod error;
pub mod source;
pub mod stamp;
pub mod store;
pub mod syncer;

pub use error::{ApplyError, Cancelled, CycleError, SourceError, StoreError, SyncError};
pub use source::{ManifestSource, Source, Sources};
pub use store::{JsonStore, MemoryStore, Store};
pub use syncer::{system_clock, Clock, SyncReport, Syncer, MAX_INTERVAL};
