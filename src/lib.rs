//! Library root for the `lifelog` crate
//! Event log storage engine for browsing activity: admission with
//! deduplication, a bounded newest-first log, age-based retention and
//! aggregate queries over an abstract key/value backend.

// Core error handling
pub mod errors;

// Record model
pub mod event_record;

// Persistence
pub mod storage_backend;
pub mod storage_sled;
pub mod log_store;
pub mod logging_state;

// Engine
pub mod clock;
pub mod admission;
pub mod retention;
pub mod schedule;
pub mod query;
pub mod lifelog_core;

// Consumer surface
pub mod commands;
pub mod exporter;
pub mod api_errors;
pub mod web;

// Configuration & CLI
pub mod config_loader;
pub mod cli;


pub use admission::{AdmissionResult, AdmissionUnit};
pub use errors::{LifeLogError, LifeLogResult};
pub use event_record::{domain_of, EventRecord, EventSource, RawEvent};
pub use lifelog_core::LifeLogCore;
pub use log_store::BoundedLogStore;
pub use query::{DomainCount, Stats};
pub use retention::{RetentionSweeper, SweepReport};
pub use storage_backend::{MemoryBackend, StorageBackend};
pub use storage_sled::SledBackend;
