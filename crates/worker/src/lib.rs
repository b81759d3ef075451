//! Backroom Worker library.
//!
//! Hosts the queue-drain consumers: four long-lived tasks, one per
//! notification topic, each persisting consumed messages as audit entries
//! in the entity store. The binary in `main.rs` wires configuration,
//! tracing, and the production backends around [`consumer::DrainConsumer`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod consumer;

pub use config::WorkerConfig;
pub use consumer::{DrainConsumer, AUDIT_ROUTES};
