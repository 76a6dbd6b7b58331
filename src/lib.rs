#![forbid(unsafe_code)]

//! Session supervisor for the fog anomaly-detection lab.
//!
//! Starts the lab's background services in dependency order, gates each on
//! a liveness check, runs the topology driver in the foreground, and
//! terminates everything it started when the session ends.

pub mod config;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod signals;

pub use config::SessionConfig;
pub use errors::{AppError, Result};
