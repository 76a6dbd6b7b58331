//! Session orchestration modules.
//!
//! Covers the pre-flight executable check, service launching, liveness
//! probing, teardown, and the runner that sequences them.

pub mod backend;
pub mod launcher;
pub mod lifecycle;
pub mod os_process;
pub mod prereq;
pub mod prober;
pub mod runner;
pub mod session;

pub use runner::{Orchestrator, SessionReport};
