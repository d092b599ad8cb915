//! Execution side of the job orchestrator.
//!
//! [`service::JobService`] is the handle callers hold. It owns a
//! [`store::JobStore`] (registry + on-disk snapshots) and a FIFO queue
//! drained by exactly one worker task, which runs the external collaborator
//! through [`runner::ProcessRunner`] while holding the process-wide
//! [`slot::ExecutionSlot`].

pub mod config;
pub mod runner;
pub mod service;
pub mod slot;
pub mod store;
pub mod supervisor;
mod worker;
