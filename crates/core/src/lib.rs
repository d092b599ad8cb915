//! Domain logic for the generation job orchestrator.
//!
//! Everything here is pure: job records and their state machine, id
//! handling, override overlays, the per-shape config builders, sandboxed
//! path resolution, and the readiness probe. Process spawning, queueing and
//! persistence live in `ovi-worker`.

pub mod error;
pub mod job;
pub mod job_id;
pub mod overrides;
pub mod profiles;
pub mod readiness;
pub mod sandbox;
pub mod types;
