//! Background jobs: recovery, parse and export with bounded retries
//!
//! A job moves `pending → processing → completed | error`. A failed attempt
//! re-enters `processing` after a linear backoff until the retry budget is
//! spent. Recovery jobs carry a [`Continuation`] that enqueues a parse of the
//! same source once the repair succeeds.

pub mod orchestrator;
pub mod recovery;
pub mod retry;
pub mod stages;
pub mod store;
pub mod types;

pub use orchestrator::Orchestrator;
pub use recovery::RepairTool;
pub use retry::RetryPolicy;
pub use stages::{PipelineRunner, StageRunner};
pub use store::JobStore;
pub use types::*;
