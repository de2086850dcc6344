//! Processing pipeline components.

mod aggregate;
mod nms;
mod orchestrator;

pub use aggregate::{Detection, RunAttributes, aggregate};
pub use nms::suppress;
pub use orchestrator::{Orchestrator, RunState, RunSummary, worker_count};
