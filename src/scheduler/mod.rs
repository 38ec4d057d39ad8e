//! Coordinator-side job state.
//!
//! - [`JobQueue`]: the pending FIFO and the leased set, plain data with
//!   `&mut self` operations
//! - [`JobStore`]: the shared handle that serialises every operation on a
//!   [`JobQueue`] behind one lock

pub mod job;
pub mod queue;
pub mod store;

pub use job::{Job, JobId, JobStatus};
pub use queue::{JobQueue, QueueStats, ReportOutcome};
pub use store::JobStore;
