pub mod error;
pub mod status;
pub mod wait;

pub use error::JobError;
pub use status::{ApiJobPoller, JobDescriptor, JobSnapshot, JobStatus, JobStatusPoller};
pub use wait::{JobWaiter, WaitOptions, WaitOutcome};
