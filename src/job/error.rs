use thiserror::Error;

use super::status::{JobDescriptor, JobSnapshot};
use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job not found: {job}")]
    JobNotFound { job: JobDescriptor },

    /// The status payload has no usable `status` field
    #[error("Malformed status response for {job}: {detail}")]
    MalformedResponse { job: JobDescriptor, detail: String },

    /// A status outside submitted/completed/failed
    #[error("Unexpected status '{status}' for {job}")]
    ProtocolError { job: JobDescriptor, status: String },

    #[error("Timed out after waiting {waited_secs}s for {job}")]
    WaitTimeout { job: JobDescriptor, waited_secs: u64 },

    #[error("{job} failed: {}", snapshot.body)]
    JobFailed {
        job: JobDescriptor,
        snapshot: Box<JobSnapshot>,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
