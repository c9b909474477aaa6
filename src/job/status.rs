//! Job status snapshots and the poller that fetches them

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::JobError;
use crate::api::{MixClient, RequestBody, constants, response};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Submitted,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "submitted",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "submitted" => Ok(JobStatus::Submitted),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(s.to_string()),
        }
    }
}

/// Identity of a job on the platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub project_id: u64,
    pub job_id: String,
}

impl JobDescriptor {
    pub fn new(project_id: u64, job_id: impl Into<String>) -> Self {
        Self {
            project_id,
            job_id: job_id.into(),
        }
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project {} job {}", self.project_id, self.job_id)
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// Full job metadata as returned by the platform
    pub body: Value,
}

impl JobSnapshot {
    /// Classify a job metadata payload. A payload wrapping the job in a
    /// single-element `data` array is unwrapped first.
    pub fn from_payload(job: &JobDescriptor, payload: Value) -> Result<Self, JobError> {
        let body = response::unwrap_data(payload);
        if body.is_null() {
            return Err(JobError::JobNotFound { job: job.clone() });
        }

        let status = match body.get("status") {
            Some(Value::String(status)) => status,
            Some(other) => {
                return Err(JobError::MalformedResponse {
                    job: job.clone(),
                    detail: format!("status is not a string: {}", other),
                });
            }
            None => {
                return Err(JobError::MalformedResponse {
                    job: job.clone(),
                    detail: "missing status field".to_string(),
                });
            }
        };

        let status = status
            .parse::<JobStatus>()
            .map_err(|status| JobError::ProtocolError {
                job: job.clone(),
                status,
            })?;

        Ok(Self { status, body })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Completed
    }

    pub fn is_failure(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

/// Source of job status snapshots
#[async_trait]
pub trait JobStatusPoller: Send + Sync {
    /// Fetch the current status of `job`. Every call is a fresh request.
    async fn poll(&self, job: &JobDescriptor) -> Result<JobSnapshot, JobError>;
}

/// Polls the Mix job status endpoint
pub struct ApiJobPoller {
    client: Arc<MixClient>,
}

impl ApiJobPoller {
    pub fn new(client: Arc<MixClient>) -> Self {
        Self { client }
    }

    /// Metadata of every job in the project
    pub async fn list(&self, project_id: u64) -> Result<Value, JobError> {
        let payload = self
            .client
            .get_json(&constants::jobs_endpoint(project_id))
            .await?;
        Ok(match payload {
            Value::Object(mut map) => map.remove("data").unwrap_or(Value::Object(map)),
            other => other,
        })
    }
}

#[async_trait]
impl JobStatusPoller for ApiJobPoller {
    async fn poll(&self, job: &JobDescriptor) -> Result<JobSnapshot, JobError> {
        let endpoint = constants::job_endpoint(job.project_id, &job.job_id);
        // A failed job reports its errors in the payload; that is a status, not a request error.
        let payload = self
            .client
            .request(Method::GET, &endpoint, &RequestBody::Empty, false)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    JobError::JobNotFound { job: job.clone() }
                } else {
                    JobError::Api(e)
                }
            })?;

        let snapshot = JobSnapshot::from_payload(job, payload)?;
        debug!("{} is {}", job, snapshot.status);
        Ok(snapshot)
    }
}
