use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::job::{JobDescriptor, JobStatusPoller, WaitOptions, WaitOutcome};
use crate::session::Session;

/// Current metadata of one job, or only its status label.
pub async fn status(session: &Session, job: &JobDescriptor, status_only: bool) -> Result<Value> {
    let snapshot = session
        .poller()
        .poll(job)
        .await
        .with_context(|| format!("Failed to get status of {}", job))?;

    Ok(if status_only {
        Value::String(snapshot.status.to_string())
    } else {
        snapshot.body
    })
}

pub async fn list(session: &Session, project_id: u64) -> Result<Value> {
    session
        .poller()
        .list(project_id)
        .await
        .with_context(|| format!("Failed to list jobs of project {}", project_id))
}

/// Options for `job wait` from its command-line flags.
pub fn wait_options(timeout_secs: Option<u64>, infinite: bool, err_on_failed: bool) -> WaitOptions {
    let mut options = WaitOptions::default()
        .raise_on_failure(err_on_failed)
        .want_snapshot(true);
    if let Some(secs) = timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }
    if infinite {
        options = options.infinite();
    }
    options
}

pub async fn wait(session: &Session, job: &JobDescriptor, options: &WaitOptions) -> Result<WaitOutcome> {
    Ok(session.waiter().wait(job, options).await?)
}
