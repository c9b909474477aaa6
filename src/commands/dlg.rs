//! Dialog model export and import

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Method;
use serde_json::Value;

use crate::api::{RequestBody, constants, response};
use crate::job::{JobDescriptor, WaitOptions, WaitOutcome};
use crate::session::Session;

/// Write the project's dialog model export to `out_json`, content as-is.
pub async fn export_json(session: &Session, project_id: u64, out_json: &Path) -> Result<()> {
    let content = session
        .client()
        .get_text(&constants::dialog_export_endpoint(project_id))
        .await
        .with_context(|| format!("Failed to export dialog model of project {}", project_id))?;

    serde_json::from_str::<Value>(&content)
        .with_context(|| format!("Dialog export of project {} is not JSON", project_id))?;
    tokio::fs::write(out_json, content)
        .await
        .with_context(|| format!("Cannot write dialog model JSON to {}", out_json.display()))?;

    info!("Project {} dialog model exported to {}", project_id, out_json.display());
    Ok(())
}

/// Import a dialog JSON artifact, replacing the project's dialog model.
///
/// The platform usually answers only once the import is done. When it does
/// return job metadata and `wait` is set, the job is awaited without a time
/// limit and a failed job is an error.
pub async fn import_json(session: &Session, project_id: u64, src: &Path, wait: bool) -> Result<Value> {
    if !src.is_file() {
        anyhow::bail!("Dialog JSON not found for import: {}", src.display());
    }
    let content = tokio::fs::read_to_string(src)
        .await
        .with_context(|| format!("Failed to read {}", src.display()))?;
    let artifact: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON dialog artifact", src.display()))?;

    let payload = session
        .client()
        .request(
            Method::POST,
            &constants::dialog_import_endpoint(project_id),
            &RequestBody::Json(artifact),
            true,
        )
        .await
        .with_context(|| format!("Error importing {} to project {}", src.display(), project_id))?;

    let meta = response::unwrap_data(payload);
    debug!("Dialog import response: {}", meta);
    if !wait {
        return Ok(meta);
    }

    let Some(job_id) = meta.get("id").and_then(Value::as_str) else {
        info!("Dialog import returned no job, it has already completed");
        return Ok(meta);
    };

    let job = JobDescriptor::new(project_id, job_id);
    let options = WaitOptions::default().infinite().want_snapshot(true);
    match session.waiter().wait(&job, &options).await? {
        WaitOutcome::Succeeded(snapshot) => Ok(snapshot.map(|s| s.body).unwrap_or(meta)),
        outcome => anyhow::bail!(
            "Import job failed for project {} with src {}: {}",
            project_id,
            src.display(),
            outcome.snapshot().map(|s| s.body.to_string()).unwrap_or_default()
        ),
    }
}
