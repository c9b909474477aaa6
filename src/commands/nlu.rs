//! NLU import and try-train workflows

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Method;
use serde_json::{Value, json};

use super::locale::to_mix_locale;
use crate::api::{RequestBody, constants, response};
use crate::api::constants::headers;
use crate::job::{JobDescriptor, WaitOptions, WaitOutcome};
use crate::session::Session;

/// Export one locale's NLU model, with all TRSX data types, to `out_trsx`.
pub async fn export_trsx(session: &Session, project_id: u64, locale: &str, out_trsx: &Path) -> Result<()> {
    let locale = to_mix_locale(locale)?;
    let endpoint = constants::nlu_export_endpoint(project_id, &locale, &constants::TRSX_DATA_TYPES);
    let trsx = session
        .client()
        .get_text(&endpoint)
        .await
        .with_context(|| format!("Failed to export {} NLU model of project {}", locale, project_id))?;

    tokio::fs::write(out_trsx, trsx)
        .await
        .with_context(|| format!("Cannot write TRSX to {}", out_trsx.display()))?;
    info!("Project {} {} NLU model exported to {}", project_id, locale, out_trsx.display());
    Ok(())
}

/// Upload a TRSX file into the project's NLU model.
///
/// When waiting, returns the import job's final metadata and fails if the job
/// failed. A response without job metadata means the import is already done.
pub async fn import_trsx(
    session: &Session,
    project_id: u64,
    src: &Path,
    locale: Option<&str>,
    wait: bool,
) -> Result<Value> {
    if !src.is_file() {
        anyhow::bail!("TRSX not found for import: {}", src.display());
    }
    let locale = locale.map(to_mix_locale).transpose()?;

    let body = RequestBody::Multipart {
        field: "file".to_string(),
        file_path: src.to_path_buf(),
        mime: headers::CONTENT_TYPE_XML,
    };
    let payload = session
        .client()
        .request(
            Method::POST,
            &constants::import_endpoint(project_id, locale.as_deref()),
            &body,
            true,
        )
        .await
        .with_context(|| format!("Error importing {} to project {}", src.display(), project_id))?;

    let meta = response::unwrap_data(payload);
    debug!("Import job meta: {}", meta);
    if !wait {
        return Ok(meta);
    }

    let Some(job_id) = meta.get("id").and_then(Value::as_str) else {
        info!("Import into project {} returned no job, nothing to wait for", project_id);
        return Ok(meta);
    };

    let job = JobDescriptor::new(project_id, job_id);
    let options = WaitOptions::default().infinite().want_snapshot(true);
    match session.waiter().wait(&job, &options).await? {
        WaitOutcome::Succeeded(snapshot) => {
            info!("Imported {} into project {}", src.display(), project_id);
            Ok(snapshot.map(|s| s.body).unwrap_or(meta))
        }
        outcome => anyhow::bail!(
            "Import job failed for project {} with {}: {}",
            project_id,
            src.display(),
            outcome.snapshot().map(|s| s.body.to_string()).unwrap_or_default()
        ),
    }
}

/// Train the run-time NLU model used for trying annotations.
///
/// Returns `{train_response}` and, when waiting, the final job metadata under
/// `job_status`.
pub async fn try_train(session: &Session, project_id: u64, locale: &str, wait: bool) -> Result<Value> {
    let locale = to_mix_locale(locale)?;
    let train_response = session
        .client()
        .request(
            Method::POST,
            &constants::try_train_endpoint(project_id, &locale),
            &RequestBody::Json(json!({})),
            true,
        )
        .await
        .with_context(|| format!("Failed to launch try-train for project {}", project_id))?;

    let Some(job_id) = train_response.get("id").and_then(Value::as_str) else {
        anyhow::bail!("No \"id\" field in try-train response: {}", train_response);
    };
    let job = JobDescriptor::new(project_id, job_id);

    if !wait {
        return Ok(json!({"train_response": train_response}));
    }

    let options = WaitOptions::default().want_snapshot(true);
    let outcome = session.waiter().wait(&job, &options).await?;
    let job_status = outcome.snapshot().map(|s| s.body.clone()).unwrap_or(Value::Null);

    Ok(json!({"train_response": train_response, "job_status": job_status}))
}
