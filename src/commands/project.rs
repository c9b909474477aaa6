//! Model builds for a Mix project

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, error, info};
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::locale::to_mix_locale;
use super::{dlg, nlu};
use crate::api::{RequestBody, constants, response};
use crate::job::{JobDescriptor, JobStatus, WaitOptions, WaitOutcome};
use crate::session::Session;

pub const DEFAULT_BUILD_NOTE: &str = "Built by mix-cli";

/// Project metadata field listing the NLU training modes enabled
pub const FIELD_NLU_MODES_ENABLED: &str = "model_types_enabled";
/// Project metadata field listing the project's locales
pub const FIELD_LOCALES: &str = "languages";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Model {
    Asr,
    Nlu,
    Dialog,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Asr => "asr",
            Model::Nlu => "nlu",
            Model::Dialog => "dialog",
        }
    }

    fn default_request(&self, note: &str, nlu_mode: NluModelMode) -> Value {
        match self {
            Model::Asr | Model::Dialog => json!({"notes": note, "data_sources": []}),
            Model::Nlu => json!({
                "notes": note,
                "data_sources": [],
                "dynamic_concepts": [],
                "retrain": false,
                "settings": {"modelType": nlu_mode.as_str()}
            }),
        }
    }
}

/// NLU training mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum NluModelMode {
    #[default]
    Fast,
    Accurate,
}

impl NluModelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NluModelMode::Fast => "FAST",
            NluModelMode::Accurate => "ACCURATE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub project_id: u64,
    pub models: Vec<Model>,
    pub locale: Option<String>,
    pub nlu_mode: NluModelMode,
    pub note: Option<String>,
    pub wait: bool,
}

/// Version and final status of one model build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelBuildStatus {
    pub version: Value,
    pub status: String,
}

/// Project metadata
pub async fn get_meta(session: &Session, project_id: u64) -> Result<Value> {
    let payload = session
        .client()
        .get_json(&constants::project_endpoint(project_id))
        .await
        .with_context(|| format!("Failed to get metadata of project {}", project_id))?;
    Ok(response::unwrap_data(payload))
}

/// NLU training modes enabled for the project. `None` unless the metadata
/// holds a non-empty list of strings.
pub fn nlu_modes_enabled(meta: &Value) -> Option<Vec<&str>> {
    let modes = meta.get(FIELD_NLU_MODES_ENABLED)?.as_array()?;
    if modes.is_empty() {
        return None;
    }
    modes.iter().map(Value::as_str).collect()
}

/// Locales of the project, as listed in its metadata
pub fn project_locales(meta: &Value) -> Result<Vec<String>> {
    let locales: Vec<String> = meta
        .get(FIELD_LOCALES)
        .and_then(Value::as_array)
        .map(|langs| {
            langs
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if locales.is_empty() {
        anyhow::bail!("No \"{}\" found in project metadata: {}", FIELD_LOCALES, meta);
    }
    Ok(locales)
}

/// Request body launching builds of `models`
pub fn build_request_body(models: &[Model], note: &str, nlu_mode: NluModelMode) -> Value {
    let body: Map<String, Value> = models
        .iter()
        .map(|m| (m.as_str().to_string(), m.default_request(note, nlu_mode)))
        .collect();
    Value::Object(body)
}

/// Split a build launch response into the jobs to wait for and the models
/// whose outcome is already known.
///
/// Per-model entries may be keyed by locale. An entry with a `job_id` is a
/// running job; one with only a `status` finished already; one with neither
/// never started and counts as failed.
pub fn collect_build_jobs(
    project_id: u64,
    launch: &Value,
    locale: Option<&str>,
) -> Result<(BTreeMap<String, ModelBuildStatus>, BTreeMap<String, JobDescriptor>)> {
    let entries = launch
        .as_object()
        .with_context(|| format!("Unexpected build launch response: {}", launch))?;

    let mut statuses = BTreeMap::new();
    let mut jobs = BTreeMap::new();

    for (model, entry) in entries {
        let stat = locale.and_then(|loc| entry.get(loc)).unwrap_or(entry);
        if let Some(detail) = response::error_detail(stat) {
            anyhow::bail!("Error found in {} build response: {}", model, detail);
        }

        let version = stat.get("version").cloned().unwrap_or(json!(0));
        let status = match (stat.get("job_id").and_then(Value::as_str), stat.get("status")) {
            (Some(job_id), _) => {
                jobs.insert(model.clone(), JobDescriptor::new(project_id, job_id));
                String::new()
            }
            (None, Some(status)) => status.as_str().unwrap_or_default().to_string(),
            (None, None) => {
                error!("No build job created for project {} model {}: {}", project_id, model, stat);
                JobStatus::Failed.to_string()
            }
        };
        statuses.insert(model.clone(), ModelBuildStatus { version, status });
    }

    Ok((statuses, jobs))
}

/// Launch model builds and, unless told otherwise, wait for all of them.
pub async fn build(session: &Session, request: &BuildRequest) -> Result<Value> {
    if request.models.is_empty() {
        anyhow::bail!("No model to build");
    }
    let locale = request.locale.as_deref().map(to_mix_locale).transpose()?;
    if request.models.contains(&Model::Nlu) && locale.is_none() {
        anyhow::bail!("Must specify locale to build NLU model");
    }

    if request.nlu_mode == NluModelMode::Accurate && request.models.contains(&Model::Nlu) {
        let meta = get_meta(session, request.project_id).await?;
        let enabled = nlu_modes_enabled(&meta).unwrap_or_default();
        if !enabled.contains(&NluModelMode::Accurate.as_str()) {
            anyhow::bail!(
                "Project {} does not have {} enabled",
                request.project_id,
                NluModelMode::Accurate.as_str()
            );
        }
    }

    let mut models = request.models.clone();
    models.sort();
    models.dedup();

    let note = request.note.as_deref().unwrap_or(DEFAULT_BUILD_NOTE);
    let type_names: Vec<&str> = models.iter().map(Model::as_str).collect();
    let endpoint = constants::build_endpoint(
        request.project_id,
        &type_names,
        locale.as_deref().filter(|_| models.contains(&Model::Nlu)),
    );
    let body = RequestBody::Json(build_request_body(&models, note, request.nlu_mode));

    let payload = session
        .client()
        .request(Method::POST, &endpoint, &body, true)
        .await
        .with_context(|| format!("Failed to launch builds for project {}", request.project_id))?;
    let launch = response::unwrap_data(payload);
    info!(
        "Launched build jobs for project {} on models [{}]",
        request.project_id,
        type_names.join(",")
    );

    if !request.wait {
        return Ok(launch);
    }

    let (mut statuses, jobs) = collect_build_jobs(request.project_id, &launch, locale.as_deref())?;
    let options = WaitOptions::default().infinite();
    let outcomes = session.waiter().wait_many(&jobs, &options).await?;

    for (model, outcome) in outcomes {
        let status = match outcome {
            WaitOutcome::Succeeded(_) => JobStatus::Completed,
            WaitOutcome::Failed(_) | WaitOutcome::TimedOut(_) => JobStatus::Failed,
        };
        if let Some(entry) = statuses.get_mut(&model) {
            entry.status = status.to_string();
        }
    }

    Ok(serde_json::to_value(statuses)?)
}

/// Models to carry over from one project to another
#[derive(Debug, Clone)]
pub struct CopyRequest {
    pub src_project_id: u64,
    pub dst_project_id: u64,
    /// Locales whose NLU models are copied, every source locale when empty
    pub locales: Vec<String>,
    pub copy_nlu: bool,
    pub copy_dialog: bool,
    /// Directory for the exported artifacts, the current directory when unset
    pub workdir: Option<PathBuf>,
}

/// Copy NLU and/or dialog models by exporting them from the source project
/// and importing the artifacts into the destination.
///
/// Each NLU import job is awaited without a time limit. A failed import stops
/// the copy with the job's metadata in the error.
pub async fn copy_models(session: &Session, request: &CopyRequest) -> Result<Value> {
    if !request.copy_nlu && !request.copy_dialog {
        anyhow::bail!("Nothing to copy, choose NLU and/or dialog models");
    }
    let (src, dst) = (request.src_project_id, request.dst_project_id);
    if src == dst {
        anyhow::bail!("Source and destination project are both {}", src);
    }

    let workdir = match &request.workdir {
        Some(dir) if dir.is_dir() => dir.clone(),
        Some(dir) => anyhow::bail!("Work dir not found: {}", dir.display()),
        None => std::env::current_dir().context("Cannot resolve current directory")?,
    };
    debug!("Model copy work dir: {}", workdir.display());

    let mut nlu_locales = Vec::new();
    if request.copy_nlu {
        let locales = if request.locales.is_empty() {
            project_locales(&get_meta(session, src).await?)?
        } else {
            request.locales.clone()
        };

        for locale in locales {
            let locale = to_mix_locale(&locale)?;
            let trsx = workdir.join(format!("project-{}__NLU__{}.trsx", src, locale));
            nlu::export_trsx(session, src, &locale, &trsx).await?;
            nlu::import_trsx(session, dst, &trsx, None, true).await?;
            info!("Copied {} NLU model from project {} to {}", locale, src, dst);
            nlu_locales.push(locale);
        }
    }

    if request.copy_dialog {
        let dialog_json = workdir.join(format!("project-{}__DLG.json", src));
        dlg::export_json(session, src, &dialog_json).await?;
        dlg::import_json(session, dst, &dialog_json, true).await?;
        info!("Copied dialog model from project {} to {}", src, dst);
    }

    Ok(json!({
        "src_project_id": src,
        "dst_project_id": dst,
        "nlu_locales": nlu_locales,
        "dialog_copied": request.copy_dialog
    }))
}
