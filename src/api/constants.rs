//! API Constants and endpoint builders for the Mix REST API

/// Default Mix API host
pub const DEFAULT_API_HOST: &str = "https://mix.nuance.com";

/// Path prefix every API endpoint is mounted under
pub const DEFAULT_PATH_PREFIX: &str = "/v3";

/// Mix OAuth authorization server token endpoint
pub const DEFAULT_AUTH_URL: &str = "https://auth.crt.nuance.com/oauth2/token";

/// Lightweight authenticated endpoint used to probe token validity
pub const VERSION_ENDPOINT: &str = "/api/v2/version";

pub const USER_AGENT: &str = concat!("mix-cli/", env!("CARGO_PKG_VERSION"));

/// Standard headers for Mix requests
pub mod headers {
    pub const ACCEPT_JSON: &str = "application/json";

    pub const CONNECTION_KEEP_ALIVE: &str = "keep-alive";

    /// Content type of TRSX uploads
    pub const CONTENT_TYPE_XML: &str = "text/xml";
}

/// Join host, prefix and endpoint, tolerating missing or doubled slashes.
pub fn join_url(host: &str, prefix: &str, endpoint: &str) -> String {
    let host = host.trim_end_matches('/');
    let prefix = prefix.trim_matches('/');
    let endpoint = endpoint.trim_start_matches('/');

    if prefix.is_empty() {
        format!("{}/{}", host, endpoint)
    } else {
        format!("{}/{}/{}", host, prefix, endpoint)
    }
}

/// Status of one job
pub fn job_endpoint(project_id: u64, job_id: &str) -> String {
    format!("/api/v2/projects/{}/jobs/{}", project_id, job_id)
}

/// All jobs of a project
pub fn jobs_endpoint(project_id: u64) -> String {
    format!("/api/v2/projects/{}/jobs", project_id)
}

/// Launch model builds of the given types
pub fn build_endpoint(project_id: u64, model_types: &[&str], locale: Option<&str>) -> String {
    let mut query: Vec<String> = model_types
        .iter()
        .map(|t| format!("type={}", urlencoding::encode(t)))
        .collect();
    if let Some(locale) = locale {
        query.push(format!("locale={}", urlencoding::encode(locale)));
    }

    let base = format!("/api/v2/projects/{}/models", project_id);
    if query.is_empty() {
        base
    } else {
        format!("{}?{}", base, query.join("&"))
    }
}

/// Asynchronous TRSX import into a project
pub fn import_endpoint(project_id: u64, locale: Option<&str>) -> String {
    let mut endpoint = format!(
        "/api/v2/projects/{}/.async-import?allow_duplicate_samples=true&type=trsx",
        project_id
    );
    if let Some(locale) = locale {
        endpoint.push_str("&locale=");
        endpoint.push_str(&urlencoding::encode(locale));
    }
    endpoint
}

/// NLU try-train on the project's custom data
pub fn try_train_endpoint(project_id: u64, locale: &str) -> String {
    format!(
        "/nlu/api/v1/nlu/{}/annotations/train?sources=nuance_custom_data&locale={}",
        project_id,
        urlencoding::encode(locale)
    )
}

/// Data types included in a full TRSX export
pub const TRSX_DATA_TYPES: [&str; 3] = ["ONTOLOGY", "CONCEPT_LITERALS", "SAMPLES"];

/// Project metadata
pub fn project_endpoint(project_id: u64) -> String {
    format!("/api/v3/projects/{}", project_id)
}

/// TRSX export of one locale's NLU model
pub fn nlu_export_endpoint(project_id: u64, locale: &str, data_types: &[&str]) -> String {
    let types: Vec<String> = data_types
        .iter()
        .map(|t| format!("data_types={}", urlencoding::encode(t)))
        .collect();
    format!(
        "/api/v1/data/{}/export?type=TRSX&filename=save.trsx&{}&locale={}",
        project_id,
        types.join("&"),
        urlencoding::encode(locale)
    )
}

pub fn dialog_export_endpoint(project_id: u64) -> String {
    format!("/api/v3beta1/dialog/projects/{}/export", project_id)
}

pub fn dialog_import_endpoint(project_id: u64) -> String {
    format!("/api/v3beta1/dialog/projects/{}/import", project_id)
}
