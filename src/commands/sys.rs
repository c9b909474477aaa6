use anyhow::{Context, Result};
use serde_json::Value;

use crate::api::{MixClient, constants};

/// Version information of the Mix platform. Also confirms the token is accepted.
pub async fn version(client: &MixClient) -> Result<Value> {
    client
        .get_json(constants::VERSION_ENDPOINT)
        .await
        .context("Failed to query Mix version")
}
