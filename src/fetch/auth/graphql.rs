use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::TokenProvider;
use crate::config::AuthCredentials;

/// The query sent as the `query` parameter. The client id goes in bare and
/// the secret in double quotes; existing endpoints expect exactly this.
pub fn auth_query(credentials: &AuthCredentials) -> String {
    format!(
        "{{auth(client_id:{},client_secret:\"{}\"){{token}}}}",
        credentials.client_id(),
        credentials.client_secret()
    )
}

pub struct GraphQlTokenProvider {
    client: reqwest::Client,
}

impl GraphQlTokenProvider {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build auth HTTP client")?;
        Ok(Self { client })
    }
}

/// Pulls `data.auth.token` out of an auth response, or `None` when any link
/// of the chain is missing or has another shape. Only a body that is not
/// JSON at all is an error.
pub fn extract_token(body: &[u8]) -> Result<Option<String>> {
    let value: Value =
        serde_json::from_slice(body).context("Auth endpoint did not return JSON")?;
    Ok(value
        .pointer("/data/auth/token")
        .and_then(Value::as_str)
        .map(str::to_string))
}

#[async_trait]
impl TokenProvider for GraphQlTokenProvider {
    async fn get_token(&self, endpoint: &Url, credentials: &AuthCredentials) -> Result<String> {
        let mut url = endpoint.clone();
        url.query_pairs_mut()
            .append_pair("query", &auth_query(credentials));
        debug!(endpoint = %endpoint, client_id = credentials.client_id(), "Requesting auth token");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to reach auth endpoint {endpoint}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Auth endpoint {endpoint} returned status {status}");
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read auth response")?;

        match extract_token(&body)? {
            Some(token) => Ok(token),
            None => {
                warn!(endpoint = %endpoint, "Auth response carried no data.auth.token");
                Ok(String::new())
            }
        }
    }
}
