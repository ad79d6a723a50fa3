use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use super::client::{RawResponse, SourceRequest, Transport, TransportOptions};
use crate::config::TransportKind;

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// Connection-pooling client backed by [`reqwest::Client`].
pub struct PooledClient(reqwest::Client);

impl PooledClient {
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .danger_accept_invalid_hostnames(options.accept_invalid_certs)
            .build()
            .context("Failed to build pooled HTTP client")?;
        Ok(Self(client))
    }
}

/// Authenticated requests carry the `Authorization` header alone; the JSON
/// content headers are only sent on anonymous requests.
pub fn headers(req: &SourceRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    match req.authorization() {
        Some(value) => {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).context("Bearer token is not a valid header value")?,
            );
        }
        None => {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
    }
    Ok(headers)
}

#[async_trait]
impl Transport for PooledClient {
    async fn send(&self, req: &SourceRequest) -> Result<RawResponse> {
        let headers = headers(req)?;
        debug!(url = %req.url, header_count = headers.len(), "Sending pooled request");

        let resp = self
            .0
            .get(req.url.clone())
            .headers(headers)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", req.url))?;

        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read body from {}", req.url))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Pooled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(bearer: Option<&str>) -> SourceRequest {
        SourceRequest {
            url: "https://api.example.com/data".parse().unwrap(),
            bearer: bearer.map(str::to_string),
        }
    }

    #[test]
    fn test_anonymous_request_sends_json_headers() {
        let headers = headers(&request(None)).unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_authenticated_request_sends_only_authorization() {
        let headers = headers(&request(Some("tok-abc"))).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok-abc");
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        assert!(headers(&request(Some("bad\ntoken"))).is_err());
    }
}
