use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::client::conn::http1;
use hyper::header::{HOST, HeaderName, HeaderValue};
use hyper::{HeaderMap, Request};
use hyper_util::rt::TokioIo;
use tokio::task::JoinHandle;
use tracing::debug;

use super::client::{RawResponse, SourceRequest, Transport, TransportOptions};
use super::socket::{self, Target};
use crate::config::TransportKind;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const TIMEOUT: Duration = Duration::from_secs(15);

/// Drives a single HTTP/1 exchange over a socket it opens and owns.
pub struct RawSocketClient {
    options: TransportOptions,
}

impl RawSocketClient {
    pub fn new(options: &TransportOptions) -> Self {
        Self { options: *options }
    }

    async fn exchange(&self, req: &SourceRequest) -> Result<RawResponse> {
        let target = Target::from_url(&req.url)?;
        let io = tokio::time::timeout(
            self.options.connect_timeout,
            socket::open(&target, self.options.accept_invalid_certs),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "Connecting to {} timed out after {:?}",
                target.authority,
                self.options.connect_timeout
            )
        })??;

        let (mut sender, conn) = http1::handshake(TokioIo::new(io))
            .await
            .context("HTTP/1 handshake failed")?;
        let _conn = ConnectionTask(tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "Raw socket connection ended with error");
            }
        }));

        let lines = header_lines(req);
        let mut request = Request::get(target.path_and_query.as_str())
            .header(HOST, target.authority.as_str())
            .body(Empty::<Bytes>::new())
            .context("Failed to build raw socket request")?;
        apply_header_lines(request.headers_mut(), &lines)?;

        debug!(url = %req.url, header_lines = lines.len(), "Sending raw socket request");
        let resp = sender
            .send_request(request)
            .await
            .with_context(|| format!("Request to {} failed", req.url))?;

        let status = resp.status().as_u16();
        let body = resp
            .into_body()
            .collect()
            .await
            .with_context(|| format!("Failed to read body from {}", req.url))?
            .to_bytes();

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Aborts the connection driver when the exchange ends, on every path.
struct ConnectionTask(JoinHandle<()>);

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// The literal header list this transport sends. The third slot is an empty
/// string on anonymous requests.
pub fn header_lines(req: &SourceRequest) -> Vec<String> {
    vec![
        "Content-Type: application/json".to_string(),
        "Accept: application/json".to_string(),
        req.authorization()
            .map(|value| format!("Authorization: {value}"))
            .unwrap_or_default(),
    ]
}

/// Blank lines and lines without a `name:` prefix are skipped.
fn apply_header_lines(headers: &mut HeaderMap, lines: &[String]) -> Result<()> {
    for (name, value) in lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .filter(|(name, _)| !name.trim().is_empty())
    {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .with_context(|| format!("Invalid header name '{name}'"))?;
        let value = HeaderValue::from_str(value.trim_start())
            .with_context(|| format!("Invalid value for header '{name}'"))?;
        headers.insert(name, value);
    }
    Ok(())
}

#[async_trait]
impl Transport for RawSocketClient {
    async fn send(&self, req: &SourceRequest) -> Result<RawResponse> {
        tokio::time::timeout(self.options.timeout, self.exchange(req))
            .await
            .map_err(|_| anyhow!("Request to {} timed out after {:?}", req.url, self.options.timeout))?
    }

    fn kind(&self) -> TransportKind {
        TransportKind::RawSocket
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
    fn test_anonymous_header_lines_end_with_empty_entry() {
        let lines = header_lines(&request(None));
        assert_eq!(
            lines,
            vec![
                "Content-Type: application/json".to_string(),
                "Accept: application/json".to_string(),
                String::new(),
            ]
        );
    }

    #[test]
    fn test_authenticated_header_lines_carry_bearer() {
        let lines = header_lines(&request(Some("tok-abc")));
        assert_eq!(lines[2], "Authorization: Bearer tok-abc");
    }

    #[test]
    fn test_empty_header_line_does_not_reach_request() {
        let lines = header_lines(&request(None));
        let mut headers = HeaderMap::new();
        apply_header_lines(&mut headers, &lines).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["accept"], "application/json");
    }

    #[test]
    fn test_authorization_line_is_applied() {
        let lines = header_lines(&request(Some("tok-abc")));
        let mut headers = HeaderMap::new();
        apply_header_lines(&mut headers, &lines).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers["authorization"], "Bearer tok-abc");
    }

    #[test]
    fn test_empty_token_keeps_literal_bearer_value() {
        let lines = header_lines(&request(Some("")));
        assert_eq!(lines[2], "Authorization: Bearer ");
        let mut headers = HeaderMap::new();
        apply_header_lines(&mut headers, &lines).unwrap();
        assert_eq!(headers["authorization"], "Bearer ");
    }
}
