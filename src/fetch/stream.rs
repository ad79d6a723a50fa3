use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

use super::client::{RawResponse, SourceRequest, Transport, TransportOptions};
use super::socket::{self, Target};
use crate::config::TransportKind;

pub const TIMEOUT: Duration = Duration::from_secs(60);

/// Writes a plain HTTP/1.0 request to a socket and reads the reply until
/// the server closes it. Error statuses are read like any other.
pub struct StreamClient {
    options: TransportOptions,
}

impl StreamClient {
    pub fn new(options: &TransportOptions) -> Self {
        Self { options: *options }
    }

    async fn exchange(&self, req: &SourceRequest) -> Result<RawResponse> {
        let target = Target::from_url(&req.url)?;
        let head = request_head(&target, req)?;

        let mut io = tokio::time::timeout(
            self.options.connect_timeout,
            socket::open(&target, self.options.accept_invalid_certs),
        )
        .await
        .map_err(|_| anyhow!("Connecting to {} timed out", target.authority))??;

        debug!(url = %req.url, "Sending stream request");
        io.write_all(head.as_bytes())
            .await
            .with_context(|| format!("Failed to write request to {}", req.url))?;
        io.flush().await?;

        let mut buf = Vec::new();
        if let Err(e) = io.read_to_end(&mut buf).await {
            // Servers that drop TLS without close_notify still delivered a
            // complete response.
            if buf.is_empty() {
                return Err(e).with_context(|| format!("Failed to read from {}", req.url));
            }
            debug!(error = %e, bytes = buf.len(), "Stream ended abruptly after data");
        }

        parse_response(&buf)
    }
}

pub fn request_head(target: &Target, req: &SourceRequest) -> Result<String> {
    let mut head = format!(
        "GET {} HTTP/1.0\r\nHost: {}\r\n",
        target.path_and_query, target.authority
    );
    head.push_str("Accept-language: en\r\n");
    head.push_str("Content-Type: application/json\r\n");
    head.push_str("Accept: application/json\r\n");
    if let Some(value) = req.authorization() {
        if value.contains(['\r', '\n']) {
            bail!("Bearer token contains a line break");
        }
        head.push_str(&format!("Authorization: {value}\r\n"));
    }
    head.push_str("Connection: close\r\n\r\n");
    Ok(head)
}

/// Splits a raw reply into status and body. The status is read from the
/// three characters at offset 9 of the first header line.
pub fn parse_response(raw: &[u8]) -> Result<RawResponse> {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .context("Response has no header terminator")?;
    let head = String::from_utf8_lossy(&raw[..split]);
    let body = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status_line = lines.next().unwrap_or_default();
    let status = status_line
        .get(9..12)
        .and_then(|code| code.parse::<u16>().ok())
        .with_context(|| format!("Malformed status line '{status_line}'"))?;

    let chunked = lines.any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.trim().eq_ignore_ascii_case("chunked")
        })
    });

    let body = if chunked {
        dechunk(body)?
    } else {
        body.to_vec()
    };

    Ok(RawResponse { status, body })
}

fn dechunk(mut rest: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    loop {
        let line_end = rest
            .windows(2)
            .position(|w| w == b"\r\n")
            .context("Truncated chunk size line")?;
        let size_line = std::str::from_utf8(&rest[..line_end])?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .with_context(|| format!("Invalid chunk size '{size_hex}'"))?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if rest.len() < size {
            bail!("Chunk of {size} bytes truncated at {}", rest.len());
        }
        out.extend_from_slice(&rest[..size]);
        rest = rest.get(size + 2..).unwrap_or_default();
    }
}

#[async_trait]
impl Transport for StreamClient {
    async fn send(&self, req: &SourceRequest) -> Result<RawResponse> {
        tokio::time::timeout(self.options.timeout, self.exchange(req))
            .await
            .map_err(|_| anyhow!("Request to {} timed out after {:?}", req.url, self.options.timeout))?
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(bearer: Option<&str>) -> SourceRequest {
        SourceRequest {
            url: "http://api.example.com:8080/data?page=2".parse().unwrap(),
            bearer: bearer.map(str::to_string),
        }
    }

    #[test]
    fn test_request_head_without_auth() {
        let req = request(None);
        let target = Target::from_url(&req.url).unwrap();
        let head = request_head(&target, &req).unwrap();
        assert!(head.starts_with("GET /data?page=2 HTTP/1.0\r\nHost: api.example.com:8080\r\n"));
        assert!(head.contains("Accept-language: en\r\n"));
        assert!(head.contains("Content-Type: application/json\r\n"));
        assert!(head.contains("Accept: application/json\r\n"));
        assert!(!head.contains("Authorization"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_request_head_with_auth_keeps_json_headers() {
        let req = request(Some("tok-abc"));
        let target = Target::from_url(&req.url).unwrap();
        let head = request_head(&target, &req).unwrap();
        assert!(head.contains("Authorization: Bearer tok-abc\r\n"));
        assert!(head.contains("Accept: application/json\r\n"));
    }

    #[test]
    fn test_request_head_rejects_header_injection() {
        let req = request(Some("tok\r\nX-Evil: 1"));
        let target = Target::from_url(&req.url).unwrap();
        assert!(request_head(&target, &req).is_err());
    }

    #[test]
    fn test_parse_response_reads_status_at_fixed_offset() {
        let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\n\r\nnot here!";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, b"not here!");
    }

    #[test]
    fn test_parse_response_empty_body() {
        let resp = parse_response(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_parse_response_decodes_chunked_body() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n{\"a\"\r\n3\r\n:1}\r\n0\r\n\r\n";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.body, b"{\"a\":1}");
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(parse_response(b"garbage").is_err());
        assert!(parse_response(b"HTTP/1.1\r\n\r\n").is_err());
    }
}
