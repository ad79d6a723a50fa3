use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::config::TransportKind;

/// Status line and body of a single exchange, whatever the status was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A GET against the source, plus the bearer token when one was acquired.
///
/// Transports build their own header sets from this; the exact headers
/// differ per variant and must stay that way for wire compatibility.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub url: Url,
    pub bearer: Option<String>,
}

impl SourceRequest {
    pub fn authorization(&self) -> Option<String> {
        self.bearer.as_ref().map(|token| format!("Bearer {token}"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

/// Executes a [`SourceRequest`].
///
/// Implementations return `Ok` for every response that made it back over the
/// wire, 4xx and 5xx included. `Err` means no response was obtained.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: &SourceRequest) -> anyhow::Result<RawResponse>;

    fn kind(&self) -> TransportKind;
}
