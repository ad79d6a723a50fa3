//! Fetch orchestration.
//!
//! [`FetchService`] validates a [`FetchConfig`], acquires a bearer token when
//! the config carries complete credentials, hands the request to the selected
//! [`Transport`] and turns the raw reply into a JSON value or a typed
//! [`FetchError`]. Nothing is retried and nothing outlives the call.

mod client;
mod pooled;
mod raw_socket;
mod socket;
mod stream;
pub mod auth;

pub use auth::{GraphQlTokenProvider, TokenProvider};
pub use client::{RawResponse, SourceRequest, Transport, TransportOptions};
pub use pooled::PooledClient;
pub use raw_socket::RawSocketClient;
pub use stream::StreamClient;

use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::config::{AuthCredentials, FetchConfig, TransportKind};
use crate::error::{FetchError, Result};

/// Decoded JSON body handed back to the caller.
pub type ParsedPayload = serde_json::Value;

type Connector =
    Box<dyn Fn(TransportKind, &TransportOptions) -> anyhow::Result<Box<dyn Transport>> + Send + Sync>;

/// Per-variant timeouts, with TLS verification set by the caller.
pub fn transport_options(kind: TransportKind, accept_invalid_certs: bool) -> TransportOptions {
    let (connect_timeout, timeout) = match kind {
        TransportKind::Pooled => (pooled::TIMEOUT, pooled::TIMEOUT),
        TransportKind::RawSocket => (raw_socket::CONNECT_TIMEOUT, raw_socket::TIMEOUT),
        TransportKind::Stream => (stream::TIMEOUT, stream::TIMEOUT),
    };
    TransportOptions {
        accept_invalid_certs,
        timeout,
        connect_timeout,
    }
}

/// Builds the transport for `kind`.
pub fn connect(kind: TransportKind, options: &TransportOptions) -> anyhow::Result<Box<dyn Transport>> {
    let transport: Box<dyn Transport> = match kind {
        TransportKind::Pooled => Box::new(PooledClient::new(options)?),
        TransportKind::RawSocket => Box::new(RawSocketClient::new(options)),
        TransportKind::Stream => Box::new(StreamClient::new(options)),
    };
    Ok(transport)
}

pub struct FetchService {
    tokens: Option<Arc<dyn TokenProvider>>,
    connector: Connector,
}

impl Default for FetchService {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchService {
    pub fn new() -> Self {
        Self {
            tokens: None,
            connector: Box::new(connect),
        }
    }

    /// Replaces the default [`GraphQlTokenProvider`].
    pub fn with_token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(provider);
        self
    }

    /// Replaces [`connect`] as the way transports are built.
    pub fn with_connector<F>(mut self, connector: F) -> Self
    where
        F: Fn(TransportKind, &TransportOptions) -> anyhow::Result<Box<dyn Transport>>
            + Send
            + Sync
            + 'static,
    {
        self.connector = Box::new(connector);
        self
    }

    #[tracing::instrument(
        name = "fetch",
        skip(self, config),
        fields(transport = %config.transport(), source = config.source_url().unwrap_or_default())
    )]
    pub async fn fetch(&self, config: &FetchConfig) -> Result<ParsedPayload> {
        let source = config
            .source_url()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                FetchError::Configuration("No source URL specified. Cannot continue.".to_string())
            })?;
        let source_url = parse_url("source", source)?;

        let auth = match config.credentials().filter(|c| c.is_complete()) {
            Some(credentials) => {
                let endpoint = config
                    .auth_endpoint_url()
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| {
                        FetchError::Configuration(
                            "No auth endpoint URL specified. Cannot continue.".to_string(),
                        )
                    })?;
                Some((parse_url("auth endpoint", endpoint)?, credentials))
            }
            None => None,
        };

        let kind = config.transport();
        let options = transport_options(kind, config.accept_invalid_certs());
        let transport = (self.connector)(kind, &options)
            .map_err(|e| FetchError::unreachable(source, &e))?;

        let bearer = match auth {
            Some((endpoint, credentials)) => Some(self.acquire_token(&endpoint, credentials).await?),
            None => None,
        };

        let request = SourceRequest {
            url: source_url,
            bearer,
        };
        debug!(authenticated = request.bearer.is_some(), "Dispatching source request");

        let response = transport
            .send(&request)
            .await
            .map_err(|e| FetchError::unreachable(source, &e))?;
        debug!(status = response.status, bytes = response.body.len(), "Source responded");

        let payload = decode(source, response)?;
        info!("Fetched JSON payload");
        Ok(payload)
    }

    async fn acquire_token(&self, endpoint: &Url, credentials: &AuthCredentials) -> Result<String> {
        let token = match &self.tokens {
            Some(provider) => provider.get_token(endpoint, credentials).await,
            None => {
                let provider = GraphQlTokenProvider::new().map_err(FetchError::Auth)?;
                provider.get_token(endpoint, credentials).await
            }
        };
        token.map_err(FetchError::Auth)
    }
}

/// Fetches with a default [`FetchService`].
pub async fn fetch(config: &FetchConfig) -> Result<ParsedPayload> {
    FetchService::new().fetch(config).await
}

/// Checks status, emptiness and JSON syntax, in that order.
pub fn decode(source: &str, response: RawResponse) -> Result<ParsedPayload> {
    if !response.is_ok() {
        return Err(FetchError::unexpected_status(source, response.status));
    }
    if response.body.is_empty() {
        return Err(FetchError::EmptyResponse {
            url: source.to_string(),
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| FetchError::InvalidPayload {
        url: source.to_string(),
        source: e,
    })
}

fn parse_url(what: &str, raw: &str) -> Result<Url> {
    Url::parse(raw.trim())
        .map_err(|e| FetchError::Configuration(format!("Invalid {what} URL '{raw}': {e}")))
}
