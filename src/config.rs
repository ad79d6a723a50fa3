//! Immutable inputs for a single fetch.
//!
//! A [`FetchConfig`] is assembled once through [`FetchConfig::builder`] and
//! never mutated afterwards, so one value can drive any number of fetches.

use std::fmt;
use std::str::FromStr;

use crate::error::FetchError;

/// Which network transport issues the source request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransportKind {
    /// Connection-pooling client with a 10 second total timeout.
    #[default]
    Pooled,
    /// HTTP/1 exchange over a socket the transport opens itself.
    RawSocket,
    /// Plain request written to a stream and read back until EOF.
    Stream,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Pooled => "pooled",
            TransportKind::RawSocket => "raw_socket",
            TransportKind::Stream => "stream",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = FetchError;

    /// Accepts the canonical names as well as the legacy client names
    /// (`guzzle`, `curl`, `file_get_contents`) still found in deployments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pooled" | "guzzle" => Ok(TransportKind::Pooled),
            "raw_socket" | "raw-socket" | "curl" => Ok(TransportKind::RawSocket),
            "stream" | "file_get_contents" => Ok(TransportKind::Stream),
            other => Err(FetchError::Configuration(format!(
                "Unknown transport kind '{other}'"
            ))),
        }
    }
}

/// Client id / secret pair presented to the auth endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredentials {
    client_id: String,
    client_secret: String,
}

impl AuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Both halves are non-empty. Only complete credentials switch a fetch
    /// into authenticated mode.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

impl fmt::Debug for AuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Everything one fetch needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    transport: TransportKind,
    source_url: Option<String>,
    auth_endpoint_url: Option<String>,
    credentials: Option<AuthCredentials>,
    accept_invalid_certs: bool,
}

impl FetchConfig {
    pub fn builder(transport: TransportKind) -> FetchConfigBuilder {
        FetchConfigBuilder {
            config: FetchConfig {
                transport,
                source_url: None,
                auth_endpoint_url: None,
                credentials: None,
                accept_invalid_certs: true,
            },
        }
    }

    /// Builds a config from loosely typed inputs: a transport name and a
    /// credential list that must hold exactly zero or two values.
    pub fn from_parts(
        transport: &str,
        source_url: Option<&str>,
        auth_endpoint_url: Option<&str>,
        credentials: &[String],
    ) -> Result<Self, FetchError> {
        let mut builder = FetchConfig::builder(transport.parse()?);
        if let Some(url) = source_url {
            builder = builder.source_url(url);
        }
        if let Some(url) = auth_endpoint_url {
            builder = builder.auth_endpoint_url(url);
        }
        match credentials {
            [] => {}
            [id, secret] => builder = builder.credentials(id.as_str(), secret.as_str()),
            other => {
                return Err(FetchError::Configuration(format!(
                    "Expected 0 or 2 credential values, got {}",
                    other.len()
                )));
            }
        }
        Ok(builder.build())
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn auth_endpoint_url(&self) -> Option<&str> {
        self.auth_endpoint_url.as_deref()
    }

    pub fn credentials(&self) -> Option<&AuthCredentials> {
        self.credentials.as_ref()
    }

    pub fn accept_invalid_certs(&self) -> bool {
        self.accept_invalid_certs
    }

    pub fn auth_required(&self) -> bool {
        self.credentials
            .as_ref()
            .is_some_and(AuthCredentials::is_complete)
    }
}

pub struct FetchConfigBuilder {
    config: FetchConfig,
}

impl FetchConfigBuilder {
    pub fn source_url(mut self, url: impl Into<String>) -> Self {
        self.config.source_url = Some(url.into());
        self
    }

    pub fn auth_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.auth_endpoint_url = Some(url.into());
        self
    }

    pub fn credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.config.credentials = Some(AuthCredentials::new(client_id, client_secret));
        self
    }

    /// Certificate and host name verification is off unless this is set to
    /// `false`.
    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> FetchConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_kind_parses_canonical_and_legacy_names() {
        assert_eq!("pooled".parse::<TransportKind>().unwrap(), TransportKind::Pooled);
        assert_eq!("guzzle".parse::<TransportKind>().unwrap(), TransportKind::Pooled);
        assert_eq!(" CURL ".parse::<TransportKind>().unwrap(), TransportKind::RawSocket);
        assert_eq!("raw-socket".parse::<TransportKind>().unwrap(), TransportKind::RawSocket);
        assert_eq!(
            "file_get_contents".parse::<TransportKind>().unwrap(),
            TransportKind::Stream
        );
    }

    #[test]
    fn test_unknown_transport_kind_is_configuration_error() {
        let err = "carrier-pigeon".parse::<TransportKind>().unwrap_err();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for kind in [TransportKind::Pooled, TransportKind::RawSocket, TransportKind::Stream] {
            assert_eq!(kind.to_string().parse::<TransportKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_auth_required_needs_both_halves() {
        let none = FetchConfig::builder(TransportKind::Pooled).build();
        assert!(!none.auth_required());

        let half = FetchConfig::builder(TransportKind::Pooled)
            .credentials("id1", "")
            .build();
        assert!(!half.auth_required());

        let full = FetchConfig::builder(TransportKind::Pooled)
            .credentials("id1", "secret1")
            .build();
        assert!(full.auth_required());
    }

    #[test]
    fn test_builder_defaults_to_lenient_tls() {
        let config = FetchConfig::builder(TransportKind::Stream).build();
        assert!(config.accept_invalid_certs());
        let strict = FetchConfig::builder(TransportKind::Stream)
            .accept_invalid_certs(false)
            .build();
        assert!(!strict.accept_invalid_certs());
    }

    #[test]
    fn test_from_parts_rejects_single_credential() {
        let err = FetchConfig::from_parts(
            "pooled",
            Some("https://api.example.com/data"),
            None,
            &["id1".to_string()],
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[test]
    fn test_from_parts_rejects_unknown_transport() {
        let err = FetchConfig::from_parts("ftp", None, None, &[]).unwrap_err();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[test]
    fn test_from_parts_with_credentials() {
        let config = FetchConfig::from_parts(
            "curl",
            Some("https://api.example.com/data"),
            Some("https://auth.example.com/graphql"),
            &["id1".to_string(), "secret1".to_string()],
        )
        .unwrap();
        assert_eq!(config.transport(), TransportKind::RawSocket);
        assert_eq!(config.source_url(), Some("https://api.example.com/data"));
        assert_eq!(config.credentials().unwrap().client_id(), "id1");
        assert!(config.auth_required());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = AuthCredentials::new("id1", "secret1");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("id1"));
        assert!(!rendered.contains("secret1"));
    }
}
