//! Typed failures surfaced by [`crate::fetch::fetch`].

/// Every way a fetch can fail. No variant carries a partial payload.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Missing source URL, missing auth endpoint, unknown transport kind or
    /// malformed construction inputs. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The auth endpoint was unreachable or answered with something that is
    /// not a JSON token document.
    #[error("Auth error: {0:#}")]
    Auth(anyhow::Error),

    /// The source answered with something other than 200, or could not be
    /// reached at all (`status` is `None` in that case).
    #[error("Transport error: {reason}. Check source url: {url}")]
    Transport {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("No data from source. Check source url: {url}")]
    EmptyResponse { url: String },

    #[error("Not a JSON response from source. Check source url: {url}")]
    InvalidPayload {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// The HTTP status observed from the source, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Transport { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn unexpected_status(url: &str, status: u16) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            status: Some(status),
            reason: format!("Got {status} code instead of 200 from source"),
        }
    }

    pub(crate) fn unreachable(url: &str, err: &anyhow::Error) -> Self {
        FetchError::Transport {
            url: url.to_string(),
            status: None,
            reason: format!("{err:#}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
