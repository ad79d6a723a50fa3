//! Bearer token acquisition.
//!
//! [`TokenProvider`] is the async trait the fetch service calls when a
//! config carries complete credentials. [`GraphQlTokenProvider`] implements
//! it against endpoints that answer `{auth(...){token}}` queries.

mod graphql;

pub use graphql::{GraphQlTokenProvider, auth_query};

use anyhow::Result;
use url::Url;

use crate::config::AuthCredentials;

/// Exchanges a credential pair for a bearer token.
///
/// An empty string is a valid answer: the source decides whether it accepts
/// it.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_token(&self, endpoint: &Url, credentials: &AuthCredentials) -> Result<String>;
}
