pub mod config;
pub mod error;
pub mod fetch;
pub mod output;

pub use config::{AuthCredentials, FetchConfig, TransportKind};
pub use error::FetchError;
pub use fetch::{FetchService, ParsedPayload, fetch};
