//! Centralized logic for initializing http clients to
//! ensure uniform configuration.

use std::time::Duration;

use crate::errors::{DistError, DistResult};

/// User-Agent sent with every request
pub const USER_AGENT: &str = concat!("shipwright/", env!("CARGO_PKG_VERSION"));

/// Settings for http clients
///
/// Any settings that should apply to all http requests should
/// be stored here, to avoid different configurations.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// How long to wait for a connection to be established
    pub connect_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientSettings {
    /// Create new ClientSettings using all necessary values
    pub fn new() -> Self {
        Self::default()
    }
}

/// Create a raw reqwest client
///
/// Ideally this should be called only once per run and reused!
pub fn create_reqwest_client(settings: &ClientSettings) -> DistResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(settings.connect_timeout)
        .build()
        .map_err(|details| DistError::HostRequest {
            operation: "initialize http client".to_owned(),
            details,
        })
}
