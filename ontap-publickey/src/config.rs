//! Connection settings for the ONTAP REST API.

use std::fmt;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Whether the REST API may be used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UseRest {
    Always,
    Never,
    #[default]
    Auto,
}

impl fmt::Display for UseRest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseRest::Always => write!(f, "always"),
            UseRest::Never => write!(f, "never"),
            UseRest::Auto => write!(f, "auto"),
        }
    }
}

/// How to reach the cluster management interface.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub https: bool,
    pub http_port: Option<u16>,
    pub validate_certs: bool,
    pub use_rest: UseRest,
    pub timeout: Duration,
}

impl ConnectionConfig {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: String::new(),
            password: String::new(),
            https: true,
            http_port: None,
            validate_certs: true,
            use_rest: UseRest::Auto,
            timeout: Duration::from_secs(60),
        }
    }

    /// Base URL for API calls, always ending in `/api/`.
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        match self.http_port {
            Some(port) => format!("{}://{}:{}/api/", scheme, self.hostname, port),
            None => format!("{}://{}/api/", scheme, self.hostname),
        }
    }
}
