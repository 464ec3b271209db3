//! ONTAP version gate.
//!
//! Public key management needs the REST API of ONTAP 9.7 or later. The gate
//! runs once before any lookup and fails the whole pass otherwise.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::clients::{Method, Transport};
use crate::config::UseRest;
use crate::error::{Error, Result};

pub const MODULE_NAME: &str = "ontap-publickey";

pub const MINIMUM_VERSION: OntapVersion = OntapVersion {
    generation: 9,
    major: 7,
    minor: 0,
};

/// Cluster software version. `9.8.0` is generation 9, major 8, minor 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub struct OntapVersion {
    pub generation: u32,
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for OntapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.generation, self.major)
    }
}

fn requires_minimum(found: &str) -> Error {
    Error::Capability(format!(
        "{} only supports REST, and requires ONTAP {} or later.  Found: {}.",
        MODULE_NAME, MINIMUM_VERSION, found
    ))
}

/// Probe the cluster version and check that REST can be used.
pub async fn require_rest<T>(transport: &T, use_rest: UseRest) -> Result<OntapVersion>
where
    T: Transport + ?Sized,
{
    if use_rest == UseRest::Never {
        return Err(Error::Capability(format!(
            "REST is required for this module, found: \"use_rest: {}\"",
            use_rest
        )));
    }

    let query = vec![("fields".to_string(), "version".to_string())];
    let response = transport
        .send_request(Method::Get, "cluster", &query, None)
        .await;

    let body = match response.into_result() {
        Ok(body) => body,
        Err(e) if use_rest == UseRest::Auto => {
            debug!("REST version probe failed: {}", e);
            return Err(requires_minimum("unknown"));
        }
        Err(e) => {
            return Err(Error::Capability(format!(
                "Error using REST for version, error: {}",
                e
            )))
        }
    };

    let version = body
        .as_ref()
        .and_then(|b| b.get("version"))
        .and_then(|v| OntapVersion::deserialize(v).ok());
    let Some(version) = version else {
        return Err(Error::Capability(format!(
            "Error using REST for version, unexpected response: {}",
            body.unwrap_or(Value::Null)
        )));
    };

    if version < MINIMUM_VERSION {
        return Err(requires_minimum(&version.to_string()));
    }

    info!("ONTAP version {}.{}", version, version.minor);
    Ok(version)
}
