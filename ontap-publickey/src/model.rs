//! Desired and observed public key state.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Whether the key should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Present => write!(f, "present"),
            State::Absent => write!(f, "absent"),
        }
    }
}

/// Desired state of a public key, as supplied by the caller.
///
/// A missing `vserver` means cluster scope. `index` selects one key among
/// several for the same account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeySpec {
    pub account: String,
    #[serde(default)]
    pub vserver: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub state: State,
    #[serde(default)]
    pub delete_all: bool,
}

impl PublicKeySpec {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            ..Default::default()
        }
    }

    /// Check that the identifying attributes are present.
    pub fn validate(&self) -> Result<()> {
        if self.account.trim().is_empty() {
            return Err(Error::Validation(
                "missing required arguments: account".to_string(),
            ));
        }
        Ok(())
    }
}

/// A public key record as returned by the REST API.
///
/// The API nests the account and owner (`{"account": {"name": ..}}`); the
/// record is flattened on decode and nested again on encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "wire::Record", into = "wire::Record")]
pub struct PublicKeyRecord {
    pub owner_uuid: Option<String>,
    pub account_name: String,
    pub public_key: String,
    pub index: u32,
    pub comment: Option<String>,
}

impl PublicKeyRecord {
    /// Observed comment, with a missing comment read as empty.
    pub fn comment(&self) -> &str {
        self.comment.as_deref().unwrap_or_default()
    }
}

mod wire {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    pub struct Account {
        pub name: String,
    }

    #[derive(Serialize, Deserialize)]
    pub struct Owner {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub uuid: Option<String>,
    }

    #[derive(Serialize, Deserialize)]
    pub struct Record {
        pub account: Account,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub owner: Option<Owner>,
        #[serde(default)]
        pub public_key: String,
        pub index: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub comment: Option<String>,
    }

    impl From<Record> for super::PublicKeyRecord {
        fn from(r: Record) -> Self {
            Self {
                owner_uuid: r
                    .owner
                    .and_then(|o| o.uuid)
                    .filter(|uuid| !uuid.is_empty()),
                account_name: r.account.name,
                public_key: r.public_key,
                index: r.index,
                comment: r.comment,
            }
        }
    }

    impl From<super::PublicKeyRecord> for Record {
        fn from(r: super::PublicKeyRecord) -> Self {
            Self {
                account: Account {
                    name: r.account_name,
                },
                owner: r.owner_uuid.map(|uuid| Owner { uuid: Some(uuid) }),
                public_key: r.public_key,
                index: r.index,
                comment: r.comment,
            }
        }
    }
}
