//! ontap-publickey: declarative management of the SSH public keys bound to
//! ONTAP administrative accounts.
//!
//! One pass checks the cluster version, fetches the keys of an account,
//! decides between no-op, create, modify and delete, and performs at most
//! that one action.

pub mod clients;
pub mod config;
pub mod error;
pub mod model;
pub mod reconciler;
pub mod version;

pub use clients::{RestClient, RestResponse, Transport};
pub use config::{ConnectionConfig, UseRest};
pub use error::{Error, Result};
pub use model::{PublicKeyRecord, PublicKeySpec, State};
pub use reconciler::publickey::PublicKeyReconciler;
pub use reconciler::{Outcome, Reconciler};
