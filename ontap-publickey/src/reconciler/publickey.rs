//! Public key reconciler - converges the SSH public keys of an account.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::decision::{decide, disambiguate, validate_modify, Action, Modify};
use super::{Outcome, Reconciler};
use crate::clients::{Method, Query, Transport};
use crate::config::UseRest;
use crate::error::{Error, Result};
use crate::model::{PublicKeyRecord, PublicKeySpec, State};
use crate::version::require_rest;

pub const PUBLICKEYS_API: &str = "security/authentication/publickeys";

pub const IDEMPOTENCY_WARNING: &str =
    "Module is not idempotent if index is not provided with state=present.";

const FIELDS: &str = "account,owner,index,public_key,comment";

/// Path of one key: `<api>/<owner uuid>/<account>/<index>`.
fn record_api(method: &'static str, record: &PublicKeyRecord) -> Result<String> {
    let owner = record.owner_uuid.as_deref().ok_or_else(|| {
        Error::rest(
            method,
            format!(
                "record for user account {} index {} has no owner uuid.",
                record.account_name, record.index
            ),
        )
    })?;
    Ok(format!(
        "{}/{}/{}/{}",
        PUBLICKEYS_API, owner, record.account_name, record.index
    ))
}

fn create_body(spec: &PublicKeySpec) -> Result<Value> {
    let public_key = spec
        .public_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| {
            Error::Validation(format!(
                "Error: public_key is required to create a public key for user account {}.",
                spec.account
            ))
        })?;

    let mut body = json!({
        "account": {"name": spec.account},
        "public_key": public_key,
    });
    if let Some(index) = spec.index {
        body["index"] = json!(index);
    }
    if let Some(comment) = &spec.comment {
        body["comment"] = json!(comment);
    }
    if let Some(vserver) = &spec.vserver {
        body["owner"] = json!({"name": vserver});
    }
    Ok(body)
}

/// Reconciler for the public keys of one administrative account.
pub struct PublicKeyReconciler<T> {
    transport: T,
    check_mode: bool,
}

impl<T: Transport> PublicKeyReconciler<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            check_mode: false,
        }
    }

    /// Run the version gate, then build the reconciler.
    pub async fn connect(transport: T, use_rest: UseRest) -> Result<Self> {
        require_rest(&transport, use_rest).await?;
        Ok(Self::new(transport))
    }

    /// In check mode the decision is made and reported, but nothing is written.
    pub fn with_check_mode(mut self, check_mode: bool) -> Self {
        self.check_mode = check_mode;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch the keys of the account within the requested scope.
    pub async fn get_public_key(&self, spec: &PublicKeySpec) -> Result<Vec<PublicKeyRecord>> {
        let mut query: Query = vec![
            ("account.name".to_string(), spec.account.clone()),
            ("fields".to_string(), FIELDS.to_string()),
        ];
        match &spec.vserver {
            Some(vserver) => query.push(("owner.name".to_string(), vserver.clone())),
            None => query.push(("scope".to_string(), "cluster".to_string())),
        }
        if let Some(index) = spec.index {
            query.push(("index".to_string(), index.to_string()));
        }

        let response = self
            .transport
            .send_request(Method::Get, PUBLICKEYS_API, &query, None)
            .await;
        if response.is_not_found() {
            return Ok(Vec::new());
        }

        let body = response.into_result().map_err(|e| {
            Error::rest(
                "get_public_key",
                format!("calling: {}: got {}.", PUBLICKEYS_API, e),
            )
        })?;

        let records = match body.as_ref().and_then(|b| b.get("records")) {
            None | Some(Value::Null) => Vec::new(),
            Some(records) => serde_json::from_value::<Vec<PublicKeyRecord>>(records.clone())
                .map_err(|e| {
                    debug!("Failed to decode public key records: {}", e);
                    Error::rest(
                        "get_public_key",
                        format!(
                            "calling: {}: unexpected response {}.",
                            PUBLICKEYS_API,
                            body.clone().unwrap_or(Value::Null)
                        ),
                    )
                })?,
        };
        debug!(
            "Found {} public key(s) for account {}",
            records.len(),
            spec.account
        );
        Ok(records)
    }

    pub async fn create_public_key(&self, spec: &PublicKeySpec) -> Result<()> {
        let body = create_body(spec)?;
        info!(
            "Creating public key for account {} (index {:?})",
            spec.account, spec.index
        );
        self.transport
            .send_request(Method::Post, PUBLICKEYS_API, &Query::new(), Some(&body))
            .await
            .into_result()
            .map_err(|e| Error::rest("create_public_key", e))?;
        Ok(())
    }

    /// Patch the mutable attributes of an existing key.
    pub async fn modify_public_key(&self, current: &PublicKeyRecord, modify: &Modify) -> Result<()> {
        validate_modify(modify)?;
        let api = record_api("modify_public_key", current)?;
        info!(
            "Modifying public key {} of account {}: {:?}",
            current.index,
            current.account_name,
            modify.keys().collect::<Vec<_>>()
        );
        let body = Value::Object(modify.clone());
        self.transport
            .send_request(Method::Patch, &api, &Query::new(), Some(&body))
            .await
            .into_result()
            .map_err(|e| Error::rest("modify_public_key", e))?;
        Ok(())
    }

    pub async fn delete_public_key(&self, record: &PublicKeyRecord) -> Result<()> {
        let api = record_api("delete_public_key", record)?;
        info!(
            "Deleting public key {} of account {}",
            record.index, record.account_name
        );
        self.transport
            .send_request(Method::Delete, &api, &Query::new(), None)
            .await
            .into_result()
            .map_err(|e| Error::rest("delete_public_key", e))?;
        Ok(())
    }

    /// Single dispatch point for the decided action.
    async fn execute(&self, spec: &PublicKeySpec, action: Action) -> Result<()> {
        if self.check_mode {
            info!("Check mode, not applying: {:?}", action);
            return match action {
                Action::None => Ok(()),
                Action::Create => create_body(spec).map(drop),
                Action::Modify { current, modify } => {
                    validate_modify(&modify)?;
                    record_api("modify_public_key", &current).map(drop)
                }
                Action::Delete(records) => records
                    .iter()
                    .try_for_each(|r| record_api("delete_public_key", r).map(drop)),
            };
        }

        match action {
            Action::None => {
                debug!("Public key for account {} is up to date", spec.account);
                Ok(())
            }
            Action::Create => self.create_public_key(spec).await,
            Action::Modify { current, modify } => self.modify_public_key(&current, &modify).await,
            Action::Delete(records) => {
                // Sequential; the first failure stops the rest.
                for record in &records {
                    self.delete_public_key(record).await?;
                }
                Ok(())
            }
        }
    }

    /// Fetch, decide and act once.
    pub async fn apply(&self, spec: &PublicKeySpec) -> Result<Outcome> {
        spec.validate()?;
        info!(
            "Reconciling public key for account {} ({}, state={})",
            spec.account,
            spec.vserver.as_deref().unwrap_or("cluster scope"),
            spec.state
        );

        let mut outcome = Outcome::default();
        let records = self.get_public_key(spec).await?;
        let target = disambiguate(spec, records)?;
        let action = decide(spec, target)?;

        if action == Action::Create && spec.state == State::Present && spec.index.is_none() {
            outcome.warn(IDEMPOTENCY_WARNING);
        }
        outcome.changed = action.is_change();

        self.execute(spec, action).await?;
        Ok(outcome)
    }
}

#[async_trait]
impl<T: Transport> Reconciler for PublicKeyReconciler<T> {
    type Spec = PublicKeySpec;

    async fn reconcile(&self, spec: &Self::Spec) -> Result<Outcome> {
        self.apply(spec).await
    }
}
