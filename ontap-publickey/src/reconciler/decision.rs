//! Target selection and action decision for public keys.
//!
//! Both steps are pure: they look at the desired state and the records that
//! were fetched, and never touch the API.

use serde_json::{Map, Value};

use super::publickey::PUBLICKEYS_API;
use crate::error::{Error, Result};
use crate::model::{PublicKeyRecord, PublicKeySpec, State};

/// Attributes that may be changed on an existing key.
pub const MUTABLE_ATTRIBUTES: &[&str] = &["comment"];

/// Attribute name to desired value, holding only what differs.
pub type Modify = Map<String, Value>;

/// Which existing records the desired state refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Absent,
    One(PublicKeyRecord),
    All(Vec<PublicKeyRecord>),
}

/// The single corrective step for one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    Create,
    Modify {
        current: PublicKeyRecord,
        modify: Modify,
    },
    Delete(Vec<PublicKeyRecord>),
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Action::None)
    }
}

fn unexpected_response(records: &[PublicKeyRecord]) -> Error {
    let rendered = serde_json::to_string(records).unwrap_or_else(|_| format!("{:?}", records));
    Error::rest(
        "get_public_key",
        format!(
            "calling: {}: unexpected response {}.",
            PUBLICKEYS_API, rendered
        ),
    )
}

/// Pick the record(s) the desired state refers to.
///
/// With an index, exactly one returned record must carry it; anything else
/// means the API answered a question that was not asked. Without an index,
/// several records are only acceptable when deleting all of them.
pub fn disambiguate(spec: &PublicKeySpec, mut records: Vec<PublicKeyRecord>) -> Result<Target> {
    if records.is_empty() {
        return Ok(Target::Absent);
    }

    if let Some(index) = spec.index {
        let mut matching = records.iter().filter(|r| r.index == index);
        return match (matching.next(), matching.next()) {
            (Some(record), None) => Ok(Target::One(record.clone())),
            _ => Err(unexpected_response(&records)),
        };
    }

    if records.len() == 1 {
        return Ok(Target::One(records.remove(0)));
    }

    match spec.state {
        State::Absent if spec.delete_all => Ok(Target::All(records)),
        State::Absent => Err(Error::Ambiguous {
            account: spec.account.clone(),
            hint: "  Use delete_all: true to delete all keys.",
        }),
        State::Present => Err(Error::Ambiguous {
            account: spec.account.clone(),
            hint: "",
        }),
    }
}

/// Attributes whose desired value differs from the observed record.
///
/// Only the comment can differ; key material and account identify the
/// record.
pub fn modified_attributes(spec: &PublicKeySpec, current: &PublicKeyRecord) -> Modify {
    let mut modify = Modify::new();
    if let Some(comment) = &spec.comment {
        if comment != current.comment() {
            modify.insert("comment".to_string(), Value::String(comment.clone()));
        }
    }
    modify
}

/// Decide the action that converges the observed target to the desired state.
pub fn decide(spec: &PublicKeySpec, target: Target) -> Result<Action> {
    match (spec.state, target) {
        (State::Present, Target::Absent) => Ok(Action::Create),
        (State::Present, Target::One(current)) => {
            let modify = modified_attributes(spec, &current);
            if modify.is_empty() {
                Ok(Action::None)
            } else {
                Ok(Action::Modify { current, modify })
            }
        }
        (State::Present, Target::All(records)) => Err(Error::Invariant(format!(
            "cannot apply state=present to {} public keys for user account {}",
            records.len(),
            spec.account
        ))),
        (State::Absent, Target::Absent) => Ok(Action::None),
        (State::Absent, Target::One(record)) => Ok(Action::Delete(vec![record])),
        (State::Absent, Target::All(records)) => Ok(Action::Delete(records)),
    }
}

/// Check a modify set before it is sent.
///
/// Split out of the executor so check mode applies the same rules.
pub fn validate_modify(modify: &Modify) -> Result<()> {
    let unsupported: Modify = modify
        .iter()
        .filter(|(key, _)| !MUTABLE_ATTRIBUTES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    if !unsupported.is_empty() {
        return Err(Error::Invariant(format!(
            "attributes not supported in modify: {}",
            Value::Object(unsupported)
        )));
    }
    if modify.is_empty() {
        return Err(Error::Invariant(format!(
            "nothing to change - modify called with: {}",
            Value::Object(modify.clone())
        )));
    }
    Ok(())
}
