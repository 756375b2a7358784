//! Service record and the rules every backend applies to it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::StoreError;

/// A user-owned service definition as returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub service_id: String,
    pub owner_id: String,
    pub payload: Value,
}

/// Stored form of a record inside a keyed snapshot: the key is the `service_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredService {
    pub owner_id: String,
    pub payload: Value,
}

impl StoredService {
    pub fn into_record(self, service_id: String) -> ServiceRecord {
        ServiceRecord { service_id, owner_id: self.owner_id, payload: self.payload }
    }
}

/// Reject the caller unless it owns the record.
pub fn authorize(service_id: &str, stored_owner: &str, caller: &str) -> Result<(), StoreError> {
    if stored_owner != caller {
        warn!(%service_id, caller, "ownership check rejected");
        return Err(StoreError::forbidden(service_id));
    }
    Ok(())
}

/// Owner ids are opaque but must carry at least one non-whitespace character.
pub fn validate_owner(owner_id: &str) -> Result<(), StoreError> {
    if owner_id.trim().is_empty() {
        return Err(StoreError::InvalidOwner("owner_id must not be blank".to_string()));
    }
    Ok(())
}

/// Shallow merge: top-level keys of `partial` overwrite, every other key survives.
///
/// `partial` must be an object. A stored payload that is not an object is
/// replaced by `partial` since there are no keys to preserve.
pub fn merge_payload(existing: &mut Value, partial: Value) -> Result<(), StoreError> {
    let Value::Object(updates) = partial else {
        return Err(StoreError::InvalidPayload(format!(
            "update document must be a JSON object, got {}",
            json_kind(&partial)
        )));
    };
    match existing {
        Value::Object(current) => {
            for (key, value) in updates {
                current.insert(key, value);
            }
        }
        other => *other = Value::Object(updates),
    }
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
