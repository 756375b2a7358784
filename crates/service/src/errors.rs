use thiserror::Error;

/// Failures surfaced by every service store backend.
///
/// Transport mapping (HTTP status etc.) belongs to the caller; `code()` gives
/// a stable number for that mapping and for logs.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("service not found: {0}")]
    NotFound(String),
    /// The record exists but belongs to someone else. The message never names the owner.
    #[error("service {0} is not accessible to this user")]
    Forbidden(String),
    #[error("service store unavailable: {0}")]
    BackendUnavailable(String),
    #[error("could not allocate a unique service id after {attempts} attempts (last: {last_id})")]
    Conflict { attempts: usize, last_id: String },
    #[error("invalid service payload: {0}")]
    InvalidPayload(String),
    #[error("invalid owner id: {0}")]
    InvalidOwner(String),
    #[error("unsupported service store url: {0}")]
    UnsupportedStoreUrl(String),
}

impl StoreError {
    pub fn not_found(service_id: &str) -> Self { Self::NotFound(service_id.to_string()) }

    pub fn forbidden(service_id: &str) -> Self { Self::Forbidden(service_id.to_string()) }

    pub fn unavailable(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable(format!("{context}: {err}"))
    }

    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            StoreError::NotFound(_) => 2001,
            StoreError::Forbidden(_) => 2002,
            StoreError::Conflict { .. } => 2003,
            StoreError::InvalidPayload(_) => 2004,
            StoreError::InvalidOwner(_) => 2005,
            StoreError::BackendUnavailable(_) => 2100,
            StoreError::UnsupportedStoreUrl(_) => 2101,
        }
    }
}

impl From<crate::codec::CodecError> for StoreError {
    fn from(e: crate::codec::CodecError) -> Self {
        StoreError::BackendUnavailable(e.to_string())
    }
}

impl From<models::errors::ModelError> for StoreError {
    fn from(e: models::errors::ModelError) -> Self {
        use models::errors::ModelError;
        match e {
            ModelError::NotFound(id) => StoreError::NotFound(id),
            ModelError::Validation(msg) => StoreError::InvalidPayload(msg),
            other => StoreError::BackendUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errs = [
            StoreError::not_found("a"),
            StoreError::forbidden("a"),
            StoreError::Conflict { attempts: 1, last_id: "a".into() },
            StoreError::InvalidPayload("x".into()),
            StoreError::InvalidOwner("x".into()),
            StoreError::BackendUnavailable("x".into()),
            StoreError::UnsupportedStoreUrl("x".into()),
        ];
        let mut codes: Vec<u16> = errs.iter().map(StoreError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errs.len());
    }

    #[test]
    fn forbidden_does_not_leak_owner() {
        let msg = StoreError::forbidden("svc-1").to_string();
        assert_eq!(msg, "service svc-1 is not accessible to this user");
    }

    #[test]
    fn model_errors_map_to_store_kinds() {
        use models::errors::ModelError;
        assert!(matches!(StoreError::from(ModelError::NotFound("x".into())), StoreError::NotFound(_)));
        assert!(matches!(StoreError::from(ModelError::Db("io".into())), StoreError::BackendUnavailable(_)));
        assert!(matches!(StoreError::from(ModelError::Duplicate("x".into())), StoreError::BackendUnavailable(_)));
    }
}
