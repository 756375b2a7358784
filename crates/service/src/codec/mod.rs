//! Encoding of service records into each backend's native representation.
//!
//! - `json`: keyed JSON document (`{ id: {owner_id, payload} }`)
//! - `columnar`: Parquet with `service_id`, `owner_id`, `payload` utf8 columns
//! - `row`: SeaORM `services` rows

pub mod columnar;
pub mod json;
pub mod row;

use thiserror::Error;

use crate::table::ServiceTable;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{format} snapshot is malformed: {reason}")]
    Malformed { format: &'static str, reason: String },
    #[error("{format} snapshot could not be encoded: {reason}")]
    Encode { format: &'static str, reason: String },
}

impl CodecError {
    pub fn malformed(format: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Malformed { format, reason: reason.to_string() }
    }

    pub fn encode(format: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Encode { format, reason: reason.to_string() }
    }
}

/// Whole-table codec for backends that persist one snapshot file.
///
/// `decode` is only called with non-empty content; a zero-length file is an
/// empty table and never reaches the codec.
pub trait SnapshotCodec: Send + Sync + 'static {
    /// Short name used in logs and errors.
    const FORMAT: &'static str;

    fn decode(bytes: &[u8]) -> Result<ServiceTable, CodecError>;

    fn encode(table: &ServiceTable) -> Result<Vec<u8>, CodecError>;
}
