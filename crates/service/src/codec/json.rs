use crate::codec::{CodecError, SnapshotCodec};
use crate::table::ServiceTable;

/// Pretty-printed JSON object keyed by `service_id`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl SnapshotCodec for JsonCodec {
    const FORMAT: &'static str = "json";

    fn decode(bytes: &[u8]) -> Result<ServiceTable, CodecError> {
        // 仅包含空白字符的文件视为空表
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ServiceTable::new());
        }
        serde_json::from_slice(bytes).map_err(|e| CodecError::malformed(Self::FORMAT, e))
    }

    fn encode(table: &ServiceTable) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(table).map_err(|e| CodecError::encode(Self::FORMAT, e))
    }
}
