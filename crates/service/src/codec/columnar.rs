use std::sync::Arc;

use arrow_array::{Array, ArrayRef, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::codec::{CodecError, SnapshotCodec};
use crate::record::StoredService;
use crate::table::ServiceTable;

pub const COL_SERVICE_ID: &str = "service_id";
pub const COL_OWNER_ID: &str = "owner_id";
/// JSON text of the payload document.
pub const COL_PAYLOAD: &str = "payload";

/// Parquet snapshot: one row group holding the whole table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParquetCodec;

pub fn snapshot_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(COL_SERVICE_ID, DataType::Utf8, false),
        Field::new(COL_OWNER_ID, DataType::Utf8, false),
        Field::new(COL_PAYLOAD, DataType::Utf8, false),
    ]))
}

impl SnapshotCodec for ParquetCodec {
    const FORMAT: &'static str = "parquet";

    fn decode(bytes: &[u8]) -> Result<ServiceTable, CodecError> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
            .and_then(|builder| builder.build())
            .map_err(|e| CodecError::malformed(Self::FORMAT, e))?;

        let mut table = ServiceTable::new();
        for batch in reader {
            let batch = batch.map_err(|e| CodecError::malformed(Self::FORMAT, e))?;
            decode_batch(&batch, &mut table)?;
        }
        Ok(table)
    }

    fn encode(table: &ServiceTable) -> Result<Vec<u8>, CodecError> {
        let mut ids = Vec::with_capacity(table.len());
        let mut owners = Vec::with_capacity(table.len());
        let mut payloads = Vec::with_capacity(table.len());
        for (id, row) in table.rows() {
            ids.push(id.clone());
            owners.push(row.owner_id.clone());
            payloads.push(
                serde_json::to_string(&row.payload).map_err(|e| CodecError::encode(Self::FORMAT, e))?,
            );
        }

        let schema = snapshot_schema();
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(owners)),
            Arc::new(StringArray::from(payloads)),
        ];
        let batch = RecordBatch::try_new(Arc::clone(&schema), columns)
            .map_err(|e| CodecError::encode(Self::FORMAT, e))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))
            .map_err(|e| CodecError::encode(Self::FORMAT, e))?;
        writer.write(&batch).map_err(|e| CodecError::encode(Self::FORMAT, e))?;
        writer.close().map_err(|e| CodecError::encode(Self::FORMAT, e))?;
        Ok(buf)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, CodecError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| CodecError::malformed(ParquetCodec::FORMAT, format!("missing column {name}")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| CodecError::malformed(ParquetCodec::FORMAT, format!("column {name} is not utf8")))
}

fn decode_batch(batch: &RecordBatch, table: &mut ServiceTable) -> Result<(), CodecError> {
    let ids = string_column(batch, COL_SERVICE_ID)?;
    let owners = string_column(batch, COL_OWNER_ID)?;
    let payloads = string_column(batch, COL_PAYLOAD)?;

    for i in 0..batch.num_rows() {
        if ids.is_null(i) || owners.is_null(i) || payloads.is_null(i) {
            return Err(CodecError::malformed(
                ParquetCodec::FORMAT,
                format!("row {i} is missing a required field"),
            ));
        }
        let service_id = ids.value(i).to_string();
        let payload = serde_json::from_str(payloads.value(i)).map_err(|e| {
            CodecError::malformed(ParquetCodec::FORMAT, format!("payload of {service_id}: {e}"))
        })?;
        let row = StoredService { owner_id: owners.value(i).to_string(), payload };
        if !table.insert_row(service_id.clone(), row) {
            return Err(CodecError::malformed(
                ParquetCodec::FORMAT,
                format!("duplicate service_id {service_id}"),
            ));
        }
    }
    Ok(())
}
