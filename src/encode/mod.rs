//! Columnar encoding of record batches
//!
//! Converts one batch of heterogeneous records into a compressed Parquet
//! blob. The column set is the union of field names across the batch in
//! first-seen order; fields absent from a record become nulls. A field
//! whose primitive type conflicts across records is coerced to string
//! under [`CoercionPolicy::StringifyMixed`] (lossy, by string
//! representation) or fails the batch under [`CoercionPolicy::Strict`].
//!
//! Encoding is a pure function of (batch, codec, policy); array builders
//! and type merging follow the JSON-to-Arrow conversion conventions used
//! throughout this codebase.

use crate::config::{CoercionPolicy, CompressionCodec};
use crate::error::{Error, Result};
use crate::extract::Batch;
use crate::salesforce::RawRecord;
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, StructArray};
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Encoded Artifact
// ============================================================================

/// One encoded Parquet blob, produced once per batch
///
/// The (object type, part index) pair is the stable identifier the
/// uploader keys storage paths on, making re-uploads idempotent.
#[derive(Debug, Clone)]
pub struct EncodedArtifact {
    /// Object type the records belong to
    pub object_type: String,
    /// Sequential part index within the object type's export
    pub part_index: u32,
    /// Number of records encoded
    pub record_count: usize,
    /// The Parquet file contents
    pub bytes: Bytes,
}

// ============================================================================
// Column Encoder
// ============================================================================

/// Encodes batches into Parquet artifacts
#[derive(Debug, Clone, Copy)]
pub struct ColumnEncoder {
    codec: CompressionCodec,
    policy: CoercionPolicy,
}

impl ColumnEncoder {
    /// Create an encoder for the given codec and coercion policy
    pub fn new(codec: CompressionCodec, policy: CoercionPolicy) -> Self {
        Self { codec, policy }
    }

    /// Encode one batch into a Parquet artifact
    pub fn encode(
        &self,
        object_type: &str,
        part_index: u32,
        batch: &Batch,
    ) -> Result<EncodedArtifact> {
        let schema = self.union_schema(batch.records())?;
        let record_batch = build_record_batch(&schema, batch.records())?;
        let bytes = self.write_parquet(&record_batch)?;

        Ok(EncodedArtifact {
            object_type: object_type.to_string(),
            part_index,
            record_count: batch.len(),
            bytes,
        })
    }

    /// Compute the union schema across all records, first-seen order
    fn union_schema(&self, records: &[RawRecord]) -> Result<Schema> {
        let mut order: Vec<String> = Vec::new();
        let mut types: HashMap<String, DataType> = HashMap::new();

        for record in records {
            for (name, value) in record {
                let inferred = infer_type(name, value)?;
                match types.entry(name.clone()) {
                    Entry::Occupied(mut entry) => {
                        let merged = self.merge_types(name, entry.get(), &inferred)?;
                        entry.insert(merged);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(inferred);
                        order.push(name.clone());
                    }
                }
            }
        }

        let fields: Vec<Field> = order
            .iter()
            .map(|name| {
                // Parquet has no null type; an all-null column lands as string
                let data_type = match &types[name] {
                    DataType::Null => DataType::Utf8,
                    other => other.clone(),
                };
                Field::new(name, data_type, true)
            })
            .collect();

        Ok(Schema::new(fields))
    }

    /// Merge two inferred types for the same field
    fn merge_types(&self, field: &str, left: &DataType, right: &DataType) -> Result<DataType> {
        match (left, right) {
            (a, b) if a == b => Ok(a.clone()),

            (DataType::Null, other) | (other, DataType::Null) => Ok(other.clone()),

            (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
                Ok(DataType::Float64)
            }

            (DataType::Struct(a), DataType::Struct(b)) => {
                self.merge_struct_fields(field, a, b).map(DataType::Struct)
            }

            (a, b) => match self.policy {
                CoercionPolicy::StringifyMixed => Ok(DataType::Utf8),
                CoercionPolicy::Strict => Err(Error::encoding(format!(
                    "conflicting types for field '{field}': {a} vs {b}"
                ))),
            },
        }
    }

    /// Union two struct field sets, merging shared fields recursively
    fn merge_struct_fields(&self, field: &str, left: &Fields, right: &Fields) -> Result<Fields> {
        let mut merged: Vec<Field> = left.iter().map(|f| f.as_ref().clone()).collect();

        for incoming in right {
            match merged.iter_mut().find(|f| f.name() == incoming.name()) {
                Some(existing) => {
                    let path = format!("{field}.{}", incoming.name());
                    let data_type =
                        self.merge_types(&path, existing.data_type(), incoming.data_type())?;
                    *existing = Field::new(existing.name(), data_type, true);
                }
                None => merged.push(incoming.as_ref().clone()),
            }
        }

        Ok(Fields::from(merged))
    }

    /// Serialize an Arrow batch to Parquet bytes
    fn write_parquet(&self, batch: &RecordBatch) -> Result<Bytes> {
        let props = WriterProperties::builder()
            .set_compression(self.compression())
            .build();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;

        Ok(Bytes::from(buffer))
    }

    fn compression(&self) -> Compression {
        match self.codec {
            CompressionCodec::None => Compression::UNCOMPRESSED,
            CompressionCodec::Fast => Compression::SNAPPY,
            CompressionCodec::Balanced => Compression::GZIP(GzipLevel::default()),
            CompressionCodec::Max => Compression::ZSTD(ZstdLevel::default()),
        }
    }
}

// ============================================================================
// JSON to Arrow
// ============================================================================

/// Infer an Arrow type for one field value
fn infer_type(field: &str, value: &Value) -> Result<DataType> {
    match value {
        Value::Null => Ok(DataType::Null),
        Value::Bool(_) => Ok(DataType::Boolean),
        Value::Number(n) => {
            if n.is_i64() {
                Ok(DataType::Int64)
            } else {
                Ok(DataType::Float64)
            }
        }
        Value::String(_) => Ok(DataType::Utf8),
        Value::Object(obj) => {
            let fields: Vec<Field> = obj
                .iter()
                .map(|(name, inner)| {
                    let path = format!("{field}.{name}");
                    Ok(Field::new(name, infer_type(&path, inner)?, true))
                })
                .collect::<Result<_>>()?;
            Ok(DataType::Struct(Fields::from(fields)))
        }
        Value::Array(_) => Err(Error::encoding(format!(
            "field '{field}' holds an array, which has no columnar mapping"
        ))),
    }
}

/// Build an Arrow RecordBatch for the schema from raw records
fn build_record_batch(schema: &Schema, records: &[RawRecord]) -> Result<RecordBatch> {
    if records.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(schema.clone())));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|record| record.get(field.name()))
            .collect();
        columns.push(build_array(&values, field.data_type())?);
    }

    RecordBatch::try_new(Arc::new(schema.clone()), columns).map_err(Error::Arrow)
}

/// Build one Arrow array from per-record values of a field
fn build_array(values: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Boolean => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(Value::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(Value::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = values
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            // Non-string values landing in a string column are the
            // StringifyMixed coercion: their JSON representation
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Struct(fields) => build_struct_array(values, fields),

        other => Err(Error::encoding(format!(
            "unsupported column type: {other}"
        ))),
    }
}

/// Build a struct array from nested objects
fn build_struct_array(values: &[Option<&Value>], fields: &Fields) -> Result<ArrayRef> {
    let mut children: Vec<ArrayRef> = Vec::with_capacity(fields.len());

    for field in fields {
        let child_values: Vec<Option<&Value>> = values
            .iter()
            .map(|v| {
                v.and_then(|v| match v {
                    Value::Object(obj) => obj.get(field.name()),
                    _ => None,
                })
            })
            .collect();
        children.push(build_array(&child_values, field.data_type())?);
    }

    let nulls: arrow::buffer::NullBuffer = values.iter().map(Option::is_some).collect();
    let arr = StructArray::new(fields.clone(), children, Some(nulls));
    Ok(Arc::new(arr))
}

// ============================================================================
// Parquet to JSON (test-facing decoder)
// ============================================================================

/// Decode a Parquet blob back into raw records
///
/// Inverse of [`ColumnEncoder::encode`] modulo field-union nulls; used
/// by round-trip tests and spot checks of exported artifacts.
pub fn decode_parquet(bytes: &Bytes) -> Result<Vec<RawRecord>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        rows.extend(batch_to_rows(&batch)?);
    }
    Ok(rows)
}

/// Convert an Arrow batch into one JSON mapping per row
fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<RawRecord>> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let mut record = RawRecord::new();
        for (index, field) in schema.fields().iter().enumerate() {
            let value = array_value(batch.column(index).as_ref(), row)?;
            record.insert(field.name().clone(), value);
        }
        rows.push(record);
    }
    Ok(rows)
}

/// Read a single array element back into JSON
fn array_value(array: &dyn arrow::array::Array, row: usize) -> Result<Value> {
    if array.is_null(row) {
        return Ok(Value::Null);
    }

    let downcast_err = || Error::encoding(format!("unexpected array type {}", array.data_type()));

    match array.data_type() {
        DataType::Boolean => {
            let arr = array
                .as_any()
                .downcast_ref::<BooleanArray>()
                .ok_or_else(downcast_err)?;
            Ok(Value::Bool(arr.value(row)))
        }

        DataType::Int64 => {
            let arr = array
                .as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(downcast_err)?;
            Ok(Value::Number(arr.value(row).into()))
        }

        DataType::Float64 => {
            let arr = array
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(downcast_err)?;
            Ok(serde_json::Number::from_f64(arr.value(row)).map_or(Value::Null, Value::Number))
        }

        DataType::Utf8 => {
            let arr = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(downcast_err)?;
            Ok(Value::String(arr.value(row).to_string()))
        }

        DataType::Struct(_) => {
            let arr = array
                .as_any()
                .downcast_ref::<StructArray>()
                .ok_or_else(downcast_err)?;
            let mut obj = serde_json::Map::new();
            for (index, field) in arr.fields().iter().enumerate() {
                let value = array_value(arr.column(index).as_ref(), row)?;
                obj.insert(field.name().clone(), value);
            }
            Ok(Value::Object(obj))
        }

        other => Err(Error::encoding(format!("unsupported column type: {other}"))),
    }
}
