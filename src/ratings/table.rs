// Parquet-backed rating table.
//
// The table keeps the projected input columns as Arrow record batches (so
// they can be written back unchanged) alongside the decoded RatingEvents the
// flag passes work on. Row i of the batches is always ratings[i].

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, RecordBatch, StringArray, TimestampMicrosecondArray,
    UInt64Array,
};
use arrow::compute::{cast, concat_batches, take_record_batch};
use arrow::datatypes::{
    DataType, Field, Int32Type, Int64Type, Schema, SchemaRef, TimeUnit, UInt64Type,
};
use arrow::record_batch::RecordBatchReader;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::Serialize;
use tracing::{debug, info};

use super::models::{RatingEvent, RatingFlags};
use super::schema::{self, ColumnRole, INPUT_COLUMNS};
use crate::error::{FlagError, Result};

/// Number of leading rows shown by `inspect`.
const INSPECT_HEAD_ROWS: usize = 3;

/// The five input columns of a snapshot, decoded and in canonical order.
#[derive(Debug, Clone)]
pub struct RatingTable {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    ratings: Vec<RatingEvent>,
}

impl RatingTable {
    /// Build a table from record batches that share `schema`.
    ///
    /// Validates the schema, reorders columns to the canonical order and
    /// decodes every row. Null identifiers are rejected; null timestamps are
    /// kept as `None` for the flag passes to handle.
    pub fn from_batches(schema: &Schema, batches: Vec<RecordBatch>) -> Result<Self> {
        schema::validate_schema(schema)?;
        let canonical = schema::input_schema(schema)?;

        let mut ordered = Vec::with_capacity(batches.len());
        let mut ratings = Vec::with_capacity(batches.iter().map(|b| b.num_rows()).sum());

        for batch in batches {
            let columns = INPUT_COLUMNS
                .iter()
                .map(|name| {
                    batch
                        .column_by_name(name)
                        .cloned()
                        .ok_or_else(|| FlagError::MissingColumn(name.to_string()))
                })
                .collect::<Result<Vec<ArrayRef>>>()?;
            let batch = RecordBatch::try_new(canonical.clone(), columns)?;
            decode_batch(&batch, ratings.len(), &mut ratings)?;
            ordered.push(batch);
        }

        Ok(Self {
            schema: canonical,
            batches: ordered,
            ratings,
        })
    }

    /// Build a table from already-decoded ratings.
    ///
    /// Ids are written as strings and timestamps as UTC microseconds.
    pub fn from_ratings(ratings: Vec<RatingEvent>) -> Result<Self> {
        let schema = Schema::new(vec![
            Field::new(schema::NOTE_ID, DataType::Utf8, false),
            Field::new(schema::RATED_ON_TARGET_ID, DataType::Utf8, false),
            Field::new(schema::RATER_ID, DataType::Utf8, false),
            Field::new(
                schema::RATED_AT,
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                true,
            ),
            Field::new(schema::FROM_NOTIFICATION, DataType::Boolean, true),
        ]);

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                ratings.iter().map(|r| r.note_id.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                ratings.iter().map(|r| r.rated_on_target_id.as_str()),
            )),
            Arc::new(StringArray::from_iter_values(
                ratings.iter().map(|r| r.rater_id.as_str()),
            )),
            Arc::new(
                TimestampMicrosecondArray::from(
                    ratings
                        .iter()
                        .map(|r| r.rated_at.map(|t| t.timestamp_micros()))
                        .collect::<Vec<Option<i64>>>(),
                )
                .with_timezone("UTC"),
            ),
            Arc::new(BooleanArray::from(
                ratings
                    .iter()
                    .map(|r| r.from_notification)
                    .collect::<Vec<Option<bool>>>(),
            )),
        ];

        let batch = RecordBatch::try_new(Arc::new(schema.clone()), columns)?;
        Self::from_batches(&schema, vec![batch])
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn ratings(&self) -> &[RatingEvent] {
        &self.ratings
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// A new table holding only the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let combined = concat_batches(&self.schema, &self.batches)?;
        let take = UInt64Array::from_iter_values(indices.iter().map(|&i| i as u64));
        // take_record_batch fails on out-of-range indices, so the lookups below are safe.
        let selected = take_record_batch(&combined, &take)?;
        let ratings = indices.iter().map(|&i| self.ratings[i].clone()).collect();

        Ok(Self {
            schema: self.schema.clone(),
            batches: vec![selected],
            ratings,
        })
    }

    /// The input batches with the four flag columns appended.
    ///
    /// `flags` is indexed by row, so the output keeps the input row order.
    pub fn with_flags(&self, flags: &[RatingFlags]) -> Result<Vec<RecordBatch>> {
        if flags.len() != self.len() {
            return Err(FlagError::LengthMismatch {
                got: flags.len(),
                expected: self.len(),
            });
        }

        let output = schema::output_schema(&self.schema);
        let mut offset = 0;
        let mut batches = Vec::with_capacity(self.batches.len());

        for batch in &self.batches {
            let rows = &flags[offset..offset + batch.num_rows()];
            offset += batch.num_rows();

            let mut columns = batch.columns().to_vec();
            columns.push(flag_column(rows, |f| f.is_rating_session));
            columns.push(flag_column(rows, |f| f.is_same_post_interest));
            columns.push(flag_column(rows, |f| f.is_notification));
            columns.push(flag_column(rows, |f| f.is_rater_swarm));

            batches.push(RecordBatch::try_new(output.clone(), columns)?);
        }

        Ok(batches)
    }
}

fn flag_column(rows: &[RatingFlags], get: impl Fn(&RatingFlags) -> bool) -> ArrayRef {
    Arc::new(BooleanArray::from(rows.iter().map(get).collect::<Vec<bool>>()))
}

/// Read the five required columns of a Parquet snapshot.
///
/// The schema is checked before any row group is read.
pub fn read_ratings(path: &Path) -> Result<RatingTable> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let file_schema = builder.schema().clone();
    schema::validate_schema(&file_schema)?;

    let roots = INPUT_COLUMNS
        .iter()
        .map(|name| file_schema.index_of(name))
        .collect::<std::result::Result<Vec<usize>, _>>()?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), roots);

    let reader = builder.with_projection(mask).build()?;
    let projected = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;

    let table = RatingTable::from_batches(&projected, batches)?;
    info!(path = %path.display(), rows = table.len(), "Loaded ratings");
    Ok(table)
}

/// Write the input columns plus flag columns to a Snappy-compressed Parquet file.
///
/// Returns the number of rows written.
pub fn write_flagged(path: &Path, table: &RatingTable, flags: &[RatingFlags]) -> Result<usize> {
    let batches = table.with_flags(flags)?;
    let output = schema::output_schema(&table.schema);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, output, Some(props))?;

    let mut rows = 0;
    for batch in &batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.close()?;

    info!(path = %path.display(), rows, "Wrote flagged ratings");
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_batch(batch: &RecordBatch, offset: usize, out: &mut Vec<RatingEvent>) -> Result<()> {
    let note_ids = decode_ids(batch.column(0).as_ref(), schema::NOTE_ID, offset)?;
    let target_ids = decode_ids(batch.column(1).as_ref(), schema::RATED_ON_TARGET_ID, offset)?;
    let rater_ids = decode_ids(batch.column(2).as_ref(), schema::RATER_ID, offset)?;
    let rated_at = decode_timestamps(batch.column(3).as_ref(), offset)?;
    let notified = decode_notifications(batch.column(4).as_ref());

    debug!(offset, rows = batch.num_rows(), "Decoded rating batch");

    out.extend(
        note_ids
            .into_iter()
            .zip(target_ids)
            .zip(rater_ids)
            .zip(rated_at)
            .zip(notified)
            .map(
                |((((note_id, rated_on_target_id), rater_id), rated_at), from_notification)| {
                    RatingEvent {
                        note_id,
                        rated_on_target_id,
                        rater_id,
                        rated_at,
                        from_notification,
                    }
                },
            ),
    );
    Ok(())
}

fn decode_ids(array: &dyn Array, column: &str, offset: usize) -> Result<Vec<String>> {
    if array.null_count() > 0 {
        let first = (0..array.len()).find(|&i| array.is_null(i)).unwrap_or(0);
        return Err(FlagError::NullValues {
            column: column.to_string(),
            count: array.null_count(),
            first_row: offset + first,
        });
    }

    let ids = match array.data_type() {
        DataType::Utf8 => array
            .as_string::<i32>()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect(),
        DataType::LargeUtf8 => array
            .as_string::<i64>()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect(),
        DataType::Utf8View => array
            .as_string_view()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect(),
        DataType::Int32 => array
            .as_primitive::<Int32Type>()
            .values()
            .iter()
            .map(|v| v.to_string())
            .collect(),
        DataType::Int64 => array
            .as_primitive::<Int64Type>()
            .values()
            .iter()
            .map(|v| v.to_string())
            .collect(),
        DataType::UInt64 => array
            .as_primitive::<UInt64Type>()
            .values()
            .iter()
            .map(|v| v.to_string())
            .collect(),
        other => {
            return Err(FlagError::UnsupportedType {
                column: column.to_string(),
                found: other.clone(),
                expected: ColumnRole::Identifier.expected(),
            })
        }
    };
    Ok(ids)
}

/// Decode timestamps of any unit. Plain int64 columns are epoch milliseconds.
fn decode_timestamps(array: &dyn Array, offset: usize) -> Result<Vec<Option<DateTime<Utc>>>> {
    let unit = match array.data_type() {
        DataType::Timestamp(unit, _) => *unit,
        DataType::Int64 => TimeUnit::Millisecond,
        other => {
            return Err(FlagError::UnsupportedType {
                column: schema::RATED_AT.to_string(),
                found: other.clone(),
                expected: ColumnRole::Timestamp.expected(),
            })
        }
    };

    let raw = cast(array, &DataType::Int64)?;
    raw.as_primitive::<Int64Type>()
        .iter()
        .enumerate()
        .map(|(i, value)| match value {
            None => Ok(None),
            Some(v) => to_datetime(v, unit)
                .map(Some)
                .ok_or_else(|| FlagError::TimestampOutOfRange {
                    column: schema::RATED_AT.to_string(),
                    row: offset + i,
                    value: v,
                }),
        })
        .collect()
}

fn to_datetime(value: i64, unit: TimeUnit) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::from_timestamp(value, 0),
        TimeUnit::Millisecond => DateTime::from_timestamp_millis(value),
        TimeUnit::Microsecond => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanosecond => Some(DateTime::from_timestamp_nanos(value)),
    }
}

fn decode_notifications(array: &dyn Array) -> Vec<Option<bool>> {
    match array.data_type() {
        DataType::Boolean => array.as_boolean().iter().collect(),
        _ => vec![None; array.len()],
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// Type and null count of one column in a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub data_type: String,
    pub null_count: usize,
}

/// `fromNotification` value counts, nulls included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    pub true_count: usize,
    pub false_count: usize,
    pub null_count: usize,
}

/// A read-only look at a snapshot: shape, columns, head rows and value ranges.
#[derive(Debug, Clone, Serialize)]
pub struct Inspection {
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
    /// Required columns the file lacks. Non-empty means `run` will fail.
    pub missing_columns: Vec<String>,
    /// The first few rows, formatted as text, in column order.
    pub head: Vec<Vec<String>>,
    pub notification_counts: Option<NotificationCounts>,
    pub first_rating: Option<DateTime<Utc>>,
    pub last_rating: Option<DateTime<Utc>>,
}

/// Describe every column of a snapshot without computing any flags.
pub fn inspect(path: &Path) -> Result<Inspection> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let file_schema = reader.schema();
    let batches = reader.collect::<std::result::Result<Vec<RecordBatch>, _>>()?;
    let combined = concat_batches(&file_schema, &batches)?;

    let columns = file_schema
        .fields()
        .iter()
        .zip(combined.columns())
        .map(|(field, array)| ColumnProfile {
            name: field.name().clone(),
            data_type: field.data_type().to_string(),
            null_count: array.null_count(),
        })
        .collect();

    let missing_columns = INPUT_COLUMNS
        .iter()
        .filter(|name| file_schema.field_with_name(name).is_err())
        .map(|name| name.to_string())
        .collect();

    let head = format_head(&combined, INSPECT_HEAD_ROWS)?;

    let notification_counts = combined
        .column_by_name(schema::FROM_NOTIFICATION)
        .map(|array| count_notifications(array.as_ref()));

    let (first_rating, last_rating) = match combined.column_by_name(schema::RATED_AT) {
        Some(array) if ColumnRole::Timestamp.accepts(array.data_type()) => {
            let times = decode_timestamps(array.as_ref(), 0)?;
            let mut present = times.into_iter().flatten();
            let first = present.next();
            present.fold((first, first), |(lo, hi), t| {
                (lo.map(|l| l.min(t)), hi.map(|h| h.max(t)))
            })
        }
        _ => (None, None),
    };

    Ok(Inspection {
        rows: combined.num_rows(),
        columns,
        missing_columns,
        head,
        notification_counts,
        first_rating,
        last_rating,
    })
}

fn format_head(batch: &RecordBatch, limit: usize) -> Result<Vec<Vec<String>>> {
    let options = FormatOptions::default().with_null("null");
    let formatters = batch
        .columns()
        .iter()
        .map(|array| ArrayFormatter::try_new(array.as_ref(), &options))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok((0..batch.num_rows().min(limit))
        .map(|row| formatters.iter().map(|f| f.value(row).to_string()).collect())
        .collect())
}

fn count_notifications(array: &dyn Array) -> NotificationCounts {
    let mut counts = NotificationCounts::default();
    for value in decode_notifications(array) {
        match value {
            Some(true) => counts.true_count += 1,
            Some(false) => counts.false_count += 1,
            None => counts.null_count += 1,
        }
    }
    counts
}
