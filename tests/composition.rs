// Composition tests: snapshot file in, flagged snapshot file out.
//
// These exercise reading, schema validation, flag derivation and writing
// together, against Parquet files in a temporary directory.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Int64Array, NullArray, RecordBatch, StringArray,
    TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, Field, Int64Type, Schema, TimeUnit};
use arrow::record_batch::RecordBatchReader;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use rating_flags::config::FlagConfig;
use rating_flags::error::{ErrorClass, FlagError};
use rating_flags::pipeline::{full, prototype};
use rating_flags::ratings::schema::{FLAG_COLUMNS, INPUT_COLUMNS};
use rating_flags::ratings::table::{self, RatingTable};
use rating_flags::ratings::RatingEvent;

struct Row {
    note: i64,
    post: i64,
    rater: String,
    minutes: i64,
    notified: Option<bool>,
}

fn row(note: i64, post: i64, rater: &str, minutes: i64, notified: Option<bool>) -> Row {
    Row {
        note,
        post,
        rater: rater.to_string(),
        minutes,
        notified,
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 17, 0, 0, 0).unwrap()
}

fn nanos(minutes: i64) -> i64 {
    (t0() + TimeDelta::minutes(minutes))
        .timestamp_nanos_opt()
        .unwrap()
}

/// Write a snapshot shaped like the upstream export: extra columns, a
/// different column order, integer ids and nanosecond timestamps.
fn write_snapshot(path: &Path, rows: &[Row]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("raterParticipantId", DataType::Utf8, false),
        Field::new("helpfulnessLevel", DataType::Utf8, true),
        Field::new("noteId", DataType::Int64, false),
        Field::new(
            "ratingCreatedAt",
            DataType::Timestamp(TimeUnit::Nanosecond, None),
            true,
        ),
        Field::new("ratedOnTweetId", DataType::Int64, false),
        Field::new("fromNotification", DataType::Boolean, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.rater.as_str()))),
            Arc::new(StringArray::from(vec![Some("HELPFUL"); rows.len()])),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.note))),
            Arc::new(TimestampNanosecondArray::from_iter_values(
                rows.iter().map(|r| nanos(r.minutes)),
            )),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.post))),
            Arc::new(BooleanArray::from(
                rows.iter().map(|r| r.notified).collect::<Vec<_>>(),
            )),
        ],
    )
    .unwrap();

    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn column(name: &str, array: impl Array + 'static) -> (&str, ArrayRef) {
    (name, Arc::new(array))
}

/// Write one batch with the given columns as-is.
fn write_columns(path: &Path, columns: Vec<(&str, ArrayRef)>) {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch =
        RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())
            .unwrap();
    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn read_back(path: &Path) -> RecordBatch {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
        .unwrap()
        .build()
        .unwrap();
    let schema = reader.schema();
    let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
    arrow::compute::concat_batches(&schema, &batches).unwrap()
}

fn bools(batch: &RecordBatch, column: &str) -> Vec<bool> {
    let array = batch.column_by_name(column).unwrap().as_boolean();
    (0..array.len()).map(|i| array.value(i)).collect()
}

fn sample_rows() -> Vec<Row> {
    vec![
        row(1, 100, "R1", 4, Some(true)),
        row(2, 100, "R1", 0, None),
        row(3, 200, "R2", 0, Some(false)),
        row(4, 300, "R2", 10, None),
    ]
}

fn paths(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
    (dir.path().join("ratings.parquet"), dir.path().join("out/flags.parquet"))
}

// ============================================================
// Full run
// ============================================================

#[test]
fn full_run_appends_flags_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);
    write_snapshot(&input, &sample_rows());

    let outcome = full::run(&input, &output, &FlagConfig::default(), false).unwrap();
    assert_eq!(outcome.rows_written, 4);

    let batch = read_back(&output);
    assert_eq!(batch.num_rows(), 4);

    let names: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let expected: Vec<&str> = INPUT_COLUMNS.iter().chain(FLAG_COLUMNS.iter()).copied().collect();
    assert_eq!(names, expected);

    // Input order, not rater/time order.
    let notes = batch.column_by_name("noteId").unwrap().as_primitive::<Int64Type>();
    assert_eq!(notes.values().to_vec(), vec![1, 2, 3, 4]);

    assert_eq!(bools(&batch, "is_rating_session"), vec![true, true, false, false]);
    assert_eq!(bools(&batch, "is_same_post_interest"), vec![true, true, false, false]);
    assert_eq!(bools(&batch, "is_notification"), vec![true, false, false, false]);
    assert_eq!(bools(&batch, "is_rater_swarm"), vec![false, false, false, false]);
}

#[test]
fn full_run_flags_swarm_note() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    // 22 raters on note 7, one every two minutes.
    let mut rows: Vec<Row> = (0..22)
        .map(|i| row(7, 70, &format!("rater-{i}"), 2 * i, None))
        .collect();
    rows.push(row(8, 80, "rater-0", 600, None));
    write_snapshot(&input, &rows);

    let outcome = full::run(&input, &output, &FlagConfig::default(), false).unwrap();
    assert_eq!(outcome.summary.swarm_notes, 1);
    assert_eq!(outcome.summary.notes, 2);

    let swarm = bools(&read_back(&output), "is_rater_swarm");
    assert!(swarm[..22].iter().all(|&s| s));
    assert!(!swarm[22]);
}

#[test]
fn tighter_thresholds_change_results() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);
    write_snapshot(&input, &sample_rows());

    let config = FlagConfig::from_units(3, 20, 1).unwrap();
    let outcome = full::run(&input, &output, &config, false).unwrap();
    assert_eq!(outcome.summary.is_rating_session.true_count, 0);
}

// ============================================================
// Failures
// ============================================================

#[test]
fn missing_column_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = paths(&dir);

    let schema = Arc::new(Schema::new(vec![Field::new("noteId", DataType::Int64, false)]));
    let batch =
        RecordBatch::try_new(schema.clone(), vec![Arc::new(Int64Array::from(vec![1]))]).unwrap();
    let mut writer = ArrowWriter::try_new(File::create(&input).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let err = table::read_ratings(&input).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Schema);
    assert!(matches!(err, FlagError::MissingColumn(_)));
}

#[test]
fn unreadable_file_is_a_resource_error() {
    let err = table::read_ratings(Path::new("/nonexistent/ratings.parquet")).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Resource);
}

#[test]
fn out_of_range_timestamp_is_a_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = paths(&dir);

    let millis = t0().timestamp_millis();
    write_columns(
        &input,
        vec![
            column("noteId", Int64Array::from(vec![1, 2])),
            column("ratedOnTweetId", Int64Array::from(vec![10, 20])),
            column("raterParticipantId", StringArray::from(vec!["R1", "R2"])),
            column("ratingCreatedAt", Int64Array::from(vec![millis, i64::MAX])),
            column("fromNotification", BooleanArray::from(vec![None, Some(true)])),
        ],
    );

    let err = table::read_ratings(&input).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Data);
    match err {
        FlagError::TimestampOutOfRange { column, row, value } => {
            assert_eq!(column, "ratingCreatedAt");
            assert_eq!(row, 1);
            assert_eq!(value, i64::MAX);
        }
        other => panic!("expected TimestampOutOfRange, got {other:?}"),
    }
}

#[test]
fn strict_run_rejects_missing_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let (_, output) = paths(&dir);
    let input = dir.path().join("undated.parquet");

    let mut undated = RatingEvent::new("n2", "p", "r", t0());
    undated.rated_at = None;
    let source = RatingTable::from_ratings(vec![RatingEvent::new("n1", "p", "r", t0()), undated])
        .unwrap();
    table::write_flagged(&input, &source, &[Default::default(), Default::default()]).unwrap();

    let err = full::run(&input, &output, &FlagConfig::default(), true).unwrap_err();
    let flag_err = err.downcast_ref::<FlagError>().unwrap();
    assert_eq!(flag_err.class(), ErrorClass::Data);
    assert!(!output.exists());

    // The lenient run keeps both rows.
    let outcome = full::run(&input, &output, &FlagConfig::default(), false).unwrap();
    assert_eq!(outcome.rows_written, 2);
    assert_eq!(outcome.summary.rows_missing_timestamp, 1);
}

// ============================================================
// Multi-batch input
// ============================================================

#[test]
fn flags_stay_aligned_across_reader_batches() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    // Well past the reader's 1024-row batch size. Every rater is distinct
    // except rows 4000 and 4003, three minutes apart.
    let rows: i64 = 5000;
    let base = t0().timestamp_millis();
    let raters: Vec<String> = (0..rows)
        .map(|i| match i {
            4000 | 4003 => "pair".to_string(),
            _ => format!("rater-{i}"),
        })
        .collect();
    write_columns(
        &input,
        vec![
            column("noteId", Int64Array::from_iter_values(0..rows)),
            column("ratedOnTweetId", Int64Array::from_iter_values((0..rows).map(|i| 1_000 + i))),
            column("raterParticipantId", StringArray::from_iter_values(raters.iter())),
            column(
                "ratingCreatedAt",
                Int64Array::from_iter_values((0..rows).map(|i| base + i * 60_000)),
            ),
            column("fromNotification", NullArray::new(rows as usize)),
        ],
    );

    let outcome = full::run(&input, &output, &FlagConfig::default(), false).unwrap();
    assert_eq!(outcome.rows_written, 5000);
    assert_eq!(outcome.summary.is_notification.true_count, 0);

    let batch = read_back(&output);
    let notes = batch.column_by_name("noteId").unwrap().as_primitive::<Int64Type>();
    assert_eq!(notes.values().to_vec(), (0..rows).collect::<Vec<_>>());

    let sessions: Vec<usize> = bools(&batch, "is_rating_session")
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(sessions, vec![4000, 4003]);

    assert!(bools(&batch, "is_notification").iter().all(|&n| !n));
    assert!(bools(&batch, "is_rater_swarm").iter().all(|&s| !s));
}

// ============================================================
// Prototype run and inspection
// ============================================================

#[test]
fn prototype_run_samples_rows_but_keeps_swarm_population() {
    let dir = tempfile::tempdir().unwrap();
    let (input, output) = paths(&dir);

    let rows: Vec<Row> = (0..40)
        .map(|i| row(5, 50, &format!("rater-{i}"), i, None))
        .collect();
    write_snapshot(&input, &rows);

    let outcome =
        prototype::run(&input, Some(&output), &FlagConfig::default(), 10, 42).unwrap();
    assert_eq!(outcome.full_rows, 40);
    assert_eq!(outcome.summary.rows, 10);
    assert_eq!(outcome.rows_written, Some(10));

    // 40 ratings in 39 minutes: a swarm over the full snapshot, even though
    // the sample alone has only 10.
    let batch = read_back(&output);
    assert_eq!(batch.num_rows(), 10);
    assert!(bools(&batch, "is_rater_swarm").iter().all(|&s| s));
}

#[test]
fn inspect_reports_shape_of_complete_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = paths(&dir);
    write_snapshot(&input, &sample_rows());

    let inspection = table::inspect(&input).unwrap();
    assert_eq!(inspection.rows, 4);
    assert_eq!(inspection.columns.len(), 6);
    assert!(inspection.missing_columns.is_empty());
    assert_eq!(inspection.head.len(), 3);

    let counts = inspection.notification_counts.unwrap();
    assert_eq!((counts.true_count, counts.false_count, counts.null_count), (1, 1, 2));
    assert_eq!(inspection.first_rating, Some(t0()));
    assert_eq!(inspection.last_rating, Some(t0() + TimeDelta::minutes(10)));
}

#[test]
fn inspect_reports_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let (input, _) = paths(&dir);

    write_columns(
        &input,
        vec![
            column("noteId", Int64Array::from(vec![1, 2])),
            column("ratedOnTweetId", Int64Array::from(vec![10, 10])),
            column("raterParticipantId", StringArray::from(vec!["R1", "R1"])),
            column(
                "ratingCreatedAt",
                TimestampNanosecondArray::from(vec![nanos(0), nanos(3)]),
            ),
        ],
    );

    let inspection = table::inspect(&input).unwrap();
    assert_eq!(inspection.rows, 2);
    assert_eq!(inspection.missing_columns, vec!["fromNotification".to_string()]);
    assert!(inspection.notification_counts.is_none());
    assert_eq!(inspection.last_rating, Some(t0() + TimeDelta::minutes(3)));

    rating_flags::output::terminal::display_inspection(&inspection, &input.display().to_string());

    // The same file cannot be flagged.
    let err = table::read_ratings(&input).unwrap_err();
    assert!(matches!(err, FlagError::MissingColumn(ref c) if c == "fromNotification"));
}
