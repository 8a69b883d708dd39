// Column contract for rating snapshots.
//
// The five input column names are fixed by the upstream export and the
// four flag names by downstream consumers. Both are part of the file
// format, so they live here as constants rather than in config.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::error::{FlagError, Result};

pub const NOTE_ID: &str = "noteId";
pub const RATED_ON_TARGET_ID: &str = "ratedOnTweetId";
pub const RATER_ID: &str = "raterParticipantId";
pub const RATED_AT: &str = "ratingCreatedAt";
pub const FROM_NOTIFICATION: &str = "fromNotification";

/// Input columns, in the order they are written back out.
pub const INPUT_COLUMNS: [&str; 5] = [
    NOTE_ID,
    RATED_ON_TARGET_ID,
    RATER_ID,
    RATED_AT,
    FROM_NOTIFICATION,
];

pub const IS_RATING_SESSION: &str = "is_rating_session";
pub const IS_SAME_POST_INTEREST: &str = "is_same_post_interest";
pub const IS_NOTIFICATION: &str = "is_notification";
pub const IS_RATER_SWARM: &str = "is_rater_swarm";

/// Flag columns appended to the output, in order.
pub const FLAG_COLUMNS: [&str; 4] = [
    IS_RATING_SESSION,
    IS_SAME_POST_INTEREST,
    IS_NOTIFICATION,
    IS_RATER_SWARM,
];

/// What a required column is used for, which decides the types it may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Identifier,
    Timestamp,
    Notification,
}

impl ColumnRole {
    pub fn of(column: &str) -> Option<Self> {
        match column {
            NOTE_ID | RATED_ON_TARGET_ID | RATER_ID => Some(ColumnRole::Identifier),
            RATED_AT => Some(ColumnRole::Timestamp),
            FROM_NOTIFICATION => Some(ColumnRole::Notification),
            _ => None,
        }
    }

    /// Human-readable list of accepted types, used in error messages.
    pub fn expected(&self) -> &'static str {
        match self {
            ColumnRole::Identifier => "a string or integer type",
            ColumnRole::Timestamp => "a timestamp or int64 epoch milliseconds",
            ColumnRole::Notification => "a boolean",
        }
    }

    pub fn accepts(&self, data_type: &DataType) -> bool {
        match self {
            ColumnRole::Identifier => matches!(
                data_type,
                DataType::Utf8
                    | DataType::LargeUtf8
                    | DataType::Utf8View
                    | DataType::Int32
                    | DataType::Int64
                    | DataType::UInt64
            ),
            ColumnRole::Timestamp => {
                matches!(data_type, DataType::Timestamp(_, _) | DataType::Int64)
            }
            // An all-null column is written with the Null type by some exporters.
            ColumnRole::Notification => matches!(data_type, DataType::Boolean | DataType::Null),
        }
    }
}

/// Check that every required column exists with a usable type.
///
/// Runs before any row is decoded, so a bad file fails fast.
pub fn validate_schema(schema: &Schema) -> Result<()> {
    for column in INPUT_COLUMNS {
        let field = schema
            .field_with_name(column)
            .map_err(|_| FlagError::MissingColumn(column.to_string()))?;
        // Every name in INPUT_COLUMNS has a role.
        let Some(role) = ColumnRole::of(column) else {
            continue;
        };
        if !role.accepts(field.data_type()) {
            return Err(FlagError::UnsupportedType {
                column: column.to_string(),
                found: field.data_type().clone(),
                expected: role.expected(),
            });
        }
    }
    Ok(())
}

/// The input columns in canonical order, taken from a validated schema.
pub fn input_schema(schema: &Schema) -> Result<SchemaRef> {
    let fields = INPUT_COLUMNS
        .iter()
        .map(|column| {
            schema
                .field_with_name(column)
                .cloned()
                .map_err(|_| FlagError::MissingColumn(column.to_string()))
        })
        .collect::<Result<Vec<Field>>>()?;
    Ok(Arc::new(Schema::new(fields)))
}

/// Input schema plus the four non-nullable boolean flag columns.
pub fn output_schema(input: &Schema) -> SchemaRef {
    let mut fields: Vec<Field> = input.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.extend(
        FLAG_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Boolean, false)),
    );
    Arc::new(Schema::new(fields))
}
