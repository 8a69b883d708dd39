// Rating snapshots: the input table, its fixed column contract, and
// Parquet reading/writing.

pub mod models;
pub mod schema;
pub mod table;

pub use models::{RatingEvent, RatingFlags};
pub use table::RatingTable;
