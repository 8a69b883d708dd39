// Flag derivation: four independent behavioral flags per rating row.
//
// Each pass reads the same immutable slice of ratings and returns one
// boolean per input row, indexed like the input. The deriver zips the
// passes together; nothing here reorders rows.

pub mod deriver;
pub mod notification;
pub mod same_post;
pub mod session;
pub mod summary;
pub mod swarm;

pub use deriver::{derive_flags, derive_flags_with_swarm, require_timestamps, FlagReport};
pub use summary::{FlagCount, FlagSummary};
pub use swarm::{NoteStats, SwarmIndex};
