// rating-flags: behavioral flags over content-moderation rating snapshots.
//
// This is the library root. Each module corresponds to a stage of the
// batch job: load a snapshot, derive flags, report, write.

pub mod config;
pub mod error;
pub mod flags;
pub mod output;
pub mod pipeline;
pub mod ratings;
pub mod sample;
