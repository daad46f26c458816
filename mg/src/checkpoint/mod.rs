//! In-memory checkpoint store
//!
//! `CheckpointStore` is a handle to an actor task that owns every run's
//! snapshots. The pipeline appends one snapshot per completed stage; readers
//! get clones.

mod messages;
mod store;

pub use messages::{CheckpointCommand, CheckpointError, CheckpointResponse};
pub use store::CheckpointStore;
