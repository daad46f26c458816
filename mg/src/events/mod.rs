//! Pipeline events
//!
//! Every stage announces what it did on a `tokio::sync::broadcast` bus.
//! Emitting never blocks and never fails; consumers such as the JSONL
//! logger subscribe when they need a record of the run.
//!
//! ```text
//! Pipeline --emit--> EventBus --subscribe--> EventLogger (events.jsonl)
//!                            \--subscribe--> tests, CLI
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, create_event_bus};
pub use logger::{EventLogger, read_events, spawn_event_logger};
pub use types::{EventLogEntry, PipelineEvent};
