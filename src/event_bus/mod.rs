//! Progress event utilities: fan-out, sinks, and the bus itself.
//!
//! The orchestrator and wizard runtime emit [`Event`]s (job lifecycle,
//! active sub-stage, invalidations) through a flume channel owned by an
//! [`EventBus`], which broadcasts them to pluggable [`EventSink`]s — stdout
//! for development, an in-memory sink for tests, or a tokio channel sink
//! for streaming progress to a UI layer.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, InvalidationEvent, JobEvent, JobPhase};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
