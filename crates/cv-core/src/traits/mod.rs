//! Core trait definitions

mod events;
mod session;

pub use events::{EventSink, NullSink};
pub use session::{CommandOutput, Connector, RemoteSession};
