//! # Core Runtime
//!
//! Shared runtime infrastructure for the signage core: the typed event bus
//! every module publishes through, and the `tracing` bootstrap.
//!
//! Nothing in this crate knows about media, uploads or carousels beyond the
//! event vocabulary; the domain crates depend on it, never the reverse.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
