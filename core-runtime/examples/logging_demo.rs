//! Logging system demonstration
//!
//! This example shows how to use the logging infrastructure in different modes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format
//! cargo run --example logging_demo -- compact
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LogLevel, LoggingConfig};
use tracing::{debug, error, info, warn};

fn main() {
    let mut args = std::env::args().skip(1);

    let format = match args.next().as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug);
    if let Some(filter) = args.next() {
        config = config.with_filter(filter);
    }

    if let Err(err) = init_logging(config) {
        eprintln!("failed to initialize logging: {}", err);
        std::process::exit(1);
    }

    info!("signage core logging initialized");
    debug!(item_count = 3, "media snapshot applied");
    warn!(slot = 4, "out-of-order slot click rejected");
    error!("upload failed: network unreachable");

    // Credentials never reach a sink unredacted.
    let token = "eyJhbGciOiJSUzI1NiJ9.demo";
    info!(id_token = %redact_if_sensitive("id_token", token), "session refreshed");
}
