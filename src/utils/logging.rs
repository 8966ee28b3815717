//! Logging utilities
//!
//! Provides logging setup and configuration.

use env_logger::{Builder, Env};
use std::io::Write;

/// Setup logging for the server.
///
/// Defaults to `info`; `RUST_LOG` overrides the filter.
pub fn setup_logging() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{}] [{}] {}",
                timestamp,
                record.level(),
                record.args()
            )
        })
        .init();
}
