//! One-time `tracing-subscriber` initialization. `log.level` is an
//! `EnvFilter` directive string (`info`,
//! `ramdb_wal=debug,info`, …); `log.format` selects the human-readable
//! development formatter or newline-delimited JSON for production
//! ingestion.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

pub fn init(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => registry.init(),
        LogFormat::Json => registry.json().init(),
    }
}
