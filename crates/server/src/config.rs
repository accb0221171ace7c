//! Typed configuration loading: a TOML file with nested tables, layered
//! under flat `RAMDB_*` environment variables, env taking precedence (see
//! DESIGN.md for the reasoning). Built on `serde` + `toml` for the file
//! layer and `humantime`/`parse_size` for the human-readable duration and
//! byte-size strings the file and environment both accept (e.g. `timeout =
//! "30s"`, `seg_size_bytes = "64MB"`).

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineType {
    Map,
    Wal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub host: String,
    pub port: u16,
    /// Port for the HTTP/JSON surface, distinct from `network.port` since
    /// the two ingress adapters run concurrently and cannot share a
    /// listener.
    pub http_port: u16,
    pub max_conn: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct WalConfig {
    pub batch_max: usize,
    pub batch_timeout: Duration,
    pub seg_size_bytes: u64,
    pub seg_path: PathBuf,
    pub recover: bool,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Fully resolved, validated configuration.
#[derive(Debug, Clone)]
pub struct RamdbConfig {
    pub engine: EngineType,
    pub network: NetworkConfig,
    pub wal: WalConfig,
    pub log: LogConfig,
}

/// The as-written TOML shape: every field is a string or a plain scalar so
/// env-var overrides (also strings) can overlay it uniformly before the
/// duration/size/enum parsing and range validation run once, in
/// [`resolve`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawConfig {
    engine: RawEngine,
    network: RawNetwork,
    wal: RawWal,
    log: RawLog,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawEngine {
    #[serde(rename = "type")]
    kind: String,
}

impl Default for RawEngine {
    fn default() -> Self {
        Self { kind: "wal".into() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawNetwork {
    host: String,
    port: u16,
    http_port: u16,
    max_conn: usize,
    timeout: String,
}

impl Default for RawNetwork {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 7070,
            http_port: 7071,
            max_conn: 256,
            timeout: "30s".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawWal {
    batch_max: usize,
    batch_timeout: String,
    seg_size_bytes: String,
    seg_path: String,
    recover: bool,
}

impl Default for RawWal {
    fn default() -> Self {
        Self {
            batch_max: 64,
            batch_timeout: "50ms".into(),
            seg_size_bytes: "64MB".into(),
            seg_path: "./data/wal".into(),
            recover: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct RawLog {
    level: String,
    format: String,
}

impl Default for RawLog {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            engine: RawEngine::default(),
            network: RawNetwork::default(),
            wal: RawWal::default(),
            log: RawLog::default(),
        }
    }
}

/// Load `path` (if given) as a TOML file, overlay recognized `RAMDB_*`
/// environment variables, then validate. `path` absent means "defaults
/// plus environment only".
pub fn load(path: Option<&Path>) -> Result<RamdbConfig, ConfigError> {
    let mut raw = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p).map_err(|e| ConfigError::Read(p.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::Parse(p.to_path_buf(), e))?
        }
        None => RawConfig::default(),
    };
    apply_env_overrides(&mut raw)?;
    resolve(raw)
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn apply_env_overrides(raw: &mut RawConfig) -> Result<(), ConfigError> {
    if let Some(v) = env_var("RAMDB_ENGINE_TYPE") {
        raw.engine.kind = v;
    }
    if let Some(v) = env_var("RAMDB_NET_HOST") {
        raw.network.host = v;
    }
    if let Some(v) = env_var("RAMDB_NET_PORT") {
        raw.network.port = v.parse().map_err(|_| ConfigError::Invalid {
            field: "network.port",
            reason: format!("RAMDB_NET_PORT {v:?} is not a valid port number"),
        })?;
    }
    if let Some(v) = env_var("RAMDB_NET_HTTP_PORT") {
        raw.network.http_port = v.parse().map_err(|_| ConfigError::Invalid {
            field: "network.http_port",
            reason: format!("RAMDB_NET_HTTP_PORT {v:?} is not a valid port number"),
        })?;
    }
    if let Some(v) = env_var("RAMDB_NET_MAX_CONN") {
        raw.network.max_conn = v.parse().map_err(|_| ConfigError::Invalid {
            field: "network.max_conn",
            reason: format!("RAMDB_NET_MAX_CONN {v:?} is not a valid integer"),
        })?;
    }
    if let Some(v) = env_var("RAMDB_NET_TIMEOUT_MS") {
        raw.network.timeout = format!("{v}ms");
    }
    if let Some(v) = env_var("RAMDB_WAL_BATCH_MAX") {
        raw.wal.batch_max = v.parse().map_err(|_| ConfigError::Invalid {
            field: "wal.batch_max",
            reason: format!("RAMDB_WAL_BATCH_MAX {v:?} is not a valid integer"),
        })?;
    }
    if let Some(v) = env_var("RAMDB_WAL_BATCH_TIMEOUT_MS") {
        raw.wal.batch_timeout = format!("{v}ms");
    }
    if let Some(v) = env_var("RAMDB_WAL_SEG_SIZE_BYTES") {
        raw.wal.seg_size_bytes = v;
    }
    if let Some(v) = env_var("RAMDB_WAL_SEG_PATH") {
        raw.wal.seg_path = v;
    }
    if let Some(v) = env_var("RAMDB_WAL_RECOVER") {
        raw.wal.recover = v.parse().map_err(|_| ConfigError::Invalid {
            field: "wal.recover",
            reason: format!("RAMDB_WAL_RECOVER {v:?} is not a valid bool"),
        })?;
    }
    if let Some(v) = env_var("RAMDB_LOG_LEVEL") {
        raw.log.level = v;
    }
    if let Some(v) = env_var("RAMDB_LOG_FORMAT") {
        raw.log.format = v;
    }
    Ok(())
}

/// Parse every raw field and enforce its validation range, in one place,
/// after the file and environment layers have both been applied.
fn resolve(raw: RawConfig) -> Result<RamdbConfig, ConfigError> {
    let engine = match raw.engine.kind.as_str() {
        "map" => EngineType::Map,
        "wal" => EngineType::Wal,
        other => {
            return Err(ConfigError::Invalid {
                field: "engine.type",
                reason: format!("{other:?} is not one of `map`, `wal`"),
            })
        }
    };

    if raw.network.port == 0 {
        return Err(ConfigError::Invalid {
            field: "network.port",
            reason: "port must be in (0, 65536)".into(),
        });
    }
    if raw.network.http_port == 0 {
        return Err(ConfigError::Invalid {
            field: "network.http_port",
            reason: "port must be in (0, 65536)".into(),
        });
    }
    if raw.network.http_port == raw.network.port {
        return Err(ConfigError::Invalid {
            field: "network.http_port",
            reason: "must differ from network.port".into(),
        });
    }
    let timeout = parse_duration("network.timeout", &raw.network.timeout)?;
    if timeout < Duration::from_millis(1) {
        return Err(ConfigError::Invalid {
            field: "network.timeout",
            reason: "must be >= 1ms".into(),
        });
    }

    if raw.wal.batch_max == 0 {
        return Err(ConfigError::Invalid {
            field: "wal.batch_max",
            reason: "must be > 0".into(),
        });
    }
    let batch_timeout = parse_duration("wal.batch_timeout", &raw.wal.batch_timeout)?;
    if batch_timeout < Duration::from_millis(1) {
        return Err(ConfigError::Invalid {
            field: "wal.batch_timeout",
            reason: "must be >= 1ms".into(),
        });
    }
    let seg_size_bytes = parse_size::parse_size(&raw.wal.seg_size_bytes).map_err(|e| ConfigError::Invalid {
        field: "wal.seg_size_bytes",
        reason: e.to_string(),
    })?;
    if seg_size_bytes == 0 {
        return Err(ConfigError::Invalid {
            field: "wal.seg_size_bytes",
            reason: "must be > 0".into(),
        });
    }
    let seg_path = PathBuf::from(&raw.wal.seg_path);
    if engine == EngineType::Wal {
        let meta = std::fs::metadata(&seg_path).map_err(|_| ConfigError::Invalid {
            field: "wal.seg_path",
            reason: format!("{} does not exist", seg_path.display()),
        })?;
        if !meta.is_dir() {
            return Err(ConfigError::Invalid {
                field: "wal.seg_path",
                reason: format!("{} is not a directory", seg_path.display()),
            });
        }
    }

    let format = match raw.log.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        other => {
            return Err(ConfigError::Invalid {
                field: "log.format",
                reason: format!("{other:?} is not one of `pretty`, `json`"),
            })
        }
    };

    Ok(RamdbConfig {
        engine,
        network: NetworkConfig {
            host: raw.network.host,
            port: raw.network.port,
            http_port: raw.network.http_port,
            max_conn: raw.network.max_conn,
            timeout,
        },
        wal: WalConfig {
            batch_max: raw.wal.batch_max,
            batch_timeout,
            seg_size_bytes,
            seg_path,
            recover: raw.wal.recover,
        },
        log: LogConfig {
            level: raw.log.level,
            format,
        },
    })
}

fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_without_a_seg_path_check_under_map_engine() {
        let mut raw = RawConfig::default();
        raw.engine.kind = "map".into();
        let cfg = resolve(raw).unwrap();
        assert_eq!(cfg.engine, EngineType::Map);
        assert_eq!(cfg.network.port, 7070);
        assert_eq!(cfg.wal.batch_max, 64);
    }

    #[test]
    fn rejects_zero_port() {
        let mut raw = RawConfig::default();
        raw.engine.kind = "map".into();
        raw.network.port = 0;
        assert!(matches!(resolve(raw), Err(ConfigError::Invalid { field: "network.port", .. })));
    }

    #[test]
    fn rejects_sub_millisecond_batch_timeout() {
        let mut raw = RawConfig::default();
        raw.engine.kind = "map".into();
        raw.wal.batch_timeout = "100us".into();
        assert!(matches!(
            resolve(raw),
            Err(ConfigError::Invalid { field: "wal.batch_timeout", .. })
        ));
    }

    #[test]
    fn rejects_unknown_engine_type() {
        let mut raw = RawConfig::default();
        raw.engine.kind = "sqlite".into();
        assert!(matches!(resolve(raw), Err(ConfigError::Invalid { field: "engine.type", .. })));
    }

    #[test]
    fn wal_engine_requires_existing_seg_path() {
        let mut raw = RawConfig::default();
        raw.wal.seg_path = "/definitely/does/not/exist/ramdb".into();
        assert!(matches!(resolve(raw), Err(ConfigError::Invalid { field: "wal.seg_path", .. })));
    }

    #[test]
    fn wal_engine_accepts_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = RawConfig::default();
        raw.wal.seg_path = dir.path().to_string_lossy().into_owned();
        let cfg = resolve(raw).unwrap();
        assert_eq!(cfg.wal.seg_path, dir.path());
    }

    #[test]
    fn human_readable_segment_size_parses() {
        let mut raw = RawConfig::default();
        raw.engine.kind = "map".into();
        raw.wal.seg_size_bytes = "1KB".into();
        let cfg = resolve(raw).unwrap();
        assert_eq!(cfg.wal.seg_size_bytes, 1000);
    }
}
