//! Configuration: a `serde`/`toml`-deserialized file provides a base, CLI
//! flags (parsed by the binary with `clap`) override it, and compiled-in
//! constants are the final fallback. No process-global state — callers
//! build a `Config` once at startup and pass it down explicitly.

use serde::Deserialize;

use crate::DEFAULT_PORT;

/// Append-only file fsync policy.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FsyncPolicy {
    /// Fsync after every append.
    Always,
    /// Fsync at most once per second.
    Everysec,
    /// Leave fsync scheduling to the OS.
    No,
}

impl Default for FsyncPolicy {
    fn default() -> Self {
        FsyncPolicy::Everysec
    }
}

impl std::str::FromStr for FsyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(FsyncPolicy::Always),
            "everysec" => Ok(FsyncPolicy::Everysec),
            "no" => Ok(FsyncPolicy::No),
            other => Err(format!("unknown fsync policy '{other}'")),
        }
    }
}

/// Shape of the optional on-disk TOML config file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    aof: AofSection,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct ServerSection {
    listen: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
    max_connections: Option<usize>,
    gc_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct AofSection {
    path: Option<String>,
    fsync: Option<String>,
    rewrite_growth_ratio: Option<f64>,
}

/// Fully resolved configuration used by the rest of the crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub port: u16,
    pub log_level: String,
    pub max_connections: usize,
    pub gc_interval_secs: u64,
    pub aof_path: String,
    pub aof_fsync: FsyncPolicy,
    /// Trigger a background rewrite once the live log has grown to this
    /// multiple of the size it had after the last rewrite.
    pub rewrite_growth_ratio: f64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            listen: "0.0.0.0".to_owned(),
            port: DEFAULT_PORT.parse().expect("DEFAULT_PORT is a valid u16"),
            log_level: "info".to_owned(),
            max_connections: 10_000,
            gc_interval_secs: 60,
            aof_path: "./rukv.aof".to_owned(),
            aof_fsync: FsyncPolicy::default(),
            rewrite_growth_ratio: 2.0,
        }
    }
}

/// CLI overrides, one field per configurable knob. Every field is optional
/// so the CLI layer only overrides what the user actually passed.
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub max_connections: Option<usize>,
    pub aof_path: Option<String>,
    pub aof_fsync: Option<FsyncPolicy>,
}

impl Config {
    /// Layer a file config (if any) over the compiled-in defaults, then
    /// layer CLI overrides (if any) on top of that.
    pub fn resolve(file: Option<FileConfig>, cli: CliOverrides) -> Config {
        let mut config = Config::default();

        if let Some(file) = file {
            if let Some(v) = file.server.listen {
                config.listen = v;
            }
            if let Some(v) = file.server.port {
                config.port = v;
            }
            if let Some(v) = file.server.log_level {
                config.log_level = v;
            }
            if let Some(v) = file.server.max_connections {
                config.max_connections = v;
            }
            if let Some(v) = file.server.gc_interval_secs {
                config.gc_interval_secs = v;
            }
            if let Some(v) = file.aof.path {
                config.aof_path = v;
            }
            if let Some(v) = file.aof.fsync.and_then(|s| s.parse().ok()) {
                config.aof_fsync = v;
            }
            if let Some(v) = file.aof.rewrite_growth_ratio {
                config.rewrite_growth_ratio = v;
            }
        }

        if let Some(v) = cli.listen {
            config.listen = v;
        }
        if let Some(v) = cli.port {
            config.port = v;
        }
        if let Some(v) = cli.log_level {
            config.log_level = v;
        }
        if let Some(v) = cli.max_connections {
            config.max_connections = v;
        }
        if let Some(v) = cli.aof_path {
            config.aof_path = v;
        }
        if let Some(v) = cli.aof_fsync {
            config.aof_fsync = v;
        }

        config
    }
}
