//! Runtime configuration for the bridge.
//!
//! Loaded from `bridge_config.json`, overridable through `AI_BRIDGE_CONFIG_PATH`.

use std::{
    env, fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::bridge::QueueFullPolicy;

pub const BUILTIN_BRIDGE_CONFIG: &str = include_str!("data/bridge_config.json");
pub const CONFIG_PATH_ENV: &str = "AI_BRIDGE_CONFIG_PATH";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub observation: ObservationConfig,
    pub queue: QueueConfig,
    pub host: HostConfig,
}

impl BridgeConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_BRIDGE_CONFIG).expect("builtin bridge config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        BridgeConfig::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid("queue.capacity must be at least 1"));
        }
        if self.server.max_frame_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_frame_bytes must be at least 1"));
        }
        if self.host.tick_ms == 0 {
            return Err(ConfigError::Invalid("host.tick_ms must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub max_frame_bytes: usize,
    pub shutdown_timeout_ms: u64,
    pub observation_timeout_ms: u64,
    pub accept_poll_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5555)),
            max_frame_bytes: bridge_runtime::DEFAULT_MAX_FRAME_BYTES,
            shutdown_timeout_ms: 2_000,
            observation_timeout_ms: 5_000,
            accept_poll_ms: 50,
        }
    }
}

impl ServerConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn observation_timeout(&self) -> Duration {
        Duration::from_millis(self.observation_timeout_ms)
    }

    pub fn accept_poll(&self) -> Duration {
        Duration::from_millis(self.accept_poll_ms.max(1))
    }
}

/// Radii are Chebyshev tile distances from the controlled entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    pub npc_radius: i32,
    pub ground_item_radius: i32,
    pub max_npcs: usize,
    pub max_inventory_items: usize,
    pub max_ground_items: usize,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            npc_radius: 10,
            ground_item_radius: 10,
            max_npcs: 10,
            max_inventory_items: 28,
            max_ground_items: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullPolicyKind {
    Reject,
    DropOldest,
    Block,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub capacity: usize,
    pub full_policy: FullPolicyKind,
    pub block_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            full_policy: FullPolicyKind::Block,
            block_timeout_ms: 100,
        }
    }
}

impl QueueConfig {
    pub fn policy(&self) -> QueueFullPolicy {
        match self.full_policy {
            FullPolicyKind::Reject => QueueFullPolicy::Reject,
            FullPolicyKind::DropOldest => QueueFullPolicy::DropOldest,
            FullPolicyKind::Block => {
                QueueFullPolicy::Block(Duration::from_millis(self.block_timeout_ms))
            }
        }
    }
}

/// Tick loop of the headless host in the `server` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub tick_ms: u64,
    pub max_ticks: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            tick_ms: 600,
            max_ticks: None,
        }
    }
}

impl HostConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse bridge config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read bridge config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid bridge config: {0}")]
    Invalid(&'static str),
}

/// Where the active configuration came from.
#[derive(Debug, Clone)]
pub struct BridgeConfigMetadata {
    path: Option<PathBuf>,
}

impl BridgeConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

/// Load the bridge configuration from `AI_BRIDGE_CONFIG_PATH`, falling back to
/// the builtin copy.
pub fn load_bridge_config_from_env() -> (Arc<BridgeConfig>, BridgeConfigMetadata) {
    let Some(path) = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) else {
        tracing::info!(target: "ai_bridge::config", "bridge_config.loaded=builtin");
        return (BridgeConfig::builtin(), BridgeConfigMetadata::new(None));
    };

    match BridgeConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "ai_bridge::config",
                path = %path.display(),
                "bridge_config.loaded=file"
            );
            (Arc::new(config), BridgeConfigMetadata::new(Some(path)))
        }
        Err(err) => {
            tracing::warn!(
                target: "ai_bridge::config",
                path = %path.display(),
                error = %err,
                "bridge_config.load_failed"
            );
            tracing::info!(target: "ai_bridge::config", "bridge_config.loaded=builtin");
            (BridgeConfig::builtin(), BridgeConfigMetadata::new(None))
        }
    }
}
