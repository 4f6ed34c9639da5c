//! Simulation side of the AI bridge.
//!
//! The request server runs on its own thread and never reads world state.
//! Everything that does goes through the [`bridge`] queue and runs on the
//! thread that owns the [`world::GameClient`].

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod executor;
pub mod headless;
pub mod metrics;
pub mod resolver;
pub mod server;
pub mod snapshot;
pub mod translator;
pub mod world;

pub use bridge::{
    bridge, BridgeError, BridgeHandle, BridgePump, Job, PumpReport, QueueFullPolicy, UnitOfWork,
};
pub use config::{
    load_bridge_config_from_env, BridgeConfig, BridgeConfigMetadata, ConfigError, HostConfig,
    ObservationConfig, QueueConfig, ServerConfig,
};
pub use dispatch::RequestHandler;
pub use executor::{action_unit, execute_action, ExecError, ExecOutcome};
pub use headless::HeadlessClient;
pub use metrics::{BridgeMetrics, MetricsSnapshot};
pub use resolver::{resolve, Resolution, ResolvedTarget};
pub use server::{RequestServer, ServerError, ShutdownReport};
pub use snapshot::{build_observation, ObservationError};
pub use translator::{translate, Primitive};
pub use world::{GameClient, GameState};
