use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use fog_harvest_core::GridSizing;
use fog_harvest_system_turn::{SessionConfig, DEFAULT_STALE_UNIT_TURNS};
use serde::Deserialize;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 9090;

/// Command-line arguments accepted by the Fog Harvest server.
#[derive(Debug, Default, Parser)]
#[command(
    name = "fog-harvest",
    about = "Turn-based grid-world agent controller served over JSON lines"
)]
pub(crate) struct CliArgs {
    /// Optional TOML file providing defaults for every other flag.
    #[arg(long, value_name = "PATH")]
    pub(crate) config: Option<PathBuf>,
    /// Address the listener binds to.
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Port the listener binds to.
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Belief grid layout derived from the announced map size.
    #[arg(long, value_name = "exact|padded")]
    pub(crate) grid_sizing: Option<GridSizing>,
    /// Silent turns tolerated before a unit is forgotten; 0 disables it.
    #[arg(long, value_name = "N")]
    pub(crate) stale_unit_turns: Option<u64>,
    /// Seed for the random movement fallback; drawn from entropy otherwise.
    #[arg(long, value_name = "S")]
    pub(crate) seed: Option<u64>,
}

/// Fully resolved server settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) grid_sizing: GridSizing,
    pub(crate) stale_unit_turns: u64,
    pub(crate) seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            grid_sizing: GridSizing::default(),
            stale_unit_turns: DEFAULT_STALE_UNIT_TURNS,
            seed: None,
        }
    }
}

impl ServerConfig {
    /// Loads the optional config file, then applies command-line overrides.
    pub(crate) fn resolve(args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        Ok(config)
    }

    fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config at {}", path.display()))
    }

    fn parse(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("failed to parse TOML")
    }

    fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(host) = &args.host {
            self.host.clone_from(host);
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(grid_sizing) = args.grid_sizing {
            self.grid_sizing = grid_sizing;
        }
        if let Some(stale_unit_turns) = args.stale_unit_turns {
            self.stale_unit_turns = stale_unit_turns;
        }
        if args.seed.is_some() {
            self.seed = args.seed;
        }
    }

    pub(crate) fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for a new session; every session draws a fresh seed unless
    /// one was configured.
    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            grid_sizing: self.grid_sizing,
            stale_unit_turns: self.stale_unit_turns,
            seed: self.seed.unwrap_or_else(rand::random),
        }
    }
}
