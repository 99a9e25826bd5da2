#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Turn orchestrator that drives one game session.
//!
//! A [`Session`] owns the belief world and the behavior system. Each inbound
//! [`TurnInput`] is turned into world commands, the resulting events are
//! forwarded to the behavior system, and exactly one command batch is
//! returned.

use fog_harvest_core::{Command, Event, GridSizing, Observation, PlayerId, UnitCommand};
use fog_harvest_system_behavior::{self as behavior, Behavior};
use fog_harvest_world::{self as world, query, World};
use tracing::{debug, info, warn};

/// Silent turns tolerated before a unit is evicted, unless configured.
pub const DEFAULT_STALE_UNIT_TURNS: u64 = 50;

/// Per-session tuning shared by every connection of a server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Layout used to derive the grid from the announced map size.
    pub grid_sizing: GridSizing,
    /// Silent turns tolerated before a unit is evicted; zero disables it.
    pub stale_unit_turns: u64,
    /// Seed of the random fallback used when no path exists.
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grid_sizing: GridSizing::default(),
            stale_unit_turns: DEFAULT_STALE_UNIT_TURNS,
            seed: 0,
        }
    }
}

/// Map announcement carried by the first message of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapInit {
    /// Announced map width in tiles.
    pub columns: u32,
    /// Announced map height in tiles.
    pub rows: u32,
    /// Player controlled by this session, when announced.
    pub player: Option<PlayerId>,
}

/// Decoded contents of one inbound message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TurnInput {
    /// Map announcement, if the message carried one.
    pub init: Option<MapInit>,
    /// Tile and unit deltas for the turn.
    pub observation: Observation,
}

/// Belief world and behavior state for a single connection.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    world: World,
    behavior: Behavior,
    events: Vec<Event>,
}

impl Session {
    /// Creates a session with an uninitialised world.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            world: World::with_config(world::Config::new(config.stale_unit_turns)),
            behavior: Behavior::new(behavior::Config::new(config.seed)),
            events: Vec::new(),
        }
    }

    /// Belief world maintained by the session.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Behavior system maintained by the session.
    #[must_use]
    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Processes one inbound message and returns the command batch for it.
    pub fn handle_turn(&mut self, input: TurnInput) -> Vec<UnitCommand> {
        self.events.clear();

        if let Some(init) = input.init {
            if query::is_initialized(&self.world) {
                debug!(
                    columns = init.columns,
                    rows = init.rows,
                    "session.init_ignored"
                );
            } else {
                world::apply(
                    &mut self.world,
                    Command::InitializeMap {
                        columns: init.columns,
                        rows: init.rows,
                        sizing: self.config.grid_sizing,
                        player: init.player,
                    },
                    &mut self.events,
                );
            }
        }

        world::apply(
            &mut self.world,
            Command::ApplyObservation {
                observation: input.observation,
            },
            &mut self.events,
        );

        let turn = query::turn(&self.world);
        for event in &self.events {
            log_event(turn, event);
        }

        let mut commands = Vec::new();
        self.behavior.handle(
            &self.events,
            query::belief_view(&self.world),
            &query::controlled_units(&self.world),
            &mut commands,
        );
        debug!(turn, commands = commands.len(), "session.turn_planned");
        commands
    }
}

fn log_event(turn: u64, event: &Event) {
    match event {
        Event::MapInitialized { columns, rows } => {
            info!(turn, columns, rows, "world.map_initialized");
        }
        Event::MapInitializationRejected { reason } => {
            warn!(turn, %reason, "world.map_rejected");
        }
        Event::TileObservationDropped { column, row } => {
            debug!(turn, column, row, "world.tile_dropped");
        }
        Event::ResourceDiscovered { cell } => {
            debug!(turn, column = cell.column(), row = cell.row(), "world.resource_discovered");
        }
        Event::UnitSighted { unit, kind } => {
            debug!(turn, unit = %unit, ?kind, "world.unit_sighted");
        }
        Event::UnitEvicted { unit } => {
            debug!(turn, unit = %unit, "world.unit_evicted");
        }
        Event::TurnStarted { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_pads_and_evicts_after_fifty_turns() {
        let config = SessionConfig::default();
        assert_eq!(config.grid_sizing, GridSizing::Padded);
        assert_eq!(config.stale_unit_turns, 50);
    }

    #[test]
    fn empty_input_yields_empty_batch() {
        let mut session = Session::new(SessionConfig::default());
        assert!(session.handle_turn(TurnInput::default()).is_empty());
        assert_eq!(query::turn(session.world()), 1);
        assert!(!query::is_initialized(session.world()));
    }
}
