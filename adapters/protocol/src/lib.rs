#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! JSON-lines wire codec between the game server and the turn orchestrator.
//!
//! Each inbound line is one JSON object describing a turn; each outbound line
//! is one compact JSON object holding the command batch for that turn.

use fog_harvest_core::{
    CellCoord, Direction, GridSizing, Observation, PlayerId, ResourceDeposit, TileObservation,
    UnitCommand, UnitId, UnitKind, UnitObservation, UnitStatus,
};
use fog_harvest_system_turn::{MapInit, TurnInput};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while translating between wire lines and turn data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The inbound line was not a well-formed turn message.
    #[error("malformed turn message: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The outbound command batch could not be serialized.
    #[error("failed to encode command batch: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Stateful decoder that maps the server's coordinates onto belief cells.
///
/// The first map announcement fixes the origin for the rest of the session:
/// under [`GridSizing::Padded`] spawn-relative coordinates in `[-w, w]` are
/// shifted into the middle of the grid, under [`GridSizing::Exact`] they are
/// used as is. Directions are translation invariant, so encoded commands
/// need no inverse mapping.
#[derive(Clone, Copy, Debug)]
pub struct TurnDecoder {
    sizing: GridSizing,
    origin: Option<(i64, i64)>,
}

impl TurnDecoder {
    /// Creates a decoder for a session using the given grid layout.
    #[must_use]
    pub const fn new(sizing: GridSizing) -> Self {
        Self {
            sizing,
            origin: None,
        }
    }

    /// Grid cell of the server's `(0, 0)`, once a map was announced.
    #[must_use]
    pub fn origin(&self) -> Option<CellCoord> {
        let (x, y) = self.origin?;
        Some(CellCoord::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?))
    }

    /// Decodes one inbound line into a turn input.
    ///
    /// Missing lists are treated as empty and unknown keys are ignored.
    /// Records whose shifted coordinates fall below zero are dropped; cells
    /// past the far edge are left for the world to reject.
    pub fn decode(&mut self, line: &str) -> Result<TurnInput, ProtocolError> {
        let message: WireTurn = serde_json::from_str(line).map_err(ProtocolError::Malformed)?;
        let player = message.player.map(PlayerId::new);

        let init = message.game_info.map(|info| {
            if self.origin.is_none() {
                let (x, y) = self.sizing.origin(info.map_width, info.map_height);
                self.origin = Some((i64::from(x), i64::from(y)));
            }
            MapInit {
                columns: info.map_width,
                rows: info.map_height,
                player,
            }
        });

        let origin = self.origin.unwrap_or((0, 0));
        let tiles = message
            .tile_updates
            .into_iter()
            .filter_map(|tile| tile.into_observation(origin))
            .collect();
        let units = message
            .unit_updates
            .into_iter()
            .filter_map(|unit| unit.into_observation(origin))
            .collect();

        Ok(TurnInput {
            init,
            observation: Observation { tiles, units },
        })
    }
}

/// Encodes a command batch as one compact line terminated by `\n`.
pub fn encode_commands(commands: &[UnitCommand]) -> Result<String, ProtocolError> {
    let batch = WireBatch {
        commands: commands.iter().map(WireCommand::from).collect(),
    };
    let mut line = serde_json::to_string(&batch).map_err(ProtocolError::Encode)?;
    line.push('\n');
    Ok(line)
}

/// Parses a wire unit type; unrecognised labels map to [`UnitKind::Other`].
#[must_use]
pub fn parse_unit_kind(label: &str) -> UnitKind {
    match label.to_ascii_lowercase().as_str() {
        "worker" => UnitKind::Worker,
        "scout" => UnitKind::Scout,
        "tank" => UnitKind::Tank,
        "base" => UnitKind::Base,
        _ => UnitKind::Other,
    }
}

/// Parses a wire unit status; unrecognised labels map to [`UnitStatus::Other`].
#[must_use]
pub fn parse_unit_status(label: &str) -> UnitStatus {
    match label.to_ascii_lowercase().as_str() {
        "idle" => UnitStatus::Idle,
        "moving" => UnitStatus::Moving,
        "dead" => UnitStatus::Dead,
        _ => UnitStatus::Other,
    }
}

/// Single-letter wire label of a direction.
#[must_use]
pub const fn direction_label(direction: Direction) -> &'static str {
    match direction {
        Direction::North => "N",
        Direction::East => "E",
        Direction::South => "S",
        Direction::West => "W",
    }
}

#[derive(Debug, Deserialize)]
struct WireTurn {
    #[serde(default)]
    game_info: Option<WireGameInfo>,
    #[serde(default)]
    player: Option<u64>,
    #[serde(default)]
    tile_updates: Vec<WireTile>,
    #[serde(default)]
    unit_updates: Vec<WireUnit>,
}

#[derive(Debug, Deserialize)]
struct WireGameInfo {
    map_width: u32,
    map_height: u32,
}

#[derive(Debug, Deserialize)]
struct WireTile {
    x: i64,
    y: i64,
    #[serde(default)]
    visible: bool,
    #[serde(default)]
    blocked: bool,
    #[serde(default)]
    resources: Option<WireResource>,
    /// Either a flag or the list of occupants, depending on the server.
    #[serde(default)]
    units: serde_json::Value,
}

impl WireTile {
    fn into_observation(self, origin: (i64, i64)) -> Option<TileObservation> {
        let cell = cell_from_wire(origin, self.x, self.y)?;
        Some(TileObservation {
            cell,
            visible: self.visible,
            blocked: self.blocked,
            resource: self.resources.map(WireResource::into_deposit),
            occupied: is_truthy(&self.units),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireResource {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    total: u32,
    #[serde(default)]
    value: u32,
}

impl WireResource {
    fn into_deposit(self) -> ResourceDeposit {
        ResourceDeposit {
            kind: self.kind,
            remaining: self.total,
            unit_value: self.value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUnit {
    id: u64,
    #[serde(rename = "type", default)]
    kind: String,
    x: i64,
    y: i64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    resource: Option<u32>,
    #[serde(default)]
    health: Option<i64>,
    #[serde(default)]
    player_id: Option<u64>,
}

impl WireUnit {
    fn into_observation(self, origin: (i64, i64)) -> Option<UnitObservation> {
        let cell = cell_from_wire(origin, self.x, self.y)?;
        Some(UnitObservation {
            id: UnitId::new(self.id),
            kind: parse_unit_kind(&self.kind),
            cell,
            status: self
                .status
                .as_deref()
                .map_or(UnitStatus::Idle, parse_unit_status),
            carried: self.resource.unwrap_or(0),
            health: self.health.unwrap_or(0),
            owner: self.player_id.map(PlayerId::new),
        })
    }
}

#[derive(Debug, Serialize)]
struct WireBatch {
    commands: Vec<WireCommand>,
}

#[derive(Debug, Serialize)]
struct WireCommand {
    command: &'static str,
    unit: u64,
    dir: &'static str,
}

impl From<&UnitCommand> for WireCommand {
    fn from(command: &UnitCommand) -> Self {
        let label = match command {
            UnitCommand::Move { .. } => "MOVE",
            UnitCommand::Gather { .. } => "GATHER",
        };
        Self {
            command: label,
            unit: command.unit().get(),
            dir: direction_label(command.direction()),
        }
    }
}

fn cell_from_wire(origin: (i64, i64), x: i64, y: i64) -> Option<CellCoord> {
    let column = u32::try_from(x.checked_add(origin.0)?).ok()?;
    let row = u32::try_from(y.checked_add(origin.1)?).ok()?;
    Some(CellCoord::new(column, row))
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => *flag,
        serde_json::Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        serde_json::Value::String(text) => !text.is_empty(),
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(fields) => !fields.is_empty(),
    }
}
