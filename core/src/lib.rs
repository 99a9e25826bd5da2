#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Fog Harvest controller.
//!
//! This crate defines the message surface that connects adapters, the
//! belief-state world, and pure systems. The turn orchestrator submits
//! [`Command`] values describing belief mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to. Systems read immutable views such as
//! [`BeliefView`] and [`UnitView`] and respond exclusively with
//! [`UnitCommand`] batches bound for the game server.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible belief-state mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Allocates the belief grid from the dimensions announced by the server.
    InitializeMap {
        /// Number of tile columns announced for the play area.
        columns: u32,
        /// Number of tile rows announced for the play area.
        rows: u32,
        /// Layout used to derive the grid dimensions from the announced size.
        sizing: GridSizing,
        /// Player controlled by this session, when the server announced it.
        player: Option<PlayerId>,
    },
    /// Merges one turn's partial observation into the belief state.
    ApplyObservation {
        /// Tile and unit deltas reported for the turn.
        observation: Observation,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the belief grid was allocated.
    MapInitialized {
        /// Number of columns in the allocated grid.
        columns: u32,
        /// Number of rows in the allocated grid.
        rows: u32,
    },
    /// Reports that a map initialization request was rejected.
    MapInitializationRejected {
        /// Specific reason the initialization failed.
        reason: MapError,
    },
    /// Announces that a new observation began processing.
    TurnStarted {
        /// One-based index of the turn.
        turn: u64,
    },
    /// Reports a tile delta that fell outside the belief grid and was ignored.
    TileObservationDropped {
        /// Column reported by the observation.
        column: u32,
        /// Row reported by the observation.
        row: u32,
    },
    /// Announces that a tile is now believed to hold a resource deposit.
    ResourceDiscovered {
        /// Cell containing the deposit.
        cell: CellCoord,
    },
    /// Announces the first sighting of a unit.
    UnitSighted {
        /// Identifier of the unit.
        unit: UnitId,
        /// Kind reported for the unit.
        kind: UnitKind,
    },
    /// Confirms that a unit was removed from the unit table.
    UnitEvicted {
        /// Identifier of the removed unit.
        unit: UnitId,
    },
}

/// Orders issued to controlled units and sent back to the game server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitCommand {
    /// Requests that the unit step one tile in the given direction.
    Move {
        /// Unit receiving the order.
        unit: UnitId,
        /// Direction of the step.
        direction: Direction,
    },
    /// Requests that the unit harvest the adjacent tile in the given direction.
    Gather {
        /// Unit receiving the order.
        unit: UnitId,
        /// Direction of the harvested tile.
        direction: Direction,
    },
}

impl UnitCommand {
    /// Unit the command is addressed to.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        match self {
            Self::Move { unit, .. } | Self::Gather { unit, .. } => *unit,
        }
    }

    /// Direction carried by the command.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        match self {
            Self::Move { direction, .. } | Self::Gather { direction, .. } => *direction,
        }
    }
}

/// Reasons a map initialization request may be rejected by the world.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapError {
    /// The belief grid was already allocated for this session.
    #[error("belief map is already initialized")]
    AlreadyInitialized,
    /// The announced dimensions describe an empty or unrepresentable grid.
    #[error("map dimensions {columns}x{rows} cannot be allocated")]
    InvalidDimensions {
        /// Announced column count.
        columns: u32,
        /// Announced row count.
        rows: u32,
    },
}

/// Strategy that maps the announced play-area size onto belief grid dimensions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridSizing {
    /// Grid exactly as large as the announced play area.
    Exact,
    /// Grid of `2 * columns + 1` by `2 * rows + 1` with the spawn point in
    /// the middle, so spawn-relative coordinates in `[-columns, columns]`
    /// and `[-rows, rows]` all have a cell.
    #[default]
    Padded,
}

impl GridSizing {
    /// Resolves the belief grid dimensions for the announced play area.
    ///
    /// Returns `None` when either dimension is zero or the padded layout
    /// would overflow.
    #[must_use]
    pub fn dimensions(self, columns: u32, rows: u32) -> Option<(u32, u32)> {
        if columns == 0 || rows == 0 {
            return None;
        }

        match self {
            Self::Exact => Some((columns, rows)),
            Self::Padded => {
                let columns = columns.checked_mul(2)?.checked_add(1)?;
                let rows = rows.checked_mul(2)?.checked_add(1)?;
                Some((columns, rows))
            }
        }
    }

    /// Grid cell that the server's coordinate `(0, 0)` maps to.
    ///
    /// The padded layout centres the spawn-relative coordinate space, so a
    /// reported `(x, y)` lives at `(x + columns, y + rows)`.
    #[must_use]
    pub const fn origin(self, columns: u32, rows: u32) -> (u32, u32) {
        match self {
            Self::Exact => (0, 0),
            Self::Padded => (columns, rows),
        }
    }
}

impl FromStr for GridSizing {
    type Err = UnknownGridSizing;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "padded" => Ok(Self::Padded),
            _ => Err(UnknownGridSizing(value.to_owned())),
        }
    }
}

impl fmt::Display for GridSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Padded => write!(f, "padded"),
        }
    }
}

/// Error produced when a grid sizing label is not recognised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown grid sizing '{0}', expected 'exact' or 'padded'")]
pub struct UnknownGridSizing(String);

/// Cardinal movement directions available to units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction obtained by turning 90 degrees clockwise.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }

    /// Direction of travel between two orthogonally adjacent cells.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Self::East)
            } else {
                Some(Self::West)
            }
        } else if to.row() > from.row() {
            Some(Self::South)
        } else {
            Some(Self::North)
        }
    }
}

/// Unique identifier assigned to a unit by the game server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u64);

impl UnitId {
    /// Creates a new unit identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a player taking part in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u64);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// The column corresponds to the protocol's `x` and the row to its `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Neighbouring cell one step away in the given direction.
    ///
    /// Returns `None` when the step would leave the representable range; grid
    /// bounds are checked separately through [`BeliefView::in_bounds`].
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => Some(Self::new(self.column, self.row.checked_sub(1)?)),
            Direction::East => Some(Self::new(self.column.checked_add(1)?, self.row)),
            Direction::South => Some(Self::new(self.column, self.row.checked_add(1)?)),
            Direction::West => Some(Self::new(self.column.checked_sub(1)?, self.row)),
        }
    }
}

impl Ord for CellCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.row, self.column).cmp(&(other.row, other.column))
    }
}

impl PartialOrd for CellCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Resource deposit believed to sit on a tile.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDeposit {
    /// Resource type label reported by the server.
    pub kind: String,
    /// Amount left in the deposit when it was last observed.
    pub remaining: u32,
    /// Amount a worker carries away per gather.
    pub unit_value: u32,
}

/// Belief-state contents of a single grid cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tile {
    /// The cell was never observed.
    #[default]
    Unknown,
    /// The cell was observed open.
    Empty,
    /// The cell was observed blocked; walls are permanent.
    Wall,
    /// The cell holds a resource deposit.
    ResourceDeposit(ResourceDeposit),
    /// The cell hosts one of the controlled player's bases.
    FriendlyBase,
    /// The cell was observed occupied by a unit that is not a friendly base.
    EnemyPresence,
}

impl Tile {
    /// Classification of the tile without its payload.
    #[must_use]
    pub const fn category(&self) -> TileCategory {
        match self {
            Self::Unknown => TileCategory::Unknown,
            Self::Empty => TileCategory::Empty,
            Self::Wall => TileCategory::Wall,
            Self::ResourceDeposit(_) => TileCategory::ResourceDeposit,
            Self::FriendlyBase => TileCategory::FriendlyBase,
            Self::EnemyPresence => TileCategory::EnemyPresence,
        }
    }
}

/// Payload-free classification of a tile, used for queries and goals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileCategory {
    /// Never observed.
    Unknown,
    /// Observed open.
    Empty,
    /// Observed blocked.
    Wall,
    /// Holds a resource deposit.
    ResourceDeposit,
    /// Hosts a friendly base.
    FriendlyBase,
    /// Occupied by another unit.
    EnemyPresence,
}

/// Kinds of units reported by the game server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Resource gathering unit.
    Worker,
    /// Fast exploration unit.
    Scout,
    /// Combat unit.
    Tank,
    /// Stationary base that accepts deliveries.
    Base,
    /// Any kind this controller does not recognise.
    Other,
}

/// Activity status reported for a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    /// Awaiting orders.
    Idle,
    /// Executing a previous move order.
    Moving,
    /// Destroyed.
    Dead,
    /// Any status this controller does not recognise.
    Other,
}

/// Partial view of the map and units reported for one turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// Tile deltas, in the order reported.
    pub tiles: Vec<TileObservation>,
    /// Unit deltas, in the order reported.
    pub units: Vec<UnitObservation>,
}

/// Observation of a single tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileObservation {
    /// Cell the observation refers to.
    pub cell: CellCoord,
    /// Whether the tile is currently within sight.
    pub visible: bool,
    /// Whether the tile blocks movement.
    pub blocked: bool,
    /// Resource deposit on the tile, if any.
    pub resource: Option<ResourceDeposit>,
    /// Whether any unit occupies the tile.
    pub occupied: bool,
}

/// Full record of a unit as reported in one observation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitObservation {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Kind of the unit.
    pub kind: UnitKind,
    /// Cell the unit occupies.
    pub cell: CellCoord,
    /// Activity status of the unit.
    pub status: UnitStatus,
    /// Amount of resource the unit carries.
    pub carried: u32,
    /// Remaining health points.
    pub health: i64,
    /// Owning player, when reported.
    pub owner: Option<PlayerId>,
}

/// Immutable representation of a unit's believed state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Identifier of the unit.
    pub id: UnitId,
    /// Kind of the unit.
    pub kind: UnitKind,
    /// Cell the unit occupied when last seen.
    pub cell: CellCoord,
    /// Activity status when last seen.
    pub status: UnitStatus,
    /// Amount of resource carried when last seen.
    pub carried: u32,
    /// Health when last seen.
    pub health: i64,
    /// Owning player, when reported.
    pub owner: Option<PlayerId>,
    /// Turn in which the unit was last reported.
    pub last_seen_turn: u64,
}

impl UnitSnapshot {
    /// Reports whether the unit is still believed to be alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status != UnitStatus::Dead
    }
}

/// Read-only snapshot describing all known units.
#[derive(Clone, Debug, Default)]
pub struct UnitView {
    snapshots: Vec<UnitSnapshot>,
}

impl UnitView {
    /// Creates a new unit view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<UnitSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured unit snapshots in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a single unit.
    #[must_use]
    pub fn get(&self, unit: UnitId) -> Option<&UnitSnapshot> {
        self.snapshots
            .binary_search_by_key(&unit, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of units captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Read-only view into the dense belief grid.
#[derive(Clone, Copy, Debug)]
pub struct BeliefView<'a> {
    tiles: &'a [Tile],
    columns: u32,
    rows: u32,
}

impl<'a> BeliefView<'a> {
    /// Captures a new belief view backed by the provided row-major tile slice.
    #[must_use]
    pub fn new(tiles: &'a [Tile], columns: u32, rows: u32) -> Self {
        Self {
            tiles,
            columns,
            rows,
        }
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Returns the believed tile at the provided cell.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<&'a Tile> {
        self.index(cell).and_then(|index| self.tiles.get(index))
    }

    /// Returns the believed category of the provided cell.
    #[must_use]
    pub fn category(&self, cell: CellCoord) -> Option<TileCategory> {
        self.tile(cell).map(Tile::category)
    }

    /// Reports whether planning may route through the cell.
    #[must_use]
    pub fn is_passable(&self, cell: CellCoord) -> bool {
        self.category(cell)
            .is_some_and(|category| category != TileCategory::Wall)
    }

    /// First cell of the category in row-major scan order.
    ///
    /// The scan order is not a distance measure: callers that need the
    /// closest match must compare candidates themselves.
    #[must_use]
    pub fn nearest_of_category(&self, category: TileCategory) -> Option<CellCoord> {
        self.cells_of_category(category).next()
    }

    /// All cells of the category in row-major scan order.
    pub fn cells_of_category(
        &self,
        category: TileCategory,
    ) -> impl Iterator<Item = CellCoord> + 'a {
        let columns = self.columns;
        self.tiles
            .iter()
            .enumerate()
            .filter(move |(_, tile)| tile.category() == category)
            .filter_map(move |(index, _)| {
                let index = u32::try_from(index).ok()?;
                Some(CellCoord::new(index % columns, index / columns))
            })
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
