#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Private belief state of the game world for one Fog Harvest session.
//!
//! The world never sees the true map. It accumulates the partial
//! observations the server reports each turn: tiles that are not currently
//! visible keep whatever was last believed about them, and units keep their
//! last reported record until they are evicted.

use std::collections::{BTreeMap, BTreeSet};

use fog_harvest_core::{
    CellCoord, Command, Event, GridSizing, MapError, Observation, PlayerId, Tile, TileCategory,
    TileObservation, UnitId, UnitKind, UnitObservation, UnitSnapshot, UnitStatus,
};

const DEFAULT_STALE_UNIT_TURNS: u64 = 50;

/// Configuration parameters required to construct the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    stale_unit_turns: u64,
}

impl Config {
    /// Creates a configuration that evicts units silent for more than
    /// `stale_unit_turns` turns. Zero disables silence-based eviction.
    #[must_use]
    pub const fn new(stale_unit_turns: u64) -> Self {
        Self { stale_unit_turns }
    }

    /// Number of silent turns tolerated before a unit is evicted.
    #[must_use]
    pub const fn stale_unit_turns(&self) -> u64 {
        self.stale_unit_turns
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_UNIT_TURNS)
    }
}

/// Represents the believed state of the map and units for one session.
#[derive(Debug)]
pub struct World {
    config: Config,
    grid: Option<BeliefGrid>,
    player: Option<PlayerId>,
    units: BTreeMap<UnitId, Unit>,
    turn: u64,
}

impl World {
    /// Creates an uninitialised world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an uninitialised world using the supplied configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            grid: None,
            player: None,
            units: BTreeMap::new(),
            turn: 0,
        }
    }

    fn initialize(
        &mut self,
        columns: u32,
        rows: u32,
        sizing: GridSizing,
        player: Option<PlayerId>,
        out_events: &mut Vec<Event>,
    ) {
        if self.grid.is_some() {
            out_events.push(Event::MapInitializationRejected {
                reason: MapError::AlreadyInitialized,
            });
            return;
        }

        let Some(grid) = sizing
            .dimensions(columns, rows)
            .and_then(|(width, height)| BeliefGrid::new(width, height))
        else {
            out_events.push(Event::MapInitializationRejected {
                reason: MapError::InvalidDimensions { columns, rows },
            });
            return;
        };

        let (width, height) = grid.dimensions();
        self.grid = Some(grid);
        self.player = player;
        out_events.push(Event::MapInitialized {
            columns: width,
            rows: height,
        });
    }

    fn apply_observation(&mut self, observation: Observation, out_events: &mut Vec<Event>) {
        self.turn = self.turn.saturating_add(1);
        out_events.push(Event::TurnStarted { turn: self.turn });

        let friendly_bases = self.friendly_base_cells(&observation.units);
        for tile in &observation.tiles {
            self.merge_tile(tile, &friendly_bases, out_events);
        }

        for unit in observation.units {
            self.merge_unit(unit, out_events);
        }

        self.mark_friendly_bases();
        self.evict_units(out_events);
    }

    fn merge_tile(
        &mut self,
        observation: &TileObservation,
        friendly_bases: &BTreeSet<CellCoord>,
        out_events: &mut Vec<Event>,
    ) {
        if !observation.visible {
            return;
        }

        let cell = observation.cell;
        let Some(slot) = self.grid.as_mut().and_then(|grid| grid.tile_mut(cell)) else {
            out_events.push(Event::TileObservationDropped {
                column: cell.column(),
                row: cell.row(),
            });
            return;
        };

        let next = classify(observation, friendly_bases.contains(&cell));
        if *slot == Tile::Wall && !matches!(next, Tile::FriendlyBase) {
            return;
        }

        let discovered = matches!(next, Tile::ResourceDeposit(_))
            && slot.category() != TileCategory::ResourceDeposit;
        *slot = next;
        if discovered {
            out_events.push(Event::ResourceDiscovered { cell });
        }
    }

    fn merge_unit(&mut self, observation: UnitObservation, out_events: &mut Vec<Event>) {
        let unit = Unit {
            kind: observation.kind,
            cell: observation.cell,
            status: observation.status,
            carried: observation.carried,
            health: observation.health,
            owner: observation.owner,
            last_seen_turn: self.turn,
        };

        if self.units.insert(observation.id, unit).is_none() {
            out_events.push(Event::UnitSighted {
                unit: observation.id,
                kind: observation.kind,
            });
        }
    }

    fn friendly_base_cells(&self, reported: &[UnitObservation]) -> BTreeSet<CellCoord> {
        let mut cells: BTreeSet<CellCoord> = self
            .units
            .values()
            .filter(|unit| self.is_friendly_base(unit.kind, unit.owner, unit.status))
            .map(|unit| unit.cell)
            .collect();
        cells.extend(
            reported
                .iter()
                .filter(|unit| self.is_friendly_base(unit.kind, unit.owner, unit.status))
                .map(|unit| unit.cell),
        );
        cells
    }

    fn mark_friendly_bases(&mut self) {
        let cells = self.friendly_base_cells(&[]);
        let Some(grid) = self.grid.as_mut() else {
            return;
        };

        for cell in cells {
            if let Some(slot) = grid.tile_mut(cell) {
                *slot = Tile::FriendlyBase;
            }
        }
    }

    fn is_friendly_base(&self, kind: UnitKind, owner: Option<PlayerId>, status: UnitStatus) -> bool {
        kind == UnitKind::Base && status != UnitStatus::Dead && self.is_controlled_owner(owner)
    }

    fn is_controlled_owner(&self, owner: Option<PlayerId>) -> bool {
        match self.player {
            Some(player) => owner == Some(player),
            None => true,
        }
    }

    fn evict_units(&mut self, out_events: &mut Vec<Event>) {
        let turn = self.turn;
        let stale_after = self.config.stale_unit_turns();
        let evicted: Vec<UnitId> = self
            .units
            .iter()
            .filter(|(_, unit)| {
                if unit.status == UnitStatus::Dead {
                    return true;
                }
                if stale_after == 0 || self.is_friendly_base(unit.kind, unit.owner, unit.status) {
                    return false;
                }
                turn.saturating_sub(unit.last_seen_turn) > stale_after
            })
            .map(|(id, _)| *id)
            .collect();

        for unit in evicted {
            if self.units.remove(&unit).is_some() {
                out_events.push(Event::UnitEvicted { unit });
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating its belief state.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::InitializeMap {
            columns,
            rows,
            sizing,
            player,
        } => world.initialize(columns, rows, sizing, player, out_events),
        Command::ApplyObservation { observation } => {
            world.apply_observation(observation, out_events);
        }
    }
}

/// Query functions that provide read-only access to the belief state.
pub mod query {
    use fog_harvest_core::{
        BeliefView, CellCoord, PlayerId, Tile, TileCategory, UnitSnapshot, UnitView,
    };

    use super::World;

    /// Reports whether the belief grid has been allocated.
    #[must_use]
    pub fn is_initialized(world: &World) -> bool {
        world.grid.is_some()
    }

    /// Player controlled by this session, when known.
    #[must_use]
    pub fn player(world: &World) -> Option<PlayerId> {
        world.player
    }

    /// Number of observations applied so far.
    #[must_use]
    pub fn turn(world: &World) -> u64 {
        world.turn
    }

    /// Exposes a read-only view of the belief grid.
    ///
    /// An uninitialised world yields an empty view in which no cell is in
    /// bounds.
    #[must_use]
    pub fn belief_view(world: &World) -> BeliefView<'_> {
        match world.grid.as_ref() {
            Some(grid) => BeliefView::new(&grid.tiles, grid.columns, grid.rows),
            None => BeliefView::new(&[], 0, 0),
        }
    }

    /// Believed tile at the provided cell.
    #[must_use]
    pub fn tile(world: &World, cell: CellCoord) -> Option<&Tile> {
        belief_view(world).tile(cell)
    }

    /// Believed category of the provided cell.
    #[must_use]
    pub fn category(world: &World, cell: CellCoord) -> Option<TileCategory> {
        belief_view(world).category(cell)
    }

    /// Reports whether the cell lies inside the belief grid.
    #[must_use]
    pub fn in_bounds(world: &World, cell: CellCoord) -> bool {
        belief_view(world).in_bounds(cell)
    }

    /// First cell of the category in row-major scan order.
    #[must_use]
    pub fn nearest_of_category(world: &World, category: TileCategory) -> Option<CellCoord> {
        belief_view(world).nearest_of_category(category)
    }

    /// Captures a read-only view of every known unit.
    #[must_use]
    pub fn unit_view(world: &World) -> UnitView {
        UnitView::from_snapshots(world.units.iter().map(|(id, unit)| unit.snapshot(*id)).collect())
    }

    /// Captures a read-only view of the units owned by the controlled player.
    ///
    /// While the player is unknown every unit is treated as controlled.
    #[must_use]
    pub fn controlled_units(world: &World) -> UnitView {
        let snapshots: Vec<UnitSnapshot> = world
            .units
            .iter()
            .filter(|(_, unit)| world.is_controlled_owner(unit.owner))
            .map(|(id, unit)| unit.snapshot(*id))
            .collect();
        UnitView::from_snapshots(snapshots)
    }
}

#[derive(Clone, Debug)]
struct Unit {
    kind: UnitKind,
    cell: CellCoord,
    status: UnitStatus,
    carried: u32,
    health: i64,
    owner: Option<PlayerId>,
    last_seen_turn: u64,
}

impl Unit {
    fn snapshot(&self, id: UnitId) -> UnitSnapshot {
        UnitSnapshot {
            id,
            kind: self.kind,
            cell: self.cell,
            status: self.status,
            carried: self.carried,
            health: self.health,
            owner: self.owner,
            last_seen_turn: self.last_seen_turn,
        }
    }
}

#[derive(Clone, Debug)]
struct BeliefGrid {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl BeliefGrid {
    fn new(columns: u32, rows: u32) -> Option<Self> {
        let capacity_u64 = u64::from(columns).checked_mul(u64::from(rows))?;
        let capacity = usize::try_from(capacity_u64).ok()?;
        Some(Self {
            columns,
            rows,
            tiles: vec![Tile::Unknown; capacity],
        })
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn tile_mut(&mut self, cell: CellCoord) -> Option<&mut Tile> {
        let index = self.index(cell)?;
        self.tiles.get_mut(index)
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

/// Resource beats wall, wall beats occupancy, occupancy beats open ground.
fn classify(observation: &TileObservation, friendly_base: bool) -> Tile {
    if let Some(resource) = &observation.resource {
        return Tile::ResourceDeposit(resource.clone());
    }
    if observation.blocked {
        return Tile::Wall;
    }
    if observation.occupied {
        return if friendly_base {
            Tile::FriendlyBase
        } else {
            Tile::EnemyPresence
        };
    }
    Tile::Empty
}
