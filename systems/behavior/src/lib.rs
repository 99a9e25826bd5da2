#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-unit behavior state machine that turns belief into unit commands.
//!
//! Every controlled unit is assigned a [`Role`] from its kind. Workers
//! harvest: they return to base while carrying, walk to the closest known
//! deposit otherwise, and explore when neither goal exists. Scouts and tanks
//! each seek a single objective. Any mobile unit without a usable path falls
//! back to wall-following exploration so that it is never left without an
//! order.

use std::collections::BTreeMap;

use fog_harvest_core::{
    BeliefView, CellCoord, Direction, Event, TileCategory, UnitCommand, UnitId, UnitKind,
    UnitSnapshot, UnitView,
};
use fog_harvest_system_pathfinding::{Goal, Path, Pathfinder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

/// Configuration parameters required to construct the behavior system.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration seeding the random fallback with `rng_seed`.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }
}

/// Activity a controlled unit is currently engaged in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentMode {
    /// No goal is known; the unit follows its heading.
    Exploring,
    /// The unit walks toward the closest known resource deposit.
    Gathering,
    /// The unit carries resources back to a friendly base.
    ReturningToBase,
    /// The unit pursues the fixed objective of its role.
    Seeking,
}

/// Per-unit planning state kept between turns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentState {
    mode: AgentMode,
    heading: Direction,
}

impl AgentState {
    /// Current activity of the unit.
    #[must_use]
    pub const fn mode(&self) -> AgentMode {
        self.mode
    }

    /// Heading used by the exploration fallback.
    #[must_use]
    pub const fn heading(&self) -> Direction {
        self.heading
    }
}

/// Behavior variant selected by unit kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Gathers resources and delivers them to base.
    Harvester,
    /// Walks toward a single objective.
    Seeker(Objective),
    /// Never receives commands.
    Stationary,
}

impl Role {
    /// Role assigned to units of the given kind.
    #[must_use]
    pub const fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Worker => Self::Harvester,
            UnitKind::Scout => Self::Seeker(Objective::Frontier),
            UnitKind::Tank => Self::Seeker(Objective::Enemy),
            UnitKind::Base | UnitKind::Other => Self::Stationary,
        }
    }
}

/// Fixed objective pursued by a [`Role::Seeker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Objective {
    /// The closest never-observed tile by hop count.
    Frontier,
    /// The first tile in scan order occupied by a unit that is not ours.
    Enemy,
}

/// Pure system that tracks agents and emits one command per mobile unit.
#[derive(Debug)]
pub struct Behavior {
    agents: BTreeMap<UnitId, AgentState>,
    agents_created: usize,
    pathfinder: Pathfinder,
    rng: ChaCha8Rng,
}

impl Behavior {
    /// Creates a new behavior system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            agents: BTreeMap::new(),
            agents_created: 0,
            pathfinder: Pathfinder::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Planning state tracked for the unit, if any.
    #[must_use]
    pub fn agent(&self, unit: UnitId) -> Option<&AgentState> {
        self.agents.get(&unit)
    }

    /// Consumes world events and immutable views to emit unit commands.
    ///
    /// `units` must hold the controlled units only; they are visited in
    /// ascending id order.
    pub fn handle(
        &mut self,
        events: &[Event],
        belief: BeliefView<'_>,
        units: &UnitView,
        out: &mut Vec<UnitCommand>,
    ) {
        for event in events {
            if let Event::UnitEvicted { unit } = event {
                if self.agents.remove(unit).is_some() {
                    debug!(unit = %unit, "agent.dropped");
                }
            }
        }

        for unit in units.iter() {
            if !unit.is_alive() {
                continue;
            }

            if let Some(command) = self.command_for(unit, belief, units) {
                trace!(unit = %unit.id, ?command, "agent.command");
                out.push(command);
            }
        }
    }

    fn command_for(
        &mut self,
        unit: &UnitSnapshot,
        belief: BeliefView<'_>,
        units: &UnitView,
    ) -> Option<UnitCommand> {
        match Role::for_kind(unit.kind) {
            Role::Harvester => {
                self.ensure_agent(unit.id);
                Some(self.harvest(unit, belief))
            }
            Role::Seeker(objective) => {
                self.ensure_agent(unit.id);
                Some(self.seek(unit, objective, belief, units))
            }
            Role::Stationary => None,
        }
    }

    fn ensure_agent(&mut self, unit: UnitId) {
        if self.agents.contains_key(&unit) {
            return;
        }

        let heading = Direction::ALL[self.agents_created % Direction::ALL.len()];
        self.agents_created = self.agents_created.wrapping_add(1);
        let _ = self.agents.insert(
            unit,
            AgentState {
                mode: AgentMode::Exploring,
                heading,
            },
        );
        debug!(unit = %unit, ?heading, "agent.created");
    }

    fn harvest(&mut self, unit: &UnitSnapshot, belief: BeliefView<'_>) -> UnitCommand {
        let (mode, goal) = if unit.carried > 0 {
            (
                AgentMode::ReturningToBase,
                Some(Goal::Category(TileCategory::FriendlyBase)),
            )
        } else if let Some(deposit) = closest_deposit(belief, unit.cell) {
            (AgentMode::Gathering, Some(Goal::Cell(deposit)))
        } else {
            (AgentMode::Exploring, None)
        };
        self.set_mode(unit.id, mode);

        let Some(goal) = goal else {
            return self.explore(unit, belief);
        };

        let Some(path) = self.pathfinder.find_path(belief, unit.cell, goal) else {
            let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            debug!(unit = %unit.id, ?mode, ?direction, "agent.no_path");
            return UnitCommand::Move {
                unit: unit.id,
                direction,
            };
        };

        let Some(direction) = first_direction(unit.cell, &path) else {
            return self.explore(unit, belief);
        };

        if path.len() == 1 && mode == AgentMode::Gathering {
            UnitCommand::Gather {
                unit: unit.id,
                direction,
            }
        } else {
            UnitCommand::Move {
                unit: unit.id,
                direction,
            }
        }
    }

    fn seek(
        &mut self,
        unit: &UnitSnapshot,
        objective: Objective,
        belief: BeliefView<'_>,
        units: &UnitView,
    ) -> UnitCommand {
        self.set_mode(unit.id, AgentMode::Seeking);

        let path = match objective {
            Objective::Frontier => {
                self.pathfinder
                    .shortest_path_to_category(belief, unit.cell, TileCategory::Unknown)
            }
            Objective::Enemy => {
                let target = belief
                    .cells_of_category(TileCategory::EnemyPresence)
                    .find(|cell| units.iter().all(|friendly| friendly.cell != *cell));
                target.and_then(|cell| {
                    self.pathfinder
                        .find_path(belief, unit.cell, Goal::Cell(cell))
                })
            }
        };

        match path.and_then(|path| first_direction(unit.cell, &path)) {
            Some(direction) => UnitCommand::Move {
                unit: unit.id,
                direction,
            },
            None => self.explore(unit, belief),
        }
    }

    /// Follows the current heading, turning clockwise once when it is blocked.
    fn explore(&mut self, unit: &UnitSnapshot, belief: BeliefView<'_>) -> UnitCommand {
        let agent = self.agents.entry(unit.id).or_insert(AgentState {
            mode: AgentMode::Exploring,
            heading: Direction::North,
        });

        let ahead = unit.cell.step(agent.heading);
        if !ahead.is_some_and(|cell| belief.is_passable(cell)) {
            let previous = agent.heading;
            agent.heading = agent.heading.clockwise();
            debug!(unit = %unit.id, ?previous, heading = ?agent.heading, "agent.turned");
        }

        UnitCommand::Move {
            unit: unit.id,
            direction: agent.heading,
        }
    }

    fn set_mode(&mut self, unit: UnitId, mode: AgentMode) {
        if let Some(agent) = self.agents.get_mut(&unit) {
            if agent.mode != mode {
                debug!(unit = %unit, from = ?agent.mode, to = ?mode, "agent.mode_changed");
                agent.mode = mode;
            }
        }
    }
}

/// Known deposit with the smallest Manhattan distance; ties keep scan order.
fn closest_deposit(belief: BeliefView<'_>, origin: CellCoord) -> Option<CellCoord> {
    belief
        .cells_of_category(TileCategory::ResourceDeposit)
        .min_by_key(|cell| origin.manhattan_distance(*cell))
}

fn first_direction(origin: CellCoord, path: &Path) -> Option<Direction> {
    path.first_step()
        .and_then(|step| Direction::between(origin, step))
}
