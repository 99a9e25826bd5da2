use fog_harvest_core::{
    CellCoord, Command, Direction, Event, GridSizing, Observation, PlayerId, ResourceDeposit,
    TileObservation, UnitCommand, UnitId, UnitKind, UnitObservation, UnitSnapshot, UnitStatus,
    UnitView,
};
use fog_harvest_system_behavior::{AgentMode, Behavior, Config};
use fog_harvest_world::{self as world, query, World};

const PLAYER: PlayerId = PlayerId::new(1);
const RIVAL: PlayerId = PlayerId::new(2);

struct Harness {
    world: World,
    behavior: Behavior,
    columns: u32,
    rows: u32,
}

impl Harness {
    fn new(columns: u32, rows: u32, seed: u64) -> Self {
        let mut world = World::new();
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::InitializeMap {
                columns,
                rows,
                sizing: GridSizing::Exact,
                player: Some(PLAYER),
            },
            &mut events,
        );
        Self {
            world,
            behavior: Behavior::new(Config::new(seed)),
            columns,
            rows,
        }
    }

    /// Observes every tile of the map; `#` is blocked, `r` a deposit.
    fn turn(&mut self, layout: &[&str], units: &[UnitObservation]) -> Vec<UnitCommand> {
        let mut tiles = Vec::new();
        for (row, line) in layout.iter().enumerate() {
            for (column, symbol) in line.chars().enumerate() {
                let cell = CellCoord::new(column as u32, row as u32);
                tiles.push(TileObservation {
                    cell,
                    visible: symbol != '?',
                    blocked: symbol == '#',
                    resource: (symbol == 'r').then(|| ResourceDeposit {
                        kind: "ore".to_owned(),
                        remaining: 40,
                        unit_value: 5,
                    }),
                    occupied: units.iter().any(|unit| unit.cell == cell),
                });
            }
        }
        assert_eq!(tiles.len(), (self.columns * self.rows) as usize);

        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::ApplyObservation {
                observation: Observation {
                    tiles,
                    units: units.to_vec(),
                },
            },
            &mut events,
        );

        let mut commands = Vec::new();
        self.behavior.handle(
            &events,
            query::belief_view(&self.world),
            &query::controlled_units(&self.world),
            &mut commands,
        );
        commands
    }
}

fn unit(id: u64, kind: UnitKind, column: u32, row: u32) -> UnitObservation {
    UnitObservation {
        id: UnitId::new(id),
        kind,
        cell: CellCoord::new(column, row),
        status: UnitStatus::Idle,
        carried: 0,
        health: 10,
        owner: Some(PLAYER),
    }
}

fn carrying(mut observation: UnitObservation, amount: u32) -> UnitObservation {
    observation.carried = amount;
    observation
}

fn movement(id: u64, direction: Direction) -> UnitCommand {
    UnitCommand::Move {
        unit: UnitId::new(id),
        direction,
    }
}

#[test]
fn loaded_worker_heads_for_base() {
    let mut harness = Harness::new(3, 3, 7);
    let commands = harness.turn(
        &["...", "...", "..."],
        &[
            unit(1, UnitKind::Base, 1, 1),
            carrying(unit(2, UnitKind::Worker, 0, 0), 1),
        ],
    );

    assert_eq!(commands, vec![movement(2, Direction::East)]);
}

#[test]
fn worker_switches_to_returning_once_loaded() {
    let layout = [".....", "...r.", "....."];
    let mut harness = Harness::new(5, 3, 7);
    let base = unit(1, UnitKind::Base, 0, 0);

    let first = harness.turn(&layout, &[base.clone(), unit(2, UnitKind::Worker, 0, 1)]);
    assert_eq!(first, vec![movement(2, Direction::East)]);
    assert_eq!(
        harness.behavior.agent(UnitId::new(2)).map(|agent| agent.mode()),
        Some(AgentMode::Gathering)
    );

    let second = harness.turn(&layout, &[base, carrying(unit(2, UnitKind::Worker, 0, 1), 5)]);
    assert_eq!(second, vec![movement(2, Direction::North)]);
    assert_eq!(
        harness.behavior.agent(UnitId::new(2)).map(|agent| agent.mode()),
        Some(AgentMode::ReturningToBase)
    );
}

#[test]
fn worker_gathers_from_adjacent_deposit() {
    let mut harness = Harness::new(5, 3, 7);
    let commands = harness.turn(
        &[".....", "...r.", "....."],
        &[unit(2, UnitKind::Worker, 2, 1)],
    );

    assert_eq!(
        commands,
        vec![UnitCommand::Gather {
            unit: UnitId::new(2),
            direction: Direction::East,
        }]
    );
}

#[test]
fn boxed_in_worker_turns_clockwise_each_turn() {
    let layout = [".#.", "#.#", ".#."];
    let mut harness = Harness::new(3, 3, 7);
    let worker = unit(4, UnitKind::Worker, 1, 1);

    let directions: Vec<_> = (0..5)
        .map(|_| {
            let commands = harness.turn(&layout, &[worker.clone()]);
            assert_eq!(commands.len(), 1);
            commands[0].direction()
        })
        .collect();

    assert_eq!(
        directions,
        vec![
            Direction::East,
            Direction::South,
            Direction::West,
            Direction::North,
            Direction::East,
        ]
    );
    assert_eq!(
        harness.behavior.agent(UnitId::new(4)).map(|agent| agent.mode()),
        Some(AgentMode::Exploring)
    );
}

#[test]
fn unreachable_base_falls_back_to_seeded_random_moves() {
    let layout = [".....", ".....", "....."];
    let worker = carrying(unit(3, UnitKind::Worker, 2, 1), 10);

    let mut first = Harness::new(5, 3, 99);
    let mut second = Harness::new(5, 3, 99);
    for _ in 0..10 {
        let left = first.turn(&layout, &[worker.clone()]);
        let right = second.turn(&layout, &[worker.clone()]);
        assert_eq!(left.len(), 1);
        assert!(matches!(left[0], UnitCommand::Move { .. }));
        assert_eq!(left, right);
    }
    assert_eq!(
        first.behavior.agent(UnitId::new(3)).map(|agent| agent.mode()),
        Some(AgentMode::ReturningToBase)
    );
}

#[test]
fn worker_standing_on_base_follows_heading() {
    let mut harness = Harness::new(3, 3, 7);
    let commands = harness.turn(
        &["...", "...", "..."],
        &[
            unit(1, UnitKind::Base, 1, 1),
            carrying(unit(2, UnitKind::Worker, 1, 1), 3),
        ],
    );

    assert_eq!(commands, vec![movement(2, Direction::North)]);
}

#[test]
fn scout_walks_toward_nearest_unknown_tile() {
    let mut harness = Harness::new(4, 3, 7);
    let commands = harness.turn(
        &["....", "....", "????"],
        &[unit(5, UnitKind::Scout, 1, 0)],
    );

    assert_eq!(commands, vec![movement(5, Direction::South)]);
}

#[test]
fn tank_ignores_cells_held_by_friendly_units() {
    let mut harness = Harness::new(5, 1, 7);
    let mut enemy = unit(9, UnitKind::Worker, 4, 0);
    enemy.owner = Some(RIVAL);
    let commands = harness.turn(
        &["....."],
        &[
            unit(1, UnitKind::Tank, 0, 0),
            unit(2, UnitKind::Worker, 2, 0),
            enemy,
        ],
    );

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[0], movement(1, Direction::East));
    assert!(commands.iter().all(|command| command.unit() != UnitId::new(9)));
}

#[test]
fn stationary_and_dead_units_receive_nothing() {
    let mut behavior = Behavior::new(Config::new(7));
    let tiles = vec![fog_harvest_core::Tile::Empty; 9];
    let view = fog_harvest_core::BeliefView::new(&tiles, 3, 3);
    let snapshot = |id: u64, kind: UnitKind, status: UnitStatus| UnitSnapshot {
        id: UnitId::new(id),
        kind,
        cell: CellCoord::new(1, 1),
        status,
        carried: 0,
        health: 10,
        owner: Some(PLAYER),
        last_seen_turn: 1,
    };
    let units = UnitView::from_snapshots(vec![
        snapshot(1, UnitKind::Base, UnitStatus::Idle),
        snapshot(2, UnitKind::Worker, UnitStatus::Dead),
        snapshot(3, UnitKind::Other, UnitStatus::Moving),
    ]);

    let mut commands = Vec::new();
    behavior.handle(&[], view, &units, &mut commands);

    assert!(commands.is_empty());
    assert!(behavior.agent(UnitId::new(1)).is_none());
    assert!(behavior.agent(UnitId::new(2)).is_none());
}

#[test]
fn evicted_units_lose_their_agent() {
    let mut harness = Harness::new(3, 3, 7);
    let _ = harness.turn(&["...", "...", "..."], &[unit(6, UnitKind::Worker, 1, 1)]);
    assert!(harness.behavior.agent(UnitId::new(6)).is_some());

    let tiles = vec![fog_harvest_core::Tile::Empty; 9];
    let view = fog_harvest_core::BeliefView::new(&tiles, 3, 3);
    let mut commands = Vec::new();
    harness.behavior.handle(
        &[Event::UnitEvicted {
            unit: UnitId::new(6),
        }],
        view,
        &UnitView::default(),
        &mut commands,
    );

    assert!(commands.is_empty());
    assert!(harness.behavior.agent(UnitId::new(6)).is_none());
}
