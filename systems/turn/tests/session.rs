use fog_harvest_core::{
    CellCoord, Direction, GridSizing, Observation, PlayerId, TileCategory, TileObservation,
    UnitCommand, UnitId, UnitKind, UnitObservation, UnitStatus,
};
use fog_harvest_system_turn::{MapInit, Session, SessionConfig, TurnInput};
use fog_harvest_world::query;

fn exact_session() -> Session {
    Session::new(SessionConfig {
        grid_sizing: GridSizing::Exact,
        ..SessionConfig::default()
    })
}

fn open_tiles(columns: u32, rows: u32, occupied: &[CellCoord]) -> Vec<TileObservation> {
    let mut tiles = Vec::new();
    for row in 0..rows {
        for column in 0..columns {
            let cell = CellCoord::new(column, row);
            tiles.push(TileObservation {
                cell,
                visible: true,
                blocked: false,
                resource: None,
                occupied: occupied.contains(&cell),
            });
        }
    }
    tiles
}

fn unit(id: u64, kind: UnitKind, cell: CellCoord, owner: Option<u64>) -> UnitObservation {
    UnitObservation {
        id: UnitId::new(id),
        kind,
        cell,
        status: UnitStatus::Idle,
        carried: 0,
        health: 10,
        owner: owner.map(PlayerId::new),
    }
}

fn init(columns: u32, rows: u32, player: Option<u64>) -> Option<MapInit> {
    Some(MapInit {
        columns,
        rows,
        player: player.map(PlayerId::new),
    })
}

#[test]
fn three_by_three_worker_walks_home() {
    let mut session = exact_session();
    let base = CellCoord::new(1, 1);
    let worker = CellCoord::new(0, 0);
    let mut loaded = unit(2, UnitKind::Worker, worker, Some(1));
    loaded.carried = 1;

    let commands = session.handle_turn(TurnInput {
        init: init(3, 3, Some(1)),
        observation: Observation {
            tiles: open_tiles(3, 3, &[base, worker]),
            units: vec![unit(1, UnitKind::Base, base, Some(1)), loaded],
        },
    });

    assert_eq!(commands.len(), 1);
    let command = commands[0];
    assert!(matches!(command, UnitCommand::Move { .. }));
    assert_eq!(command.unit(), UnitId::new(2));
    assert!(matches!(
        command.direction(),
        Direction::East | Direction::South
    ));
    let next = worker.step(command.direction()).expect("step stays on the map");
    assert_eq!(next.manhattan_distance(base), 1);
}

#[test]
fn padded_sizing_keeps_units_west_of_spawn() {
    let (columns, rows) = (4, 3);
    let (ox, oy) = GridSizing::Padded.origin(columns, rows);
    let base = CellCoord::new(ox, oy);
    let worker = CellCoord::new(ox - 1, oy);
    let wall = CellCoord::new(ox - 1, oy - 1);

    let mut tiles = open_tiles(2 * columns + 1, 2 * rows + 1, &[base, worker]);
    tiles.retain(|tile| tile.cell != wall);
    tiles.push(TileObservation {
        cell: wall,
        visible: true,
        blocked: true,
        resource: None,
        occupied: false,
    });
    let mut loaded = unit(2, UnitKind::Worker, worker, Some(1));
    loaded.carried = 5;

    let mut session = Session::new(SessionConfig::default());
    let commands = session.handle_turn(TurnInput {
        init: init(columns, rows, Some(1)),
        observation: Observation {
            tiles,
            units: vec![unit(1, UnitKind::Base, base, Some(1)), loaded],
        },
    });

    let world = session.world();
    assert_eq!(query::belief_view(world).dimensions(), (9, 7));
    assert_eq!(query::category(world, wall), Some(TileCategory::Wall));
    assert_eq!(query::category(world, base), Some(TileCategory::FriendlyBase));
    assert_eq!(
        commands,
        vec![UnitCommand::Move {
            unit: UnitId::new(2),
            direction: Direction::East,
        }]
    );
}

#[test]
fn later_map_announcements_are_ignored() {
    let mut session = exact_session();
    let _ = session.handle_turn(TurnInput {
        init: init(3, 3, Some(1)),
        observation: Observation::default(),
    });
    let _ = session.handle_turn(TurnInput {
        init: init(12, 12, Some(4)),
        observation: Observation::default(),
    });

    assert_eq!(query::belief_view(session.world()).dimensions(), (3, 3));
    assert_eq!(query::player(session.world()), Some(PlayerId::new(1)));
    assert_eq!(query::turn(session.world()), 2);
}

#[test]
fn commands_follow_ascending_unit_ids() {
    let mut session = exact_session();
    let cells = [
        CellCoord::new(2, 2),
        CellCoord::new(1, 1),
        CellCoord::new(3, 3),
    ];
    let commands = session.handle_turn(TurnInput {
        init: init(5, 5, Some(1)),
        observation: Observation {
            tiles: open_tiles(5, 5, &cells),
            units: vec![
                unit(9, UnitKind::Worker, cells[0], Some(1)),
                unit(3, UnitKind::Scout, cells[1], Some(1)),
                unit(5, UnitKind::Tank, cells[2], Some(1)),
            ],
        },
    });

    let ids: Vec<_> = commands.iter().map(|command| command.unit().get()).collect();
    assert_eq!(ids, vec![3, 5, 9]);
}

#[test]
fn foreign_units_are_not_commanded() {
    let mut session = exact_session();
    let commands = session.handle_turn(TurnInput {
        init: init(4, 4, Some(1)),
        observation: Observation {
            tiles: open_tiles(4, 4, &[CellCoord::new(0, 0), CellCoord::new(3, 3)]),
            units: vec![
                unit(1, UnitKind::Worker, CellCoord::new(0, 0), Some(1)),
                unit(2, UnitKind::Worker, CellCoord::new(3, 3), Some(2)),
            ],
        },
    });

    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].unit(), UnitId::new(1));
}

#[test]
fn unknown_player_controls_every_unit() {
    let mut session = exact_session();
    let commands = session.handle_turn(TurnInput {
        init: init(4, 4, None),
        observation: Observation {
            tiles: open_tiles(4, 4, &[CellCoord::new(0, 0), CellCoord::new(3, 3)]),
            units: vec![
                unit(1, UnitKind::Worker, CellCoord::new(0, 0), Some(1)),
                unit(2, UnitKind::Worker, CellCoord::new(3, 3), Some(2)),
            ],
        },
    });

    assert_eq!(commands.len(), 2);
}

#[test]
fn every_input_yields_one_batch() {
    let mut session = exact_session();
    let worker = CellCoord::new(1, 1);
    let mut first = true;
    for _ in 0..6 {
        let commands = session.handle_turn(TurnInput {
            init: if first { init(3, 3, Some(1)) } else { None },
            observation: Observation {
                tiles: open_tiles(3, 3, &[worker]),
                units: vec![unit(1, UnitKind::Worker, worker, Some(1))],
            },
        });
        first = false;
        assert_eq!(commands.len(), 1);
    }
    assert!(session.behavior().agent(UnitId::new(1)).is_some());
}
