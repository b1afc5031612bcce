use std::time::Duration;

use colony_core::{CellCoord, Command, Event, ResourceKind, ResourceTable, Rotation, WorldLayer};
use colony_simulation::{Colony, ColonyConfig, ColonySnapshot};
use colony_system_navigation::Dispatch;

#[test]
fn deterministic_replay_produces_identical_runs() {
    let first = replay(scripted_commands());
    let second = replay(scripted_commands());

    assert_eq!(first, second, "replay diverged between runs");

    let completed = first
        .events
        .iter()
        .filter(|event| matches!(event, Event::JobCompleted { .. }))
        .count();
    assert!(completed >= 3, "only {completed} jobs completed");
    assert_eq!(first.snapshot.tick, 300);
}

#[derive(Debug, PartialEq)]
struct ReplayOutcome {
    snapshot: ColonySnapshot,
    events: Vec<Event>,
}

fn replay(commands: Vec<Command>) -> ReplayOutcome {
    let config = ColonyConfig::new(12, 10).with_dispatch(Dispatch::Inline);
    let mut colony = Colony::new(config);
    let mut events = Vec::new();

    for cell in [CellCoord::new(0, 0), CellCoord::new(11, 9)] {
        let _ = colony.spawn_agent(cell, &mut events).expect("spawned");
    }
    for command in commands {
        colony.apply(command, &mut events);
    }

    ReplayOutcome {
        snapshot: colony.snapshot(),
        events,
    }
}

fn scripted_commands() -> Vec<Command> {
    let mut commands = vec![
        Command::AddResources {
            resources: ResourceTable::new().with(ResourceKind::Wood, 4),
        },
        Command::PlaceTile {
            template: "tree".to_owned(),
            base: CellCoord::new(8, 2),
            rotation: Rotation::Deg0,
        },
        Command::DesignateDemolish {
            cell: CellCoord::new(8, 2),
            layer: WorldLayer::Structure,
        },
    ];
    for row in 3..6 {
        commands.push(Command::DesignateBuild {
            template: "wall".to_owned(),
            base: CellCoord::new(5, row),
            rotation: Rotation::Deg0,
        });
    }
    commands.push(Command::DesignateBuild {
        template: "floor".to_owned(),
        base: CellCoord::new(2, 7),
        rotation: Rotation::Deg0,
    });
    commands.extend((0..300).map(|_| Command::Tick {
        dt: Duration::from_millis(100),
    }));
    commands
}
