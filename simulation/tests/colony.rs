use std::time::Duration;

use colony_core::{
    AgentId, CellCoord, Command, Event, JobId, ResourceKind, ResourceTable, Rotation, TileKind,
    WorldLayer,
};
use colony_simulation::{Colony, ColonyConfig, ColonyError};
use colony_system_agents::AgentRecord;
use colony_system_navigation::Dispatch;
use colony_world::{query, SnapshotError};

const TICK: Duration = Duration::from_millis(100);

fn inline(columns: u32, rows: u32) -> Colony {
    Colony::new(ColonyConfig::new(columns, rows).with_dispatch(Dispatch::Inline))
}

fn designate(colony: &mut Colony, template: &str, column: u32, row: u32) -> JobId {
    let mut events = Vec::new();
    colony.apply(
        Command::DesignateBuild {
            template: template.to_owned(),
            base: CellCoord::new(column, row),
            rotation: Rotation::Deg0,
        },
        &mut events,
    );
    events
        .iter()
        .find_map(|event| match event {
            Event::JobCreated { job, .. } => Some(*job),
            _ => None,
        })
        .expect("job created")
}

fn add_wood(colony: &mut Colony, amount: u32) {
    colony.apply(
        Command::AddResources {
            resources: ResourceTable::new().with(ResourceKind::Wood, amount),
        },
        &mut Vec::new(),
    );
}

fn run_until_completed(colony: &mut Colony, job: JobId, limit: usize) -> bool {
    for _ in 0..limit {
        let mut events = Vec::new();
        colony.tick(TICK, &mut events);
        if events.contains(&Event::JobCompleted { job }) {
            return true;
        }
    }
    false
}

#[test]
fn colony_builds_a_designated_wall() {
    let mut colony = inline(8, 8);
    add_wood(&mut colony, 1);
    let job = designate(&mut colony, "wall", 5, 5);
    let _ = colony
        .spawn_agent(CellCoord::new(0, 0), &mut Vec::new())
        .expect("spawned");

    assert!(run_until_completed(&mut colony, job, 400));
    let world = colony.world();
    assert_eq!(
        query::grid(world)
            .get(CellCoord::new(5, 5), WorldLayer::Structure)
            .map(|tile| tile.kind()),
        Some(TileKind::Wall)
    );
    assert_eq!(query::inventory(world).amount(ResourceKind::Wood), 0);
    assert!(query::jobs(world).is_empty());
}

#[test]
fn placing_tiles_schedules_a_navigation_rebuild() {
    let mut colony = inline(6, 6);
    colony.apply(
        Command::PlaceTile {
            template: "wall".to_owned(),
            base: CellCoord::new(2, 2),
            rotation: Rotation::Deg0,
        },
        &mut Vec::new(),
    );
    assert!(colony.navigation().is_rebuilding());

    let mut events = Vec::new();
    colony.tick(TICK, &mut events);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::NavigationRebuilt { .. })));
    assert_eq!(
        colony.navigation().graph().cell_cost(CellCoord::new(2, 2)),
        0.0
    );
}

#[test]
fn saved_colony_loads_with_identical_state_and_keeps_working() {
    let mut colony = inline(8, 8);
    add_wood(&mut colony, 1);
    let job = designate(&mut colony, "wall", 5, 5);
    let agent = colony
        .spawn_agent(CellCoord::new(0, 0), &mut Vec::new())
        .expect("spawned");
    for _ in 0..5 {
        colony.tick(TICK, &mut Vec::new());
    }
    assert_eq!(colony.agents().get(agent).and_then(|agent| agent.job()), Some(job));

    let mut bytes = Vec::new();
    colony.save(&mut bytes).expect("saved");
    let mut events = Vec::new();
    let mut restored =
        Colony::load(*colony.config(), bytes.as_slice(), &mut events).expect("loaded");

    assert_eq!(restored.snapshot(), colony.snapshot());
    assert!(events.iter().any(|event| matches!(
        event,
        Event::AgentCreated { agent: created } if created.id == agent && created.job == Some(job)
    )));
    assert!(run_until_completed(&mut restored, job, 400));
    assert_eq!(
        query::grid(restored.world())
            .get(CellCoord::new(5, 5), WorldLayer::Structure)
            .map(|tile| tile.kind()),
        Some(TileKind::Wall)
    );
}

#[test]
fn restore_rejects_agents_holding_unknown_jobs() {
    let colony = inline(4, 4);
    let mut snapshot = colony.snapshot();
    snapshot.agents.push(AgentRecord {
        id: AgentId::new(0),
        position: colony_core::Position::at_cell(CellCoord::new(1, 1)),
        job: Some(JobId::new(42)),
        energy: 50.0,
        needs_sleep: false,
        bed: None,
        path: Vec::new(),
        target: None,
    });

    let error = Colony::restore(*colony.config(), snapshot, &mut Vec::new())
        .expect_err("dangling job");
    assert!(matches!(
        error,
        ColonyError::Snapshot(SnapshotError::UnknownJob(job)) if job == JobId::new(42)
    ));
}

#[test]
fn restore_returns_unbacked_claims_to_the_queue() {
    let mut colony = inline(6, 6);
    let job = designate(&mut colony, "floor", 4, 4);
    let _ = colony
        .spawn_agent(CellCoord::new(0, 0), &mut Vec::new())
        .expect("spawned");
    colony.tick(TICK, &mut Vec::new());
    assert!(query::job(colony.world(), job).and_then(|job| job.agent()).is_some());

    let mut snapshot = colony.snapshot();
    snapshot.agents.clear();
    let restored =
        Colony::restore(*colony.config(), snapshot, &mut Vec::new()).expect("restored");

    let world = restored.world();
    assert_eq!(query::job(world, job).and_then(|job| job.agent()), None);
    assert_eq!(query::jobs(world).pending().next(), Some(job));
    assert!(restored.agents().is_empty());
}

#[test]
fn corrupt_bytes_fail_to_decode() {
    let bytes: &[u8] = &[0xff, 0x01];
    let result = Colony::load(ColonyConfig::new(4, 4), bytes, &mut Vec::new());
    assert!(matches!(result, Err(ColonyError::Codec(_))));
}

#[test]
fn despawned_agent_returns_its_job() {
    let mut colony = inline(6, 6);
    let job = designate(&mut colony, "floor", 4, 4);
    let agent = colony
        .spawn_agent(CellCoord::new(0, 0), &mut Vec::new())
        .expect("spawned");
    colony.tick(TICK, &mut Vec::new());

    assert!(colony.despawn_agent(agent));
    assert!(!colony.despawn_agent(agent));
    assert_eq!(query::jobs(colony.world()).pending().next(), Some(job));
}
