use std::time::Duration;

use colony_core::{
    AgentActivity, AgentId, CellCoord, Command, Event, Position, ResourceKind, ResourceTable,
    Rotation, TileKind, WorldLayer,
};
use colony_system_agents::{AgentConfig, AgentPool, AgentRecord};
use colony_system_navigation::{Dispatch, Navigation};
use colony_world::{self as world, query, World};

struct Harness {
    world: World,
    navigation: Navigation,
    pool: AgentPool,
    events: Vec<Event>,
}

impl Harness {
    fn new(world: World, pool: AgentPool) -> Self {
        let navigation = Navigation::new(Dispatch::Inline, &world);
        Self {
            world,
            navigation,
            pool,
            events: Vec::new(),
        }
    }

    fn step(&mut self, dt: f32) {
        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::Tick {
                dt: Duration::from_secs_f32(dt),
            },
            &mut events,
        );
        let results = self.navigation.poll(&mut events);
        self.pool.deliver(results);
        self.pool
            .tick(dt, &mut self.world, &mut self.navigation, &mut events);
        self.navigation.handle(&events, &self.world);
        self.events.extend(events);
    }
}

fn place(world: &mut World, template: &str, column: u32, row: u32) {
    let mut events = Vec::new();
    let _ = world
        .place_tile(template, CellCoord::new(column, row), Rotation::Deg0, &mut events)
        .expect("tile placed");
}

/// Walled 7x7 room in the top-left corner with a bed at (2, 2).
fn bedroom(columns: u32, rows: u32) -> World {
    let mut world = World::new(columns, rows);
    for row in 0..=6 {
        for column in 0..=6 {
            let border = row == 0 || row == 6 || column == 0 || column == 6;
            place(&mut world, if border { "wall" } else { "floor" }, column, row);
        }
    }
    place(&mut world, "bed", 2, 2);
    world
}

fn exhausted(id: u32, column: u32, row: u32) -> AgentRecord {
    AgentRecord {
        id: AgentId::new(id),
        position: Position::at_cell(CellCoord::new(column, row)),
        job: None,
        energy: 0.0,
        needs_sleep: true,
        bed: None,
        path: Vec::new(),
        target: None,
    }
}

#[test]
fn agent_walks_to_designation_and_builds_it() {
    let mut world = World::new(8, 8);
    let mut events = Vec::new();
    world.add_resources(&ResourceTable::new().with(ResourceKind::Wood, 1));
    let target = CellCoord::new(5, 5);
    let job = world
        .designate_build("wall", target, Rotation::Deg0, &mut events)
        .expect("designated");

    let mut pool = AgentPool::new(AgentConfig::default());
    let agent = pool.spawn(CellCoord::new(0, 0), &mut events);
    assert!(matches!(events.last(), Some(Event::AgentCreated { .. })));
    let mut harness = Harness::new(world, pool);

    for _ in 0..400 {
        harness.step(0.1);
        if harness.events.contains(&Event::JobCompleted { job }) {
            break;
        }
    }

    let grid = query::grid(&harness.world);
    assert_eq!(
        grid.get(target, WorldLayer::Structure).map(|tile| tile.kind()),
        Some(TileKind::Wall)
    );
    let agent = harness.pool.get(agent).expect("agent alive");
    assert_eq!(agent.position().exact_cell(), Some(target));
    assert_eq!(agent.job(), None);
    assert!(agent.energy() < colony_core::MAX_ENERGY);
    assert!(harness
        .events
        .iter()
        .any(|event| matches!(event, Event::AgentUpdated { agent } if agent.activity == AgentActivity::Working)));
}

#[test]
fn restored_agents_are_announced_and_ids_continue() {
    let mut events = Vec::new();
    let mut pool = AgentPool::restore(
        AgentConfig::default(),
        vec![exhausted(4, 1, 1), exhausted(1, 2, 2)],
        &mut events,
    );
    let announced: Vec<AgentId> = events
        .iter()
        .filter_map(|event| match event {
            Event::AgentCreated { agent } => Some(agent.id),
            _ => None,
        })
        .collect();
    assert_eq!(announced, vec![AgentId::new(1), AgentId::new(4)]);

    let spawned = pool.spawn(CellCoord::new(0, 0), &mut events);
    assert_eq!(spawned, AgentId::new(5));
}

#[test]
fn exhausted_agent_abandons_job_and_heads_to_bed() {
    let mut world = bedroom(10, 10);
    let mut events = Vec::new();
    let job = world
        .designate_build("floor", CellCoord::new(8, 8), Rotation::Deg0, &mut events)
        .expect("designated");
    assert_eq!(world.claim_job(AgentId::new(0)), Some(job));

    let mut record = exhausted(0, 5, 2);
    record.job = Some(job);
    record.target = Some(CellCoord::new(8, 8));
    let pool = AgentPool::restore(AgentConfig::default(), vec![record], &mut Vec::new());
    let mut harness = Harness::new(world, pool);
    let id = AgentId::new(0);
    let bed = CellCoord::new(2, 2);

    harness.step(0.1);
    let agent = harness.pool.get(id).expect("agent");
    assert_eq!(agent.job(), None);
    assert_eq!(agent.bed(), Some(bed));
    assert_eq!(agent.target(), Some(bed));
    assert_eq!(agent.activity(), AgentActivity::Sleeping);
    assert!(harness.navigation.is_path_pending(id));
    assert_eq!(
        query::job(&harness.world, job).and_then(|job| job.agent()),
        None
    );

    for _ in 0..100 {
        harness.step(0.1);
        if harness.pool.get(id).and_then(|agent| agent.position().exact_cell()) == Some(bed) {
            break;
        }
    }
    let before = harness.pool.get(id).map(|agent| agent.energy()).expect("agent");
    assert_eq!(before, 0.0);

    harness.step(1.0);
    let agent = harness.pool.get(id).expect("agent");
    let config = AgentConfig::default();
    let expected = config.energy_drain * config.rest_multiplier;
    assert!((agent.energy() - expected).abs() < 1e-4);
    assert_eq!(agent.activity(), AgentActivity::Resting);
}

#[test]
fn agent_without_free_bed_rests_in_place() {
    let world = bedroom(8, 8);
    let pool = AgentPool::restore(
        AgentConfig::default(),
        vec![exhausted(0, 5, 2), exhausted(1, 5, 4)],
        &mut Vec::new(),
    );
    let mut harness = Harness::new(world, pool);

    harness.step(0.5);
    let sleeper = harness.pool.get(AgentId::new(0)).expect("first");
    let rester = harness.pool.get(AgentId::new(1)).expect("second");
    assert_eq!(sleeper.bed(), Some(CellCoord::new(2, 2)));
    assert_eq!(rester.bed(), None);
    assert_eq!(rester.activity(), AgentActivity::Resting);
    assert_eq!(rester.position().exact_cell(), Some(CellCoord::new(5, 4)));
    assert!((rester.energy() - 2.5).abs() < 1e-4);
}

#[test]
fn rested_agent_wakes_up_at_full_energy() {
    let world = World::new(4, 4);
    let pool = AgentPool::restore(
        AgentConfig::default(),
        vec![exhausted(0, 1, 1)],
        &mut Vec::new(),
    );
    let mut harness = Harness::new(world, pool);
    for _ in 0..21 {
        harness.step(1.0);
    }
    let agent = harness.pool.get(AgentId::new(0)).expect("agent");
    assert!(!agent.needs_sleep());
    assert_eq!(agent.energy(), colony_core::MAX_ENERGY);
    assert_eq!(agent.activity(), AgentActivity::Idle);
}

#[test]
fn unreachable_job_keeps_agent_in_place() {
    let mut world = World::new(9, 9);
    for row in 5..=7 {
        for column in 5..=7 {
            if (column, row) != (6, 6) {
                place(&mut world, "wall", column, row);
            }
        }
    }
    let mut events = Vec::new();
    let job = world
        .designate_build("floor", CellCoord::new(6, 6), Rotation::Deg0, &mut events)
        .expect("designated");
    let mut pool = AgentPool::new(AgentConfig::default());
    let id = pool.spawn(CellCoord::new(0, 0), &mut events);
    let mut harness = Harness::new(world, pool);

    for _ in 0..20 {
        harness.step(0.1);
    }
    let agent = harness.pool.get(id).expect("agent");
    assert_eq!(agent.job(), Some(job));
    assert_eq!(agent.position().exact_cell(), Some(CellCoord::new(0, 0)));
    assert_eq!(agent.activity(), AgentActivity::Routing);
}

#[test]
fn despawned_agent_hands_its_job_back() {
    let mut world = World::new(6, 6);
    let mut events = Vec::new();
    let job = world
        .designate_build("floor", CellCoord::new(4, 4), Rotation::Deg0, &mut events)
        .expect("designated");
    let mut pool = AgentPool::new(AgentConfig::default());
    let id = pool.spawn(CellCoord::new(0, 0), &mut events);
    let mut harness = Harness::new(world, pool);

    harness.step(0.1);
    assert_eq!(harness.pool.get(id).and_then(|agent| agent.job()), Some(job));

    assert!(harness
        .pool
        .despawn(id, &mut harness.world, &mut harness.navigation));
    assert!(harness.pool.is_empty());
    assert!(!harness.navigation.is_path_pending(id));
    assert_eq!(query::jobs(&harness.world).pending().next(), Some(job));
}

#[test]
fn agent_records_round_trip_through_bincode() {
    let record = exhausted(7, 3, 1);
    let bytes = bincode::serialize(&record).expect("serialize");
    let decoded: AgentRecord = bincode::deserialize(&bytes).expect("deserialize");
    assert_eq!(decoded, record);
}
