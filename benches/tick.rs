//! Tick throughput with a full four-player arena.

use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use arena_brawl::game::{
    archetype::Archetype,
    config::SimConfig,
    input::InputVector,
    state::Simulation,
    tick::tick,
};

fn four_player_sim() -> Simulation {
    let mut sim = Simulation::new(SimConfig::default(), 42);
    let mut roster = BTreeMap::new();
    roster.insert(1, Archetype::Austin);
    roster.insert(2, Archetype::Galactic);
    roster.insert(3, Archetype::Toaster);
    roster.insert(4, Archetype::Pigeon);
    sim.apply_roster(&roster);
    sim.start();
    sim
}

fn busy_inputs() -> BTreeMap<u8, InputVector> {
    let mut inputs = BTreeMap::new();
    inputs.insert(1, InputVector { fire: true, right: true, ..Default::default() });
    inputs.insert(2, InputVector { fire: true, left: true, up: true, ..Default::default() });
    inputs.insert(3, InputVector { fire: true, down: true, ..Default::default() });
    inputs.insert(4, InputVector { fire: true, left: true, ..Default::default() });
    inputs
}

fn bench_tick(c: &mut Criterion) {
    let inputs = busy_inputs();

    c.bench_function("tick_four_players", |b| {
        let mut sim = four_player_sim();
        b.iter(|| {
            if sim.phase != arena_brawl::game::state::MatchPhase::Playing {
                sim.start_round();
            }
            black_box(tick(&mut sim, 1.0 / 60.0, black_box(&inputs)));
        })
    });

    c.bench_function("state_hash", |b| {
        let mut sim = four_player_sim();
        for _ in 0..120 {
            tick(&mut sim, 1.0 / 60.0, &inputs);
        }
        b.iter(|| black_box(sim.state_hash()));
    });
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
