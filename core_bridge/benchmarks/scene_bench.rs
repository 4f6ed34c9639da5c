use bridge_runtime::WorldPoint;
use core_bridge::resolver::{find_nearest_ground_item, find_tile_object};
use core_bridge::{build_observation, HeadlessClient, ObservationConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

const ORIGIN: i32 = 3136;

fn scene(items_per_row: i32) -> HeadlessClient {
    let mut client = HeadlessClient::new();
    client.set_region_origin(ORIGIN, ORIGIN);
    client.log_in("bench", WorldPoint::new(ORIGIN + 52, ORIGIN + 52, 0));
    for x in 0..104 {
        for y in (0..104).step_by((104 / items_per_row.max(1)).max(1) as usize) {
            client.add_ground_item(WorldPoint::new(ORIGIN + x, ORIGIN + y, 0), 995, 1);
        }
        client.add_game_object(WorldPoint::new(ORIGIN + x, ORIGIN + 103 - x, 0), 1276);
    }
    client
}

fn bench_scene_scans(c: &mut Criterion) {
    let mut group = c.benchmark_group("scene");

    for density in [1, 8, 52] {
        let client = scene(density);
        group.bench_with_input(
            BenchmarkId::new("nearest_ground_item", density),
            &client,
            |b, client| b.iter(|| find_nearest_ground_item(client, 995)),
        );
        group.bench_with_input(
            BenchmarkId::new("observation", density),
            &client,
            |b, client| b.iter(|| build_observation(client, &ObservationConfig::default())),
        );
    }

    let client = scene(1);
    group.bench_function("tile_object_miss", |b| {
        b.iter(|| find_tile_object(&client, 42))
    });

    group.finish();
}

criterion_group!(scene_benches, bench_scene_scans);
criterion_main!(scene_benches);
