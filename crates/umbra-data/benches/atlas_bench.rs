use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use umbra_core::renderer::ShadowSourceId;
use umbra_data::allocators::ShadowAtlas;

fn bench_atlas(c: &mut Criterion) {
    let mut group = c.benchmark_group("Shadow Atlas");

    group.bench_function("Fill 8192px atlas with mixed sizes", |b| {
        b.iter(|| {
            let mut atlas = ShadowAtlas::new(8192, 256);
            let mut id = 0;
            for tiles in [4u32, 2, 1, 1, 2, 1].iter().cycle().take(400) {
                id += 1;
                let _ = black_box(atlas.reserve(*tiles, *tiles, ShadowSourceId::from_raw(id)));
            }
            black_box(atlas.free_tile_count());
        });
    });

    group.bench_function("Reserve into fragmented atlas", |b| {
        let mut fragmented = ShadowAtlas::new(4096, 256);
        for i in 0..256u64 {
            fragmented
                .reserve(1, 1, ShadowSourceId::from_raw(i + 1))
                .ok();
        }
        for i in (0..256u64).step_by(3) {
            fragmented.free(ShadowSourceId::from_raw(i + 1));
        }
        b.iter(|| {
            let mut atlas = fragmented.clone();
            black_box(atlas.reserve(2, 2, ShadowSourceId::from_raw(10_000)).ok());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_atlas);
criterion_main!(benches);
