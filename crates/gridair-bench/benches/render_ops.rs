//! Criterion benchmarks for sprite compositing and object rendering.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gridair_bench::{bench_inputs, bench_rng, sequential_layer, small_layer_config};
use gridair_core::Tensor;
use gridair_layer::ForwardContext;
use gridair_nn::StandardFactory;
use gridair_render::{
    composite, Flight, FlightObjects, ObjectRenderer, RenderConfig, RenderMode, SpriteLayer,
};
use gridair_space::ImageBox;

/// Sixteen half-opaque 4x4 sprites tiled over a 64x64 image.
fn tiled_sprites(batch: usize) -> SpriteLayer {
    let n = 16;
    let maps = Tensor::from_fn(&[batch, n, 4, 4, 5], |i| match i % 5 {
        3 => 0.5,
        4 => 1.0,
        c => c as f32 / 3.0,
    });
    let boxes = (0..batch * n)
        .map(|i| {
            let k = i % n;
            ImageBox {
                y: (k / 4) as f32 * 0.25,
                x: (k % 4) as f32 * 0.25,
                h: 0.3,
                w: 0.3,
            }
        })
        .collect();
    SpriteLayer::new(maps, boxes).unwrap()
}

/// Benchmark: composite 16 overlapping sprites onto a 64x64 background.
fn bench_composite_64(c: &mut Criterion) {
    let layer = tiled_sprites(2);
    let background = Tensor::full(&[2, 64, 64, 3], 0.2);
    c.bench_function("composite_16_sprites_64x64", |b| {
        b.iter(|| {
            let out = composite(std::slice::from_ref(&layer), &background).unwrap();
            black_box(out);
        });
    });
}

/// Benchmark: decode and composite one flight of layer output.
fn bench_render_flight(c: &mut Criterion) {
    let config = small_layer_config();
    let (image, features) = bench_inputs(2, 4, 4, 8);
    let mut layer = sequential_layer(config.clone(), 3);
    let bundle = layer
        .forward(&image, &features, &ForwardContext::default(), None, &mut bench_rng(3))
        .unwrap();
    let objects = FlightObjects::from_bundle(&bundle).unwrap();
    let flight = Flight {
        anchor_box: config.anchor_box,
        object_shape: config.object_shape,
    };
    let mut renderer = ObjectRenderer::new(
        vec![flight],
        RenderConfig::default(),
        StandardFactory::new(&[32], 4),
    )
    .unwrap();

    c.bench_function("render_flight_4x4", |b| {
        b.iter(|| {
            let out = renderer
                .render(&[objects], &image, RenderMode::Full)
                .unwrap();
            black_box(out);
        });
    });
}

criterion_group!(benches, bench_composite_64, bench_render_flight);
criterion_main!(benches);
