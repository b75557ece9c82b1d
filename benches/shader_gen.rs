//! Benchmarks for kernel generation and CPU-side preparation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use sparkfield::curve::{bake, CurveInput, CurvePoint, CurveSet, Easing, DEFAULT_CURVE_RESOLUTION};
use sparkfield::emission::{EmissionParams, Emitter};
use sparkfield::features::{FeatureFlags, KernelVariant};
use sparkfield::kernel::generate_kernel;
use sparkfield::normalize::normalize;
use sparkfield::presets::Preset;
use sparkfield::render::generate_render_shader;

fn bench_generate_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_kernel");

    for flags in [
        FeatureFlags::empty(),
        FeatureFlags::TURBULENCE,
        FeatureFlags::ATTRACTORS | FeatureFlags::COLLISION,
        FeatureFlags::all(),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(flags.label()), &flags, |b, &flags| {
            b.iter(|| black_box(generate_kernel(flags)))
        });
    }

    group.bench_function("render_shader", |b| {
        let variant = KernelVariant::default();
        b.iter(|| black_box(generate_render_shader(&variant)))
    });

    group.finish();
}

fn bench_bake(c: &mut Criterion) {
    let mut group = c.benchmark_group("bake");

    let easing = CurveInput::Easing(Easing::EaseInOutCubic);
    group.bench_function("easing", |b| {
        b.iter(|| black_box(bake(&easing, DEFAULT_CURVE_RESOLUTION)))
    });

    let bezier = CurveInput::Points {
        points: vec![
            CurvePoint {
                pos: [0.0, 0.0],
                handle_in: None,
                handle_out: Some([0.3, 0.8]),
            },
            CurvePoint::new(0.5, 1.0),
            CurvePoint {
                pos: [1.0, 0.0],
                handle_in: Some([-0.3, 0.2]),
                handle_out: None,
            },
        ],
    };
    group.bench_function("bezier", |b| {
        b.iter(|| black_box(bake(&bezier, DEFAULT_CURVE_RESOLUTION)))
    });

    let set = CurveSet {
        size: Some(easing.clone()),
        opacity: Some(bezier.clone()),
        velocity: None,
        rotation_speed: Some(CurveInput::Easing(Easing::EaseOut)),
    };
    group.bench_function("pack_set", |b| {
        b.iter(|| black_box(set.pack(DEFAULT_CURVE_RESOLUTION)))
    });

    group.finish();
}

fn bench_normalize_and_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("emission");

    for preset in Preset::ALL {
        let config = preset.config(Vec3::ZERO);
        group.bench_with_input(
            BenchmarkId::new("normalize", format!("{preset:?}")),
            &config,
            |b, config| b.iter(|| black_box(normalize(config))),
        );
    }

    for count in [100u32, 10_000] {
        let params = EmissionParams::from_params(&normalize(&Preset::Fire.config(Vec3::ZERO)));
        let mut emitter = Emitter::new(Some(7));
        group.bench_with_input(BenchmarkId::new("emit", count), &count, |b, &count| {
            b.iter(|| black_box(emitter.emit(&params, Vec3::ZERO, count, true)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_generate_kernel,
    bench_bake,
    bench_normalize_and_emit
);
criterion_main!(benches);
