//! Integration tests for derive macros.
//!
//! These tests verify that `#[derive(GpuEnum)]` and `#[derive(ConfigFields)]`
//! generate correct code by actually using the derived implementations.

use sparkfield::config::{Appearance, Falloff, Lighting, Orientation};
use sparkfield::{ConfigFields, Easing, GpuEnum, ParticleConfig};

// ============================================================================
// GpuEnum Derive Tests
// ============================================================================

#[derive(GpuEnum, Clone, Copy, PartialEq, Debug)]
enum Mode {
    Idle,
    Burst,
    Stream,
}

#[test]
fn test_gpu_enum_into_u32() {
    let idle: u32 = Mode::Idle.into();
    let burst: u32 = Mode::Burst.into();
    let stream: u32 = Mode::Stream.into();

    assert_eq!(idle, 0);
    assert_eq!(burst, 1);
    assert_eq!(stream, 2);
}

#[test]
fn test_gpu_enum_from_u32() {
    let burst: Mode = 1u32.into();
    let stream: Mode = 2u32.into();

    assert_eq!(burst, Mode::Burst);
    assert_eq!(stream, Mode::Stream);
}

#[test]
fn test_gpu_enum_invalid_u32_defaults_to_first() {
    let invalid: Mode = 99u32.into();
    assert_eq!(invalid, Mode::Idle);
}

#[test]
fn test_gpu_enum_count() {
    assert_eq!(Mode::count(), 3);
}

#[test]
fn test_gpu_enum_count_is_const() {
    const COUNT: u32 = Mode::count();
    assert_eq!(COUNT, 3);
}

#[test]
fn test_library_enum_ids() {
    assert_eq!(u32::from(Easing::Linear), 0);
    assert_eq!(u32::from(Easing::EaseInOutCubic), 6);
    assert_eq!(Easing::count(), 7);
    assert_eq!(u32::from(Falloff::InverseSquare), 3);
    assert_eq!(u32::from(Lighting::Standard), 1);
    assert_eq!(Appearance::count(), 3);
    assert_eq!(Orientation::from(2u32), Orientation::Horizontal);
}

// ============================================================================
// ConfigFields Derive Tests
// ============================================================================

#[derive(ConfigFields, Clone, PartialEq, Debug, Default)]
struct Knobs {
    #[config(structural)]
    pool_size: u32,
    drift_speed: f32,
    #[config(rename = "tint")]
    color: [f32; 3],
    #[config(skip)]
    scratch: Vec<u8>,
}

#[test]
fn test_config_fields_keys_are_camel_case() {
    assert_eq!(Knobs::KEYS, &["poolSize", "driftSpeed", "tint"]);
}

#[test]
fn test_config_fields_structural_keys() {
    assert_eq!(Knobs::STRUCTURAL_KEYS, &["poolSize"]);
}

#[test]
fn test_config_fields_changed_keys() {
    let a = Knobs::default();
    let mut b = a.clone();
    assert!(a.changed_keys(&b).is_empty());

    b.drift_speed = 2.0;
    b.color = [1.0, 0.0, 0.0];
    assert_eq!(a.changed_keys(&b), vec!["driftSpeed", "tint"]);
}

#[test]
fn test_config_fields_skip_is_not_compared() {
    let a = Knobs::default();
    let b = Knobs {
        scratch: vec![1, 2, 3],
        ..Knobs::default()
    };
    assert!(a.changed_keys(&b).is_empty());
}

#[test]
fn test_config_fields_copy_key() {
    let mut a = Knobs::default();
    let b = Knobs {
        pool_size: 64,
        color: [0.0, 1.0, 0.0],
        scratch: vec![9],
        ..Knobs::default()
    };

    assert!(a.copy_key(&b, "tint"));
    assert_eq!(a.color, [0.0, 1.0, 0.0]);
    assert_eq!(a.pool_size, 0);

    assert!(!a.copy_key(&b, "color"));
    assert!(!a.copy_key(&b, "scratch"));
    assert!(a.scratch.is_empty());
}

#[test]
fn test_particle_config_structural_keys() {
    assert_eq!(
        ParticleConfig::STRUCTURAL_KEYS,
        &[
            "maxParticles",
            "lighting",
            "appearance",
            "castShadow",
            "orientation",
            "blending",
            "depthTest"
        ]
    );
    assert!(ParticleConfig::KEYS.contains(&"rotationSpeedCurve"));
}
