//! Ready-made configurations for common effects.
//!
//! Each preset is a plain [`ParticleConfig`]; adjust fields or layer a JSON
//! patch on top before handing it to a system.
//!
//! ```ignore
//! let mut config = presets::fire(Vec3::new(0.0, 0.0, 0.0));
//! config.max_particles = 2_000;
//! let mut system = ParticleSystem::new(config);
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::{
    Appearance, AttractorConfig, BlendMode, CollisionConfig, ColorInput, EmitterShape,
    FrictionConfig, Orientation, ParticleConfig, RangeInput, TurbulenceConfig, Vec3RangeInput,
};
use crate::curve::{CurveInput, CurvePoint, Easing};

/// Named presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Preset {
    /// Rising embers that shrink and fade.
    Fire,
    /// Upward jet arcing back down onto the ground.
    Fountain,
    /// Single radial burst.
    Explosion,
    /// Slow, growing, darkening puffs.
    Smoke,
    /// Fast white-gold sparks that bounce.
    Sparkler,
    /// Streaks falling from a wide box.
    Rain,
}

impl Preset {
    /// Every preset.
    pub const ALL: [Preset; 6] = [
        Preset::Fire,
        Preset::Fountain,
        Preset::Explosion,
        Preset::Smoke,
        Preset::Sparkler,
        Preset::Rain,
    ];

    /// The preset's configuration with the emitter at `position`.
    pub fn config(self, position: Vec3) -> ParticleConfig {
        match self {
            Preset::Fire => fire(position),
            Preset::Fountain => fountain(position),
            Preset::Explosion => explosion(position),
            Preset::Smoke => smoke(position),
            Preset::Sparkler => sparkler(position),
            Preset::Rain => rain(position),
        }
    }
}

/// Fire: warm particles that rise, flicker in turbulence, shrink and fade.
pub fn fire(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 4_000,
        appearance: Appearance::Gradient,
        blending: BlendMode::Additive,
        size: RangeInput::Pair([0.2, 0.5]),
        speed: RangeInput::Pair([0.6, 1.2]),
        lifetime: RangeInput::Pair([0.6, 1.4]),
        fade_size: RangeInput::Pair([1.0, 0.1]),
        fade_opacity: RangeInput::Pair([0.9, 0.0]),
        direction: Vec3RangeInput::PerAxis([[-0.2, 0.2], [1.0, 1.0], [-0.2, 0.2]]),
        gravity: [0.0, 0.8, 0.0],
        color_start: vec!["#ffdd55", "#ffaa22"].into(),
        color_end: Some(ColorInput::from("#ff2200")),
        intensity: 1.5,
        emitter_shape: EmitterShape::Disk,
        emitter_radius: 0.3,
        turbulence: Some(TurbulenceConfig {
            intensity: 0.6,
            frequency: 1.5,
            speed: 1.2,
        }),
        position: position.to_array(),
        emit_count: 20,
        ..ParticleConfig::default()
    }
}

/// Fountain: a narrow jet that arcs under gravity and splashes down.
pub fn fountain(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 6_000,
        appearance: Appearance::Circular,
        blending: BlendMode::Alpha,
        size: RangeInput::Pair([0.05, 0.1]),
        speed: RangeInput::Pair([4.0, 5.0]),
        lifetime: RangeInput::Pair([1.5, 2.5]),
        fade_size: RangeInput::Scalar(1.0),
        fade_opacity: RangeInput::Pair([1.0, 0.0]),
        gravity: [0.0, -9.8, 0.0],
        color_start: "#99ccff".into(),
        color_end: Some(ColorInput::from("#ffffff")),
        emitter_shape: EmitterShape::Cone,
        emitter_radius: 0.05,
        emitter_angle: 0.15,
        emitter_height: 0.0,
        collision: Some(CollisionConfig {
            plane_y: position.y,
            bounce: 0.3,
            friction: 0.6,
            die: false,
        }),
        position: position.to_array(),
        emit_count: 30,
        ..ParticleConfig::default()
    }
}

/// Explosion: one radial burst that decelerates. Automatic emission is off;
/// fire it with `spawn()`.
pub fn explosion(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 3_000,
        appearance: Appearance::Gradient,
        blending: BlendMode::Additive,
        size: RangeInput::Pair([0.1, 0.4]),
        speed: RangeInput::Pair([3.0, 8.0]),
        lifetime: RangeInput::Pair([0.8, 1.6]),
        fade_size: RangeInput::Pair([1.0, 0.3]),
        fade_opacity: RangeInput::Pair([1.0, 0.0]),
        start_position_as_direction: true,
        color_start: vec!["#ffffff", "#ffee88", "#ffaa33"].into(),
        color_end: Some(vec!["#ff3300", "#661100"].into()),
        intensity: 2.0,
        emitter_shape: EmitterShape::Sphere,
        emitter_radius: 0.2,
        friction: FrictionConfig {
            intensity: 3.0,
            easing: Easing::EaseOut,
        },
        opacity_curve: Some(CurveInput::Points {
            points: vec![
                CurvePoint::new(0.0, 1.0),
                CurvePoint::new(0.6, 0.8),
                CurvePoint::new(1.0, 0.0),
            ],
        }),
        position: position.to_array(),
        emit_count: 3_000,
        auto_start: false,
        ..ParticleConfig::default()
    }
}

/// Smoke: slow puffs that grow, drift and darken what is behind them.
pub fn smoke(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 1_500,
        appearance: Appearance::Gradient,
        blending: BlendMode::Multiply,
        size: RangeInput::Pair([0.4, 0.8]),
        speed: RangeInput::Pair([0.3, 0.6]),
        lifetime: RangeInput::Pair([3.0, 5.0]),
        fade_size: RangeInput::Pair([0.5, 2.5]),
        fade_opacity: RangeInput::Pair([0.6, 0.0]),
        direction: Vec3RangeInput::PerAxis([[-0.3, 0.3], [1.0, 1.0], [-0.3, 0.3]]),
        rotation: Vec3RangeInput::PerAxis([[0.0, 0.0], [0.0, 0.0], [0.0, 6.28]]),
        rotation_speed: Vec3RangeInput::PerAxis([[0.0, 0.0], [0.0, 0.0], [-0.5, 0.5]]),
        gravity: [0.0, 0.2, 0.0],
        color_start: "#888888".into(),
        color_end: Some(ColorInput::from("#333333")),
        emitter_shape: EmitterShape::Sphere,
        emitter_radius: 0.3,
        turbulence: Some(TurbulenceConfig {
            intensity: 0.3,
            frequency: 0.5,
            speed: 0.3,
        }),
        size_curve: Some(CurveInput::Easing(Easing::EaseOut)),
        position: position.to_array(),
        delay: 0.05,
        emit_count: 3,
        ..ParticleConfig::default()
    }
}

/// Sparkler: fast stretched sparks that fall and skip off the ground.
pub fn sparkler(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 5_000,
        orientation: Orientation::VelocityAligned,
        blending: BlendMode::Additive,
        size: RangeInput::Pair([0.02, 0.05]),
        speed: RangeInput::Pair([2.0, 4.0]),
        lifetime: RangeInput::Pair([0.3, 0.8]),
        fade_size: RangeInput::Pair([1.0, 0.5]),
        fade_opacity: RangeInput::Pair([1.0, 0.0]),
        start_position_as_direction: true,
        gravity: [0.0, -4.0, 0.0],
        color_start: vec!["#ffffff", "#fff2a0"].into(),
        color_end: Some(ColorInput::from("#ff8800")),
        intensity: 2.5,
        emitter_shape: EmitterShape::Sphere,
        emitter_radius: 0.05,
        emitter_surface_only: true,
        collision: Some(CollisionConfig {
            plane_y: 0.0,
            bounce: 0.4,
            friction: 0.7,
            die: false,
        }),
        position: position.to_array(),
        emit_count: 40,
        ..ParticleConfig::default()
    }
}

/// Rain: streaks falling from a wide box that die on the ground.
pub fn rain(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 10_000,
        orientation: Orientation::VelocityAligned,
        blending: BlendMode::Alpha,
        size: RangeInput::Pair([0.01, 0.02]),
        speed: RangeInput::Pair([8.0, 10.0]),
        lifetime: RangeInput::Scalar(2.0),
        fade_size: RangeInput::Scalar(1.0),
        fade_opacity: RangeInput::Scalar(0.6),
        direction: Vec3RangeInput::Vector([0.0, -1.0, 0.0]),
        gravity: [0.0, -2.0, 0.0],
        color_start: "#aabbcc".into(),
        emitter_shape: EmitterShape::Box,
        emitter_size: [10.0, 0.1, 10.0],
        collision: Some(CollisionConfig {
            plane_y: 0.0,
            die: true,
            ..CollisionConfig::default()
        }),
        position: position.to_array(),
        emit_count: 80,
        ..ParticleConfig::default()
    }
}

/// A swirling vortex around the emitter, useful as a base for magic effects.
pub fn vortex(position: Vec3) -> ParticleConfig {
    ParticleConfig {
        max_particles: 4_000,
        appearance: Appearance::Circular,
        blending: BlendMode::Additive,
        size: RangeInput::Pair([0.03, 0.08]),
        speed: RangeInput::Pair([0.2, 0.5]),
        lifetime: RangeInput::Pair([2.0, 3.0]),
        color_start: vec!["#66ccff", "#aa66ff"].into(),
        emitter_shape: EmitterShape::Cylinder,
        emitter_radius: 1.0,
        emitter_height: 0.2,
        emitter_surface_only: true,
        attractors: vec![AttractorConfig {
            strength: 2.0,
            kind: crate::config::AttractorKind::Vortex,
            radius: Some(3.0),
            ..AttractorConfig::default()
        }],
        attract_to_center: 0.5,
        position: position.to_array(),
        emit_count: 10,
        ..ParticleConfig::default()
    }
}
