//! Particle emission.
//!
//! [`Emitter`] samples fresh particle records on the CPU: an offset from the
//! emitter shape, a direction and speed, lifetime, seed, size and rotation.
//! Records are then uploaded into the slots claimed from the
//! [`Allocator`](crate::buffer::Allocator).
//!
//! # Emitter Shapes
//!
//! | Shape | Volume | `surfaceOnly` |
//! |-------|--------|---------------|
//! | `point` | origin | origin |
//! | `box` | inside the box | on a face |
//! | `sphere` | inside the ball | on the sphere |
//! | `cone` | inside the cone | on the mantle |
//! | `cylinder` | inside the cylinder | on the mantle |
//! | `disk` | inside the disk | on the rim |
//!
//! Cone, cylinder and disk are oriented along `emitterDirection`.
//!
//! # Overrides
//!
//! A single spawn can replace any emission parameter with
//! [`SpawnOverrides`]; persistent parameters are not modified.
//!
//! ```ignore
//! let burst = SpawnOverrides {
//!     speed: Some([4.0, 6.0].into()),
//!     color_start: Some("#ff0000".into()),
//!     ..Default::default()
//! };
//! system.spawn(0.0, 1.0, 0.0, 200, Some(&burst));
//! ```

use glam::{Vec3, Vec4};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::buffer::{ParticleGpu, TintGpu};
use crate::config::{ColorInput, EmitterShape, RangeInput, Vec3RangeInput};
use crate::normalize::{
    normalize_colors, normalize_range, normalize_range3, pick_stop, EmitterParams,
    NormalizedParams, Range1, Range3, MIN_LIFETIME,
};

/// Per-spawn replacement of emission parameters. Unset fields keep the
/// persistent value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnOverrides {
    /// Spawn size.
    pub size: Option<RangeInput>,
    /// Initial speed.
    pub speed: Option<RangeInput>,
    /// Lifetime in seconds.
    pub lifetime: Option<RangeInput>,
    /// Direction sample.
    pub direction: Option<Vec3RangeInput>,
    /// Start offset sample.
    pub start_position: Option<Vec3RangeInput>,
    /// Use the start offset as direction.
    pub start_position_as_direction: Option<bool>,
    /// Initial rotation.
    pub rotation: Option<Vec3RangeInput>,
    /// Rotation speed.
    pub rotation_speed: Option<Vec3RangeInput>,
    /// Start colors; only stored when colors are per particle.
    pub color_start: Option<ColorInput>,
    /// End colors; only stored when colors are per particle.
    pub color_end: Option<ColorInput>,
    /// Emitter shape.
    pub emitter_shape: Option<EmitterShape>,
    /// Emitter radius.
    pub emitter_radius: Option<f32>,
    /// Cone half-angle.
    pub emitter_angle: Option<f32>,
    /// Cone and cylinder height.
    pub emitter_height: Option<f32>,
    /// Box half extents.
    pub emitter_size: Option<[f32; 3]>,
    /// Sample the boundary only.
    pub emitter_surface_only: Option<bool>,
    /// Shape axis.
    pub emitter_direction: Option<[f32; 3]>,
}

/// The emission subset of [`NormalizedParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionParams {
    /// Spawn size.
    pub size: Range1,
    /// Initial speed.
    pub speed: Range1,
    /// Lifetime.
    pub lifetime: Range1,
    /// Direction sample.
    pub direction: Range3,
    /// Start offset sample.
    pub start_position: Range3,
    /// Use the start offset as direction.
    pub start_position_as_direction: bool,
    /// Initial rotation.
    pub rotation: Range3,
    /// Rotation speed.
    pub rotation_speed: Range3,
    /// Start color stops.
    pub color_start: Vec<Vec4>,
    /// End color stops.
    pub color_end: Vec<Vec4>,
    /// Emitter geometry.
    pub emitter: EmitterParams,
}

impl EmissionParams {
    /// Extract from normalized parameters.
    pub fn from_params(params: &NormalizedParams) -> Self {
        Self {
            size: params.size,
            speed: params.speed,
            lifetime: params.lifetime,
            direction: params.direction,
            start_position: params.start_position,
            start_position_as_direction: params.start_position_as_direction,
            rotation: params.rotation,
            rotation_speed: params.rotation_speed,
            color_start: params.color_start.clone(),
            color_end: params.color_end.clone(),
            emitter: params.emitter,
        }
    }

    /// A copy with `overrides` layered on top.
    pub fn with_overrides(&self, overrides: &SpawnOverrides) -> Self {
        let mut out = self.clone();
        if let Some(size) = &overrides.size {
            let r = normalize_range(size, self.size, "size");
            out.size = Range1::new(r.min.max(0.0), r.max.max(0.0));
        }
        if let Some(speed) = &overrides.speed {
            out.speed = normalize_range(speed, self.speed, "speed");
        }
        if let Some(lifetime) = &overrides.lifetime {
            let r = normalize_range(lifetime, self.lifetime, "lifetime");
            out.lifetime = Range1::new(r.min.max(MIN_LIFETIME), r.max.max(MIN_LIFETIME));
        }
        if let Some(direction) = &overrides.direction {
            out.direction = normalize_range3(direction, self.direction, "direction");
        }
        if let Some(start) = &overrides.start_position {
            out.start_position = normalize_range3(start, self.start_position, "startPosition");
        }
        if let Some(flag) = overrides.start_position_as_direction {
            out.start_position_as_direction = flag;
        }
        if let Some(rotation) = &overrides.rotation {
            out.rotation = normalize_range3(rotation, self.rotation, "rotation");
        }
        if let Some(speed) = &overrides.rotation_speed {
            out.rotation_speed = normalize_range3(speed, self.rotation_speed, "rotationSpeed");
        }
        if let Some(start) = &overrides.color_start {
            out.color_start = normalize_colors(start);
            if overrides.color_end.is_none() {
                out.color_end = out.color_start.clone();
            }
        }
        if let Some(end) = &overrides.color_end {
            out.color_end = normalize_colors(end);
        }

        let e = &mut out.emitter;
        if let Some(shape) = overrides.emitter_shape {
            e.shape = shape;
        }
        if let Some(radius) = overrides.emitter_radius.filter(|v| v.is_finite()) {
            e.radius = radius.max(0.0);
        }
        if let Some(angle) = overrides.emitter_angle.filter(|v| v.is_finite()) {
            e.angle = angle.clamp(0.0, std::f32::consts::FRAC_PI_2);
        }
        if let Some(height) = overrides.emitter_height.filter(|v| v.is_finite()) {
            e.height = height.max(0.0);
        }
        if let Some(size) = overrides.emitter_size.map(Vec3::from).filter(|v| v.is_finite()) {
            e.size = size.abs();
        }
        if let Some(surface) = overrides.emitter_surface_only {
            e.surface_only = surface;
        }
        if let Some(dir) = overrides.emitter_direction.map(Vec3::from) {
            e.direction = dir.try_normalize().unwrap_or(Vec3::Y);
        }
        out
    }
}

/// Records produced by one spawn, in slot write order.
#[derive(Debug, Clone, Default)]
pub struct SpawnBatch {
    /// Particle records.
    pub particles: Vec<ParticleGpu>,
    /// Tints, empty unless colors are per particle.
    pub tints: Vec<TintGpu>,
}

/// Random source for emission.
pub struct Emitter {
    rng: SmallRng,
}

impl Emitter {
    /// Seeded for reproducible reruns, or from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { rng }
    }

    /// Sample `count` particles at `origin`.
    pub fn emit(
        &mut self,
        params: &EmissionParams,
        origin: Vec3,
        count: u32,
        with_tints: bool,
    ) -> SpawnBatch {
        let mut batch = SpawnBatch {
            particles: Vec::with_capacity(count as usize),
            tints: Vec::with_capacity(if with_tints { count as usize } else { 0 }),
        };

        for _ in 0..count {
            let particle = self.sample_particle(params, origin);
            if with_tints {
                batch.tints.push(TintGpu::new(
                    pick_stop(&params.color_start, particle.seed),
                    pick_stop(&params.color_end, particle.seed),
                ));
            }
            batch.particles.push(particle);
        }
        batch
    }

    fn sample_particle(&mut self, params: &EmissionParams, origin: Vec3) -> ParticleGpu {
        let offset = self.sample_offset(&params.emitter) + params.start_position.sample(&mut self.rng);

        let direction = if params.start_position_as_direction {
            offset.normalize_or_zero()
        } else {
            params.direction.sample(&mut self.rng).normalize_or_zero()
        };
        let velocity = direction * params.speed.sample(&mut self.rng);

        ParticleGpu {
            position: (origin + offset).to_array(),
            age: 0.0,
            velocity: velocity.to_array(),
            lifetime: params.lifetime.sample(&mut self.rng),
            rotation: params.rotation.sample(&mut self.rng).to_array(),
            seed: self.rng.gen::<f32>(),
            rotation_speed: params.rotation_speed.sample(&mut self.rng).to_array(),
            size: params.size.sample(&mut self.rng),
        }
    }

    /// Offset from the emitter origin sampled from the shape.
    pub fn sample_offset(&mut self, emitter: &EmitterParams) -> Vec3 {
        let axis = emitter.direction;
        let (u, v) = axis.any_orthonormal_pair();
        let surface = emitter.surface_only;

        match emitter.shape {
            EmitterShape::Point => Vec3::ZERO,
            EmitterShape::Box => self.in_box(emitter.size, surface),
            EmitterShape::Sphere => {
                let r = if surface {
                    emitter.radius
                } else {
                    emitter.radius * self.rng.gen::<f32>().cbrt()
                };
                self.unit_vector() * r
            }
            EmitterShape::Cone => {
                let h = emitter.height * self.rng.gen::<f32>();
                let max_r = emitter.radius + h * emitter.angle.tan();
                let (x, y) = self.in_disk(max_r, surface);
                u * x + v * y + axis * h
            }
            EmitterShape::Cylinder => {
                let h = emitter.height * (self.rng.gen::<f32>() - 0.5);
                let (x, y) = self.in_disk(emitter.radius, surface);
                u * x + v * y + axis * h
            }
            EmitterShape::Disk => {
                let (x, y) = self.in_disk(emitter.radius, surface);
                u * x + v * y
            }
        }
    }

    /// Uniform unit vector.
    fn unit_vector(&mut self) -> Vec3 {
        let z = self.rng.gen_range(-1.0f32..=1.0);
        let theta = self.rng.gen_range(0.0..TAU);
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * theta.cos(), r * theta.sin(), z)
    }

    /// Point in (or on the rim of) a disk, area-uniform.
    fn in_disk(&mut self, radius: f32, rim: bool) -> (f32, f32) {
        let theta = self.rng.gen_range(0.0..TAU);
        let r = if rim {
            radius
        } else {
            radius * self.rng.gen::<f32>().sqrt()
        };
        (r * theta.cos(), r * theta.sin())
    }

    fn in_box(&mut self, half: Vec3, surface: bool) -> Vec3 {
        let sample = |h: f32, rng: &mut SmallRng| {
            if h > 0.0 {
                h * (2.0 * rng.gen::<f32>() - 1.0)
            } else {
                0.0
            }
        };
        let mut p = Vec3::new(
            sample(half.x, &mut self.rng),
            sample(half.y, &mut self.rng),
            sample(half.z, &mut self.rng),
        );
        if surface {
            // Pick a face pair weighted by its area, then snap to a side.
            let areas = [half.y * half.z, half.x * half.z, half.x * half.y];
            let total: f32 = areas.iter().sum();
            if total > 0.0 {
                let pick = self.rng.gen::<f32>() * total;
                let axis = if pick < areas[0] {
                    0
                } else if pick < areas[0] + areas[1] {
                    1
                } else {
                    2
                };
                let side = if self.rng.gen::<bool>() { 1.0 } else { -1.0 };
                p[axis] = half[axis] * side;
            }
        }
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParticleConfig;
    use crate::normalize::normalize;

    fn params(config: ParticleConfig) -> EmissionParams {
        EmissionParams::from_params(&normalize(&config))
    }

    #[test]
    fn test_records_are_fresh_and_in_range() {
        let p = params(ParticleConfig {
            lifetime: RangeInput::Pair([1.0, 2.0]),
            size: RangeInput::Pair([0.1, 0.2]),
            ..Default::default()
        });
        let batch = Emitter::new(Some(1)).emit(&p, Vec3::ZERO, 100, false);
        assert_eq!(batch.particles.len(), 100);
        assert!(batch.tints.is_empty());
        for particle in &batch.particles {
            assert_eq!(particle.age, 0.0);
            assert!(p.lifetime.contains(particle.lifetime));
            assert!(p.size.contains(particle.size));
            assert!((0.0..1.0).contains(&particle.seed));
            assert!(particle.is_alive());
        }
    }

    #[test]
    fn test_huge_emitter_and_speed_do_not_panic() {
        let p = params(ParticleConfig {
            emitter_shape: EmitterShape::Box,
            emitter_size: [3e38, 3e38, 1.0],
            emitter_surface_only: true,
            speed: RangeInput::Pair([-3e38, 3e38]),
            ..Default::default()
        });
        let batch = Emitter::new(Some(11)).emit(&p, Vec3::ZERO, 32, false);
        assert_eq!(batch.particles.len(), 32);
    }

    #[test]
    fn test_seeded_emitters_are_reproducible() {
        let p = params(ParticleConfig::default());
        let a = Emitter::new(Some(42)).emit(&p, Vec3::ONE, 16, false);
        let b = Emitter::new(Some(42)).emit(&p, Vec3::ONE, 16, false);
        assert_eq!(a.particles, b.particles);
    }

    #[test]
    fn test_zero_direction_gives_zero_velocity() {
        let p = params(ParticleConfig {
            direction: Vec3RangeInput::Scalar(0.0),
            speed: RangeInput::Scalar(5.0),
            ..Default::default()
        });
        let batch = Emitter::new(Some(3)).emit(&p, Vec3::ZERO, 8, false);
        for particle in &batch.particles {
            assert_eq!(particle.velocity, [0.0; 3]);
        }
    }

    #[test]
    fn test_velocity_is_direction_times_speed() {
        let p = params(ParticleConfig {
            direction: Vec3RangeInput::Vector([0.0, 2.0, 0.0]),
            speed: RangeInput::Scalar(3.0),
            ..Default::default()
        });
        let batch = Emitter::new(Some(3)).emit(&p, Vec3::ZERO, 4, false);
        for particle in &batch.particles {
            assert!((particle.velocity() - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
        }
    }

    #[test]
    fn test_start_position_as_direction() {
        let p = params(ParticleConfig {
            emitter_shape: EmitterShape::Sphere,
            emitter_radius: 2.0,
            emitter_surface_only: true,
            start_position_as_direction: true,
            speed: RangeInput::Scalar(1.0),
            ..Default::default()
        });
        let batch = Emitter::new(Some(9)).emit(&p, Vec3::ZERO, 32, false);
        for particle in &batch.particles {
            let outward = particle.position().normalize();
            assert!((particle.velocity() - outward).length() < 1e-4);
        }
    }

    #[test]
    fn test_shapes_stay_in_bounds() {
        let mut emitter = Emitter::new(Some(5));
        let base = params(ParticleConfig::default()).emitter;
        let shapes = [
            EmitterShape::Point,
            EmitterShape::Box,
            EmitterShape::Sphere,
            EmitterShape::Cone,
            EmitterShape::Cylinder,
            EmitterShape::Disk,
        ];
        for shape in shapes {
            let e = EmitterParams { shape, ..base };
            for _ in 0..200 {
                let p = emitter.sample_offset(&e);
                let bound = e.radius + e.height * (1.0 + e.angle.tan()) + e.size.length();
                assert!(p.length() <= bound + 1e-4, "{shape:?} sampled {p}");
            }
        }
    }

    #[test]
    fn test_surface_samples_lie_on_boundary() {
        let mut emitter = Emitter::new(Some(11));
        let base = params(ParticleConfig::default()).emitter;

        let sphere = EmitterParams {
            shape: EmitterShape::Sphere,
            radius: 3.0,
            surface_only: true,
            ..base
        };
        for _ in 0..64 {
            assert!((emitter.sample_offset(&sphere).length() - 3.0).abs() < 1e-4);
        }

        let disk = EmitterParams {
            shape: EmitterShape::Disk,
            radius: 2.0,
            surface_only: true,
            direction: Vec3::Z,
            ..base
        };
        for _ in 0..64 {
            let p = emitter.sample_offset(&disk);
            assert!(p.z.abs() < 1e-5);
            assert!((p.length() - 2.0).abs() < 1e-4);
        }

        let cube = EmitterParams {
            shape: EmitterShape::Box,
            size: Vec3::ONE,
            surface_only: true,
            ..base
        };
        for _ in 0..64 {
            let p = emitter.sample_offset(&cube);
            assert!((p.abs().max_element() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_tints_follow_seed() {
        let p = params(ParticleConfig {
            color_start: vec!["#f00", "#0f0"].into(),
            color_end: Some(vec!["#00f", "#fff"].into()),
            ..Default::default()
        });
        let batch = Emitter::new(Some(2)).emit(&p, Vec3::ZERO, 64, true);
        assert_eq!(batch.tints.len(), 64);
        for (particle, tint) in batch.particles.iter().zip(&batch.tints) {
            let first = particle.seed < 0.5;
            let expected_start = if first { [1.0, 0.0, 0.0, 1.0] } else { [0.0, 1.0, 0.0, 1.0] };
            let expected_end = if first { [0.0, 0.0, 1.0, 1.0] } else { [1.0, 1.0, 1.0, 1.0] };
            assert_eq!(tint.start, expected_start);
            assert_eq!(tint.end, expected_end);
        }
    }

    #[test]
    fn test_overrides_apply_to_one_call_only() {
        let base = params(ParticleConfig {
            speed: RangeInput::Scalar(1.0),
            ..Default::default()
        });
        let overrides = SpawnOverrides {
            speed: Some(RangeInput::Pair([9.0, 7.0])),
            color_start: Some("#00ff00".into()),
            emitter_shape: Some(EmitterShape::Sphere),
            ..Default::default()
        };
        let layered = base.with_overrides(&overrides);
        assert_eq!(layered.speed, Range1::new(7.0, 9.0));
        assert_eq!(layered.color_start, vec![Vec4::new(0.0, 1.0, 0.0, 1.0)]);
        assert_eq!(layered.color_end, layered.color_start);
        assert_eq!(layered.emitter.shape, EmitterShape::Sphere);
        assert_eq!(base.speed, Range1::fixed(1.0));
        assert_eq!(base.emitter.shape, EmitterShape::Point);
    }

    #[test]
    fn test_overrides_deserialize_from_json() {
        let overrides: SpawnOverrides = serde_json::from_value(serde_json::json!({
            "lifetime": 0.5,
            "emitterShape": "disk",
            "startPositionAsDirection": true,
        }))
        .unwrap();
        assert_eq!(overrides.lifetime, Some(RangeInput::Scalar(0.5)));
        assert_eq!(overrides.emitter_shape, Some(EmitterShape::Disk));
        assert_eq!(overrides.start_position_as_direction, Some(true));
        assert!(overrides.speed.is_none());
    }
}
