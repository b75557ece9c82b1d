//! Configuration normalization.
//!
//! [`normalize`] turns a [`ParticleConfig`] with its shorthand forms into a
//! [`NormalizedParams`] where every family has exactly one shape:
//!
//! | Raw | Normalized |
//! |-----|------------|
//! | `v` | `Range1 { min: v, max: v }` |
//! | `[a, b]`, `a > b` | `Range1 { min: b, max: a }` |
//! | any `Vec3RangeInput` | `Range3` with one `Range1` per axis |
//! | color or color list | `Vec<Vec4>` of linear rgba stops |
//!
//! Normalization never fails. Reversed ranges are swapped, non-finite numbers
//! fall back to the field default and unparsable colors become white, each
//! with a `log::warn!`.

use glam::{Vec3, Vec4};
use rand::Rng;

use crate::config::{
    Appearance, AttractorConfig, AttractorKind, BlendMode, CollisionConfig, ColorInput,
    ColorValue, EmitterShape, Falloff, Lighting, Orientation, ParticleConfig, RangeInput,
    TurbulenceConfig, Vec3RangeInput,
};
use crate::curve::{CurveSet, Easing};

/// Attractor slots available in the uniform block.
pub const MAX_ATTRACTORS: usize = 4;

/// Shortest lifetime a particle can have, in seconds.
pub const MIN_LIFETIME: f32 = 1e-3;

/// A closed scalar range with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range1 {
    /// Lower bound.
    pub min: f32,
    /// Upper bound.
    pub max: f32,
}

impl Range1 {
    /// A range holding a single value.
    pub const fn fixed(v: f32) -> Self {
        Self { min: v, max: v }
    }

    /// Build a range, swapping reversed bounds.
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Uniform sample. Stays finite for bounds whose span overflows f32.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.min < self.max {
            let t = rng.gen::<f32>();
            (self.min * (1.0 - t) + self.max * t).clamp(self.min, self.max)
        } else {
            self.min
        }
    }

    /// Whether `v` lies inside the range.
    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Independent ranges per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range3 {
    /// X axis.
    pub x: Range1,
    /// Y axis.
    pub y: Range1,
    /// Z axis.
    pub z: Range1,
}

impl Range3 {
    /// Same range on every axis.
    pub const fn splat(r: Range1) -> Self {
        Self { x: r, y: r, z: r }
    }

    /// Sample each axis independently.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(self.x.sample(rng), self.y.sample(rng), self.z.sample(rng))
    }

    /// Whether every axis is fixed at zero.
    pub fn is_zero(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|r| r.min == 0.0 && r.max == 0.0)
    }
}

/// A start/end pair interpolated over life.
///
/// Unlike [`Range1`] the order is meaningful and never swapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    /// Value at birth.
    pub start: f32,
    /// Value at death.
    pub end: f32,
}

impl Fade {
    /// Linear interpolation at normalized age `t`.
    pub fn mix(&self, t: f32) -> f32 {
        self.start + (self.end - self.start) * t
    }
}

/// Emitter geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterParams {
    /// Shape.
    pub shape: EmitterShape,
    /// Sphere, cone, cylinder and disk radius.
    pub radius: f32,
    /// Cone half-angle in radians, within `[0, PI/2]`.
    pub angle: f32,
    /// Cone and cylinder height.
    pub height: f32,
    /// Box half extents.
    pub size: Vec3,
    /// Sample the boundary only.
    pub surface_only: bool,
    /// Unit axis.
    pub direction: Vec3,
}

/// Velocity damping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionParams {
    /// Damping rate per second.
    pub intensity: f32,
    /// Strength ramp over life.
    pub easing: Easing,
}

/// One attractor ready for upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttractorParams {
    /// Position relative to the system origin.
    pub position: Vec3,
    /// Signed strength.
    pub strength: f32,
    /// Force law.
    pub kind: AttractorKind,
    /// Unit vortex axis.
    pub axis: Vec3,
    /// Distance falloff.
    pub falloff: Falloff,
    /// Cut-off radius; `0.0` means unlimited.
    pub radius: f32,
}

/// Canonical form of every configuration option.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedParams {
    /// Pool capacity, at least 1.
    pub max_particles: u32,
    /// Lighting model.
    pub lighting: Lighting,
    /// Sprite shape.
    pub appearance: Appearance,
    /// Shadow casting hint.
    pub cast_shadow: bool,
    /// Quad orientation.
    pub orientation: Orientation,
    /// Blend mode.
    pub blending: BlendMode,
    /// Depth testing.
    pub depth_test: bool,
    /// Draw order hint.
    pub render_order: i32,

    /// Spawn size.
    pub size: Range1,
    /// Initial speed.
    pub speed: Range1,
    /// Lifetime in seconds, `min >= MIN_LIFETIME`.
    pub lifetime: Range1,
    /// Size multiplier over life when no size curve is set.
    pub fade_size: Fade,
    /// Opacity over life when no opacity curve is set.
    pub fade_opacity: Fade,
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
    /// Constant acceleration.
    pub gravity: Vec3,

    /// Start color stops, never empty.
    pub color_start: Vec<Vec4>,
    /// End color stops, never empty; equal to `color_start` when unset.
    pub color_end: Vec<Vec4>,
    /// Color multiplier.
    pub intensity: f32,

    /// Emitter geometry.
    pub emitter: EmitterParams,
    /// Velocity damping.
    pub friction: FrictionParams,
    /// Turbulence when enabled.
    pub turbulence: Option<TurbulenceConfig>,
    /// At most [`MAX_ATTRACTORS`] attractors.
    pub attractors: Vec<AttractorParams>,
    /// Pull toward the system position.
    pub attract_to_center: f32,
    /// Ground-plane collision when enabled.
    pub collision: Option<CollisionConfig>,

    /// Soft particle fade distance, `>= 0`.
    pub soft_distance: f32,
    /// Over-life curves.
    pub curves: CurveSet,
    /// Pre-baked curve texture to load.
    pub curve_texture_path: Option<String>,

    /// Emitter position.
    pub position: Vec3,
    /// Seconds between automatic bursts, `>= 0`.
    pub delay: f32,
    /// Particles per automatic burst.
    pub emit_count: u32,
    /// Start emitting on init.
    pub auto_start: bool,
    /// RNG seed.
    pub seed: Option<u64>,
}

impl NormalizedParams {
    /// Whether either color list holds more than one stop, so colors must be
    /// stored per particle.
    pub fn has_per_particle_color(&self) -> bool {
        self.color_start.len() > 1 || self.color_end.len() > 1
    }
}

/// Pick the color stop for a particle: `floor(seed * count)`.
pub fn pick_stop(stops: &[Vec4], seed: f32) -> Vec4 {
    if stops.is_empty() {
        return Vec4::ONE;
    }
    let idx = (seed.clamp(0.0, 1.0) * stops.len() as f32).floor() as usize;
    stops[idx.min(stops.len() - 1)]
}

fn finite_or(v: f32, default: f32, name: &str) -> f32 {
    if v.is_finite() {
        v
    } else {
        log::warn!("{name}: non-finite value {v}, using {default}");
        default
    }
}

fn finite_vec3(v: [f32; 3], default: Vec3, name: &str) -> Vec3 {
    let v = Vec3::from(v);
    if v.is_finite() {
        v
    } else {
        log::warn!("{name}: non-finite vector {v}, using {default}");
        default
    }
}

fn pair(a: f32, b: f32, default: Range1, name: &str) -> Range1 {
    if !a.is_finite() || !b.is_finite() {
        log::warn!("{name}: non-finite range [{a}, {b}], using default");
        return default;
    }
    if a > b {
        log::warn!("{name}: reversed range [{a}, {b}] swapped");
    }
    Range1::new(a, b)
}

/// Normalize a scalar range.
pub fn normalize_range(input: &RangeInput, default: Range1, name: &str) -> Range1 {
    match *input {
        RangeInput::Scalar(v) => Range1::fixed(finite_or(v, default.min, name)),
        RangeInput::Pair([a, b]) => pair(a, b, default, name),
    }
}

/// Normalize a per-axis range.
pub fn normalize_range3(input: &Vec3RangeInput, default: Range3, name: &str) -> Range3 {
    match *input {
        Vec3RangeInput::Scalar(v) => {
            if v.is_finite() {
                Range3::splat(Range1::fixed(v))
            } else {
                log::warn!("{name}: non-finite value {v}, using default");
                default
            }
        }
        Vec3RangeInput::Pair([a, b]) => Range3::splat(pair(a, b, default.x, name)),
        Vec3RangeInput::Vector([x, y, z]) => Range3 {
            x: Range1::fixed(finite_or(x, default.x.min, name)),
            y: Range1::fixed(finite_or(y, default.y.min, name)),
            z: Range1::fixed(finite_or(z, default.z.min, name)),
        },
        Vec3RangeInput::PerAxis([x, y, z]) => Range3 {
            x: pair(x[0], x[1], default.x, name),
            y: pair(y[0], y[1], default.y, name),
            z: pair(z[0], z[1], default.z, name),
        },
    }
}

fn normalize_fade(input: &RangeInput, default: Fade, name: &str) -> Fade {
    match *input {
        RangeInput::Scalar(v) => {
            let v = finite_or(v, default.start, name);
            Fade { start: v, end: v }
        }
        RangeInput::Pair([a, b]) => Fade {
            start: finite_or(a, default.start, name),
            end: finite_or(b, default.end, name),
        },
    }
}

/// Parse one color into linear rgba; white on failure.
pub fn parse_color(value: &ColorValue) -> Vec4 {
    match value {
        ColorValue::Hex(hex) => parse_hex(hex).unwrap_or_else(|| {
            log::warn!("invalid color '{hex}', using white");
            Vec4::ONE
        }),
        ColorValue::Components(c) if c.len() == 3 || c.len() == 4 => {
            let get = |i: usize, default: f32| {
                c.get(i)
                    .copied()
                    .filter(|v| v.is_finite())
                    .unwrap_or(default)
                    .clamp(0.0, 1.0)
            };
            Vec4::new(get(0, 1.0), get(1, 1.0), get(2, 1.0), get(3, 1.0))
        }
        ColorValue::Components(c) => {
            log::warn!("color needs 3 or 4 components, got {}; using white", c.len());
            Vec4::ONE
        }
    }
}

fn parse_hex(hex: &str) -> Option<Vec4> {
    let digits = hex.trim().strip_prefix('#').unwrap_or(hex.trim());
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
    match digits.len() {
        3 => {
            let mut rgb = [0.0f32; 3];
            for (i, c) in digits.chars().enumerate() {
                let v = c.to_digit(16)? as f32;
                rgb[i] = v * 17.0 / 255.0;
            }
            Some(Vec4::new(rgb[0], rgb[1], rgb[2], 1.0))
        }
        6 => Some(Vec4::new(
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            1.0,
        )),
        _ => None,
    }
}

/// Parse a color input into stops; never empty.
pub fn normalize_colors(input: &ColorInput) -> Vec<Vec4> {
    let stops: Vec<Vec4> = input.stops().into_iter().map(parse_color).collect();
    if stops.is_empty() {
        log::warn!("empty color list, using white");
        vec![Vec4::ONE]
    } else {
        stops
    }
}

fn normalize_attractor(a: &AttractorConfig) -> AttractorParams {
    let axis = finite_vec3(a.axis, Vec3::Y, "attractor axis");
    let radius = a
        .radius
        .map(|r| finite_or(r, 0.0, "attractor radius").max(0.0))
        .unwrap_or(0.0);
    AttractorParams {
        position: finite_vec3(a.position, Vec3::ZERO, "attractor position"),
        strength: finite_or(a.strength, 0.0, "attractor strength"),
        kind: a.kind,
        axis: axis.try_normalize().unwrap_or(Vec3::Y),
        falloff: a.falloff,
        radius,
    }
}

/// Resolve every option of `config` into canonical form. Pure; no GPU work.
pub fn normalize(config: &ParticleConfig) -> NormalizedParams {
    let defaults = ParticleConfig::default();
    let zero3 = Range3::splat(Range1::fixed(0.0));

    let mut lifetime = normalize_range(&config.lifetime, Range1::new(1.0, 2.0), "lifetime");
    if lifetime.min < MIN_LIFETIME {
        log::warn!("lifetime below {MIN_LIFETIME}s clamped");
        lifetime = Range1::new(lifetime.min.max(MIN_LIFETIME), lifetime.max.max(MIN_LIFETIME));
    }

    let mut size = normalize_range(&config.size, Range1::new(0.1, 0.3), "size");
    if size.min < 0.0 {
        log::warn!("negative size clamped to 0");
        size = Range1::new(size.min.max(0.0), size.max.max(0.0));
    }

    let color_start = normalize_colors(&config.color_start);
    let color_end = match &config.color_end {
        Some(end) => normalize_colors(end),
        None => color_start.clone(),
    };

    let mut attractors: Vec<AttractorParams> =
        config.attractors.iter().map(normalize_attractor).collect();
    if attractors.len() > MAX_ATTRACTORS {
        log::warn!(
            "{} attractors configured, only the first {MAX_ATTRACTORS} are used",
            attractors.len()
        );
        attractors.truncate(MAX_ATTRACTORS);
    }

    let turbulence = config.turbulence.map(|t| TurbulenceConfig {
        intensity: finite_or(t.intensity, 1.0, "turbulence.intensity"),
        frequency: finite_or(t.frequency, 1.0, "turbulence.frequency"),
        speed: finite_or(t.speed, 1.0, "turbulence.speed"),
    });

    let collision = config.collision.map(|c| CollisionConfig {
        plane_y: finite_or(c.plane_y, 0.0, "collision.planeY"),
        bounce: finite_or(c.bounce, 0.5, "collision.bounce").max(0.0),
        friction: finite_or(c.friction, 0.8, "collision.friction").clamp(0.0, 1.0),
        die: c.die,
    });

    let emitter = EmitterParams {
        shape: config.emitter_shape,
        radius: finite_or(config.emitter_radius, defaults.emitter_radius, "emitterRadius").max(0.0),
        angle: finite_or(config.emitter_angle, defaults.emitter_angle, "emitterAngle")
            .clamp(0.0, std::f32::consts::FRAC_PI_2),
        height: finite_or(config.emitter_height, defaults.emitter_height, "emitterHeight").max(0.0),
        size: finite_vec3(config.emitter_size, Vec3::ONE, "emitterSize").abs(),
        surface_only: config.emitter_surface_only,
        direction: finite_vec3(config.emitter_direction, Vec3::Y, "emitterDirection")
            .try_normalize()
            .unwrap_or(Vec3::Y),
    };

    let delay = finite_or(config.delay, 0.0, "delay");
    if delay < 0.0 {
        log::warn!("negative delay clamped to 0");
    }

    NormalizedParams {
        max_particles: config.max_particles.max(1),
        lighting: config.lighting,
        appearance: config.appearance,
        cast_shadow: config.cast_shadow,
        orientation: config.orientation,
        blending: config.blending,
        depth_test: config.depth_test,
        render_order: config.render_order,

        size,
        speed: normalize_range(&config.speed, Range1::new(0.5, 1.0), "speed"),
        lifetime,
        fade_size: normalize_fade(&config.fade_size, Fade { start: 1.0, end: 0.0 }, "fadeSize"),
        fade_opacity: normalize_fade(
            &config.fade_opacity,
            Fade { start: 1.0, end: 0.0 },
            "fadeOpacity",
        ),
        direction: normalize_range3(&config.direction, Range3::splat(Range1::fixed(0.0)), "direction"),
        start_position: normalize_range3(&config.start_position, zero3, "startPosition"),
        start_position_as_direction: config.start_position_as_direction,
        rotation: normalize_range3(&config.rotation, zero3, "rotation"),
        rotation_speed: normalize_range3(&config.rotation_speed, zero3, "rotationSpeed"),
        gravity: finite_vec3(config.gravity, Vec3::ZERO, "gravity"),

        color_start,
        color_end,
        intensity: finite_or(config.intensity, 1.0, "intensity").max(0.0),

        emitter,
        friction: FrictionParams {
            intensity: finite_or(config.friction.intensity, 0.0, "friction.intensity").max(0.0),
            easing: config.friction.easing,
        },
        turbulence,
        attractors,
        attract_to_center: finite_or(config.attract_to_center, 0.0, "attractToCenter"),
        collision,

        soft_distance: finite_or(config.soft_distance, 0.0, "softDistance").max(0.0),
        curves: CurveSet {
            size: config.size_curve.clone(),
            opacity: config.opacity_curve.clone(),
            velocity: config.velocity_curve.clone(),
            rotation_speed: config.rotation_speed_curve.clone(),
        },
        curve_texture_path: config.curve_texture_path.clone(),

        position: finite_vec3(config.position, Vec3::ZERO, "position"),
        delay: delay.max(0.0),
        emit_count: config.emit_count,
        auto_start: config.auto_start,
        seed: config.seed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_scalar_becomes_fixed_range() {
        let config = ParticleConfig {
            speed: RangeInput::Scalar(3.0),
            ..Default::default()
        };
        assert_eq!(normalize(&config).speed, Range1 { min: 3.0, max: 3.0 });
    }

    #[test]
    fn test_sampling_a_huge_range_stays_finite() {
        let range = normalize(&ParticleConfig {
            speed: RangeInput::Pair([-3e38, 3e38]),
            ..Default::default()
        })
        .speed;
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..64 {
            let v = range.sample(&mut rng);
            assert!(v.is_finite());
            assert!(range.contains(v));
        }
    }

    #[test]
    fn test_reversed_pair_is_swapped() {
        let config = ParticleConfig {
            lifetime: RangeInput::Pair([4.0, 2.0]),
            ..Default::default()
        };
        assert_eq!(normalize(&config).lifetime, Range1 { min: 2.0, max: 4.0 });
    }

    #[test]
    fn test_fade_keeps_order() {
        let params = normalize(&ParticleConfig::default());
        assert_eq!(params.fade_size, Fade { start: 1.0, end: 0.0 });
        assert_eq!(params.fade_opacity.mix(0.25), 0.75);
    }

    #[test]
    fn test_vec3_forms() {
        let r = normalize_range3(&Vec3RangeInput::Scalar(2.0), Range3::splat(Range1::fixed(0.0)), "t");
        assert_eq!(r, Range3::splat(Range1::fixed(2.0)));

        let r = normalize_range3(&Vec3RangeInput::Pair([1.0, -1.0]), Range3::splat(Range1::fixed(0.0)), "t");
        assert_eq!(r, Range3::splat(Range1::new(-1.0, 1.0)));

        let r = normalize_range3(&Vec3RangeInput::Vector([1.0, 2.0, 3.0]), Range3::splat(Range1::fixed(0.0)), "t");
        assert_eq!(r.y, Range1::fixed(2.0));

        let r = normalize_range3(
            &Vec3RangeInput::PerAxis([[0.0, 1.0], [5.0, 3.0], [-1.0, 1.0]]),
            Range3::splat(Range1::fixed(0.0)),
            "t",
        );
        assert_eq!(r.y, Range1::new(3.0, 5.0));
    }

    #[test]
    fn test_non_finite_falls_back() {
        let config = ParticleConfig {
            speed: RangeInput::Pair([f32::NAN, 1.0]),
            gravity: [0.0, f32::INFINITY, 0.0],
            intensity: f32::NAN,
            ..Default::default()
        };
        let params = normalize(&config);
        assert_eq!(params.speed, Range1::new(0.5, 1.0));
        assert_eq!(params.gravity, Vec3::ZERO);
        assert_eq!(params.intensity, 1.0);
    }

    #[test]
    fn test_lifetime_is_positive() {
        let config = ParticleConfig {
            lifetime: RangeInput::Scalar(0.0),
            ..Default::default()
        };
        assert_eq!(normalize(&config).lifetime.min, MIN_LIFETIME);
    }

    #[test]
    fn test_missing_color_end_matches_start() {
        let config = ParticleConfig {
            color_start: vec!["#ff0000"].into(),
            color_end: None,
            ..Default::default()
        };
        let params = normalize(&config);
        assert_eq!(params.color_start, vec![Vec4::new(1.0, 0.0, 0.0, 1.0)]);
        assert_eq!(params.color_end, params.color_start);
        assert!(!params.has_per_particle_color());
    }

    #[test]
    fn test_hex_and_component_colors() {
        assert_eq!(parse_color(&"#0f0".into()), Vec4::new(0.0, 1.0, 0.0, 1.0));
        assert_eq!(parse_color(&"#000080".into()).z, 128.0 / 255.0);
        assert_eq!(
            parse_color(&ColorValue::Components(vec![0.5, 0.25, 2.0, 0.5])),
            Vec4::new(0.5, 0.25, 1.0, 0.5)
        );
        assert_eq!(parse_color(&"not a color".into()), Vec4::ONE);
        assert_eq!(parse_color(&ColorValue::Components(vec![1.0])), Vec4::ONE);
    }

    #[test]
    fn test_multi_stop_colors_need_per_particle_storage() {
        let config = ParticleConfig {
            color_start: vec!["#f00", "#00f"].into(),
            ..Default::default()
        };
        assert!(normalize(&config).has_per_particle_color());
    }

    #[test]
    fn test_pick_stop_by_seed() {
        let stops = [Vec4::X, Vec4::Y, Vec4::Z];
        assert_eq!(pick_stop(&stops, 0.0), Vec4::X);
        assert_eq!(pick_stop(&stops, 0.5), Vec4::Y);
        assert_eq!(pick_stop(&stops, 0.999), Vec4::Z);
        assert_eq!(pick_stop(&stops, 1.0), Vec4::Z);
    }

    #[test]
    fn test_attractors_are_truncated_and_axes_normalized() {
        let config = ParticleConfig {
            attractors: vec![
                AttractorConfig {
                    axis: [0.0, 0.0, 5.0],
                    ..Default::default()
                };
                6
            ],
            ..Default::default()
        };
        let params = normalize(&config);
        assert_eq!(params.attractors.len(), MAX_ATTRACTORS);
        assert_eq!(params.attractors[0].axis, Vec3::Z);
        assert_eq!(params.attractors[0].radius, 0.0);
    }

    #[test]
    fn test_max_particles_at_least_one() {
        let config = ParticleConfig {
            max_particles: 0,
            ..Default::default()
        };
        assert_eq!(normalize(&config).max_particles, 1);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let config = ParticleConfig::from_json(&serde_json::json!({
            "size": [0.3, 0.1],
            "colorStart": ["#123", "#456"],
            "turbulence": { "intensity": 2.0 },
        }));
        assert_eq!(normalize(&config), normalize(&config));
    }

    proptest! {
        #[test]
        fn prop_scalar_range_is_fixed(v in -1.0e6f32..1.0e6) {
            let r = normalize_range(&RangeInput::Scalar(v), Range1::fixed(0.0), "p");
            prop_assert_eq!(r, Range1 { min: v, max: v });
        }

        #[test]
        fn prop_pair_is_ordered(a in -1.0e6f32..1.0e6, b in -1.0e6f32..1.0e6) {
            let r = normalize_range(&RangeInput::Pair([a, b]), Range1::fixed(0.0), "p");
            prop_assert!(r.min <= r.max);
            prop_assert_eq!(r.min, a.min(b));
            prop_assert_eq!(r.max, a.max(b));
        }

        #[test]
        fn prop_samples_stay_in_range(a in -100.0f32..100.0, b in -100.0f32..100.0, seed: u64) {
            let r = Range1::new(a, b);
            let mut rng = SmallRng::seed_from_u64(seed);
            for _ in 0..16 {
                prop_assert!(r.contains(r.sample(&mut rng)));
            }
        }
    }
}
