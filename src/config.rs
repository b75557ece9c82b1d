//! Raw particle system configuration.
//!
//! [`ParticleConfig`] is what hosts write: every field has a default, keys are
//! camelCase, and most numeric options accept shorthand forms. It is turned
//! into fixed-shape GPU-ready values by [`normalize`](crate::normalize).
//!
//! ```ignore
//! let config = ParticleConfig::from_json(&serde_json::json!({
//!     "maxParticles": 2000,
//!     "lifetime": [0.5, 1.5],
//!     "speed": 2.0,
//!     "colorStart": ["#ffaa00", "#ff4400"],
//!     "gravity": [0.0, -2.0, 0.0],
//!     "sizeCurve": "easeOutCubic",
//! }));
//! ```
//!
//! # Structural Fields
//!
//! Fields marked `#[config(structural)]` change GPU resource layout or the
//! render pipeline, so changing them rebuilds everything. All other fields
//! are applied in place through the uniform buffer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sparkfield_derive::GpuEnum;

use crate::curve::{CurveInput, Easing};
use crate::ConfigFields;

/// A scalar range: a single number or `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeInput {
    /// Fixed value (`min == max`).
    Scalar(f32),
    /// `[min, max]`; reversed pairs are swapped during normalization.
    Pair([f32; 2]),
}

impl From<f32> for RangeInput {
    fn from(v: f32) -> Self {
        RangeInput::Scalar(v)
    }
}

impl From<[f32; 2]> for RangeInput {
    fn from(v: [f32; 2]) -> Self {
        RangeInput::Pair(v)
    }
}

/// A per-axis range.
///
/// | Form | Meaning |
/// |------|---------|
/// | `1.0` | every axis fixed at 1 |
/// | `[0.0, 1.0]` | every axis in `[0, 1]` |
/// | `[0.0, 1.0, 0.0]` | per-axis fixed values |
/// | `[[-1, 1], [0, 1], [-1, 1]]` | per-axis ranges |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Vec3RangeInput {
    /// Same fixed value on every axis.
    Scalar(f32),
    /// Same range on every axis.
    Pair([f32; 2]),
    /// Per-axis fixed values.
    Vector([f32; 3]),
    /// Per-axis ranges.
    PerAxis([[f32; 2]; 3]),
}

impl Default for Vec3RangeInput {
    fn default() -> Self {
        Vec3RangeInput::Scalar(0.0)
    }
}

impl From<[f32; 3]> for Vec3RangeInput {
    fn from(v: [f32; 3]) -> Self {
        Vec3RangeInput::Vector(v)
    }
}

impl From<[[f32; 2]; 3]> for Vec3RangeInput {
    fn from(v: [[f32; 2]; 3]) -> Self {
        Vec3RangeInput::PerAxis(v)
    }
}

/// One color: `"#rgb"`, `"#rrggbb"`, `[r, g, b]` or `[r, g, b, a]` in `0..1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorValue {
    /// Hex string.
    Hex(String),
    /// Linear components.
    Components(Vec<f32>),
}

impl From<&str> for ColorValue {
    fn from(hex: &str) -> Self {
        ColorValue::Hex(hex.to_string())
    }
}

/// A single color or a list of color stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorInput {
    /// One color.
    Single(ColorValue),
    /// Several stops; each particle picks one by its seed.
    List(Vec<ColorValue>),
}

impl ColorInput {
    /// Stops as a slice-like list.
    pub fn stops(&self) -> Vec<&ColorValue> {
        match self {
            ColorInput::Single(c) => vec![c],
            ColorInput::List(list) => list.iter().collect(),
        }
    }
}

impl From<&str> for ColorInput {
    fn from(hex: &str) -> Self {
        ColorInput::Single(hex.into())
    }
}

impl From<Vec<&str>> for ColorInput {
    fn from(hexes: Vec<&str>) -> Self {
        ColorInput::List(hexes.into_iter().map(ColorValue::from).collect())
    }
}

/// Lighting model of the render material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, GpuEnum)]
#[serde(rename_all = "camelCase")]
pub enum Lighting {
    /// Unlit; color is emitted as-is.
    #[default]
    Basic,
    /// Simple directional diffuse term on a sphere-like normal.
    Standard,
}

/// Sprite shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, GpuEnum)]
#[serde(rename_all = "camelCase")]
pub enum Appearance {
    /// Solid square quad.
    #[default]
    Default,
    /// Radial gradient falling off from the center.
    Gradient,
    /// Hard-edged disc.
    Circular,
}

/// How quads are oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, GpuEnum)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    /// Always face the camera.
    #[default]
    Billboard,
    /// Stretched along the velocity direction.
    VelocityAligned,
    /// Lying in the XZ plane.
    Horizontal,
}

/// Color blending of the render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlendMode {
    /// Standard alpha blending.
    Alpha,
    /// Colors add up, good for fire and glow.
    #[default]
    Additive,
    /// Darkens, good for smoke and shadows.
    Multiply,
}

/// Emitter volume that spawn offsets are sampled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmitterShape {
    /// All particles start at the emitter origin (plus `startPosition`).
    #[default]
    Point,
    /// Axis-aligned box with half extents `emitterSize`.
    Box,
    /// Sphere of radius `emitterRadius`.
    Sphere,
    /// Cone around `emitterDirection` with half-angle `emitterAngle` and
    /// height `emitterHeight`.
    Cone,
    /// Cylinder of radius `emitterRadius` and height `emitterHeight` along
    /// `emitterDirection`.
    Cylinder,
    /// Disk of radius `emitterRadius` perpendicular to `emitterDirection`.
    Disk,
}

/// Exponential velocity damping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrictionConfig {
    /// Damping rate per second at full strength.
    pub intensity: f32,
    /// How the strength ramps over the particle's life.
    pub easing: Easing,
}

impl Default for FrictionConfig {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            easing: Easing::Linear,
        }
    }
}

/// Curl-noise turbulence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurbulenceConfig {
    /// Force strength.
    pub intensity: f32,
    /// Spatial frequency of the noise field.
    pub frequency: f32,
    /// How fast the field scrolls through time.
    pub speed: f32,
}

impl Default for TurbulenceConfig {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            frequency: 1.0,
            speed: 1.0,
        }
    }
}

/// Force law of an attractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, GpuEnum)]
#[serde(rename_all = "camelCase")]
pub enum AttractorKind {
    /// Pull toward (positive strength) or push away from a point.
    #[default]
    Point,
    /// Swirl around an axis through the attractor position.
    Vortex,
}

/// Distance falloff of an attractor's strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, GpuEnum)]
#[serde(rename_all = "camelCase")]
pub enum Falloff {
    /// No falloff.
    Constant,
    /// `1 - d / radius`, or `1 / (1 + d)` without a radius.
    Linear,
    /// `1 / d`.
    Inverse,
    /// `1 / d²`, softened near the center.
    #[default]
    InverseSquare,
    /// Smoothstep from full strength at the center to zero at `radius`.
    Smooth,
}

/// A point or vortex attractor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttractorConfig {
    /// Position relative to the system origin.
    pub position: [f32; 3],
    /// Strength; negative repels.
    pub strength: f32,
    /// Force law.
    pub kind: AttractorKind,
    /// Vortex axis, normalized on upload.
    pub axis: [f32; 3],
    /// Falloff with distance.
    pub falloff: Falloff,
    /// Cut-off distance beyond which the attractor has no effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
}

impl Default for AttractorConfig {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            strength: 1.0,
            kind: AttractorKind::Point,
            axis: [0.0, 1.0, 0.0],
            falloff: Falloff::InverseSquare,
            radius: None,
        }
    }
}

/// Ground-plane collision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollisionConfig {
    /// Height of the horizontal plane.
    pub plane_y: f32,
    /// Fraction of vertical speed kept after a bounce.
    pub bounce: f32,
    /// Fraction of horizontal speed kept after a bounce.
    pub friction: f32,
    /// Kill particles on contact instead of bouncing.
    pub die: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            plane_y: 0.0,
            bounce: 0.5,
            friction: 0.8,
            die: false,
        }
    }
}

/// Complete raw configuration of a particle system.
///
/// See the module docs for the accepted shorthand forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ConfigFields)]
#[serde(rename_all = "camelCase", default)]
pub struct ParticleConfig {
    /// Capacity of the particle pool.
    #[config(structural)]
    pub max_particles: u32,
    /// Lighting model.
    #[config(structural)]
    pub lighting: Lighting,
    /// Sprite shape.
    #[config(structural)]
    pub appearance: Appearance,
    /// Whether the host should include the particles in shadow passes.
    #[config(structural)]
    pub cast_shadow: bool,
    /// Quad orientation.
    #[config(structural)]
    pub orientation: Orientation,
    /// Blend mode.
    #[config(structural)]
    pub blending: BlendMode,
    /// Whether particles are depth tested against the scene.
    #[config(structural)]
    pub depth_test: bool,

    /// Spawn size (world units).
    pub size: RangeInput,
    /// Initial speed along the sampled direction.
    pub speed: RangeInput,
    /// Lifetime in seconds.
    pub lifetime: RangeInput,
    /// Size multiplier at birth and death when no size curve is set.
    pub fade_size: RangeInput,
    /// Opacity at birth and death when no opacity curve is set.
    pub fade_opacity: RangeInput,
    /// Direction sampled per particle; normalized before scaling by speed.
    pub direction: Vec3RangeInput,
    /// Extra offset sampled per particle on top of the emitter shape.
    pub start_position: Vec3RangeInput,
    /// Use the normalized start offset as the direction.
    pub start_position_as_direction: bool,
    /// Initial rotation (radians).
    pub rotation: Vec3RangeInput,
    /// Rotation speed (radians per second).
    pub rotation_speed: Vec3RangeInput,
    /// Constant acceleration.
    pub gravity: [f32; 3],

    /// Color at birth.
    pub color_start: ColorInput,
    /// Color at death; defaults to `colorStart`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_end: Option<ColorInput>,
    /// Color multiplier, values above 1 make particles glow.
    pub intensity: f32,

    /// Emitter shape.
    pub emitter_shape: EmitterShape,
    /// Radius for sphere, cone, cylinder and disk.
    pub emitter_radius: f32,
    /// Cone half-angle (radians).
    pub emitter_angle: f32,
    /// Cone and cylinder height.
    pub emitter_height: f32,
    /// Box half extents.
    pub emitter_size: [f32; 3],
    /// Sample the shape boundary instead of its volume.
    pub emitter_surface_only: bool,
    /// Main axis of cone, cylinder and disk.
    pub emitter_direction: [f32; 3],

    /// Velocity damping.
    pub friction: FrictionConfig,
    /// Curl-noise turbulence; `null` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turbulence: Option<TurbulenceConfig>,
    /// Up to four attractors.
    pub attractors: Vec<AttractorConfig>,
    /// Pull toward the system position.
    pub attract_to_center: f32,
    /// Ground-plane collision; `null` disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collision: Option<CollisionConfig>,

    /// Distance over which particles fade out near scene geometry.
    pub soft_distance: f32,
    /// Size multiplier over life.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_curve: Option<CurveInput>,
    /// Opacity over life.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity_curve: Option<CurveInput>,
    /// Velocity multiplier over life.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_curve: Option<CurveInput>,
    /// Rotation speed multiplier over life.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_speed_curve: Option<CurveInput>,
    /// Pre-baked RGBA curve texture (PNG); replaces all four curves once
    /// loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve_texture_path: Option<String>,

    /// Emitter position.
    pub position: [f32; 3],
    /// Seconds between automatic bursts; 0 emits every frame.
    pub delay: f32,
    /// Particles per automatic burst.
    pub emit_count: u32,
    /// Start automatic emission on `init`.
    pub auto_start: bool,
    /// Draw order hint for the host.
    pub render_order: i32,
    /// RNG seed for reproducible emission; entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            max_particles: 10_000,
            lighting: Lighting::Basic,
            appearance: Appearance::Default,
            cast_shadow: false,
            orientation: Orientation::Billboard,
            blending: BlendMode::Additive,
            depth_test: true,

            size: RangeInput::Pair([0.1, 0.3]),
            speed: RangeInput::Pair([0.5, 1.0]),
            lifetime: RangeInput::Pair([1.0, 2.0]),
            fade_size: RangeInput::Pair([1.0, 0.0]),
            fade_opacity: RangeInput::Pair([1.0, 0.0]),
            direction: Vec3RangeInput::PerAxis([[-1.0, 1.0], [0.0, 1.0], [-1.0, 1.0]]),
            start_position: Vec3RangeInput::Scalar(0.0),
            start_position_as_direction: false,
            rotation: Vec3RangeInput::Scalar(0.0),
            rotation_speed: Vec3RangeInput::Scalar(0.0),
            gravity: [0.0, 0.0, 0.0],

            color_start: ColorInput::List(vec![ColorValue::Hex("#ffffff".into())]),
            color_end: None,
            intensity: 1.0,

            emitter_shape: EmitterShape::Point,
            emitter_radius: 1.0,
            emitter_angle: std::f32::consts::FRAC_PI_4,
            emitter_height: 1.0,
            emitter_size: [1.0, 1.0, 1.0],
            emitter_surface_only: false,
            emitter_direction: [0.0, 1.0, 0.0],

            friction: FrictionConfig::default(),
            turbulence: None,
            attractors: Vec::new(),
            attract_to_center: 0.0,
            collision: None,

            soft_distance: 0.0,
            size_curve: None,
            opacity_curve: None,
            velocity_curve: None,
            rotation_speed_curve: None,
            curve_texture_path: None,

            position: [0.0, 0.0, 0.0],
            delay: 0.0,
            emit_count: 1,
            auto_start: true,
            render_order: 0,
            seed: None,
        }
    }
}

impl ParticleConfig {
    /// Build a configuration from JSON, starting from the defaults.
    ///
    /// Keys are applied one at a time; a key whose value fails to
    /// deserialize is skipped with a warning and keeps its default. Unknown
    /// keys are ignored.
    pub fn from_json(value: &Value) -> Self {
        let mut config = Self::default();
        config.apply_json(value);
        config
    }

    /// Layer a JSON patch over this configuration with the same leniency as
    /// [`from_json`](Self::from_json). Returns the keys that were applied.
    pub fn apply_json(&mut self, patch: &Value) -> Vec<String> {
        let Some(patch) = patch.as_object() else {
            log::warn!("ignoring configuration patch that is not an object: {patch}");
            return Vec::new();
        };

        let mut applied = Vec::new();
        for (key, value) in patch {
            if !<Self as ConfigFields>::KEYS.contains(&key.as_str()) {
                log::debug!("ignoring unknown configuration key '{key}'");
                continue;
            }
            let single = Value::Object(Map::from_iter([(key.clone(), value.clone())]));
            match serde_json::from_value::<Self>(single) {
                Ok(parsed) => {
                    if self.copy_key(&parsed, key) {
                        applied.push(key.clone());
                    }
                }
                Err(err) => log::warn!("ignoring invalid value for '{key}': {err}"),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigFields;
    use serde_json::json;

    #[test]
    fn test_defaults_round_trip_through_json() {
        let config = ParticleConfig::default();
        let value = serde_json::to_value(&config).unwrap();
        let back: ParticleConfig = serde_json::from_value(value).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_shorthand_forms_deserialize() {
        let config = ParticleConfig::from_json(&json!({
            "size": 0.5,
            "speed": [1.0, 2.0],
            "direction": [0.0, 1.0, 0.0],
            "startPosition": [[-1.0, 1.0], [0.0, 0.0], [-1.0, 1.0]],
            "rotation": [0.0, 3.14],
            "colorStart": "#f00",
            "colorEnd": [[0.0, 0.0, 1.0, 0.5]],
        }));
        assert_eq!(config.size, RangeInput::Scalar(0.5));
        assert_eq!(config.speed, RangeInput::Pair([1.0, 2.0]));
        assert_eq!(config.direction, Vec3RangeInput::Vector([0.0, 1.0, 0.0]));
        assert_eq!(
            config.start_position,
            Vec3RangeInput::PerAxis([[-1.0, 1.0], [0.0, 0.0], [-1.0, 1.0]])
        );
        assert_eq!(config.rotation, Vec3RangeInput::Pair([0.0, 3.14]));
        assert_eq!(config.color_start, ColorInput::from("#f00"));
        assert!(matches!(config.color_end, Some(ColorInput::List(ref l)) if l.len() == 1));
    }

    #[test]
    fn test_bad_key_keeps_default_and_other_keys_apply() {
        let config = ParticleConfig::from_json(&json!({
            "maxParticles": "lots",
            "emitterShape": "teapot",
            "lifetime": [3.0, 4.0],
        }));
        assert_eq!(config.max_particles, 10_000);
        assert_eq!(config.emitter_shape, EmitterShape::Point);
        assert_eq!(config.lifetime, RangeInput::Pair([3.0, 4.0]));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let mut config = ParticleConfig::default();
        let applied = config.apply_json(&json!({ "sparkle": true, "delay": 0.25 }));
        assert_eq!(applied, vec!["delay".to_string()]);
        assert_eq!(config.delay, 0.25);
    }

    #[test]
    fn test_non_finite_field_does_not_block_patches() {
        let mut config = ParticleConfig {
            soft_distance: f32::NAN,
            ..Default::default()
        };
        let applied = config.apply_json(&json!({ "gravity": [0.0, -2.0, 0.0] }));
        assert_eq!(applied, vec!["gravity".to_string()]);
        assert_eq!(config.gravity, [0.0, -2.0, 0.0]);
        assert!(config.soft_distance.is_nan());
    }

    #[test]
    fn test_patch_leaves_other_fields_untouched() {
        let mut config = ParticleConfig::from_json(&json!({ "delay": 0.5, "emitCount": 3 }));
        config.apply_json(&json!({ "emitCount": 8 }));
        assert_eq!(config.delay, 0.5);
        assert_eq!(config.emit_count, 8);
    }

    #[test]
    fn test_null_clears_optional_fields() {
        let mut config = ParticleConfig::from_json(&json!({ "sizeCurve": "easeIn" }));
        assert!(config.size_curve.is_some());
        config.apply_json(&json!({ "sizeCurve": null }));
        assert!(config.size_curve.is_none());
    }

    #[test]
    fn test_keys_match_serde_names() {
        let value = serde_json::to_value(ParticleConfig {
            color_end: Some("#000".into()),
            turbulence: Some(TurbulenceConfig::default()),
            collision: Some(CollisionConfig::default()),
            size_curve: Some(Easing::Linear.into()),
            opacity_curve: Some(Easing::Linear.into()),
            velocity_curve: Some(Easing::Linear.into()),
            rotation_speed_curve: Some(Easing::Linear.into()),
            curve_texture_path: Some("curves.png".into()),
            seed: Some(7),
            ..Default::default()
        })
        .unwrap();
        let object = value.as_object().unwrap();
        for key in ParticleConfig::KEYS {
            assert!(object.contains_key(*key), "missing serde key {key}");
        }
        assert_eq!(object.len(), ParticleConfig::KEYS.len());
    }

    #[test]
    fn test_structural_keys() {
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
    }

    #[test]
    fn test_changed_keys() {
        let a = ParticleConfig::default();
        let b = ParticleConfig {
            delay: 1.0,
            max_particles: 5,
            ..Default::default()
        };
        assert_eq!(a.changed_keys(&b), vec!["maxParticles", "delay"]);
        assert!(a.changed_keys(&a.clone()).is_empty());
    }
}
