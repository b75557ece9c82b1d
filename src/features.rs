//! Feature flags and change classification.
//!
//! The update kernel and render pipeline are compiled per [`KernelVariant`]:
//! a closed set of optional features plus the render settings that change
//! pipeline state. Variants are selected once per structural build and never
//! patched in place, so the compiled program always matches the flags.
//!
//! [`classify`] compares two configurations and decides whether the new one
//! can be applied through the uniform buffer or needs a full rebuild.

use bitflags::bitflags;

use crate::config::{Appearance, BlendMode, Lighting, Orientation, ParticleConfig};
use crate::normalize::{normalize, NormalizedParams};
use crate::ConfigFields;

bitflags! {
    /// Optional stages of the update kernel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureFlags: u32 {
        /// Integrate rotation speed.
        const ROTATION = 1 << 0;
        /// Per-particle start/end color stored in a tint buffer.
        const PER_PARTICLE_COLOR = 1 << 1;
        /// Curl-noise turbulence.
        const TURBULENCE = 1 << 2;
        /// Point/vortex attractors and attract-to-center.
        const ATTRACTORS = 1 << 3;
        /// Ground-plane collision.
        const COLLISION = 1 << 4;
    }
}

impl FeatureFlags {
    /// Flags required by a parameter set. Deterministic.
    pub fn from_params(params: &NormalizedParams) -> Self {
        let mut flags = FeatureFlags::empty();
        flags.set(FeatureFlags::ROTATION, !params.rotation_speed.is_zero());
        flags.set(
            FeatureFlags::PER_PARTICLE_COLOR,
            params.has_per_particle_color(),
        );
        flags.set(
            FeatureFlags::TURBULENCE,
            params.turbulence.is_some_and(|t| t.intensity != 0.0),
        );
        flags.set(
            FeatureFlags::ATTRACTORS,
            !params.attractors.is_empty() || params.attract_to_center != 0.0,
        );
        flags.set(FeatureFlags::COLLISION, params.collision.is_some());
        flags
    }

    /// Short label such as `rotation+turbulence`, used for GPU object names.
    pub fn label(&self) -> String {
        if self.is_empty() {
            return "base".to_string();
        }
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Everything that selects a compiled kernel and render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelVariant {
    /// Optional kernel stages.
    pub flags: FeatureFlags,
    /// Lighting model.
    pub lighting: Lighting,
    /// Sprite shape.
    pub appearance: Appearance,
    /// Quad orientation.
    pub orientation: Orientation,
    /// Blend mode.
    pub blending: BlendMode,
    /// Depth testing.
    pub depth_test: bool,
    /// Shadow casting hint.
    pub cast_shadow: bool,
}

impl KernelVariant {
    /// Select the variant for a parameter set.
    pub fn from_params(params: &NormalizedParams) -> Self {
        Self {
            flags: FeatureFlags::from_params(params),
            lighting: params.lighting,
            appearance: params.appearance,
            orientation: params.orientation,
            blending: params.blending,
            depth_test: params.depth_test,
            cast_shadow: params.cast_shadow,
        }
    }
}

impl Default for KernelVariant {
    fn default() -> Self {
        Self::from_params(&normalize(&ParticleConfig::default()))
    }
}

/// Result of comparing two configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Keys whose values differ.
    pub changed_keys: Vec<&'static str>,
    /// Whether GPU resources must be rebuilt.
    pub structural: bool,
    /// Whether the feature flag set flipped.
    pub feature_flags_changed: bool,
}

impl Classification {
    /// Classify using already-computed feature flags.
    pub fn between(
        old: &ParticleConfig,
        old_flags: FeatureFlags,
        new: &ParticleConfig,
        new_flags: FeatureFlags,
    ) -> Self {
        let changed_keys = old.changed_keys(new);
        let structural_key = changed_keys
            .iter()
            .any(|key| ParticleConfig::STRUCTURAL_KEYS.contains(key));
        let feature_flags_changed = old_flags != new_flags;
        Self {
            changed_keys,
            structural: structural_key || feature_flags_changed,
            feature_flags_changed,
        }
    }

    /// Returns true if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed_keys.is_empty()
    }

    /// Returns true if any changes require a rebuild.
    pub fn needs_rebuild(&self) -> bool {
        self.structural
    }

    /// Whether `key` changed.
    pub fn touches(&self, key: &str) -> bool {
        self.changed_keys.contains(&key)
    }
}

/// Compare two configurations.
pub fn classify(old: &ParticleConfig, new: &ParticleConfig) -> Classification {
    let old_flags = FeatureFlags::from_params(&normalize(old));
    let new_flags = FeatureFlags::from_params(&normalize(new));
    Classification::between(old, old_flags, new, new_flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AttractorConfig, CollisionConfig, TurbulenceConfig, Vec3RangeInput};

    fn flags(config: &ParticleConfig) -> FeatureFlags {
        FeatureFlags::from_params(&normalize(config))
    }

    #[test]
    fn test_default_config_has_no_features() {
        assert_eq!(flags(&ParticleConfig::default()), FeatureFlags::empty());
    }

    #[test]
    fn test_each_feature_is_detected() {
        let config = ParticleConfig {
            rotation_speed: Vec3RangeInput::Pair([-1.0, 1.0]),
            color_start: vec!["#f00", "#0f0"].into(),
            turbulence: Some(TurbulenceConfig::default()),
            attractors: vec![AttractorConfig::default()],
            collision: Some(CollisionConfig::default()),
            ..Default::default()
        };
        assert_eq!(flags(&config), FeatureFlags::all());
    }

    #[test]
    fn test_zero_intensity_turbulence_is_off() {
        let config = ParticleConfig {
            turbulence: Some(TurbulenceConfig {
                intensity: 0.0,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!flags(&config).contains(FeatureFlags::TURBULENCE));
    }

    #[test]
    fn test_attract_to_center_enables_attractors() {
        let config = ParticleConfig {
            attract_to_center: 0.5,
            ..Default::default()
        };
        assert!(flags(&config).contains(FeatureFlags::ATTRACTORS));
    }

    #[test]
    fn test_label() {
        assert_eq!(FeatureFlags::empty().label(), "base");
        assert_eq!(
            (FeatureFlags::ROTATION | FeatureFlags::COLLISION).label(),
            "rotation+collision"
        );
    }

    #[test]
    fn test_identical_configs_classify_empty() {
        let config = ParticleConfig::default();
        let result = classify(&config, &config.clone());
        assert!(result.is_empty());
        assert!(!result.needs_rebuild());
    }

    #[test]
    fn test_uniform_level_change() {
        let old = ParticleConfig::default();
        let new = ParticleConfig {
            gravity: [0.0, -9.8, 0.0],
            speed: 4.0f32.into(),
            ..Default::default()
        };
        let result = classify(&old, &new);
        assert_eq!(result.changed_keys, vec!["speed", "gravity"]);
        assert!(!result.structural);
    }

    #[test]
    fn test_structural_key_change() {
        let old = ParticleConfig::default();
        let new = ParticleConfig {
            max_particles: 64,
            ..Default::default()
        };
        let result = classify(&old, &new);
        assert!(result.structural);
        assert!(!result.feature_flags_changed);
        assert!(result.touches("maxParticles"));
    }

    #[test]
    fn test_feature_flip_is_structural() {
        let old = ParticleConfig::default();
        let new = ParticleConfig {
            collision: Some(CollisionConfig::default()),
            ..Default::default()
        };
        let result = classify(&old, &new);
        assert!(result.feature_flags_changed);
        assert!(result.structural);
    }

    #[test]
    fn test_feature_tweak_without_flip_is_uniform_level() {
        let old = ParticleConfig {
            collision: Some(CollisionConfig::default()),
            ..Default::default()
        };
        let new = ParticleConfig {
            collision: Some(CollisionConfig {
                bounce: 0.9,
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = classify(&old, &new);
        assert!(result.touches("collision"));
        assert!(!result.structural);
    }

    #[test]
    fn test_variant_tracks_render_settings() {
        let a = KernelVariant::from_params(&normalize(&ParticleConfig::default()));
        let b = KernelVariant::from_params(&normalize(&ParticleConfig {
            blending: BlendMode::Alpha,
            ..Default::default()
        }));
        assert_ne!(a, b);
        assert_eq!(a, KernelVariant::default());
    }

    #[test]
    fn test_variants_key_a_pipeline_cache() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        for lighting in [Lighting::Basic, Lighting::Standard] {
            for orientation in [Orientation::Billboard, Orientation::Horizontal] {
                seen.insert(KernelVariant {
                    lighting,
                    orientation,
                    appearance: Appearance::Circular,
                    ..KernelVariant::default()
                });
            }
        }
        seen.insert(KernelVariant::default());
        seen.insert(KernelVariant::default());
        assert_eq!(seen.len(), 5);
    }
}
