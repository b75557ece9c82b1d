//! # sparkfield
//!
//! GPU particle effects from a declarative configuration.
//!
//! A [`ParticleSystem`] keeps a fixed pool of particles in a GPU buffer and
//! advances them every frame with a generated compute kernel. The host owns
//! the device, the render pass and the frame loop; sparkfield owns the
//! particle buffers, the kernel and an instanced render object.
//!
//! ## Quick Start
//!
//! ```ignore
//! use sparkfield::prelude::*;
//! use serde_json::json;
//!
//! let ctx = GpuContext::headless()?;
//! let mut system = ParticleSystem::from_json(&json!({
//!     "maxParticles": 5000,
//!     "lifetime": [1.0, 2.0],
//!     "speed": [1.0, 3.0],
//!     "gravity": [0.0, -9.8, 0.0],
//!     "colorStart": ["#ffcc00", "#ff6600"],
//!     "sizeCurve": "easeOut",
//!     "collision": { "planeY": 0.0, "bounce": 0.4 },
//! }));
//! system.init(&ctx)?;
//!
//! system.spawn(0.0, 1.0, 0.0, 200, None);
//! system.update(1.0 / 60.0);
//! ```
//!
//! ## Core Concepts
//!
//! ### Configuration
//!
//! [`ParticleConfig`] is the raw, serde-friendly option set with camelCase
//! keys. Ranges accept a number or `[min, max]`, colors accept hex strings
//! or component lists. [`normalize`](normalize::normalize) turns it into
//! fixed-shape [`NormalizedParams`] and never fails: bad values are clamped
//! or defaulted and logged.
//!
//! ### Slots
//!
//! The particle buffer never grows. Spawning claims the next slots after a
//! cursor and overwrites them whether or not they are alive; a particle dies
//! when its age reaches its lifetime.
//!
//! ### Variants
//!
//! Optional kernel stages are selected by [`FeatureFlags`]; together with
//! the render settings they form a [`KernelVariant`]. Changing a value inside
//! the same variant updates uniforms in place. Switching variant or capacity
//! rebuilds all GPU resources.
//!
//! ## Feature Overview
//!
//! | Category | Options |
//! |----------|---------|
//! | Emission | `emitterShape` (point, box, sphere, cone, cylinder, disk), `delay`, `emitCount` |
//! | Motion | `speed`, `direction`, `gravity`, `friction` |
//! | Forces | `turbulence`, `attractors`, `attractToCenter` |
//! | Collision | `collision` ground plane, bounce or die |
//! | Over life | `fadeSize`, `fadeOpacity`, `sizeCurve`, `opacityCurve`, `velocityCurve`, `rotationSpeedCurve` |
//! | Appearance | `appearance`, `lighting`, `orientation`, `blending`, `colorStart`, `colorEnd` |

extern crate self as sparkfield;

pub mod buffer;
pub mod clock;
pub mod config;
pub mod curve;
pub mod debug_panel;
pub mod emission;
pub mod error;
pub mod features;
pub mod gpu;
pub mod kernel;
pub mod normalize;
pub mod presets;
pub mod render;
pub mod shader_utils;
mod system;
pub mod uniforms;

pub use bytemuck;
pub use buffer::{Allocator, InstanceGpu, ParticleGpu, SlotRange};
pub use config::ParticleConfig;
pub use curve::{CurveInput, CurvePoint, CurveTexture, Easing};
pub use debug_panel::{ChangeSink, DebugPanel};
pub use emission::SpawnOverrides;
pub use error::{CurveTextureError, Error, GpuError, Result};
pub use features::{classify, Classification, FeatureFlags, KernelVariant};
pub use glam::{Mat4, Vec2, Vec3, Vec4};
pub use gpu::GpuContext;
pub use normalize::NormalizedParams;
pub use presets::Preset;
pub use render::{MaterialParams, RenderObject, RenderTarget};
pub use sparkfield_derive::{ConfigFields, GpuEnum};
pub use system::ParticleSystem;
pub use uniforms::SimUniforms;

/// Key-level comparison of configuration structs.
///
/// Implemented by `#[derive(ConfigFields)]`; keys are the serialized
/// (camelCase) field names.
pub trait ConfigFields {
    /// Every key, in declaration order.
    const KEYS: &'static [&'static str];

    /// Keys whose change requires rebuilding GPU resources.
    const STRUCTURAL_KEYS: &'static [&'static str];

    /// Keys whose values differ between `self` and `other`.
    fn changed_keys(&self, other: &Self) -> Vec<&'static str>;

    /// Copy the field behind `key` from `source`. Returns false for
    /// unknown keys.
    fn copy_key(&mut self, source: &Self, key: &str) -> bool;
}

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use sparkfield::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        Appearance, AttractorConfig, AttractorKind, BlendMode, CollisionConfig, ColorInput,
        EmitterShape, Falloff, FrictionConfig, Lighting, Orientation, ParticleConfig, RangeInput,
        TurbulenceConfig, Vec3RangeInput,
    };
    pub use crate::curve::{CurveInput, CurvePoint, Easing};
    pub use crate::debug_panel::{ChangeSink, DebugPanel};
    pub use crate::emission::SpawnOverrides;
    pub use crate::gpu::GpuContext;
    pub use crate::presets::{self, Preset};
    pub use crate::render::{RenderObject, RenderTarget};
    pub use crate::system::ParticleSystem;
    pub use crate::{Mat4, Vec2, Vec3, Vec4};
}
