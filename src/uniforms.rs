//! Uniform block shared by the update kernel.
//!
//! [`SimUniforms`] is rebuilt from [`NormalizedParams`] whenever a
//! uniform-level option changes and its timing row is rewritten every frame.
//! Every member is a 16-byte row so the Rust layout matches WGSL uniform
//! layout rules without manual padding.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

use crate::curve::CurveChannels;
use crate::normalize::{pick_stop, NormalizedParams, MAX_ATTRACTORS};

/// One attractor slot.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AttractorGpu {
    /// xyz = position relative to the system, w = strength.
    pub position_strength: [f32; 4],
    /// xyz = unit vortex axis, w = cut-off radius (0 = none).
    pub axis_radius: [f32; 4],
    /// x = kind id, y = falloff id.
    pub mode: [u32; 4],
}

/// Simulation uniforms, mirrored by WGSL `SimUniforms`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimUniforms {
    /// x = dt, y = turbulence time, z = elapsed seconds.
    pub timing: [f32; 4],
    /// xyz = gravity.
    pub gravity: [f32; 4],
    /// x = friction intensity.
    pub friction: [f32; 4],
    /// size start, size end, opacity start, opacity end.
    pub fade: [f32; 4],
    /// intensity, frequency, speed.
    pub turbulence: [f32; 4],
    /// plane y, bounce, friction, die (0 or 1).
    pub collision: [f32; 4],
    /// xyz = system position, w = attract-to-center strength.
    pub center: [f32; 4],
    /// Start color when colors are not stored per particle.
    pub color_start: [f32; 4],
    /// End color when colors are not stored per particle.
    pub color_end: [f32; 4],
    /// x = intensity, y = soft distance.
    pub misc: [f32; 4],
    /// x = curve mask, y = attractor count, z = friction easing id.
    pub flags: [u32; 4],
    /// Attractor slots; only the first `flags.y` are read.
    pub attractors: [AttractorGpu; MAX_ATTRACTORS],
}

impl Default for SimUniforms {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl SimUniforms {
    /// Build the parameter rows. Timing starts at zero.
    pub fn from_params(params: &NormalizedParams, curves: CurveChannels) -> Self {
        let mut u = Self::zeroed();
        u.gravity = params.gravity.extend(0.0).to_array();
        u.friction = [params.friction.intensity, 0.0, 0.0, 0.0];
        u.fade = [
            params.fade_size.start,
            params.fade_size.end,
            params.fade_opacity.start,
            params.fade_opacity.end,
        ];
        if let Some(t) = params.turbulence {
            u.turbulence = [t.intensity, t.frequency, t.speed, 0.0];
        }
        if let Some(c) = params.collision {
            u.collision = [c.plane_y, c.bounce, c.friction, if c.die { 1.0 } else { 0.0 }];
        }
        u.center = params.position.extend(params.attract_to_center).to_array();
        u.color_start = pick_stop(&params.color_start, 0.0).to_array();
        u.color_end = pick_stop(&params.color_end, 0.0).to_array();
        u.misc = [params.intensity, params.soft_distance, 0.0, 0.0];
        u.flags = [
            curves.bits(),
            params.attractors.len() as u32,
            params.friction.easing.into(),
            0,
        ];
        for (slot, a) in u.attractors.iter_mut().zip(&params.attractors) {
            *slot = AttractorGpu {
                position_strength: a.position.extend(a.strength).to_array(),
                axis_radius: a.axis.extend(a.radius).to_array(),
                mode: [a.kind.into(), a.falloff.into(), 0, 0],
            };
        }
        u
    }

    /// Write the per-frame timing row.
    pub fn set_timing(&mut self, dt: f32, turbulence_time: f32, elapsed: f32) {
        self.timing = [dt, turbulence_time, elapsed, 0.0];
    }

    /// Move the system origin used by attract-to-center.
    pub fn set_center(&mut self, position: Vec3) {
        self.center = position.extend(self.center[3]).to_array();
    }

    /// Replace the curve mask.
    pub fn set_curve_mask(&mut self, curves: CurveChannels) {
        self.flags[0] = curves.bits();
    }

    /// Enabled curve channels.
    pub fn curve_mask(&self) -> CurveChannels {
        CurveChannels::from_bits_truncate(self.flags[0])
    }

    /// Uniform start color.
    pub fn color_start(&self) -> Vec4 {
        Vec4::from(self.color_start)
    }

    /// Uniform end color.
    pub fn color_end(&self) -> Vec4 {
        Vec4::from(self.color_end)
    }

    /// Everything except the timing row; two uniform sets with the same
    /// parameters compare equal here regardless of frame time.
    pub fn same_parameters(&self, other: &Self) -> bool {
        let mut a = *self;
        let mut b = *other;
        a.timing = [0.0; 4];
        b.timing = [0.0; 4];
        a == b
    }
}

/// WGSL declaration of [`SimUniforms`].
pub const SIM_UNIFORMS_WGSL: &str = r#"
struct Attractor {
    position_strength: vec4<f32>,
    axis_radius: vec4<f32>,
    mode: vec4<u32>,
};

struct SimUniforms {
    timing: vec4<f32>,
    gravity: vec4<f32>,
    friction: vec4<f32>,
    fade: vec4<f32>,
    turbulence: vec4<f32>,
    collision: vec4<f32>,
    center: vec4<f32>,
    color_start: vec4<f32>,
    color_end: vec4<f32>,
    misc: vec4<f32>,
    flags: vec4<u32>,
    attractors: array<Attractor, 4>,
};
"#;
