//! Update kernel generation.
//!
//! One WGSL compute program is generated per [`FeatureFlags`] combination.
//! Each invocation owns one slot; there are no inter-particle dependencies.
//!
//! # Per-Slot Steps
//!
//! | Step | Always | Flag |
//! |------|--------|------|
//! | velocity-over-life factor, integrate position | ✓ | |
//! | gravity, eased friction | ✓ | |
//! | curl-noise turbulence | | `TURBULENCE` |
//! | attractors, attract-to-center | | `ATTRACTORS` |
//! | ground-plane collision | | `COLLISION` |
//! | reset non-finite velocity, advance age | ✓ | |
//! | integrate rotation | | `ROTATION` |
//! | write render instance | ✓ | tint colors with `PER_PARTICLE_COLOR` |
//!
//! Dead slots (`age >= lifetime`) are left untouched and write a dead
//! instance (size 0, alpha 0, alive 0).
//!
//! # Bindings (group 0)
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | `array<Particle>` read-write |
//! | 1 | `SimUniforms` uniform |
//! | 2 | `array<Instance>` read-write |
//! | 3 | curve texture, `Rgba32Float`, `resolution x 1` |
//! | 4 | `array<Tint>` read-only (`PER_PARTICLE_COLOR` only) |

use crate::buffer::PARTICLE_STRUCTS_WGSL;
use crate::features::FeatureFlags;
use crate::shader_utils::utils_for;
use crate::uniforms::SIM_UNIFORMS_WGSL;

/// Threads per workgroup.
pub const WORKGROUP_SIZE: u32 = 256;

/// Binding indices of the kernel's bind group.
pub mod binding {
    /// Particle records.
    pub const PARTICLES: u32 = 0;
    /// [`SimUniforms`](crate::uniforms::SimUniforms).
    pub const UNIFORMS: u32 = 1;
    /// Render instances.
    pub const INSTANCES: u32 = 2;
    /// Curve lookup texture.
    pub const CURVES: u32 = 3;
    /// Per-particle tints.
    pub const TINTS: u32 = 4;
}

/// Workgroups needed to cover `num_particles` slots.
pub fn workgroup_count(num_particles: u32) -> u32 {
    num_particles.div_ceil(WORKGROUP_SIZE)
}

const BINDINGS_WGSL: &str = r#"
@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;
@group(0) @binding(1) var<uniform> uniforms: SimUniforms;
@group(0) @binding(2) var<storage, read_write> instances: array<Instance>;
@group(0) @binding(3) var curve_texture: texture_2d<f32>;
"#;

const TINT_BINDING_WGSL: &str = r#"
@group(0) @binding(4) var<storage, read> tints: array<Tint>;
"#;

const HELPERS_WGSL: &str = r#"
// Linear lookup into the baked curves; mirrors CurveTexture::sample
fn sample_curves(t: f32) -> vec4<f32> {
    let width = i32(textureDimensions(curve_texture).x);
    let last = max(width - 1, 0);
    let x = clamp(t, 0.0, 1.0) * f32(last);
    let i0 = clamp(i32(floor(x)), 0, last);
    let i1 = min(i0 + 1, last);
    let f = x - f32(i0);
    let a = textureLoad(curve_texture, vec2<i32>(i0, 0), 0);
    let b = textureLoad(curve_texture, vec2<i32>(i1, 0), 0);
    return mix(a, b, f);
}

fn dead_instance(p: Particle) -> Instance {
    return Instance(
        vec4<f32>(p.position, 0.0),
        vec4<f32>(0.0),
        vec4<f32>(p.rotation, 0.0),
        vec4<f32>(0.0)
    );
}
"#;

const TURBULENCE_WGSL: &str = r#"
    // Turbulence
    {
        let turb = uniforms.turbulence;
        let sample_pos = p.position * turb.y + vec3<f32>(uniforms.timing.y * turb.z);
        p.velocity += curl_noise(sample_pos) * turb.x * dt;
    }
"#;

const ATTRACTORS_WGSL: &str = r#"
    // Attractors
    {
        let count = min(uniforms.flags.y, 4u);
        for (var k = 0u; k < count; k++) {
            let a = uniforms.attractors[k];
            let offset = uniforms.center.xyz + a.position_strength.xyz - p.position;
            let dist = length(offset);
            let radius = a.axis_radius.w;
            if dist < 0.001 || (radius > 0.0 && dist > radius) {
                continue;
            }
            let scale = a.position_strength.w * falloff(a.mode.y, dist, radius);
            let dir = offset / dist;
            if a.mode.x == 1u {
                p.velocity += cross(a.axis_radius.xyz, dir) * scale * dt;
            } else {
                p.velocity += dir * scale * dt;
            }
        }

        let to_center = uniforms.center.xyz - p.position;
        let center_dist = length(to_center);
        if uniforms.center.w != 0.0 && center_dist >= 0.001 {
            p.velocity += (to_center / center_dist) * uniforms.center.w * dt;
        }
    }
"#;

const COLLISION_WGSL: &str = r#"
    // Ground plane
    {
        let plane = uniforms.collision;
        if p.position.y < plane.x {
            if plane.w > 0.5 {
                p.age = p.lifetime;
            } else {
                p.position.y = plane.x;
                if p.velocity.y < 0.0 {
                    p.velocity.y = -p.velocity.y * plane.y;
                }
                p.velocity.x *= plane.z;
                p.velocity.z *= plane.z;
            }
        }
    }
"#;

const ROTATION_WGSL: &str = r#"
    // Rotation
    {
        let rot_factor = select(1.0, curves.a, (mask & 8u) != 0u);
        p.rotation += p.rotation_speed * rot_factor * dt;
    }
"#;

/// Generate the complete compute shader for a feature set.
pub fn generate_kernel(flags: FeatureFlags) -> String {
    let per_particle_color = flags.contains(FeatureFlags::PER_PARTICLE_COLOR);

    let section = |flag: FeatureFlags, code: &'static str| {
        if flags.contains(flag) {
            code
        } else {
            ""
        }
    };

    let color_source = if per_particle_color {
        "    let tint = tints[index];\n    let base_color = mix(tint.start, tint.end, t_out);"
    } else {
        "    let base_color = mix(uniforms.color_start, uniforms.color_end, t_out);"
    };

    format!(
        r#"// sparkfield update kernel [{label}]
{structs}
{uniforms}
{bindings}{tint_binding}
{utils}
{helpers}
@compute @workgroup_size({workgroup_size})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= arrayLength(&particles) {{
        return;
    }}

    var p = particles[index];
    if !(p.age < p.lifetime) {{
        instances[index] = dead_instance(p);
        return;
    }}

    let dt = uniforms.timing.x;
    let mask = uniforms.flags.x;
    let t = clamp(p.age / p.lifetime, 0.0, 1.0);
    let curves = sample_curves(t);

    let vel_factor = select(1.0, curves.b, (mask & 4u) != 0u);
    p.position += p.velocity * vel_factor * dt;
    p.velocity += uniforms.gravity.xyz * dt;
    p.velocity *= exp(-uniforms.friction.x * ease(uniforms.flags.z, t) * dt);
{turbulence}{attractors}{collision}
    if !(dot(p.velocity, p.velocity) < 1e30) {{
        p.velocity = vec3<f32>(0.0);
    }}
    p.age += dt;
{rotation}
    particles[index] = p;

    if !(p.age < p.lifetime) {{
        instances[index] = dead_instance(p);
        return;
    }}

    let t_out = clamp(p.age / p.lifetime, 0.0, 1.0);
    let visual = sample_curves(t_out);
    let size_factor = select(mix(uniforms.fade.x, uniforms.fade.y, t_out), visual.r, (mask & 1u) != 0u);
    let opacity = select(mix(uniforms.fade.z, uniforms.fade.w, t_out), visual.g, (mask & 2u) != 0u);
{color_source}
    let rgb = base_color.rgb * uniforms.misc.x;

    instances[index] = Instance(
        vec4<f32>(p.position, max(p.size * size_factor, 0.0)),
        vec4<f32>(rgb, clamp(base_color.a * opacity, 0.0, 1.0)),
        vec4<f32>(p.rotation, 1.0),
        vec4<f32>(p.velocity, 0.0)
    );
}}
"#,
        label = flags.label(),
        structs = PARTICLE_STRUCTS_WGSL,
        uniforms = SIM_UNIFORMS_WGSL,
        bindings = BINDINGS_WGSL,
        tint_binding = if per_particle_color { TINT_BINDING_WGSL } else { "" },
        utils = utils_for(flags),
        helpers = HELPERS_WGSL,
        workgroup_size = WORKGROUP_SIZE,
        turbulence = section(FeatureFlags::TURBULENCE, TURBULENCE_WGSL),
        attractors = section(FeatureFlags::ATTRACTORS, ATTRACTORS_WGSL),
        collision = section(FeatureFlags::COLLISION, COLLISION_WGSL),
        rotation = section(FeatureFlags::ROTATION, ROTATION_WGSL),
        color_source = color_source,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader_utils::validate_wgsl;

    fn all_flag_sets() -> impl Iterator<Item = FeatureFlags> {
        (0..=FeatureFlags::all().bits()).map(FeatureFlags::from_bits_truncate)
    }

    #[test]
    fn test_every_variant_validates() {
        let mut seen = 0;
        for flags in all_flag_sets() {
            let src = generate_kernel(flags);
            if let Err(err) = validate_wgsl(&src) {
                panic!("kernel [{}] failed: {err}\n{src}", flags.label());
            }
            seen += 1;
        }
        assert_eq!(seen, 32);
    }

    #[test]
    fn test_base_kernel_omits_optional_stages() {
        let src = generate_kernel(FeatureFlags::empty());
        assert!(!src.contains("curl_noise("));
        assert!(!src.contains("// Attractors"));
        assert!(!src.contains("// Ground plane"));
        assert!(!src.contains("// Rotation"));
        assert!(!src.contains("tints"));
        assert!(src.contains("@workgroup_size(256)"));
    }

    #[test]
    fn test_feature_sections_are_included() {
        let src = generate_kernel(FeatureFlags::TURBULENCE | FeatureFlags::COLLISION);
        assert!(src.contains("curl_noise(sample_pos)"));
        assert!(src.contains("// Ground plane"));
        assert!(!src.contains("// Attractors"));
    }

    #[test]
    fn test_per_particle_color_binds_tints() {
        let src = generate_kernel(FeatureFlags::PER_PARTICLE_COLOR);
        assert!(src.contains("@binding(4) var<storage, read> tints"));
        assert!(src.contains("mix(tint.start, tint.end, t_out)"));
        assert!(!src.contains("mix(uniforms.color_start"));
    }

    #[test]
    fn test_integration_order() {
        let src = generate_kernel(FeatureFlags::all());
        let pos = |needle: &str| src.find(needle).unwrap_or_else(|| panic!("missing {needle}"));
        assert!(pos("p.position += p.velocity") < pos("p.velocity += uniforms.gravity"));
        assert!(pos("p.velocity += uniforms.gravity") < pos("exp(-uniforms.friction.x"));
        assert!(pos("exp(-uniforms.friction.x") < pos("// Turbulence"));
        assert!(pos("// Turbulence") < pos("// Attractors"));
        assert!(pos("// Attractors") < pos("// Ground plane"));
        assert!(pos("// Ground plane") < pos("dot(p.velocity, p.velocity) < 1e30"));
        assert!(pos("dot(p.velocity, p.velocity) < 1e30") < pos("p.age += dt"));
        assert!(pos("p.age += dt") < pos("// Rotation"));
    }

    #[test]
    fn test_workgroup_count() {
        assert_eq!(workgroup_count(1), 1);
        assert_eq!(workgroup_count(256), 1);
        assert_eq!(workgroup_count(257), 2);
        assert_eq!(workgroup_count(10_000), 40);
    }
}
