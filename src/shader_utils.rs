//! Built-in WGSL utility functions for the update kernel.
//!
//! # Available Functions
//!
//! ## Easing
//! - `ease(kind: u32, t: f32) -> f32` - Easing by GPU id, see [`Easing`](crate::curve::Easing)
//!
//! ## Noise
//! - `noise3(p: vec3<f32>) -> f32` - 3D simplex noise in [-1, 1]
//! - `curl_noise(p: vec3<f32>) -> vec3<f32>` - Divergence-free curl of a simplex potential
//!
//! ## Forces
//! - `falloff(kind: u32, dist: f32, radius: f32) -> f32` - Attractor strength scale by falloff id
//!
//! Noise is only linked into kernels that use turbulence, see [`utils_for`].

use crate::features::FeatureFlags;

/// WGSL easing functions; case ids follow `Easing` declaration order.
pub const EASING_WGSL: &str = r#"
fn ease(kind: u32, x: f32) -> f32 {
    let t = clamp(x, 0.0, 1.0);
    var r = t;
    switch kind {
        case 1u: { r = t * t; }
        case 2u: { r = t * (2.0 - t); }
        case 3u: { r = select(-1.0 + (4.0 - 2.0 * t) * t, 2.0 * t * t, t < 0.5); }
        case 4u: { r = t * t * t; }
        case 5u: {
            let u = t - 1.0;
            r = u * u * u + 1.0;
        }
        case 6u: {
            let u = 2.0 * t - 2.0;
            r = select(0.5 * u * u * u + 1.0, 4.0 * t * t * t, t < 0.5);
        }
        default: {}
    }
    return r;
}
"#;

/// WGSL simplex noise and its curl.
pub const NOISE_WGSL: &str = r#"
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

// 3D simplex noise in [-1, 1]
fn noise3(v: vec3<f32>) -> f32 {
    let c = vec2<f32>(1.0 / 6.0, 1.0 / 3.0);

    var i = floor(v + dot(v, vec3<f32>(c.y)));
    let x0 = v - i + dot(i, vec3<f32>(c.x));

    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + c.x;
    let x2 = x0 - i2 + c.y;
    let x3 = x0 - 0.5;

    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
        + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
        + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    // Gradients on a 7x7 grid over the octahedron
    let ns = vec3<f32>(2.0 / 7.0, -0.5 - 1.0 / 7.0, 1.0 / 7.0);
    let j = p - 49.0 * floor(p * ns.z * ns.z);
    let gx = floor(j * ns.z);
    let gy = floor(j - 7.0 * gx);
    let x = gx * ns.x + ns.yyyy;
    let y = gy * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);
    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));
    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    let g0 = normalize(vec3<f32>(a0.xy, h.x));
    let g1 = normalize(vec3<f32>(a0.zw, h.y));
    let g2 = normalize(vec3<f32>(a1.xy, h.z));
    let g3 = normalize(vec3<f32>(a1.zw, h.w));

    var m = max(0.6 - vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4<f32>(dot(g0, x0), dot(g1, x1), dot(g2, x2), dot(g3, x3)));
}

fn noise_potential(p: vec3<f32>) -> vec3<f32> {
    return vec3<f32>(
        noise3(p),
        noise3(p + vec3<f32>(31.416, -47.853, 12.793)),
        noise3(p + vec3<f32>(-233.145, -113.408, -185.31))
    );
}

// Curl of the potential by central differences
fn curl_noise(p: vec3<f32>) -> vec3<f32> {
    let e = 0.01;
    let dx = vec3<f32>(e, 0.0, 0.0);
    let dy = vec3<f32>(0.0, e, 0.0);
    let dz = vec3<f32>(0.0, 0.0, e);

    let px0 = noise_potential(p - dx);
    let px1 = noise_potential(p + dx);
    let py0 = noise_potential(p - dy);
    let py1 = noise_potential(p + dy);
    let pz0 = noise_potential(p - dz);
    let pz1 = noise_potential(p + dz);

    let curl = vec3<f32>(
        (py1.z - py0.z) - (pz1.y - pz0.y),
        (pz1.x - pz0.x) - (px1.z - px0.z),
        (px1.y - px0.y) - (py1.x - py0.x)
    );
    return curl / (2.0 * e);
}
"#;

/// WGSL attractor falloff; case ids follow `Falloff` declaration order.
pub const FALLOFF_WGSL: &str = r#"
fn falloff(kind: u32, dist: f32, radius: f32) -> f32 {
    var f = 1.0;
    switch kind {
        case 1u: {
            if radius > 0.0 {
                f = max(1.0 - dist / radius, 0.0);
            } else {
                f = 1.0 / (1.0 + dist);
            }
        }
        case 2u: { f = 1.0 / (dist + 0.01); }
        case 3u: { f = 1.0 / (dist * dist + 0.01); }
        case 4u: {
            if radius > 0.0 {
                f = 1.0 - smoothstep(0.0, radius, dist);
            }
        }
        default: {}
    }
    return f;
}
"#;

/// Utility functions needed by a kernel with the given features.
pub fn utils_for(flags: FeatureFlags) -> String {
    let mut out = String::from("// Built-in utility functions\n");
    out.push_str(EASING_WGSL);
    if flags.contains(FeatureFlags::TURBULENCE) {
        out.push_str(NOISE_WGSL);
    }
    if flags.contains(FeatureFlags::ATTRACTORS) {
        out.push_str(FALLOFF_WGSL);
    }
    out
}

/// Parse and validate a WGSL module with naga.
#[cfg(test)]
pub(crate) fn validate_wgsl(code: &str) -> Result<(), String> {
    let module =
        naga::front::wgsl::parse_str(code).map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(())
}
