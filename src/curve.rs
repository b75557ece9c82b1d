//! Curve baking for over-lifetime animation.
//!
//! Curves describe how a value evolves over a particle's normalized age
//! (`0.0` at spawn, `1.0` at death). They are baked once on the CPU into a
//! fixed-resolution lookup table and packed into the four channels of a
//! single texture that the update kernel samples:
//!
//! | Channel | Curve |
//! |---------|-------|
//! | R | size over life |
//! | G | opacity over life |
//! | B | velocity over life |
//! | A | rotation speed over life |
//!
//! # Curve Inputs
//!
//! ```ignore
//! // An easing identifier
//! let curve: CurveInput = serde_json::from_str(r#""easeOutCubic""#)?;
//!
//! // Control points, optionally with bezier handles
//! let curve: CurveInput = serde_json::from_str(r#"{
//!     "points": [
//!         { "pos": [0.0, 0.0], "handleOut": [0.3, 0.0] },
//!         { "pos": [1.0, 1.0], "handleIn": [-0.3, 0.0] }
//!     ]
//! }"#)?;
//! ```
//!
//! Control points outside `[0, 1]` are clamped on both axes.

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use crossbeam_channel::{Receiver, TryRecvError};
use serde::{Deserialize, Serialize};
use sparkfield_derive::GpuEnum;

use crate::error::CurveTextureError;

/// Samples per baked curve.
pub const DEFAULT_CURVE_RESOLUTION: u32 = 256;

/// Bisection steps used to invert the x(t) of a bezier segment.
const BEZIER_SOLVE_STEPS: usize = 24;

/// Standard easing functions.
///
/// The GPU id order (see [`GpuEnum`]) must match the `ease()` switch in the
/// kernel's utility WGSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, GpuEnum)]
#[serde(rename_all = "camelCase")]
pub enum Easing {
    /// `t`
    #[default]
    Linear,
    /// Quadratic ease-in.
    EaseIn,
    /// Quadratic ease-out.
    EaseOut,
    /// Quadratic ease-in-out.
    EaseInOut,
    /// Cubic ease-in.
    EaseInCubic,
    /// Cubic ease-out.
    EaseOutCubic,
    /// Cubic ease-in-out.
    EaseInOutCubic,
}

impl Easing {
    /// Evaluate the easing at `t` (clamped to `[0, 1]`).
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::EaseInCubic => t * t * t,
            Easing::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Easing::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }
        }
    }
}

/// A control point of a curve.
///
/// `handle_in` / `handle_out` are offsets relative to `pos`. A segment where
/// neither adjacent handle is set is linear.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePoint {
    /// `[x, y]` position, x = normalized age.
    pub pos: [f32; 2],
    /// Incoming bezier handle offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_in: Option<[f32; 2]>,
    /// Outgoing bezier handle offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_out: Option<[f32; 2]>,
}

impl CurvePoint {
    /// A point without handles.
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            pos: [x, y],
            handle_in: None,
            handle_out: None,
        }
    }
}

/// User-facing description of a curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CurveInput {
    /// A named easing function.
    Easing(Easing),
    /// Control points.
    Points {
        /// Points in any order; they are sorted by x before baking.
        points: Vec<CurvePoint>,
    },
}

impl From<Easing> for CurveInput {
    fn from(easing: Easing) -> Self {
        CurveInput::Easing(easing)
    }
}

impl From<Vec<CurvePoint>> for CurveInput {
    fn from(points: Vec<CurvePoint>) -> Self {
        CurveInput::Points { points }
    }
}

/// Bake a curve into `resolution` samples spanning normalized time `[0, 1]`.
///
/// Sample `i` is taken at `t = i / (resolution - 1)`. Resolution is clamped
/// to at least 2. A curve with no points bakes to a constant `1.0`.
pub fn bake(curve: &CurveInput, resolution: u32) -> Vec<f32> {
    let resolution = resolution.max(2) as usize;
    let step = 1.0 / (resolution - 1) as f32;

    match curve {
        CurveInput::Easing(easing) => (0..resolution)
            .map(|i| easing.apply(i as f32 * step))
            .collect(),
        CurveInput::Points { points } => {
            let points = prepare_points(points);
            (0..resolution)
                .map(|i| evaluate_points(&points, i as f32 * step))
                .collect()
        }
    }
}

fn clamp_unit(v: [f32; 2]) -> [f32; 2] {
    let fix = |c: f32| if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 };
    [fix(v[0]), fix(v[1])]
}

/// Clamp points (and the absolute position of their handles) into the unit
/// square and sort them by x.
fn prepare_points(points: &[CurvePoint]) -> Vec<CurvePoint> {
    let mut clamped_any = false;
    let mut prepared: Vec<CurvePoint> = points
        .iter()
        .map(|p| {
            let pos = clamp_unit(p.pos);
            let handle = |h: Option<[f32; 2]>| {
                h.map(|h| {
                    let abs = clamp_unit([p.pos[0] + h[0], p.pos[1] + h[1]]);
                    [abs[0] - pos[0], abs[1] - pos[1]]
                })
            };
            let out = CurvePoint {
                pos,
                handle_in: handle(p.handle_in),
                handle_out: handle(p.handle_out),
            };
            if out != *p {
                clamped_any = true;
            }
            out
        })
        .collect();

    if clamped_any {
        log::warn!("curve control points outside [0, 1] were clamped");
    }

    prepared.sort_by(|a, b| a.pos[0].total_cmp(&b.pos[0]));
    prepared
}

fn evaluate_points(points: &[CurvePoint], x: f32) -> f32 {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 1.0,
    };

    if x <= first.pos[0] {
        return first.pos[1];
    }
    if x >= last.pos[0] {
        return last.pos[1];
    }

    let seg = points
        .windows(2)
        .find(|w| x >= w[0].pos[0] && x <= w[1].pos[0]);
    let Some([p0, p1]) = seg.map(|w| [w[0], w[1]]) else {
        return last.pos[1];
    };

    let dx = p1.pos[0] - p0.pos[0];
    if dx <= f32::EPSILON {
        return p1.pos[1];
    }

    if p0.handle_out.is_none() && p1.handle_in.is_none() {
        let t = (x - p0.pos[0]) / dx;
        return p0.pos[1] + (p1.pos[1] - p0.pos[1]) * t;
    }

    // Cubic bezier; control x is kept inside the segment so x(t) is monotonic.
    let out = p0.handle_out.unwrap_or([0.0, 0.0]);
    let inn = p1.handle_in.unwrap_or([0.0, 0.0]);
    let c0 = p0.pos;
    let c1 = [
        (c0[0] + out[0]).clamp(p0.pos[0], p1.pos[0]),
        c0[1] + out[1],
    ];
    let c3 = p1.pos;
    let c2 = [(c3[0] + inn[0]).clamp(p0.pos[0], p1.pos[0]), c3[1] + inn[1]];

    let cubic = |a: f32, b: f32, c: f32, d: f32, t: f32| {
        let u = 1.0 - t;
        u * u * u * a + 3.0 * u * u * t * b + 3.0 * u * t * t * c + t * t * t * d
    };

    let (mut lo, mut hi) = (0.0f32, 1.0f32);
    for _ in 0..BEZIER_SOLVE_STEPS {
        let mid = 0.5 * (lo + hi);
        if cubic(c0[0], c1[0], c2[0], c3[0], mid) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let t = 0.5 * (lo + hi);
    cubic(c0[1], c1[1], c2[1], c3[1], t)
}

bitflags! {
    /// Which channels of the curve texture carry a supplied curve.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CurveChannels: u32 {
        /// R: size over life.
        const SIZE = 1 << 0;
        /// G: opacity over life.
        const OPACITY = 1 << 1;
        /// B: velocity over life.
        const VELOCITY = 1 << 2;
        /// A: rotation speed over life.
        const ROTATION_SPEED = 1 << 3;
    }
}

/// The four over-life curves of a particle system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurveSet {
    /// Multiplier applied to particle size.
    pub size: Option<CurveInput>,
    /// Particle opacity.
    pub opacity: Option<CurveInput>,
    /// Multiplier applied to velocity during integration.
    pub velocity: Option<CurveInput>,
    /// Multiplier applied to rotation speed.
    pub rotation_speed: Option<CurveInput>,
}

impl CurveSet {
    /// Channels that have a curve supplied.
    pub fn channels(&self) -> CurveChannels {
        let mut channels = CurveChannels::empty();
        channels.set(CurveChannels::SIZE, self.size.is_some());
        channels.set(CurveChannels::OPACITY, self.opacity.is_some());
        channels.set(CurveChannels::VELOCITY, self.velocity.is_some());
        channels.set(CurveChannels::ROTATION_SPEED, self.rotation_speed.is_some());
        channels
    }

    /// Whether no curve is supplied.
    pub fn is_empty(&self) -> bool {
        self.channels().is_empty()
    }

    /// Bake every supplied curve and pack them into one texture.
    ///
    /// Absent curves leave their channel zeroed and their bit cleared.
    pub fn pack(&self, resolution: u32) -> CurveTexture {
        let resolution = resolution.max(2);
        let mut texture = CurveTexture::disabled(resolution);
        let slots = [&self.size, &self.opacity, &self.velocity, &self.rotation_speed];

        for (channel, curve) in slots.into_iter().enumerate() {
            if let Some(curve) = curve {
                for (texel, value) in texture.texels.iter_mut().zip(bake(curve, resolution)) {
                    texel[channel] = value;
                }
            }
        }
        texture.channels = self.channels();
        texture
    }
}

/// Baked curve data, one RGBA texel per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveTexture {
    texels: Vec<[f32; 4]>,
    channels: CurveChannels,
}

impl CurveTexture {
    /// A texture with every channel zeroed and disabled.
    pub fn disabled(resolution: u32) -> Self {
        Self {
            texels: vec![[0.0; 4]; resolution.max(1) as usize],
            channels: CurveChannels::empty(),
        }
    }

    /// Number of samples per channel (texture width).
    pub fn resolution(&self) -> u32 {
        self.texels.len() as u32
    }

    /// Enabled channels.
    pub fn channels(&self) -> CurveChannels {
        self.channels
    }

    /// Raw texels.
    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Texel bytes for upload as `Rgba32Float`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Linearly sample all channels at normalized age `t`.
    ///
    /// Mirrors the kernel's `sample_curves()`.
    pub fn sample(&self, t: f32) -> [f32; 4] {
        let last = self.texels.len().saturating_sub(1);
        let x = t.clamp(0.0, 1.0) * last as f32;
        let i0 = (x.floor() as usize).min(last);
        let i1 = (i0 + 1).min(last);
        let f = x - i0 as f32;
        let (a, b) = (self.texels[i0], self.texels[i1]);
        [
            a[0] + (b[0] - a[0]) * f,
            a[1] + (b[1] - a[1]) * f,
            a[2] + (b[2] - a[2]) * f,
            a[3] + (b[3] - a[3]) * f,
        ]
    }

    /// Resample to a different resolution, keeping the enabled channels.
    pub fn resampled(&self, resolution: u32) -> Self {
        let resolution = resolution.max(2) as usize;
        if resolution == self.texels.len() {
            return self.clone();
        }
        let step = 1.0 / (resolution - 1) as f32;
        Self {
            texels: (0..resolution).map(|i| self.sample(i as f32 * step)).collect(),
            channels: self.channels,
        }
    }

    /// Load a pre-baked curve texture from an 8-bit RGBA image.
    ///
    /// Row 0 is used; every channel is enabled.
    pub fn load_png<P: AsRef<Path>>(path: P) -> Result<Self, CurveTextureError> {
        let img = image::open(path.as_ref())?.into_rgba8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(CurveTextureError::EmptyImage);
        }
        let texels = (0..width)
            .map(|x| {
                let px = img.get_pixel(x, 0).0;
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                    px[3] as f32 / 255.0,
                ]
            })
            .collect();
        Ok(Self {
            texels,
            channels: CurveChannels::all(),
        })
    }

    /// Save as an 8-bit RGBA image, `resolution x 1` pixels.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), CurveTextureError> {
        let bytes: Vec<u8> = self
            .texels
            .iter()
            .flat_map(|t| t.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        let img = image::RgbaImage::from_raw(self.resolution(), 1, bytes)
            .ok_or(CurveTextureError::EmptyImage)?;
        img.save(path.as_ref())?;
        Ok(())
    }
}

/// A curve texture being loaded on a background thread.
///
/// Poll once per frame; until it resolves the inline curves stay in effect.
pub struct PendingCurveTexture {
    path: PathBuf,
    rx: Receiver<Result<CurveTexture, CurveTextureError>>,
}

impl PendingCurveTexture {
    /// Start loading `path`.
    pub fn spawn(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let thread_path = path.clone();
        let spawned = std::thread::Builder::new()
            .name("curve-texture-loader".into())
            .spawn({
                let tx = tx.clone();
                move || {
                    let _ = tx.send(CurveTexture::load_png(&thread_path));
                }
            });
        if let Err(err) = spawned {
            let _ = tx.send(Err(CurveTextureError::Io(err)));
        }
        Self { path, rx }
    }

    /// Path being loaded.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking check for the result.
    pub fn poll(&self) -> Option<Result<CurveTexture, CurveTextureError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CurveTextureError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "curve texture loader exited without a result",
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_linear_easing_bakes_ramp() {
        let samples = bake(&Easing::Linear.into(), 5);
        assert_eq!(samples.len(), 5);
        for (i, s) in samples.iter().enumerate() {
            assert!(approx(*s, i as f32 / 4.0));
        }
    }

    #[test]
    fn test_easing_endpoints() {
        for id in 0..Easing::count() {
            let easing = Easing::from(id);
            assert!(approx(easing.apply(0.0), 0.0), "{easing:?} at 0");
            assert!(approx(easing.apply(1.0), 1.0), "{easing:?} at 1");
        }
    }

    #[test]
    fn test_easing_gpu_ids_are_stable() {
        assert_eq!(u32::from(Easing::Linear), 0);
        assert_eq!(u32::from(Easing::EaseInOutCubic), 6);
        assert_eq!(Easing::from(99), Easing::Linear);
    }

    #[test]
    fn test_resolution_is_at_least_two() {
        assert_eq!(bake(&Easing::EaseIn.into(), 0).len(), 2);
    }

    #[test]
    fn test_points_are_clamped_and_sorted() {
        let curve = CurveInput::from(vec![
            CurvePoint::new(1.5, 2.0),
            CurvePoint::new(-1.0, -3.0),
        ]);
        let samples = bake(&curve, 3);
        assert!(approx(samples[0], 0.0));
        assert!(approx(samples[1], 0.5));
        assert!(approx(samples[2], 1.0));
    }

    #[test]
    fn test_empty_points_bake_to_one() {
        let samples = bake(&CurveInput::Points { points: vec![] }, 4);
        assert!(samples.iter().all(|s| approx(*s, 1.0)));
    }

    #[test]
    fn test_single_point_is_constant() {
        let samples = bake(&CurveInput::from(vec![CurvePoint::new(0.3, 0.7)]), 8);
        assert!(samples.iter().all(|s| approx(*s, 0.7)));
    }

    #[test]
    fn test_bezier_segment_eases() {
        let curve = CurveInput::from(vec![
            CurvePoint {
                pos: [0.0, 0.0],
                handle_in: None,
                handle_out: Some([0.5, 0.0]),
            },
            CurvePoint {
                pos: [1.0, 1.0],
                handle_in: Some([-0.5, 0.0]),
                handle_out: None,
            },
        ]);
        let samples = bake(&curve, 101);
        assert!(approx(samples[0], 0.0));
        assert!(approx(samples[100], 1.0));
        assert!(approx(samples[50], 0.5));
        // Flat tangents at both ends: slow start.
        assert!(samples[10] < 0.1);
        assert!(samples.windows(2).all(|w| w[1] >= w[0] - 1e-4));
    }

    #[test]
    fn test_curve_input_deserializes_both_forms() {
        let easing: CurveInput = serde_json::from_str(r#""easeOutCubic""#).unwrap();
        assert_eq!(easing, CurveInput::Easing(Easing::EaseOutCubic));

        let points: CurveInput =
            serde_json::from_str(r#"{"points":[{"pos":[0,1]},{"pos":[1,0],"handleIn":[-0.2,0]}]}"#)
                .unwrap();
        match points {
            CurveInput::Points { points } => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[1].handle_in, Some([-0.2, 0.0]));
            }
            other => panic!("expected points, got {other:?}"),
        }
    }

    #[test]
    fn test_pack_mask_mirrors_supplied_curves() {
        let set = CurveSet {
            size: Some(Easing::Linear.into()),
            velocity: Some(Easing::EaseIn.into()),
            ..Default::default()
        };
        let texture = set.pack(16);
        assert_eq!(texture.channels(), CurveChannels::SIZE | CurveChannels::VELOCITY);
        assert_eq!(texture.resolution(), 16);
        // Absent channels stay zeroed.
        assert!(texture.texels().iter().all(|t| t[1] == 0.0 && t[3] == 0.0));
        assert!(approx(texture.texels()[15][0], 1.0));
    }

    #[test]
    fn test_removing_curve_clears_channel() {
        let mut set = CurveSet {
            opacity: Some(Easing::EaseOut.into()),
            ..Default::default()
        };
        assert!(set.pack(8).channels().contains(CurveChannels::OPACITY));

        set.opacity = None;
        let texture = set.pack(8);
        assert!(texture.channels().is_empty());
        assert!(texture.texels().iter().all(|t| *t == [0.0; 4]));
    }

    #[test]
    fn test_sample_interpolates() {
        let set = CurveSet {
            size: Some(Easing::Linear.into()),
            ..Default::default()
        };
        let texture = set.pack(3);
        assert!(approx(texture.sample(0.25)[0], 0.25));
        assert!(approx(texture.sample(2.0)[0], 1.0));
    }

    #[test]
    fn test_resampled_keeps_shape() {
        let set = CurveSet {
            opacity: Some(Easing::Linear.into()),
            ..Default::default()
        };
        let texture = set.pack(4).resampled(9);
        assert_eq!(texture.resolution(), 9);
        assert!(approx(texture.texels()[4][1], 0.5));
        assert_eq!(texture.channels(), CurveChannels::OPACITY);
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curves.png");

        let set = CurveSet {
            size: Some(Easing::Linear.into()),
            opacity: Some(Easing::EaseOut.into()),
            ..Default::default()
        };
        let texture = set.pack(32);
        texture.save_png(&path).unwrap();

        let loaded = CurveTexture::load_png(&path).unwrap();
        assert_eq!(loaded.resolution(), 32);
        assert_eq!(loaded.channels(), CurveChannels::all());
        for (a, b) in texture.texels().iter().zip(loaded.texels()) {
            for c in 0..4 {
                assert!((a[c] - b[c]).abs() <= 1.0 / 255.0 + 1e-6);
            }
        }
    }

    #[test]
    fn test_pending_texture_reports_missing_file() {
        let pending = PendingCurveTexture::spawn("/definitely/not/here.png");
        let result = loop {
            if let Some(result) = pending.poll() {
                break result;
            }
            std::thread::yield_now();
        };
        assert!(result.is_err());
    }
}
