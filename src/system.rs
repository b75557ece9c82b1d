//! The particle system facade.
//!
//! [`ParticleSystem`] owns the configuration, its normalized form and the
//! GPU resources built from it. The host creates a system, calls
//! [`init`](ParticleSystem::init) once it has a device, then
//! [`update`](ParticleSystem::update) every frame and draws
//! [`render_object`](ParticleSystem::render_object) in its own pass.
//!
//! ```ignore
//! let ctx = GpuContext::headless()?;
//! let mut system = ParticleSystem::new(presets::fire(Vec3::ZERO));
//! system.init(&ctx)?;
//!
//! loop {
//!     system.set_camera(view, proj);
//!     system.update(frame_dt);
//!     // host render pass
//!     if let Some(object) = system.render_object() {
//!         object.draw(&mut pass);
//!     }
//! }
//! ```
//!
//! # Configuration Changes
//!
//! [`set_props`](ParticleSystem::set_props) and
//! [`set_config`](ParticleSystem::set_config) compare the new configuration
//! with the current one. Uniform-level changes rewrite the uniforms and
//! curve texture in place; live particles keep their age and position.
//! Structural changes (capacity, render settings, a feature switching on or
//! off) build a complete new resource set first and only replace the old
//! one if that succeeds.

use glam::{Mat4, Vec3};
use serde_json::Value;

use crate::buffer::{Allocator, InstanceGpu, ParticleGpu};
use crate::clock::{EmissionTimer, SimClock};
use crate::config::ParticleConfig;
use crate::curve::{CurveTexture, PendingCurveTexture, DEFAULT_CURVE_RESOLUTION};
use crate::debug_panel::{AttachedPanel, DebugPanel};
use crate::emission::{EmissionParams, Emitter, SpawnOverrides};
use crate::error::Result;
use crate::features::{Classification, FeatureFlags, KernelVariant};
use crate::gpu::{GpuContext, GpuResources};
use crate::normalize::{normalize, NormalizedParams};
use crate::render::{MaterialParams, RenderObject, RenderTarget, RenderUniforms};
use crate::uniforms::SimUniforms;

/// A GPU particle system driven by a declarative configuration.
pub struct ParticleSystem {
    config: ParticleConfig,
    params: NormalizedParams,
    features: FeatureFlags,
    variant: KernelVariant,
    uniforms: SimUniforms,
    curves: CurveTexture,
    loaded_curves: Option<CurveTexture>,
    emission: EmissionParams,
    emitter: Emitter,
    allocator: Allocator,
    clock: SimClock,
    timer: EmissionTimer,
    emitting: bool,
    target: RenderTarget,
    view: Mat4,
    proj: Mat4,
    ctx: Option<GpuContext>,
    resources: Option<GpuResources>,
    pending_curves: Option<PendingCurveTexture>,
    panel: Option<AttachedPanel>,
}

impl ParticleSystem {
    /// Create a system. No GPU work happens until [`init`](Self::init).
    pub fn new(config: ParticleConfig) -> Self {
        let params = normalize(&config);
        let features = FeatureFlags::from_params(&params);
        let variant = KernelVariant::from_params(&params);
        let curves = params.curves.pack(DEFAULT_CURVE_RESOLUTION);
        let uniforms = SimUniforms::from_params(&params, curves.channels());

        Self {
            emission: EmissionParams::from_params(&params),
            emitter: Emitter::new(params.seed),
            allocator: Allocator::new(params.max_particles),
            clock: SimClock::new(),
            timer: EmissionTimer::default(),
            emitting: params.auto_start,
            target: RenderTarget::default(),
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            ctx: None,
            resources: None,
            pending_curves: None,
            panel: None,
            loaded_curves: None,
            config,
            params,
            features,
            variant,
            uniforms,
            curves,
        }
    }

    /// Create a system from JSON; see [`ParticleConfig::from_json`].
    pub fn from_json(value: &Value) -> Self {
        Self::new(ParticleConfig::from_json(value))
    }

    /// Set the formats of the pass the render object will draw into.
    ///
    /// Takes effect at the next resource build.
    pub fn with_render_target(mut self, target: RenderTarget) -> Self {
        self.target = target;
        self
    }

    /// Create GPU resources. Calling it again while initialized does
    /// nothing.
    pub fn init(&mut self, ctx: &GpuContext) -> Result<()> {
        if self.resources.is_some() {
            log::debug!("init called on an initialized particle system");
            return Ok(());
        }

        let resources = self.build_resources(ctx, &self.params, self.variant, &self.uniforms, &self.curves)?;
        resources.render().write_uniforms(ctx.queue(), &self.camera_uniforms());

        self.allocator = Allocator::new(self.params.max_particles);
        self.timer.reset();
        self.clock.reset();
        self.resources = Some(resources);
        self.ctx = Some(ctx.clone());

        if let Some(path) = self.params.curve_texture_path.clone() {
            self.pending_curves = Some(PendingCurveTexture::spawn(path));
        }
        log::debug!("particle system initialized [{}]", self.features.label());
        Ok(())
    }

    fn build_resources(
        &self,
        ctx: &GpuContext,
        params: &NormalizedParams,
        variant: KernelVariant,
        uniforms: &SimUniforms,
        curves: &CurveTexture,
    ) -> Result<GpuResources> {
        Ok(GpuResources::new(
            ctx,
            &self.target,
            variant,
            MaterialParams::from_params(params),
            params.max_particles,
            uniforms,
            curves,
        )?)
    }

    /// Emit `count` particles at `(x, y, z)`, optionally with per-call
    /// overrides. Slots are claimed in cursor order, overwriting whatever
    /// they held.
    pub fn spawn(&mut self, x: f32, y: f32, z: f32, count: u32, overrides: Option<&SpawnOverrides>) {
        if self.resources.is_none() {
            log::debug!("spawn ignored; particle system is not initialized");
            return;
        }
        self.spawn_at(Vec3::new(x, y, z), count, overrides);
    }

    fn spawn_at(&mut self, origin: Vec3, count: u32, overrides: Option<&SpawnOverrides>) {
        let (Some(ctx), Some(resources)) = (&self.ctx, &self.resources) else {
            return;
        };
        if count == 0 {
            return;
        }

        let range = self.allocator.allocate(count);
        let with_tints = self.features.contains(FeatureFlags::PER_PARTICLE_COLOR);
        let batch = match overrides {
            Some(overrides) => {
                let params = self.emission.with_overrides(overrides);
                self.emitter.emit(&params, origin, range.len, with_tints)
            }
            None => self.emitter.emit(&self.emission, origin, range.len, with_tints),
        };
        resources.write_spawn(ctx.queue(), &range, &batch);
    }

    /// Begin automatic emission.
    pub fn start(&mut self) {
        if !self.emitting {
            log::debug!("emission started");
        }
        self.emitting = true;
    }

    /// Halt automatic emission. Live particles keep simulating.
    pub fn stop(&mut self) {
        if self.emitting {
            log::debug!("emission stopped");
        }
        self.emitting = false;
        self.timer.reset();
    }

    /// Kill every particle and rewind the cursor.
    pub fn clear(&mut self) {
        let (Some(ctx), Some(resources)) = (&self.ctx, &self.resources) else {
            log::debug!("clear ignored; particle system is not initialized");
            return;
        };
        resources.clear(ctx);
        self.allocator.reset();
        self.timer.reset();
    }

    /// Move the system origin used for automatic emission and
    /// attract-to-center.
    pub fn set_position(&mut self, position: Vec3) {
        if !position.is_finite() {
            log::warn!("ignoring non-finite position {position}");
            return;
        }
        self.config.position = position.to_array();
        self.params.position = position;
        self.uniforms.set_center(position);
        self.upload_uniforms();
        self.notify_panel();
    }

    /// Seconds between automatic bursts (0 = every frame).
    pub fn set_delay(&mut self, delay: f32) {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        self.config.delay = delay;
        self.params.delay = delay;
        self.notify_panel();
    }

    /// Particles per automatic burst.
    pub fn set_emit_count(&mut self, count: u32) {
        self.config.emit_count = count;
        self.params.emit_count = count;
        self.notify_panel();
    }

    /// Layer a JSON patch over the current configuration.
    ///
    /// An empty or no-op patch changes nothing. If a structural rebuild
    /// fails the previous configuration and resources stay in place.
    pub fn set_props(&mut self, patch: &Value) -> Result<()> {
        self.apply_patch(patch, true)
    }

    /// Replace the whole configuration.
    pub fn set_config(&mut self, config: ParticleConfig) -> Result<()> {
        self.apply_config(config, true)
    }

    fn apply_patch(&mut self, patch: &Value, notify_panel: bool) -> Result<()> {
        let mut next = self.config.clone();
        if next.apply_json(patch).is_empty() {
            return Ok(());
        }
        self.apply_config(next, notify_panel)
    }

    fn apply_config(&mut self, config: ParticleConfig, notify_panel: bool) -> Result<()> {
        let params = normalize(&config);
        let features = FeatureFlags::from_params(&params);
        let change = Classification::between(&self.config, self.features, &config, features);
        if change.is_empty() {
            return Ok(());
        }
        log::debug!("configuration changed: {:?}", change.changed_keys);

        let path_changed = change.touches("curveTexturePath");
        let loaded = if path_changed { None } else { self.loaded_curves.clone() };
        let curves = loaded.unwrap_or_else(|| params.curves.pack(DEFAULT_CURVE_RESOLUTION));
        let mut uniforms = SimUniforms::from_params(&params, curves.channels());
        uniforms.timing = self.uniforms.timing;
        let uniforms_changed = !uniforms.same_parameters(&self.uniforms);
        let variant = KernelVariant::from_params(&params);

        if change.needs_rebuild() {
            if let Some(ctx) = self.ctx.clone() {
                let resources = self.build_resources(&ctx, &params, variant, &uniforms, &curves)?;
                if let Some(old) = self.resources.replace(resources) {
                    old.destroy(&ctx);
                }
                log::info!(
                    "rebuilt particle resources [{}] for {:?}",
                    features.label(),
                    change.changed_keys
                );
            }
            self.allocator = Allocator::new(params.max_particles);
            self.timer.reset();
        }

        if change.touches("seed") {
            self.emitter = Emitter::new(params.seed);
        }
        if path_changed {
            self.loaded_curves = None;
            self.pending_curves = match (&self.ctx, &params.curve_texture_path) {
                (Some(_), Some(path)) => Some(PendingCurveTexture::spawn(path.clone())),
                _ => None,
            };
        }

        self.emission = EmissionParams::from_params(&params);
        self.config = config;
        self.params = params;
        self.features = features;
        self.variant = variant;
        self.uniforms = uniforms;
        self.curves = curves;

        let camera = self.camera_uniforms();
        if let (Some(ctx), Some(resources)) = (&self.ctx, self.resources.as_mut()) {
            resources
                .render_mut()
                .set_material(MaterialParams::from_params(&self.params));
            resources.write_curves(ctx.queue(), &self.curves);
            if uniforms_changed {
                resources.write_uniforms(ctx.queue(), &self.uniforms);
            }
            resources.render().write_uniforms(ctx.queue(), &camera);
        }

        if notify_panel {
            self.notify_panel();
        }
        Ok(())
    }

    /// Advance the simulation by `dt` seconds and run the update kernel.
    pub fn update(&mut self, dt: f32) {
        if self.resources.is_none() {
            log::debug!("update ignored; particle system is not initialized");
            return;
        }

        self.apply_panel_changes();
        self.poll_curve_texture();

        let dt = self.clock.advance(dt);
        if self.emitting && !self.clock.is_paused() {
            let bursts = self.timer.tick(dt, self.params.delay);
            for _ in 0..bursts {
                self.spawn_at(self.params.position, self.params.emit_count, None);
            }
        }

        self.uniforms
            .set_timing(dt, self.clock.turbulence_time(), self.clock.elapsed());
        if let (Some(ctx), Some(resources)) = (&self.ctx, &self.resources) {
            resources.write_uniforms(ctx.queue(), &self.uniforms);
            resources.dispatch(ctx);
        }
    }

    fn apply_panel_changes(&mut self) {
        let Some(patch) = self.panel.as_ref().and_then(AttachedPanel::drain) else {
            return;
        };
        if let Err(err) = self.apply_patch(&patch, false) {
            log::error!("debug panel change rejected: {err}");
        }
    }

    fn poll_curve_texture(&mut self) {
        let Some(result) = self.pending_curves.as_ref().and_then(PendingCurveTexture::poll) else {
            return;
        };
        let pending = self.pending_curves.take();
        match result {
            Ok(texture) => {
                let texture = texture.resampled(DEFAULT_CURVE_RESOLUTION);
                log::debug!(
                    "loaded curve texture {:?}",
                    pending.as_ref().map(PendingCurveTexture::path)
                );
                self.uniforms.set_curve_mask(texture.channels());
                self.curves = texture.clone();
                self.loaded_curves = Some(texture);
                if let (Some(ctx), Some(resources)) = (&self.ctx, &self.resources) {
                    resources.write_curves(ctx.queue(), &self.curves);
                    resources.write_uniforms(ctx.queue(), &self.uniforms);
                }
            }
            Err(err) => log::error!(
                "failed to load curve texture {:?}: {err}",
                pending.as_ref().map(PendingCurveTexture::path)
            ),
        }
    }

    /// Set the camera used to orient billboards.
    pub fn set_camera(&mut self, view: Mat4, proj: Mat4) {
        self.view = view;
        self.proj = proj;
        if let (Some(ctx), Some(resources)) = (&self.ctx, &self.resources) {
            resources.render().write_uniforms(ctx.queue(), &self.camera_uniforms());
        }
    }

    fn camera_uniforms(&self) -> RenderUniforms {
        RenderUniforms::from_camera(self.view, self.proj, self.params.soft_distance)
    }

    fn upload_uniforms(&self) {
        if let (Some(ctx), Some(resources)) = (&self.ctx, &self.resources) {
            resources.write_uniforms(ctx.queue(), &self.uniforms);
        }
    }

    /// Destroy all GPU resources and detach the debug panel. Safe to call
    /// more than once.
    pub fn dispose(&mut self) {
        if let (Some(ctx), Some(resources)) = (&self.ctx, self.resources.take()) {
            resources.destroy(ctx);
            log::debug!("particle system disposed");
        }
        if let Some(panel) = self.panel.take() {
            panel.detach();
        }
        self.ctx = None;
        self.pending_curves = None;
        self.emitting = false;
    }

    /// Attach a live-tuning panel, replacing any previous one.
    pub fn attach_debug_panel(&mut self, panel: Box<dyn DebugPanel>) {
        if let Some(old) = self.panel.take() {
            old.detach();
        }
        let initial = self.config_json();
        self.panel = Some(AttachedPanel::attach(panel, &initial));
    }

    /// Detach and destroy the panel, if any.
    pub fn detach_debug_panel(&mut self) {
        if let Some(panel) = self.panel.take() {
            panel.detach();
        }
    }

    fn notify_panel(&mut self) {
        if self.panel.is_none() {
            return;
        }
        let values = self.config_json();
        if let Some(panel) = self.panel.as_mut() {
            panel.notify(&values);
        }
    }

    fn config_json(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or_else(|err| {
            log::warn!("failed to serialize configuration: {err}");
            Value::Null
        })
    }

    /// Whether GPU resources exist.
    pub fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    /// Current simulation uniforms.
    pub fn uniforms(&self) -> &SimUniforms {
        &self.uniforms
    }

    /// The render object, once initialized.
    pub fn render_object(&self) -> Option<&RenderObject> {
        self.resources.as_ref().map(GpuResources::render)
    }

    /// Active feature flags.
    pub fn features(&self) -> FeatureFlags {
        self.features
    }

    /// Active kernel and render variant.
    pub fn variant(&self) -> &KernelVariant {
        &self.variant
    }

    /// The normalized parameters.
    pub fn normalized_props(&self) -> &NormalizedParams {
        &self.params
    }

    /// The raw configuration.
    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    /// The curve data currently uploaded.
    pub fn curve_texture(&self) -> &CurveTexture {
        &self.curves
    }

    /// Next slot to be written.
    pub fn cursor(&self) -> u32 {
        self.allocator.cursor()
    }

    /// Whether automatic emission is running.
    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    /// The simulation clock.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Mutable clock, for pausing and time scaling.
    pub fn clock_mut(&mut self) -> &mut SimClock {
        &mut self.clock
    }

    /// Read the particle records back. Returns an empty list before init.
    pub fn read_particles(&self) -> Result<Vec<ParticleGpu>> {
        match (&self.ctx, &self.resources) {
            (Some(ctx), Some(resources)) => Ok(resources.read_particles(ctx)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Read the render instances back. Returns an empty list before init.
    pub fn read_instances(&self) -> Result<Vec<InstanceGpu>> {
        match (&self.ctx, &self.resources) {
            (Some(ctx), Some(resources)) => Ok(resources.read_instances(ctx)?),
            _ => Ok(Vec::new()),
        }
    }
}

impl Drop for ParticleSystem {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveChannels;
    use serde_json::json;

    fn quiet() -> ParticleConfig {
        ParticleConfig {
            auto_start: false,
            ..ParticleConfig::default()
        }
    }

    #[test]
    fn test_misuse_before_init_is_a_no_op() {
        let mut system = ParticleSystem::new(ParticleConfig::default());
        system.spawn(0.0, 0.0, 0.0, 10, None);
        system.update(0.1);
        system.clear();
        assert!(!system.is_initialized());
        assert_eq!(system.cursor(), 0);
        assert!(system.render_object().is_none());
        assert!(system.read_particles().unwrap().is_empty());
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut system = ParticleSystem::new(quiet());
        let before = *system.uniforms();
        system.set_props(&json!({})).unwrap();
        system.set_config(quiet()).unwrap();
        assert_eq!(*system.uniforms(), before);
    }

    #[test]
    fn test_uniform_level_patch_updates_uniforms() {
        let mut system = ParticleSystem::new(quiet());
        system.set_props(&json!({ "gravity": [0.0, -2.0, 0.0] })).unwrap();
        assert_eq!(system.uniforms().gravity, [0.0, -2.0, 0.0, 0.0]);
        assert_eq!(system.config().gravity, [0.0, -2.0, 0.0]);
    }

    #[test]
    fn test_structural_patch_updates_capacity_before_init() {
        let mut system = ParticleSystem::new(quiet());
        system.set_props(&json!({ "maxParticles": 64 })).unwrap();
        assert_eq!(system.normalized_props().max_particles, 64);
    }

    #[test]
    fn test_single_color_without_end() {
        let system = ParticleSystem::from_json(&json!({
            "colorStart": ["#ff0000"],
            "colorEnd": null,
        }));
        let red = glam::Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_eq!(system.uniforms().color_start(), red);
        assert_eq!(system.uniforms().color_end(), red);
    }

    #[test]
    fn test_clearing_a_curve_clears_its_mask_bit() {
        let mut system = ParticleSystem::from_json(&json!({
            "autoStart": false,
            "sizeCurve": "easeIn",
            "opacityCurve": "easeOut",
        }));
        assert_eq!(
            system.uniforms().curve_mask(),
            CurveChannels::SIZE | CurveChannels::OPACITY
        );

        system.set_props(&json!({ "sizeCurve": null })).unwrap();
        assert_eq!(system.uniforms().curve_mask(), CurveChannels::OPACITY);
        assert!(system.curve_texture().texels().iter().all(|t| t[0] == 0.0));
    }

    #[test]
    fn test_feature_flags_follow_config() {
        let mut system = ParticleSystem::new(quiet());
        assert!(!system.features().contains(FeatureFlags::TURBULENCE));
        system
            .set_props(&json!({ "turbulence": { "intensity": 2.0 } }))
            .unwrap();
        assert!(system.features().contains(FeatureFlags::TURBULENCE));
        assert!(system.variant().flags.contains(FeatureFlags::TURBULENCE));
    }

    #[test]
    fn test_emission_controls() {
        let mut system = ParticleSystem::new(quiet());
        assert!(!system.is_emitting());
        system.start();
        assert!(system.is_emitting());
        system.stop();
        assert!(!system.is_emitting());

        system.set_delay(-1.0);
        assert_eq!(system.normalized_props().delay, 0.0);
        system.set_emit_count(7);
        assert_eq!(system.config().emit_count, 7);
        system.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(system.uniforms().center[..3], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_direct_setters_refresh_the_panel() {
        use crate::debug_panel::ChangeSink;
        use std::sync::{Arc, Mutex};

        struct Recorder(Arc<Mutex<Vec<Value>>>);

        impl DebugPanel for Recorder {
            fn render(&mut self, _initial: &Value, _on_change: ChangeSink) {}

            fn update(&mut self, values: &Value, _on_change: ChangeSink) {
                self.0.lock().unwrap().push(values.clone());
            }

            fn destroy(&mut self) {}
        }

        let updates = Arc::new(Mutex::new(Vec::new()));
        let mut system = ParticleSystem::new(quiet());
        system.attach_debug_panel(Box::new(Recorder(updates.clone())));

        system.set_position(Vec3::new(0.0, 4.0, 0.0));
        system.set_delay(0.5);
        system.set_emit_count(9);

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 3);
        assert_eq!(updates[0]["position"], json!([0.0, 4.0, 0.0]));
        assert_eq!(updates[1]["delay"], json!(0.5));
        assert_eq!(updates[2]["emitCount"], json!(9));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut system = ParticleSystem::new(quiet());
        system.dispose();
        system.dispose();
        assert!(!system.is_initialized());
    }
}
