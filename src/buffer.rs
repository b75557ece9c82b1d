//! Particle records and slot allocation.
//!
//! The pool is a fixed array of [`ParticleGpu`] records on the GPU. Slots are
//! handed out by a ring [`Allocator`] that never looks at liveness: every
//! spawn overwrites the next slots in cursor order. A slot is dead when
//! `age >= lifetime`, so a zeroed slot is dead too.
//!
//! # Layout
//!
//! | Struct | Size | WGSL |
//! |--------|------|------|
//! | [`ParticleGpu`] | 64 | `Particle` |
//! | [`TintGpu`] | 32 | `Tint` (multi-color variant only) |
//! | [`InstanceGpu`] | 64 | `Instance` (written by the kernel) |

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// One particle slot, mirrored by the WGSL `Particle` struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParticleGpu {
    /// World position.
    pub position: [f32; 3],
    /// Seconds since spawn.
    pub age: f32,
    /// Velocity (units per second).
    pub velocity: [f32; 3],
    /// Seconds the particle lives.
    pub lifetime: f32,
    /// Euler rotation (radians).
    pub rotation: [f32; 3],
    /// Random value in `[0, 1)` fixed at spawn.
    pub seed: f32,
    /// Rotation speed (radians per second).
    pub rotation_speed: [f32; 3],
    /// Spawn size.
    pub size: f32,
}

impl ParticleGpu {
    /// Whether the slot holds a live particle.
    pub fn is_alive(&self) -> bool {
        self.age < self.lifetime
    }

    /// Position as a vector.
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    /// Velocity as a vector.
    pub fn velocity(&self) -> Vec3 {
        Vec3::from(self.velocity)
    }
}

/// Per-particle start/end color.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TintGpu {
    /// Color at birth.
    pub start: [f32; 4],
    /// Color at death.
    pub end: [f32; 4],
}

impl TintGpu {
    /// Build from color stops.
    pub fn new(start: Vec4, end: Vec4) -> Self {
        Self {
            start: start.to_array(),
            end: end.to_array(),
        }
    }
}

/// Render data for one slot, written by the kernel every frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceGpu {
    /// xyz = position, w = current size (0 when dead).
    pub position_size: [f32; 4],
    /// rgba; alpha includes opacity (0 when dead).
    pub color: [f32; 4],
    /// xyz = rotation, w = 1 when alive.
    pub rotation_alive: [f32; 4],
    /// xyz = velocity.
    pub velocity: [f32; 4],
}

impl InstanceGpu {
    /// Whether the kernel marked this instance alive.
    pub fn is_alive(&self) -> bool {
        self.rotation_alive[3] > 0.5
    }
}

/// WGSL declarations matching the record structs.
pub const PARTICLE_STRUCTS_WGSL: &str = r#"
struct Particle {
    position: vec3<f32>,
    age: f32,
    velocity: vec3<f32>,
    lifetime: f32,
    rotation: vec3<f32>,
    seed: f32,
    rotation_speed: vec3<f32>,
    size: f32,
};

struct Tint {
    start: vec4<f32>,
    end: vec4<f32>,
};

struct Instance {
    position_size: vec4<f32>,
    color: vec4<f32>,
    rotation_alive: vec4<f32>,
    velocity: vec4<f32>,
};
"#;

/// A range of slots claimed by one spawn. May wrap around the end of the
/// pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRange {
    /// First slot.
    pub start: u32,
    /// Number of slots, at most `capacity`.
    pub len: u32,
    /// Pool capacity.
    pub capacity: u32,
}

impl SlotRange {
    /// Contiguous `(start, len)` runs covering the range, at most two.
    pub fn segments(&self) -> impl Iterator<Item = (u32, u32)> {
        let first_len = self.len.min(self.capacity - self.start);
        let first = (first_len > 0).then_some((self.start, first_len));
        let second = (self.len > first_len).then_some((0, self.len - first_len));
        first.into_iter().chain(second)
    }

    /// Slot indices in write order.
    pub fn iter(&self) -> impl Iterator<Item = u32> {
        let (start, capacity) = (self.start, self.capacity);
        (0..self.len).map(move |i| (start + i) % capacity)
    }

    /// Whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Ring cursor over the particle pool.
#[derive(Debug, Clone)]
pub struct Allocator {
    cursor: u32,
    capacity: u32,
}

impl Allocator {
    /// Allocator for `capacity` slots (at least 1).
    pub fn new(capacity: u32) -> Self {
        Self {
            cursor: 0,
            capacity: capacity.max(1),
        }
    }

    /// Next slot to be written.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Pool capacity.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Claim `count` slots.
    ///
    /// The cursor advances by `count mod capacity`. Only the last
    /// `min(count, capacity)` claims are written, so the range always ends at
    /// the new cursor.
    pub fn allocate(&mut self, count: u32) -> SlotRange {
        let n = self.capacity;
        let len = count.min(n);
        let advance = count % n;
        let new_cursor = (self.cursor + advance) % n;
        let start = (new_cursor + n - len) % n;
        self.cursor = new_cursor;
        SlotRange {
            start,
            len,
            capacity: n,
        }
    }

    /// Rewind to slot 0.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
