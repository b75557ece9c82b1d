//! Error types for sparkfield.
//!
//! Only resource failures reach the host. Configuration problems are
//! recovered where they are found (clamped, defaulted, logged) and misuse
//! such as spawning before `init` is a no-op, so neither has a variant here.

use thiserror::Error;

/// Errors that can occur while creating or using GPU resources.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; ensure the system has a GPU with WebGPU/Vulkan/Metal/DX12 support")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// The device ran out of memory while allocating particle resources.
    #[error("out of GPU memory while creating {0}")]
    OutOfMemory(String),
    /// Resource or pipeline creation was rejected by the device.
    #[error("GPU validation failed while creating {what}: {message}")]
    Validation {
        /// What was being created.
        what: String,
        /// Driver/validation message.
        message: String,
    },
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
}

/// Errors that can occur while loading or saving a baked curve texture.
#[derive(Debug, Error)]
pub enum CurveTextureError {
    /// Failed to decode or encode the image.
    #[error("failed to process curve image: {0}")]
    Image(#[from] image::ImageError),
    /// Failed to read or write the file.
    #[error("failed to access curve texture file: {0}")]
    Io(#[from] std::io::Error),
    /// The image has no pixels.
    #[error("curve texture image is empty")]
    EmptyImage,
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// GPU resource failure.
    #[error(transparent)]
    Gpu(#[from] GpuError),
    /// Curve texture import/export failure.
    #[error(transparent)]
    CurveTexture(#[from] CurveTextureError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
