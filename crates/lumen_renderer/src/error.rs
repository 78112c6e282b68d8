//! Errors surfaced by the renderer.
//!
//! Numerical edge cases (missed rays, total internal reflection, NaN
//! radiance) are handled inline and never show up here.

use std::collections::TryReserveError;

use lumen_core::SceneError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("Invalid resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("Degenerate camera: {0}")]
    DegenerateCamera(&'static str),

    #[error("Invalid render settings: {0}")]
    InvalidSettings(&'static str),

    #[error("Failed to allocate {what} for {pixels} pixels: {source}")]
    Allocation {
        what: &'static str,
        pixels: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Batch worker terminated before reporting completion")]
    WorkerLost,
}

pub type RenderResult<T> = Result<T, RenderError>;
