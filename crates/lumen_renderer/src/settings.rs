//! Render settings.

use lumen_math::{Color, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// What a ray sees when it escapes the scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    /// Vertical blend from `horizon` (looking down) to `zenith` (looking up).
    Gradient { horizon: Color, zenith: Color },
    /// A single color in every direction.
    Solid(Color),
}

impl Environment {
    /// Radiance arriving from `direction` (need not be normalized).
    #[inline]
    pub fn sample(&self, direction: Vec3) -> Color {
        match *self {
            Environment::Gradient { horizon, zenith } => {
                let unit = direction.normalize_or_zero();
                let a = 0.5 * (unit.y + 1.0);
                horizon * (1.0 - a) + zenith * a
            }
            Environment::Solid(color) => color,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Gradient {
            horizon: Color::ONE,
            zenith: Color::new(0.5, 0.7, 1.0),
        }
    }
}

/// Settings controlling resolution, sample budget, and lens.
///
/// Missing fields take their defaults when deserialized, so a settings file
/// only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Buffer size relative to the host viewport (0.5 = half resolution)
    pub resolution_scale: f32,
    /// Target samples per pixel for a complete trace
    pub samples_per_pixel: u32,
    /// Samples per pixel traced in each batch
    pub samples_per_batch: u32,
    /// Maximum ray casts per sample
    pub max_depth: u32,
    /// Combine into the front buffer after every batch, not only the last
    pub preview_after_batch: bool,
    /// Stop scheduling batches once the target is reached
    pub stop_when_completed: bool,
    /// Lens diameter; 0 disables depth of field
    pub camera_aperture: f32,
    pub environment: Environment,
    /// Base seed for per-sample generators
    pub seed: u64,
    /// Worker thread count, `None` lets rayon decide
    pub threads: Option<usize>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution_scale: 0.5,
            samples_per_pixel: 2000,
            samples_per_batch: 10,
            max_depth: 35,
            preview_after_batch: true,
            stop_when_completed: true,
            camera_aperture: 0.1,
            environment: Environment::default(),
            seed: 1,
            threads: None,
        }
    }
}

impl RenderSettings {
    pub fn validate(&self) -> RenderResult<()> {
        if !(self.resolution_scale.is_finite() && self.resolution_scale > 0.0) {
            return Err(RenderError::InvalidSettings("resolution scale must be positive"));
        }
        if self.samples_per_pixel == 0 {
            return Err(RenderError::InvalidSettings("samples per pixel must be at least 1"));
        }
        if self.samples_per_batch == 0 {
            return Err(RenderError::InvalidSettings("samples per batch must be at least 1"));
        }
        if self.max_depth == 0 {
            return Err(RenderError::InvalidSettings("max depth must be at least 1"));
        }
        if !(self.camera_aperture.is_finite() && self.camera_aperture >= 0.0) {
            return Err(RenderError::InvalidSettings("aperture must be non-negative"));
        }
        if self.threads == Some(0) {
            return Err(RenderError::InvalidSettings("thread count must be at least 1"));
        }
        Ok(())
    }

    /// Samples traced per pixel in one batch.
    pub fn batch_samples(&self) -> u32 {
        self.samples_per_pixel.min(self.samples_per_batch)
    }
}
