//! Lumen Renderer - progressive CPU path tracing
//!
//! A Monte Carlo path tracer over a scene of spheres with Lambertian, metal,
//! and dielectric materials. The [`Engine`] traces the image in batches of
//! samples on a rayon pool, keeps a running per-pixel sum, and resolves it
//! into a half-precision front buffer for display.
//!
//! ```no_run
//! use lumen_core::random_scene;
//! use lumen_renderer::{CameraView, Engine, RenderSettings, Scene};
//!
//! let scene = Scene::from_desc(&random_scene::build(random_scene::DEFAULT_SEED))?;
//! let settings = RenderSettings::default();
//! let mut engine = Engine::create(settings, scene, CameraView::default(), 1280, 720)?;
//! while !engine.is_converged() {
//!     engine.step_blocking()?;
//! }
//! let rgba16 = engine.front_buffer().as_bytes();
//! # let _ = rgba16;
//! # Ok::<(), lumen_renderer::RenderError>(())
//! ```

mod batch;
mod buffers;
mod camera;
mod engine;
mod error;
mod hittable;
mod integrator;
mod material;
mod sampling;
mod scene;
mod settings;
mod sphere;
mod stats;

pub use batch::{combine, integrate, linear_to_gamma, resolve_pixel, BatchParams, COMBINE_CHUNK};
pub use buffers::{AccumulationBuffers, FrontBuffer, Resolution, Rgba16};
pub use camera::{Camera, CameraView, DEFAULT_FOCUS_DISTANCE};
pub use engine::{Engine, PipelineState};
pub use error::{RenderError, RenderResult};
pub use hittable::{HitRecord, Hittable};
pub use integrator::{sample_pixel, trace};
pub use material::{Material, ScatterResult};
pub use scene::Scene;
pub use settings::{Environment, RenderSettings};
pub use sphere::Sphere;
pub use stats::RenderStats;

/// Re-export common math types from lumen_math
pub use lumen_math::{Color, Interval, Ray, Vec3};
