//! Path integrator.
//!
//! Forward path tracing with a fixed bounce budget: each sample follows one
//! path, multiplying attenuations until it escapes to the environment, is
//! absorbed, or runs out of depth. Paths cut off by the depth limit return
//! black, so very deep interreflections are slightly underestimated.

use lumen_math::{Color, Interval, Ray};
use rand::RngCore;

use crate::camera::Camera;
use crate::hittable::Hittable;
use crate::material::ScatterResult;
use crate::scene::Scene;
use crate::settings::Environment;

/// Radiance carried back along `ray`, and the number of rays cast.
///
/// `max_depth` bounds the number of rays cast for this path, including the
/// first one.
pub fn trace(
    ray: &Ray,
    scene: &Scene,
    environment: &Environment,
    max_depth: u32,
    rng: &mut dyn RngCore,
) -> (Color, u32) {
    let mut ray = *ray;
    let mut throughput = Color::ONE;
    let mut ray_count = 0;

    while ray_count < max_depth {
        ray_count += 1;

        let Some(rec) = scene.hit(&ray, Interval::SECONDARY) else {
            return (throughput * environment.sample(ray.direction), ray_count);
        };

        match scene.material(rec.material).scatter(&ray, &rec, rng) {
            ScatterResult::Absorbed => return (Color::ZERO, ray_count),
            ScatterResult::Scattered {
                attenuation,
                ray: scattered,
            } => {
                throughput *= attenuation;
                ray = scattered;
            }
        }
    }

    // Depth budget exhausted
    (Color::ZERO, ray_count)
}

/// One camera sample through pixel (x, y).
///
/// Non-finite radiance is clamped to black so a single bad sample cannot
/// poison the running average.
pub fn sample_pixel(
    camera: &Camera,
    scene: &Scene,
    environment: &Environment,
    max_depth: u32,
    x: u32,
    y: u32,
    rng: &mut dyn RngCore,
) -> (Color, u32) {
    let ray = camera.get_ray(x, y, rng);
    let (color, ray_count) = trace(&ray, scene, environment, max_depth, rng);

    if color.is_finite() {
        (color, ray_count)
    } else {
        (Color::ZERO, ray_count)
    }
}
