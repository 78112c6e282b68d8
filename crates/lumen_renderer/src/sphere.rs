//! Sphere primitive for ray tracing.

use crate::hittable::{HitRecord, Hittable};
use lumen_math::{Interval, Ray, Vec3};
use std::f32::consts::PI;

/// A sphere referencing its material by index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    center: Vec3,
    radius: f32,
    material: usize,
}

impl Sphere {
    /// Create a new sphere. Geometry is checked when the sphere joins a
    /// [`Scene`](crate::Scene).
    pub fn new(center: Vec3, radius: f32, material: usize) -> Self {
        Self {
            center,
            radius,
            material,
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn material(&self) -> usize {
        self.material
    }

    /// UV coordinates for a point on the unit sphere centered at origin.
    fn get_sphere_uv(p: Vec3) -> (f32, f32) {
        // theta: angle down from +Y, phi: angle around Y from -X
        let theta = (-p.y).clamp(-1.0, 1.0).acos();
        let phi = (-p.z).atan2(p.x) + PI;

        (phi / (2.0 * PI), theta / PI)
    }
}

impl Hittable for Sphere {
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let oc = self.center - ray.origin;
        let a = ray.direction.length_squared();
        let h = ray.direction.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrtd = discriminant.sqrt();

        // Nearest root in the acceptable range
        let mut root = (h - sqrtd) / a;
        if !ray_t.surrounds(root) {
            root = (h + sqrtd) / a;
            if !ray_t.surrounds(root) {
                return None;
            }
        }

        let outward_normal = (ray.at(root) - self.center) / self.radius;
        Some(HitRecord::new(
            ray,
            root,
            outward_normal,
            self.material,
            Self::get_sphere_uv(outward_normal),
        ))
    }
}
