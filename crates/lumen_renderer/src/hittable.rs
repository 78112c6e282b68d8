//! Hittable trait and HitRecord for ray-object intersection.

use lumen_math::{Interval, Ray, Vec3};

/// Record of a ray-object intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub p: Vec3,
    /// Unit surface normal, always pointing against the ray
    pub normal: Vec3,
    /// Index into the scene's material table
    pub material: usize,
    /// UV surface coordinates
    pub u: f32,
    pub v: f32,
    /// Whether the ray hit the outside of the surface
    pub front_face: bool,
}

impl HitRecord {
    /// Build a record, orienting `outward_normal` to oppose the ray.
    ///
    /// If the ray and outward normal point the same way the ray started
    /// inside the surface, so the normal is flipped and `front_face` is false.
    pub fn new(
        ray: &Ray,
        t: f32,
        outward_normal: Vec3,
        material: usize,
        (u, v): (f32, f32),
    ) -> Self {
        let front_face = ray.direction.dot(outward_normal) < 0.0;
        let normal = if front_face {
            outward_normal
        } else {
            -outward_normal
        };

        Self {
            t,
            p: ray.at(t),
            normal,
            material,
            u,
            v,
            front_face,
        }
    }
}

/// Objects that can be intersected by rays.
pub trait Hittable: Send + Sync {
    /// Closest intersection with parameter strictly inside `ray_t`, if any.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord>;
}
