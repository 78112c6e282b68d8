//! Compiled scene: flat sphere and material tables.
//!
//! A `Scene` is immutable once built. The engine shares it with batch
//! workers through an `Arc`, and a rebuild produces a new `Scene` rather
//! than mutating the one a batch may still be reading.

use lumen_core::{SceneDesc, SceneError};
use lumen_math::{Interval, Ray};

use crate::error::RenderResult;
use crate::hittable::{HitRecord, Hittable};
use crate::material::Material;
use crate::sphere::Sphere;

#[derive(Debug, Clone, Default)]
pub struct Scene {
    spheres: Vec<Sphere>,
    materials: Vec<Material>,
}

impl Scene {
    /// Build a scene from already-compiled tables.
    ///
    /// Fails if any sphere has a non-finite center, a radius that is not
    /// finite and positive, or a material outside the table.
    pub fn new(spheres: Vec<Sphere>, materials: Vec<Material>) -> RenderResult<Self> {
        for (index, sphere) in spheres.iter().enumerate() {
            if !sphere.center().is_finite() {
                return Err(SceneError::InvalidCenter { index }.into());
            }
            let radius = sphere.radius();
            if !(radius.is_finite() && radius > 0.0) {
                return Err(SceneError::InvalidRadius { index, radius }.into());
            }
            if sphere.material() >= materials.len() {
                return Err(SceneError::MissingMaterial {
                    sphere: index,
                    material: sphere.material(),
                    count: materials.len(),
                }
                .into());
            }
        }
        Ok(Self { spheres, materials })
    }

    /// Compile authoring data.
    ///
    /// Only enabled spheres are kept, in authoring order. Materials are
    /// compacted to those the active spheres reference, in first-use order.
    pub fn from_desc(desc: &SceneDesc) -> RenderResult<Self> {
        desc.validate()?;

        let mut remap: Vec<Option<usize>> = vec![None; desc.materials.len()];
        let mut materials = Vec::new();
        let mut spheres = Vec::new();

        for (_, sphere) in desc.active_spheres() {
            let material = *remap[sphere.material].get_or_insert_with(|| {
                materials.push(Material::from(&desc.materials[sphere.material]));
                materials.len() - 1
            });
            spheres.push(Sphere::new(sphere.center, sphere.radius, material));
        }

        log::info!(
            "Rebuilt world ({} spheres, {} materials)",
            spheres.len(),
            materials.len()
        );

        Ok(Self { spheres, materials })
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Material by index. Indices come from this scene's own spheres, which
    /// are checked at construction.
    #[inline]
    pub fn material(&self, index: usize) -> &Material {
        &self.materials[index]
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }
}

impl Hittable for Scene {
    /// Brute-force closest hit over every sphere.
    fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<HitRecord> {
        let mut closest: Option<HitRecord> = None;
        let mut closest_so_far = ray_t.max;

        for sphere in &self.spheres {
            if let Some(rec) = sphere.hit(ray, ray_t.with_max(closest_so_far)) {
                closest_so_far = rec.t;
                closest = Some(rec);
            }
        }

        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use lumen_core::{random_scene, MaterialDesc};
    use lumen_math::{Color, Vec3};

    #[test]
    fn test_closest_hit_wins() {
        let scene = Scene::new(
            vec![
                Sphere::new(Vec3::new(0.0, 0.0, -5.0), 1.0, 0),
                Sphere::new(Vec3::new(0.0, 0.0, -2.0), 0.5, 1),
            ],
            vec![Material::lambertian(Color::ONE), Material::metal(Color::ONE, 0.0)],
        )
        .unwrap();

        let rec = scene
            .hit(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), Interval::SECONDARY)
            .unwrap();
        assert!((rec.t - 1.5).abs() < 1e-5);
        assert_eq!(rec.material, 1);
    }

    #[test]
    fn test_empty_scene_never_hits() {
        let scene = Scene::default();
        assert!(scene.is_empty());
        assert!(scene.hit(&Ray::default(), Interval::SECONDARY).is_none());
    }

    #[test]
    fn test_new_rejects_dangling_material() {
        let result = Scene::new(
            vec![Sphere::new(Vec3::ZERO, 1.0, 2)],
            vec![Material::dielectric(1.5)],
        );
        assert!(matches!(result, Err(RenderError::Scene(_))));
    }

    #[test]
    fn test_new_rejects_bad_radius() {
        let materials = || vec![Material::lambertian(Color::ONE)];
        for radius in [-1.0, 0.0, f32::NAN, f32::INFINITY] {
            let result = Scene::new(
                vec![
                    Sphere::new(Vec3::ZERO, 1.0, 0),
                    Sphere::new(Vec3::ZERO, radius, 0),
                ],
                materials(),
            );
            assert!(
                matches!(
                    result,
                    Err(RenderError::Scene(SceneError::InvalidRadius { index: 1, .. }))
                ),
                "radius {radius} accepted"
            );
        }

        let result = Scene::new(
            vec![Sphere::new(Vec3::new(0.0, f32::NAN, 0.0), 1.0, 0)],
            materials(),
        );
        assert!(matches!(
            result,
            Err(RenderError::Scene(SceneError::InvalidCenter { index: 0 }))
        ));
    }

    #[test]
    fn test_from_desc_filters_and_compacts() {
        let mut desc = SceneDesc::new();
        let unused = desc.add_material(MaterialDesc::dielectric(1.3));
        let red = desc.add_material(MaterialDesc::lambertian(Color::new(1.0, 0.0, 0.0)));
        let glass = desc.add_material(MaterialDesc::dielectric(1.5));

        desc.add_sphere(Vec3::new(0.0, 0.0, -1.0), 0.5, glass);
        let hidden = desc.add_sphere(Vec3::new(1.0, 0.0, -1.0), 0.5, unused);
        desc.add_sphere(Vec3::new(-1.0, 0.0, -1.0), 0.5, red);
        desc.add_sphere(Vec3::new(-2.0, 0.0, -1.0), 0.5, glass);
        desc.spheres[hidden].enabled = false;

        let scene = Scene::from_desc(&desc).unwrap();

        assert_eq!(scene.spheres().len(), 3);
        assert_eq!(scene.materials().len(), 2);
        assert_eq!(scene.materials()[0], Material::dielectric(1.5));
        assert_eq!(scene.spheres()[0].material(), 0);
        assert_eq!(scene.spheres()[1].material(), 1);
        assert_eq!(scene.spheres()[2].material(), 0);
        assert_eq!(scene.spheres()[1].center(), Vec3::new(-1.0, 0.0, -1.0));
    }

    #[test]
    fn test_from_desc_rejects_bad_radius() {
        let mut desc = SceneDesc::new();
        desc.add_sphere_with(Vec3::ZERO, -1.0, MaterialDesc::lambertian(Color::ONE));

        assert!(matches!(Scene::from_desc(&desc), Err(RenderError::Scene(_))));
    }

    #[test]
    fn test_random_scene_compiles() {
        let desc = random_scene::build(random_scene::DEFAULT_SEED);
        let scene = Scene::from_desc(&desc).unwrap();

        assert_eq!(scene.spheres().len(), desc.spheres.len());
        // Every random sphere owns its material
        assert_eq!(scene.materials().len(), desc.materials.len());
    }
}
