//! Scene authoring types.
//!
//! This is the editable description a host application builds (by hand or
//! with [`crate::random_scene`]). The renderer compiles it into flat,
//! immutable sphere and material tables before tracing.

use lumen_math::{Color, Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::texture::Texture;

/// Errors found while validating authoring data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("Sphere {index} has invalid radius {radius} (must be finite and > 0)")]
    InvalidRadius { index: usize, radius: f32 },

    #[error("Sphere {index} has a non-finite center")]
    InvalidCenter { index: usize },

    #[error("Sphere {sphere} references material {material}, but only {count} materials exist")]
    MissingMaterial {
        sphere: usize,
        material: usize,
        count: usize,
    },

    #[error("Material {index} ({name}): {reason}")]
    InvalidMaterial {
        index: usize,
        name: String,
        reason: &'static str,
    },
}

pub type SceneResult<T> = Result<T, SceneError>;

/// Which scattering model a material uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MaterialKind {
    Lambertian,
    Metal,
    Dielectric,
}

/// A material as authored.
///
/// All parameters are always present; those that do not apply to `kind`
/// are ignored when the material is compiled (e.g. `fuzz` on a Lambertian).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    /// Display name (for logs and error messages)
    pub name: String,

    pub kind: MaterialKind,

    /// Albedo for Lambertian and Metal
    pub albedo: Texture,

    /// UV multiplier applied before texture evaluation
    pub texture_scale: Vec2,

    /// Metal roughness, 0 = perfect mirror
    pub fuzz: f32,

    /// Dielectric index of refraction (1.0 = air, 1.5 = glass)
    pub refractive_index: f32,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: MaterialKind::Lambertian,
            albedo: Texture::default(),
            texture_scale: Vec2::ONE,
            fuzz: 0.0,
            refractive_index: 1.0,
        }
    }
}

impl MaterialDesc {
    /// Diffuse material with a solid color.
    pub fn lambertian(albedo: Color) -> Self {
        Self::lambertian_textured(Texture::Constant(albedo), Vec2::ONE)
    }

    /// Diffuse material with a texture.
    pub fn lambertian_textured(albedo: Texture, texture_scale: Vec2) -> Self {
        Self {
            kind: MaterialKind::Lambertian,
            albedo,
            texture_scale,
            ..Default::default()
        }
    }

    /// Metal with a solid color.
    pub fn metal(albedo: Color, fuzz: f32) -> Self {
        Self::metal_textured(Texture::Constant(albedo), Vec2::ONE, fuzz)
    }

    pub fn metal_textured(albedo: Texture, texture_scale: Vec2, fuzz: f32) -> Self {
        Self {
            kind: MaterialKind::Metal,
            albedo,
            texture_scale,
            fuzz,
            ..Default::default()
        }
    }

    /// Clear glass-like material.
    pub fn dielectric(refractive_index: f32) -> Self {
        Self {
            kind: MaterialKind::Dielectric,
            albedo: Texture::Constant(Color::ONE),
            refractive_index,
            ..Default::default()
        }
    }

    /// Set the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check the parameters that matter for this material's kind.
    pub fn validate(&self, index: usize) -> SceneResult<()> {
        let invalid = |reason| SceneError::InvalidMaterial {
            index,
            name: self.name.clone(),
            reason,
        };

        match self.kind {
            MaterialKind::Lambertian | MaterialKind::Metal => {
                if !(self.texture_scale.is_finite() && self.texture_scale.cmpgt(Vec2::ZERO).all()) {
                    return Err(invalid("texture scale must be finite and positive"));
                }
                let fuzz_ok = self.fuzz.is_finite() && self.fuzz >= 0.0;
                if self.kind == MaterialKind::Metal && !fuzz_ok {
                    return Err(invalid("fuzz must be finite and non-negative"));
                }
            }
            MaterialKind::Dielectric => {
                if !(self.refractive_index.is_finite() && self.refractive_index > 0.0) {
                    return Err(invalid("refractive index must be finite and positive"));
                }
            }
        }

        Ok(())
    }
}

/// A sphere as authored. Disabled spheres are kept in the description but
/// skipped when the scene is compiled.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphereDesc {
    pub center: Vec3,
    pub radius: f32,
    pub enabled: bool,
    /// Index into [`SceneDesc::materials`]
    pub material: usize,
}

impl SphereDesc {
    pub fn new(center: Vec3, radius: f32, material: usize) -> Self {
        Self {
            center,
            radius,
            enabled: true,
            material,
        }
    }
}

/// The full authoring description: spheres plus the material table they
/// reference by index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    pub spheres: Vec<SphereDesc>,
    pub materials: Vec<MaterialDesc>,
}

impl SceneDesc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a material and return its index.
    pub fn add_material(&mut self, material: MaterialDesc) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    /// Append an enabled sphere and return its index.
    pub fn add_sphere(&mut self, center: Vec3, radius: f32, material: usize) -> usize {
        self.spheres.push(SphereDesc::new(center, radius, material));
        self.spheres.len() - 1
    }

    /// Convenience: add a material used by exactly one sphere.
    pub fn add_sphere_with(&mut self, center: Vec3, radius: f32, material: MaterialDesc) -> usize {
        let material = self.add_material(material);
        self.add_sphere(center, radius, material)
    }

    /// Iterate over enabled spheres with their authoring index.
    pub fn active_spheres(&self) -> impl Iterator<Item = (usize, &SphereDesc)> {
        self.spheres.iter().enumerate().filter(|(_, s)| s.enabled)
    }

    /// Validate every enabled sphere and every material they reference.
    ///
    /// Disabled spheres and unreferenced materials are not checked, since
    /// they never reach the renderer.
    pub fn validate(&self) -> SceneResult<()> {
        for (index, sphere) in self.active_spheres() {
            if !sphere.center.is_finite() {
                return Err(SceneError::InvalidCenter { index });
            }
            if !(sphere.radius.is_finite() && sphere.radius > 0.0) {
                return Err(SceneError::InvalidRadius {
                    index,
                    radius: sphere.radius,
                });
            }
            let material = self
                .materials
                .get(sphere.material)
                .ok_or(SceneError::MissingMaterial {
                    sphere: index,
                    material: sphere.material,
                    count: self.materials.len(),
                })?;
            material.validate(sphere.material)?;
        }
        Ok(())
    }
}
