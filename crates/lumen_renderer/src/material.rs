//! Material model and scattering.
//!
//! Materials are a closed set, so they are a plain enum stored in a flat
//! table and dispatched with a single `match`.

use lumen_core::{MaterialDesc, MaterialKind, Texture};
use lumen_math::{is_near_zero, reflect, refract, Color, Ray, Vec2};
use rand::RngCore;

use crate::hittable::HitRecord;
use crate::sampling::{gen_f32, random_in_unit_sphere, random_unit_vector};

/// Outcome of a ray interacting with a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScatterResult {
    /// The ray's energy was absorbed; the path ends black.
    Absorbed,
    /// The path continues along `ray`, scaled by `attenuation`.
    Scattered { attenuation: Color, ray: Ray },
}

/// A compiled material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Ideal diffuse reflector.
    Lambertian { albedo: Texture, texture_scale: Vec2 },
    /// Specular reflector; `fuzz` perturbs the mirror direction.
    Metal {
        albedo: Texture,
        texture_scale: Vec2,
        fuzz: f32,
    },
    /// Clear refractive material (glass, water).
    Dielectric { refractive_index: f32 },
}

impl Material {
    pub fn lambertian(albedo: Color) -> Self {
        Material::Lambertian {
            albedo: Texture::Constant(albedo),
            texture_scale: Vec2::ONE,
        }
    }

    pub fn metal(albedo: Color, fuzz: f32) -> Self {
        Material::Metal {
            albedo: Texture::Constant(albedo),
            texture_scale: Vec2::ONE,
            fuzz,
        }
    }

    pub fn dielectric(refractive_index: f32) -> Self {
        Material::Dielectric { refractive_index }
    }

    /// Scatter `ray_in` at the hit described by `rec`.
    pub fn scatter(&self, ray_in: &Ray, rec: &HitRecord, rng: &mut dyn RngCore) -> ScatterResult {
        match *self {
            Material::Lambertian {
                albedo,
                texture_scale,
            } => {
                let mut direction = rec.normal + random_unit_vector(rng);

                // Catch degenerate directions (random vector opposite the normal)
                if is_near_zero(direction) || direction.dot(rec.normal) <= 0.0 {
                    direction = rec.normal;
                }

                ScatterResult::Scattered {
                    attenuation: albedo.value(rec.u, rec.v, texture_scale, rec.p),
                    ray: Ray::new(rec.p, direction),
                }
            }

            Material::Metal {
                albedo,
                texture_scale,
                fuzz,
            } => {
                let reflected = reflect(ray_in.direction.normalize(), rec.normal);
                let direction = if fuzz > 0.0 {
                    reflected + fuzz * random_in_unit_sphere(rng)
                } else {
                    reflected
                };

                // Fuzzed below the surface: absorbed
                if direction.dot(rec.normal) <= 0.0 {
                    return ScatterResult::Absorbed;
                }

                ScatterResult::Scattered {
                    attenuation: albedo.value(rec.u, rec.v, texture_scale, rec.p),
                    ray: Ray::new(rec.p, direction),
                }
            }

            Material::Dielectric { refractive_index } => {
                let refraction_ratio = if rec.front_face {
                    1.0 / refractive_index
                } else {
                    refractive_index
                };

                // Index-matched boundary: no reflection, no bending
                if refraction_ratio == 1.0 {
                    return ScatterResult::Scattered {
                        attenuation: Color::ONE,
                        ray: Ray::new(rec.p, ray_in.direction),
                    };
                }

                let unit_direction = ray_in.direction.normalize();
                let cos_theta = (-unit_direction).dot(rec.normal).min(1.0);
                let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

                let cannot_refract = refraction_ratio * sin_theta > 1.0;
                let reflects =
                    cannot_refract || reflectance(cos_theta, refraction_ratio) > gen_f32(rng);
                let direction = if reflects {
                    reflect(unit_direction, rec.normal)
                } else {
                    refract(unit_direction, rec.normal, refraction_ratio)
                };

                ScatterResult::Scattered {
                    attenuation: Color::ONE,
                    ray: Ray::new(rec.p, direction),
                }
            }
        }
    }
}

impl From<&MaterialDesc> for Material {
    fn from(desc: &MaterialDesc) -> Self {
        match desc.kind {
            MaterialKind::Lambertian => Material::Lambertian {
                albedo: desc.albedo,
                texture_scale: desc.texture_scale,
            },
            MaterialKind::Metal => Material::Metal {
                albedo: desc.albedo,
                texture_scale: desc.texture_scale,
                fuzz: desc.fuzz,
            },
            MaterialKind::Dielectric => Material::Dielectric {
                refractive_index: desc.refractive_index,
            },
        }
    }
}

/// Schlick's approximation for reflectance.
#[inline]
fn reflectance(cosine: f32, refraction_ratio: f32) -> f32 {
    let r0 = ((1.0 - refraction_ratio) / (1.0 + refraction_ratio)).powi(2);
    r0 + (1.0 - r0) * (1.0 - cosine).powi(5)
}
