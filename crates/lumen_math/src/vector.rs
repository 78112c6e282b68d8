//! Reflection and refraction formulas.

use crate::Vec3;

/// Reflect `v` about the surface normal `n` (n must be unit length).
#[inline]
pub fn reflect(v: Vec3, n: Vec3) -> Vec3 {
    v - 2.0 * v.dot(n) * n
}

/// Refract the unit vector `uv` through a surface with unit normal `n`
/// using Snell's law, given the ratio of refractive indices eta_i / eta_t.
///
/// The caller is responsible for detecting total internal reflection; this
/// function assumes a real solution exists.
#[inline]
pub fn refract(uv: Vec3, n: Vec3, etai_over_etat: f32) -> Vec3 {
    let cos_theta = (-uv).dot(n).min(1.0);
    let r_out_perp = etai_over_etat * (uv + cos_theta * n);
    let r_out_parallel = -(1.0 - r_out_perp.length_squared()).abs().sqrt() * n;
    r_out_perp + r_out_parallel
}

/// True if every component is within epsilon of zero.
#[inline]
pub fn is_near_zero(v: Vec3) -> bool {
    const S: f32 = 1e-8;
    v.x.abs() < S && v.y.abs() < S && v.z.abs() < S
}
