//! Procedural textures for material albedo.
//!
//! Textures are pure functions of the hit coordinates, so they can be
//! evaluated from any worker thread without synchronization.

use lumen_math::{Color, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// An albedo source evaluated at a surface hit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Texture {
    /// A single color everywhere.
    Constant(Color),

    /// A checkerboard in UV space. Cells alternate between `even` and `odd`
    /// every unit of scaled UV.
    Checker { even: Color, odd: Color },
}

impl Texture {
    /// Evaluate the texture at UV coordinates `(u, v)` scaled by `scale`.
    ///
    /// `point` is the world-space hit point; none of the current texture
    /// kinds depend on it but it is part of the evaluation contract.
    pub fn value(&self, u: f32, v: f32, scale: Vec2, _point: Vec3) -> Color {
        match *self {
            Texture::Constant(color) => color,
            Texture::Checker { even, odd } => {
                let cell = (u * scale.x).floor() as i64 + (v * scale.y).floor() as i64;
                if cell.rem_euclid(2) == 0 {
                    even
                } else {
                    odd
                }
            }
        }
    }
}

impl Default for Texture {
    fn default() -> Self {
        Texture::Constant(Color::splat(0.5))
    }
}

impl From<Color> for Texture {
    fn from(color: Color) -> Self {
        Texture::Constant(color)
    }
}
