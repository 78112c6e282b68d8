// Re-export glam for convenience
pub use glam::*;

mod interval;
mod ray;
mod vector;

pub use interval::Interval;
pub use ray::Ray;
pub use vector::{is_near_zero, reflect, refract};

/// RGB color in linear space. Channels are nominally 0-1 but are not clamped.
pub type Color = Vec3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_vec3() {
        let c: Color = Color::new(0.25, 0.5, 1.0);
        assert_eq!(c * 2.0, Vec3::new(0.5, 1.0, 2.0));
    }
}
