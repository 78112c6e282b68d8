//! Thin-lens camera for ray generation.

use lumen_math::{Interval, Ray, Vec3};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::hittable::Hittable;
use crate::sampling::{random_in_unit_disk, sample_square};

/// Focus distance used until the focus ray first hits something.
pub const DEFAULT_FOCUS_DISTANCE: f32 = 10.0;

/// The live viewpoint reported by the host every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub position: Vec3,
    /// Viewing direction (need not be normalized)
    pub forward: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub vfov_degrees: f32,
}

impl CameraView {
    pub fn new(position: Vec3, forward: Vec3, up: Vec3, vfov_degrees: f32) -> Self {
        Self {
            position,
            forward,
            up,
            vfov_degrees,
        }
    }

    /// View from `position` towards `target`.
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, vfov_degrees: f32) -> Self {
        Self::new(position, target - position, up, vfov_degrees)
    }

    /// True if the two views differ by more than float noise.
    pub fn differs_from(&self, other: &CameraView) -> bool {
        const EPS: f32 = 1e-6;
        !(self.position.abs_diff_eq(other.position, EPS)
            && self.forward.abs_diff_eq(other.forward, EPS)
            && self.up.abs_diff_eq(other.up, EPS)
            && (self.vfov_degrees - other.vfov_degrees).abs() <= EPS)
    }

    /// Distance to the first surface on the optical axis, if any.
    pub fn autofocus(&self, world: &dyn Hittable) -> Option<f32> {
        let forward = self.forward.normalize_or_zero();
        if forward == Vec3::ZERO {
            return None;
        }
        world
            .hit(&Ray::new(self.position, forward), Interval::new(0.0, f32::INFINITY))
            .map(|rec| rec.t)
    }
}

impl Default for CameraView {
    fn default() -> Self {
        Self::look_at(Vec3::new(13.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y, 20.0)
    }
}

/// A camera frozen for one batch: basis vectors, pixel grid on the focus
/// plane, and lens disk.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    center: Vec3,
    pixel00_loc: Vec3,
    pixel_delta_u: Vec3,
    pixel_delta_v: Vec3,
    u: Vec3,
    v: Vec3,
    w: Vec3,
    lens_radius: f32,
    focus_dist: f32,
}

impl Camera {
    /// Build the camera for an image of `width` x `height` pixels.
    ///
    /// `aperture` is the lens diameter; rays start on a disk of radius
    /// `aperture / 2` and converge on the plane `focus_dist` away.
    pub fn new(
        view: &CameraView,
        width: u32,
        height: u32,
        aperture: f32,
        focus_dist: f32,
    ) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::DegenerateCamera("aspect ratio must be positive"));
        }
        if !(view.vfov_degrees > 0.0 && view.vfov_degrees < 180.0) {
            return Err(RenderError::DegenerateCamera("field of view must be in (0, 180) degrees"));
        }
        if !(focus_dist.is_finite() && focus_dist > 0.0) {
            return Err(RenderError::DegenerateCamera("focus distance must be positive"));
        }
        if !(aperture.is_finite() && aperture >= 0.0) {
            return Err(RenderError::DegenerateCamera("aperture must be non-negative"));
        }
        if !view.position.is_finite() {
            return Err(RenderError::DegenerateCamera("position must be finite"));
        }

        let w = (-view.forward)
            .try_normalize()
            .ok_or(RenderError::DegenerateCamera("forward vector is zero"))?;
        let u = view
            .up
            .cross(w)
            .try_normalize()
            .ok_or(RenderError::DegenerateCamera("up vector is parallel to forward"))?;
        let v = w.cross(u);

        // Viewport on the focus plane
        let theta = view.vfov_degrees.to_radians();
        let h = (theta / 2.0).tan();
        let viewport_height = 2.0 * h * focus_dist;
        let viewport_width = viewport_height * (width as f32 / height as f32);

        let viewport_u = viewport_width * u;
        let viewport_v = -viewport_height * v;

        let pixel_delta_u = viewport_u / width as f32;
        let pixel_delta_v = viewport_v / height as f32;

        let center = view.position;
        let viewport_upper_left = center - focus_dist * w - viewport_u / 2.0 - viewport_v / 2.0;
        let pixel00_loc = viewport_upper_left + 0.5 * (pixel_delta_u + pixel_delta_v);

        Ok(Self {
            center,
            pixel00_loc,
            pixel_delta_u,
            pixel_delta_v,
            u,
            v,
            w,
            lens_radius: aperture / 2.0,
            focus_dist,
        })
    }

    /// Jittered ray through pixel (i, j), with (0, 0) the top-left pixel.
    pub fn get_ray(&self, i: u32, j: u32, rng: &mut dyn RngCore) -> Ray {
        let offset = sample_square(rng);

        let pixel_sample = self.pixel00_loc
            + (i as f32 + offset.x) * self.pixel_delta_u
            + (j as f32 + offset.y) * self.pixel_delta_v;

        let ray_origin = if self.lens_radius <= 0.0 {
            self.center
        } else {
            self.defocus_disk_sample(rng)
        };

        Ray::new(ray_origin, pixel_sample - ray_origin)
    }

    fn defocus_disk_sample(&self, rng: &mut dyn RngCore) -> Vec3 {
        let p = random_in_unit_disk(rng) * self.lens_radius;
        self.center + p.x * self.u + p.y * self.v
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        -self.w
    }

    pub fn focus_dist(&self) -> f32 {
        self.focus_dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Scene, Sphere};
    use lumen_math::Color;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn front_view() -> CameraView {
        CameraView::new(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z, Vec3::Y, 90.0)
    }

    #[test]
    fn test_camera_basis() {
        let camera = Camera::new(&front_view(), 800, 600, 0.0, 1.0).unwrap();

        assert_eq!(camera.center(), Vec3::new(0.0, 0.0, 2.0));
        assert!((camera.w - Vec3::Z).length() < 1e-6);
        assert!((camera.u - Vec3::X).length() < 1e-6);
        assert!((camera.v - Vec3::Y).length() < 1e-6);
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_center_ray_points_forward() {
        let camera = Camera::new(&front_view(), 101, 101, 0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let ray = camera.get_ray(50, 50, &mut rng);
        let dir = ray.direction.normalize();
        assert!(dir.z < -0.99);
    }

    #[test]
    fn test_top_left_pixel_points_up_and_left() {
        let camera = Camera::new(&front_view(), 100, 100, 0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let ray = camera.get_ray(0, 0, &mut rng);
        assert!(ray.direction.x < 0.0);
        assert!(ray.direction.y > 0.0);
    }

    #[test]
    fn test_defocus_rays_converge_on_focus_plane() {
        let focus = 3.0;
        let camera = Camera::new(&front_view(), 64, 64, 0.5, focus).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..32 {
            let ray = camera.get_ray(32, 32, &mut rng);
            let lens_offset = ray.origin - camera.center();
            assert!(lens_offset.length() <= 0.25 + 1e-6);
            assert!(lens_offset.z.abs() < 1e-6);

            // Every ray through this pixel lands within one pixel on the focus plane
            let t = -focus / ray.direction.z;
            let on_plane = ray.at(t);
            let pixel_size = 2.0 * focus / 64.0;
            assert!(on_plane.x.abs() <= pixel_size && on_plane.y.abs() <= pixel_size);
        }
    }

    #[test]
    fn test_degenerate_cameras_are_rejected() {
        let view = front_view();
        assert!(matches!(
            Camera::new(&view, 0, 10, 0.0, 1.0),
            Err(RenderError::DegenerateCamera(_))
        ));
        assert!(Camera::new(&view, 10, 10, 0.0, 0.0).is_err());
        assert!(Camera::new(&view, 10, 10, -1.0, 1.0).is_err());

        let parallel_up = CameraView::new(Vec3::ZERO, Vec3::Y, Vec3::Y, 60.0);
        assert!(Camera::new(&parallel_up, 10, 10, 0.0, 1.0).is_err());

        let zero_forward = CameraView::new(Vec3::ZERO, Vec3::ZERO, Vec3::Y, 60.0);
        assert!(Camera::new(&zero_forward, 10, 10, 0.0, 1.0).is_err());

        let wide = CameraView {
            vfov_degrees: 180.0,
            ..view
        };
        assert!(Camera::new(&wide, 10, 10, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_view_change_detection() {
        let view = front_view();
        let mut moved = view;
        assert!(!view.differs_from(&moved));

        moved.position.x += 1e-8;
        assert!(!view.differs_from(&moved));

        moved.vfov_degrees = 60.0;
        assert!(view.differs_from(&moved));
    }

    #[test]
    fn test_autofocus_finds_first_surface() {
        let scene = Scene::new(
            vec![Sphere::new(Vec3::ZERO, 0.5, 0)],
            vec![Material::lambertian(Color::ONE)],
        )
        .unwrap();

        assert_eq!(front_view().autofocus(&scene), Some(1.5));

        let away = CameraView::new(Vec3::new(0.0, 0.0, 2.0), Vec3::Z, Vec3::Y, 90.0);
        assert_eq!(away.autofocus(&scene), None);
    }
}
