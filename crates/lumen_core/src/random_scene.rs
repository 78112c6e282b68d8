//! Seeded procedural scene: the classic "many small spheres" layout.
//!
//! A large ground sphere, a 22x22 grid of small jittered spheres with a
//! 80% / 15% / 5% Lambertian / Metal / Dielectric split, and three large
//! feature spheres. The same seed always produces the same scene.

use lumen_math::{Color, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::scene::{MaterialDesc, SceneDesc};

/// Seed used by the default scene.
pub const DEFAULT_SEED: u32 = 45573880;

/// Grid cells span [-GRID_EXTENT, GRID_EXTENT) on X and Z.
const GRID_EXTENT: i32 = 11;

const SMALL_RADIUS: f32 = 0.2;

/// Small spheres closer than this to the metal feature sphere are skipped.
const CLEARANCE: f32 = 0.9;

/// Build the random scene for `seed`.
pub fn build(seed: u32) -> SceneDesc {
    let mut scene = SceneDesc::new();
    let mut rng = Pcg32::seed_from_u64(seed as u64);

    scene.add_sphere_with(
        Vec3::new(0.0, -1000.0, 0.0),
        1000.0,
        MaterialDesc::lambertian(Color::splat(0.5)).named("ground"),
    );

    let keep_out = Vec3::new(4.0, SMALL_RADIUS, 0.0);

    for a in -GRID_EXTENT..GRID_EXTENT {
        for b in -GRID_EXTENT..GRID_EXTENT {
            let material_prob: f32 = rng.gen();
            let center = Vec3::new(
                a as f32 + 0.9 * rng.gen::<f32>(),
                SMALL_RADIUS,
                b as f32 + 0.9 * rng.gen::<f32>(),
            );

            if center.distance(keep_out) <= CLEARANCE {
                continue;
            }

            let material = if material_prob < 0.8 {
                let albedo = random_color(&mut rng) * random_color(&mut rng);
                MaterialDesc::lambertian(albedo)
            } else if material_prob < 0.95 {
                let albedo = Color::new(
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                    rng.gen_range(0.5..1.0),
                );
                MaterialDesc::metal(albedo, rng.gen_range(0.0..0.5))
            } else {
                MaterialDesc::dielectric(1.5)
            };

            scene.add_sphere_with(center, SMALL_RADIUS, material.named(format!("small_{a}_{b}")));
        }
    }

    scene.add_sphere_with(
        Vec3::new(0.0, 1.0, 0.0),
        1.0,
        MaterialDesc::dielectric(1.5).named("glass"),
    );
    scene.add_sphere_with(
        Vec3::new(-4.0, 1.0, 0.0),
        1.0,
        MaterialDesc::lambertian(Color::new(0.4, 0.2, 0.1)).named("diffuse"),
    );
    scene.add_sphere_with(
        Vec3::new(4.0, 1.0, 0.0),
        1.0,
        MaterialDesc::metal(Color::new(0.7, 0.6, 0.5), 0.0).named("mirror"),
    );

    log::debug!("Built random scene (seed {}, {} spheres)", seed, scene.spheres.len());
    scene
}

fn random_color(rng: &mut Pcg32) -> Color {
    Color::new(rng.gen(), rng.gen(), rng.gen())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MaterialKind;

    fn kind_counts(scene: &SceneDesc) -> [usize; 3] {
        let mut counts = [0; 3];
        for sphere in &scene.spheres {
            let slot = match scene.materials[sphere.material].kind {
                MaterialKind::Lambertian => 0,
                MaterialKind::Metal => 1,
                MaterialKind::Dielectric => 2,
            };
            counts[slot] += 1;
        }
        counts
    }

    #[test]
    fn test_same_seed_same_scene() {
        let a = build(DEFAULT_SEED);
        let b = build(DEFAULT_SEED);

        assert_eq!(a, b);
        // Three grid cells fall inside the feature sphere's clearance
        assert_eq!(a.spheres.len(), 485);
        assert_eq!(a.materials.len(), 485);
        assert_eq!(kind_counts(&a), [374, 88, 23]);
    }

    #[test]
    fn test_layout_bounds() {
        let scene = build(DEFAULT_SEED);
        let grid_cells = (2 * GRID_EXTENT * 2 * GRID_EXTENT) as usize;

        // ground + surviving grid spheres + 3 feature spheres
        assert!(scene.spheres.len() > 4);
        assert!(scene.spheres.len() <= 1 + grid_cells + 3);
        assert_eq!(scene.spheres[0].radius, 1000.0);
        assert!(scene.validate().is_ok());

        let keep_out = Vec3::new(4.0, SMALL_RADIUS, 0.0);
        for sphere in &scene.spheres[1..scene.spheres.len() - 3] {
            assert_eq!(sphere.radius, SMALL_RADIUS);
            assert!(sphere.center.distance(keep_out) > CLEARANCE);
        }
    }

    #[test]
    fn test_material_split_is_roughly_80_15_5() {
        let scene = build(DEFAULT_SEED);
        let [lambertian, metal, dielectric] = kind_counts(&scene);
        let total = (lambertian + metal + dielectric) as f32;

        assert!(lambertian as f32 / total > 0.65);
        assert!(metal as f32 / total > 0.05);
        assert!(dielectric as f32 / total < 0.15);
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(build(1).spheres, build(2).spheres);
    }
}
