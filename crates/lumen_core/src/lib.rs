//! Lumen Core - scene authoring data for the progressive path tracer.
//!
//! This crate provides:
//!
//! - **Authoring types**: `SceneDesc`, `SphereDesc`, `MaterialDesc`
//! - **Procedural textures**: constant colors and UV checkerboards
//! - **Random scene builder**: the seeded "final scene" layout
//!
//! # Example
//!
//! ```
//! use lumen_core::random_scene;
//!
//! let scene = random_scene::build(45573880);
//! assert!(scene.validate().is_ok());
//! println!("{} spheres, {} materials", scene.spheres.len(), scene.materials.len());
//! ```

pub mod random_scene;
pub mod scene;
pub mod texture;

pub use scene::{MaterialDesc, MaterialKind, SceneDesc, SceneError, SphereDesc};
pub use texture::Texture;
