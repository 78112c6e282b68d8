//! Headless host for the Lumen path tracer.
//!
//! Usage: `lumen [settings.json] [scene-seed] [output.png]`
//!
//! Builds the seeded random scene, drives the engine one frame at a time
//! the way an interactive viewer would, and writes the front buffer as a
//! PNG when the trace converges. With `stop_when_completed` off the trace
//! never ends, so the image is rewritten periodically instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use image::{Rgba, RgbaImage};
use lumen_core::random_scene;
use lumen_renderer::{
    CameraView, Engine, FrontBuffer, PipelineState, RenderError, RenderSettings, Scene,
};

/// Host viewport size before resolution scaling
const VIEWPORT: (u32, u32) = (1280, 720);

/// Simulated frame interval
const FRAME: Duration = Duration::from_millis(16);

const REPORT_INTERVAL: Duration = Duration::from_secs(2);
const SAVE_INTERVAL: Duration = Duration::from_secs(30);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => load_settings(Path::new(&path))?,
        None => RenderSettings::default(),
    };
    let seed = match args.next() {
        Some(arg) => arg
            .parse::<u32>()
            .with_context(|| format!("Invalid scene seed '{arg}'"))?,
        None => random_scene::DEFAULT_SEED,
    };
    let output = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("lumen.png"));

    let scene = Scene::from_desc(&random_scene::build(seed)).context("Failed to compile scene")?;
    let mut engine = Engine::create(settings, scene, CameraView::default(), VIEWPORT.0, VIEWPORT.1)
        .context("Failed to create render engine")?;

    let resolution = engine.resolution();
    log::info!(
        "Rendering scene {} at {}x{} ({} spp target)",
        seed,
        resolution.width,
        resolution.height,
        engine.settings().samples_per_pixel
    );

    let mut last_report = Instant::now();
    let mut last_save = Instant::now();
    loop {
        let state = match engine.step() {
            Ok(state) => state,
            Err(RenderError::WorkerLost) => {
                log::warn!("Batch lost, restarting trace");
                continue;
            }
            Err(e) => return Err(e).context("Render step failed"),
        };

        if state == PipelineState::Idle && (engine.is_converged() || engine.is_halted()) {
            break;
        }

        if last_report.elapsed() >= REPORT_INTERVAL {
            let stats = engine.stats();
            log::info!(
                "{}/{} spp, {} batches, {:.2} Mrays/s (avg {:.2})",
                stats.accumulated_samples,
                engine.settings().samples_per_pixel,
                stats.batch_count,
                stats.million_rays_per_second,
                stats.average_million_rays_per_second
            );
            last_report = Instant::now();
        }

        if engine.is_converged() && last_save.elapsed() >= SAVE_INTERVAL {
            save_png(engine.front_buffer(), &output)?;
            last_save = Instant::now();
        }

        std::thread::sleep(FRAME);
    }

    if let Some(duration) = engine.stats().last_trace_duration {
        log::info!("Converged in {:.2?}", duration);
    }
    save_png(engine.front_buffer(), &output)?;
    engine.destroy();

    Ok(())
}

fn load_settings(path: &Path) -> Result<RenderSettings> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    let settings: RenderSettings = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse settings in {}", path.display()))?;
    log::info!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Quantize the half-float front buffer to 8-bit RGBA and save it.
fn save_png(front: &FrontBuffer, path: &Path) -> Result<()> {
    let resolution = front.resolution();
    let image = RgbaImage::from_fn(resolution.width, resolution.height, |x, y| {
        Rgba(front.get(x, y).map(|c| (c.clamp(0.0, 1.0) * 255.0 + 0.5) as u8))
    });
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Saved {}", path.display());
    Ok(())
}
