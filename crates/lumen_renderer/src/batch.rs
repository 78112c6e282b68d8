//! Batch integration and combine passes.
//!
//! Both passes are embarrassingly parallel: every pixel reads only shared
//! immutable inputs and writes only its own slots, so rayon can split the
//! image however it likes.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use half::f16;
use lumen_math::{Color, Vec4};
use rayon::prelude::*;

use crate::buffers::{AccumulationBuffers, FrontBuffer, Rgba16};
use crate::camera::Camera;
use crate::integrator::sample_pixel;
use crate::sampling::sample_rng;
use crate::scene::Scene;
use crate::settings::Environment;

/// Pixels per combine work item.
pub const COMBINE_CHUNK: usize = 128;

/// Everything one batch reads besides the scene.
#[derive(Debug, Clone, Copy)]
pub struct BatchParams {
    pub camera: Camera,
    pub environment: Environment,
    pub seed: u64,
    /// Global index of this batch's first sample; keeps per-sample seeds
    /// independent of how samples are split into batches
    pub first_sample: u32,
    pub sample_count: u32,
    pub max_depth: u32,
}

/// Trace `params.sample_count` samples for every pixel and add them to the
/// running sums: `output = input + batch`.
pub fn integrate(scene: &Scene, params: &BatchParams, buffers: &mut AccumulationBuffers) {
    let width = buffers.resolution().width as usize;
    let (input, output, ray_counts) = buffers.batch_views();

    output
        .par_iter_mut()
        .zip(ray_counts.par_iter_mut())
        .enumerate()
        .for_each(|(index, (out, rays))| {
            let x = (index % width) as u32;
            let y = (index / width) as u32;

            let mut sum = Color::ZERO;
            let mut count = 0u32;
            for s in 0..params.sample_count {
                let mut rng = sample_rng(
                    params.seed,
                    index as u32,
                    params.first_sample.wrapping_add(s),
                );
                let (color, n) = sample_pixel(
                    &params.camera,
                    scene,
                    &params.environment,
                    params.max_depth,
                    x,
                    y,
                    &mut rng,
                );
                sum += color;
                count += n;
            }

            *out = input[index] + sum.extend(params.sample_count as f32);
            *rays = count;
        });
}

/// Gamma 2 transfer.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Average, tone-map, and downcast one accumulated pixel.
///
/// Pixels with no samples yet resolve to opaque black.
#[inline]
pub fn resolve_pixel(sum: Vec4) -> Rgba16 {
    if sum.w <= 0.0 {
        return [f16::ZERO, f16::ZERO, f16::ZERO, f16::ONE];
    }
    let average = sum.truncate() / sum.w;
    [
        f16::from_f32(linear_to_gamma(average.x)),
        f16::from_f32(linear_to_gamma(average.y)),
        f16::from_f32(linear_to_gamma(average.z)),
        f16::ONE,
    ]
}

/// Resolve the running sums into the display buffer. Reads `accumulated`
/// only.
pub fn combine(accumulated: &[Vec4], front: &mut FrontBuffer) {
    debug_assert_eq!(accumulated.len(), front.pixels().len());

    front
        .pixels_mut()
        .par_chunks_mut(COMBINE_CHUNK)
        .zip(accumulated.par_chunks(COMBINE_CHUNK))
        .for_each(|(dst, src)| {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = resolve_pixel(*s);
            }
        });
}

/// Progress reports from a running job, in order.
#[derive(Debug)]
pub(crate) enum JobEvent {
    BatchStarted,
    BatchFinished { rays: u64, elapsed: Duration },
    CombineStarted,
    Finished(Box<JobOutput>),
}

/// Buffers handed back to the engine when a job completes.
#[derive(Debug)]
pub(crate) struct JobOutput {
    pub buffers: AccumulationBuffers,
    /// The freshly combined image, if a combine was scheduled
    pub front: Option<FrontBuffer>,
}

/// A batch plus its optional combine, owning every buffer it touches for
/// as long as it runs.
pub(crate) struct BatchJob {
    scene: Arc<Scene>,
    params: BatchParams,
    buffers: AccumulationBuffers,
    front: Option<FrontBuffer>,
    #[cfg(test)]
    panic_after_start: bool,
}

impl BatchJob {
    pub fn new(
        scene: Arc<Scene>,
        params: BatchParams,
        buffers: AccumulationBuffers,
        front: Option<FrontBuffer>,
    ) -> Self {
        Self {
            scene,
            params,
            buffers,
            front,
            #[cfg(test)]
            panic_after_start: false,
        }
    }

    /// Make the job die right after reporting its start.
    #[cfg(test)]
    pub fn panic_after_start(mut self, panic: bool) -> Self {
        self.panic_after_start = panic;
        self
    }

    /// Run on a worker thread. The engine may have gone away, so send
    /// failures are ignored.
    pub fn run(mut self, events: Sender<JobEvent>) {
        let _ = events.send(JobEvent::BatchStarted);
        #[cfg(test)]
        if self.panic_after_start {
            panic!("batch job failed");
        }
        let start = Instant::now();

        integrate(&self.scene, &self.params, &mut self.buffers);

        let rays: u64 = self.buffers.ray_counts().par_iter().map(|&n| n as u64).sum();
        let _ = events.send(JobEvent::BatchFinished {
            rays,
            elapsed: start.elapsed(),
        });

        if let Some(front) = self.front.as_mut() {
            let _ = events.send(JobEvent::CombineStarted);
            combine(self.buffers.output(), front);
        }

        let _ = events.send(JobEvent::Finished(Box::new(JobOutput {
            buffers: self.buffers,
            front: self.front,
        })));
    }
}
