//! Progressive accumulation engine.
//!
//! The engine owns every buffer and drives a small state machine from a
//! single control thread. Each cycle it hands the accumulation buffers (and,
//! when a combine is due, the back display buffer) to one job on the worker
//! pool. The job reports progress over a channel and hands the buffers back
//! when it finishes, so the control thread never touches a buffer a worker
//! is still using.
//!
//! Host inputs (camera moves, resizes, scene edits, restarts, aborts) are
//! only recorded when they arrive and take effect when the next batch is
//! scheduled, after the in-flight one has drained.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use lumen_math::Vec4;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::batch::{BatchJob, BatchParams, JobEvent};
use crate::buffers::{AccumulationBuffers, FrontBuffer, Resolution};
use crate::camera::{Camera, CameraView, DEFAULT_FOCUS_DISTANCE};
use crate::error::{RenderError, RenderResult};
use crate::scene::Scene;
use crate::settings::RenderSettings;
use crate::stats::{million_rays_per_second, RenderStats, ThroughputHistory};

/// Where the accumulation pipeline is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing in flight: converged, halted, or not started
    Idle,
    BatchScheduled,
    BatchRunning,
    /// Batch finished and no combine follows it this cycle
    BatchComplete,
    CombineScheduled,
    CombineRunning,
    CombineComplete,
}

/// Bookkeeping for the job currently on the pool.
struct InFlight {
    events: Receiver<JobEvent>,
    batch_samples: u32,
    combine: bool,
}

pub struct Engine {
    settings: RenderSettings,
    pool: ThreadPool,

    scene: Arc<Scene>,
    pending_scene: Option<Arc<Scene>>,

    view: CameraView,
    camera_dirty: bool,
    focus_distance: f32,

    viewport: (u32, u32),
    resolution: Resolution,
    pending_resolution: Option<Resolution>,

    /// `None` while a job owns them
    buffers: Option<AccumulationBuffers>,
    front: FrontBuffer,
    back: Option<FrontBuffer>,
    in_flight: Option<InFlight>,

    state: PipelineState,
    accumulated_samples: u32,
    restart_requested: bool,
    abort_requested: bool,
    halted: bool,
    trace_completed: bool,

    stats: RenderStats,
    throughput: ThroughputHistory,
    trace_started: Instant,

    #[cfg(test)]
    fail_next_batch: bool,
}

impl Engine {
    /// Create an engine for a host viewport of `viewport_width` x
    /// `viewport_height` pixels. The first `step` starts a fresh trace.
    pub fn create(
        settings: RenderSettings,
        scene: Scene,
        view: CameraView,
        viewport_width: u32,
        viewport_height: u32,
    ) -> RenderResult<Self> {
        settings.validate()?;

        let mut builder = ThreadPoolBuilder::new()
            .thread_name(|i| format!("lumen-worker-{i}"))
            .panic_handler(|_| log::error!("Batch worker panicked; the batch is lost"));
        if let Some(threads) = settings.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        let resolution =
            Resolution::from_viewport(viewport_width, viewport_height, settings.resolution_scale)?;
        // Reject a degenerate viewpoint up front
        Camera::new(
            &view,
            resolution.width,
            resolution.height,
            settings.camera_aperture,
            DEFAULT_FOCUS_DISTANCE,
        )?;

        let buffers = AccumulationBuffers::allocate(resolution)?;
        let front = FrontBuffer::allocate(resolution)?;
        let back = FrontBuffer::allocate(resolution)?;
        log::info!(
            "Rebuilt accumulation buffers (now {} x {})",
            resolution.width,
            resolution.height
        );
        log::debug!("Worker pool running {} threads", pool.current_num_threads());

        Ok(Self {
            settings,
            pool,
            scene: Arc::new(scene),
            pending_scene: None,
            view,
            camera_dirty: false,
            focus_distance: DEFAULT_FOCUS_DISTANCE,
            viewport: (viewport_width, viewport_height),
            resolution,
            pending_resolution: None,
            buffers: Some(buffers),
            front,
            back: Some(back),
            in_flight: None,
            state: PipelineState::Idle,
            accumulated_samples: 0,
            restart_requested: true,
            abort_requested: false,
            halted: false,
            trace_completed: false,
            stats: RenderStats::default(),
            throughput: ThroughputHistory::new(),
            trace_started: Instant::now(),
            #[cfg(test)]
            fail_next_batch: false,
        })
    }

    /// Feed the host's current viewpoint. Any change restarts the trace.
    pub fn set_view(&mut self, view: CameraView) -> RenderResult<()> {
        Camera::new(
            &view,
            self.resolution.width,
            self.resolution.height,
            self.settings.camera_aperture,
            self.focus_distance,
        )?;
        if view.differs_from(&self.view) {
            self.view = view;
            self.camera_dirty = true;
        }
        Ok(())
    }

    /// Report the host viewport size. Buffers are rebuilt before the next
    /// batch if the scaled size changed.
    pub fn resize_viewport(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let resolution = Resolution::from_viewport(width, height, self.settings.resolution_scale)?;
        self.viewport = (width, height);
        self.pending_resolution = (resolution != self.resolution).then_some(resolution);
        Ok(())
    }

    /// Replace the scene. The in-flight batch keeps the snapshot it started
    /// with.
    pub fn set_scene(&mut self, scene: Scene) {
        self.pending_scene = Some(Arc::new(scene));
    }

    /// Replace the settings and restart. The worker pool keeps its size.
    pub fn set_settings(&mut self, settings: RenderSettings) -> RenderResult<()> {
        settings.validate()?;
        if settings.threads != self.settings.threads {
            log::warn!("Thread count changes take effect when the engine is recreated");
        }
        let (width, height) = self.viewport;
        let resolution = Resolution::from_viewport(width, height, settings.resolution_scale)?;
        self.pending_resolution = (resolution != self.resolution).then_some(resolution);
        self.settings = settings;
        self.restart_requested = true;
        Ok(())
    }

    /// Start a fresh trace on the next batch.
    pub fn restart(&mut self) {
        self.restart_requested = true;
    }

    /// Stop scheduling batches. Work already in flight finishes normally.
    ///
    /// Restart requests and camera moves made before the abort are
    /// discarded; pending resizes and scene changes are kept and restart the
    /// trace when applied.
    pub fn abort(&mut self) {
        if self.in_flight.is_some() {
            self.abort_requested = true;
        } else {
            self.halt();
        }
    }

    /// Advance the pipeline without blocking: collect progress from the
    /// in-flight job, then schedule the next batch if the pool is free.
    ///
    /// Call this once per host frame.
    pub fn step(&mut self) -> RenderResult<PipelineState> {
        let finished = self.poll(false)?;
        // A drained abort suppresses scheduling for the rest of this cycle
        let aborted_now = finished && self.halted;
        if self.in_flight.is_none() && !aborted_now {
            self.schedule_next()?;
        }
        Ok(self.state)
    }

    /// Run one full cycle: schedule a batch if none is in flight, then
    /// wait for it and its combine to finish.
    pub fn step_blocking(&mut self) -> RenderResult<PipelineState> {
        if self.in_flight.is_none() {
            self.schedule_next()?;
        }
        self.poll(true)?;
        Ok(self.state)
    }

    /// Wait for in-flight work and release every buffer.
    pub fn destroy(mut self) {
        self.drain();
        log::debug!("Engine destroyed after {} samples", self.accumulated_samples);
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// The most recently combined image.
    pub fn front_buffer(&self) -> &FrontBuffer {
        &self.front
    }

    /// Resolution of the accumulation buffers. A pending resize is not
    /// reflected until it is applied.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn accumulated_samples(&self) -> u32 {
        self.accumulated_samples
    }

    /// True once the target sample count has been reached.
    pub fn is_converged(&self) -> bool {
        self.accumulated_samples >= self.settings.samples_per_pixel
    }

    /// True after an abort, until the next restart trigger.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Running radiance sums after the last batch, or `None` while a job
    /// owns the buffers.
    pub fn accumulation(&self) -> Option<&[Vec4]> {
        self.buffers.as_ref().map(|b| b.output())
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Focus distance used by the last scheduled batch.
    pub fn focus_distance(&self) -> f32 {
        self.focus_distance
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Process events from the in-flight job. Returns true if the job
    /// finished.
    fn poll(&mut self, blocking: bool) -> RenderResult<bool> {
        loop {
            let Some(flight) = self.in_flight.as_ref() else {
                return Ok(false);
            };

            let event = if blocking {
                match flight.events.recv() {
                    Ok(event) => event,
                    Err(_) => return Err(self.worker_lost()),
                }
            } else {
                match flight.events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => return Ok(false),
                    Err(TryRecvError::Disconnected) => return Err(self.worker_lost()),
                }
            };

            if self.handle_event(event) {
                return Ok(true);
            }
        }
    }

    fn handle_event(&mut self, event: JobEvent) -> bool {
        match event {
            JobEvent::BatchStarted => {
                self.state = PipelineState::BatchRunning;
                false
            }
            JobEvent::BatchFinished { rays, elapsed } => {
                let Some((batch_samples, combine)) =
                    self.in_flight.as_ref().map(|f| (f.batch_samples, f.combine))
                else {
                    return false;
                };
                self.accumulated_samples =
                    self.accumulated_samples.saturating_add(batch_samples);

                let mrays = million_rays_per_second(rays, elapsed);
                self.stats.accumulated_samples = self.accumulated_samples;
                self.stats.batch_count += 1;
                self.stats.last_batch_rays = rays;
                self.stats.last_batch_duration = elapsed;
                self.stats.million_rays_per_second = mrays;
                self.stats.average_million_rays_per_second = self.throughput.record(mrays);

                log::debug!(
                    "Batch {} done: {} spp, {:.2} Mrays/s ({:.2} avg)",
                    self.stats.batch_count,
                    self.accumulated_samples,
                    mrays,
                    self.stats.average_million_rays_per_second
                );

                self.state = if combine {
                    PipelineState::CombineScheduled
                } else {
                    PipelineState::BatchComplete
                };
                false
            }
            JobEvent::CombineStarted => {
                self.state = PipelineState::CombineRunning;
                false
            }
            JobEvent::Finished(output) => {
                let combined = self.in_flight.take().is_some_and(|flight| flight.combine);
                let output = *output;
                self.buffers = Some(output.buffers);
                if let Some(front) = output.front {
                    self.back = Some(std::mem::replace(&mut self.front, front));
                }
                self.state = if combined {
                    PipelineState::CombineComplete
                } else {
                    PipelineState::BatchComplete
                };

                if !self.trace_completed && self.is_converged() {
                    self.trace_completed = true;
                    let elapsed = self.trace_started.elapsed();
                    self.stats.last_trace_duration = Some(elapsed);
                    log::info!(
                        "Trace completed: {} samples per pixel in {:.2?}",
                        self.accumulated_samples,
                        elapsed
                    );
                }

                if self.abort_requested {
                    self.halt();
                }
                true
            }
        }
    }

    fn halt(&mut self) {
        self.abort_requested = false;
        self.restart_requested = false;
        self.camera_dirty = false;
        self.halted = true;
        self.state = PipelineState::Idle;
        log::info!("Render aborted at {} samples per pixel", self.accumulated_samples);
    }

    /// The job died without handing its buffers back. They are reallocated
    /// and the trace restarts on the next step.
    fn worker_lost(&mut self) -> RenderError {
        self.in_flight = None;
        self.state = PipelineState::Idle;
        self.restart_requested = true;
        log::error!("Lost the in-flight batch; restarting the trace");
        RenderError::WorkerLost
    }

    fn schedule_next(&mut self) -> RenderResult<()> {
        let needs_reset = self.restart_requested
            || self.camera_dirty
            || self.pending_resolution.is_some()
            || self.pending_scene.is_some()
            || self.buffers.is_none();

        if needs_reset {
            self.apply_pending()?;
            self.halted = false;
            self.trace_completed = false;
            return self.schedule(true);
        }

        if self.halted || (self.is_converged() && self.settings.stop_when_completed) {
            self.state = PipelineState::Idle;
            return Ok(());
        }

        self.schedule(false)
    }

    /// Apply deferred host changes. Only called with nothing in flight.
    fn apply_pending(&mut self) -> RenderResult<()> {
        if let Some(scene) = self.pending_scene.take() {
            self.scene = scene;
        }
        if let Some(resolution) = self.pending_resolution.take() {
            self.resolution = resolution;
            self.buffers = None;
        }
        if self.buffers.is_none() {
            self.buffers = Some(AccumulationBuffers::allocate(self.resolution)?);
            log::info!(
                "Rebuilt accumulation buffers (now {} x {})",
                self.resolution.width,
                self.resolution.height
            );
        }
        self.restart_requested = false;
        self.camera_dirty = false;
        Ok(())
    }

    fn schedule(&mut self, first: bool) -> RenderResult<()> {
        if let Some(distance) = self
            .view
            .autofocus(self.scene.as_ref())
            .filter(|d| d.is_finite() && *d > 0.0)
        {
            self.focus_distance = distance;
        }
        let Resolution { width, height } = self.resolution;
        let camera = Camera::new(
            &self.view,
            width,
            height,
            self.settings.camera_aperture,
            self.focus_distance,
        )?;

        let batch_samples = self.settings.batch_samples();
        let carried = if first { 0 } else { self.accumulated_samples };
        let combine = self.settings.preview_after_batch
            || carried.saturating_add(batch_samples) >= self.settings.samples_per_pixel;

        let front = if combine {
            match self.back.take() {
                Some(back) if back.resolution() == self.resolution => Some(back),
                _ => Some(FrontBuffer::allocate(self.resolution)?),
            }
        } else {
            None
        };

        let mut buffers = match self.buffers.take() {
            Some(buffers) => buffers,
            None => AccumulationBuffers::allocate(self.resolution)?,
        };

        if first {
            buffers.reset()?;
            self.accumulated_samples = 0;
            self.stats = RenderStats::default();
            self.throughput.clear();
            self.trace_started = Instant::now();
            log::info!(
                "Starting trace at {} x {}: {} samples per pixel, {} per batch, depth {}",
                width,
                height,
                self.settings.samples_per_pixel,
                batch_samples,
                self.settings.max_depth
            );
        } else {
            buffers.swap();
        }

        let params = BatchParams {
            camera,
            environment: self.settings.environment,
            seed: self.settings.seed,
            first_sample: self.accumulated_samples,
            sample_count: batch_samples,
            max_depth: self.settings.max_depth,
        };
        let job = BatchJob::new(Arc::clone(&self.scene), params, buffers, front);
        #[cfg(test)]
        let job = job.panic_after_start(std::mem::take(&mut self.fail_next_batch));

        let (sender, events) = mpsc::channel();
        self.pool.spawn(move || job.run(sender));

        self.in_flight = Some(InFlight {
            events,
            batch_samples,
            combine,
        });
        self.state = PipelineState::BatchScheduled;
        Ok(())
    }

    /// Block until the in-flight job has released its buffers.
    fn drain(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            // Ends when the job drops its sender
            for _ in flight.events.iter() {}
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.drain();
    }
}
