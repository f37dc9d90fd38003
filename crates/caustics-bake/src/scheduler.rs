use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use caustics_camera::Sensor;
use caustics_placement::{PlanSettings, SensorPlanner};
use caustics_scene::{Light, SceneContext};
use caustics_splat::{group_samples, valid_count, SampleBuffer, SplatError, SplatParams};
use caustics_texture::{TargetTexture, TextureStorage};
use parking_lot::Mutex;

use crate::{
    config::{BakeConfig, ConfigError, ValidatedConfig},
    progress::{Progress, ProgressTracker},
    render::{Denoiser, RenderPass, RenderRequest, RenderSettings},
    BakeError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BakeState {
    Idle,
    PreparingLight,
    AwaitingRender,
    Accumulating,
    Finalizing,
    Done,
    Cancelling,
}

/// What a finished bake produced.
#[derive(Debug, Clone)]
pub struct BakeOutput {
    pub texture: TargetTexture,
    /// Where the texture was written, if it was.
    pub path: Option<PathBuf>,
    pub elapsed: Duration,
}

type AccumulationTask = JoinHandle<Result<usize, SplatError>>;

/// Walks every source light, every sensor of its plan and every sample of each sensor.
///
/// The scheduler never renders itself: [`BakeScheduler::next_request`] hands out the next
/// render and [`BakeScheduler::render_complete`] takes its result, splatting it on a
/// background thread. [`BakeScheduler::finish`] joins those threads before the texture is
/// released.
pub struct BakeScheduler {
    config: ValidatedConfig,
    scene: SceneContext,
    lights: Vec<Light>,
    planner: SensorPlanner,

    state: BakeState,
    light: Option<usize>,
    sensors: VecDeque<Sensor>,
    active: Option<Sensor>,
    coordinates: Option<SampleBuffer>,
    in_flight: Option<RenderRequest>,
    completed: u32,
    light_samples: u32,
    seed: u32,

    target: Arc<Mutex<TargetTexture>>,
    tasks: VecDeque<AccumulationTask>,
    cancelled: Arc<AtomicBool>,
    progress: ProgressTracker,
}

impl BakeScheduler {
    pub fn new(config: &BakeConfig, scene: SceneContext) -> Result<Self, ConfigError> {
        let config = config.validate(&scene)?;
        let target = config.new_target()?;
        let lights: Vec<Light> = scene.sources().cloned().collect();

        let planner = SensorPlanner::new(PlanSettings {
            requested_samples: config.config.samples,
            bake_energy: config.config.bake_energy,
            light_count: lights.len(),
            balance: config.config.balance,
        });

        Ok(Self {
            config,
            scene,
            lights,
            planner,

            state: BakeState::Idle,
            light: None,
            sensors: VecDeque::new(),
            active: None,
            coordinates: None,
            in_flight: None,
            completed: 0,
            light_samples: 0,
            seed: 1,

            target: Arc::new(Mutex::new(target)),
            tasks: VecDeque::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
            progress: ProgressTracker::new(),
        })
    }

    pub fn state(&self) -> BakeState {
        self.state
    }

    pub fn scene(&self) -> &SceneContext {
        &self.scene
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            resolution: self.config.sample_resolution,
            device: self.config.config.device,
            colored: self.config.config.colored,
        }
    }

    pub fn progress(&self) -> Progress {
        self.progress.snapshot()
    }

    pub(crate) fn shared_progress(&self) -> Arc<Mutex<Progress>> {
        self.progress.shared()
    }

    /// Flag that stops the bake before its next render once set.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Accumulation tasks started but not yet joined.
    pub fn accumulating(&self) -> usize {
        self.tasks.len()
    }

    /// Most accumulation tasks in flight at once, one per rayon worker.
    pub fn max_accumulating() -> usize {
        rayon::current_num_threads().max(1)
    }

    /// The render the bake needs next, `None` once it is ready to finish or cancelled.
    /// Asking again before the outstanding render completed returns the same request.
    pub fn next_request(&mut self) -> Result<Option<RenderRequest>, BakeError> {
        match self.state {
            BakeState::Finalizing | BakeState::Done | BakeState::Cancelling => return Ok(None),
            BakeState::AwaitingRender => return Ok(self.in_flight.clone()),
            _ => {}
        }

        if self.cancelled.load(Ordering::Acquire) {
            log::info!("Cancelling bake");
            self.state = BakeState::Cancelling;
            self.progress.status("Cancelling");
            return Ok(None);
        }

        loop {
            if let Some(sensor) = self.active.as_ref().filter(|sensor| sensor.remaining() > 0) {
                let request = RenderRequest {
                    light: *self.current_light()?.uuid(),
                    sensor: sensor.clone(),
                    pass: if self.coordinates.is_some() {
                        RenderPass::Color
                    } else {
                        RenderPass::Coordinates
                    },
                    resolution: self.config.sample_resolution,
                    seed: self.seed,
                };

                self.in_flight = Some(request.clone());
                self.state = BakeState::AwaitingRender;
                return Ok(Some(request));
            }

            if let Some(sensor) = self.sensors.pop_front() {
                log::debug!(
                    "Next {:?} sensor with {} samples",
                    sensor.projection(),
                    sensor.remaining()
                );
                self.active = Some(sensor);
                continue;
            }

            let next_light = self.light.map_or(0, |light| light + 1);
            if next_light >= self.lights.len() {
                self.state = BakeState::Finalizing;
                self.progress.status("Processing");
                return Ok(None);
            }
            self.prepare_light(next_light)?;
        }
    }

    fn current_light(&self) -> Result<&Light, BakeError> {
        self.light
            .and_then(|light| self.lights.get(light))
            .ok_or(BakeError::UnexpectedRender)
    }

    fn prepare_light(&mut self, index: usize) -> Result<(), BakeError> {
        self.state = BakeState::PreparingLight;
        self.light = Some(index);
        self.active = None;

        let light = &self.lights[index];
        let plan = self.planner.plan(light, &self.scene)?;

        self.light_samples = plan.total_samples();
        self.completed = 0;
        log::info!(
            "Light {}/{} '{}': {} sensors, {} samples",
            index + 1,
            self.lights.len(),
            light.name,
            plan.len(),
            self.light_samples
        );

        self.sensors = plan.into_sensors().into();
        self.progress
            .samples(index, self.lights.len(), 0, self.light_samples);
        Ok(())
    }

    /// Takes the result of the outstanding request.
    pub fn render_complete(&mut self, buffer: SampleBuffer) -> Result<(), BakeError> {
        let request = self.in_flight.take().ok_or(BakeError::UnexpectedRender)?;
        if buffer.resolution() != request.resolution {
            return Err(BakeError::ResolutionMismatch {
                expected: request.resolution,
                actual: buffer.resolution(),
            });
        }

        self.state = BakeState::Accumulating;
        self.reap_finished()?;

        let colored = self.config.config.colored;
        match request.pass {
            RenderPass::Coordinates if valid_count(&buffer) == 0 => self.skip_sensor(),
            RenderPass::Coordinates if colored => self.coordinates = Some(buffer),
            RenderPass::Coordinates => self.splat(&request.sensor, buffer, None)?,
            RenderPass::Color => {
                let coordinates = self
                    .coordinates
                    .take()
                    .ok_or(BakeError::UnexpectedRender)?;
                self.splat(&request.sensor, coordinates, Some(buffer))?;
            }
        }

        if let Some(light) = self.light {
            self.progress
                .samples(light, self.lights.len(), self.completed, self.light_samples);
        }
        Ok(())
    }

    /// The active sensor sees nothing, so none of its remaining samples would either.
    fn skip_sensor(&mut self) {
        if let Some(sensor) = self.active.as_mut() {
            let skipped = sensor.exhaust();
            log::debug!("Sensor sees no receiver, skipping {} samples", skipped);
            self.completed += skipped;
        }
        self.seed += 1;
    }

    fn splat(
        &mut self,
        sensor: &Sensor,
        coordinates: SampleBuffer,
        colors: Option<SampleBuffer>,
    ) -> Result<(), BakeError> {
        let normalization = sensor
            .normalization()
            .ok_or(BakeError::UnplannedSensor)?;
        let params = SplatParams {
            normalization: self.config.image_normalization() * normalization as f64,
            panoramic_fov: sensor.lens().fov(),
            sample_index: self.completed,
        };
        let resolution = self.config.texture_resolution;
        let target = self.target.clone();

        while self.tasks.len() >= Self::max_accumulating() {
            if let Some(oldest) = self.tasks.pop_front() {
                oldest.join().map_err(|_| BakeError::TaskPanicked)??;
            }
        }

        self.tasks.push_back(thread::spawn(move || -> Result<usize, SplatError> {
            let Some(batch) = group_samples(&coordinates, colors.as_ref(), resolution, &params)?
            else {
                return Ok(0);
            };

            target.lock().add_batch(&batch);
            Ok(batch.len())
        }));

        if let Some(active) = self.active.as_mut() {
            active.complete_sample();
        }
        self.completed += 1;
        self.seed += 1;
        Ok(())
    }

    /// Joins accumulation tasks that already ended so their errors surface early.
    fn reap_finished(&mut self) -> Result<(), BakeError> {
        let (finished, running) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition::<VecDeque<_>, _>(|task| task.is_finished());
        self.tasks = running;

        for task in finished {
            task.join().map_err(|_| BakeError::TaskPanicked)??;
        }
        Ok(())
    }

    fn join_all(&mut self) -> Result<(), BakeError> {
        puffin::profile_function!();

        let mut result = Ok(());
        for task in self.tasks.drain(..) {
            let joined = task
                .join()
                .map_err(|_| BakeError::TaskPanicked)
                .and_then(|splatted| splatted.map_err(BakeError::from));
            if let (Ok(()), Err(err)) = (&result, joined) {
                result = Err(err);
            }
        }
        result
    }

    /// Waits for every accumulation task and stops the bake without producing a texture.
    pub fn abort(&mut self) {
        if let Err(err) = self.join_all() {
            log::warn!("Accumulation failed while aborting: {}", err);
        }
        self.state = BakeState::Done;
    }

    /// Joins all accumulation, then finalizes, optionally denoises, and saves the texture.
    pub fn finish(
        &mut self,
        denoiser: Option<&mut dyn Denoiser>,
        storage: Option<&dyn TextureStorage>,
    ) -> Result<BakeOutput, BakeError> {
        puffin::profile_function!();

        match self.state {
            BakeState::Finalizing => {}
            BakeState::Cancelling => {
                self.abort();
                self.progress.status("Cancelled");
                return Err(BakeError::Cancelled);
            }
            state => return Err(BakeError::NotFinished(state)),
        }

        self.join_all()?;
        let mut texture = self.target.lock().clone();
        texture.finalize();

        if self.config.config.denoise {
            match denoiser {
                Some(denoiser) => {
                    self.progress.status("Denoising");
                    let denoised = denoiser.denoise(&texture).map_err(BakeError::Denoise)?;
                    if denoised.resolution() != texture.resolution() {
                        return Err(BakeError::DenoisedResolution {
                            expected: texture.resolution(),
                            actual: denoised.resolution(),
                        });
                    }
                    texture = denoised;
                }
                None => log::warn!("Denoising requested without a denoiser, skipping"),
            }
        }

        let path = match (self.config.output_path(), storage) {
            (Some(path), Some(storage)) => {
                storage.save(&path, &texture).map_err(BakeError::Storage)?;
                Some(path)
            }
            _ => None,
        };

        self.state = BakeState::Done;
        self.progress.complete();
        let elapsed = self.progress.snapshot().elapsed;
        log::info!("Caustic map complete in {:.2?}", elapsed);

        Ok(BakeOutput {
            texture,
            path,
            elapsed,
        })
    }
}

impl Drop for BakeScheduler {
    fn drop(&mut self) {
        for task in self.tasks.drain(..) {
            let _ = task.join();
        }
    }
}
