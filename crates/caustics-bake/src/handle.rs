use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use caustics_scene::SceneContext;
use caustics_texture::{ExrStorage, TextureStorage};
use parking_lot::Mutex;

use crate::{
    config::{BakeConfig, ConfigError},
    progress::Progress,
    render::{Denoiser, Renderer},
    scheduler::{BakeOutput, BakeScheduler},
    BakeError,
};

/// The external pieces a bake drives.
pub struct Collaborators {
    pub renderer: Box<dyn Renderer>,
    pub denoiser: Option<Box<dyn Denoiser>>,
    pub storage: Option<Box<dyn TextureStorage>>,
}

impl Collaborators {
    /// Renders with `renderer` and saves OpenEXR files.
    pub fn new(renderer: impl Renderer + 'static) -> Self {
        Self {
            renderer: Box::new(renderer),
            denoiser: None,
            storage: Some(Box::new(ExrStorage)),
        }
    }

    pub fn with_denoiser(mut self, denoiser: impl Denoiser + 'static) -> Self {
        self.denoiser = Some(Box::new(denoiser));
        self
    }

    pub fn with_storage(mut self, storage: Option<Box<dyn TextureStorage>>) -> Self {
        self.storage = storage;
        self
    }
}

/// A bake running on its own thread.
pub struct BakeHandle {
    cancelled: Arc<AtomicBool>,
    progress: Arc<Mutex<Progress>>,
    thread: JoinHandle<Result<BakeOutput, BakeError>>,
}

impl BakeHandle {
    /// Stops issuing renders. Accumulation already started still completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_done(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn progress(&self) -> Progress {
        self.progress.lock().clone()
    }

    pub fn join(self) -> Result<BakeOutput, BakeError> {
        self.thread.join().map_err(|_| BakeError::TaskPanicked)?
    }
}

/// Validates the bake and starts it on a background thread.
///
/// Configuration problems are reported here, before anything is rendered.
pub fn run_bake(
    config: &BakeConfig,
    scene: SceneContext,
    collaborators: Collaborators,
) -> Result<BakeHandle, ConfigError> {
    let scheduler = BakeScheduler::new(config, scene)?;
    let cancelled = scheduler.cancel_token();
    let progress = scheduler.shared_progress();

    let thread = thread::spawn(move || drive(scheduler, collaborators));

    Ok(BakeHandle {
        cancelled,
        progress,
        thread,
    })
}

fn render_all(
    scheduler: &mut BakeScheduler,
    renderer: &mut dyn Renderer,
) -> Result<(), BakeError> {
    while let Some(request) = scheduler.next_request()? {
        puffin::profile_scope!("render");

        let buffer = renderer.render(&request).map_err(BakeError::Render)?;
        scheduler.render_complete(buffer)?;
    }
    Ok(())
}

fn drive(
    mut scheduler: BakeScheduler,
    mut collaborators: Collaborators,
) -> Result<BakeOutput, BakeError> {
    let settings = scheduler.render_settings();
    let renderer = collaborators.renderer.as_mut();

    let result = renderer
        .setup(scheduler.scene(), &settings)
        .map_err(BakeError::Render)
        .and_then(|_| render_all(&mut scheduler, renderer))
        .and_then(|_| {
            let denoiser = collaborators
                .denoiser
                .as_mut()
                .map(|denoiser| denoiser.as_mut() as &mut dyn Denoiser);
            scheduler.finish(denoiser, collaborators.storage.as_deref())
        });

    match &result {
        Ok(_) => {}
        Err(BakeError::Cancelled) => log::info!("Bake cancelled"),
        Err(err) => {
            log::error!("Bake failed: {}", err);
            scheduler.abort();
        }
    }

    renderer.restore();
    result
}
