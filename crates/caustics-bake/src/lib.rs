use caustics_placement::PlacementError;
use caustics_splat::SplatError;
use thiserror::Error;

pub mod config;
pub use config::{BakeConfig, ConfigError, Device, TargetSelection, BASE_SENSOR_RESOLUTION};
mod flat;
pub use flat::FlatReceiverRenderer;
mod handle;
pub use handle::{run_bake, BakeHandle, Collaborators};
mod progress;
pub use progress::Progress;
pub mod render;
pub use render::{Denoiser, RenderPass, RenderRequest, RenderSettings, Renderer};
mod scheduler;
pub use scheduler::{BakeOutput, BakeScheduler, BakeState};

pub use caustics_texture::{ExrStorage, TextureStorage};

#[derive(Debug, Error)]
pub enum BakeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sensor placement failed")]
    Placement(#[from] PlacementError),
    #[error("rendering failed")]
    Render(#[source] anyhow::Error),
    #[error("renderer returned a {actual}x{actual} buffer for a {expected}x{expected} request")]
    ResolutionMismatch { expected: u32, actual: u32 },
    #[error("a render arrived without an outstanding request")]
    UnexpectedRender,
    #[error("a sensor without a sample quota was scheduled")]
    UnplannedSensor,
    #[error("sample accumulation failed")]
    Splat(#[from] SplatError),
    #[error("an accumulation task panicked")]
    TaskPanicked,
    #[error("denoising failed")]
    Denoise(#[source] anyhow::Error),
    #[error("the denoiser turned a {expected}x{expected} texture into {actual}x{actual}")]
    DenoisedResolution { expected: u32, actual: u32 },
    #[error("saving the texture failed")]
    Storage(#[source] anyhow::Error),
    #[error("the bake cannot finish while {0:?}")]
    NotFinished(BakeState),
    #[error("the bake was cancelled")]
    Cancelled,
}
