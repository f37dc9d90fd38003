use glam::{DVec4, UVec2, Vec4};
use thiserror::Error;

mod asset;
pub mod storage;
pub use storage::{ExrStorage, TextureStorage};

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("target textures must be square, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },
    #[error("target textures need a resolution above zero")]
    ZeroResolution,
    #[error("{0:?} images cannot hold a caustics texture, expected 32-bit float")]
    UnsupportedFormat(image::ColorType),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Energy bound for a set of texels, already normalized and ready to add.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplatBatch {
    texels: Vec<(usize, DVec4)>,
}

impl SplatBatch {
    pub fn new(texels: Vec<(usize, DVec4)>) -> Self {
        Self { texels }
    }

    pub fn texels(&self) -> &[(usize, DVec4)] {
        &self.texels
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    pub fn total_energy(&self) -> DVec4 {
        self.texels.iter().map(|(_, energy)| *energy).sum()
    }
}

/// Square RGBA float texture caustics are accumulated into, addressed by surface UV.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetTexture {
    resolution: u32,
    data: Box<[Vec4]>,
}

impl TargetTexture {
    pub fn new(resolution: u32) -> Result<Self, TextureError> {
        if resolution == 0 {
            return Err(TextureError::ZeroResolution);
        }

        Ok(Self {
            resolution,
            data: vec![Vec4::ZERO; resolution as usize * resolution as usize].into_boxed_slice(),
        })
    }

    pub fn from_pixels(resolution: u32, data: Box<[Vec4]>) -> Result<Self, TextureError> {
        if resolution == 0 {
            return Err(TextureError::ZeroResolution);
        }
        let expected = resolution as usize * resolution as usize;
        if data.len() != expected {
            return Err(TextureError::NotSquare {
                width: resolution,
                height: (data.len() / resolution as usize) as u32,
            });
        }

        Ok(Self { resolution, data })
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn data(&self) -> &[Vec4] {
        &self.data
    }

    pub fn pixel(&self, id: UVec2) -> Vec4 {
        self.data[self.index(id)]
    }

    pub fn index(&self, id: UVec2) -> usize {
        (id.y * self.resolution + id.x) as usize
    }

    /// Adds every texel of the batch. Indices outside the texture are skipped.
    pub fn add_batch(&mut self, batch: &SplatBatch) {
        let mut skipped = 0;
        for (index, energy) in batch.texels() {
            match self.data.get_mut(*index) {
                Some(texel) => *texel += energy.as_vec4(),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::warn!("Skipped {} splats outside the target texture", skipped);
        }
    }

    /// Forces alpha to one, making the texture presentable.
    pub fn finalize(&mut self) {
        puffin::profile_function!();

        for texel in self.data.iter_mut() {
            texel.w = 1.0;
        }
    }

    pub fn total_energy(&self) -> DVec4 {
        self.data.iter().map(|texel| texel.as_dvec4()).sum()
    }

    pub fn is_black(&self) -> bool {
        self.data.iter().all(|texel| *texel == Vec4::ZERO)
    }
}
