use std::path::Path;

use glam::Vec4;

use crate::{TargetTexture, TextureError};

impl TargetTexture {
    /// Side of the square image at `path`, read from its header without decoding pixels,
    /// so any format the image crate can open will do.
    pub fn read_resolution(path: &Path) -> Result<u32, TextureError> {
        let (width, height) = image::image_dimensions(path)?;
        if width != height {
            return Err(TextureError::NotSquare { width, height });
        }
        if width == 0 {
            return Err(TextureError::ZeroResolution);
        }
        Ok(width)
    }

    /// Opens an existing target so a bake can keep accumulating into it.
    pub fn load(path: &Path) -> Result<Self, TextureError> {
        let image = image::open(path)?;
        log::debug!("Loaded target {}", path.display());
        Self::from_image(image)
    }

    pub fn load_from_memory(data: &[u8]) -> Result<Self, TextureError> {
        Self::from_image(image::load_from_memory(data)?)
    }

    fn from_image(mut image: image::DynamicImage) -> Result<Self, TextureError> {
        if let image::DynamicImage::ImageRgb32F(_) = &image {
            image = image::DynamicImage::ImageRgba32F(image.to_rgba32f());
        }

        match image {
            image::DynamicImage::ImageRgba32F(image) => {
                if image.width() != image.height() {
                    return Err(TextureError::NotSquare {
                        width: image.width(),
                        height: image.height(),
                    });
                }

                let resolution = image.width();
                let data: Box<[Vec4]> = image
                    .into_raw()
                    .chunks_exact(4)
                    .map(Vec4::from_slice)
                    .collect();
                Self::from_pixels(resolution, data)
            }
            other => Err(TextureError::UnsupportedFormat(other.color())),
        }
    }

    pub fn to_image(&self) -> image::Rgba32FImage {
        let raw: Vec<f32> = bytemuck::cast_slice(self.data()).to_vec();
        image::Rgba32FImage::from_raw(self.resolution, self.resolution, raw)
            .unwrap_or_else(|| image::Rgba32FImage::new(self.resolution, self.resolution))
    }
}
