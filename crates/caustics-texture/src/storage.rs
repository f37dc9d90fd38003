use std::path::Path;

use anyhow::Result;

use crate::TargetTexture;

/// Where finished textures go.
pub trait TextureStorage: Send {
    fn save(&self, path: &Path, texture: &TargetTexture) -> Result<()>;
}

/// Writes OpenEXR files, creating missing parent directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExrStorage;

impl TextureStorage for ExrStorage {
    fn save(&self, path: &Path, texture: &TargetTexture) -> Result<()> {
        puffin::profile_function!();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        texture
            .to_image()
            .save_with_format(path, image::ImageFormat::OpenExr)?;

        log::info!("Saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::{DVec4, UVec2, Vec4};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::SplatBatch;

    #[test]
    fn saved_texture_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cb.exr");

        let mut texture = TargetTexture::new(8).unwrap();
        texture.add_batch(&SplatBatch::new(vec![(9, DVec4::new(0.5, 1.5, 2.5, 0.0))]));
        texture.finalize();

        ExrStorage.save(&path, &texture).unwrap();
        let loaded = TargetTexture::load(&path).unwrap();

        assert_eq!(loaded.resolution(), 8);
        assert_eq!(loaded.pixel(UVec2::new(1, 1)), Vec4::new(0.5, 1.5, 2.5, 1.0));
        assert_eq!(loaded, texture);
    }
}
