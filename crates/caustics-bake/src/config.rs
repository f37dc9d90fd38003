use std::path::PathBuf;

use caustics_placement::BalancePolicy;
use caustics_scene::SceneContext;
use caustics_texture::{TargetTexture, TextureError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Side of a sensor render at a sample resolution multiplier of one.
pub const BASE_SENSOR_RESOLUTION: u32 = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("the scene has no contributors")]
    NoContributors,
    #[error("the scene has no receivers")]
    NoReceivers,
    #[error("the scene has no light tagged as a source")]
    NoSources,
    #[error("light '{light}' has an energy of {energy}; scaled bakes need finite positive energy")]
    InvalidLightEnergy { light: String, energy: f32 },
    #[error("at least one sample per sensor is required")]
    ZeroSamples,
    #[error("a sample resolution multiplier of {0} leaves no pixels to render")]
    ZeroSampleResolution(f32),
    #[error("the target image needs a name")]
    EmptyImageName,
    #[error("invalid target texture")]
    Target(#[from] TextureError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetSelection {
    /// A fresh black texture.
    New { resolution: u32, image_name: String },
    /// Takes resolution and name from an existing square image; the bake starts black.
    Existing { path: PathBuf },
}

impl Default for TargetSelection {
    fn default() -> Self {
        Self::New {
            resolution: 2048,
            image_name: "cb".to_owned(),
        }
    }
}

/// Device the external renderer is asked to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Gpu,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    pub target: TargetSelection,
    /// Samples the widest sensor of every light renders.
    pub samples: u32,
    /// Scales [`BASE_SENSOR_RESOLUTION`].
    pub sample_resolution_multiplier: f32,
    pub colored: bool,
    pub denoise: bool,
    pub device: Device,
    pub bake_energy: bool,
    /// Directory the finished texture is written to. Nothing is written when `None`.
    pub output_dir: Option<PathBuf>,
    pub balance: BalancePolicy,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            target: TargetSelection::default(),
            samples: 1,
            sample_resolution_multiplier: 1.0,
            colored: false,
            denoise: false,
            device: Device::Gpu,
            bake_energy: false,
            output_dir: None,
            balance: BalancePolicy::default(),
        }
    }
}

/// A configuration checked against the scene, with everything derived from it resolved.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: BakeConfig,
    pub texture_resolution: u32,
    pub sample_resolution: u32,
    pub image_name: String,
    pub light_count: usize,
}

impl ValidatedConfig {
    /// Converts per-pixel sensor energy into texel energy of the target.
    pub fn image_normalization(&self) -> f64 {
        let texture = self.texture_resolution as f64;
        let sample = self.sample_resolution as f64;
        (texture * texture) / (sample * sample)
    }

    pub fn output_path(&self) -> Option<PathBuf> {
        self.config
            .output_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.exr", self.image_name)))
    }

    pub fn new_target(&self) -> Result<TargetTexture, TextureError> {
        TargetTexture::new(self.texture_resolution)
    }
}

impl BakeConfig {
    /// Checks everything that can be known before the first render.
    pub fn validate(&self, scene: &SceneContext) -> Result<ValidatedConfig, ConfigError> {
        if scene.contributors().next().is_none() {
            return Err(ConfigError::NoContributors);
        }
        if scene.receivers().next().is_none() {
            return Err(ConfigError::NoReceivers);
        }
        let light_count = scene.sources().count();
        if light_count == 0 {
            return Err(ConfigError::NoSources);
        }
        if self.bake_energy || light_count > 1 {
            if let Some(light) = scene
                .sources()
                .find(|light| !light.energy.is_finite() || light.energy <= 0.0)
            {
                return Err(ConfigError::InvalidLightEnergy {
                    light: light.name.clone(),
                    energy: light.energy,
                });
            }
        }
        if self.samples == 0 {
            return Err(ConfigError::ZeroSamples);
        }

        let sample_resolution =
            (BASE_SENSOR_RESOLUTION as f32 * self.sample_resolution_multiplier) as u32;
        if sample_resolution == 0 {
            return Err(ConfigError::ZeroSampleResolution(
                self.sample_resolution_multiplier,
            ));
        }

        let (texture_resolution, image_name) = match &self.target {
            TargetSelection::New {
                resolution,
                image_name,
            } => {
                if *resolution == 0 {
                    return Err(TextureError::ZeroResolution.into());
                }
                (*resolution, image_name.clone())
            }
            TargetSelection::Existing { path } => {
                let resolution = TargetTexture::read_resolution(path)?;
                let name = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (resolution, name)
            }
        };
        if image_name.is_empty() {
            return Err(ConfigError::EmptyImageName);
        }

        Ok(ValidatedConfig {
            config: self.clone(),
            texture_resolution,
            sample_resolution,
            image_name,
            light_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use caustics_geometry::Aabb;
    use caustics_scene::{Classification, Light, SceneObject};
    use glam::Vec3;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn scene_with_suns(energies: &[f32]) -> SceneContext {
        let mut scene = SceneContext::new();
        let pane = Aabb::new(Vec3::new(-0.5, -0.5, 1.0), Vec3::new(0.5, 0.5, 1.0));
        let floor = Aabb::new(Vec3::new(-2.0, -2.0, 0.0), Vec3::new(2.0, 2.0, 0.0));
        for (name, bounds, class) in [
            ("pane", pane, Classification::Contributor),
            ("floor", floor, Classification::Receiver),
        ] {
            let uuid = scene
                .add_object(SceneObject::from_aabb(name, bounds))
                .unwrap();
            scene.classify(uuid, class).unwrap();
        }
        for (i, energy) in energies.iter().enumerate() {
            let sun = Light::directional(&format!("sun{i}"), Vec3::NEG_Z, *energy);
            let sun = scene.add_light(sun);
            scene.classify(sun, Classification::Source).unwrap();
        }
        scene
    }

    #[test]
    fn defaults_match_property_panel() {
        let config = BakeConfig::default();

        assert_eq!(
            config.target,
            TargetSelection::New {
                resolution: 2048,
                image_name: "cb".to_owned()
            }
        );
        assert_eq!(config.samples, 1);
        assert_eq!(config.sample_resolution_multiplier, 1.0);
        assert_eq!(config.device, Device::Gpu);
        assert!(!config.colored && !config.denoise && !config.bake_energy);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: BakeConfig =
            serde_json::from_str(r#"{ "samples": 8, "colored": true }"#).unwrap();

        assert_eq!(config.samples, 8);
        assert!(config.colored);
        assert_eq!(config.target, TargetSelection::default());
    }

    #[test]
    fn empty_scene_is_rejected() {
        assert!(matches!(
            BakeConfig::default().validate(&SceneContext::new()),
            Err(ConfigError::NoContributors)
        ));
    }

    #[rstest]
    #[case(-1.0)]
    #[case(0.0)]
    #[case(f32::NAN)]
    fn unusable_energy_is_rejected_when_it_scales(#[case] energy: f32) {
        let multi = BakeConfig::default().validate(&scene_with_suns(&[1.0, energy]));
        assert!(matches!(
            multi,
            Err(ConfigError::InvalidLightEnergy { ref light, .. }) if light == "sun1"
        ));

        let energy_baked = BakeConfig {
            bake_energy: true,
            ..Default::default()
        }
        .validate(&scene_with_suns(&[energy]));
        assert!(matches!(
            energy_baked,
            Err(ConfigError::InvalidLightEnergy { .. })
        ));

        assert!(BakeConfig::default()
            .validate(&scene_with_suns(&[energy]))
            .is_ok());
    }

    #[test]
    fn existing_target_of_any_format_sets_resolution_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floor_lightmap.png");
        image::RgbaImage::new(32, 32).save(&path).unwrap();

        let validated = BakeConfig {
            target: TargetSelection::Existing { path },
            ..Default::default()
        }
        .validate(&scene_with_suns(&[1.0]))
        .unwrap();

        assert_eq!(validated.texture_resolution, 32);
        assert_eq!(validated.image_name, "floor_lightmap");
    }
}
