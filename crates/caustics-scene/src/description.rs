use caustics_geometry::Aabb;
use caustics_transform::{Transform, FORWARD};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    Classification, ClassificationError, Light, LightKind, SceneContext, SceneObject,
};

/// On-disk scene layout, as read by the command line tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneDescription {
    #[serde(default)]
    pub objects: Vec<ObjectDescription>,
    #[serde(default)]
    pub lights: Vec<LightDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDescription {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<Classification>,
    #[serde(default)]
    pub bounds: Option<Aabb>,
    #[serde(default)]
    pub points: Vec<Vec3>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightDescription {
    pub name: String,
    pub kind: LightKind,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default = "default_direction")]
    pub direction: Vec3,
    #[serde(default = "default_energy")]
    pub energy: f32,
    #[serde(default = "default_source")]
    pub source: bool,
}

fn default_direction() -> Vec3 {
    FORWARD
}

fn default_energy() -> f32 {
    1.0
}

fn default_source() -> bool {
    true
}

impl SceneDescription {
    /// Builds a scene context, applying every tag through [`SceneContext::classify`] so
    /// conflicting tags in the file are rejected the same way as in code.
    pub fn build(&self) -> Result<SceneContext, ClassificationError> {
        let mut scene = SceneContext::new();

        for object in &self.objects {
            let mut points = object.points.clone();
            if let Some(bounds) = object.bounds {
                points.extend(bounds.corners());
            }

            let uuid = scene.add_object(SceneObject::from_points(&object.name, points))?;
            for tag in &object.tags {
                scene.classify(uuid, *tag)?;
            }
        }

        for light in &self.lights {
            let transform = Transform::looking_along(light.position, light.direction);
            let uuid = scene.add_light(Light::new(&light.name, light.kind, transform, light.energy));
            if light.source {
                scene.classify(uuid, Classification::Source)?;
            }
        }

        log::debug!(
            "Loaded scene with {} objects and {} lights",
            self.objects.len(),
            self.lights.len()
        );

        Ok(scene)
    }
}
