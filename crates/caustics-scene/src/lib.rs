use std::collections::HashMap;

use caustics_geometry::Aabb;
use caustics_transform::Transform;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod description;
pub use description::SceneDescription;

/// The role an entity plays in a caustics bake. Every entity carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Classification {
    /// Refracts or reflects light, i.e. casts the caustics.
    Contributor,
    /// Carries the UV layout the caustics are baked into.
    Receiver,
    /// Blocks light without contributing caustics.
    Occluder,
    /// A light the bake iterates over.
    Source,
    #[default]
    None,
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("no scene entity with id {0}")]
    UnknownEntity(Uuid),
    #[error("'{name}' is already tagged {existing:?} and cannot also be {requested:?}")]
    Conflict {
        name: String,
        existing: Classification,
        requested: Classification,
    },
    #[error("'{0}' is a light and can only be tagged as a source")]
    LightTag(String),
    #[error("'{0}' is not a light and cannot be a source")]
    SourceTag(String),
    #[error("'{0}' has no bounding geometry")]
    EmptyGeometry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Parallel light along the light's forward axis, e.g. the sun.
    Directional,
    /// Omnidirectional light emitted from the light's position.
    Point,
}

#[derive(Debug, Clone)]
pub struct Light {
    uuid: Uuid,
    pub name: String,
    pub kind: LightKind,
    pub transform: Transform,
    pub energy: f32,
}

impl Light {
    pub fn new(name: &str, kind: LightKind, transform: Transform, energy: f32) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_owned(),
            kind,
            transform,
            energy,
        }
    }

    pub fn directional(name: &str, direction: Vec3, energy: f32) -> Self {
        Self::new(
            name,
            LightKind::Directional,
            Transform::looking_along(Vec3::ZERO, direction),
            energy,
        )
    }

    pub fn point(name: &str, position: Vec3, energy: f32) -> Self {
        Self::new(
            name,
            LightKind::Point,
            Transform::from_translation(position),
            energy,
        )
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn position(&self) -> Vec3 {
        self.transform.get_translation()
    }

    pub fn direction(&self) -> Vec3 {
        self.transform.forward()
    }
}

/// Geometry the bake reasons about, reduced to a world-space point cloud that bounds it.
#[derive(Debug, Clone)]
pub struct SceneObject {
    uuid: Uuid,
    pub name: String,
    points: Vec<Vec3>,
}

impl SceneObject {
    pub fn from_points(name: &str, points: Vec<Vec3>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.to_owned(),
            points,
        }
    }

    pub fn from_aabb(name: &str, aabb: Aabb) -> Self {
        Self::from_points(name, aabb.corners().to_vec())
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.points.iter().copied())
    }
}

/// Everything a bake needs to know about the host scene, passed explicitly to the
/// planner and scheduler.
#[derive(Debug, Default, Clone)]
pub struct SceneContext {
    objects: Vec<SceneObject>,
    lights: Vec<Light>,
    classification: HashMap<Uuid, Classification>,
}

impl SceneContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: SceneObject) -> Result<Uuid, ClassificationError> {
        if object.points.is_empty() {
            return Err(ClassificationError::EmptyGeometry(object.name));
        }

        let uuid = object.uuid;
        self.objects.push(object);
        Ok(uuid)
    }

    pub fn add_light(&mut self, light: Light) -> Uuid {
        let uuid = light.uuid;
        self.lights.push(light);
        uuid
    }

    fn name_of(&self, uuid: &Uuid) -> Option<(&str, bool)> {
        if let Some(object) = self.object(uuid) {
            Some((&object.name, false))
        } else {
            self.light(uuid).map(|light| (light.name.as_str(), true))
        }
    }

    /// Tags an entity. Re-tagging with the same role is a no-op and `Classification::None`
    /// clears a tag; any other change of role is rejected.
    pub fn classify(
        &mut self,
        uuid: Uuid,
        classification: Classification,
    ) -> Result<(), ClassificationError> {
        let (name, is_light) = self
            .name_of(&uuid)
            .ok_or(ClassificationError::UnknownEntity(uuid))?;

        match classification {
            Classification::None => {
                self.classification.remove(&uuid);
                return Ok(());
            }
            Classification::Source if !is_light => {
                return Err(ClassificationError::SourceTag(name.to_owned()))
            }
            Classification::Contributor | Classification::Receiver | Classification::Occluder
                if is_light =>
            {
                return Err(ClassificationError::LightTag(name.to_owned()))
            }
            _ => {}
        }

        let existing = self.classification_of(&uuid);
        if existing != Classification::None && existing != classification {
            return Err(ClassificationError::Conflict {
                name: name.to_owned(),
                existing,
                requested: classification,
            });
        }

        self.classification.insert(uuid, classification);
        Ok(())
    }

    pub fn classification_of(&self, uuid: &Uuid) -> Classification {
        self.classification
            .get(uuid)
            .copied()
            .unwrap_or(Classification::None)
    }

    pub fn object(&self, uuid: &Uuid) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.uuid == *uuid)
    }

    pub fn light(&self, uuid: &Uuid) -> Option<&Light> {
        self.lights.iter().find(|light| light.uuid == *uuid)
    }

    pub fn objects_tagged(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects
            .iter()
            .filter(move |object| self.classification_of(&object.uuid) == classification)
    }

    pub fn contributors(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects_tagged(Classification::Contributor)
    }

    pub fn receivers(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects_tagged(Classification::Receiver)
    }

    /// Lights tagged as sources, in insertion order.
    pub fn sources(&self) -> impl Iterator<Item = &Light> + '_ {
        self.lights
            .iter()
            .filter(|light| self.classification_of(&light.uuid) == Classification::Source)
    }

    /// Objects that may show up in a sensor's view and so bound its clip range.
    pub fn visible_objects(&self) -> impl Iterator<Item = &SceneObject> + '_ {
        self.objects.iter().filter(|object| {
            matches!(
                self.classification_of(&object.uuid),
                Classification::Contributor | Classification::Receiver | Classification::Occluder
            )
        })
    }
}
