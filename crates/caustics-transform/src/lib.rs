use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Lights and sensors look down their local -Z axis.
pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);

/// Rigid pose of a light or sensor. Sensors are never scaled, so unlike a general
/// object transform this only carries translation and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation: rotation.normalize(),
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Builds a pose at `translation` whose forward axis points along `direction`.
    pub fn looking_along(translation: Vec3, direction: Vec3) -> Self {
        Self::new(translation, Quat::from_rotation_arc(FORWARD, direction.normalize()))
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * FORWARD
    }

    pub fn get_translation(&self) -> Vec3 {
        self.translation
    }

    pub fn get_rotation(&self) -> Quat {
        self.rotation
    }

    /// Expresses a world-space point in this pose's local frame.
    pub fn to_local(&self, point: Vec3) -> Vec3 {
        self.rotation.inverse() * (point - self.translation)
    }

    pub fn to_world(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }
}
