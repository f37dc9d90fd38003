use caustics_camera::{QuotaError, Sensor};
use caustics_scene::{Light, LightKind, SceneContext};
use thiserror::Error;
use uuid::Uuid;

pub mod balance;
pub use balance::BalancePolicy;
pub mod candidate;
pub use candidate::{Coverage, MIN_FOOTPRINT_FRACTION, MIN_PANORAMIC_FOV};
pub mod clip;
pub mod merge;

use candidate::{hemisphere_candidates, Candidate, Fitter, FullSphere};
use clip::{orthographic_clip, panoramic_clip};
use merge::{merge_overlapping, MergeOutcome};

#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("sensor merging did not settle after {passes} passes, {groups} groups left")]
    MergeDidNotConverge { passes: usize, groups: usize },
    #[error("light '{light}' has an energy of {energy}, which cannot scale a bake")]
    InvalidEnergy { light: String, energy: f32 },
    #[error(transparent)]
    Quota(#[from] QuotaError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanSettings {
    /// Samples the widest sensor of each light receives.
    pub requested_samples: u32,
    /// Scale normalization by the light's energy even for a single light bake.
    pub bake_energy: bool,
    /// Number of lights in the bake; more than one always scales by energy.
    pub light_count: usize,
    pub balance: BalancePolicy,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            requested_samples: 1,
            bake_energy: false,
            light_count: 1,
            balance: BalancePolicy::default(),
        }
    }
}

impl PlanSettings {
    /// Whether light energy enters the normalization at all.
    pub fn scales_energy(&self) -> bool {
        self.bake_energy || self.light_count > 1
    }

    fn energy_scale(&self, light: &Light) -> Result<f32, PlacementError> {
        if !self.scales_energy() {
            return Ok(1.0);
        }
        if !light.energy.is_finite() || light.energy <= 0.0 {
            return Err(PlacementError::InvalidEnergy {
                light: light.name.clone(),
                energy: light.energy,
            });
        }
        Ok(light.energy)
    }
}

#[derive(Debug, Clone)]
pub struct PlannedSensor {
    pub sensor: Sensor,
    /// Contributors the sensor was fitted to.
    pub members: Vec<Uuid>,
    pub coverage: Coverage,
}

#[derive(Debug, Clone, Default)]
pub struct SensorPlan {
    pub sensors: Vec<PlannedSensor>,
    /// The light sits inside its contributors and is covered by two hemisphere sensors,
    /// each listing every contributor.
    pub full_sphere: bool,
}

impl SensorPlan {
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn total_samples(&self) -> u32 {
        self.sensors.iter().map(|planned| planned.sensor.remaining()).sum()
    }

    pub fn into_sensors(self) -> Vec<Sensor> {
        self.sensors.into_iter().map(|planned| planned.sensor).collect()
    }
}

/// Decides how many sensors a light needs to see every contributor once, and how many
/// samples each of them renders.
#[derive(Debug, Clone, Default)]
pub struct SensorPlanner {
    settings: PlanSettings,
}

impl SensorPlanner {
    pub fn new(settings: PlanSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PlanSettings {
        &self.settings
    }

    pub fn plan(&self, light: &Light, scene: &SceneContext) -> Result<SensorPlan, PlacementError> {
        puffin::profile_function!();

        let energy = self.settings.energy_scale(light)?;
        let fitter = match light.kind {
            LightKind::Directional => {
                orthographic_clip(light, scene).map(|clip| Fitter::Orthographic {
                    light: light.transform,
                    clip,
                })
            }
            LightKind::Point => panoramic_clip(light, scene).map(|clip| Fitter::Panoramic {
                origin: light.position(),
                clip,
            }),
        };

        let contributors: Vec<_> = scene.contributors().collect();
        let Some(fitter) = fitter.filter(|_| !contributors.is_empty()) else {
            log::warn!("Light '{}' has no contributors to cover", light.name);
            return Ok(SensorPlan::default());
        };

        let candidates = contributors
            .iter()
            .map(|object| fitter.new_group(object))
            .collect::<Result<Vec<_>, FullSphere>>();

        let outcome = match candidates {
            Ok(groups) => {
                puffin::profile_scope!("merge");
                merge_overlapping(&fitter, groups)?
            }
            Err(FullSphere) => MergeOutcome::FullSphere,
        };

        let (mut sensors, full_sphere) = match outcome {
            MergeOutcome::Groups(groups) => (
                groups
                    .into_iter()
                    .map(|group| planned(group.candidate, group.members))
                    .collect::<Vec<_>>(),
                false,
            ),
            MergeOutcome::FullSphere => {
                log::debug!("Light '{}' needs a full sphere of sensors", light.name);

                let members: Vec<Uuid> = contributors.iter().map(|object| *object.uuid()).collect();
                let sensors = hemisphere_candidates(light.position(), fitter.clip_range())
                    .into_iter()
                    .map(|candidate| planned(candidate, members.clone()))
                    .collect();
                (sensors, true)
            }
        };

        sensors.retain(|planned| {
            let coverage = planned.sensor.coverage();
            let usable = coverage.is_finite() && coverage > 0.0;
            if !usable {
                log::warn!(
                    "Dropping sensor of light '{}' with coverage {}",
                    light.name,
                    coverage
                );
            }
            usable
        });

        self.balance(energy, &mut sensors)?;

        log::info!(
            "Placed {} sensors for light '{}'",
            sensors.len(),
            light.name
        );

        Ok(SensorPlan {
            sensors,
            full_sphere,
        })
    }

    fn balance(&self, energy: f32, sensors: &mut [PlannedSensor]) -> Result<(), PlacementError> {
        let Some(lowest) = sensors
            .iter()
            .map(|planned| planned.sensor.sample_density())
            .min_by(f32::total_cmp)
        else {
            return Ok(());
        };

        for PlannedSensor { sensor, .. } in sensors.iter_mut() {
            let remaining = self.settings.balance.quota(
                sensor.sample_density(),
                lowest,
                self.settings.requested_samples,
            );
            sensor.assign_quota(remaining, energy)?;

            log::debug!(
                "{:?} sensor at {} with density {}: {} samples",
                sensor.projection(),
                sensor.transform.get_translation(),
                sensor.sample_density(),
                remaining
            );
        }

        Ok(())
    }
}

fn planned(candidate: Candidate, members: Vec<Uuid>) -> PlannedSensor {
    PlannedSensor {
        sensor: candidate.sensor,
        members,
        coverage: candidate.coverage,
    }
}
