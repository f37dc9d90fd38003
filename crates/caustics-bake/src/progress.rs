use std::{sync::Arc, time::Duration};

use caustics_time::Timer;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Progress {
    /// Share of the bake done, `0..=100`, never decreasing.
    pub percent: f32,
    pub status: String,
    pub elapsed: Duration,
}

/// Shared view of the progress, written by the scheduler and read through the bake handle.
#[derive(Debug, Clone)]
pub(crate) struct ProgressTracker {
    shared: Arc<Mutex<Progress>>,
    timer: Timer,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Progress {
                status: "Preparing".to_owned(),
                ..Default::default()
            })),
            timer: Timer::new(),
        }
    }

    pub fn shared(&self) -> Arc<Mutex<Progress>> {
        self.shared.clone()
    }

    pub fn snapshot(&self) -> Progress {
        self.shared.lock().clone()
    }

    /// `completed` of `samples` renders done for light `light` of `lights`.
    pub fn samples(&self, light: usize, lights: usize, completed: u32, samples: u32) {
        let status = if completed < samples {
            format!(
                "Light {}/{} | Render {}/{}",
                light + 1,
                lights,
                completed + 1,
                samples
            )
        } else {
            "Processing".to_owned()
        };

        let light_share = if samples == 0 {
            1.0
        } else {
            completed as f32 / samples as f32
        };
        let percent = (light_share + light as f32) / lights.max(1) as f32 * 100.0;

        self.update(percent, status);
    }

    pub fn status(&self, status: &str) {
        let percent = self.shared.lock().percent;
        self.update(percent, status.to_owned());
    }

    pub fn complete(&self) {
        self.update(100.0, "Done".to_owned());
    }

    fn update(&self, percent: f32, status: String) {
        let mut progress = self.shared.lock();
        progress.percent = percent.clamp(progress.percent, 100.0);
        progress.status = status;
        progress.elapsed = self.timer.elapsed();
    }
}
