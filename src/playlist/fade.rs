// Fade-in ramp and the timer that clocks it
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::audio::TrackToken;

/// Linear volume ramp from silence to `target` in equal steps.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeRamp {
    target: f32,
    step: f32,
    steps: u32,
    taken: u32,
}

impl FadeRamp {
    pub fn new(target: f32, steps: u32) -> Self {
        let steps = steps.max(1);
        Self {
            target,
            step: target / steps as f32,
            steps,
            taken: 0,
        }
    }

    /// Volume for the next step, or None once the ramp is done.
    ///
    /// Never exceeds the target and lands on it exactly on the last step.
    pub fn tick(&mut self) -> Option<f32> {
        if self.is_complete() {
            return None;
        }

        self.taken += 1;
        if self.taken == self.steps {
            Some(self.target)
        } else {
            Some((self.step * self.taken as f32).min(self.target))
        }
    }

    pub fn is_complete(&self) -> bool {
        self.taken >= self.steps
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

/// Repeating ticker for one track's fade. Dropping it cancels it.
#[derive(Debug)]
pub struct FadeTimer {
    token: TrackToken,
    task: JoinHandle<()>,
}

impl FadeTimer {
    /// Send `token` on `ticks` every `period`, first tick one period from now
    pub fn start(
        token: TrackToken,
        period: Duration,
        ticks: mpsc::UnboundedSender<TrackToken>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if ticks.send(token).is_err() {
                    break;
                }
            }
        });

        Self { token, task }
    }

    pub fn token(&self) -> TrackToken {
        self.token
    }
}

impl Drop for FadeTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
