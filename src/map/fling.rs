//! Decaying pan animation started by a fling gesture.

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::config::FlingConfig;

/// Per-frame pan deltas of a fling.
///
/// Starts at `-velocity / velocity_divisor` and shrinks by `decay` every
/// frame until both axes are at or below `stop_threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlingDeltas {
    delta_x: f64,
    delta_y: f64,
    decay: f64,
    stop_threshold: f64,
}

impl FlingDeltas {
    pub fn new(velocity_x: f64, velocity_y: f64, config: &FlingConfig) -> Self {
        Self {
            delta_x: -velocity_x / config.velocity_divisor,
            delta_y: -velocity_y / config.velocity_divisor,
            decay: config.decay,
            stop_threshold: config.stop_threshold,
        }
    }
}

impl Iterator for FlingDeltas {
    type Item = (f64, f64);

    fn next(&mut self) -> Option<Self::Item> {
        // NaN deltas compare false here and end the fling
        let moving =
            self.delta_x.abs() > self.stop_threshold || self.delta_y.abs() > self.stop_threshold;
        if !moving {
            return None;
        }

        let step = (self.delta_x, self.delta_y);
        self.delta_x *= self.decay;
        self.delta_y *= self.decay;
        Some(step)
    }
}

/// Spawns the animation, calling `emit` once per frame.
///
/// Aborting the returned handle stops the animation at its next frame delay.
pub(crate) fn spawn_fling<F>(deltas: FlingDeltas, frame: Duration, mut emit: F) -> JoinHandle<()>
where
    F: FnMut(f64, f64) + Send + 'static,
{
    tokio::spawn(async move {
        for (delta_x, delta_y) in deltas {
            emit(delta_x, delta_y);
            tokio::time::sleep(frame).await;
        }
        log::trace!("fling finished");
    })
}
