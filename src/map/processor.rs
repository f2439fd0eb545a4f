//! The viewport state machine.
//!
//! Events are pushed into a bounded buffer that drops its oldest entry when
//! full. A single consumer task folds them, in order, into a new
//! [`MapState`] which is then published on a `watch` channel. Only that task
//! ever touches the state, so no locking is needed around it.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::background::queue::BoundedQueue;
use crate::core::config::{FlingConfig, MapProcessorConfig};
use crate::core::state::MapState;
use crate::input::events::Event;
use crate::input::gestures::Gesture;
use crate::map::fling::{spawn_fling, FlingDeltas};

/// What sits in the event buffer
#[derive(Debug, Clone, PartialEq)]
enum Queued {
    Event(Event),
    /// A synthetic move emitted by the fling started during `generation`
    FlingStep {
        generation: u64,
        delta_x: f64,
        delta_y: f64,
    },
}

pub struct MapProcessor {
    events: Arc<BoundedQueue<Queued>>,
    state: watch::Receiver<MapState>,
    consumer: JoinHandle<()>,
}

impl MapProcessor {
    /// Starts the consumer task. Must be called from within a Tokio runtime.
    pub fn new(initial_state: MapState, config: MapProcessorConfig) -> Self {
        let events = Arc::new(BoundedQueue::fifo(config.event_buffer_size));
        let (publisher, state) = watch::channel(initial_state);

        let folder = StateFolder {
            state: initial_state,
            gesture_generation: 0,
            flinger: None,
            events: Arc::clone(&events),
            fling: config.fling,
        };
        let consumer = tokio::spawn(folder.run(publisher));

        Self {
            events,
            state,
            consumer,
        }
    }

    /// Queues an event. Never waits: a full buffer drops its oldest event.
    pub fn send(&self, event: Event) {
        if let Some(dropped) = self.events.push(Queued::Event(event)) {
            log::debug!("map event buffer full, dropped {:?}", dropped);
        }
    }

    /// The latest published state
    pub fn state(&self) -> MapState {
        *self.state.borrow()
    }

    /// A receiver notified whenever the state changes
    pub fn subscribe(&self) -> watch::Receiver<MapState> {
        self.state.clone()
    }

    /// Events accepted but not yet folded into the state
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl Drop for MapProcessor {
    fn drop(&mut self) {
        self.consumer.abort();
    }
}

/// State owned by the consumer task
struct StateFolder {
    state: MapState,
    /// Bumped by every gesture; fling steps from older generations are stale
    gesture_generation: u64,
    flinger: Option<JoinHandle<()>>,
    events: Arc<BoundedQueue<Queued>>,
    fling: FlingConfig,
}

impl StateFolder {
    async fn run(mut self, publisher: watch::Sender<MapState>) {
        loop {
            let queued = self.events.pop().await;
            let next = self.apply(queued);
            if next != self.state {
                self.state = next;
                publisher.send_replace(next);
            }
        }
    }

    fn apply(&mut self, queued: Queued) -> MapState {
        match queued {
            Queued::Event(event) => self.compute_new_state(event),
            Queued::FlingStep {
                generation,
                delta_x,
                delta_y,
            } => {
                if generation != self.gesture_generation {
                    return self.state;
                }
                self.moved_by(delta_x, delta_y)
            }
        }
    }

    fn compute_new_state(&mut self, event: Event) -> MapState {
        match event {
            Event::Gesture(gesture) => self.compute_new_state_from_gesture(gesture),
            Event::MoveBy { delta_x, delta_y } => self.moved_by(delta_x, delta_y),
            Event::SizeChanged(size) => self.state.with_size(size),
        }
    }

    fn compute_new_state_from_gesture(&mut self, gesture: Gesture) -> MapState {
        self.cancel_fling();

        match gesture {
            Gesture::Scroll {
                distance_x,
                distance_y,
            } => self.moved_by(distance_x, distance_y),

            Gesture::Fling {
                velocity_x: Some(velocity_x),
                velocity_y: Some(velocity_y),
            } => {
                if velocity_x.is_finite() && velocity_y.is_finite() {
                    self.start_fling(velocity_x, velocity_y);
                } else {
                    log::debug!("ignoring fling velocity ({}, {})", velocity_x, velocity_y);
                }
                self.state
            }

            Gesture::Scale {
                scale_factor: Some(factor),
                ..
            } => {
                if factor > 0.0 && factor.is_finite() {
                    self.state.with_zoom(self.state.zoom.scaled_by(1.0 / factor))
                } else {
                    log::debug!("ignoring scale factor {}", factor);
                    self.state
                }
            }

            _ => self.state,
        }
    }

    fn moved_by(&self, delta_x: f64, delta_y: f64) -> MapState {
        let state = &self.state;
        state.with_center(state.center.moved_by(state.zoom, delta_x, delta_y))
    }

    fn cancel_fling(&mut self) {
        if let Some(flinger) = self.flinger.take() {
            log::trace!("cancelling fling because of new gesture");
            flinger.abort();
        }
        self.gesture_generation = self.gesture_generation.wrapping_add(1);
    }

    fn start_fling(&mut self, velocity_x: f64, velocity_y: f64) {
        let generation = self.gesture_generation;
        let events = Arc::clone(&self.events);
        let deltas = FlingDeltas::new(velocity_x, velocity_y, &self.fling);

        self.flinger = Some(spawn_fling(
            deltas,
            self.fling.frame_duration(),
            move |delta_x, delta_y| {
                events.push(Queued::FlingStep {
                    generation,
                    delta_x,
                    delta_y,
                });
            },
        ));
    }
}

impl Drop for StateFolder {
    fn drop(&mut self) {
        if let Some(flinger) = self.flinger.take() {
            flinger.abort();
        }
    }
}
