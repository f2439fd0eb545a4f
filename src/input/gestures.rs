use crate::{
    core::geo::Point,
    input::events::{TouchEvent, TouchEventType, TouchPoint},
    prelude::HashMap,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Gestures understood by the map processor.
///
/// `Scroll` distances follow the platform convention of previous position
/// minus current position, so dragging the finger to the right yields a
/// negative `distance_x`. Fling velocities point in the direction the finger
/// travelled, in pixels per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Gesture {
    Down { position: Point },
    SingleTapUp { position: Point },
    LongPress { position: Point },
    Scroll { distance_x: f64, distance_y: f64 },
    Fling {
        velocity_x: Option<f64>,
        velocity_y: Option<f64>,
    },
    ScaleBegin { focus: Point },
    /// `scale_factor` is the ratio of the current finger span to the previous
    /// one: above 1 means the fingers moved apart
    Scale {
        focus: Point,
        scale_factor: Option<f64>,
    },
    ScaleEnd,
}

/// Configuration for gesture recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Minimum distance for a scroll to start
    pub drag_threshold: f64,
    /// Maximum time for tap gesture
    pub tap_timeout: Duration,
    /// Minimum time for long press
    pub long_press_timeout: Duration,
    /// Minimum release velocity, in pixels per second, for a fling
    pub min_fling_velocity: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            drag_threshold: 10.0,
            tap_timeout: Duration::from_millis(200),
            long_press_timeout: Duration::from_millis(500),
            min_fling_velocity: 50.0,
        }
    }
}

/// Touch tracking information
#[derive(Debug, Clone)]
struct TouchInfo {
    start_position: Point,
    current_position: Point,
    start_time: Instant,
    last_update: Instant,
    velocity: Point,
}

impl TouchInfo {
    fn new(position: Point, now: Instant) -> Self {
        Self {
            start_position: position,
            current_position: position,
            start_time: now,
            last_update: now,
            velocity: Point::default(),
        }
    }
}

/// Turns raw touch samples into [`Gesture`]s
pub struct GestureDetector {
    pub enabled: bool,
    config: GestureConfig,
    active_touches: HashMap<u64, TouchInfo>,
    scrolling: bool,
    scaling: bool,
    /// Finger span at the previous two-finger sample
    last_span: Option<f64>,
}

impl GestureDetector {
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    pub fn with_config(config: GestureConfig) -> Self {
        Self {
            enabled: true,
            config,
            active_touches: HashMap::default(),
            scrolling: false,
            scaling: false,
            last_span: None,
        }
    }

    /// Processes a touch event sampled now
    pub fn process(&mut self, event: TouchEvent) -> Vec<Gesture> {
        self.process_at(event, Instant::now())
    }

    /// Processes a touch event sampled at `now`
    pub fn process_at(&mut self, event: TouchEvent, now: Instant) -> Vec<Gesture> {
        let mut gestures = Vec::new();
        if !self.enabled {
            return gestures;
        }

        match event.event_type {
            TouchEventType::Start => self.touch_start(event.touches, now, &mut gestures),
            TouchEventType::Move => self.touch_move(event.touches, now, &mut gestures),
            TouchEventType::End => self.touch_end(event.touches, now, false, &mut gestures),
            TouchEventType::Cancel => self.touch_end(event.touches, now, true, &mut gestures),
        }

        gestures
    }

    fn touch_start(&mut self, touches: Vec<TouchPoint>, now: Instant, gestures: &mut Vec<Gesture>) {
        let was_empty = self.active_touches.is_empty();
        for touch in touches {
            self.active_touches
                .insert(touch.id, TouchInfo::new(touch.position, now));
        }

        if was_empty {
            if let Some(touch) = self.active_touches.values().next() {
                gestures.push(Gesture::Down {
                    position: touch.start_position,
                });
            }
        }

        if self.active_touches.len() == 2 && !self.scaling {
            if let Some((span, focus)) = self.span_and_focus() {
                self.scaling = true;
                self.last_span = Some(span);
                gestures.push(Gesture::ScaleBegin { focus });
            }
        }
    }

    fn touch_move(&mut self, touches: Vec<TouchPoint>, now: Instant, gestures: &mut Vec<Gesture>) {
        let mut moved = Point::default();
        for touch in touches {
            if let Some(info) = self.active_touches.get_mut(&touch.id) {
                let elapsed = now.duration_since(info.last_update).as_secs_f64();
                let delta = touch.position.subtract(&info.current_position);
                if elapsed > 0.0 {
                    info.velocity = delta.multiply(1.0 / elapsed);
                }
                info.current_position = touch.position;
                info.last_update = now;
                moved = delta;
            }
        }

        match self.active_touches.len() {
            1 => self.single_touch_move(moved, gestures),
            2 => self.two_finger_move(gestures),
            _ => {} // Ignore 3+ finger gestures
        }
    }

    fn single_touch_move(&mut self, moved: Point, gestures: &mut Vec<Gesture>) {
        let Some(touch) = self.active_touches.values().next() else {
            return;
        };

        if !self.scrolling {
            let distance = touch.current_position.distance_to(&touch.start_position);
            if distance <= self.config.drag_threshold {
                return;
            }
            self.scrolling = true;
            // The first scroll covers everything since the finger went down
            let total = touch.current_position.subtract(&touch.start_position);
            gestures.push(Gesture::Scroll {
                distance_x: -total.x,
                distance_y: -total.y,
            });
            return;
        }

        gestures.push(Gesture::Scroll {
            distance_x: -moved.x,
            distance_y: -moved.y,
        });
    }

    fn two_finger_move(&mut self, gestures: &mut Vec<Gesture>) {
        let Some((span, focus)) = self.span_and_focus() else {
            return;
        };

        if let Some(previous) = self.last_span {
            if previous > 0.0 && span > 0.0 {
                gestures.push(Gesture::Scale {
                    focus,
                    scale_factor: Some(span / previous),
                });
            }
        }
        self.last_span = Some(span);
    }

    fn touch_end(
        &mut self,
        touches: Vec<TouchPoint>,
        now: Instant,
        cancelled: bool,
        gestures: &mut Vec<Gesture>,
    ) {
        let before = self.active_touches.len();
        let mut released = Vec::new();
        for touch in touches {
            if let Some(info) = self.active_touches.remove(&touch.id) {
                released.push(info);
            }
        }

        if self.scaling && self.active_touches.len() < 2 {
            self.scaling = false;
            self.last_span = None;
            gestures.push(Gesture::ScaleEnd);
            // The remaining finger scrolls from where it is now, not from
            // where it went down
            for info in self.active_touches.values_mut() {
                info.start_position = info.current_position;
                info.velocity = Point::default();
            }
            self.scrolling = !self.active_touches.is_empty();
            return;
        }

        if before == 1 && self.active_touches.is_empty() && !cancelled {
            if let Some(info) = released.first() {
                self.single_touch_end(info, now, gestures);
            }
        }

        if self.active_touches.is_empty() {
            self.scrolling = false;
        }
    }

    fn single_touch_end(&self, info: &TouchInfo, now: Instant, gestures: &mut Vec<Gesture>) {
        if self.scrolling {
            let speed = info.velocity.distance_to(&Point::default());
            if speed >= self.config.min_fling_velocity {
                gestures.push(Gesture::Fling {
                    velocity_x: Some(info.velocity.x),
                    velocity_y: Some(info.velocity.y),
                });
            }
            return;
        }

        let duration = now.duration_since(info.start_time);
        if duration <= self.config.tap_timeout {
            gestures.push(Gesture::SingleTapUp {
                position: info.current_position,
            });
        } else if duration >= self.config.long_press_timeout {
            gestures.push(Gesture::LongPress {
                position: info.current_position,
            });
        }
    }

    fn span_and_focus(&self) -> Option<(f64, Point)> {
        let mut touches = self.active_touches.values();
        let first = touches.next()?;
        let second = touches.next()?;
        Some((
            first.current_position.distance_to(&second.current_position),
            first.current_position.midpoint(&second.current_position),
        ))
    }

    /// Sets the gesture configuration
    pub fn set_config(&mut self, config: GestureConfig) {
        self.config = config;
    }

    /// Resets all gesture state
    pub fn reset(&mut self) {
        self.active_touches.clear();
        self.scrolling = false;
        self.scaling = false;
        self.last_span = None;
    }
}

impl Default for GestureDetector {
    fn default() -> Self {
        Self::new()
    }
}
