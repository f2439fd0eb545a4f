use crate::core::geo::Point;
use crate::core::state::MapSize;
use crate::input::gestures::Gesture;
use serde::{Deserialize, Serialize};

/// Inputs folded into the map state by the processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A gesture reported by the input layer
    Gesture(Gesture),
    /// Pan the center by a pixel delta
    MoveBy { delta_x: f64, delta_y: f64 },
    /// The viewport was resized
    SizeChanged(MapSize),
}

impl Event {
    pub fn move_by(delta_x: f64, delta_y: f64) -> Self {
        Event::MoveBy { delta_x, delta_y }
    }

    /// Checks if this event came from the user's gesture stream
    pub fn is_gesture(&self) -> bool {
        matches!(self, Event::Gesture(_))
    }
}

impl From<Gesture> for Event {
    fn from(gesture: Gesture) -> Self {
        Event::Gesture(gesture)
    }
}

/// Types of touch events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchEventType {
    Start,
    Move,
    End,
    Cancel,
}

/// Individual touch point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub id: u64,
    pub position: Point,
}

impl TouchPoint {
    pub fn new(id: u64, x: f64, y: f64) -> Self {
        Self {
            id,
            position: Point::new(x, y),
        }
    }
}

/// Raw pointer input handed to the gesture detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub event_type: TouchEventType,
    pub touches: Vec<TouchPoint>,
}

impl TouchEvent {
    pub fn new(event_type: TouchEventType, touches: Vec<TouchPoint>) -> Self {
        Self {
            event_type,
            touches,
        }
    }
}
