pub mod events;
pub mod gestures;

// Re-export the essential types
pub use events::{Event, TouchEvent, TouchEventType, TouchPoint};
pub use gestures::{Gesture, GestureConfig, GestureDetector};
