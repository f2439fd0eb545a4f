//! Viewport state machine and its fling animation

pub mod fling;
pub mod processor;

pub use fling::FlingDeltas;
pub use processor::MapProcessor;
