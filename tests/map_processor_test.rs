use std::time::Duration;

use trailmap::core::config::MapProcessorConfig;
use trailmap::input::gestures::Gesture;
use trailmap::prelude::*;

fn initial_state(meters_per_pixel: f64) -> MapState {
    MapState::new(
        Coordinate::new(0.0, 0.0, Crs::WebMercator),
        ZoomLevel::new(meters_per_pixel),
        MapSize::new(800, 600),
    )
}

fn fling(velocity_x: f64, velocity_y: f64) -> Event {
    Event::Gesture(Gesture::Fling {
        velocity_x: Some(velocity_x),
        velocity_y: Some(velocity_y),
    })
}

fn scroll(distance_x: f64, distance_y: f64) -> Event {
    Event::Gesture(Gesture::Scroll {
        distance_x,
        distance_y,
    })
}

fn scale(scale_factor: Option<f64>) -> Event {
    Event::Gesture(Gesture::Scale {
        focus: Point::new(400.0, 300.0),
        scale_factor,
    })
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_fling_moves_by_decaying_deltas() {
    let processor = MapProcessor::new(initial_state(1.0), MapProcessorConfig::default());

    processor.send(fling(30.0, 0.0));
    settle().await;

    // -2 - 1.6 - 1.28 - 1.024, the next step (-0.8192) is below the threshold
    let center = processor.state().center;
    assert!((center.x - -5.904).abs() < 1e-9, "x was {}", center.x);
    assert!(center.y.abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_new_gesture_cancels_fling() {
    let processor = MapProcessor::new(initial_state(1.0), MapProcessorConfig::default());

    processor.send(fling(30.0, 0.0));
    tokio::time::sleep(Duration::from_millis(20)).await;

    processor.send(scroll(0.0, 0.0));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let after_scroll = processor.state();

    settle().await;
    assert_eq!(processor.state(), after_scroll);
    assert!(after_scroll.center.x > -5.9);
    assert!(after_scroll.center.x < 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_fling_without_velocity_is_ignored() {
    let processor = MapProcessor::new(initial_state(1.0), MapProcessorConfig::default());

    processor.send(Event::Gesture(Gesture::Fling {
        velocity_x: Some(300.0),
        velocity_y: None,
    }));
    settle().await;

    assert_eq!(processor.state(), initial_state(1.0));
}

#[tokio::test(start_paused = true)]
async fn test_non_finite_fling_leaves_state_usable() {
    let processor = MapProcessor::new(initial_state(1.0), MapProcessorConfig::default());

    processor.send(fling(f64::NAN, 0.0));
    processor.send(fling(300.0, f64::INFINITY));
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(processor.state(), initial_state(1.0));

    processor.send(Event::move_by(10.0, 0.0));
    settle().await;
    assert!((processor.state().center.x - 10.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_scales_with_zoom() {
    let processor = MapProcessor::new(initial_state(2.0), MapProcessorConfig::default());

    processor.send(scroll(10.0, 10.0));
    settle().await;

    let center = processor.state().center;
    assert!((center.x - 20.0).abs() < 1e-9);
    assert!((center.y - -20.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_scale_uses_reciprocal_factor() {
    let processor = MapProcessor::new(initial_state(10.0), MapProcessorConfig::default());
    let mut updates = processor.subscribe();

    processor.send(scale(Some(2.0)));
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow().zoom.meters_per_pixel().value(), 5.0);

    processor.send(scale(Some(0.5)));
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow().zoom.meters_per_pixel().value(), 10.0);

    processor.send(scale(None));
    settle().await;
    assert_eq!(processor.state().zoom.meters_per_pixel().value(), 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_size_changed_and_unhandled_gestures() {
    let processor = MapProcessor::new(initial_state(1.0), MapProcessorConfig::default());

    processor.send(Event::Gesture(Gesture::SingleTapUp {
        position: Point::new(5.0, 5.0),
    }));
    processor.send(Event::SizeChanged(MapSize::new(1024, 768)));
    settle().await;

    let state = processor.state();
    assert_eq!(state.size, MapSize::new(1024, 768));
    assert_eq!(state.center, initial_state(1.0).center);
}

#[tokio::test(start_paused = true)]
async fn test_full_buffer_drops_oldest_event() {
    let config = MapProcessorConfig {
        event_buffer_size: 3,
        ..Default::default()
    };
    let processor = MapProcessor::new(initial_state(1.0), config);

    // The consumer cannot run before the test yields
    processor.send(Event::move_by(1.0, 0.0));
    processor.send(Event::move_by(10.0, 0.0));
    processor.send(Event::move_by(100.0, 0.0));
    processor.send(Event::move_by(1000.0, 0.0));
    assert_eq!(processor.pending_events(), 3);

    settle().await;
    assert!((processor.state().center.x - 1110.0).abs() < 1e-9);
    assert_eq!(processor.pending_events(), 0);
}
