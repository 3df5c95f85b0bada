//! Geometry properties of grid placement, coordinate flips and screen lookup

use gridsnap::macos::ScreenInfo;
use gridsnap::services::coordinate_converter::{from_accessibility_space, to_accessibility_space};
use gridsnap::services::grid_calculator::calculate_frame;
use gridsnap::services::screen_locator::{screen_for_window, screen_index_for_rect};
use gridsnap::{GridPosition, Rect};

const TOLERANCE: f64 = 1e-6;

fn screens() -> Vec<Rect> {
    vec![
        Rect::from_xywh(0.0, 0.0, 1440.0, 900.0),
        Rect::from_xywh(0.0, 0.0, 1920.0, 1080.0),
        Rect::from_xywh(-1280.0, 120.0, 1280.0, 1024.0),
        Rect::from_xywh(2560.0, -400.0, 1080.0, 1920.0),
        Rect::from_xywh(13.0, 7.0, 333.0, 211.0),
    ]
}

#[test]
fn every_position_stays_inside_the_screen() {
    for screen in screens() {
        for position in GridPosition::ALL {
            let frame = calculate_frame(position, screen);
            assert!(
                screen.contains_rect(&frame, TOLERANCE),
                "{position} overflows {screen:?}: {frame:?}"
            );
            assert!(frame.size.width > 0.0 && frame.size.height > 0.0, "{position} is empty");
        }
    }
}

#[test]
fn halves_and_thirds_partition_the_width() {
    for screen in screens() {
        let thirds: f64 = [
            GridPosition::LeftThird,
            GridPosition::CenterThird,
            GridPosition::RightThird,
        ]
        .into_iter()
        .map(|position| calculate_frame(position, screen).size.width)
        .sum();
        assert!((thirds - screen.size.width).abs() < TOLERANCE);

        let left = calculate_frame(GridPosition::LeftHalf, screen);
        let right = calculate_frame(GridPosition::RightHalf, screen);
        assert!((left.size.width + right.size.width - screen.size.width).abs() < TOLERANCE);
        assert!((left.max_x() - right.min_x()).abs() < TOLERANCE);

        let center = calculate_frame(GridPosition::CenterThird, screen);
        assert!((calculate_frame(GridPosition::LeftThird, screen).max_x() - center.min_x()).abs() < TOLERANCE);
        assert!((center.max_x() - calculate_frame(GridPosition::RightThird, screen).min_x()).abs() < TOLERANCE);
    }
}

#[test]
fn accessibility_flip_round_trips() {
    let primary = Rect::from_xywh(0.0, 0.0, 1440.0, 900.0);
    let windows = [
        Rect::from_xywh(0.0, 0.0, 720.0, 900.0),
        Rect::from_xywh(100.5, 37.25, 640.0, 480.0),
        Rect::from_xywh(-1200.0, 950.0, 800.0, 300.0),
        Rect::from_xywh(1500.0, -300.0, 1000.0, 2000.0),
    ];

    for window in windows {
        let flipped = to_accessibility_space(window, primary);
        let back = from_accessibility_space(flipped, primary);
        assert!(back.approx_eq(&window, TOLERANCE), "{window:?} -> {back:?}");
    }
}

#[test]
fn window_inside_second_screen_is_placed_there() {
    let frames = [
        Rect::from_xywh(0.0, 0.0, 1000.0, 1000.0),
        Rect::from_xywh(1000.0, 0.0, 1000.0, 1000.0),
    ];

    let inside = Rect::from_xywh(1200.0, 100.0, 400.0, 400.0);
    assert_eq!(screen_index_for_rect(inside, &frames, 0), Some(1));

    // 70% of the area sits on the first screen, center included
    let straddling = Rect::from_xywh(650.0, 100.0, 500.0, 400.0);
    assert_eq!(screen_index_for_rect(straddling, &frames, 1), Some(0));
}

#[test]
fn off_screen_window_falls_back_to_primary() {
    let displays = vec![
        ScreenInfo::new("side", Rect::from_xywh(-1000.0, 0.0, 1000.0, 800.0)),
        ScreenInfo::primary("main", Rect::from_xywh(0.0, 0.0, 1440.0, 900.0)),
    ];

    let lost = Rect::from_xywh(5000.0, 5000.0, 300.0, 300.0);
    let screen = screen_for_window(lost, &displays).unwrap();
    assert_eq!(screen.id, "main");

    assert!(screen_for_window(lost, &[]).is_none());
}
