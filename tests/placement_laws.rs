use etymon::geometry::{Point, Rect, ScrollOffset};
use etymon::positioner::{
    DistanceTracker, Side, icon_position, opacity_for_distance, popup_opacity, popup_placement,
};

#[test]
fn test_popup_flips_above_at_250px() {
    let scroll = ScrollOffset::new(0.0, 1000.0);

    let below = popup_placement(&Rect::from_origin_size(10.0, 249.0, 40.0, 20.0), scroll);
    assert_eq!(below.side, Side::Below);
    assert_eq!(below.top, 249.0 + 20.0 + 1000.0 + 10.0);
    assert_eq!(below.transform(), None);

    let above = popup_placement(&Rect::from_origin_size(10.0, 250.0, 40.0, 20.0), scroll);
    assert_eq!(above.side, Side::Above);
    assert_eq!(above.top, 250.0 + 1000.0 - 5.0);
    assert_eq!(above.transform(), Some("translateY(-100%)"));
}

#[test]
fn test_icon_follows_scroll() {
    let rect = Rect::from_origin_size(10.0, 40.0, 40.0, 20.0);
    assert_eq!(
        icon_position(&rect, ScrollOffset::new(3.0, 100.0)),
        Point::new(13.0, 165.0)
    );
}

#[test]
fn test_opacity_falls_off_linearly() {
    assert_eq!(opacity_for_distance(0.0), 1.0);
    assert_eq!(opacity_for_distance(125.0), 0.75);
    assert_eq!(opacity_for_distance(500.0), 0.0);
    assert_eq!(opacity_for_distance(800.0), 0.0);

    let anchor = Rect::from_origin_size(100.0, 100.0, 50.0, 20.0);
    // Over the popup the distance does not matter.
    assert_eq!(popup_opacity(&anchor, Point::new(1000.0, 1000.0), true), 1.0);
    assert_eq!(popup_opacity(&anchor, Point::new(120.0, 110.0), false), 1.0);
}

#[test]
fn test_tracker_reports_changes_only() {
    let mut tracker = DistanceTracker::new(Rect::from_origin_size(0.0, 0.0, 10.0, 10.0));
    assert_eq!(tracker.update(Point::new(5.0, 5.0), false), Some(1.0));
    assert_eq!(tracker.update(Point::new(6.0, 6.0), false), None);
    assert_eq!(tracker.update(Point::new(260.0, 10.0), false), Some(0.5));
    assert_eq!(tracker.hold_opaque(), Some(1.0));
}
