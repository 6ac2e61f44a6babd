//! Icon and popup placement around an anchor, and distance-driven opacity.

use crate::geometry::{Point, Rect, ScrollOffset};

/// Gap between the anchor's bottom edge and the icon.
pub const ICON_OFFSET_Y: f64 = 5.0;
/// Gap between the anchor's bottom edge and a popup placed below it.
pub const POPUP_GAP_BELOW: f64 = 10.0;
/// Gap between the anchor's top edge and a popup placed above it.
pub const POPUP_GAP_ABOVE: f64 = 5.0;
/// Height assumed for the popup when choosing a side.
pub const POPUP_HEIGHT: f64 = 250.0;
/// Pointer distance at which the popup becomes fully transparent.
pub const MAX_FADE_DISTANCE: f64 = 500.0;

/// The rectangle and text currently under interaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Anchor {
    /// Viewport coordinates at the time the anchor was taken.
    pub rect: Rect,
    pub text: String,
}

impl Anchor {
    #[must_use]
    pub fn new(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            rect,
            text: text.into(),
        }
    }
}

/// Which side of the anchor the popup grows from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Top-left corner at `top`, growing downward.
    Below,
    /// Bottom-left corner at `top`; the popup is shifted up by its own height.
    Above,
}

/// Absolute page position of a popup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PopupPlacement {
    pub left: f64,
    pub top: f64,
    pub side: Side,
}

impl PopupPlacement {
    /// `transform` the popup needs for its side.
    #[must_use]
    pub fn transform(&self) -> Option<&'static str> {
        match self.side {
            Side::Below => None,
            Side::Above => Some("translateY(-100%)"),
        }
    }
}

/// Page position of the icon: just under the anchor's bottom-left corner.
#[must_use]
pub fn icon_position(anchor: &Rect, scroll: ScrollOffset) -> Point {
    Point::new(
        anchor.left + scroll.x,
        anchor.bottom + scroll.y + ICON_OFFSET_Y,
    )
}

/// Page position of the popup.
///
/// Below the anchor when fewer than [`POPUP_HEIGHT`] pixels of viewport sit
/// above it, above otherwise. Exactly [`POPUP_HEIGHT`] goes above.
#[must_use]
pub fn popup_placement(anchor: &Rect, scroll: ScrollOffset) -> PopupPlacement {
    let left = anchor.left + scroll.x;
    if anchor.top < POPUP_HEIGHT {
        PopupPlacement {
            left,
            top: anchor.bottom + scroll.y + POPUP_GAP_BELOW,
            side: Side::Below,
        }
    } else {
        PopupPlacement {
            left,
            top: anchor.top + scroll.y - POPUP_GAP_ABOVE,
            side: Side::Above,
        }
    }
}

/// Popup opacity for a pointer `distance` pixels away from the anchor.
#[must_use]
pub fn opacity_for_distance(distance: f64) -> f64 {
    (1.0 - distance / MAX_FADE_DISTANCE).clamp(0.0, 1.0)
}

/// Popup opacity for a pointer position; always 1 over the popup itself.
#[must_use]
pub fn popup_opacity(anchor: &Rect, pointer: Point, over_popup: bool) -> f64 {
    if over_popup {
        return 1.0;
    }
    opacity_for_distance(anchor.distance_to(pointer))
}

/// Follows the pointer while a popup is open and reports opacity changes.
#[derive(Clone, Debug)]
pub struct DistanceTracker {
    anchor: Rect,
    last: Option<f64>,
}

impl DistanceTracker {
    #[must_use]
    pub fn new(anchor: Rect) -> Self {
        Self { anchor, last: None }
    }

    #[must_use]
    pub fn anchor(&self) -> &Rect {
        &self.anchor
    }

    /// New opacity, or `None` when it did not change since the last sample.
    pub fn update(&mut self, pointer: Point, over_popup: bool) -> Option<f64> {
        self.record(popup_opacity(&self.anchor, pointer, over_popup))
    }

    /// Opacity for a pointer resting on the popup.
    pub fn hold_opaque(&mut self) -> Option<f64> {
        self.record(1.0)
    }

    fn record(&mut self, opacity: f64) -> Option<f64> {
        if self.last.is_some_and(|last| (last - opacity).abs() < 1e-3) {
            return None;
        }
        self.last = Some(opacity);
        Some(opacity)
    }
}
