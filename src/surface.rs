//! The page-side adapter the runtime drives.
//!
//! A browser binding implements [`UiSurface`] by creating and removing the
//! icon and popup elements and by updating the highlight registry. Nothing
//! else in the crate mutates the page.

use crate::dom::TextRange;
use crate::geometry::Point;
use crate::highlight::Layer;
use crate::positioner::PopupPlacement;

pub trait UiSurface {
    /// Attaches the icon at a page position.
    fn create_icon(&mut self, word: &str, position: Point);

    fn move_icon(&mut self, position: Point);

    fn remove_icon(&mut self);

    /// Attaches the popup with its initial inner HTML.
    fn show_popup(&mut self, word: &str, placement: PopupPlacement, html: &str);

    fn set_popup_html(&mut self, html: &str);

    fn set_popup_opacity(&mut self, opacity: f64);

    /// Hides or re-shows the popup without detaching it.
    fn set_popup_visible(&mut self, visible: bool);

    fn remove_popup(&mut self);

    /// Subscribes to (or unsubscribes from) page-wide pointer movement.
    fn track_pointer(&mut self, enabled: bool);

    fn set_highlight(&mut self, layer: Layer, ranges: &[TextRange]);

    fn delete_highlight(&mut self, layer: Layer);

    /// Cancels the default action of the event being dispatched.
    fn prevent_default(&mut self);

    fn has_icon(&self) -> bool;

    fn has_popup(&self) -> bool;
}
