//! Side effects requested by the page session.
//!
//! The lifecycle machine and the session never touch the page themselves:
//! they return [`Effect`]s which the runtime applies to a
//! [`UiSurface`](crate::surface::UiSurface), the timer queue and the
//! analysis channel.

use std::fmt;
use std::time::Duration;

use crate::gateway::EtymologyRecord;
use crate::geometry::Point;
use crate::highlight::HighlightOp;
use crate::positioner::PopupPlacement;

/// Identifies one analysis request; later requests have larger ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Timers the session can have pending, at most one of each kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Grace period before an auto-hide icon disappears.
    HideIcon,
    /// Delayed teardown after a pointer-down outside the icon and popup.
    OutsideCleanup,
    /// Hides the popup after the pointer left a permanent icon.
    PopupConceal,
    /// Lets the page settle its selection after a pointer-up.
    SelectionSettle,
}

impl TimerKind {
    #[must_use]
    pub fn delay(self) -> Duration {
        match self {
            TimerKind::HideIcon => Duration::from_millis(300),
            TimerKind::OutsideCleanup => Duration::from_millis(100),
            TimerKind::PopupConceal => Duration::from_millis(500),
            TimerKind::SelectionSettle => Duration::from_millis(10),
        }
    }
}

/// What the popup body shows.
#[derive(Clone, Debug, PartialEq)]
pub enum PopupBody {
    Loading,
    Resolved(EtymologyRecord),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    CreateIcon { word: String, position: Point },
    MoveIcon { position: Point },
    RemoveIcon,

    ShowPopup {
        word: String,
        placement: PopupPlacement,
        body: PopupBody,
    },
    SetPopupContent { word: String, body: PopupBody },
    SetPopupOpacity(f64),
    ConcealPopup,
    RevealPopup,
    RemovePopup,

    /// Subscribe to pointer movement for distance opacity.
    StartTracking,
    StopTracking,

    RequestAnalysis { id: RequestId, word: String },

    ScheduleTimer(TimerKind),
    CancelTimer(TimerKind),

    Highlight(HighlightOp),

    /// Suppress the page's default action for the click being handled.
    PreventDefault,
}

impl From<HighlightOp> for Effect {
    fn from(op: HighlightOp) -> Self {
        Effect::Highlight(op)
    }
}
