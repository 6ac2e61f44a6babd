//! The single icon and popup on a page, their timers and teardown rules.
//!
//! [`UiState::apply`] takes one [`Command`] at a time and returns the
//! effects that bring the page in line with the new state. Creating a UI
//! element for a different word always removes the old one first, so at
//! most one icon and one popup exist.

use std::collections::HashSet;

use log::debug;

use crate::effect::{Effect, PopupBody, RequestId, TimerKind};
use crate::gateway::EtymologyRecord;
use crate::geometry::{Point, Rect, ScrollOffset};
use crate::positioner::{
    Anchor, DistanceTracker, PopupPlacement, icon_position, popup_placement,
};

/// Inputs to the lifecycle machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Pointer rests on an eligible word.
    WordHovered { anchor: Anchor, scroll: ScrollOffset },
    /// Pointer left eligible text.
    HoverLost,
    /// A valid explicit selection settled.
    WordSelected { anchor: Anchor, scroll: ScrollOffset },
    /// Primary click on a hover-confirmed word.
    WordClicked { anchor: Anchor, scroll: ScrollOffset },
    IconEntered,
    IconLeft,
    PopupEntered,
    PopupLeft,
    PointerMoved(Point),
    /// Pointer-down anywhere except the icon and popup.
    OutsidePointerDown,
    Scrolled,
    TimerFired(TimerKind),
    AnalysisFinished {
        id: RequestId,
        word: String,
        outcome: Result<EtymologyRecord, String>,
    },
}

/// Coarse state, mostly for assertions and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    IconOnly { auto_hide: bool },
    Loading,
    Resolved,
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Icon {
    pub word: String,
    pub anchor: Rect,
    /// Scroll offset when `anchor` was measured.
    pub scroll: ScrollOffset,
    pub position: Point,
    pub auto_hide: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PopupStatus {
    Loading,
    Resolved(EtymologyRecord),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub word: String,
    pub placement: PopupPlacement,
    pub request: RequestId,
    pub status: PopupStatus,
    pub concealed: bool,
}

#[derive(Debug, Default)]
pub struct UiState {
    icon: Option<Icon>,
    popup: Option<Popup>,
    tracker: Option<DistanceTracker>,
    pending: HashSet<TimerKind>,
    over_icon: bool,
    over_popup: bool,
    last_request: u64,
}

impl UiState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn icon(&self) -> Option<&Icon> {
        self.icon.as_ref()
    }

    #[must_use]
    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    #[must_use]
    pub fn is_pending(&self, timer: TimerKind) -> bool {
        self.pending.contains(&timer)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match (&self.icon, &self.popup) {
            (None, None) => Phase::Idle,
            (Some(icon), None) => Phase::IconOnly {
                auto_hide: icon.auto_hide,
            },
            (_, Some(popup)) => match popup.status {
                PopupStatus::Loading => Phase::Loading,
                PopupStatus::Resolved(_) => Phase::Resolved,
                PopupStatus::Failed(_) => Phase::Failed,
            },
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        let mut effects = Vec::new();
        match cmd {
            Command::WordHovered { anchor, scroll } => {
                self.on_hover(anchor, scroll, &mut effects);
            }

            Command::HoverLost => self.arm_hide_timer(&mut effects),

            Command::WordSelected { anchor, scroll } => {
                self.cancel(TimerKind::OutsideCleanup, &mut effects);
                self.show_icon(anchor, scroll, false, &mut effects);
            }

            Command::WordClicked { anchor, scroll } => {
                self.teardown(&mut effects);
                self.open_popup(anchor.text, anchor.rect, scroll, &mut effects);
                effects.push(Effect::PreventDefault);
            }

            Command::IconEntered => {
                self.over_icon = true;
                self.cancel(TimerKind::HideIcon, &mut effects);
                self.cancel(TimerKind::PopupConceal, &mut effects);
                self.on_icon_entered(&mut effects);
            }

            Command::IconLeft => {
                self.over_icon = false;
                match self.icon.as_ref().map(|icon| icon.auto_hide) {
                    Some(true) => self.arm_hide_timer(&mut effects),
                    Some(false) if self.popup.is_some() && !self.over_popup => {
                        self.schedule(TimerKind::PopupConceal, &mut effects);
                    }
                    _ => {}
                }
            }

            Command::PopupEntered => {
                self.over_popup = true;
                self.cancel(TimerKind::PopupConceal, &mut effects);
                if let Some(tracker) = &mut self.tracker {
                    effects.extend(tracker.hold_opaque().map(Effect::SetPopupOpacity));
                }
            }

            Command::PopupLeft => self.over_popup = false,

            Command::PointerMoved(point) => {
                let over_popup = self.over_popup;
                if let Some(tracker) = &mut self.tracker {
                    effects.extend(
                        tracker
                            .update(point, over_popup)
                            .map(Effect::SetPopupOpacity),
                    );
                }
            }

            Command::OutsidePointerDown => {
                if self.icon.is_some() || self.popup.is_some() {
                    self.schedule(TimerKind::OutsideCleanup, &mut effects);
                }
            }

            Command::Scrolled => self.teardown(&mut effects),

            Command::TimerFired(timer) => self.on_timer(timer, &mut effects),

            Command::AnalysisFinished { id, word, outcome } => {
                self.on_analysis(id, word, outcome, &mut effects);
            }
        }
        effects
    }

    fn on_hover(&mut self, anchor: Anchor, scroll: ScrollOffset, effects: &mut Vec<Effect>) {
        if self.popup.is_some() {
            return;
        }
        self.show_icon(anchor, scroll, true, effects);
    }

    /// Creates, repositions or replaces the icon for `anchor`.
    ///
    /// A permanent icon stays permanent when the same word asks for an
    /// auto-hide one.
    fn show_icon(
        &mut self,
        anchor: Anchor,
        scroll: ScrollOffset,
        auto_hide: bool,
        effects: &mut Vec<Effect>,
    ) {
        let position = icon_position(&anchor.rect, scroll);

        if let Some(icon) = &mut self.icon {
            if icon.word == anchor.text {
                icon.auto_hide = icon.auto_hide && auto_hide;
                icon.anchor = anchor.rect;
                icon.scroll = scroll;
                if icon.position != position {
                    icon.position = position;
                    effects.push(Effect::MoveIcon { position });
                }
                self.cancel(TimerKind::HideIcon, effects);
                return;
            }
        }

        self.teardown(effects);
        effects.push(Effect::CreateIcon {
            word: anchor.text.clone(),
            position,
        });
        self.icon = Some(Icon {
            word: anchor.text,
            anchor: anchor.rect,
            scroll,
            position,
            auto_hide,
        });
    }

    fn on_icon_entered(&mut self, effects: &mut Vec<Effect>) {
        let Some(icon) = &self.icon else {
            return;
        };

        if let Some(popup) = &mut self.popup {
            if popup.word == icon.word && !matches!(popup.status, PopupStatus::Failed(_)) {
                if popup.concealed {
                    popup.concealed = false;
                    effects.push(Effect::RevealPopup);
                }
                return;
            }
        }

        let (word, anchor, scroll) = (icon.word.clone(), icon.anchor, icon.scroll);
        self.close_popup(effects);
        self.open_popup(word, anchor, scroll, effects);
    }

    /// Shows a loading popup and requests its content.
    fn open_popup(
        &mut self,
        word: String,
        anchor: Rect,
        scroll: ScrollOffset,
        effects: &mut Vec<Effect>,
    ) {
        let placement = popup_placement(&anchor, scroll);
        self.last_request += 1;
        let id = RequestId(self.last_request);

        effects.push(Effect::ShowPopup {
            word: word.clone(),
            placement,
            body: PopupBody::Loading,
        });
        effects.push(Effect::StartTracking);
        effects.push(Effect::RequestAnalysis {
            id,
            word: word.clone(),
        });

        self.tracker = Some(DistanceTracker::new(anchor));
        self.popup = Some(Popup {
            word,
            placement,
            request: id,
            status: PopupStatus::Loading,
            concealed: false,
        });
    }

    fn on_analysis(
        &mut self,
        id: RequestId,
        word: String,
        outcome: Result<EtymologyRecord, String>,
        effects: &mut Vec<Effect>,
    ) {
        let Some(popup) = &mut self.popup else {
            debug!("Dropping analysis {id} for '{word}': popup is gone");
            return;
        };
        if popup.request != id {
            debug!(
                "Dropping stale analysis {id} for '{word}', popup waits for {}",
                popup.request
            );
            return;
        }

        let (status, body) = match outcome {
            Ok(record) => (
                PopupStatus::Resolved(record.clone()),
                PopupBody::Resolved(record),
            ),
            Err(message) => (
                PopupStatus::Failed(message.clone()),
                PopupBody::Failed(message),
            ),
        };
        popup.status = status;
        effects.push(Effect::SetPopupContent {
            word: popup.word.clone(),
            body,
        });
    }

    fn on_timer(&mut self, timer: TimerKind, effects: &mut Vec<Effect>) {
        if !self.pending.remove(&timer) {
            debug!("Ignoring {timer:?} timer that is no longer pending");
            return;
        }
        match timer {
            TimerKind::HideIcon => {
                let auto_hide = self.icon.as_ref().is_some_and(|icon| icon.auto_hide);
                if auto_hide && self.popup.is_none() && !self.over_icon && !self.over_popup {
                    self.teardown(effects);
                }
            }
            TimerKind::OutsideCleanup => self.teardown(effects),
            TimerKind::PopupConceal => {
                if let Some(popup) = &mut self.popup {
                    if !self.over_popup && !self.over_icon && !popup.concealed {
                        popup.concealed = true;
                        effects.push(Effect::ConcealPopup);
                    }
                }
            }
            TimerKind::SelectionSettle => {}
        }
    }

    /// The hide timer only governs a bare auto-hide icon, and a pending one
    /// is never pushed back.
    fn arm_hide_timer(&mut self, effects: &mut Vec<Effect>) {
        let auto_hide = self.icon.as_ref().is_some_and(|icon| icon.auto_hide);
        if auto_hide && self.popup.is_none() && !self.over_icon {
            self.schedule(TimerKind::HideIcon, effects);
        }
    }

    fn schedule(&mut self, timer: TimerKind, effects: &mut Vec<Effect>) {
        if self.pending.insert(timer) {
            effects.push(Effect::ScheduleTimer(timer));
        }
    }

    fn cancel(&mut self, timer: TimerKind, effects: &mut Vec<Effect>) {
        if self.pending.remove(&timer) {
            effects.push(Effect::CancelTimer(timer));
        }
    }

    fn close_popup(&mut self, effects: &mut Vec<Effect>) {
        if self.popup.take().is_some() {
            effects.push(Effect::RemovePopup);
        }
        if self.tracker.take().is_some() {
            effects.push(Effect::StopTracking);
        }
        self.over_popup = false;
        self.cancel(TimerKind::PopupConceal, effects);
    }

    /// Back to idle: removes the icon and popup and cancels their timers.
    fn teardown(&mut self, effects: &mut Vec<Effect>) {
        if self.icon.take().is_some() {
            effects.push(Effect::RemoveIcon);
        }
        self.close_popup(effects);
        self.over_icon = false;
        self.cancel(TimerKind::HideIcon, effects);
        self.cancel(TimerKind::OutsideCleanup, effects);
    }
}
