//! One page's interaction session.
//!
//! [`PageSession`] turns raw page events into locator, classifier and
//! highlight work, then into lifecycle commands. It owns no page handles;
//! everything it wants done comes back as [`Effect`]s.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::dom::{PageDom, TextRange};
use crate::effect::{Effect, RequestId, TimerKind};
use crate::gateway::AnalysisReply;
use crate::geometry::{Point, ScrollOffset};
use crate::highlight::{HighlightPlan, Highlighter, infer_style_mode};
use crate::interactivity::{interactive_ancestor, is_hover_eligible};
use crate::lifecycle::{Command, UiState};
use crate::locator::{WordHit, neighbor_words, sentence_at, validate_selection, word_at_point};
use crate::positioner::Anchor;
use crate::settings::Settings;

/// Words looked up on each side of the hovered word.
const NEIGHBOR_DEPTH: usize = 2;

/// Primary mouse button as reported by `MouseEvent.button`.
pub const PRIMARY_BUTTON: u16 = 0;

/// What the pointer is over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Icon,
    Popup,
    #[default]
    Page,
}

/// Input events of a page session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    PointerMove {
        point: Point,
        /// Bitmask of pressed buttons; non-zero while dragging.
        #[serde(default)]
        buttons: u16,
        #[serde(default)]
        target: Target,
    },
    AnimationFrame,
    PointerDown {
        point: Point,
        #[serde(default)]
        target: Target,
    },
    PointerUp {
        #[serde(default)]
        target: Target,
    },
    Click {
        point: Point,
        #[serde(default)]
        button: u16,
        #[serde(default)]
        target: Target,
    },
    Scroll {
        offset: ScrollOffset,
    },
    PointerLeftPage,
    IconEnter,
    IconLeave,
    PopupEnter,
    PopupLeave,
    ConfigChanged {
        allow_interactive_hover: bool,
    },
}

/// Behaviour switches the session reads on every hover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    pub allow_interactive_hover: bool,
    pub neighbor_highlight: bool,
    pub sentence_highlight: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SessionOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            allow_interactive_hover: settings.allow_interactive_hover,
            neighbor_highlight: settings.neighbor_highlight,
            sentence_highlight: settings.sentence_highlight,
        }
    }
}

/// Keeps only the latest pointer sample until the next animation frame.
#[derive(Debug, Default)]
pub struct FrameThrottle {
    latest: Option<Point>,
}

impl FrameThrottle {
    pub fn push(&mut self, point: Point) {
        self.latest = Some(point);
    }

    pub fn take(&mut self) -> Option<Point> {
        self.latest.take()
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }
}

/// The word the pointer currently rests on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoveredWord {
    pub range: TextRange,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct PageSession {
    ui: UiState,
    highlighter: Highlighter,
    throttle: FrameThrottle,
    hovered: Option<HoveredWord>,
    options: SessionOptions,
}

impl PageSession {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    #[must_use]
    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    #[must_use]
    pub fn hovered(&self) -> Option<&HoveredWord> {
        self.hovered.as_ref()
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn handle<D: PageDom + ?Sized>(&mut self, event: PageEvent, dom: &D) -> Vec<Effect> {
        match event {
            PageEvent::PointerMove {
                point,
                buttons,
                target,
            } => {
                let mut effects = self.ui.apply(Command::PointerMoved(point));
                if target == Target::Page && buttons == 0 {
                    self.throttle.push(point);
                } else {
                    // Dragging or moving over the icon or popup ends the hover.
                    self.throttle.clear();
                    effects.extend(self.abandon_hover());
                }
                effects
            }

            PageEvent::AnimationFrame => match self.throttle.take() {
                Some(point) => self.hover_at(point, dom),
                None => Vec::new(),
            },

            PageEvent::PointerDown { target, .. } => {
                if target == Target::Page {
                    self.ui.apply(Command::OutsidePointerDown)
                } else {
                    Vec::new()
                }
            }

            PageEvent::PointerUp { target } => {
                if target == Target::Page {
                    vec![Effect::ScheduleTimer(TimerKind::SelectionSettle)]
                } else {
                    Vec::new()
                }
            }

            PageEvent::Click {
                point,
                button,
                target,
            } => {
                if target != Target::Page || button != PRIMARY_BUTTON {
                    return Vec::new();
                }
                self.click_at(point, dom)
            }

            PageEvent::Scroll { offset } => {
                debug!("Scrolled to {offset:?}, tearing down");
                self.throttle.clear();
                let mut effects = self.drop_hover();
                effects.extend(self.ui.apply(Command::Scrolled));
                effects
            }

            PageEvent::PointerLeftPage => {
                self.throttle.clear();
                let mut effects = self.drop_hover();
                effects.extend(self.ui.apply(Command::HoverLost));
                effects
            }

            PageEvent::IconEnter => {
                self.throttle.clear();
                let mut effects = self.drop_hover();
                effects.extend(self.ui.apply(Command::IconEntered));
                effects
            }

            PageEvent::IconLeave => self.ui.apply(Command::IconLeft),

            PageEvent::PopupEnter => {
                self.throttle.clear();
                let mut effects = self.drop_hover();
                effects.extend(self.ui.apply(Command::PopupEntered));
                effects
            }

            PageEvent::PopupLeave => self.ui.apply(Command::PopupLeft),

            PageEvent::ConfigChanged {
                allow_interactive_hover,
            } => {
                self.options.allow_interactive_hover = allow_interactive_hover;
                if allow_interactive_hover {
                    Vec::new()
                } else {
                    self.drop_hover()
                }
            }
        }
    }

    /// Handles a fired timer.
    pub fn on_timer<D: PageDom + ?Sized>(&mut self, timer: TimerKind, dom: &D) -> Vec<Effect> {
        match timer {
            TimerKind::SelectionSettle => self.check_selection(dom),
            _ => self.ui.apply(Command::TimerFired(timer)),
        }
    }

    /// Feeds a finished analysis back into the popup.
    pub fn on_analysis(&mut self, id: RequestId, word: String, reply: AnalysisReply) -> Vec<Effect> {
        self.ui.apply(Command::AnalysisFinished {
            id,
            word,
            outcome: reply.into_result(),
        })
    }

    fn hover_at<D: PageDom + ?Sized>(&mut self, point: Point, dom: &D) -> Vec<Effect> {
        let Some(hit) = word_under(dom, point) else {
            return self.lose_hover();
        };

        let interactive = interactive_ancestor(dom, hit.range.start.node);
        if !is_hover_eligible(interactive.as_ref(), self.options.allow_interactive_hover) {
            return self.abandon_hover();
        }

        let Some(rect) = dom.bounding_rect(&hit.range).filter(|r| !r.is_empty()) else {
            return self.lose_hover();
        };

        let plan = self.plan_highlight(dom, &hit.range);
        let mut effects: Vec<Effect> = self
            .highlighter
            .paint(plan)
            .into_iter()
            .map(Effect::from)
            .collect();

        self.hovered = Some(HoveredWord {
            range: hit.range,
            text: hit.text.clone(),
        });
        effects.extend(self.ui.apply(Command::WordHovered {
            anchor: Anchor::new(rect, hit.text),
            scroll: dom.scroll_offset(),
        }));
        effects
    }

    fn plan_highlight<D: PageDom + ?Sized>(&self, dom: &D, word: &TextRange) -> HighlightPlan {
        let (near, far) = if self.options.neighbor_highlight {
            let neighbors = neighbor_words(dom, word, NEIGHBOR_DEPTH);
            let tier = |n: usize| -> Vec<TextRange> {
                neighbors.ring(n).into_iter().map(|w| w.range).collect()
            };
            (tier(0), tier(1))
        } else {
            (Vec::new(), Vec::new())
        };

        let sentence = if self.options.sentence_highlight {
            sentence_at(dom, word.start)
        } else {
            None
        };

        HighlightPlan {
            mode: infer_style_mode(dom, word.start.node),
            word: *word,
            near,
            far,
            sentence,
        }
    }

    fn click_at<D: PageDom + ?Sized>(&mut self, point: Point, dom: &D) -> Vec<Effect> {
        let Some(hovered) = &self.hovered else {
            return Vec::new();
        };
        let Some(hit) = word_under(dom, point).filter(|hit| hit.range == hovered.range) else {
            return Vec::new();
        };
        let Some(rect) = dom.bounding_rect(&hit.range).filter(|r| !r.is_empty()) else {
            return Vec::new();
        };
        self.ui.apply(Command::WordClicked {
            anchor: Anchor::new(rect, hit.text),
            scroll: dom.scroll_offset(),
        })
    }

    fn check_selection<D: PageDom + ?Sized>(&mut self, dom: &D) -> Vec<Effect> {
        let Some(selection) = dom.selection().filter(|s| !s.range.is_collapsed()) else {
            return Vec::new();
        };
        let Some(text) = validate_selection(&selection.text) else {
            debug!("Ignoring selection {:?}", selection.text);
            return Vec::new();
        };
        let Some(rect) = dom.bounding_rect(&selection.range).filter(|r| !r.is_empty()) else {
            return Vec::new();
        };
        self.ui.apply(Command::WordSelected {
            anchor: Anchor::new(rect, text),
            scroll: dom.scroll_offset(),
        })
    }

    fn lose_hover(&mut self) -> Vec<Effect> {
        let mut effects = if self.highlighter.active_mode().is_some() {
            self.drop_hover()
        } else {
            self.hovered = None;
            Vec::new()
        };
        effects.extend(self.ui.apply(Command::HoverLost));
        effects
    }

    /// Like [`Self::drop_hover`], but silent when nothing is hovered or painted.
    fn abandon_hover(&mut self) -> Vec<Effect> {
        if self.hovered.is_none() && self.highlighter.active_mode().is_none() {
            return Vec::new();
        }
        self.drop_hover()
    }

    /// Forgets the hovered word and clears every highlight layer.
    fn drop_hover(&mut self) -> Vec<Effect> {
        self.hovered = None;
        self.highlighter
            .clear()
            .into_iter()
            .map(Effect::from)
            .collect()
    }
}

/// The word at `point`, only when the point lies inside one of its boxes.
fn word_under<D: PageDom + ?Sized>(dom: &D, point: Point) -> Option<WordHit> {
    word_at_point(dom, point).filter(|hit| {
        dom.client_rects(&hit.range)
            .iter()
            .any(|rect| rect.contains(point))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};
    use crate::effect::PopupBody;
    use crate::highlight::HighlightOp;
    use crate::lifecycle::Phase;

    /// "Words run fast. Then stop." followed by a link.
    fn page() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let text = doc.append_text(p, "Words run fast. Then stop.");
        let nav = doc.append_element(body, "p", &[]);
        let a = doc.append_element(nav, "a", &[("href", "/next")]);
        let link = doc.append_text(a, "Continue reading");
        (doc, text, link)
    }

    fn hover_at(session: &mut PageSession, doc: &Document, point: Point) -> Vec<Effect> {
        session.handle(
            PageEvent::PointerMove {
                point,
                buttons: 0,
                target: Target::Page,
            },
            doc,
        );
        session.handle(PageEvent::AnimationFrame, doc)
    }

    fn created_icon(effects: &[Effect]) -> Option<&str> {
        effects.iter().find_map(|e| match e {
            Effect::CreateIcon { word, .. } => Some(word.as_str()),
            _ => None,
        })
    }

    fn deletes(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Highlight(HighlightOp::Delete(_))))
            .count()
    }

    #[test]
    fn hover_waits_for_animation_frame() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        let point = doc.point_at(text, 7).unwrap();

        let moved = session.handle(
            PageEvent::PointerMove {
                point,
                buttons: 0,
                target: Target::Page,
            },
            &doc,
        );
        assert!(moved.is_empty());

        let effects = session.handle(PageEvent::AnimationFrame, &doc);
        assert_eq!(created_icon(&effects), Some("run"));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::Highlight(HighlightOp::Set { layer, .. }) if layer.name() == "ety-word"
        )));
        assert_eq!(session.hovered().unwrap().text, "run");

        assert!(session.handle(PageEvent::AnimationFrame, &doc).is_empty());
    }

    #[test]
    fn dragging_does_not_hover() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        session.handle(
            PageEvent::PointerMove {
                point: doc.point_at(text, 7).unwrap(),
                buttons: 1,
                target: Target::Page,
            },
            &doc,
        );
        assert!(session.handle(PageEvent::AnimationFrame, &doc).is_empty());
        assert_eq!(session.ui().phase(), Phase::Idle);
    }

    #[test]
    fn links_are_skipped_unless_allowed() {
        let (doc, _, link) = page();
        let mut session = PageSession::default();
        let point = doc.point_at(link, 2).unwrap();

        let effects = hover_at(&mut session, &doc, point);
        assert_eq!(created_icon(&effects), None);
        assert_eq!(session.ui().phase(), Phase::Idle);

        session.handle(
            PageEvent::ConfigChanged {
                allow_interactive_hover: true,
            },
            &doc,
        );
        let effects = hover_at(&mut session, &doc, point);
        assert_eq!(created_icon(&effects), Some("Continue"));
    }

    #[test]
    fn disabling_interactive_hover_clears_highlights() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        hover_at(&mut session, &doc, doc.point_at(text, 7).unwrap());
        assert!(session.highlighter().active_mode().is_some());

        let effects = session.handle(
            PageEvent::ConfigChanged {
                allow_interactive_hover: false,
            },
            &doc,
        );
        assert_eq!(deletes(&effects), 8);
        assert!(session.highlighter().active_mode().is_none());
        assert!(!session.options().allow_interactive_hover);
    }

    #[test]
    fn leaving_text_arms_hide_timer_once() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        hover_at(&mut session, &doc, doc.point_at(text, 7).unwrap());

        let effects = hover_at(&mut session, &doc, Point::new(700.0, 10.0));
        assert_eq!(deletes(&effects), 8);
        assert_eq!(effects.last(), Some(&Effect::ScheduleTimer(TimerKind::HideIcon)));

        let effects = hover_at(&mut session, &doc, Point::new(720.0, 10.0));
        assert!(effects.is_empty());
    }

    #[test]
    fn sentence_and_neighbors_follow_options() {
        let (doc, text, _) = page();
        let mut session = PageSession::new(SessionOptions {
            allow_interactive_hover: false,
            neighbor_highlight: false,
            sentence_highlight: true,
        });
        hover_at(&mut session, &doc, doc.point_at(text, 7).unwrap());

        let plan = session.highlighter().painted().unwrap();
        assert!(plan.near.is_empty());
        assert!(plan.far.is_empty());
        assert_eq!(
            doc.range_text(&plan.sentence.unwrap()),
            "Words run fast."
        );
    }

    #[test]
    fn oversized_selection_is_ignored() {
        let (mut doc, text, _) = page();
        let mut session = PageSession::default();
        doc.select(TextRange::within(text, 0, 20));

        let effects = session.handle(PageEvent::PointerUp { target: Target::Page }, &doc);
        assert_eq!(effects, vec![Effect::ScheduleTimer(TimerKind::SelectionSettle)]);
        assert!(session.on_timer(TimerKind::SelectionSettle, &doc).is_empty());
        assert_eq!(session.ui().phase(), Phase::Idle);
    }

    #[test]
    fn valid_selection_shows_permanent_icon() {
        let (mut doc, text, _) = page();
        let mut session = PageSession::default();
        doc.select(TextRange::within(text, 6, 14));

        let effects = session.on_timer(TimerKind::SelectionSettle, &doc);
        assert_eq!(created_icon(&effects), Some("run fast"));
        assert_eq!(session.ui().phase(), Phase::IconOnly { auto_hide: false });
    }

    #[test]
    fn pointer_up_on_own_ui_is_ignored() {
        let (doc, _, _) = page();
        let mut session = PageSession::default();
        assert!(
            session
                .handle(PageEvent::PointerUp { target: Target::Popup }, &doc)
                .is_empty()
        );
    }

    #[test]
    fn click_on_hovered_word_opens_popup() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        let point = doc.point_at(text, 7).unwrap();
        hover_at(&mut session, &doc, point);

        let effects = session.handle(
            PageEvent::Click {
                point,
                button: PRIMARY_BUTTON,
                target: Target::Page,
            },
            &doc,
        );
        assert!(effects.contains(&Effect::RemoveIcon));
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::ShowPopup { word, body: PopupBody::Loading, .. } if word == "run"
        )));
        assert_eq!(effects.last(), Some(&Effect::PreventDefault));
        assert_eq!(session.ui().phase(), Phase::Loading);
    }

    #[test]
    fn click_elsewhere_or_secondary_button_does_nothing() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        let point = doc.point_at(text, 7).unwrap();
        hover_at(&mut session, &doc, point);

        let other = doc.point_at(text, 12).unwrap();
        let click = |point, button| PageEvent::Click {
            point,
            button,
            target: Target::Page,
        };
        assert!(session.handle(click(other, PRIMARY_BUTTON), &doc).is_empty());
        assert!(session.handle(click(point, 2), &doc).is_empty());
        assert_eq!(session.ui().phase(), Phase::IconOnly { auto_hide: true });
    }

    #[test]
    fn gap_between_words_is_not_a_hover() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        // The space before "run"; its caret rounds into "run" but the point
        // lies outside the word's box.
        let gap = doc.point_at(text, 5).unwrap();

        let effects = hover_at(&mut session, &doc, gap);
        assert_eq!(created_icon(&effects), None);
        assert!(session.hovered().is_none());
        assert!(session.highlighter().active_mode().is_none());

        hover_at(&mut session, &doc, doc.point_at(text, 7).unwrap());
        let effects = hover_at(&mut session, &doc, gap);
        assert_eq!(deletes(&effects), 8);
        assert_eq!(effects.last(), Some(&Effect::ScheduleTimer(TimerKind::HideIcon)));
        assert!(session.hovered().is_none());

        let effects = session.handle(
            PageEvent::Click {
                point: gap,
                button: PRIMARY_BUTTON,
                target: Target::Page,
            },
            &doc,
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn drag_ends_hover_so_release_click_does_nothing() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        let point = doc.point_at(text, 7).unwrap();
        hover_at(&mut session, &doc, point);
        assert_eq!(session.hovered().unwrap().text, "run");

        session.handle(
            PageEvent::PointerDown {
                point,
                target: Target::Page,
            },
            &doc,
        );
        let dragged = session.handle(
            PageEvent::PointerMove {
                point: doc.point_at(text, 8).unwrap(),
                buttons: 1,
                target: Target::Page,
            },
            &doc,
        );
        assert_eq!(deletes(&dragged), 8);
        assert!(session.hovered().is_none());

        // Further drag moves have nothing left to clear.
        let dragged = session.handle(
            PageEvent::PointerMove {
                point,
                buttons: 1,
                target: Target::Page,
            },
            &doc,
        );
        assert_eq!(deletes(&dragged), 0);

        session.handle(
            PageEvent::PointerUp {
                target: Target::Page,
            },
            &doc,
        );
        let clicked = session.handle(
            PageEvent::Click {
                point,
                button: PRIMARY_BUTTON,
                target: Target::Page,
            },
            &doc,
        );
        assert!(!clicked.contains(&Effect::PreventDefault));
        assert!(
            !clicked
                .iter()
                .any(|e| matches!(e, Effect::ShowPopup { .. } | Effect::RequestAnalysis { .. }))
        );
    }

    #[test]
    fn hovering_a_link_clears_without_arming_hide_timer() {
        let (doc, text, link) = page();
        let mut session = PageSession::default();
        hover_at(&mut session, &doc, doc.point_at(text, 7).unwrap());

        let effects = hover_at(&mut session, &doc, doc.point_at(link, 2).unwrap());
        assert_eq!(deletes(&effects), 8);
        assert!(!effects.contains(&Effect::ScheduleTimer(TimerKind::HideIcon)));
        assert!(session.hovered().is_none());
        assert_eq!(session.ui().phase(), Phase::IconOnly { auto_hide: true });
    }

    #[test]
    fn scroll_clears_highlights_and_ui() {
        let (doc, text, _) = page();
        let mut session = PageSession::default();
        hover_at(&mut session, &doc, doc.point_at(text, 7).unwrap());

        let effects = session.handle(
            PageEvent::Scroll {
                offset: ScrollOffset::new(0.0, 40.0),
            },
            &doc,
        );
        assert_eq!(deletes(&effects), 8);
        assert!(effects.contains(&Effect::RemoveIcon));
        assert!(session.hovered().is_none());
        assert_eq!(session.ui().phase(), Phase::Idle);
    }

    #[test]
    fn events_deserialize_from_json() {
        let event: PageEvent =
            serde_json::from_str(r#"{"type": "pointer_down", "point": {"x": 1.0, "y": 2.0}}"#)
                .unwrap();
        assert_eq!(
            event,
            PageEvent::PointerDown {
                point: Point::new(1.0, 2.0),
                target: Target::Page,
            }
        );
        let event: PageEvent = serde_json::from_str(r#"{"type": "icon_enter"}"#).unwrap();
        assert_eq!(event, PageEvent::IconEnter);
    }
}
