//! Drives a [`PageSession`] against a surface, a clock and the analysis worker.

use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};

use crate::dom::PageDom;
use crate::effect::{Effect, PopupBody, RequestId};
use crate::event_source::{EventSource, SessionInput};
use crate::gateway::{AnalysisReply, AnalysisService, ChannelError, PendingAnalysis};
use crate::highlight::HighlightOp;
use crate::popup::render_card;
use crate::session::{PageEvent, PageSession, SessionOptions};
use crate::surface::UiSurface;
use crate::timers::{Clock, TimerQueue};

/// Longest a replay waits for one provider round trip.
const ANALYSIS_WAIT: Duration = Duration::from_secs(60);

/// The content script of one page: session state plus everything it talks to.
pub struct ContentScript<S, C> {
    session: PageSession,
    surface: S,
    clock: C,
    timers: TimerQueue,
    service: AnalysisService,
    in_flight: Vec<PendingAnalysis>,
}

impl<S: UiSurface, C: Clock> ContentScript<S, C> {
    pub fn new(options: SessionOptions, surface: S, clock: C, service: AnalysisService) -> Self {
        Self {
            session: PageSession::new(options),
            surface,
            clock,
            timers: TimerQueue::new(),
            service,
            in_flight: Vec::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &PageSession {
        &self.session
    }

    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Requests whose reply has not been consumed yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Dispatches one page event, then runs anything that became due.
    pub fn dispatch<D: PageDom + ?Sized>(&mut self, event: PageEvent, dom: &D) {
        let effects = self.session.handle(event, dom);
        self.execute_effects(effects);
        self.tick(dom);
    }

    /// Fires due timers and delivers arrived analysis replies.
    pub fn tick<D: PageDom + ?Sized>(&mut self, dom: &D) {
        loop {
            let due = self.timers.take_due(self.clock.now());
            if due.is_empty() {
                break;
            }
            for timer in due {
                debug!("Timer {timer:?} fired");
                let effects = self.session.on_timer(timer, dom);
                self.execute_effects(effects);
            }
        }
        self.poll_analyses();
    }

    /// Blocks until every in-flight analysis replied or `timeout` passed
    /// for each of them, then delivers the replies.
    pub fn wait_for_analyses(&mut self, timeout: Duration) {
        let mut replies = Vec::new();
        for pending in std::mem::take(&mut self.in_flight) {
            match pending.wait(timeout) {
                Ok(Some(reply)) => replies.push((pending.id, pending.word, reply)),
                Ok(None) => {
                    warn!("Analysis {} for '{}' timed out", pending.id, pending.word);
                    self.in_flight.push(pending);
                }
                Err(e) => warn!("Analysis {} for '{}' lost: {e}", pending.id, pending.word),
            }
        }
        self.deliver(replies);
    }

    /// Feeds every input of `source` into the session until it runs dry.
    pub fn run<E, D>(&mut self, source: &mut E, dom: &D) -> Result<()>
    where
        E: EventSource,
        D: PageDom + ?Sized,
    {
        while source.poll(Duration::ZERO)? {
            match source.read()? {
                SessionInput::Page(event) => self.dispatch(event, dom),
                SessionInput::Wait(by) => {
                    self.clock.wait(by);
                    self.tick(dom);
                }
                SessionInput::AwaitAnalysis => {
                    self.wait_for_analyses(ANALYSIS_WAIT);
                    self.tick(dom);
                }
            }
        }
        Ok(())
    }

    fn poll_analyses(&mut self) {
        let mut replies: Vec<(RequestId, String, AnalysisReply)> = Vec::new();
        self.in_flight.retain(|pending| match pending.try_take() {
            Ok(Some(reply)) => {
                replies.push((pending.id, pending.word.clone(), reply));
                false
            }
            Ok(None) => true,
            Err(ChannelError::Disconnected) => {
                warn!(
                    "Analysis {} for '{}' lost: worker disconnected",
                    pending.id, pending.word
                );
                false
            }
        });

        self.deliver(replies);
    }

    fn deliver(&mut self, replies: Vec<(RequestId, String, AnalysisReply)>) {
        for (id, word, reply) in replies {
            let effects = self.session.on_analysis(id, word, reply);
            self.execute_effects(effects);
        }
    }

    fn execute_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateIcon { word, position } => {
                    self.surface.create_icon(&word, position);
                }
                Effect::MoveIcon { position } => self.surface.move_icon(position),
                Effect::RemoveIcon => self.surface.remove_icon(),

                Effect::ShowPopup {
                    word,
                    placement,
                    body,
                } => {
                    let html = render_card(&word, &body);
                    self.surface.show_popup(&word, placement, &html);
                }
                Effect::SetPopupContent { word, body } => {
                    if matches!(body, PopupBody::Failed(_)) {
                        debug!("Showing lookup failure for '{word}'");
                    }
                    self.surface.set_popup_html(&render_card(&word, &body));
                }
                Effect::SetPopupOpacity(opacity) => self.surface.set_popup_opacity(opacity),
                Effect::ConcealPopup => self.surface.set_popup_visible(false),
                Effect::RevealPopup => self.surface.set_popup_visible(true),
                Effect::RemovePopup => self.surface.remove_popup(),

                Effect::StartTracking => self.surface.track_pointer(true),
                Effect::StopTracking => self.surface.track_pointer(false),

                Effect::RequestAnalysis { id, word } => self.request_analysis(id, &word),

                Effect::ScheduleTimer(timer) => self.timers.schedule(timer, self.clock.now()),
                Effect::CancelTimer(timer) => self.timers.cancel(timer),

                Effect::Highlight(HighlightOp::Set { layer, ranges }) => {
                    self.surface.set_highlight(layer, &ranges);
                }
                Effect::Highlight(HighlightOp::Delete(layer)) => {
                    self.surface.delete_highlight(layer);
                }

                Effect::PreventDefault => self.surface.prevent_default(),
            }
        }
    }

    /// Sends a request; a dead worker leaves the popup loading.
    fn request_analysis(&mut self, id: RequestId, word: &str) {
        if !self.service.is_alive() {
            warn!("Analysis worker unavailable, '{word}' stays loading");
            return;
        }
        match self.service.analyze(id, word) {
            Ok(pending) => self.in_flight.push(pending),
            Err(e) => warn!("Failed to request analysis {id} for '{word}': {e}"),
        }
    }
}
