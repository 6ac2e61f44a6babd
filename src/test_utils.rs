pub mod test_helpers {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::dom::{Document, NodeId, PageDom, TextRange};
    use crate::event_source::{SessionInput, SimulatedEventSource};
    use crate::gateway::{
        AnalysisError, AnalysisService, EtymologyProvider, EtymologyRecord, Gateway, MemoryCache,
    };
    use crate::geometry::Point;
    use crate::highlight::Layer;
    use crate::positioner::PopupPlacement;
    use crate::runtime::ContentScript;
    use crate::session::SessionOptions;
    use crate::surface::UiSurface;
    use crate::timers::ManualClock;

    /// Builder for creating test scenarios with simulated page input
    pub struct TestScenarioBuilder {
        events: Vec<SessionInput>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        /// Move the pointer and let the next animation frame run the hover.
        pub fn hover(mut self, point: Point) -> Self {
            self.events
                .push(SimulatedEventSource::pointer_move(point.x, point.y));
            self.events.push(SimulatedEventSource::frame());
            self
        }

        pub fn click(mut self, point: Point) -> Self {
            self.events
                .push(SimulatedEventSource::pointer_down(point.x, point.y));
            self.events.push(SimulatedEventSource::pointer_up());
            self.events.push(SimulatedEventSource::click(point.x, point.y));
            self
        }

        /// Press on `from`, drag to `to` and release there with a click.
        pub fn drag(mut self, from: Point, to: Point) -> Self {
            self.events
                .push(SimulatedEventSource::pointer_down(from.x, from.y));
            self.events
                .push(SimulatedEventSource::drag_move(to.x, to.y));
            self.events.push(SimulatedEventSource::frame());
            self.events.push(SimulatedEventSource::pointer_up());
            self.events.push(SimulatedEventSource::click(to.x, to.y));
            self
        }

        pub fn scroll_to(mut self, y: f64) -> Self {
            self.events.push(SimulatedEventSource::scroll(0.0, y));
            self
        }

        pub fn wait_ms(mut self, ms: u64) -> Self {
            self.events.push(SimulatedEventSource::wait(ms));
            self
        }

        pub fn await_analysis(mut self) -> Self {
            self.events.push(SessionInput::AwaitAnalysis);
            self
        }

        pub fn event(mut self, input: SessionInput) -> Self {
            self.events.push(input);
            self
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// One call made on a [`RecordingSurface`].
    #[derive(Clone, Debug, PartialEq)]
    pub enum SurfaceOp {
        CreateIcon(String, Point),
        MoveIcon(Point),
        RemoveIcon,
        ShowPopup(String, PopupPlacement),
        SetPopupHtml(String),
        SetPopupOpacity(f64),
        SetPopupVisible(bool),
        RemovePopup,
        TrackPointer(bool),
        SetHighlight(Layer, Vec<TextRange>),
        DeleteHighlight(Layer),
        PreventDefault,
    }

    /// Surface that records every call and panics if a second icon or popup
    /// is ever attached.
    #[derive(Debug, Default)]
    pub struct RecordingSurface {
        pub ops: Vec<SurfaceOp>,
        icon: Option<(String, Point)>,
        popup: Option<(String, PopupPlacement)>,
        pub popup_html: Option<String>,
        pub popup_visible: bool,
        pub opacity: Option<f64>,
        pub tracking: bool,
        icons_created: usize,
        popups_shown: usize,
    }

    impl RecordingSurface {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn icon(&self) -> Option<&(String, Point)> {
            self.icon.as_ref()
        }

        pub fn popup(&self) -> Option<&(String, PopupPlacement)> {
            self.popup.as_ref()
        }

        pub fn icons_created(&self) -> usize {
            self.icons_created
        }

        pub fn popups_shown(&self) -> usize {
            self.popups_shown
        }

        /// Layers that currently hold ranges.
        pub fn painted_layers(&self) -> Vec<Layer> {
            let mut painted: Vec<Layer> = Vec::new();
            for op in &self.ops {
                match op {
                    SurfaceOp::SetHighlight(layer, _) => {
                        if !painted.contains(layer) {
                            painted.push(*layer);
                        }
                    }
                    SurfaceOp::DeleteHighlight(layer) => painted.retain(|l| l != layer),
                    _ => {}
                }
            }
            painted
        }
    }

    impl UiSurface for RecordingSurface {
        fn create_icon(&mut self, word: &str, position: Point) {
            assert!(self.icon.is_none(), "second icon created for '{word}'");
            self.icon = Some((word.to_string(), position));
            self.icons_created += 1;
            self.ops
                .push(SurfaceOp::CreateIcon(word.to_string(), position));
        }

        fn move_icon(&mut self, position: Point) {
            if let Some((_, current)) = &mut self.icon {
                *current = position;
            }
            self.ops.push(SurfaceOp::MoveIcon(position));
        }

        fn remove_icon(&mut self) {
            self.icon = None;
            self.ops.push(SurfaceOp::RemoveIcon);
        }

        fn show_popup(&mut self, word: &str, placement: PopupPlacement, html: &str) {
            assert!(self.popup.is_none(), "second popup shown for '{word}'");
            self.popup = Some((word.to_string(), placement));
            self.popup_html = Some(html.to_string());
            self.popup_visible = true;
            self.popups_shown += 1;
            self.ops
                .push(SurfaceOp::ShowPopup(word.to_string(), placement));
        }

        fn set_popup_html(&mut self, html: &str) {
            self.popup_html = Some(html.to_string());
            self.ops.push(SurfaceOp::SetPopupHtml(html.to_string()));
        }

        fn set_popup_opacity(&mut self, opacity: f64) {
            self.opacity = Some(opacity);
            self.ops.push(SurfaceOp::SetPopupOpacity(opacity));
        }

        fn set_popup_visible(&mut self, visible: bool) {
            self.popup_visible = visible;
            self.ops.push(SurfaceOp::SetPopupVisible(visible));
        }

        fn remove_popup(&mut self) {
            self.popup = None;
            self.popup_html = None;
            self.popup_visible = false;
            self.opacity = None;
            self.ops.push(SurfaceOp::RemovePopup);
        }

        fn track_pointer(&mut self, enabled: bool) {
            self.tracking = enabled;
            self.ops.push(SurfaceOp::TrackPointer(enabled));
        }

        fn set_highlight(&mut self, layer: Layer, ranges: &[TextRange]) {
            self.ops.push(SurfaceOp::SetHighlight(layer, ranges.to_vec()));
        }

        fn delete_highlight(&mut self, layer: Layer) {
            self.ops.push(SurfaceOp::DeleteHighlight(layer));
        }

        fn prevent_default(&mut self) {
            self.ops.push(SurfaceOp::PreventDefault);
        }

        fn has_icon(&self) -> bool {
            self.icon.is_some()
        }

        fn has_popup(&self) -> bool {
            self.popup.is_some()
        }
    }

    /// Provider with scripted answers that counts its calls.
    #[derive(Clone, Debug, Default)]
    pub struct FakeProvider {
        calls: Arc<AtomicUsize>,
        failure: Option<String>,
    }

    impl FakeProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every fetch fails with a provider error carrying `message`.
        pub fn failing(message: &str) -> Self {
            Self {
                calls: Arc::default(),
                failure: Some(message.to_string()),
            }
        }

        /// Shared call counter; clones of the provider report to the same one.
        pub fn calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// The record returned for `word`.
        pub fn record_for(word: &str) -> EtymologyRecord {
            let word = word.trim().to_lowercase();
            EtymologyRecord {
                prefix: "none".to_string(),
                root: format!("{word} (test root)"),
                suffix: "none".to_string(),
                desc: format!("{word} comes from a test fixture."),
                translation: Some(format!("<{word}>")),
            }
        }
    }

    impl EtymologyProvider for FakeProvider {
        fn fetch(&self, word: &str) -> Result<EtymologyRecord, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.failure {
                Some(message) => Err(AnalysisError::Provider {
                    message: message.clone(),
                }),
                None => Ok(Self::record_for(word)),
            }
        }
    }

    /// Content script wired to a recording surface, a manual clock and a
    /// memory-cached fake provider.
    pub fn test_script(
        options: SessionOptions,
        provider: FakeProvider,
    ) -> ContentScript<RecordingSurface, ManualClock> {
        let service = AnalysisService::spawn(Gateway::new(MemoryCache::new(), provider));
        ContentScript::new(options, RecordingSurface::new(), ManualClock::new(), service)
    }

    /// A page with one paragraph of `text`; returns the text node.
    pub fn paragraph_page(text: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let node = doc.append_text(p, text);
        (doc, node)
    }

    /// Viewport point over the middle of the first occurrence of `word`.
    pub fn point_on(doc: &Document, word: &str) -> Point {
        let range = doc
            .locate(word)
            .unwrap_or_else(|| panic!("'{word}' is not on the page"));
        let middle = range.start.offset + (range.end.offset - range.start.offset) / 2;
        doc.point_at(range.start.node, middle)
            .unwrap_or_else(|| panic!("'{word}' is not laid out"))
    }
}
