//! Non-destructive highlight layers.
//!
//! Highlights are named range registries (the CSS Custom Highlight API in a
//! browser), so painting never touches the page's nodes or text. Each tier
//! exists once per style mode; only one mode is painted at a time.

use crate::dom::{NodeId, PageDom, TextRange};

/// Text brighter than this is light-on-dark.
const LIGHT_TEXT_BRIGHTNESS: f64 = 200.0;
/// Ancestor levels inspected for a background, counting the element itself.
const BACKGROUND_SEARCH_DEPTH: usize = 4;
const LIGHT_CHANNEL: u8 = 240;

/// How highlights are drawn over a given element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleMode {
    /// Tinted background.
    Normal,
    /// Underline only, for dark, colored or image backgrounds.
    Clean,
}

impl StyleMode {
    #[must_use]
    pub fn other(self) -> StyleMode {
        match self {
            StyleMode::Normal => StyleMode::Clean,
            StyleMode::Clean => StyleMode::Normal,
        }
    }
}

/// Picks the style mode from the text color and nearby backgrounds.
pub fn infer_style_mode<D: PageDom + ?Sized>(dom: &D, node: NodeId) -> StyleMode {
    let Some(element) = dom.element_of(node) else {
        return StyleMode::Normal;
    };

    if dom.computed_style(element).color.brightness() > LIGHT_TEXT_BRIGHTNESS {
        return StyleMode::Clean;
    }

    let mut current = Some(element);
    for _ in 0..BACKGROUND_SEARCH_DEPTH {
        let Some(id) = current else { break };
        let style = dom.computed_style(id);
        let bg = style.background_color;
        if bg.a > 0.1 {
            let light = bg.r >= LIGHT_CHANNEL && bg.g >= LIGHT_CHANNEL && bg.b >= LIGHT_CHANNEL;
            if !light {
                return StyleMode::Clean;
            }
            if bg.a > 0.9 {
                return StyleMode::Normal;
            }
        }
        // An opaque light color wins over an image on the same element.
        if style.background_image.is_some() {
            return StyleMode::Clean;
        }
        current = dom.parent(id);
    }

    StyleMode::Normal
}

/// Emphasis tiers, strongest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    Word,
    Near,
    Far,
    Sentence,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Word, Tier::Near, Tier::Far, Tier::Sentence];
}

/// One named highlight registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Layer {
    pub tier: Tier,
    pub mode: StyleMode,
}

impl Layer {
    #[must_use]
    pub const fn new(tier: Tier, mode: StyleMode) -> Self {
        Self { tier, mode }
    }

    /// Every layer of one mode.
    pub fn all(mode: StyleMode) -> impl Iterator<Item = Layer> {
        Tier::ALL.into_iter().map(move |tier| Layer::new(tier, mode))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match (self.tier, self.mode) {
            (Tier::Word, StyleMode::Normal) => "ety-word",
            (Tier::Near, StyleMode::Normal) => "ety-near",
            (Tier::Far, StyleMode::Normal) => "ety-far",
            (Tier::Sentence, StyleMode::Normal) => "ety-sentence",
            (Tier::Word, StyleMode::Clean) => "ety-word-clean",
            (Tier::Near, StyleMode::Clean) => "ety-near-clean",
            (Tier::Far, StyleMode::Clean) => "ety-far-clean",
            (Tier::Sentence, StyleMode::Clean) => "ety-sentence-clean",
        }
    }

    /// The `::highlight()` rule the page stylesheet carries for this layer.
    #[must_use]
    pub fn css(&self) -> String {
        let body = match (self.mode, self.tier) {
            (StyleMode::Normal, Tier::Word) => "background-color: rgba(255, 200, 60, 0.55);",
            (StyleMode::Normal, Tier::Near) => "background-color: rgba(255, 200, 60, 0.30);",
            (StyleMode::Normal, Tier::Far) => "background-color: rgba(255, 200, 60, 0.15);",
            (StyleMode::Normal, Tier::Sentence) => "background-color: rgba(255, 200, 60, 0.07);",
            (StyleMode::Clean, Tier::Word) => {
                "text-decoration: underline 2px rgba(255, 200, 60, 1);"
            }
            (StyleMode::Clean, Tier::Near) => {
                "text-decoration: underline 1px rgba(255, 200, 60, 0.6);"
            }
            (StyleMode::Clean, Tier::Far) => {
                "text-decoration: underline 1px rgba(255, 200, 60, 0.3);"
            }
            (StyleMode::Clean, Tier::Sentence) => {
                "text-decoration: underline dotted 1px rgba(255, 200, 60, 0.25);"
            }
        };
        format!("::highlight({}) {{ {body} }}", self.name())
    }
}

/// A single change to the highlight registries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HighlightOp {
    Set { layer: Layer, ranges: Vec<TextRange> },
    Delete(Layer),
}

/// Ranges to paint for one hovered word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HighlightPlan {
    pub mode: StyleMode,
    pub word: TextRange,
    pub near: Vec<TextRange>,
    pub far: Vec<TextRange>,
    pub sentence: Option<TextRange>,
}

impl HighlightPlan {
    fn ranges(&self, tier: Tier) -> Vec<TextRange> {
        match tier {
            Tier::Word => vec![self.word],
            Tier::Near => self.near.clone(),
            Tier::Far => self.far.clone(),
            Tier::Sentence => self.sentence.iter().copied().collect(),
        }
    }
}

/// Tracks what is painted and turns plans into registry operations.
#[derive(Debug, Default)]
pub struct Highlighter {
    active: Option<StyleMode>,
    painted: Option<HighlightPlan>,
}

impl Highlighter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mode currently painted, if any.
    #[must_use]
    pub fn active_mode(&self) -> Option<StyleMode> {
        self.active
    }

    #[must_use]
    pub fn painted(&self) -> Option<&HighlightPlan> {
        self.painted.as_ref()
    }

    /// Paints `plan`, removing every layer of the other mode.
    pub fn paint(&mut self, plan: HighlightPlan) -> Vec<HighlightOp> {
        if self.painted.as_ref() == Some(&plan) {
            return Vec::new();
        }

        let mut ops: Vec<HighlightOp> = Layer::all(plan.mode.other())
            .map(HighlightOp::Delete)
            .collect();
        for layer in Layer::all(plan.mode) {
            let ranges = plan.ranges(layer.tier);
            if ranges.is_empty() {
                ops.push(HighlightOp::Delete(layer));
            } else {
                ops.push(HighlightOp::Set { layer, ranges });
            }
        }

        self.active = Some(plan.mode);
        self.painted = Some(plan);
        ops
    }

    /// Removes every layer of both modes.
    pub fn clear(&mut self) -> Vec<HighlightOp> {
        self.active = None;
        self.painted = None;
        Layer::all(StyleMode::Normal)
            .chain(Layer::all(StyleMode::Clean))
            .map(HighlightOp::Delete)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn styled_text(style: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.append_element(body, "div", &[("style", style)]);
        let p = doc.append_element(div, "p", &[]);
        let text = doc.append_text(p, "sample");
        (doc, text)
    }

    #[test]
    fn default_page_is_normal() {
        let (doc, text) = styled_text("");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Normal);
    }

    #[test]
    fn light_text_is_clean() {
        let (doc, text) = styled_text("color: #eeeeee");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Clean);
    }

    #[test]
    fn dark_or_colored_background_is_clean() {
        let (doc, text) = styled_text("background-color: #1e1e1e; color: #999");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Clean);
        let (doc, text) = styled_text("background: rgb(200, 230, 255)");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Clean);
    }

    #[test]
    fn faint_background_is_ignored() {
        let (doc, text) = styled_text("background-color: rgba(0, 0, 0, 0.05)");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Normal);
    }

    #[test]
    fn background_image_is_clean() {
        let (doc, text) = styled_text("background-image: url(hero.png)");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Clean);
    }

    #[test]
    fn opaque_light_color_beats_background_image() {
        let (doc, text) =
            styled_text("background-color: #fff; background-image: url(hero.png)");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Normal);

        let (doc, text) = styled_text(
            "background-color: rgba(255, 255, 255, 0.5); background-image: url(hero.png)",
        );
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Clean);
    }

    #[test]
    fn opaque_white_stops_the_search() {
        let mut doc = Document::new();
        let body = doc.body();
        let dark = doc.append_element(body, "div", &[("style", "background: #000")]);
        let light = doc.append_element(dark, "div", &[("style", "background: #fff")]);
        let p = doc.append_element(light, "p", &[]);
        let text = doc.append_text(p, "sample");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Normal);
    }

    #[test]
    fn search_is_limited_to_four_levels() {
        let mut doc = Document::new();
        let body = doc.body();
        let mut parent = doc.append_element(body, "div", &[("style", "background: #000")]);
        for _ in 0..4 {
            parent = doc.append_element(parent, "div", &[]);
        }
        let text = doc.append_text(parent, "deep");
        assert_eq!(infer_style_mode(&doc, text), StyleMode::Normal);
    }

    fn plan(mode: StyleMode) -> HighlightPlan {
        HighlightPlan {
            mode,
            word: TextRange::within(NodeId(5), 0, 3),
            near: vec![TextRange::within(NodeId(5), 4, 7)],
            far: Vec::new(),
            sentence: None,
        }
    }

    #[test]
    fn painting_deletes_the_other_mode() {
        let mut highlighter = Highlighter::new();
        let ops = highlighter.paint(plan(StyleMode::Clean));
        for layer in Layer::all(StyleMode::Normal) {
            assert!(ops.contains(&HighlightOp::Delete(layer)));
        }
        assert!(ops.contains(&HighlightOp::Set {
            layer: Layer::new(Tier::Word, StyleMode::Clean),
            ranges: vec![TextRange::within(NodeId(5), 0, 3)],
        }));
        assert!(ops.contains(&HighlightOp::Delete(Layer::new(Tier::Far, StyleMode::Clean))));
        assert_eq!(highlighter.active_mode(), Some(StyleMode::Clean));
    }

    #[test]
    fn repainting_the_same_plan_is_a_no_op() {
        let mut highlighter = Highlighter::new();
        highlighter.paint(plan(StyleMode::Normal));
        assert!(highlighter.paint(plan(StyleMode::Normal)).is_empty());
    }

    #[test]
    fn clear_removes_every_layer() {
        let mut highlighter = Highlighter::new();
        highlighter.paint(plan(StyleMode::Normal));
        let ops = highlighter.clear();
        assert_eq!(ops.len(), 8);
        assert!(ops.iter().all(|op| matches!(op, HighlightOp::Delete(_))));
        assert_eq!(highlighter.active_mode(), None);
    }

    #[test]
    fn layer_names_are_distinct() {
        let mut names: Vec<_> = Layer::all(StyleMode::Normal)
            .chain(Layer::all(StyleMode::Clean))
            .map(|l| l.name())
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
        assert!(Layer::new(Tier::Word, StyleMode::Clean).css().contains("underline"));
    }
}
