use std::collections::HashMap;

use super::style::{ComputedStyle, Rgba, parse_declarations};
use super::{Boundary, NodeId, PageDom, Selection, TextRange};
use crate::geometry::{Point, Rect, ScrollOffset};

/// Advance of every character in the fixed-metric layout.
pub const CHAR_WIDTH: f64 = 8.0;
/// Height of every line box in the fixed-metric layout.
pub const LINE_HEIGHT: f64 = 20.0;

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "address", "article", "aside", "blockquote", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "thead", "tfoot", "tr", "td", "th", "ul",
];

const BLOCK_DISPLAYS: &[&str] = &["block", "flex", "grid", "list-item", "table", "flow-root"];

/// Elements whose content never reaches the layout.
const SKIPPED_TAGS: &[&str] = &["head", "script", "style", "template", "noscript"];

#[derive(Debug)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        style: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One laid-out text node, in page coordinates.
#[derive(Clone, Copy, Debug)]
struct TextBox {
    node: NodeId,
    left: f64,
    top: f64,
    len: usize,
}

#[derive(Default)]
struct LayoutCursor {
    x: f64,
    line: usize,
}

impl LayoutCursor {
    fn break_line(&mut self) {
        if self.x > 0.0 {
            self.line += 1;
            self.x = 0.0;
        }
    }
}

/// In-memory page with a deterministic layout: every block starts a new
/// line, lines never wrap, every character is [`CHAR_WIDTH`] wide and every
/// line [`LINE_HEIGHT`] tall.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    html: NodeId,
    body: NodeId,
    scroll: ScrollOffset,
    selection: Option<TextRange>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty `<html><body></body></html>` page.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            html: NodeId(0),
            body: NodeId(0),
            scroll: ScrollOffset::default(),
            selection: None,
        };
        let html = doc.push(
            NodeKind::Element {
                tag: "html".to_string(),
                attrs: Vec::new(),
                style: Vec::new(),
            },
            None,
        );
        let body = doc.append_element(html, "body", &[]);
        doc.html = html;
        doc.body = body;
        doc
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs: Vec<(String, String)> = attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), (*v).to_string()))
            .collect();
        let style = attrs
            .iter()
            .find(|(k, _)| k == "style")
            .map(|(_, v)| parse_declarations(v))
            .unwrap_or_default();
        self.push(
            NodeKind::Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
                style,
            },
            Some(parent),
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()), Some(parent))
    }

    /// Sets or replaces an attribute; `style` is re-parsed.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let Some(Node {
            kind: NodeKind::Element { attrs, style, .. },
            ..
        }) = self.nodes.get_mut(node.0)
        else {
            return;
        };
        let name = name.to_ascii_lowercase();
        if name == "style" {
            *style = parse_declarations(value);
        }
        match attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => attrs.push((name, value.to_string())),
        }
    }

    #[must_use]
    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn set_scroll(&mut self, scroll: ScrollOffset) {
        self.scroll = scroll;
    }

    pub fn select(&mut self, range: TextRange) {
        self.selection = Some(range);
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn style_value(&self, node: NodeId, prop: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { style, .. } => style
                .iter()
                .rev()
                .find(|(p, _)| p == prop)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn inherited_value(&self, node: NodeId, prop: &str) -> Option<&str> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(value) = self.style_value(id, prop) {
                return Some(value);
            }
            current = self.parent(id);
        }
        None
    }

    fn is_skipped(&self, node: NodeId) -> bool {
        self.tag_name(node)
            .is_some_and(|tag| SKIPPED_TAGS.contains(&tag))
    }

    /// Text nodes that take part in layout, in document order.
    #[must_use]
    pub fn text_nodes(&self) -> Vec<NodeId> {
        self.text_boxes().iter().map(|b| b.node).collect()
    }

    fn text_boxes(&self) -> Vec<TextBox> {
        let mut boxes = Vec::new();
        let mut cursor = LayoutCursor::default();
        self.layout_node(self.html, &mut cursor, &mut boxes);
        boxes
    }

    fn layout_node(&self, id: NodeId, cursor: &mut LayoutCursor, out: &mut Vec<TextBox>) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => {
                let len = text.chars().count();
                if len > 0 {
                    out.push(TextBox {
                        node: id,
                        left: cursor.x,
                        top: cursor.line as f64 * LINE_HEIGHT,
                        len,
                    });
                    cursor.x += len as f64 * CHAR_WIDTH;
                }
            }
            NodeKind::Element { tag, .. } => {
                if self.is_skipped(id) {
                    return;
                }
                if tag == "br" {
                    cursor.line += 1;
                    cursor.x = 0.0;
                    return;
                }
                let block = self.is_block(id);
                if block {
                    cursor.break_line();
                }
                for &child in &self.nodes[id.0].children {
                    self.layout_node(child, cursor, out);
                }
                if block {
                    cursor.break_line();
                }
            }
        }
    }

    /// Text covered by `range`, walking text nodes in document order.
    #[must_use]
    pub fn range_text(&self, range: &TextRange) -> String {
        let mut out = String::new();
        for (node, start, end) in self.range_fragments(range) {
            if let Some(text) = self.text(node) {
                out.push_str(&super::char_slice(text, start, end));
            }
        }
        out
    }

    fn range_fragments(&self, range: &TextRange) -> Vec<(NodeId, usize, usize)> {
        let order = self.text_nodes();
        let index: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let (Some(&first), Some(&last)) = (index.get(&range.start.node), index.get(&range.end.node))
        else {
            return Vec::new();
        };
        if first > last {
            return Vec::new();
        }
        order[first..=last]
            .iter()
            .map(|&node| {
                let len = self.text(node).map_or(0, |t| t.chars().count());
                let start = if node == range.start.node {
                    range.start.offset.min(len)
                } else {
                    0
                };
                let end = if node == range.end.node {
                    range.end.offset.min(len)
                } else {
                    len
                };
                (node, start, end)
            })
            .filter(|(_, start, end)| end > start)
            .collect()
    }

    /// First occurrence of `needle` in a single text node.
    #[must_use]
    pub fn locate(&self, needle: &str) -> Option<TextRange> {
        self.text_nodes().into_iter().find_map(|node| {
            let text = self.text(node)?;
            let byte = text.find(needle)?;
            let start = text[..byte].chars().count();
            Some(TextRange::within(node, start, start + needle.chars().count()))
        })
    }

    /// Viewport point over the middle of the character at `offset`.
    #[must_use]
    pub fn point_at(&self, node: NodeId, offset: usize) -> Option<Point> {
        let b = self.text_boxes().into_iter().find(|b| b.node == node)?;
        Some(Point::new(
            b.left + (offset as f64 + 0.5) * CHAR_WIDTH - self.scroll.x,
            b.top + LINE_HEIGHT / 2.0 - self.scroll.y,
        ))
    }
}

impl PageDom for Document {
    fn body(&self) -> NodeId {
        self.body
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map_or(&[], |n| n.children.as_slice())
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    fn computed_style(&self, node: NodeId) -> ComputedStyle {
        let Some(element) = self.element_of(node) else {
            return ComputedStyle::default();
        };

        let color = self
            .inherited_value(element, "color")
            .and_then(Rgba::parse)
            .unwrap_or(Rgba::BLACK);

        let shorthand = self.style_value(element, "background");
        let background_color = self
            .style_value(element, "background-color")
            .and_then(Rgba::parse)
            .or_else(|| shorthand.and_then(Rgba::parse))
            .unwrap_or(Rgba::TRANSPARENT);

        let background_image = self
            .style_value(element, "background-image")
            .or(shorthand.filter(|v| v.contains("url(") || v.contains("gradient(")))
            .filter(|v| !v.eq_ignore_ascii_case("none"))
            .map(str::to_string);

        ComputedStyle {
            color,
            background_color,
            background_image,
            cursor: self.inherited_value(element, "cursor").map(str::to_string),
            display: self.style_value(element, "display").map(str::to_string),
        }
    }

    fn is_block(&self, node: NodeId) -> bool {
        if let Some(display) = self.style_value(node, "display") {
            return BLOCK_DISPLAYS.contains(&display.to_ascii_lowercase().as_str());
        }
        self.tag_name(node)
            .is_some_and(|tag| BLOCK_TAGS.contains(&tag))
    }

    fn caret_at(&self, point: Point) -> Option<Boundary> {
        let px = point.x + self.scroll.x;
        let py = point.y + self.scroll.y;
        self.text_boxes().into_iter().find_map(|b| {
            let right = b.left + b.len as f64 * CHAR_WIDTH;
            if py >= b.top && py < b.top + LINE_HEIGHT && px >= b.left && px <= right {
                let offset = ((px - b.left) / CHAR_WIDTH).round() as usize;
                Some(Boundary::new(b.node, offset.min(b.len)))
            } else {
                None
            }
        })
    }

    fn client_rects(&self, range: &TextRange) -> Vec<Rect> {
        let boxes = self.text_boxes();
        self.range_fragments(range)
            .into_iter()
            .filter_map(|(node, start, end)| {
                let b = boxes.iter().find(|b| b.node == node)?;
                Some(Rect::new(
                    b.left + start as f64 * CHAR_WIDTH - self.scroll.x,
                    b.top - self.scroll.y,
                    b.left + end as f64 * CHAR_WIDTH - self.scroll.x,
                    b.top + LINE_HEIGHT - self.scroll.y,
                ))
            })
            .collect()
    }

    fn scroll_offset(&self) -> ScrollOffset {
        self.scroll
    }

    fn selection(&self) -> Option<Selection> {
        let range = self.selection?;
        Some(Selection {
            text: self.range_text(&range),
            range,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_paragraphs() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let p1 = doc.append_element(body, "p", &[]);
        let first = doc.append_text(p1, "hello world");
        let p2 = doc.append_element(body, "p", &[]);
        let second = doc.append_text(p2, "second line");
        (doc, first, second)
    }

    #[test]
    fn blocks_start_new_lines() {
        let (doc, first, second) = two_paragraphs();
        let r1 = doc.client_rects(&TextRange::within(first, 0, 5));
        let r2 = doc.client_rects(&TextRange::within(second, 0, 6));
        assert_eq!(r1, vec![Rect::new(0.0, 0.0, 40.0, 20.0)]);
        assert_eq!(r2, vec![Rect::new(0.0, 20.0, 48.0, 40.0)]);
    }

    #[test]
    fn inline_elements_continue_the_line() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "see ");
        let a = doc.append_element(p, "a", &[("href", "#")]);
        let link = doc.append_text(a, "this");
        assert_eq!(
            doc.client_rects(&TextRange::within(link, 0, 4)),
            vec![Rect::new(32.0, 0.0, 64.0, 20.0)]
        );
    }

    #[test]
    fn caret_rounds_to_nearest_boundary() {
        let (doc, first, _) = two_paragraphs();
        assert_eq!(
            doc.caret_at(Point::new(11.0, 5.0)),
            Some(Boundary::new(first, 1))
        );
        assert_eq!(
            doc.caret_at(Point::new(13.0, 5.0)),
            Some(Boundary::new(first, 2))
        );
        assert_eq!(doc.caret_at(Point::new(200.0, 5.0)), None);
    }

    #[test]
    fn scroll_shifts_viewport_coordinates() {
        let (mut doc, _, second) = two_paragraphs();
        doc.set_scroll(ScrollOffset::new(0.0, 20.0));
        assert_eq!(
            doc.caret_at(Point::new(1.0, 5.0)),
            Some(Boundary::new(second, 0))
        );
    }

    #[test]
    fn selection_text_spans_nodes() {
        let (mut doc, first, second) = two_paragraphs();
        doc.select(TextRange::new(Boundary::new(first, 6), Boundary::new(second, 6)));
        let selection = doc.selection().unwrap();
        assert_eq!(selection.text, "worldsecond");
    }

    #[test]
    fn color_inherits_background_does_not() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.append_element(
            body,
            "div",
            &[("style", "color: #ffffff; background-color: rgb(20, 20, 20)")],
        );
        let span = doc.append_element(div, "span", &[]);
        let text = doc.append_text(span, "light");
        let style = doc.computed_style(text);
        assert_eq!(style.color, Rgba::WHITE);
        assert_eq!(style.background_color, Rgba::TRANSPARENT);
    }

    #[test]
    fn display_overrides_tag_default() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span", &[("style", "display: block")]);
        let div = doc.append_element(body, "div", &[("style", "display: inline")]);
        assert!(doc.is_block(span));
        assert!(!doc.is_block(div));
    }
}
