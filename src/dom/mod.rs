//! Read-only view of a live page.
//!
//! Everything the interaction engine needs to know about the host page goes
//! through [`PageDom`]: tree navigation, text content, computed styles,
//! hit-testing and range geometry. The browser binding implements it over the
//! real DOM; [`Document`] implements it in memory for tests and the CLI.

mod document;
mod html;
pub mod style;

pub use document::{CHAR_WIDTH, Document, LINE_HEIGHT};
pub use style::{ComputedStyle, Rgba};

use crate::geometry::{Point, Rect, ScrollOffset};

/// Opaque handle of a page node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A position inside a text node, counted in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    #[must_use]
    pub const fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A half-open text range, possibly spanning several text nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl TextRange {
    #[must_use]
    pub const fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// Range inside a single text node.
    #[must_use]
    pub const fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self {
            start: Boundary::new(node, start),
            end: Boundary::new(node, end),
        }
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// The page's current text selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Text as the page stringifies it.
    pub text: String,
    pub range: TextRange,
}

pub trait PageDom {
    /// The `<body>` element; ancestor walks stop here.
    fn body(&self) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn children(&self, node: NodeId) -> &[NodeId];

    /// Text content of a text node, `None` for elements.
    fn text(&self, node: NodeId) -> Option<&str>;

    /// Lower-case tag name of an element, `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    fn computed_style(&self, node: NodeId) -> ComputedStyle;

    /// Whether the element establishes a block box (paragraph boundary).
    fn is_block(&self, node: NodeId) -> bool;

    /// Caret position under a viewport point, if it lands in a text node.
    fn caret_at(&self, point: Point) -> Option<Boundary>;

    /// Viewport rectangles of every line fragment of `range`.
    fn client_rects(&self, range: &TextRange) -> Vec<Rect>;

    fn scroll_offset(&self) -> ScrollOffset;

    fn selection(&self) -> Option<Selection>;

    fn is_text(&self, node: NodeId) -> bool {
        self.text(node).is_some()
    }

    /// Concatenated text of all descendant text nodes, like `innerText`.
    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        collect_text(self, node, &mut out);
        out
    }

    fn bounding_rect(&self, range: &TextRange) -> Option<Rect> {
        Rect::bounding(&self.client_rects(range))
    }

    /// Nearest ancestor (or self) that is a block element.
    fn block_ancestor(&self, node: NodeId) -> NodeId {
        let mut current = if self.is_text(node) {
            self.parent(node)
        } else {
            Some(node)
        };
        while let Some(id) = current {
            if id == self.body() || self.is_block(id) {
                return id;
            }
            current = self.parent(id);
        }
        self.body()
    }

    /// Parent element of a text node, or the node itself for elements.
    fn element_of(&self, node: NodeId) -> Option<NodeId> {
        if self.is_text(node) {
            self.parent(node)
        } else {
            Some(node)
        }
    }
}

fn collect_text<D: PageDom + ?Sized>(dom: &D, node: NodeId, out: &mut String) {
    if let Some(text) = dom.text(node) {
        out.push_str(text);
        return;
    }
    for &child in dom.children(node) {
        collect_text(dom, child, out);
    }
}

/// Characters of `text` between two char offsets.
#[must_use]
pub fn char_slice(text: &str, start: usize, end: usize) -> String {
    text.chars().skip(start).take(end.saturating_sub(start)).collect()
}
