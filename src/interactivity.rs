//! Decides whether a node belongs to something the page itself reacts to.
//!
//! Links, buttons and form controls have their own click and hover
//! semantics, so word lookup stays out of their way unless the user opts in
//! through `allow_interactive_hover`.

use crate::dom::{NodeId, PageDom};

const INTERACTIVE_TAGS: &[&str] = &["a", "button", "summary", "input", "textarea", "select"];

const INTERACTIVE_ROLES: &[&str] = &["button", "link", "menuitem", "tab", "option", "switch"];

/// Labels of "expand" controls that are usually plain spans with a click handler.
const EXPAND_LABELS: &[&str] = &[
    "(more)",
    "more",
    "(more",
    "more)",
    "read more",
    "load more",
    "… more",
    "…more",
    "... more",
    "...more",
    "展开",
    "显示全部",
];

/// Expand labels are only trusted on short elements.
const EXPAND_LABEL_MAX_CHARS: usize = 30;

/// Why an element counts as interactive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractiveKind {
    Tag,
    Role,
    ExpandLabel,
}

/// The interactive element enclosing a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interactive {
    pub element: NodeId,
    pub kind: InteractiveKind,
}

/// First interactive element among `node` and its ancestors, up to and
/// including the nearest block container.
pub fn interactive_ancestor<D: PageDom + ?Sized>(dom: &D, node: NodeId) -> Option<Interactive> {
    let mut current = dom.element_of(node);
    while let Some(element) = current {
        if let Some(kind) = classify(dom, element) {
            return Some(Interactive { element, kind });
        }
        if element == dom.body() || dom.is_block(element) {
            return None;
        }
        current = dom.parent(element);
    }
    None
}

fn classify<D: PageDom + ?Sized>(dom: &D, element: NodeId) -> Option<InteractiveKind> {
    if dom
        .tag_name(element)
        .is_some_and(|tag| INTERACTIVE_TAGS.contains(&tag))
    {
        return Some(InteractiveKind::Tag);
    }

    if dom.attribute(element, "role").is_some_and(|role| {
        let role = role.trim().to_ascii_lowercase();
        INTERACTIVE_ROLES.contains(&role.as_str())
    }) {
        return Some(InteractiveKind::Role);
    }

    if looks_like_expand_control(dom, element) {
        return Some(InteractiveKind::ExpandLabel);
    }

    None
}

fn looks_like_expand_control<D: PageDom + ?Sized>(dom: &D, element: NodeId) -> bool {
    let text = dom.text_content(element);
    let text = text.trim();
    if text.is_empty() || text.chars().count() >= EXPAND_LABEL_MAX_CHARS {
        return false;
    }
    let pointer = dom
        .computed_style(element)
        .cursor
        .is_some_and(|cursor| cursor.eq_ignore_ascii_case("pointer"));
    pointer && is_expand_label(text)
}

/// Case-insensitive exact match against the known expand labels.
#[must_use]
pub fn is_expand_label(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    EXPAND_LABELS.contains(&lowered.as_str())
}

/// Whether lookup applies to a node with the given classification.
#[must_use]
pub fn is_hover_eligible(interactive: Option<&Interactive>, allow_interactive_hover: bool) -> bool {
    interactive.is_none() || allow_interactive_hover
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn page() -> (Document, NodeId) {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let text = doc.append_text(p, "plain words");
        (doc, text)
    }

    #[test]
    fn plain_text_is_not_interactive() {
        let (doc, text) = page();
        assert_eq!(interactive_ancestor(&doc, text), None);
    }

    #[test]
    fn link_text_is_interactive() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let a = doc.append_element(p, "a", &[("href", "/x")]);
        let strong = doc.append_element(a, "strong", &[]);
        let text = doc.append_text(strong, "deep link");

        let found = interactive_ancestor(&doc, text).unwrap();
        assert_eq!(found.element, a);
        assert_eq!(found.kind, InteractiveKind::Tag);
    }

    #[test]
    fn aria_role_counts() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.append_element(body, "div", &[("role", "Tab")]);
        let text = doc.append_text(div, "Overview");
        assert_eq!(
            interactive_ancestor(&doc, text).map(|i| i.kind),
            Some(InteractiveKind::Role)
        );
    }

    #[test]
    fn walk_stops_at_block_container() {
        let mut doc = Document::new();
        let body = doc.body();
        let span = doc.append_element(body, "span", &[("role", "button")]);
        let p = doc.append_element(span, "p", &[]);
        let text = doc.append_text(p, "inside a paragraph");
        assert_eq!(interactive_ancestor(&doc, text), None);
    }

    #[test]
    fn expand_label_needs_pointer_cursor() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let plain = doc.append_element(p, "span", &[]);
        let plain_text = doc.append_text(plain, "Read more");
        let clickable = doc.append_element(p, "span", &[("style", "cursor: pointer")]);
        let clickable_text = doc.append_text(clickable, " Read More ");

        assert_eq!(interactive_ancestor(&doc, plain_text), None);
        assert_eq!(
            interactive_ancestor(&doc, clickable_text).map(|i| i.kind),
            Some(InteractiveKind::ExpandLabel)
        );
    }

    #[test]
    fn expand_labels_are_exact() {
        assert!(is_expand_label("…more"));
        assert!(is_expand_label("展开"));
        assert!(is_expand_label("LOAD MORE"));
        assert!(!is_expand_label("more details"));
    }

    #[test]
    fn gate_follows_setting() {
        let (_, text) = page();
        let link = Interactive {
            element: text,
            kind: InteractiveKind::Tag,
        };
        assert!(is_hover_eligible(None, false));
        assert!(!is_hover_eligible(Some(&link), false));
        assert!(is_hover_eligible(Some(&link), true));
    }
}
