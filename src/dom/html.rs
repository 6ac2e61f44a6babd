use std::rc::Rc;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Node, NodeData, RcDom};

use super::{Document, NodeId, PageDom};

impl Document {
    /// Builds a page from HTML source.
    ///
    /// Whitespace runs collapse to a single space and whitespace-only text
    /// nodes are dropped, which is close enough to rendered text for word
    /// hit-testing. `<head>`, scripts and comments are not carried over.
    pub fn from_html(html: &str) -> anyhow::Result<Self> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut document = Document::new();
        let body = document.body();
        if let Some(source_body) = find_body(&dom.document) {
            copy_attributes(&source_body, body, &mut document);
            for child in source_body.children.borrow().iter() {
                copy_node(child, body, &mut document);
            }
        }
        Ok(document)
    }
}

fn find_body(node: &Rc<Node>) -> Option<Rc<Node>> {
    if let NodeData::Element { ref name, .. } = node.data {
        if name.local.as_ref() == "body" {
            return Some(Rc::clone(node));
        }
    }
    node.children.borrow().iter().find_map(find_body)
}

fn copy_attributes(source: &Rc<Node>, target: NodeId, document: &mut Document) {
    if let NodeData::Element { ref attrs, .. } = source.data {
        for attr in attrs.borrow().iter() {
            document.set_attribute(target, attr.name.local.as_ref(), &attr.value);
        }
    }
}

fn copy_node(node: &Rc<Node>, parent: NodeId, document: &mut Document) {
    match node.data {
        NodeData::Text { ref contents } => {
            let text = collapse_whitespace(&contents.borrow());
            if !text.trim().is_empty() {
                document.append_text(parent, &text);
            }
        }
        NodeData::Element {
            ref name,
            ref attrs,
            ..
        } => {
            let tag = name.local.as_ref();
            if matches!(tag, "script" | "style" | "head" | "template" | "noscript") {
                return;
            }
            let owned: Vec<(String, String)> = attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect();
            let pairs: Vec<(&str, &str)> = owned
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let id = document.append_element(parent, tag, &pairs);
            for child in node.children.borrow().iter() {
                copy_node(child, id, document);
            }
        }
        _ => {}
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
