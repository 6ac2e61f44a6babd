//! Word, neighbor and sentence boundaries on a live page.
//!
//! The hovered word is the maximal run of ASCII letters around the caret,
//! looked up inside a single text node. Neighbor words are looked up across
//! the inline text of the enclosing block, with a wider character class so
//! that `don't`, `state-of-the-art` and `2024` count as one token each.

use log::debug;

use crate::dom::{Boundary, NodeId, PageDom, TextRange};
use crate::geometry::Point;

/// Explicit selections longer than this many whitespace-separated tokens are ignored.
pub const MAX_SELECTION_TOKENS: usize = 3;

const SENTENCE_DELIMITERS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// A located word and the range it occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WordHit {
    pub range: TextRange,
    pub text: String,
}

/// Neighbor words on each side of a word, closest first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub left: Vec<WordHit>,
    pub right: Vec<WordHit>,
}

impl Neighbors {
    /// The `n`-th closest word on each side (0-based), left then right.
    #[must_use]
    pub fn ring(&self, n: usize) -> Vec<&WordHit> {
        self.left.get(n).into_iter().chain(self.right.get(n)).collect()
    }
}

fn is_word_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_neighbor_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '\''
}

/// Char boundaries `[start, end)` of the ASCII-letter run touching `offset`.
///
/// Any offset inside (or at either edge of) the same run yields the same
/// boundaries. `None` when no letter touches the offset.
#[must_use]
pub fn word_bounds(text: &str, offset: usize) -> Option<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let offset = offset.min(chars.len());

    let mut start = offset;
    while start > 0 && is_word_letter(chars[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < chars.len() && is_word_letter(chars[end]) {
        end += 1;
    }

    (start != end).then_some((start, end))
}

/// The word around a caret position.
pub fn word_at<D: PageDom + ?Sized>(dom: &D, caret: Boundary) -> Option<WordHit> {
    let text = dom.text(caret.node)?;
    let (start, end) = word_bounds(text, caret.offset)?;
    Some(WordHit {
        range: TextRange::within(caret.node, start, end),
        text: crate::dom::char_slice(text, start, end),
    })
}

/// The word under a viewport point, `None` over images, whitespace or chrome.
pub fn word_at_point<D: PageDom + ?Sized>(dom: &D, point: Point) -> Option<WordHit> {
    let caret = dom.caret_at(point)?;
    word_at(dom, caret)
}

/// The sentence around a caret, limited to the caret's text node.
///
/// The range ends after the closing delimiter when there is one and starts
/// after the previous delimiter's trailing whitespace.
pub fn sentence_at<D: PageDom + ?Sized>(dom: &D, caret: Boundary) -> Option<TextRange> {
    let chars: Vec<char> = dom.text(caret.node)?.chars().collect();
    let offset = caret.offset.min(chars.len());

    let mut start = offset;
    while start > 0 && !SENTENCE_DELIMITERS.contains(&chars[start - 1]) {
        start -= 1;
    }
    while start < offset && chars[start].is_whitespace() {
        start += 1;
    }

    let mut end = offset;
    while end < chars.len() && !SENTENCE_DELIMITERS.contains(&chars[end]) {
        end += 1;
    }
    if end < chars.len() {
        end += 1;
    }

    (end > start).then(|| TextRange::within(caret.node, start, end))
}

/// Inline text of one block flattened into a single character run.
struct InlineRun {
    chars: Vec<char>,
    /// `(node, first char index in the run, char count)`.
    segments: Vec<(NodeId, usize, usize)>,
}

impl InlineRun {
    fn collect<D: PageDom + ?Sized>(dom: &D, block: NodeId) -> Self {
        let mut run = Self {
            chars: Vec::new(),
            segments: Vec::new(),
        };
        for &child in dom.children(block) {
            run.visit(dom, child);
        }
        run
    }

    fn visit<D: PageDom + ?Sized>(&mut self, dom: &D, node: NodeId) {
        if let Some(text) = dom.text(node) {
            let start = self.chars.len();
            self.chars.extend(text.chars());
            self.segments.push((node, start, self.chars.len() - start));
            return;
        }
        // Nested blocks are separate paragraphs.
        if dom.is_block(node) || matches!(dom.tag_name(node), Some("script" | "style")) {
            return;
        }
        for &child in dom.children(node) {
            self.visit(dom, child);
        }
    }

    fn position_of(&self, boundary: Boundary) -> Option<usize> {
        self.segments
            .iter()
            .find(|(node, _, _)| *node == boundary.node)
            .map(|(_, start, len)| start + boundary.offset.min(*len))
    }

    fn boundary_at(&self, pos: usize, is_end: bool) -> Option<Boundary> {
        self.segments.iter().find_map(|&(node, start, len)| {
            let inside = if is_end {
                pos > start && pos <= start + len
            } else {
                pos >= start && pos < start + len
            };
            inside.then(|| Boundary::new(node, pos - start))
        })
    }

    fn hit(&self, start: usize, end: usize) -> Option<WordHit> {
        Some(WordHit {
            range: TextRange::new(self.boundary_at(start, false)?, self.boundary_at(end, true)?),
            text: self.chars[start..end].iter().collect(),
        })
    }

    fn scan_left(&self, mut pos: usize, k: usize) -> Vec<WordHit> {
        let mut words = Vec::new();
        while words.len() < k {
            while pos > 0 && !is_neighbor_char(self.chars[pos - 1]) {
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
            let end = pos;
            while pos > 0 && is_neighbor_char(self.chars[pos - 1]) {
                pos -= 1;
            }
            words.extend(self.hit(pos, end));
        }
        words
    }

    fn scan_right(&self, mut pos: usize, k: usize) -> Vec<WordHit> {
        let len = self.chars.len();
        let mut words = Vec::new();
        while words.len() < k {
            while pos < len && !is_neighbor_char(self.chars[pos]) {
                pos += 1;
            }
            if pos == len {
                break;
            }
            let start = pos;
            while pos < len && is_neighbor_char(self.chars[pos]) {
                pos += 1;
            }
            words.extend(self.hit(start, pos));
        }
        words
    }
}

/// Up to `k` words on each side of `word`, crossing inline element
/// boundaries but never leaving the nearest block ancestor.
pub fn neighbor_words<D: PageDom + ?Sized>(dom: &D, word: &TextRange, k: usize) -> Neighbors {
    if k == 0 {
        return Neighbors::default();
    }
    let block = dom.block_ancestor(word.start.node);
    let run = InlineRun::collect(dom, block);

    let (Some(mut start), Some(mut end)) = (run.position_of(word.start), run.position_of(word.end))
    else {
        debug!("Word range is outside its block's inline run");
        return Neighbors::default();
    };

    // Swallow the rest of a token such as "don't" so it is not its own neighbor.
    while start > 0 && is_neighbor_char(run.chars[start - 1]) {
        start -= 1;
    }
    while end < run.chars.len() && is_neighbor_char(run.chars[end]) {
        end += 1;
    }

    Neighbors {
        left: run.scan_left(start, k),
        right: run.scan_right(end, k),
    }
}

/// Normalises an explicit selection, or rejects it.
///
/// Accepted selections are non-empty, contain only ASCII letters and
/// whitespace, and have at most [`MAX_SELECTION_TOKENS`] space-separated
/// tokens. Only `' '` separates tokens, so every extra space counts and a
/// line break does not.
#[must_use]
pub fn validate_selection(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    {
        return None;
    }
    if trimmed.split(' ').count() > MAX_SELECTION_TOKENS {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn every_offset_in_a_run_gives_the_same_word() {
        for offset in 0..=12 {
            assert_eq!(word_bounds("unbelievable", offset), Some((0, 12)), "offset {offset}");
        }
    }

    #[test]
    fn word_bounds_stop_at_non_letters() {
        let text = "an e-mail, x2y";
        assert_eq!(word_bounds(text, 1), Some((0, 2)));
        assert_eq!(word_bounds(text, 5), Some((5, 9)));
        assert_eq!(word_bounds(text, 3), Some((3, 4)));
        assert_eq!(word_bounds(text, 13), Some((13, 14)));
        assert_eq!(word_bounds("  ", 1), None);
        assert_eq!(word_bounds("", 0), None);
    }

    #[test]
    fn word_at_point_over_text_and_gap() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let text = doc.append_text(p, "hello world");

        let hit = word_at_point(&doc, doc.point_at(text, 8).unwrap()).unwrap();
        assert_eq!(hit.text, "world");
        assert_eq!(hit.range, TextRange::within(text, 6, 11));

        assert_eq!(word_at_point(&doc, Point::new(500.0, 500.0)), None);
    }

    #[test]
    fn neighbors_cross_inline_elements_closest_first() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        doc.append_text(p, "one two ");
        let em = doc.append_element(p, "em", &[]);
        let middle = doc.append_text(em, "three");
        doc.append_text(p, " four, don't five");

        let word = TextRange::within(middle, 0, 5);
        let neighbors = neighbor_words(&doc, &word, 3);
        let left: Vec<_> = neighbors.left.iter().map(|w| w.text.as_str()).collect();
        let right: Vec<_> = neighbors.right.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(left, vec!["two", "one"]);
        assert_eq!(right, vec!["four", "don't", "five"]);
        assert_eq!(doc.range_text(&neighbors.right[1].range), "don't");
    }

    #[test]
    fn neighbors_stop_at_block_boundaries() {
        let mut doc = Document::new();
        let body = doc.body();
        let p1 = doc.append_element(body, "p", &[]);
        doc.append_text(p1, "previous paragraph");
        let p2 = doc.append_element(body, "p", &[]);
        let text = doc.append_text(p2, "alone");
        let p3 = doc.append_element(body, "p", &[]);
        doc.append_text(p3, "next paragraph");

        let neighbors = neighbor_words(&doc, &TextRange::within(text, 0, 5), 2);
        assert_eq!(neighbors, Neighbors::default());
    }

    #[test]
    fn neighbor_ring_pairs_sides() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let text = doc.append_text(p, "a b c d e");
        let neighbors = neighbor_words(&doc, &TextRange::within(text, 4, 5), 2);
        let ring: Vec<_> = neighbors.ring(1).iter().map(|w| w.text.clone()).collect();
        assert_eq!(ring, vec!["a", "e"]);
    }

    #[test]
    fn sentence_includes_closing_delimiter() {
        let mut doc = Document::new();
        let body = doc.body();
        let p = doc.append_element(body, "p", &[]);
        let text = doc.append_text(p, "First one. Second one! Third");
        let range = sentence_at(&doc, Boundary::new(text, 14)).unwrap();
        assert_eq!(doc.range_text(&range), "Second one!");
        let last = sentence_at(&doc, Boundary::new(text, 25)).unwrap();
        assert_eq!(doc.range_text(&last), "Third");
    }

    #[test]
    fn selection_rules() {
        assert_eq!(validate_selection("  run "), Some("run".to_string()));
        assert_eq!(
            validate_selection("one two three"),
            Some("one two three".to_string())
        );
        assert_eq!(validate_selection("hello, world"), None);
        assert_eq!(validate_selection("one two three four"), None);
        assert_eq!(validate_selection("café"), None);
        assert_eq!(validate_selection("   "), None);
    }

    #[test]
    fn selection_tokens_are_split_on_single_spaces() {
        assert_eq!(
            validate_selection("one two\nthree four"),
            Some("one two\nthree four".to_string())
        );
        assert_eq!(validate_selection("one  two three"), None);
    }
}
