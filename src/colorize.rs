//! Maps a record's prefix, root and suffix back onto text for tagging.

use std::sync::LazyLock;

use regex::Regex;

use crate::gateway::EtymologyRecord;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(.*?\)").expect("Failed to compile parenthesis regex"));

static PART_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i),|;|/| and | or ").expect("Failed to compile part separator regex")
});

static PAREN_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("Failed to compile parenthesis span regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Part {
    Prefix,
    Root,
    Suffix,
}

impl Part {
    /// CSS class of a tagged span.
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            Part::Prefix => "ety-prefix",
            Part::Root => "ety-root",
            Part::Suffix => "ety-suffix",
        }
    }
}

/// A run of text, tagged when it matched a part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub part: Option<Part>,
}

impl Segment {
    fn plain(text: String) -> Self {
        Self { text, part: None }
    }

    fn tagged(text: String, part: Part) -> Self {
        Self {
            text,
            part: Some(part),
        }
    }
}

/// Bare morphemes listed in one record field.
///
/// `"un- (not), in- (not)"` gives `["un", "in"]`; `"none"` gives nothing.
#[must_use]
pub fn extract_parts(text: &str) -> Vec<String> {
    let cleaned = PARENTHESIZED.replace_all(text, " ");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("none") {
        return Vec::new();
    }
    PART_SEPARATOR
        .split(cleaned)
        .map(|part| part.trim().replace('-', ""))
        .filter(|part| !part.is_empty())
        .collect()
}

fn longest_first(mut parts: Vec<String>) -> Vec<Vec<char>> {
    parts.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
    parts.into_iter().map(|p| p.chars().collect()).collect()
}

fn matches_at(haystack: &[char], at: usize, needle: &[char]) -> bool {
    haystack.len() >= at + needle.len()
        && haystack[at..at + needle.len()]
            .iter()
            .zip(needle)
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
}

fn push_segment(segments: &mut Vec<Segment>, text: &[char], part: Option<Part>) {
    if text.is_empty() {
        return;
    }
    let text: String = text.iter().collect();
    match (segments.last_mut(), part) {
        (Some(last), None) if last.part.is_none() => last.text.push_str(&text),
        _ => segments.push(Segment { text, part }),
    }
}

/// Splits `word` into tagged prefix, root and suffix segments.
///
/// Prefixes are peeled from the front and suffixes from the back, longest
/// candidate first, for as long as one matches. The first root candidate
/// found in what remains is tagged. The segments concatenate back to
/// `word` with its original casing.
#[must_use]
pub fn colorize_word(word: &str, record: &EtymologyRecord) -> Vec<Segment> {
    let chars: Vec<char> = word.chars().collect();
    let prefixes = longest_first(extract_parts(&record.prefix));
    let suffixes = longest_first(extract_parts(&record.suffix));
    let roots = longest_first(extract_parts(&record.root));

    let (mut start, mut end) = (0, chars.len());

    let mut leading = Vec::new();
    while let Some(prefix) = prefixes
        .iter()
        .find(|p| p.len() < end - start && matches_at(&chars[..end], start, p))
    {
        leading.push((start, start + prefix.len()));
        start += prefix.len();
    }

    let mut trailing = Vec::new();
    while let Some(suffix) = suffixes
        .iter()
        .find(|s| s.len() < end - start && matches_at(&chars[..end], end - s.len(), s))
    {
        trailing.push((end - suffix.len(), end));
        end -= suffix.len();
    }
    trailing.reverse();

    let mut segments = Vec::new();
    for &(s, e) in &leading {
        push_segment(&mut segments, &chars[s..e], Some(Part::Prefix));
    }

    let middle = &chars[start..end];
    let root = roots.iter().find_map(|root| {
        (0..middle.len())
            .find(|&at| matches_at(middle, at, root))
            .map(|at| (at, at + root.len()))
    });
    match root {
        Some((s, e)) => {
            push_segment(&mut segments, &middle[..s], None);
            push_segment(&mut segments, &middle[s..e], Some(Part::Root));
            push_segment(&mut segments, &middle[e..], None);
        }
        None => push_segment(&mut segments, middle, None),
    }

    for &(s, e) in &trailing {
        push_segment(&mut segments, &chars[s..e], Some(Part::Suffix));
    }
    segments
}

/// Search tokens for description text, each with the part it tags.
#[must_use]
pub fn record_tokens(record: &EtymologyRecord) -> Vec<(String, Part)> {
    let mut tokens = Vec::new();
    for prefix in extract_parts(&record.prefix) {
        tokens.push((format!("{prefix}-"), Part::Prefix));
        tokens.push((prefix, Part::Prefix));
    }
    for root in extract_parts(&record.root) {
        tokens.push((root, Part::Root));
    }
    for suffix in extract_parts(&record.suffix) {
        tokens.push((format!("-{suffix}"), Part::Suffix));
        tokens.push((suffix, Part::Suffix));
    }
    tokens
}

/// Tags every token occurrence in `text`, leftmost-longest and
/// case-insensitively. Parenthesised spans are left alone.
#[must_use]
pub fn colorize_text(text: &str, tokens: &[(String, Part)]) -> Vec<Segment> {
    let mut seen = Vec::new();
    let mut usable: Vec<(Vec<char>, Part)> = Vec::new();
    for (token, part) in tokens {
        let lowered = token.to_lowercase();
        if token.chars().count() <= 1 || lowered == "none" || seen.contains(&lowered) {
            continue;
        }
        seen.push(lowered);
        usable.push((token.chars().collect(), *part));
    }
    usable.sort_by_key(|(chars, _)| std::cmp::Reverse(chars.len()));

    let mut segments = Vec::new();
    let mut last = 0;
    for span in PAREN_SPAN.find_iter(text) {
        tag_chunk(&text[last..span.start()], &usable, &mut segments);
        segments.push(Segment::plain(span.as_str().to_string()));
        last = span.end();
    }
    tag_chunk(&text[last..], &usable, &mut segments);

    // Neighbouring plain runs from different chunks.
    let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(prev) if prev.part.is_none() && segment.part.is_none() => {
                prev.text.push_str(&segment.text);
            }
            _ => merged.push(segment),
        }
    }
    merged
}

fn tag_chunk(chunk: &str, tokens: &[(Vec<char>, Part)], segments: &mut Vec<Segment>) {
    let chars: Vec<char> = chunk.chars().collect();
    let mut plain_start = 0;
    let mut i = 0;
    while i < chars.len() {
        match tokens.iter().find(|(token, _)| matches_at(&chars, i, token)) {
            Some((token, part)) => {
                if plain_start < i {
                    segments.push(Segment::plain(chars[plain_start..i].iter().collect()));
                }
                segments.push(Segment::tagged(
                    chars[i..i + token.len()].iter().collect(),
                    *part,
                ));
                i += token.len();
                plain_start = i;
            }
            None => i += 1,
        }
    }
    if plain_start < chars.len() {
        segments.push(Segment::plain(chars[plain_start..].iter().collect()));
    }
}

/// `un + believ + able` style rendering of a word's segments.
#[must_use]
pub fn breakdown(word: &str, record: &EtymologyRecord) -> String {
    colorize_word(word, record)
        .into_iter()
        .map(|s| s.text)
        .collect::<Vec<_>>()
        .join(" + ")
}
