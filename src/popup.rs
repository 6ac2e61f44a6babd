//! Popup card markup.
//!
//! The surface injects these fragments as the popup's inner HTML, so every
//! piece of page or provider text goes through [`escape_html`].

use std::fmt::Write;

use crate::colorize::{Segment, colorize_text, colorize_word, record_tokens};
use crate::effect::PopupBody;
use crate::gateway::EtymologyRecord;

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The gloss shown after the word: `(translation)`, or `...` without one.
#[must_use]
pub fn translation_label(record: Option<&EtymologyRecord>) -> String {
    match record
        .and_then(|r| r.translation.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        Some(translation) => format!("({translation})"),
        None => "...".to_string(),
    }
}

fn render_segments(segments: &[Segment]) -> String {
    let mut html = String::new();
    for segment in segments {
        let text = escape_html(&segment.text);
        match segment.part {
            Some(part) => {
                let _ = write!(html, "<span class=\"{}\">{text}</span>", part.class());
            }
            None => html.push_str(&text),
        }
    }
    html
}

fn part_line(label: &str, class: &str, value: &str) -> String {
    format!(
        "<div class=\"ety-line\"><span class=\"ety-label\">{label}</span>\
         <span class=\"{class}\">{}</span></div>",
        escape_html(value.trim())
    )
}

/// Inner HTML of the popup for one state.
#[must_use]
pub fn render_card(word: &str, body: &PopupBody) -> String {
    let escaped_word = escape_html(word);
    match body {
        PopupBody::Loading => format!(
            "<div class=\"ety-card ety-loading\">\
             <div class=\"ety-title\">{escaped_word}</div>\
             <div class=\"ety-loader\"></div>\
             <div class=\"ety-status\">Analyzing etymology...</div>\
             </div>"
        ),
        PopupBody::Failed(message) => format!(
            "<div class=\"ety-card ety-failed\">\
             <div class=\"ety-title\">{escaped_word}</div>\
             <div class=\"ety-error\">Lookup failed: {}</div>\
             </div>",
            escape_html(message)
        ),
        PopupBody::Resolved(record) => {
            let title = render_segments(&colorize_word(word, record));
            let desc = render_segments(&colorize_text(&record.desc, &record_tokens(record)));
            format!(
                "<div class=\"ety-card ety-resolved\">\
                 <div class=\"ety-title\">{title} \
                 <span class=\"ety-translation\">{}</span></div>\
                 {}{}{}\
                 <div class=\"ety-desc\">{desc}</div>\
                 </div>",
                escape_html(&translation_label(Some(record))),
                part_line("Prefix", "ety-prefix", &record.prefix),
                part_line("Root", "ety-root", &record.root),
                part_line("Suffix", "ety-suffix", &record.suffix),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"Tom\" & 'Jerry'</b>"),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn loading_card() {
        let html = render_card("run", &PopupBody::Loading);
        assert!(html.contains("ety-loader"));
        assert!(html.contains("Analyzing etymology..."));
    }

    #[test]
    fn error_card_shows_message_verbatim() {
        let html = render_card(
            "run",
            &PopupBody::Failed("API error: <quota>".to_string()),
        );
        assert!(html.contains("Lookup failed: API error: &lt;quota&gt;"));
    }

    #[test]
    fn resolved_card_tags_parts() {
        let record = EtymologyRecord {
            prefix: "un- (not)".to_string(),
            root: "believ".to_string(),
            suffix: "-able".to_string(),
            desc: "un- + believ + -able".to_string(),
            translation: Some("incredible".to_string()),
        };
        let html = render_card("unbelievable", &PopupBody::Resolved(record));
        assert!(html.contains("<span class=\"ety-prefix\">un</span>"));
        assert!(html.contains("<span class=\"ety-root\">believ</span>"));
        assert!(html.contains("(incredible)"));
        assert!(html.contains("un- (not)"));
    }

    #[test]
    fn missing_translation_shows_ellipsis() {
        assert_eq!(translation_label(None), "...");
        let record = EtymologyRecord {
            translation: Some("  ".to_string()),
            ..EtymologyRecord::default()
        };
        assert_eq!(translation_label(Some(&record)), "...");
    }
}
