//! Computed-style values the engine inspects: colors, background image,
//! cursor and display.

use std::sync::LazyLock;

use regex::Regex;

static RGB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*([\d.]+)\s*)?\)$")
        .expect("Failed to compile rgb color regex")
});

/// An sRGB color with alpha in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);
    pub const WHITE: Rgba = Rgba::opaque(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0.0,
    };

    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub const fn with_alpha(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `rgb()`, `rgba()`, `#rgb`, `#rrggbb` and a few keywords.
    #[must_use]
    pub fn parse(value: &str) -> Option<Rgba> {
        let value = value.trim().to_ascii_lowercase();
        if let Some(caps) = RGB_RE.captures(&value) {
            let channel = |i: usize| -> Option<u8> {
                caps.get(i)
                    .and_then(|m| m.as_str().parse::<u16>().ok())
                    .map(|v| v.min(255) as u8)
            };
            let a = match caps.get(4) {
                Some(m) => m.as_str().parse::<f32>().ok()?.clamp(0.0, 1.0),
                None => 1.0,
            };
            return Some(Rgba::with_alpha(channel(1)?, channel(2)?, channel(3)?, a));
        }
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        match value.as_str() {
            "black" => Some(Rgba::BLACK),
            "white" => Some(Rgba::WHITE),
            "transparent" => Some(Rgba::TRANSPARENT),
            "red" => Some(Rgba::opaque(255, 0, 0)),
            "green" => Some(Rgba::opaque(0, 128, 0)),
            "blue" => Some(Rgba::opaque(0, 0, 255)),
            "gray" | "grey" => Some(Rgba::opaque(128, 128, 128)),
            "yellow" => Some(Rgba::opaque(255, 255, 0)),
            _ => None,
        }
    }

    /// Perceived brightness on a 0-255 scale (`0.299R + 0.587G + 0.114B`).
    #[must_use]
    pub fn brightness(&self) -> f64 {
        f64::from(self.r) * 0.299 + f64::from(self.g) * 0.587 + f64::from(self.b) * 0.114
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let expand = |c: char| -> Option<u8> {
        let v = c.to_digit(16)? as u8;
        Some(v * 16 + v)
    };
    match hex.len() {
        3 => {
            let mut chars = hex.chars();
            Some(Rgba::opaque(
                expand(chars.next()?)?,
                expand(chars.next()?)?,
                expand(chars.next()?)?,
            ))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            Some(Rgba::opaque(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

/// The subset of an element's computed style the engine reads.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    /// Foreground color; inherited, so always resolved.
    pub color: Rgba,
    pub background_color: Rgba,
    /// `None` when the computed value is `none`.
    pub background_image: Option<String>,
    pub cursor: Option<String>,
    pub display: Option<String>,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            background_color: Rgba::TRANSPARENT,
            background_image: None,
            cursor: None,
            display: None,
        }
    }
}

/// Splits an inline `style` attribute into lower-cased `(property, value)` pairs.
#[must_use]
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            if prop.is_empty() || value.is_empty() {
                None
            } else {
                Some((prop, value.to_string()))
            }
        })
        .collect()
}
