use serde::{Deserialize, Serialize};

use crate::metamodel::Category;

/// RGB color with a 0-100 opacity channel (exchange-format convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Opacity in percent, clamped to 0-100.
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Rgba {
            r,
            g,
            b,
            a: a.min(100),
        }
    }

    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Rgba::new(r, g, b, 100)
    }

    /// Parses `#RRGGBB` (case-insensitive, leading `#` optional).
    pub fn from_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Rgba::opaque(r, g, b))
    }

    /// Formats as `#RRGGBB`, dropping the opacity channel.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Rgba::opaque(0, 0, 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    pub size: u32,
    pub color: Rgba,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            name: "Segoe UI".to_owned(),
            size: 9,
            color: Rgba::default(),
        }
    }
}

/// Visual attributes of a node or connection.
///
/// A `None` fill means "use the category default" (see
/// [`Style::default_fill`]); readers that never touch styling keep the
/// defaults untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    pub fill_color: Option<Rgba>,
    pub line_color: Rgba,
    /// Fill opacity in percent.
    pub opacity: u8,
    pub font: Font,
    pub line_width: Option<u8>,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            fill_color: None,
            line_color: Rgba::default(),
            opacity: 100,
            font: Font::default(),
            line_width: None,
        }
    }
}

impl Style {
    /// Conventional fill color for elements of the given category.
    pub fn default_fill(category: Category) -> Rgba {
        let hex = match category {
            Category::Strategy => "#F5DEAA",
            Category::Business => "#FFFFB5",
            Category::Application => "#B5FFFF",
            Category::Technology | Category::Physical => "#C9E7B7",
            Category::Motivation => "#CCCCFF",
            Category::Implementation => "#FFE0E0",
            Category::Relationship => "#0000FF",
            Category::Junction => "#000000",
            Category::Other => "#FFFFFF",
        };
        // The table above only holds well-formed colors.
        Rgba::from_hex(hex).unwrap_or_default()
    }
}
