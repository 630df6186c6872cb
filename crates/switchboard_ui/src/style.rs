//! Flat per-node key/value store and the values it holds.
//!
//! There is no theme engine: shared colors and fonts are just entries that
//! providers broadcast and every node merges into its own store.

use std::collections::BTreeMap;

use serde::Serialize;

/// RGBA color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Alpha component.
    pub a: u8,
}

impl Color {
    /// Solid black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Solid white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Creates a color from RGBA values.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from RGB values with full alpha.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Creates a color from a hex value (0xRRGGBB).
    #[must_use]
    pub const fn hex(hex: u32) -> Self {
        let [_, r, g, b] = hex.to_be_bytes();
        Self::rgb(r, g, b)
    }

    /// Returns a new color with different alpha.
    #[must_use]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::rgba(self.r, self.g, self.b, a)
    }
}

/// Descriptor of a font made available by a provider.
///
/// Glyph loading is the renderer's business; the tree only passes this along.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FontFace {
    /// File name, e.g. `JetBrainsMono-Bold.ttf`.
    pub name: String,
    /// Point size.
    pub size: u32,
    /// Where the renderer should load it from.
    pub path: String,
}

/// A value in a local store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A color.
    Color(Color),
    /// A font descriptor.
    Font(FontFace),
    /// Free text.
    Text(String),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A flag.
    Bool(bool),
}

impl Value {
    /// Returns the color, if this is one.
    #[must_use]
    pub const fn as_color(&self) -> Option<Color> {
        match self {
            Self::Color(color) => Some(*color),
            _ => None,
        }
    }

    /// Returns the font, if this is one.
    #[must_use]
    pub const fn as_font(&self) -> Option<&FontFace> {
        match self {
            Self::Font(font) => Some(font),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Color> for Value {
    fn from(color: Color) -> Self {
        Self::Color(color)
    }
}

impl From<FontFace> for Value {
    fn from(font: FontFace) -> Self {
        Self::Font(font)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Named values local to one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocalStore {
    entries: BTreeMap<String, Value>,
}

impl LocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a value.
    #[must_use]
    pub fn read(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Reads a color value.
    #[must_use]
    pub fn color(&self, key: &str) -> Option<Color> {
        self.read(key).and_then(Value::as_color)
    }

    /// Writes a value, replacing any previous one.
    pub fn write(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Checks whether `key` is present.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of `other` into this store, overwriting on conflict.
    pub fn merge(&mut self, other: &Self) {
        self.entries
            .extend(other.entries.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::hex(0x00_3C_74), Color::rgb(0, 60, 116));
        assert_eq!(Color::WHITE.with_alpha(0).a, 0);
    }

    #[test]
    fn test_store_merge_overwrites() {
        let mut mine = LocalStore::new();
        mine.write("frame.active", Color::BLACK);
        mine.write("keep", 1_i64);

        let mut theirs = LocalStore::new();
        theirs.write("frame.active", Color::WHITE);
        theirs.write("font.color", Color::WHITE);

        mine.merge(&theirs);
        assert_eq!(mine.len(), 3);
        assert_eq!(mine.color("frame.active"), Some(Color::WHITE));
        assert!(mine.has("keep"));

        mine.clear();
        assert!(mine.is_empty());
    }

    #[test]
    fn test_value_accessors() {
        let font = FontFace {
            name: "mono.ttf".into(),
            size: 15,
            path: "assets/mono.ttf".into(),
        };
        assert_eq!(Value::from(font.clone()).as_font(), Some(&font));
        assert_eq!(Value::from("hi").as_text(), Some("hi"));
        assert_eq!(Value::from(true).as_color(), None);
    }
}
