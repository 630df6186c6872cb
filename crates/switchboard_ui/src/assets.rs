//! Asset providers.
//!
//! Invisible nodes that publish shared resources over the bus. Every node's
//! default handler merges FONT and VISUALS payloads into its local store, so
//! after one pump the whole tree can read the same keys.

use std::path::Path;

use switchboard_bus::{Payload, ResponseKind};

use crate::element::{ElementBuilder, ElementTree, NodeId};
use crate::error::{UiError, UiResult};
use crate::style::{Color, FontFace, LocalStore};

/// Directory fonts are resolved against.
pub const ASSET_DIR: &str = "assets";

/// Key the font descriptor is published under.
pub const FONT_KEY: &str = "font";

/// Default palette as `(key, color)` pairs.
pub const DEFAULT_PALETTE: &[(&str, Color)] = &[
    ("frame.active", Color::rgb(0, 60, 116)),
    ("frame.inactive", Color::rgb(161, 161, 146)),
    ("frame.border", Color::rgb(200, 200, 146)),
    ("font.color", Color::WHITE),
    // bevel
    ("bevel.high", Color::WHITE),
    ("bevel.face", Color::rgb(236, 233, 216)),
    ("bevel.shadow", Color::rgb(172, 168, 153)),
    ("bevel.dark", Color::rgb(128, 128, 112)),
    // titlebar
    ("title.active", Color::rgb(0, 60, 116)),
    ("title.inactive", Color::rgb(161, 161, 146)),
    ("title.text", Color::WHITE),
    // content
    ("content.bg", Color::rgb(236, 233, 216)),
    // buttons
    ("button.face", Color::rgb(236, 233, 216)),
    ("button.hover", Color::rgb(220, 220, 205)),
    ("button.pressed", Color::rgb(180, 180, 170)),
    ("button.disabled", Color::rgb(200, 200, 200)),
    ("button.text", Color::BLACK),
    ("button.text.disabled", Color::rgb(128, 128, 128)),
    // input fields
    ("input.bg", Color::WHITE),
    ("input.border", Color::rgb(128, 128, 112)),
    ("input.text", Color::BLACK),
    ("input.placeholder", Color::rgb(160, 160, 160)),
    // selection
    ("selection.bg", Color::rgb(0, 60, 116)),
    ("selection.text", Color::WHITE),
];

fn provider(tree: &mut ElementTree, name: &str, kind: &'static str) -> NodeId {
    tree.create(ElementBuilder::new(name).kind(kind).rect(1, 1, 10, 10).hidden())
}

/// Snapshot of a provider's store, sent as the broadcast payload.
fn announce(tree: &ElementTree, id: NodeId) -> UiResult<LocalStore> {
    tree.store(id).cloned().ok_or(UiError::StaleNode(id))
}

/// Publishes a font descriptor to the tree.
///
/// Glyph loading is left to the renderer; only the descriptor travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontProvider {
    id: NodeId,
}

impl FontProvider {
    /// Creates the (detached, hidden) provider node.
    pub fn create(tree: &mut ElementTree) -> Self {
        Self {
            id: provider(tree, "FontProvider", "Font"),
        }
    }

    /// Node id of the provider.
    #[must_use]
    pub const fn id(self) -> NodeId {
        self.id
    }

    /// Stores the descriptor for `name` at `size` and broadcasts FONT.
    ///
    /// Returns whether the broadcast went out (the provider must be attached
    /// under a bus-enabled root).
    ///
    /// # Errors
    ///
    /// `StaleNode` if the provider was destroyed.
    pub fn initialize(self, tree: &mut ElementTree, name: &str, size: u32) -> UiResult<bool> {
        let face = FontFace {
            name: name.to_owned(),
            size,
            path: Path::new(ASSET_DIR).join(name).to_string_lossy().into_owned(),
        };
        tracing::debug!(font = %face.name, size, "font provider initialized");
        tree.write_local(self.id, FONT_KEY, face)?;

        let store = announce(tree, self.id)?;
        Ok(tree.broadcast(self.id, ResponseKind::Font, Some(Payload::new(store)), false))
    }
}

/// Publishes the default palette to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualsProvider {
    id: NodeId,
}

impl VisualsProvider {
    /// Creates the (detached, hidden) provider node.
    pub fn create(tree: &mut ElementTree) -> Self {
        Self {
            id: provider(tree, "VisualsProvider", "Visuals"),
        }
    }

    /// Node id of the provider.
    #[must_use]
    pub const fn id(self) -> NodeId {
        self.id
    }

    /// Stores [`DEFAULT_PALETTE`] and broadcasts VISUALS.
    ///
    /// # Errors
    ///
    /// `StaleNode` if the provider was destroyed.
    pub fn initialize(self, tree: &mut ElementTree) -> UiResult<bool> {
        for (key, color) in DEFAULT_PALETTE {
            tree.write_local(self.id, *key, *color)?;
        }
        tracing::debug!(entries = DEFAULT_PALETTE.len(), "visuals provider initialized");

        let store = announce(tree, self.id)?;
        Ok(tree.broadcast(self.id, ResponseKind::Visuals, Some(Payload::new(store)), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolkitConfig;
    use crate::style::Value;

    #[test]
    fn test_providers_share_assets_after_pump() {
        let mut tree = ElementTree::new(&ToolkitConfig::default());
        let root = tree.root();
        let fonts = FontProvider::create(&mut tree);
        let visuals = VisualsProvider::create(&mut tree);
        let window = tree.create(ElementBuilder::new("window"));
        tree.attach(root, fonts.id()).unwrap();
        tree.attach(root, visuals.id()).unwrap();
        tree.attach(root, window).unwrap();

        assert!(fonts.initialize(&mut tree, "mono.ttf", 15).unwrap());
        assert!(visuals.initialize(&mut tree).unwrap());
        assert!(!tree.has_local(window, "frame.active"), "nothing arrives before the pump");

        tree.pump();

        assert_eq!(tree.store_len(window), DEFAULT_PALETTE.len() + 1);
        assert_eq!(
            tree.store(window).and_then(|store| store.color("selection.bg")),
            Some(Color::rgb(0, 60, 116))
        );
        let font = tree.read_local(window, FONT_KEY).and_then(Value::as_font).unwrap();
        assert_eq!(font.size, 15);
        assert!(font.path.ends_with("mono.ttf"));

        // Providers pick up each other's assets too.
        assert!(tree.has_local(fonts.id(), "frame.active"));
        assert!(tree.has_local(visuals.id(), FONT_KEY));
        assert!(!tree.get(fonts.id()).unwrap().is_visible());
    }

    #[test]
    fn test_detached_provider_does_not_broadcast() {
        let mut tree = ElementTree::new(&ToolkitConfig::default());
        let visuals = VisualsProvider::create(&mut tree);
        assert!(!visuals.initialize(&mut tree).unwrap());
        assert_eq!(tree.store_len(visuals.id()), DEFAULT_PALETTE.len());
    }
}
