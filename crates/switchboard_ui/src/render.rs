//! UI rendering.
//!
//! The tree draws nothing itself. [`ElementTree::render`] walks the visible
//! nodes parent-before-children and hands each one to a [`Renderer`] together
//! with its absolute rect and local store, which is where shared colors and
//! fonts end up after the asset broadcasts.

use crate::element::{ElementTree, NodeId};
use crate::layout::Rect;
use crate::style::{Color, FontFace, LocalStore};

/// What a renderer gets to see of one node.
#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a> {
    /// Node being drawn.
    pub id: NodeId,
    /// Display name.
    pub name: &'a str,
    /// Type tag.
    pub kind: &'static str,
    /// Absolute rect in root coordinates.
    pub rect: Rect,
    /// Local store of the node.
    pub store: &'a LocalStore,
}

/// External drawing backend.
pub trait Renderer {
    /// Called by the root before a frame is drawn.
    fn begin_frame(&mut self) {}

    /// Draws one node. Called parent-before-children, back to front.
    fn draw(&mut self, view: &ElementView<'_>);

    /// Called by the root once a frame is drawn.
    fn end_frame(&mut self) {}
}

/// A render command for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Filled rectangle with a one-pixel border.
    Frame {
        /// Bounds.
        bounds: Rect,
        /// Fill color.
        fill: Color,
        /// Border color.
        border: Option<Color>,
    },
    /// Text.
    Label {
        /// Text content.
        text: String,
        /// X position.
        x: i32,
        /// Y position.
        y: i32,
        /// Text color.
        color: Color,
        /// Font to use.
        font: FontFace,
    },
}

/// Renderer that records the default look of every node as commands.
///
/// A node with `frame.active` gets a filled frame (bordered with
/// `frame.border` when present); a node with `font` and `font.color` gets its
/// name as a label inset by 5 pixels.
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<RenderCommand>,
}

impl CommandRecorder {
    /// Label inset from the node's top-left corner.
    pub const LABEL_INSET: i32 = 5;

    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: Vec::with_capacity(256),
        }
    }

    /// Commands recorded since the frame began.
    #[must_use]
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Takes the recorded commands, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Renderer for CommandRecorder {
    fn begin_frame(&mut self) {
        self.commands.clear();
    }

    fn draw(&mut self, view: &ElementView<'_>) {
        if let Some(fill) = view.store.color("frame.active") {
            self.commands.push(RenderCommand::Frame {
                bounds: view.rect,
                fill,
                border: view.store.color("frame.border"),
            });
        }

        let font = view.store.read("font").and_then(|value| value.as_font());
        if let (Some(font), Some(color)) = (font, view.store.color("font.color")) {
            self.commands.push(RenderCommand::Label {
                text: view.name.to_owned(),
                x: view.rect.x + Self::LABEL_INSET,
                y: view.rect.y + Self::LABEL_INSET,
                color,
                font: font.clone(),
            });
        }
    }
}

impl ElementTree {
    /// Draws the subtree of `id`.
    ///
    /// Hidden or disposed nodes are skipped together with their subtree.
    /// Every drawn node has its redraw flag cleared. Returns how many nodes
    /// were drawn.
    pub fn render(&mut self, id: NodeId, renderer: &mut dyn Renderer) -> usize {
        let mut drawn = 0;
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(rect) = self.absolute_rect(node) else {
                continue;
            };
            let Some(element) = self.get(node) else {
                continue;
            };
            if !element.is_visible() || element.is_disposed() {
                continue;
            }

            renderer.draw(&ElementView {
                id: node,
                name: element.name(),
                kind: element.kind(),
                rect,
                store: element.store(),
            });
            stack.extend(element.children().iter().rev().copied());

            self.mark_drawn(node);
            drawn += 1;
        }
        drawn
    }
}
