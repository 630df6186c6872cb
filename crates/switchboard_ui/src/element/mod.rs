//! Element tree: the node type, its identifiers and flags.
//!
//! Nodes live in an arena owned by [`ElementTree`]. Everything else (parents,
//! children, the bus registry) refers to them by [`NodeId`], which goes stale
//! the moment the node is destroyed.

mod events;
mod messaging;
mod metadata;
mod tree;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use switchboard_bus::Address;

use crate::layout::Rect;
use crate::style::LocalStore;

pub use events::{Listener, ListenerId, ListenerKind, UpdateHook};
pub use messaging::{DefaultHandler, HandlerRef, MessageHandler};
pub use metadata::Metadata;
pub use tree::{ElementBus, ElementTree};

/// Unique identifier for a node.
///
/// - Lower 32 bits: slot index in the arena
/// - Upper 32 bits: generation, bumped every time the slot is freed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a node id from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Node state flags (bitfield).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementFlags(u32);

impl ElementFlags {
    /// Node has focus among its siblings.
    pub const ACTIVE: u32 = 1 << 0;
    /// Node is drawn.
    pub const VISIBLE: u32 = 1 << 1;
    /// Node needs redraw.
    pub const REDRAW: u32 = 1 << 2;
    /// Node was destroyed. Never cleared.
    pub const DISPOSED: u32 = 1 << 3;
    /// Node ignores input and lets it fall through.
    pub const PASSTHROUGH: u32 = 1 << 4;
    /// Destruction is in progress.
    const TEARDOWN: u32 = 1 << 5;

    /// Default flags for a new node.
    pub const DEFAULT: Self = Self(Self::VISIBLE | Self::REDRAW);

    /// Returns true if the flag is set.
    #[inline]
    #[must_use]
    pub const fn has(self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Sets a flag.
    #[inline]
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Clears a flag. `DISPOSED` cannot be cleared.
    #[inline]
    pub fn clear(&mut self, flag: u32) {
        self.0 &= !(flag & !Self::DISPOSED);
    }

    /// Sets or clears a flag.
    #[inline]
    pub fn assign(&mut self, flag: u32, on: bool) {
        if on {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }
}

/// A node of the element tree.
pub struct Element {
    pub(crate) name: String,
    pub(crate) kind: &'static str,
    /// Local rect, relative to the parent.
    pub(crate) rect: Rect,
    pub(crate) parent: Option<NodeId>,
    /// Front-most child last.
    pub(crate) children: Vec<NodeId>,
    pub(crate) address: Option<Address>,
    pub(crate) flags: ElementFlags,
    pub(crate) depth: usize,
    pub(crate) store: LocalStore,
    pub(crate) handler: Option<HandlerRef>,
    pub(crate) listeners: Vec<(ListenerKind, ListenerId, Listener)>,
    pub(crate) update_hooks: Vec<(ListenerId, UpdateHook)>,
    /// Absolute rect, `None` until read after an invalidation.
    pub(crate) absolute: Cell<Option<Rect>>,
    /// Memoized root of this node.
    pub(crate) root: Cell<Option<NodeId>>,
}

impl Element {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// Local rect, relative to the parent.
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    /// Parent, if attached.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children, back to front.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Bus address, once registered.
    #[must_use]
    pub const fn address(&self) -> Option<Address> {
        self.address
    }

    /// Distance from the root of its tree.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Local key/value store.
    #[must_use]
    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Whether the node takes part in messaging.
    #[must_use]
    pub const fn handles_messages(&self) -> bool {
        self.handler.is_some()
    }

    /// Whether the node has focus among its siblings.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.flags.has(ElementFlags::ACTIVE)
    }

    /// Whether the node is drawn.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.flags.has(ElementFlags::VISIBLE)
    }

    /// Whether the node was destroyed.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.flags.has(ElementFlags::DISPOSED)
    }

    /// Whether input falls through this node.
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        self.flags.has(ElementFlags::PASSTHROUGH)
    }

    /// Whether the node needs redraw.
    #[must_use]
    pub const fn needs_redraw(&self) -> bool {
        self.flags.has(ElementFlags::REDRAW)
    }

    /// Whether the absolute rect is currently cached.
    #[must_use]
    pub fn has_cached_rect(&self) -> bool {
        self.absolute.get().is_some()
    }

    pub(crate) fn forget_caches(&mut self) {
        self.absolute.set(None);
        self.root.set(None);
        self.flags.set(ElementFlags::REDRAW);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rect", &self.rect)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("address", &self.address)
            .field("flags", &self.flags)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

/// Describes a node before it is inserted into a tree.
pub struct ElementBuilder {
    name: String,
    kind: &'static str,
    rect: Rect,
    visible: bool,
    passthrough: bool,
    handler: Option<HandlerRef>,
}

impl ElementBuilder {
    /// Default size of a new element.
    pub const DEFAULT_SIZE: (i32, i32) = (128, 64);

    /// Starts a plain element with the default handler.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let (width, height) = Self::DEFAULT_SIZE;
        Self {
            name: name.into(),
            kind: "Element",
            rect: Rect::new(0, 0, width, height),
            visible: true,
            passthrough: false,
            handler: Some(Rc::new(DefaultHandler)),
        }
    }

    /// Sets the type tag reported in metadata.
    #[must_use]
    pub fn kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }

    /// Sets position and size relative to the parent.
    #[must_use]
    pub fn rect(mut self, x: i32, y: i32, width: i32, height: i32) -> Self {
        self.rect = Rect::new(x, y, width, height);
        self
    }

    /// Makes the node invisible.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Makes input fall through the node.
    #[must_use]
    pub fn passthrough(mut self) -> Self {
        self.passthrough = true;
        self
    }

    /// Replaces the message handler.
    #[must_use]
    pub fn handler(mut self, handler: HandlerRef) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Opts the node out of messaging. It stays addressable for metadata.
    #[must_use]
    pub fn without_handler(mut self) -> Self {
        self.handler = None;
        self
    }

    pub(crate) fn build(self) -> Element {
        let mut flags = ElementFlags::DEFAULT;
        flags.assign(ElementFlags::VISIBLE, self.visible);
        flags.assign(ElementFlags::PASSTHROUGH, self.passthrough);
        Element {
            name: self.name,
            kind: self.kind,
            rect: self.rect,
            parent: None,
            children: Vec::new(),
            address: None,
            flags,
            depth: 0,
            store: LocalStore::new(),
            handler: self.handler,
            listeners: Vec::new(),
            update_hooks: Vec::new(),
            absolute: Cell::new(None),
            root: Cell::new(None),
        }
    }
}
