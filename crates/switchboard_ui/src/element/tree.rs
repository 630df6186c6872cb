//! Element tree for hierarchical UI management.
//!
//! The tree is a generational arena: it owns every node, parents and children
//! refer to each other by [`NodeId`], and destroying a node frees its slot so
//! every outstanding id (including the bus registry's) goes stale.

use std::fmt;

use switchboard_bus::{Address, AddressBus, Payload, ResponseKind};

use super::{Element, ElementBuilder, ElementFlags, HandlerRef, NodeId};
use crate::config::ToolkitConfig;
use crate::error::{UiError, UiResult};
use crate::layout::Rect;
use crate::style::{LocalStore, Value};

/// The bus type owned by a tree's root.
pub type ElementBus = AddressBus<NodeId, HandlerRef>;

/// Arena slot.
struct Slot {
    generation: u32,
    element: Option<Element>,
}

/// Owns every node of one UI and the bus routing between them.
pub struct ElementTree {
    slots: Vec<Slot>,
    /// Freed slot indices, reused LIFO.
    free: Vec<u32>,
    root: NodeId,
    /// Present while the root is alive and bus-enabled.
    pub(crate) bus: Option<ElementBus>,
    max_depth: usize,
    pub(crate) next_listener: u64,
}

impl ElementTree {
    /// Creates a tree whose root owns a bus.
    #[must_use]
    pub fn new(config: &ToolkitConfig) -> Self {
        let root = ElementBuilder::new(config.window.title.clone())
            .kind("Root")
            .rect(0, 0, config.window.width, config.window.height);
        Self::with_root(config, root)
    }

    /// Creates a bus-enabled tree with a custom root node.
    #[must_use]
    pub fn with_root(config: &ToolkitConfig, root: ElementBuilder) -> Self {
        let mut tree = Self::bare(config, root);
        tree.bus = Some(AddressBus::new(config.bus.cleanup_threshold));
        tree.register(tree.root);
        tree
    }

    /// Creates a tree whose root has no bus. Posting is a no-op everywhere.
    #[must_use]
    pub fn without_bus(config: &ToolkitConfig) -> Self {
        let root = ElementBuilder::new(config.window.title.clone())
            .kind("Root")
            .rect(0, 0, config.window.width, config.window.height);
        Self::bare(config, root)
    }

    fn bare(config: &ToolkitConfig, root: ElementBuilder) -> Self {
        let mut tree = Self {
            slots: Vec::with_capacity(64),
            free: Vec::new(),
            root: NodeId::new(0, 0),
            bus: None,
            max_depth: config.tree.max_depth,
            next_listener: 1,
        };
        tree.root = tree.insert(root.build());
        tree
    }

    // =========================================================================
    // Arena
    // =========================================================================

    /// Creates a detached node and returns its id.
    pub fn create(&mut self, builder: ElementBuilder) -> NodeId {
        self.insert(builder.build())
    }

    fn insert(&mut self, element: Element) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.element = Some(element);
            NodeId::new(index, slot.generation)
        } else {
            let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
            self.slots.push(Slot {
                generation: 0,
                element: Some(element),
            });
            NodeId::new(index, 0)
        }
    }

    fn remove(&mut self, id: NodeId) -> Option<Element> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let element = slot.element.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(element)
    }

    /// Gets a node by id. `None` once the node is destroyed.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.element.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.element.as_mut())
    }

    fn element(&self, id: NodeId) -> UiResult<&Element> {
        self.get(id).ok_or(UiError::StaleNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> UiResult<&mut Element> {
        self.get_mut(id).ok_or(UiError::StaleNode(id))
    }

    /// Whether `id` resolves to a node.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Whether the arena is empty (only after the root was destroyed).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The root node of this tree.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Deepest allowed nesting.
    #[must_use]
    pub const fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// The bus, while the root is alive and bus-enabled.
    #[must_use]
    pub const fn bus(&self) -> Option<&ElementBus> {
        self.bus.as_ref()
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Element::parent)
    }

    /// Children of `id`, back to front. Empty for stale ids.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[][..], Element::children)
    }

    /// Bus address of `id`, once registered.
    #[must_use]
    pub fn address(&self, id: NodeId) -> Option<Address> {
        self.get(id).and_then(Element::address)
    }

    /// Depth of `id`.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.get(id).map(Element::depth)
    }

    /// Whether `id` was destroyed (stale ids count as destroyed).
    #[must_use]
    pub fn is_disposed(&self, id: NodeId) -> bool {
        self.get(id).map_or(true, Element::is_disposed)
    }

    /// Finds the node registered at `address`, if it is still live.
    #[must_use]
    pub fn find_by_address(&self, address: Address) -> Option<NodeId> {
        let node = self.bus.as_ref()?.registration(address)?.node;
        self.contains(node).then_some(node)
    }

    // =========================================================================
    // Hierarchy
    // =========================================================================

    /// Walks up to the topmost ancestor of `id`, memoizing the result.
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> Option<NodeId> {
        let element = self.get(id)?;
        if let Some(root) = element.root.get() {
            if self.contains(root) {
                return Some(root);
            }
        }

        let mut node = id;
        while let Some(parent) = self.parent(node) {
            node = parent;
        }
        element.root.set(Some(node));
        Some(node)
    }

    /// Whether `id` hangs under the bus-enabled root.
    #[must_use]
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.bus.is_some() && self.root_of(id) == Some(self.root)
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut node = Some(id);
        while let Some(current) = node {
            if current == ancestor {
                return true;
            }
            node = self.parent(current);
        }
        false
    }

    /// Depth-first, pre-order ids of the subtree rooted at `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(element) = self.get(node) else {
                continue;
            };
            out.push(node);
            stack.extend(element.children.iter().rev().copied());
        }
        out
    }

    /// Levels below `id` (0 for a leaf).
    fn height(&self, id: NodeId) -> usize {
        self.children(id)
            .iter()
            .map(|child| self.height(*child) + 1)
            .max()
            .unwrap_or(0)
    }

    /// Attaches `child` as the front-most child of `parent`.
    ///
    /// A child attached elsewhere is moved. Depth is recomputed for the whole
    /// moved subtree, caches are invalidated, and if `parent` hangs under the
    /// bus-enabled root the subtree is registered.
    ///
    /// # Errors
    ///
    /// - `SelfAttach`, `CycleDetected` if the tree would stop being a tree
    /// - `DepthOverflow` if the child's depth is already at the maximum, or the
    ///   moved subtree would nest past it; the tree is left unchanged
    /// - `StaleNode`, `Disposed` for dead ids
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> UiResult<()> {
        if parent == child {
            return Err(UiError::SelfAttach(child));
        }
        let (parent_depth, parent_name) = {
            let element = self.element(parent)?;
            if element.is_disposed() {
                return Err(UiError::Disposed(parent));
            }
            (element.depth, element.name.clone())
        };
        let (child_depth, old_parent) = {
            let element = self.element(child)?;
            if element.is_disposed() {
                return Err(UiError::Disposed(child));
            }
            (element.depth, element.parent)
        };

        if old_parent == Some(parent) {
            return Ok(());
        }
        if self.is_ancestor(child, parent) {
            return Err(UiError::CycleDetected { parent, child });
        }
        if child_depth >= self.max_depth {
            return Err(UiError::DepthOverflow {
                depth: child_depth,
                max: self.max_depth,
            });
        }
        let deepest = parent_depth + 1 + self.height(child);
        if deepest > self.max_depth {
            return Err(UiError::DepthOverflow {
                depth: deepest,
                max: self.max_depth,
            });
        }

        if let Some(old_parent) = old_parent {
            self.unlink(old_parent, child);
        }

        self.element_mut(parent)?.children.push(child);
        self.element_mut(child)?.parent = Some(parent);
        self.set_depth(child, parent_depth + 1);

        tracing::debug!(
            parent = %parent_name,
            child = %self.name(child).unwrap_or_default(),
            depth = parent_depth + 1,
            "parenting"
        );

        self.invalidate(parent);
        if self.is_connected(parent) {
            self.register_subtree(child);
        }
        Ok(())
    }

    /// Detaches `child` from `parent`.
    ///
    /// The detached subtree keeps its bus registrations (only `destroy`
    /// unregisters), becomes its own root at depth 0 and is invalidated.
    ///
    /// # Errors
    ///
    /// `NotAChild` if `child` is not attached to `parent`.
    pub fn detach(&mut self, parent: NodeId, child: NodeId) -> UiResult<()> {
        if self.parent(child) != Some(parent) {
            return Err(UiError::NotAChild { parent, child });
        }
        self.unlink(parent, child);
        tracing::debug!(child = %child, parent = %parent, "detached");
        Ok(())
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(element) = self.get_mut(parent) {
            element.children.retain(|c| *c != child);
        }
        if let Some(element) = self.get_mut(child) {
            element.parent = None;
        }
        self.set_depth(child, 0);
        self.invalidate(parent);
        self.invalidate(child);
    }

    fn set_depth(&mut self, id: NodeId, depth: usize) {
        let mut stack = vec![(id, depth)];
        while let Some((node, depth)) = stack.pop() {
            let Some(element) = self.get_mut(node) else {
                continue;
            };
            element.depth = depth;
            stack.extend(element.children.iter().map(|child| (*child, depth + 1)));
        }
    }

    fn register(&mut self, id: NodeId) {
        let Some(element) = self.get(id) else {
            return;
        };
        let (current, handler, name) = (element.address, element.handler.clone(), element.name.clone());
        let Some(bus) = self.bus.as_mut() else {
            return;
        };
        let address = bus.register(id, current, handler, &name);
        if let Some(element) = self.get_mut(id) {
            element.address = Some(address);
        }
    }

    fn register_subtree(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            self.register(node);
        }
    }

    /// Destroys `id` and its whole subtree.
    ///
    /// Order: children first, then unregister, then a priority DISPOSED
    /// broadcast carrying the node's metadata (so others observe it while the
    /// node still exists), then the node is marked disposed, detached and
    /// freed. Destroying the root also tears down the bus.
    ///
    /// Returns `false` if the node was already gone or being destroyed.
    pub fn destroy(&mut self, id: NodeId) -> bool {
        match self.get_mut(id) {
            Some(element) if !element.flags.has(ElementFlags::TEARDOWN) => {
                element.flags.set(ElementFlags::TEARDOWN);
            }
            _ => return false,
        }

        for child in self.children(id).to_vec() {
            self.destroy(child);
        }

        if self.is_connected(id) {
            let address = self.address(id);
            if let Some(bus) = self.bus.as_mut() {
                bus.unregister(address);
            }
        }

        let snapshot = self.metadata(id).map(Payload::new);
        self.post(id, Address::BROADCAST, ResponseKind::Disposed, snapshot, true);

        // A DISPOSED handler may have freed us already.
        let Some(element) = self.get_mut(id) else {
            return true;
        };
        element.flags.set(ElementFlags::DISPOSED);
        let parent = element.parent;
        if let Some(parent) = parent {
            self.unlink(parent, id);
        }
        if let Some(element) = self.get_mut(id) {
            element.children.clear();
            element.parent = None;
        }

        if let Some(element) = self.remove(id) {
            tracing::debug!(node = %element.name, id = %id, "destroyed");
        }

        if id == self.root {
            if let Some(bus) = self.bus.take() {
                bus.clear();
                tracing::info!("root destroyed, bus torn down");
            }
        }
        true
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    /// Local rect of `id`.
    #[must_use]
    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.get(id).map(Element::rect)
    }

    /// Replaces the local rect (size clamped to at least 1) and invalidates
    /// the subtree.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> UiResult<()> {
        self.element_mut(id)?.rect = Rect::new(rect.x, rect.y, rect.width, rect.height);
        self.invalidate(id);
        Ok(())
    }

    /// Moves `id` relative to its parent.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn set_position(&mut self, id: NodeId, x: i32, y: i32) -> UiResult<()> {
        let rect = self.element(id)?.rect.with_position(x, y);
        self.set_rect(id, rect)
    }

    /// Resizes `id`; width and height are clamped to at least 1.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn set_size(&mut self, id: NodeId, width: i32, height: i32) -> UiResult<()> {
        let rect = self.element(id)?.rect.with_size(width, height);
        self.set_rect(id, rect)
    }

    /// Absolute rect of `id`: its local rect offset by the parent's absolute
    /// rect. Cached until the next invalidation of the node or an ancestor.
    #[must_use]
    pub fn absolute_rect(&self, id: NodeId) -> Option<Rect> {
        let element = self.get(id)?;
        if let Some(cached) = element.absolute.get() {
            return Some(cached);
        }

        let absolute = match element.parent.and_then(|parent| self.absolute_rect(parent)) {
            Some(origin) => element.rect.offset(origin.x, origin.y),
            None => element.rect,
        };
        element.absolute.set(Some(absolute));
        Some(absolute)
    }

    /// Clears cached geometry and root memoization of `id` and its subtree.
    /// Recomputation happens lazily on the next read.
    pub fn invalidate(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(element) = self.get_mut(node) else {
                continue;
            };
            element.forget_caches();
            stack.extend_from_slice(&element.children);
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    /// Display name of `id`.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<String> {
        self.get(id).map(|element| element.name.clone())
    }

    /// Shows or hides `id`.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> UiResult<()> {
        let element = self.element_mut(id)?;
        element.flags.assign(ElementFlags::VISIBLE, visible);
        element.flags.set(ElementFlags::REDRAW);
        Ok(())
    }

    /// Lets input fall through `id` (or stops it doing so).
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn set_passthrough(&mut self, id: NodeId, passthrough: bool) -> UiResult<()> {
        self.element_mut(id)?
            .flags
            .assign(ElementFlags::PASSTHROUGH, passthrough);
        Ok(())
    }

    pub(crate) fn mark_drawn(&mut self, id: NodeId) {
        if let Some(element) = self.get_mut(id) {
            element.flags.clear(ElementFlags::REDRAW);
        }
    }

    // =========================================================================
    // Local store
    // =========================================================================

    /// Reads a local value of `id`.
    #[must_use]
    pub fn read_local(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.get(id)?.store.read(key)
    }

    /// Writes a local value of `id`.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn write_local(&mut self, id: NodeId, key: impl Into<String>, value: impl Into<Value>) -> UiResult<()> {
        self.element_mut(id)?.store.write(key, value);
        Ok(())
    }

    /// Whether `id` has a local value under `key`.
    #[must_use]
    pub fn has_local(&self, id: NodeId, key: &str) -> bool {
        self.get(id).is_some_and(|element| element.store.has(key))
    }

    /// Local store of `id`.
    #[must_use]
    pub fn store(&self, id: NodeId) -> Option<&LocalStore> {
        self.get(id).map(Element::store)
    }

    /// Number of local values of `id`.
    #[must_use]
    pub fn store_len(&self, id: NodeId) -> usize {
        self.get(id).map_or(0, |element| element.store.len())
    }

    /// Merges `entries` into the local store of `id`.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn merge_local(&mut self, id: NodeId, entries: &LocalStore) -> UiResult<()> {
        self.element_mut(id)?.store.merge(entries);
        Ok(())
    }

    /// Wipes the local store of `id`, and of its subtree if `recursive`.
    pub fn clear_store(&mut self, id: NodeId, recursive: bool) {
        let targets = if recursive {
            self.descendants(id)
        } else {
            vec![id]
        };
        for node in targets {
            if let Some(element) = self.get_mut(node) {
                element.store.clear();
            }
        }
    }
}

impl fmt::Debug for ElementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementTree")
            .field("root", &self.root)
            .field("nodes", &self.len())
            .field("bus", &self.bus.as_ref().map(AddressBus::stats))
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
