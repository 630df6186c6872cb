//! Input routing, activation and per-frame update.
//!
//! Events travel depth-first, children before their parent and the most
//! recently added (front-most) child first. The first node that reports the
//! event as handled stops propagation.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::{Element, ElementFlags, ElementTree, NodeId};
use crate::error::{UiError, UiResult};
use crate::input::{InputEvent, MouseButton};

/// Callback fired for an input notification.
pub type Listener = Rc<dyn Fn(&mut ElementTree, NodeId, &InputEvent)>;

/// Callback run for every node on every frame update.
pub type UpdateHook = Rc<dyn Fn(&mut ElementTree, NodeId, Duration)>;

/// Notifications a node can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Left button pressed inside the node.
    Click,
    /// Pointer moved inside the node.
    Hover,
    /// Node became active.
    Focus,
    /// Node stopped being active.
    Blur,
    /// Key pressed while the node is active.
    Keypress,
}

/// Handle returned when adding a listener or hook; used to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

impl ElementTree {
    fn next_listener_id(&mut self) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        id
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Adds a listener for `kind` notifications of `id`.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn add_listener(
        &mut self,
        id: NodeId,
        kind: ListenerKind,
        listener: impl Fn(&mut Self, NodeId, &InputEvent) + 'static,
    ) -> UiResult<ListenerId> {
        if !self.contains(id) {
            return Err(UiError::StaleNode(id));
        }
        let handle = self.next_listener_id();
        let listener: Listener = Rc::new(listener);
        if let Some(element) = self.get_mut(id) {
            element.listeners.push((kind, handle, listener));
        }
        Ok(handle)
    }

    /// Removes a listener or update hook. Returns whether it existed.
    pub fn remove_listener(&mut self, id: NodeId, handle: ListenerId) -> bool {
        let Some(element) = self.get_mut(id) else {
            return false;
        };
        let before = element.listeners.len() + element.update_hooks.len();
        element.listeners.retain(|(_, existing, _)| *existing != handle);
        element.update_hooks.retain(|(existing, _)| *existing != handle);
        before != element.listeners.len() + element.update_hooks.len()
    }

    /// Adds a hook run by [`ElementTree::update`] for `id`.
    ///
    /// # Errors
    ///
    /// `StaleNode` for dead ids.
    pub fn add_update_hook(
        &mut self,
        id: NodeId,
        hook: impl Fn(&mut Self, NodeId, Duration) + 'static,
    ) -> UiResult<ListenerId> {
        if !self.contains(id) {
            return Err(UiError::StaleNode(id));
        }
        let handle = self.next_listener_id();
        let hook: UpdateHook = Rc::new(hook);
        if let Some(element) = self.get_mut(id) {
            element.update_hooks.push((handle, hook));
        }
        Ok(handle)
    }

    /// Fires every `kind` listener of `id` with `event`.
    pub fn trigger(&mut self, id: NodeId, kind: ListenerKind, event: &InputEvent) {
        let listeners: Vec<Listener> = match self.get(id) {
            Some(element) => element
                .listeners
                .iter()
                .filter(|(k, _, _)| *k == kind)
                .map(|(_, _, listener)| Rc::clone(listener))
                .collect(),
            None => return,
        };
        for listener in listeners {
            listener(self, id, event);
        }
    }

    // =========================================================================
    // Input routing
    // =========================================================================

    /// Routes `event` through the subtree of `id`.
    ///
    /// Returns `true` once some node handled it.
    pub fn handle_event(&mut self, id: NodeId, event: &InputEvent) -> bool {
        if self.is_disposed(id) {
            return false;
        }
        for child in self.children(id).to_vec().into_iter().rev() {
            if self.handle_event(child, event) {
                return true;
            }
        }
        self.process_event(id, event)
    }

    fn process_event(&mut self, id: NodeId, event: &InputEvent) -> bool {
        let Some(element) = self.get(id) else {
            return false;
        };
        if element.is_passthrough() {
            return false;
        }
        let active = element.is_active();

        match *event {
            InputEvent::MouseDown {
                button: MouseButton::Left,
                x,
                y,
            } => self.process_mouse_button(id, x, y, event),
            InputEvent::MouseMotion { x, y } => {
                if self.is_inside(id, x, y) {
                    self.trigger(id, ListenerKind::Hover, event);
                    true
                } else {
                    false
                }
            }
            InputEvent::KeyDown { .. } if active => {
                self.trigger(id, ListenerKind::Keypress, event);
                true
            }
            _ => false,
        }
    }

    fn process_mouse_button(&mut self, id: NodeId, x: i32, y: i32, event: &InputEvent) -> bool {
        if self.is_inside(id, x, y) {
            if let Some(parent) = self.parent(id) {
                self.deactivate_children(parent, Some(id));
            }
            if !self.get(id).is_some_and(Element::is_active) {
                self.set_active(id, true);
                self.trigger(id, ListenerKind::Focus, event);
            }
            self.trigger(id, ListenerKind::Click, event);
            true
        } else {
            if self.get(id).is_some_and(Element::is_active) {
                self.set_active(id, false);
                self.trigger(id, ListenerKind::Blur, event);
            }
            false
        }
    }

    fn set_active(&mut self, id: NodeId, active: bool) {
        if let Some(element) = self.get_mut(id) {
            element.flags.assign(ElementFlags::ACTIVE, active);
            element.flags.set(ElementFlags::REDRAW);
        }
    }

    // =========================================================================
    // Activation
    // =========================================================================

    /// Makes `id` the active node among its siblings.
    ///
    /// Returns `false` if it already was active or is gone.
    pub fn activate(&mut self, id: NodeId) -> bool {
        match self.get(id) {
            Some(element) if !element.is_active() && !element.is_disposed() => {}
            _ => return false,
        }
        if let Some(parent) = self.parent(id) {
            self.deactivate_children(parent, Some(id));
        }
        self.set_active(id, true);
        self.trigger(id, ListenerKind::Focus, &InputEvent::User);
        true
    }

    /// Deactivates `id`, firing blur. Returns `false` if it was not active.
    pub fn deactivate(&mut self, id: NodeId) -> bool {
        if !self.get(id).is_some_and(Element::is_active) {
            return false;
        }
        self.set_active(id, false);
        self.trigger(id, ListenerKind::Blur, &InputEvent::User);
        true
    }

    /// Deactivates every active child of `parent` except `except`.
    pub fn deactivate_children(&mut self, parent: NodeId, except: Option<NodeId>) {
        for child in self.children(parent).to_vec() {
            if Some(child) != except {
                self.deactivate(child);
            }
        }
    }

    // =========================================================================
    // Z-order and hit testing
    // =========================================================================

    /// Moves `id` to the front of its siblings (drawn last, hit first).
    pub fn bring_to_front(&mut self, id: NodeId) {
        self.reorder(id, true);
    }

    /// Moves `id` to the back of its siblings.
    pub fn send_to_back(&mut self, id: NodeId) {
        self.reorder(id, false);
    }

    fn reorder(&mut self, id: NodeId, front: bool) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        let Some(element) = self.get_mut(parent) else {
            return;
        };
        element.children.retain(|child| *child != id);
        if front {
            element.children.push(id);
        } else {
            element.children.insert(0, id);
        }
        self.invalidate(parent);
    }

    /// Whether `(x, y)` falls inside the absolute rect of `id`.
    #[must_use]
    pub fn is_inside(&self, id: NodeId, x: i32, y: i32) -> bool {
        self.absolute_rect(id).is_some_and(|rect| rect.contains(x, y))
    }

    /// Whether `(x, y)` hits `id` or any of its descendants. Hidden nodes
    /// never contain anything.
    #[must_use]
    pub fn contains_point(&self, id: NodeId, x: i32, y: i32) -> bool {
        if !self.get(id).is_some_and(Element::is_visible) {
            return false;
        }
        self.is_inside(id, x, y)
            || self
                .children(id)
                .iter()
                .any(|child| self.contains_point(*child, x, y))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Runs update hooks for `id` and then its subtree.
    pub fn update(&mut self, id: NodeId, dt: Duration) {
        let hooks: Vec<UpdateHook> = match self.get(id) {
            Some(element) if !element.is_disposed() => {
                element.update_hooks.iter().map(|(_, hook)| Rc::clone(hook)).collect()
            }
            _ => return,
        };
        for hook in hooks {
            hook(self, id, dt);
        }
        for child in self.children(id).to_vec() {
            self.update(child, dt);
        }
    }
}
