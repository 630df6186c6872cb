//! Bus integration for element nodes.
//!
//! The tree is the bus host: it answers liveness for registered [`NodeId`]s and
//! routes each delivery to the node's [`MessageHandler`]. Handlers get the tree
//! mutably, so they may post, attach, detach or destroy mid-pump.

use std::rc::Rc;

use switchboard_bus::{Address, AddressBus, Mailbox, Message, Payload, ResponseKind};

use super::{ElementTree, NodeId};
use crate::error::{UiError, UiResult};
use crate::style::LocalStore;

/// Per-node message handling.
///
/// Specialized nodes override a few kinds and hand everything else to
/// [`ElementTree::handle_default`].
pub trait MessageHandler {
    /// Handles `message` on behalf of `node`.
    ///
    /// # Errors
    ///
    /// Any error is logged by the pump; delivery to other nodes continues.
    fn handle_message(&self, tree: &mut ElementTree, node: NodeId, message: &Message) -> UiResult<()>;
}

impl<F> MessageHandler for F
where
    F: Fn(&mut ElementTree, NodeId, &Message) -> UiResult<()>,
{
    fn handle_message(&self, tree: &mut ElementTree, node: NodeId, message: &Message) -> UiResult<()> {
        self(tree, node, message)
    }
}

/// Shared handler reference cached by the bus.
pub type HandlerRef = Rc<dyn MessageHandler>;

/// Handler of a plain element.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl MessageHandler for DefaultHandler {
    fn handle_message(&self, tree: &mut ElementTree, node: NodeId, message: &Message) -> UiResult<()> {
        tree.handle_default(node, message)
    }
}

impl Mailbox for ElementTree {
    type Handle = NodeId;
    type Handler = HandlerRef;
    type Error = UiError;

    fn bus_mut(&mut self) -> Option<&mut AddressBus<NodeId, HandlerRef>> {
        self.bus.as_mut()
    }

    fn is_live(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|element| !element.is_disposed())
    }

    fn deliver(&mut self, node: NodeId, handler: &HandlerRef, message: &Message) -> UiResult<()> {
        handler.handle_message(self, node, message)
    }
}

impl ElementTree {
    /// Sends a message from `from` to `receiver`.
    ///
    /// Only nodes hanging under a bus-enabled root can post. With `priority`
    /// the bus is pumped synchronously right after enqueueing.
    ///
    /// Returns `false` if nothing was posted.
    pub fn post(
        &mut self,
        from: NodeId,
        receiver: Address,
        kind: ResponseKind,
        payload: Option<Payload>,
        priority: bool,
    ) -> bool {
        if !self.is_connected(from) {
            return false;
        }
        let (Some(sender), Some(bus)) = (self.address(from), self.bus.as_ref()) else {
            return false;
        };
        bus.post(Message::new(receiver, sender, kind).with_optional_payload(payload));
        if priority {
            self.pump();
        }
        true
    }

    /// Broadcasts from `from`. See [`ElementTree::post`].
    pub fn broadcast(
        &mut self,
        from: NodeId,
        kind: ResponseKind,
        payload: Option<Payload>,
        priority: bool,
    ) -> bool {
        self.post(from, Address::BROADCAST, kind, payload, priority)
    }

    /// Drains and dispatches the bus queue. Returns successful deliveries.
    pub fn pump(&mut self) -> usize {
        switchboard_bus::pump(self)
    }

    /// Default reaction of `node` to `message`.
    ///
    /// Ignores messages the node sent itself and anything arriving after
    /// disposal.
    ///
    /// # Errors
    ///
    /// `UnexpectedPayload` if FONT or VISUALS arrive without a [`LocalStore`].
    pub fn handle_default(&mut self, node: NodeId, message: &Message) -> UiResult<()> {
        let Some(element) = self.get(node) else {
            return Ok(());
        };
        if element.is_disposed() || element.address == Some(message.sender()) {
            return Ok(());
        }

        match message.kind() {
            ResponseKind::Get => {
                tracing::debug!(node = %element.name, to = %message.sender(), "sending metadata");
                let metadata = self.metadata(node).map(Payload::new);
                self.post(node, message.sender(), ResponseKind::Data, metadata, false);
            }
            kind @ (ResponseKind::Font | ResponseKind::Visuals) => {
                let entries = message
                    .payload_as::<LocalStore>()
                    .ok_or(UiError::UnexpectedPayload { kind })?;
                self.merge_local(node, entries)?;
            }
            ResponseKind::Reset => self.invalidate(node),
            ResponseKind::Clear => self.clear_store(node, false),
            ResponseKind::Terminate => {
                self.destroy(node);
            }
            ResponseKind::Ok | ResponseKind::Error | ResponseKind::Disposed | ResponseKind::Data => {}
        }
        Ok(())
    }
}
