//! # Address Bus
//!
//! In-process mailbox that routes messages to registered nodes by address,
//! or to all of them at once.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  post()   ┌─────────────┐  pump()   ┌─────────────┐
//! │  Producer   │──────────>│   Pending   │──────────>│  Registered │
//! │ (any node)  │           │    Queue    │ snapshot  │   Handlers  │
//! └─────────────┘           └─────────────┘           └─────────────┘
//!       ^                                                    │
//!       └──────────── posts made during dispatch ────────────┘
//!                       land in the NEXT pump
//! ```
//!
//! The registry only stores node handles. Whether a handle still points at a
//! live node is always asked of the host (see [`crate::Mailbox`]), so the bus
//! never keeps a node alive.

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::address::Address;
use crate::message::Message;

/// Deliveries between two cleanup passes unless configured otherwise.
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 1000;

/// One registry entry.
#[derive(Clone, Debug)]
pub struct Registration<N, H> {
    /// Weak handle to the node. Liveness is checked by the host.
    pub node: N,
    /// Cached handler capability. `None` means "addressable, never handles".
    pub handler: Option<H>,
    /// Name used in diagnostics.
    pub label: Arc<str>,
}

/// A resolved delivery target, snapshotted before dispatch.
#[derive(Clone, Debug)]
pub struct Route<N, H> {
    /// Address being delivered to.
    pub address: Address,
    /// Node handle registered at that address.
    pub node: N,
    /// Handler to invoke.
    pub handler: H,
    /// Name used in diagnostics.
    pub label: Arc<str>,
}

/// Counters describing bus activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Messages waiting for the next pump.
    pub pending: usize,
    /// Live-or-stale registry entries.
    pub registered: usize,
    /// Successful deliveries since creation.
    pub delivered: u64,
    /// Deliveries whose handler failed since creation.
    pub failed: u64,
    /// Cleanup passes run since creation.
    pub cleanups: u64,
}

/// Cloneable producer handle onto a bus queue.
///
/// Lets code that does not own the bus enqueue messages. They are delivered
/// at the owner's next pump.
#[derive(Clone, Debug)]
pub struct Poster {
    sender: Sender<Message>,
}

impl Poster {
    /// Enqueues a message.
    ///
    /// Returns `false` only if the bus has been dropped.
    #[inline]
    pub fn post(&self, message: Message) -> bool {
        trace_post(&message);
        self.sender.send(message).is_ok()
    }

    /// Returns the number of messages waiting.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.sender.len()
    }
}

fn trace_post(message: &Message) {
    if message.is_broadcast() {
        tracing::debug!(from = %message.sender(), kind = %message.kind(), "broadcast");
    } else {
        tracing::debug!(
            from = %message.sender(),
            to = %message.receiver(),
            kind = %message.kind(),
            "message"
        );
    }
}

/// Address allocator, pending queue and weak registry.
///
/// `N` is the host's node handle (checked for liveness by the host), `H` the
/// cached handler capability.
#[derive(Debug)]
pub struct AddressBus<N, H> {
    /// Producer end of the pending queue.
    sender: Sender<Message>,
    /// Consumer end, drained by `pump`.
    receiver: Receiver<Message>,
    /// Address -> registration, in ascending address order.
    registry: BTreeMap<Address, Registration<N, H>>,
    /// Next address to hand out.
    next_address: Address,
    /// Deliveries between cleanup passes.
    cleanup_threshold: usize,
    /// Deliveries since the last cleanup pass.
    since_cleanup: usize,
    delivered: u64,
    failed: u64,
    cleanups: u64,
}

impl<N: Copy, H: Clone> AddressBus<N, H> {
    /// Creates a bus that runs a cleanup pass every `cleanup_threshold` deliveries.
    #[must_use]
    pub fn new(cleanup_threshold: usize) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            registry: BTreeMap::new(),
            next_address: Address::FIRST,
            cleanup_threshold: cleanup_threshold.max(1),
            since_cleanup: 0,
            delivered: 0,
            failed: 0,
            cleanups: 0,
        }
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Registers `node` and returns its address.
    ///
    /// A node that already has an address keeps it; only the handle and the
    /// cached handler are refreshed. Otherwise the next unused address is
    /// allocated.
    pub fn register(
        &mut self,
        node: N,
        current: Option<Address>,
        handler: Option<H>,
        label: &str,
    ) -> Address {
        let address = match current {
            Some(address) => address,
            None => self.allocate(),
        };

        tracing::debug!(
            address = %address,
            node = label,
            handler = handler.is_some(),
            "register"
        );

        self.registry.insert(
            address,
            Registration {
                node,
                handler,
                label: Arc::from(label),
            },
        );
        address
    }

    /// Removes the registration at `address`.
    ///
    /// No-op for `None` or an address that is not registered.
    pub fn unregister(&mut self, address: Option<Address>) -> bool {
        let Some(address) = address else {
            return false;
        };
        match self.registry.remove(&address) {
            Some(registration) => {
                tracing::debug!(address = %address, node = &*registration.label, "unregister");
                true
            }
            None => false,
        }
    }

    /// Returns the registration at `address`.
    #[must_use]
    pub fn registration(&self, address: Address) -> Option<&Registration<N, H>> {
        self.registry.get(&address)
    }

    /// Checks whether `address` has a registry entry (live or stale).
    #[must_use]
    pub fn is_registered(&self, address: Address) -> bool {
        self.registry.contains_key(&address)
    }

    /// Number of registry entries.
    #[must_use]
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Snapshot of every registered handle.
    #[must_use]
    pub fn handles(&self) -> Vec<(Address, N)> {
        self.registry
            .iter()
            .map(|(address, registration)| (*address, registration.node))
            .collect()
    }

    /// Removes the given addresses from the registry. Returns how many existed.
    pub fn purge(&mut self, addresses: &[Address]) -> usize {
        addresses
            .iter()
            .filter(|address| self.registry.remove(*address).is_some())
            .count()
    }

    /// Drops every registration whose node is no longer live.
    pub fn cleanup(&mut self, mut is_live: impl FnMut(N) -> bool) -> usize {
        let before = self.registry.len();
        self.registry.retain(|_, registration| is_live(registration.node));
        self.finish_cleanup(before - self.registry.len())
    }

    pub(crate) fn finish_cleanup(&mut self, purged: usize) -> usize {
        self.cleanups += 1;
        self.since_cleanup = 0;
        tracing::debug!(purged, remaining = self.registry.len(), "bus cleanup");
        purged
    }

    fn allocate(&mut self) -> Address {
        let address = self.next_address;
        self.next_address = address.successor();
        address
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Enqueues a message. The queue is unbounded, so this always succeeds.
    pub fn post(&self, message: Message) -> bool {
        trace_post(&message);
        self.sender.send(message).is_ok()
    }

    /// Creates a producer handle onto this bus.
    #[must_use]
    pub fn poster(&self) -> Poster {
        Poster {
            sender: self.sender.clone(),
        }
    }

    /// Detaches everything pending right now.
    ///
    /// Messages posted afterwards stay queued for the next drain.
    #[must_use]
    pub fn drain(&self) -> Vec<Message> {
        let pending = self.receiver.len();
        self.receiver.try_iter().take(pending).collect()
    }

    /// Discards all pending messages. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            tracing::debug!(dropped, "bus cleared");
        }
        dropped
    }

    /// Number of messages waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    // =========================================================================
    // Dispatch support
    // =========================================================================

    /// Resolves the delivery targets of `message`.
    ///
    /// Broadcasts resolve to every registration with a handler, in ascending
    /// address order. Unicasts resolve to at most the exact receiver.
    /// Registrations without a handler are skipped silently.
    #[must_use]
    pub fn routes(&self, message: &Message) -> Vec<Route<N, H>> {
        let to_route = |(address, registration): (&Address, &Registration<N, H>)| {
            registration.handler.as_ref().map(|handler| Route {
                address: *address,
                node: registration.node,
                handler: handler.clone(),
                label: Arc::clone(&registration.label),
            })
        };

        if message.is_broadcast() {
            self.registry.iter().filter_map(to_route).collect()
        } else {
            self.registry
                .get_key_value(&message.receiver())
                .and_then(to_route)
                .into_iter()
                .collect()
        }
    }

    /// Records the outcome of one pump.
    ///
    /// Returns `true` when enough deliveries accumulated for a cleanup pass.
    pub fn record(&mut self, delivered: usize, failed: usize) -> bool {
        self.delivered += delivered as u64;
        self.failed += failed as u64;
        self.since_cleanup += delivered;
        self.since_cleanup >= self.cleanup_threshold
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        BusStats {
            pending: self.pending(),
            registered: self.registry.len(),
            delivered: self.delivered,
            failed: self.failed,
            cleanups: self.cleanups,
        }
    }
}

impl<N: Copy, H: Clone> Default for AddressBus<N, H> {
    fn default() -> Self {
        Self::new(DEFAULT_CLEANUP_THRESHOLD)
    }
}
