//! # Mailbox
//!
//! The host side of the bus. Whoever owns the nodes (and the bus) implements
//! [`Mailbox`]; [`pump`] drains the queue and dispatches through it.
//!
//! Handlers run with full mutable access to the host, so they may post,
//! attach, detach or destroy while a pump is in progress. Three snapshots make
//! that safe:
//! 1. the queue is detached before dispatch, so new posts wait for the next pump
//! 2. each message's targets are resolved once, before the first delivery
//! 3. every target is checked for liveness right before its handler runs

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::address::Address;
use crate::bus::{AddressBus, Route};
use crate::message::Message;

/// Host that owns registered nodes and the bus routing to them.
pub trait Mailbox {
    /// Weak node handle stored in the registry.
    type Handle: Copy + fmt::Debug;
    /// Handler capability cached per address.
    type Handler: Clone;
    /// Failure reported by a handler.
    type Error: fmt::Display;

    /// The bus, if this host currently has one.
    fn bus_mut(&mut self) -> Option<&mut AddressBus<Self::Handle, Self::Handler>>;

    /// Whether `node` still resolves to a live node.
    fn is_live(&self, node: Self::Handle) -> bool;

    /// Invokes `handler` for `node`.
    ///
    /// # Errors
    ///
    /// Whatever the handler reports. The pump logs it and moves on.
    fn deliver(
        &mut self,
        node: Self::Handle,
        handler: &Self::Handler,
        message: &Message,
    ) -> Result<(), Self::Error>;

    /// Drains and dispatches the pending queue. See [`pump`].
    fn pump(&mut self) -> usize
    where
        Self: Sized,
    {
        pump(self)
    }

    /// Purges registrations whose node is gone. See [`sweep`].
    fn sweep(&mut self) -> usize
    where
        Self: Sized,
    {
        sweep(self)
    }
}

/// Drains the pending queue and delivers every message in post order.
///
/// Broadcasts reach every address that had a handler when that message's
/// delivery began. Stale handles are skipped. A handler that fails or panics
/// is logged and does not stop delivery to anyone else.
///
/// Returns the number of successful deliveries.
pub fn pump<M: Mailbox>(host: &mut M) -> usize {
    let batch = match host.bus_mut() {
        Some(bus) => bus.drain(),
        None => return 0,
    };
    if batch.is_empty() {
        return 0;
    }

    let mut delivered = 0;
    let mut failed = 0;

    for message in &batch {
        // Bus may be torn down by a handler mid-batch.
        let Some(routes) = host.bus_mut().map(|bus| bus.routes(message)) else {
            break;
        };

        for route in routes {
            if !host.is_live(route.node) {
                tracing::trace!(address = %route.address, node = &*route.label, "stale route skipped");
                continue;
            }
            if dispatch(host, &route, message) {
                delivered += 1;
            } else {
                failed += 1;
            }
        }
    }

    let cleanup_due = host
        .bus_mut()
        .is_some_and(|bus| bus.record(delivered, failed));
    if cleanup_due {
        sweep(host);
    }
    delivered
}

/// Removes every registration whose handle no longer resolves.
///
/// Returns the number of purged entries.
pub fn sweep<M: Mailbox>(host: &mut M) -> usize {
    let handles = match host.bus_mut() {
        Some(bus) => bus.handles(),
        None => return 0,
    };
    let dead: Vec<Address> = handles
        .into_iter()
        .filter(|(_, node)| !host.is_live(*node))
        .map(|(address, _)| address)
        .collect();

    host.bus_mut().map_or(0, |bus| {
        let purged = bus.purge(&dead);
        bus.finish_cleanup(purged)
    })
}

fn dispatch<M: Mailbox>(
    host: &mut M,
    route: &Route<M::Handle, M::Handler>,
    message: &Message,
) -> bool {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        host.deliver(route.node, &route.handler, message)
    }));

    match outcome {
        Ok(Ok(())) => {
            tracing::trace!(address = %route.address, kind = %message.kind(), "delivered");
            true
        }
        Ok(Err(err)) => {
            tracing::warn!(
                node = &*route.label,
                address = %route.address,
                kind = %message.kind(),
                error = %err,
                "message handler failed"
            );
            false
        }
        Err(panic) => {
            tracing::error!(
                node = &*route.label,
                address = %route.address,
                kind = %message.kind(),
                panic = %panic_text(panic.as_ref()),
                "message handler panicked"
            );
            false
        }
    }
}

fn panic_text(panic: &(dyn Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ResponseKind;
    use std::collections::HashMap;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Behavior {
        Record,
        Fail,
        Panic,
        /// Kills the node with the given handle.
        Kill(u32),
        /// Posts one `Ok` broadcast on every delivery.
        Echo,
    }

    /// Minimal host: nodes are integers, liveness is a map lookup.
    struct Host {
        bus: Option<AddressBus<u32, Behavior>>,
        alive: HashMap<u32, Address>,
        log: Vec<(u32, ResponseKind)>,
    }

    impl Host {
        fn new(threshold: usize) -> Self {
            Self {
                bus: Some(AddressBus::new(threshold)),
                alive: HashMap::new(),
                log: Vec::new(),
            }
        }

        fn spawn(&mut self, node: u32, behavior: Option<Behavior>) -> Address {
            let bus = self.bus.as_mut().unwrap();
            let address = bus.register(node, None, behavior, &format!("node{node}"));
            self.alive.insert(node, address);
            address
        }

        fn post(&self, message: Message) {
            self.bus.as_ref().unwrap().post(message);
        }
    }

    impl Mailbox for Host {
        type Handle = u32;
        type Handler = Behavior;
        type Error = String;

        fn bus_mut(&mut self) -> Option<&mut AddressBus<u32, Behavior>> {
            self.bus.as_mut()
        }

        fn is_live(&self, node: u32) -> bool {
            self.alive.contains_key(&node)
        }

        fn deliver(&mut self, node: u32, handler: &Behavior, message: &Message) -> Result<(), String> {
            match *handler {
                Behavior::Record => {}
                Behavior::Fail => return Err(format!("node{node} refused")),
                Behavior::Panic => panic!("node{node} exploded"),
                Behavior::Kill(victim) => {
                    self.alive.remove(&victim);
                }
                Behavior::Echo => {
                    let me = self.alive[&node];
                    self.post(Message::broadcast(me, ResponseKind::Ok));
                }
            }
            self.log.push((node, message.kind()));
            Ok(())
        }
    }

    #[test]
    fn test_unicast_reaches_only_receiver() {
        let mut host = Host::new(1000);
        let a = host.spawn(1, Some(Behavior::Record));
        let b = host.spawn(2, Some(Behavior::Record));

        host.post(Message::new(a, b, ResponseKind::Get));
        assert_eq!(host.pump(), 1);
        assert_eq!(host.log, vec![(1, ResponseKind::Get)]);
    }

    #[test]
    fn test_nodes_without_handler_are_skipped() {
        let mut host = Host::new(1000);
        let silent = host.spawn(1, None);
        host.spawn(2, Some(Behavior::Record));

        host.post(Message::new(silent, silent, ResponseKind::Get));
        host.post(Message::broadcast(silent, ResponseKind::Reset));
        assert_eq!(host.pump(), 1);
        assert_eq!(host.log, vec![(2, ResponseKind::Reset)]);
    }

    #[test]
    fn test_failures_do_not_halt_delivery() {
        let mut host = Host::new(1000);
        let a = host.spawn(1, Some(Behavior::Fail));
        host.spawn(2, Some(Behavior::Panic));
        host.spawn(3, Some(Behavior::Record));

        host.post(Message::broadcast(a, ResponseKind::Reset));
        host.post(Message::broadcast(a, ResponseKind::Clear));

        assert_eq!(host.pump(), 2);
        assert_eq!(host.log, vec![(3, ResponseKind::Reset), (3, ResponseKind::Clear)]);

        let stats = host.bus.as_ref().unwrap().stats();
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.failed, 4);
    }

    #[test]
    fn test_kill_during_broadcast_skips_only_the_dead() {
        let mut host = Host::new(1000);
        let killer = host.spawn(1, Some(Behavior::Kill(2)));
        host.spawn(2, Some(Behavior::Record));
        host.spawn(3, Some(Behavior::Record));

        host.post(Message::broadcast(killer, ResponseKind::Terminate));
        assert_eq!(host.pump(), 2);
        assert_eq!(
            host.log,
            vec![(1, ResponseKind::Terminate), (3, ResponseKind::Terminate)]
        );
    }

    #[test]
    fn test_posts_during_dispatch_wait_for_next_pump() {
        let mut host = Host::new(1000);
        let a = host.spawn(1, Some(Behavior::Echo));

        host.post(Message::new(a, a, ResponseKind::Get));
        assert_eq!(host.pump(), 1);
        assert_eq!(host.bus.as_ref().unwrap().pending(), 1);

        // The echo broadcast is delivered now and queues another one.
        assert_eq!(host.pump(), 1);
        assert_eq!(host.bus.as_ref().unwrap().pending(), 1);
    }

    #[test]
    fn test_cleanup_runs_after_threshold() {
        let mut host = Host::new(2);
        let a = host.spawn(1, Some(Behavior::Record));
        let dead = host.spawn(2, None);
        host.alive.remove(&2);

        host.post(Message::new(a, a, ResponseKind::Ok));
        assert_eq!(host.pump(), 1);
        assert!(host.bus.as_ref().unwrap().is_registered(dead));

        host.post(Message::new(a, a, ResponseKind::Ok));
        assert_eq!(host.pump(), 1);
        let bus = host.bus.as_ref().unwrap();
        assert!(!bus.is_registered(dead));
        assert!(bus.is_registered(a));
        assert_eq!(bus.stats().cleanups, 1);
    }

    #[test]
    fn test_pump_without_bus_is_noop() {
        let mut host = Host::new(10);
        host.bus = None;
        assert_eq!(host.pump(), 0);
        assert_eq!(host.sweep(), 0);
    }
}
