//! # Switchboard Address Bus
//!
//! In-process publish/subscribe mailbox for a tree of UI nodes:
//! - Typed, immutable [`Message`]s routed by numeric [`Address`]
//! - Broadcast to every registered handler via [`Address::BROADCAST`]
//! - Weak registrations: the bus stores handles, the host answers liveness
//! - Failure isolation: one failing handler never halts a [`pump`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use switchboard_bus::{Address, Mailbox, Message, ResponseKind};
//!
//! bus.post(Message::broadcast(sender, ResponseKind::Reset));
//! let delivered = host.pump();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod address;
pub mod bus;
pub mod mailbox;
pub mod message;

pub use address::Address;
pub use bus::{AddressBus, BusStats, Poster, Registration, Route, DEFAULT_CLEANUP_THRESHOLD};
pub use mailbox::{pump, sweep, Mailbox};
pub use message::{KindCategory, Message, Payload, ResponseKind};
