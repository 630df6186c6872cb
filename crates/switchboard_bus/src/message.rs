//! # Messages
//!
//! The value that travels through the bus. A message is built once and never
//! mutated: receiver, sender, kind and an optional payload.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::address::Address;

/// What a message means.
///
/// Every node's default handler gives each kind the same meaning, so
/// producers never need to know who is listening.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseKind {
    // =========================================================================
    // States
    // =========================================================================
    /// Plain acknowledgement.
    Ok = 0,
    /// Something went wrong on the sender's side.
    Error = 1,
    /// The sender is being destroyed. Payload: its metadata snapshot.
    Disposed = 2,

    // =========================================================================
    // Commands
    // =========================================================================
    /// Invalidate cached geometry of the receiver's subtree.
    Reset = 10,
    /// Destroy the receiver (cascades to its children).
    Terminate = 11,

    // =========================================================================
    // Assets
    // =========================================================================
    /// Wipe the receiver's local store.
    Clear = 20,
    /// A font is available. Payload: key/value pairs to merge.
    Font = 21,
    /// Visual assets are available. Payload: key/value pairs to merge.
    Visuals = 22,

    // =========================================================================
    // Metadata
    // =========================================================================
    /// Ask the receiver for its metadata snapshot.
    Get = 40,
    /// Reply to `Get`. Payload: the metadata snapshot.
    Data = 41,
}

/// Coarse grouping of response kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindCategory {
    /// `Ok`, `Error`, `Disposed`.
    State,
    /// `Reset`, `Terminate`.
    Command,
    /// `Clear`, `Font`, `Visuals`.
    Asset,
    /// `Get`, `Data`.
    Metadata,
}

impl ResponseKind {
    /// All kinds, in code order.
    pub const ALL: [Self; 10] = [
        Self::Ok,
        Self::Error,
        Self::Disposed,
        Self::Reset,
        Self::Terminate,
        Self::Clear,
        Self::Font,
        Self::Visuals,
        Self::Get,
        Self::Data,
    ];

    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Looks a kind up by numeric code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Stable upper-case name used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::Disposed => "DISPOSED",
            Self::Reset => "RESET",
            Self::Terminate => "TERMINATE",
            Self::Clear => "CLEAR",
            Self::Font => "FONT",
            Self::Visuals => "VISUALS",
            Self::Get => "GET",
            Self::Data => "DATA",
        }
    }

    /// Returns the category of this kind.
    #[must_use]
    pub const fn category(self) -> KindCategory {
        match self {
            Self::Ok | Self::Error | Self::Disposed => KindCategory::State,
            Self::Reset | Self::Terminate => KindCategory::Command,
            Self::Clear | Self::Font | Self::Visuals => KindCategory::Asset,
            Self::Get | Self::Data => KindCategory::Metadata,
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-erased, shareable message payload.
#[derive(Clone)]
pub struct Payload(Arc<dyn Any + Send + Sync>);

impl Payload {
    /// Wraps any shareable value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the payload as `T` if that is what it holds.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Payload(..)")
    }
}

/// An immutable bus message.
#[derive(Clone, Debug)]
pub struct Message {
    receiver: Address,
    sender: Address,
    kind: ResponseKind,
    payload: Option<Payload>,
}

impl Message {
    /// Creates a message without payload.
    #[must_use]
    pub const fn new(receiver: Address, sender: Address, kind: ResponseKind) -> Self {
        Self {
            receiver,
            sender,
            kind,
            payload: None,
        }
    }

    /// Creates a broadcast message without payload.
    #[must_use]
    pub const fn broadcast(sender: Address, kind: ResponseKind) -> Self {
        Self::new(Address::BROADCAST, sender, kind)
    }

    /// Returns the message with `payload` attached.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Returns the message with an optional payload attached.
    #[must_use]
    pub fn with_optional_payload(mut self, payload: Option<Payload>) -> Self {
        self.payload = payload;
        self
    }

    /// Destination address (`Address::BROADCAST` for everyone).
    #[inline]
    #[must_use]
    pub const fn receiver(&self) -> Address {
        self.receiver
    }

    /// Originating address.
    #[inline]
    #[must_use]
    pub const fn sender(&self) -> Address {
        self.sender
    }

    /// What the message means.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ResponseKind {
        self.kind
    }

    /// Attached payload, if any.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Borrows the payload as `T`.
    #[must_use]
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(Payload::downcast_ref::<T>)
    }

    /// Checks whether the message goes to every handler.
    #[inline]
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        self.receiver.is_broadcast()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(ResponseKind::Ok.code(), 0);
        assert_eq!(ResponseKind::Terminate.code(), 11);
        assert_eq!(ResponseKind::Visuals.code(), 22);
        assert_eq!(ResponseKind::Data.code(), 41);
        assert_eq!(ResponseKind::from_code(40), Some(ResponseKind::Get));
        assert_eq!(ResponseKind::from_code(3), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(ResponseKind::Disposed.category(), KindCategory::State);
        assert_eq!(ResponseKind::Reset.category(), KindCategory::Command);
        assert_eq!(ResponseKind::Font.category(), KindCategory::Asset);
        assert_eq!(ResponseKind::Data.category(), KindCategory::Metadata);
    }

    #[test]
    fn test_payload_downcast() {
        let sender = Address::new(2).unwrap();
        let msg = Message::broadcast(sender, ResponseKind::Font)
            .with_payload(Payload::new(vec![1u8, 2, 3]));

        assert!(msg.is_broadcast());
        assert_eq!(msg.payload_as::<Vec<u8>>(), Some(&vec![1, 2, 3]));
        assert!(msg.payload_as::<String>().is_none());
    }

    #[test]
    fn test_message_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Message>();
    }
}
