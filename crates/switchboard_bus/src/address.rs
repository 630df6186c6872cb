//! # Addresses
//!
//! Addresses are plain integers handed out by the bus:
//! - `1..` are assigned to nodes, once, in increasing order
//! - `-1` is reserved for broadcast and never assigned

use std::fmt;

use serde::Serialize;

/// Routing address of a registered node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Address(i64);

impl Address {
    /// Receiver sentinel meaning "every registered handler".
    pub const BROADCAST: Self = Self(-1);

    /// First address the allocator hands out.
    pub const FIRST: Self = Self(1);

    /// Wraps a raw positive address.
    ///
    /// Returns `None` for zero, negative values and the broadcast sentinel.
    #[inline]
    #[must_use]
    pub const fn new(raw: i64) -> Option<Self> {
        if raw > 0 {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Returns the raw integer.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Checks if this is the broadcast sentinel.
    #[inline]
    #[must_use]
    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }

    /// The address allocated after this one.
    #[inline]
    #[must_use]
    pub(crate) const fn successor(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            f.write_str("broadcast")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
