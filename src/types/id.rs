//! Identifier types for protocol entities.
//!
//! Channels, offers and processes are named by small `Copy` identifiers drawn
//! from process-wide counters. Protocol messages refer to offers by
//! [`OfferId`], never by address, and multi-channel registration is ordered by
//! [`ChannelId`].

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CHANNEL_COUNTER: AtomicU64 = AtomicU64::new(0);
static OFFER_COUNTER: AtomicU64 = AtomicU64::new(0);
static PROCESS_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A globally unique, totally ordered channel identity.
///
/// Ids are handed out in construction order. A select that touches several
/// channels registers with and cancels on them lowest id first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Allocates the next channel id.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(CHANNEL_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a channel id for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Identity of a single offer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OfferId(u64);

impl OfferId {
    /// Allocates the next offer id.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(OFFER_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates an offer id for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OfferId({})", self.0)
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Identity of a logical process: one operating-system thread that blocks on
/// its own mailbox.
///
/// Process ids are unique across every [`Registry`](crate::process::Registry),
/// so offers from two registries can never be mistaken for one origin.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u64);

impl ProcessId {
    /// Allocates the next process id.
    #[must_use]
    pub(crate) fn next() -> Self {
        Self(PROCESS_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Creates a process id for testing purposes.
    #[doc(hidden)]
    #[must_use]
    pub const fn new_for_test(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessId({})", self.0)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Offering round of a select session.
///
/// Every offer registered by a session carries the session's current epoch.
/// The session advances the epoch when it locks down, so protocol messages
/// emitted for an earlier round can be told apart from current ones.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(u64);

impl Epoch {
    /// The first round of every session.
    pub const ZERO: Self = Self(0);

    /// Creates an epoch from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the following round.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epoch({})", self.0)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
