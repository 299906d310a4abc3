//! Offers: one process's standing intent to send or receive on a channel.
//!
//! An offer is shared between its owner and the channel it is registered
//! with. The channel holds it in a waiting list or in its tentative pair; the
//! owner keeps a handle so it can read the resolved value once a `Commit`
//! names it.

use core::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::process::Mailbox;
use crate::types::{ChannelId, Epoch, OfferId, ProcessId};

/// Predicate restricting which values a receive offer accepts.
pub type Guard<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// What an offer wants to do.
pub enum OfferKind<T> {
    /// Transmit a value.
    Send(T),
    /// Accept a value, optionally only one satisfying the guard.
    Receive(Option<Guard<T>>),
}

impl<T> OfferKind<T> {
    /// Returns true for send offers.
    #[must_use]
    pub const fn is_send(&self) -> bool {
        matches!(self, Self::Send(_))
    }

    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Send(_) => "send",
            Self::Receive(None) => "receive",
            Self::Receive(Some(_)) => "guarded receive",
        }
    }
}

impl<T> fmt::Debug for OfferKind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A registered intent to rendezvous.
pub struct Offer<T> {
    id: OfferId,
    kind: OfferKind<T>,
    origin: ProcessId,
    /// Mailbox of `origin`; channels reply here directly.
    reply_to: Mailbox,
    /// Position in the originating select's candidate list.
    select_index: Option<usize>,
    epoch: AtomicU64,
    /// Written once, under the lock of the channel that commits the offer.
    resolved: OnceLock<T>,
}

impl<T> Offer<T> {
    /// Creates an offer owned by the process draining `reply_to`.
    pub(crate) fn new(
        kind: OfferKind<T>,
        reply_to: Mailbox,
        select_index: Option<usize>,
        epoch: Epoch,
    ) -> Self {
        Self {
            id: OfferId::next(),
            kind,
            origin: reply_to.owner(),
            reply_to,
            select_index,
            epoch: AtomicU64::new(epoch.as_u64()),
            resolved: OnceLock::new(),
        }
    }

    /// Returns the offer's identity.
    #[must_use]
    pub fn id(&self) -> OfferId {
        self.id
    }

    /// Returns what the offer wants to do.
    #[must_use]
    pub fn kind(&self) -> &OfferKind<T> {
        &self.kind
    }

    /// Returns true for send offers.
    #[must_use]
    pub fn is_send(&self) -> bool {
        self.kind.is_send()
    }

    /// Returns the process that issued the offer.
    #[must_use]
    pub fn origin(&self) -> ProcessId {
        self.origin
    }

    pub(crate) fn reply_to(&self) -> &Mailbox {
        &self.reply_to
    }

    /// Returns the offer's index in its select, if it came from one.
    #[must_use]
    pub fn select_index(&self) -> Option<usize> {
        self.select_index
    }

    /// Returns true if the offer belongs to a select and must be locked down
    /// before it can commit.
    #[must_use]
    pub fn is_select(&self) -> bool {
        self.select_index.is_some()
    }

    /// Returns the round the offer was last registered in.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        Epoch::from_raw(self.epoch.load(Ordering::Acquire))
    }

    /// Moves the offer to a new round. Only valid while the offer is not
    /// registered with any channel.
    pub(crate) fn set_epoch(&self, epoch: Epoch) {
        self.epoch.store(epoch.as_u64(), Ordering::Release);
    }

    /// Returns true once a channel has committed this offer.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Records the value of the rendezvous.
    ///
    /// An offer resolves at most once; a second resolution is a library bug.
    pub(crate) fn resolve(&self, value: T) -> Result<()> {
        self.resolved.set(value).map_err(|_| {
            Error::internal(format!("offer {} resolved twice", self.id))
        })
    }

    /// Evaluates the rendezvous condition with `self` as the send side.
    ///
    /// Offers from the same process never match. A receive guard runs under
    /// `catch_unwind`; a panic is reported as [`ErrorKind::GuardPanicked`]
    /// and leaves both offers untouched.
    ///
    /// [`ErrorKind::GuardPanicked`]: crate::ErrorKind::GuardPanicked
    pub(crate) fn matches(&self, receive: &Self, channel: ChannelId) -> Result<bool> {
        if self.origin == receive.origin {
            return Ok(false);
        }
        let (OfferKind::Send(value), OfferKind::Receive(guard)) = (&self.kind, &receive.kind)
        else {
            return Ok(false);
        };
        let Some(guard) = guard else {
            return Ok(true);
        };
        panic::catch_unwind(AssertUnwindSafe(|| guard(value)))
            .map_err(|payload| Error::guard_panicked(channel, receive.id, panic_detail(&*payload)))
    }
}

impl<T: Clone> Offer<T> {
    /// Returns the value sent, for send offers.
    pub(crate) fn sent_value(&self) -> Option<&T> {
        match &self.kind {
            OfferKind::Send(value) => Some(value),
            OfferKind::Receive(_) => None,
        }
    }

    /// Returns a copy of the resolved value, if the offer committed.
    #[must_use]
    pub fn resolved(&self) -> Option<T> {
        self.resolved.get().cloned()
    }
}

fn panic_detail(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl<T> fmt::Debug for Offer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Offer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("origin", &self.origin)
            .field("select_index", &self.select_index)
            .field("epoch", &self.epoch())
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl<T> fmt::Display for Offer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} from {}", self.id, self.kind.name(), self.origin)?;
        if let Some(index) = self.select_index {
            write!(f, ", select #{index}")?;
        }
        write!(f, " {})", self.epoch())
    }
}
