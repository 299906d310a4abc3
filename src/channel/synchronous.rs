//! Synchronous rendezvous channel.
//!
//! A channel pairs send offers with receive offers. Every operation runs under
//! the channel's own mutex; different channels never share a lock, so a select
//! spanning several channels coordinates through the lockdown handshake:
//!
//! ```text
//! match found ──► both plain? ──yes──► Commit to both
//!                     │
//!                     no
//!                     ▼
//!             tentative pair, LockDown to each select side
//!                     │
//!          ┌──────────┴──────────┐
//!   every side accepts      a side cancels
//!          │                     │
//!          ▼                     ▼
//!   Commit to both        Abort to the other select side
//!                         (or requeue a plain side), rescan
//! ```
//!
//! All protocol messages are posted while the channel lock is held, so the
//! messages one channel sends to a process arrive in the order the channel
//! produced them.

use core::fmt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::offer::Offer;
use crate::error::{Error, Result};
use crate::process::Message;
use crate::types::{ChannelId, OfferId};

/// Counters describing a channel's protocol activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Rendezvous committed.
    pub commits: u64,
    /// Tentative matches entered.
    pub lockdowns: u64,
    /// Tentative matches that collapsed before committing.
    pub aborts: u64,
    /// Offers withdrawn by their owners.
    pub cancellations: u64,
    /// Guard evaluations that panicked.
    pub guard_panics: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    commits: AtomicU64,
    lockdowns: AtomicU64,
    aborts: AtomicU64,
    cancellations: AtomicU64,
    guard_panics: AtomicU64,
}

impl StatCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ChannelStats {
        ChannelStats {
            commits: self.commits.load(Ordering::Relaxed),
            lockdowns: self.lockdowns.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            guard_panics: self.guard_panics.load(Ordering::Relaxed),
        }
    }
}

/// A match awaiting lockdown acceptance from its select sides.
struct TentativePair<T> {
    send: Arc<Offer<T>>,
    receive: Arc<Offer<T>>,
    send_ready: bool,
    receive_ready: bool,
}

impl<T> TentativePair<T> {
    fn new(send: Arc<Offer<T>>, receive: Arc<Offer<T>>) -> Self {
        // Plain offers have nothing to cancel and are ready immediately.
        let send_ready = !send.is_select();
        let receive_ready = !receive.is_select();
        Self {
            send,
            receive,
            send_ready,
            receive_ready,
        }
    }

    fn is_ready(&self) -> bool {
        self.send_ready && self.receive_ready
    }
}

/// Waiting lists and the tentative-pair slot.
struct ChannelState<T> {
    senders: VecDeque<Arc<Offer<T>>>,
    receivers: VecDeque<Arc<Offer<T>>>,
    /// Present exactly while the channel is busy.
    tentative: Option<TentativePair<T>>,
}

impl<T> ChannelState<T> {
    fn new() -> Self {
        Self {
            senders: VecDeque::new(),
            receivers: VecDeque::new(),
            tentative: None,
        }
    }

    fn enqueue(&mut self, offer: Arc<Offer<T>>) {
        if offer.is_send() {
            self.senders.push_back(offer);
        } else {
            self.receivers.push_back(offer);
        }
    }

    /// Puts a plain offer back at the head of its list after its partner
    /// withdrew.
    fn requeue(&mut self, offer: Arc<Offer<T>>) {
        if offer.is_send() {
            self.senders.push_front(offer);
        } else {
            self.receivers.push_front(offer);
        }
    }

    fn remove_waiting(&mut self, id: OfferId) -> bool {
        let list = if let Some(pos) = self.senders.iter().position(|o| o.id() == id) {
            self.senders.remove(pos)
        } else if let Some(pos) = self.receivers.iter().position(|o| o.id() == id) {
            self.receivers.remove(pos)
        } else {
            None
        };
        list.is_some()
    }
}

struct ChannelInner<T> {
    id: ChannelId,
    label: Option<String>,
    state: Mutex<ChannelState<T>>,
    stats: StatCounters,
}

/// A synchronous channel carrying values of type `T`.
///
/// `Channel` is a cheap handle; clones refer to the same channel. Channels
/// compare and order by their [`ChannelId`], which is assigned from a
/// process-wide counter at construction.
pub struct Channel<T> {
    inner: Arc<ChannelInner<T>>,
}

impl<T> Channel<T> {
    /// Creates an unlabelled channel.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a channel displayed as `label` in diagnostics.
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self::build(Some(label.into()))
    }

    fn build(label: Option<String>) -> Self {
        let id = ChannelId::next();
        tracing::trace!(channel = %id, label = ?label, "channel created");
        Self {
            inner: Arc::new(ChannelInner {
                id,
                label,
                state: Mutex::new(ChannelState::new()),
                stats: StatCounters::default(),
            }),
        }
    }

    /// Returns the channel's identity.
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.inner.id
    }

    /// Returns the diagnostic label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Returns the number of send offers waiting for a partner.
    #[must_use]
    pub fn pending_senders(&self) -> usize {
        self.inner.state.lock().senders.len()
    }

    /// Returns the number of receive offers waiting for a partner.
    #[must_use]
    pub fn pending_receivers(&self) -> usize {
        self.inner.state.lock().receivers.len()
    }

    /// Returns true while a tentative match awaits lockdown acceptance.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().tentative.is_some()
    }

    /// Returns a snapshot of the channel's counters.
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        self.inner.stats.snapshot()
    }
}

impl<T: Clone + Send + Sync + 'static> Channel<T> {
    /// Registers one offer and tries to match it.
    pub(crate) fn offer(&self, offer: Arc<Offer<T>>) -> Result<()> {
        let mut state = self.inner.state.lock();
        tracing::trace!(channel = %self, offer = %offer, "offer");
        state.enqueue(offer);
        self.settle(&mut state)
    }

    /// Registers a batch of offers as one event and tries to match them.
    pub(crate) fn offers(&self, offers: &[Arc<Offer<T>>]) -> Result<()> {
        let mut state = self.inner.state.lock();
        tracing::trace!(channel = %self, count = offers.len(), "offers");
        for offer in offers {
            state.enqueue(Arc::clone(offer));
        }
        self.settle(&mut state)
    }

    /// Marks the side of the tentative pair held by `offer` as ready and
    /// commits once both sides are.
    ///
    /// Accepting an offer that is no longer part of the pair is a no-op: the
    /// pair collapsed and its owner will receive an `Abort`.
    pub(crate) fn accept_lockdown(&self, offer: OfferId) -> Result<()> {
        let mut state = self.inner.state.lock();
        let Some(pair) = state.tentative.as_mut() else {
            tracing::debug!(channel = %self, %offer, "lockdown accepted after collapse");
            return Ok(());
        };
        if pair.send.id() == offer {
            pair.send_ready = true;
        } else if pair.receive.id() == offer {
            pair.receive_ready = true;
        } else {
            tracing::debug!(channel = %self, %offer, "lockdown accepted for offer outside pair");
            return Ok(());
        }
        tracing::debug!(channel = %self, %offer, "lockdown accepted");
        if !pair.is_ready() {
            return Ok(());
        }
        if let Some(pair) = state.tentative.take() {
            self.commit(&pair.send, &pair.receive)?;
        }
        self.settle(&mut state)
    }

    /// Withdraws one offer, collapsing the tentative pair if it holds it.
    pub(crate) fn cancel_offer(&self, offer: OfferId) -> Result<()> {
        let mut state = self.inner.state.lock();
        tracing::trace!(channel = %self, %offer, "cancel offer");
        if self.withdraw(&mut state, offer) {
            self.settle(&mut state)?;
        }
        Ok(())
    }

    /// Withdraws every listed offer except `survivor`.
    pub(crate) fn cancel_offers<I>(&self, offers: I, survivor: Option<OfferId>) -> Result<()>
    where
        I: IntoIterator<Item = OfferId>,
    {
        let mut state = self.inner.state.lock();
        let mut collapsed = false;
        for offer in offers {
            if Some(offer) != survivor {
                collapsed |= self.withdraw(&mut state, offer);
            }
        }
        tracing::trace!(
            channel = %self,
            survivor = ?survivor,
            senders = state.senders.len(),
            receivers = state.receivers.len(),
            "cancel offers"
        );
        if collapsed {
            self.settle(&mut state)?;
        }
        Ok(())
    }

    /// Removes `offer` from the channel. Returns true if this collapsed the
    /// tentative pair.
    fn withdraw(&self, state: &mut ChannelState<T>, offer: OfferId) -> bool {
        let in_pair = state
            .tentative
            .as_ref()
            .is_some_and(|pair| pair.send.id() == offer || pair.receive.id() == offer);
        if !in_pair {
            if state.remove_waiting(offer) {
                StatCounters::bump(&self.inner.stats.cancellations);
            }
            return false;
        }
        let Some(pair) = state.tentative.take() else {
            return false;
        };
        StatCounters::bump(&self.inner.stats.cancellations);
        StatCounters::bump(&self.inner.stats.aborts);
        let partner = if pair.send.id() == offer {
            pair.receive
        } else {
            pair.send
        };
        tracing::debug!(channel = %self, %offer, partner = %partner, "tentative match collapsed");
        if partner.is_select() {
            partner
                .reply_to()
                .post(Message::abort(partner.id(), self.id(), partner.epoch()));
        } else {
            state.requeue(partner);
        }
        true
    }

    /// Matches waiting offers until the channel is busy or no pair matches.
    fn settle(&self, state: &mut ChannelState<T>) -> Result<()> {
        while state.tentative.is_none() {
            let Some((send_pos, receive_pos)) = self.find_match(state) else {
                return Ok(());
            };
            let (Some(send), Some(receive)) = (
                state.senders.remove(send_pos),
                state.receivers.remove(receive_pos),
            ) else {
                return Err(Error::internal(format!(
                    "{self}: matched offers vanished from the waiting lists"
                )));
            };
            if !send.is_select() && !receive.is_select() {
                self.commit(&send, &receive)?;
                continue;
            }
            StatCounters::bump(&self.inner.stats.lockdowns);
            tracing::debug!(channel = %self, send = %send, receive = %receive, "tentative match");
            for side in [&send, &receive] {
                if side.is_select() {
                    side.reply_to()
                        .post(Message::lock_down(side.id(), self.id(), side.epoch()));
                }
            }
            state.tentative = Some(TentativePair::new(send, receive));
        }
        Ok(())
    }

    /// Scans senders × receivers in registration order for the first pair
    /// satisfying the rendezvous condition.
    fn find_match(&self, state: &ChannelState<T>) -> Option<(usize, usize)> {
        for (send_pos, send) in state.senders.iter().enumerate() {
            for (receive_pos, receive) in state.receivers.iter().enumerate() {
                match send.matches(receive, self.id()) {
                    Ok(true) => return Some((send_pos, receive_pos)),
                    Ok(false) => {}
                    Err(err) => {
                        StatCounters::bump(&self.inner.stats.guard_panics);
                        tracing::error!(
                            channel = %self,
                            send = %send,
                            receive = %receive,
                            error = %err,
                            "guard panicked; treating pair as non-matching"
                        );
                    }
                }
            }
        }
        None
    }

    /// Resolves both offers to the sent value and notifies both origins.
    fn commit(&self, send: &Offer<T>, receive: &Offer<T>) -> Result<()> {
        let value = send.sent_value().cloned().ok_or_else(|| {
            Error::internal(format!("{self}: committed pair has no send side"))
        })?;
        receive.resolve(value.clone())?;
        send.resolve(value)?;
        StatCounters::bump(&self.inner.stats.commits);
        tracing::debug!(channel = %self, send = %send, receive = %receive, "commit");
        send.reply_to()
            .post(Message::commit(send.id(), self.id(), send.epoch()));
        receive
            .reply_to()
            .post(Message::commit(receive.id(), self.id(), receive.epoch()));
        Ok(())
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Channel<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl<T> Eq for Channel<T> {}

impl<T> PartialOrd for Channel<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Channel<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.inner.id.cmp(&other.inner.id)
    }
}

impl<T> fmt::Display for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner.label {
            Some(label) => f.write_str(label),
            None => write!(f, "{}", self.inner.id),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("senders", &state.senders.len())
            .field("receivers", &state.receivers.len())
            .field("busy", &state.tentative.is_some())
            .finish()
    }
}
