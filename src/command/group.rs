//! Per-channel offer groups of a select session.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::action::Continuation;
use crate::channel::{Channel, Offer, OfferKind};
use crate::error::{Error, ProtocolViolation, Result};
use crate::process::Mailbox;
use crate::types::{ChannelId, Epoch, OfferId};

/// The offers a session registered on one channel, with their element type
/// erased.
pub(crate) trait OfferGroup<R> {
    fn channel(&self) -> ChannelId;

    fn offer_ids(&self) -> Vec<OfferId>;

    /// Stamps every offer with `epoch` and registers them as one batch.
    fn register(&self, epoch: Epoch) -> Result<()>;

    /// Withdraws every offer of the group except `survivor`.
    fn cancel_except(&self, survivor: Option<OfferId>) -> Result<()>;

    fn accept_lockdown(&self, offer: OfferId) -> Result<()>;

    /// Reads the committed value of `offer` and applies its continuation.
    fn complete(&mut self, offer: OfferId) -> Result<R>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

pub(crate) struct ChannelGroup<T, R> {
    channel: Channel<T>,
    offers: Vec<Arc<Offer<T>>>,
    continuations: HashMap<OfferId, Continuation<T, R>>,
}

impl<T, R> ChannelGroup<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: 'static,
{
    pub(crate) fn new(channel: Channel<T>) -> Self {
        Self {
            channel,
            offers: Vec::new(),
            continuations: HashMap::new(),
        }
    }

    pub(crate) fn push(
        &mut self,
        kind: OfferKind<T>,
        continuation: Continuation<T, R>,
        mailbox: &Mailbox,
        index: usize,
    ) {
        let offer = Arc::new(Offer::new(kind, mailbox.clone(), Some(index), Epoch::ZERO));
        self.continuations.insert(offer.id(), continuation);
        self.offers.push(offer);
    }
}

impl<T, R> OfferGroup<R> for ChannelGroup<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: 'static,
{
    fn channel(&self) -> ChannelId {
        self.channel.id()
    }

    fn offer_ids(&self) -> Vec<OfferId> {
        self.offers.iter().map(|offer| offer.id()).collect()
    }

    fn register(&self, epoch: Epoch) -> Result<()> {
        for offer in &self.offers {
            offer.set_epoch(epoch);
        }
        self.channel.offers(&self.offers)
    }

    fn cancel_except(&self, survivor: Option<OfferId>) -> Result<()> {
        self.channel
            .cancel_offers(self.offers.iter().map(|offer| offer.id()), survivor)
    }

    fn accept_lockdown(&self, offer: OfferId) -> Result<()> {
        self.channel.accept_lockdown(offer)
    }

    fn complete(&mut self, offer: OfferId) -> Result<R> {
        let value = self
            .offers
            .iter()
            .find(|candidate| candidate.id() == offer)
            .and_then(|candidate| candidate.resolved())
            .ok_or(ProtocolViolation::MissingResolution { offer })?;
        let continuation = self.continuations.remove(&offer).ok_or_else(|| {
            Error::internal(format!("continuation of offer {offer} already consumed"))
        })?;
        Ok(continuation(value))
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
