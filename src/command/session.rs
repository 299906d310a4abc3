//! The client side of the lockdown protocol.
//!
//! A [`SelectSession`] owns every offer one `select` call registered and
//! reacts to the protocol messages naming them:
//!
//! | State      | Message                         | Reaction                                   |
//! |------------|---------------------------------|--------------------------------------------|
//! | Offering   | `LockDown`, current epoch       | cancel the rest, advance epoch, accept     |
//! | Offering   | `LockDown`, other epoch         | discard                                    |
//! | Offering   | `Abort`, earlier epoch          | discard                                    |
//! | LockedDown | `Commit` for the winner         | apply its continuation, finish             |
//! | LockedDown | `Abort` for the winner          | re-register everything, back to Offering   |
//! | LockedDown | `LockDown`/`Abort` for a loser  | ignore                                     |
//!
//! Everything else, including any message naming an offer the session does
//! not own, is a protocol violation.

use core::fmt;
use std::collections::{BTreeMap, HashMap};

use super::group::OfferGroup;
use crate::action::Arm;
use crate::error::{Error, ErrorKind, ProtocolViolation, Result};
use crate::process::{Message, MessageKind, Process};
use crate::types::{ChannelId, Epoch, OfferId};

/// Where a select session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Offers are registered; waiting for a lockdown.
    Offering,
    /// Every offer but `winner` is withdrawn; waiting for its channel to
    /// commit or abort.
    LockedDown {
        /// The offer being committed.
        winner: OfferId,
        /// The channel it lives on.
        channel: ChannelId,
    },
    /// The winner committed.
    Committed,
}

impl SessionState {
    const fn name(self) -> &'static str {
        match self {
            Self::Offering => "offering",
            Self::LockedDown { .. } => "locked down",
            Self::Committed => "committed",
        }
    }
}

/// Outcome of feeding one message to a session.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<R> {
    /// Keep waiting.
    Pending,
    /// The select finished with this result.
    Committed(R),
}

/// One `select` call: its offers grouped by channel, and the protocol state.
pub struct SelectSession<R> {
    process: Process,
    /// Visited lowest channel id first.
    groups: BTreeMap<ChannelId, Box<dyn OfferGroup<R>>>,
    owners: HashMap<OfferId, ChannelId>,
    epoch: Epoch,
    state: SessionState,
    /// True while any offer may still sit in a channel.
    registered: bool,
}

impl<R: 'static> SelectSession<R> {
    /// Builds the session's offers. `None` candidates are skipped but keep
    /// their index.
    ///
    /// Fails with [`ErrorKind::EmptySelect`] if no candidate is present.
    pub fn new<I>(process: &Process, arms: I) -> Result<Self>
    where
        I: IntoIterator<Item = Option<Arm<R>>>,
    {
        let mut groups: BTreeMap<ChannelId, Box<dyn OfferGroup<R>>> = BTreeMap::new();
        for (index, arm) in arms.into_iter().enumerate() {
            let Some(arm) = arm else { continue };
            match groups.get_mut(&arm.channel()) {
                Some(group) => arm.join(&mut **group, process.mailbox(), index)?,
                None => {
                    let group = arm.into_group(process.mailbox(), index);
                    groups.insert(group.channel(), group);
                }
            }
        }
        if groups.is_empty() {
            return Err(Error::new(ErrorKind::EmptySelect)
                .with_message("select needs at least one present candidate"));
        }
        let owners = groups
            .values()
            .flat_map(|group| {
                let channel = group.channel();
                group.offer_ids().into_iter().map(move |id| (id, channel))
            })
            .collect();
        Ok(Self {
            process: process.clone(),
            groups,
            owners,
            epoch: Epoch::ZERO,
            state: SessionState::Offering,
            registered: false,
        })
    }

    /// Returns the current protocol state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the current round.
    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns the session's offers, lowest channel first.
    #[must_use]
    pub fn offer_ids(&self) -> Vec<OfferId> {
        self.groups
            .values()
            .flat_map(|group| group.offer_ids())
            .collect()
    }

    /// Registers every offer with its channel, one batch per channel.
    ///
    /// A session starts once. Fails with [`ErrorKind::AlreadyStarted`] if its
    /// offers are already registered or it has finished.
    pub fn start(&mut self) -> Result<()> {
        if self.registered || self.state != SessionState::Offering {
            return Err(Error::new(ErrorKind::AlreadyStarted)
                .with_message(format!("{self} was already started")));
        }
        self.registered = true;
        self.register_all()
    }

    /// Registers, then drives the session from the process's mailbox until
    /// it commits or fails. On failure every offer is withdrawn.
    pub fn run(mut self) -> Result<R> {
        let outcome = self.drive();
        if outcome.is_err() {
            self.withdraw();
        }
        outcome
    }

    fn drive(&mut self) -> Result<R> {
        self.start()?;
        loop {
            let msg = self.process.receive()?;
            if let Step::Committed(value) = self.step(msg)? {
                return Ok(value);
            }
        }
    }

    /// Advances the state machine by one message.
    pub fn step(&mut self, msg: Message) -> Result<Step<R>> {
        let Some(&channel) = self.owners.get(&msg.offer) else {
            return Err(ProtocolViolation::UnknownOffer {
                offer: msg.offer,
                channel: msg.channel,
            }
            .into());
        };
        if channel != msg.channel {
            return Err(ProtocolViolation::UnknownOffer {
                offer: msg.offer,
                channel: msg.channel,
            }
            .into());
        }
        match (self.state, msg.kind) {
            (SessionState::Offering, MessageKind::LockDown) if msg.epoch == self.epoch => {
                self.lock_down(msg.offer, channel)?;
                Ok(Step::Pending)
            }
            (SessionState::Offering, MessageKind::LockDown) => {
                tracing::debug!(session = %self, message = %msg, "discarding stale lockdown");
                Ok(Step::Pending)
            }
            (SessionState::Offering, MessageKind::Abort) if msg.epoch < self.epoch => {
                tracing::debug!(session = %self, message = %msg, "discarding stale abort");
                Ok(Step::Pending)
            }
            (SessionState::LockedDown { winner, .. }, MessageKind::Commit)
                if msg.offer == winner =>
            {
                self.complete(winner, channel).map(Step::Committed)
            }
            (SessionState::LockedDown { winner, .. }, MessageKind::Abort)
                if msg.offer == winner =>
            {
                self.reoffer()?;
                Ok(Step::Pending)
            }
            (SessionState::LockedDown { winner, .. }, MessageKind::LockDown | MessageKind::Abort)
                if msg.offer != winner =>
            {
                tracing::trace!(session = %self, message = %msg, "ignoring message for withdrawn offer");
                Ok(Step::Pending)
            }
            (state, kind) => Err(ProtocolViolation::UnexpectedMessage {
                kind,
                offer: msg.offer,
                channel: msg.channel,
                state: state.name(),
            }
            .into()),
        }
    }

    fn lock_down(&mut self, winner: OfferId, channel: ChannelId) -> Result<()> {
        tracing::debug!(session = %self, %winner, %channel, "locking down");
        for group in self.groups.values() {
            group.cancel_except(Some(winner))?;
        }
        self.epoch = self.epoch.next();
        self.state = SessionState::LockedDown { winner, channel };
        self.group(channel)?.accept_lockdown(winner)
    }

    fn reoffer(&mut self) -> Result<()> {
        tracing::debug!(session = %self, "lockdown aborted; reoffering");
        self.state = SessionState::Offering;
        self.register_all()
    }

    fn complete(&mut self, winner: OfferId, channel: ChannelId) -> Result<R> {
        self.state = SessionState::Committed;
        self.registered = false;
        tracing::debug!(session = %self, %winner, %channel, "committed");
        let group = self
            .groups
            .get_mut(&channel)
            .ok_or_else(|| Error::internal(format!("no offer group for {channel}")))?;
        group.complete(winner)
    }

    fn register_all(&self) -> Result<()> {
        for group in self.groups.values() {
            group.register(self.epoch)?;
        }
        Ok(())
    }

    fn group(&self, channel: ChannelId) -> Result<&dyn OfferGroup<R>> {
        self.groups
            .get(&channel)
            .map(|group| &**group)
            .ok_or_else(|| Error::internal(format!("no offer group for {channel}")))
    }
}

impl<R> SelectSession<R> {
    /// Withdraws every offer still registered anywhere.
    fn withdraw(&mut self) {
        if !self.registered {
            return;
        }
        self.registered = false;
        for group in self.groups.values() {
            if let Err(err) = group.cancel_except(None) {
                tracing::error!(session = %self, error = %err, "failed to withdraw offers");
            }
        }
    }
}

impl<R> Drop for SelectSession<R> {
    fn drop(&mut self) {
        self.withdraw();
    }
}

impl<R> fmt::Display for SelectSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} select {} {}",
            self.process.id(),
            self.state.name(),
            self.epoch
        )
    }
}

impl<R> fmt::Debug for SelectSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectSession")
            .field("process", &self.process.id())
            .field("channels", &self.groups.keys().collect::<Vec<_>>())
            .field("offers", &self.owners.len())
            .field("epoch", &self.epoch)
            .field("state", &self.state)
            .finish()
    }
}
