//! Protocol messages exchanged between channels and waiting processes.

use core::fmt;

use crate::types::{ChannelId, Epoch, OfferId};

/// The three protocol messages a channel can send to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A select-originated offer was matched tentatively; its owner must
    /// cancel its alternatives and accept before the channel commits.
    LockDown,
    /// The rendezvous is final; the offer's value is resolved.
    Commit,
    /// The tentative match involving the offer collapsed; its owner must
    /// reoffer.
    Abort,
}

/// A protocol message naming exactly one offer.
///
/// `epoch` is the offer's epoch when the channel emitted the message, not when
/// the owner reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// Which protocol step this is.
    pub kind: MessageKind,
    /// The offer this message is about.
    pub offer: OfferId,
    /// The channel that emitted the message.
    pub channel: ChannelId,
    /// Epoch of the offer at emission.
    pub epoch: Epoch,
}

impl Message {
    /// Builds a `LockDown` message.
    #[must_use]
    pub const fn lock_down(offer: OfferId, channel: ChannelId, epoch: Epoch) -> Self {
        Self {
            kind: MessageKind::LockDown,
            offer,
            channel,
            epoch,
        }
    }

    /// Builds a `Commit` message.
    #[must_use]
    pub const fn commit(offer: OfferId, channel: ChannelId, epoch: Epoch) -> Self {
        Self {
            kind: MessageKind::Commit,
            offer,
            channel,
            epoch,
        }
    }

    /// Builds an `Abort` message.
    #[must_use]
    pub const fn abort(offer: OfferId, channel: ChannelId, epoch: Epoch) -> Self {
        Self {
            kind: MessageKind::Abort,
            offer,
            channel,
            epoch,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}({} on {} {})",
            self.kind, self.offer, self.channel, self.epoch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_kind() {
        let offer = OfferId::new_for_test(4);
        let channel = ChannelId::new_for_test(1);
        assert_eq!(
            Message::lock_down(offer, channel, Epoch::ZERO).kind,
            MessageKind::LockDown
        );
        assert_eq!(
            Message::commit(offer, channel, Epoch::ZERO).kind,
            MessageKind::Commit
        );
        assert_eq!(
            Message::abort(offer, channel, Epoch::ZERO).kind,
            MessageKind::Abort
        );
    }

    #[test]
    fn display_names_offer_channel_and_epoch() {
        let msg = Message::lock_down(
            OfferId::new_for_test(4),
            ChannelId::new_for_test(1),
            Epoch::from_raw(2),
        );
        assert_eq!(msg.to_string(), "LockDown(O4 on ch1 @2)");
    }
}
