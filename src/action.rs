//! Actions: descriptions of one send or receive to perform.
//!
//! An [`Action<T, R>`] names a channel carrying `T`, what to do on it, and a
//! continuation turning the transferred value into the caller's result `R`.
//! The continuation runs on the calling thread, exactly once, after the
//! rendezvous committed; channels never see it.
//!
//! ```ignore
//! use rendezvous::{select, Action, Channel};
//!
//! let numbers = Channel::<i32>::new();
//! let words = Channel::<String>::new();
//!
//! // Either receive a large number or send a word; both yield a String.
//! let outcome = select([
//!     Some(Action::receive_when(&numbers, |n| *n > 10).map(|n| n.to_string()).arm()),
//!     None,
//!     Some(Action::send(&words, "hello".to_string()).arm()),
//! ])?;
//! ```

use core::fmt;
use std::sync::Arc;

use crate::channel::{Channel, OfferKind};
use crate::command::group::{ChannelGroup, OfferGroup};
use crate::error::{Error, Result};
use crate::process::Mailbox;
use crate::types::ChannelId;

/// Continuation applied to the transferred value.
pub(crate) type Continuation<T, R> = Box<dyn FnOnce(T) -> R + Send>;

/// One send or receive on a channel, plus what to do with the value.
pub struct Action<T, R = T> {
    channel: Channel<T>,
    kind: OfferKind<T>,
    continuation: Continuation<T, R>,
}

impl<T> Action<T, T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Sends `value` on `channel`. Yields the value sent.
    #[must_use]
    pub fn send(channel: &Channel<T>, value: T) -> Self {
        Self::identity(channel, OfferKind::Send(value))
    }

    /// Receives any value from `channel`. Yields the value received.
    #[must_use]
    pub fn receive(channel: &Channel<T>) -> Self {
        Self::identity(channel, OfferKind::Receive(None))
    }

    /// Receives a value satisfying `guard` from `channel`. Yields the value
    /// received.
    ///
    /// Guards must not block; they run while the channel is locked.
    #[must_use]
    pub fn receive_when<G>(channel: &Channel<T>, guard: G) -> Self
    where
        G: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self::identity(channel, OfferKind::Receive(Some(Arc::new(guard))))
    }

    fn identity(channel: &Channel<T>, kind: OfferKind<T>) -> Self {
        Self {
            channel: channel.clone(),
            kind,
            continuation: Box::new(|value| value),
        }
    }
}

impl<T, R> Action<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: 'static,
{
    /// Applies `f` to the action's result.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Action<T, U>
    where
        F: FnOnce(R) -> U + Send + 'static,
        U: 'static,
    {
        let previous = self.continuation;
        Action {
            channel: self.channel,
            kind: self.kind,
            continuation: Box::new(move |value| f(previous(value))),
        }
    }

    /// Runs `f` for its side effect and discards the result.
    #[must_use]
    pub fn then<F>(self, f: F) -> Action<T, ()>
    where
        F: FnOnce(R) + Send + 'static,
    {
        self.map(f)
    }

    /// Returns the channel the action synchronizes on.
    #[must_use]
    pub fn channel(&self) -> &Channel<T> {
        &self.channel
    }

    /// Returns true for send actions.
    #[must_use]
    pub fn is_send(&self) -> bool {
        self.kind.is_send()
    }

    /// Erases the channel's element type so the action can share a select
    /// with actions on other channels.
    #[must_use]
    pub fn arm(self) -> Arm<R> {
        Arm::from(self)
    }

    pub(crate) fn into_parts(self) -> (Channel<T>, OfferKind<T>, Continuation<T, R>) {
        (self.channel, self.kind, self.continuation)
    }
}

impl<T, R> fmt::Debug for Action<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("channel", &self.channel.id())
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Type-erased select candidate yielding `R`.
///
/// Built from any [`Action<T, R>`]; arms over channels of different element
/// types can be mixed as long as they agree on `R`.
pub struct Arm<R> {
    inner: Box<dyn ErasedArm<R>>,
}

impl<R: 'static> Arm<R> {
    /// Returns the channel the arm synchronizes on.
    #[must_use]
    pub fn channel(&self) -> ChannelId {
        self.inner.channel()
    }

    /// Starts a new per-channel group holding this arm.
    pub(crate) fn into_group(self, mailbox: &Mailbox, index: usize) -> Box<dyn OfferGroup<R>> {
        self.inner.into_group(mailbox, index)
    }

    /// Adds this arm to the existing group of its channel.
    pub(crate) fn join(
        self,
        group: &mut dyn OfferGroup<R>,
        mailbox: &Mailbox,
        index: usize,
    ) -> Result<()> {
        self.inner.join(group, mailbox, index)
    }
}

impl<T, R> From<Action<T, R>> for Arm<R>
where
    T: Clone + Send + Sync + 'static,
    R: 'static,
{
    fn from(action: Action<T, R>) -> Self {
        Self {
            inner: Box::new(action),
        }
    }
}

impl<R> fmt::Debug for Arm<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arm")
            .field("channel", &self.inner.channel())
            .finish_non_exhaustive()
    }
}

trait ErasedArm<R>: Send {
    fn channel(&self) -> ChannelId;

    fn into_group(self: Box<Self>, mailbox: &Mailbox, index: usize) -> Box<dyn OfferGroup<R>>;

    fn join(
        self: Box<Self>,
        group: &mut dyn OfferGroup<R>,
        mailbox: &Mailbox,
        index: usize,
    ) -> Result<()>;
}

impl<T, R> ErasedArm<R> for Action<T, R>
where
    T: Clone + Send + Sync + 'static,
    R: 'static,
{
    fn channel(&self) -> ChannelId {
        self.channel.id()
    }

    fn into_group(self: Box<Self>, mailbox: &Mailbox, index: usize) -> Box<dyn OfferGroup<R>> {
        let (channel, kind, continuation) = self.into_parts();
        let mut group = ChannelGroup::new(channel);
        group.push(kind, continuation, mailbox, index);
        Box::new(group)
    }

    fn join(
        self: Box<Self>,
        group: &mut dyn OfferGroup<R>,
        mailbox: &Mailbox,
        index: usize,
    ) -> Result<()> {
        let channel = self.channel.id();
        let Some(group) = group.as_any_mut().downcast_mut::<ChannelGroup<T, R>>() else {
            return Err(Error::internal(format!(
                "arm #{index} on {channel} does not fit the offer group of its channel"
            )));
        };
        let (_, kind, continuation) = self.into_parts();
        group.push(kind, continuation, mailbox, index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_record_kind_and_channel() {
        let ch = Channel::<i32>::new();
        let send = Action::send(&ch, 3);
        assert!(send.is_send());
        assert_eq!(send.channel(), &ch);
        let recv = Action::receive(&ch);
        assert!(!recv.is_send());
        let guarded = Action::receive_when(&ch, |v| *v > 0);
        assert!(matches!(guarded.kind, OfferKind::Receive(Some(_))));
    }

    #[test]
    fn map_composes_after_existing_continuation() {
        let ch = Channel::<i32>::new();
        let action = Action::receive(&ch).map(|v| v * 2).map(|v| format!("<{v}>"));
        let (_, _, continuation) = action.into_parts();
        assert_eq!(continuation(21), "<42>");
    }

    #[test]
    fn then_discards_result_after_side_effect() {
        use std::sync::atomic::{AtomicI32, Ordering};
        let seen = Arc::new(AtomicI32::new(0));
        let ch = Channel::<i32>::new();
        let sink = Arc::clone(&seen);
        let action = Action::send(&ch, 7).then(move |v| sink.store(v, Ordering::SeqCst));
        let (_, _, continuation) = action.into_parts();
        continuation(7);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn arm_remembers_channel() {
        let ch = Channel::<String>::with_label("names");
        let arm: Arm<usize> = Action::receive(&ch).map(|s| s.len()).arm();
        assert_eq!(arm.channel(), ch.id());
    }
}
