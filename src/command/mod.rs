//! Blocking commands: execute one action or select among several.
//!
//! Every command blocks the calling thread on its mailbox until a terminal
//! protocol message arrives. The free functions run against the calling
//! thread's ambient [`Process`]; the same commands are available as methods
//! on an explicit `Process`.
//!
//! ```ignore
//! use rendezvous::{receive, send, Channel};
//!
//! let ch = Channel::<u32>::new();
//! let tx = ch.clone();
//! let producer = std::thread::spawn(move || send(&tx, 7));
//! assert_eq!(receive(&ch)?, 7);
//! assert_eq!(producer.join().unwrap()?, 7);
//! ```

pub(crate) mod group;
pub mod session;

use std::sync::Arc;

pub use session::{SelectSession, SessionState, Step};

use crate::action::{Action, Arm};
use crate::channel::{Channel, Offer};
use crate::error::{ProtocolViolation, Result};
use crate::process::{MessageKind, Process};
use crate::types::Epoch;

impl Process {
    /// Performs `action` and returns its continuation's result.
    ///
    /// A lone offer never needs a lockdown round: the only message this call
    /// accepts is the `Commit` naming its offer.
    pub fn execute<T, R>(&self, action: Action<T, R>) -> Result<R>
    where
        T: Clone + Send + Sync + 'static,
        R: 'static,
    {
        let (channel, kind, continuation) = action.into_parts();
        let offer = Arc::new(Offer::new(kind, self.mailbox().clone(), None, Epoch::ZERO));
        let span = tracing::debug_span!(
            "execute",
            process = %self.id(),
            channel = %channel,
            offer = %offer.id()
        );
        let _enter = span.enter();
        channel.offer(Arc::clone(&offer))?;
        match self.await_commit(&channel, &offer) {
            Ok(value) => Ok(continuation(value)),
            Err(err) => {
                tracing::error!(error = %err, "execute failed; withdrawing offer");
                if let Err(cancel_err) = channel.cancel_offer(offer.id()) {
                    tracing::error!(error = %cancel_err, "failed to withdraw offer");
                }
                Err(err)
            }
        }
    }

    fn await_commit<T>(&self, channel: &Channel<T>, offer: &Offer<T>) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let msg = self.receive()?;
        if msg.offer != offer.id() || msg.channel != channel.id() {
            return Err(ProtocolViolation::UnknownOffer {
                offer: msg.offer,
                channel: msg.channel,
            }
            .into());
        }
        if msg.kind != MessageKind::Commit {
            return Err(ProtocolViolation::UnexpectedMessage {
                kind: msg.kind,
                offer: msg.offer,
                channel: msg.channel,
                state: "executing",
            }
            .into());
        }
        offer
            .resolved()
            .ok_or_else(|| ProtocolViolation::MissingResolution { offer: offer.id() }.into())
    }

    /// Commits to exactly one of `arms` and returns its result.
    ///
    /// `None` entries are skipped. Fails with
    /// [`ErrorKind::EmptySelect`](crate::ErrorKind::EmptySelect) when no arm
    /// is present.
    pub fn select<R, I>(&self, arms: I) -> Result<R>
    where
        R: 'static,
        I: IntoIterator<Item = Option<Arm<R>>>,
    {
        let session = SelectSession::new(self, arms)?;
        let span = tracing::debug_span!(
            "select",
            process = %self.id(),
            arms = session.offer_ids().len()
        );
        let _enter = span.enter();
        session.run()
    }
}

/// Performs `action` on the calling thread's process.
pub fn execute<T, R>(action: Action<T, R>) -> Result<R>
where
    T: Clone + Send + Sync + 'static,
    R: 'static,
{
    Process::current().execute(action)
}

/// Commits to exactly one of `arms` on the calling thread's process.
pub fn select<R, I>(arms: I) -> Result<R>
where
    R: 'static,
    I: IntoIterator<Item = Option<Arm<R>>>,
{
    Process::current().select(arms)
}

/// Sends `value` on `channel`, blocking until a receiver takes it. Returns
/// the value sent.
pub fn send<T>(channel: &Channel<T>, value: T) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    execute(Action::send(channel, value))
}

/// Receives a value from `channel`.
pub fn receive<T>(channel: &Channel<T>) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
{
    execute(Action::receive(channel))
}

/// Receives a value satisfying `guard` from `channel`.
pub fn receive_when<T, G>(channel: &Channel<T>, guard: G) -> Result<T>
where
    T: Clone + Send + Sync + 'static,
    G: Fn(&T) -> bool + Send + Sync + 'static,
{
    execute(Action::receive_when(channel, guard))
}
