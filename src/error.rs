//! Error types and error handling strategy for the rendezvous protocol.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Every failure of a blocking call is fatal to that call; nothing in the
//!   protocol retries on the caller's behalf
//! - Protocol violations carry a structured [`ProtocolViolation`] source
//!
//! # Error Categories
//!
//! - **Protocol**: a thread received a message it cannot interpret in its
//!   current state, or one naming an offer it does not own
//! - **Guard**: a receive guard panicked while a channel evaluated it
//! - **Wait**: a blocking mailbox wait was interrupted
//! - **Usage**: the caller asked for something that can never complete
//! - **Internal**: an invariant of the library itself was broken

use core::fmt;
use std::sync::Arc;

use thiserror::Error as ThisError;

use crate::process::MessageKind;
use crate::types::{ChannelId, OfferId};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Protocol ===
    /// A message arrived that the receiving state cannot accept.
    ProtocolViolation,

    // === Guards ===
    /// A receive guard panicked during a match attempt.
    ///
    /// Never returned to callers. The channel treats the pair as
    /// non-matching, logs this error and counts it in
    /// [`ChannelStats::guard_panics`](crate::ChannelStats::guard_panics); the
    /// guarded receive keeps waiting for a value the guard accepts.
    GuardPanicked,

    // === Waiting ===
    /// A blocking mailbox wait ended without a message.
    Interrupted,

    // === Usage ===
    /// A select was issued with no present candidates.
    EmptySelect,
    /// A select session was started after its offers were already
    /// registered or after it finished.
    AlreadyStarted,

    // === Internal ===
    /// Internal invariant breach (bug).
    Internal,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ProtocolViolation => ErrorCategory::Protocol,
            Self::GuardPanicked => ErrorCategory::Guard,
            Self::Interrupted => ErrorCategory::Wait,
            Self::EmptySelect | Self::AlreadyStarted => ErrorCategory::Usage,
            Self::Internal => ErrorCategory::Internal,
        }
    }

    /// Returns true if this kind is fatal to the call that observed it.
    ///
    /// Every kind is fatal; the protocol has no partial-failure mode.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        true
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Protocol message handling failures.
    Protocol,
    /// Guard evaluation failures.
    Guard,
    /// Blocking wait failures.
    Wait,
    /// Misuse of the public API.
    Usage,
    /// Library bugs.
    Internal,
}

/// Structured description of a protocol violation.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ProtocolViolation {
    /// A message kind arrived in a state that cannot interpret it.
    #[error("unexpected {kind:?} for offer {offer} on {channel} while {state}")]
    UnexpectedMessage {
        /// Kind of the offending message.
        kind: MessageKind,
        /// Offer named by the message.
        offer: OfferId,
        /// Channel that emitted the message.
        channel: ChannelId,
        /// State of the receiving call.
        state: &'static str,
    },

    /// A message named an offer the receiving call never registered.
    #[error("message names offer {offer} on {channel}, which this call does not own")]
    UnknownOffer {
        /// Offer named by the message.
        offer: OfferId,
        /// Channel that emitted the message.
        channel: ChannelId,
    },

    /// A commit arrived for an offer that has no resolved value.
    #[error("commit for offer {offer} carried no resolved value")]
    MissingResolution {
        /// Offer named by the commit.
        offer: OfferId,
    },
}

/// The main error type for rendezvous operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns true if this is a protocol violation.
    #[must_use]
    pub const fn is_protocol_violation(&self) -> bool {
        matches!(self.kind, ErrorKind::ProtocolViolation)
    }

    /// Returns true if a blocking wait was interrupted.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self.kind, ErrorKind::Interrupted)
    }

    /// Returns the structured violation, if this error carries one.
    #[must_use]
    pub fn violation(&self) -> Option<&ProtocolViolation> {
        self.source.as_deref()?.downcast_ref::<ProtocolViolation>()
    }

    /// Creates a protocol violation error.
    #[must_use]
    pub fn protocol_violation(violation: ProtocolViolation) -> Self {
        Self::new(ErrorKind::ProtocolViolation)
            .with_message(violation.to_string())
            .with_source(violation)
    }

    /// Creates a guard failure error for the given offer.
    #[must_use]
    pub fn guard_panicked(channel: ChannelId, offer: OfferId, detail: &str) -> Self {
        Self::new(ErrorKind::GuardPanicked)
            .with_message(format!("guard of offer {offer} on {channel} panicked: {detail}"))
    }

    /// Creates an interrupted-wait error.
    #[must_use]
    pub fn interrupted(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Interrupted).with_message(detail)
    }

    /// Creates an internal error (library bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<ProtocolViolation> for Error {
    fn from(v: ProtocolViolation) -> Self {
        Self::protocol_violation(v)
    }
}

/// Extension trait for adding context to Results.
#[allow(clippy::result_large_err)]
pub trait ResultExt<T> {
    /// Attach a context message on error.
    fn context(self, msg: impl Into<String>) -> Result<T>;
    /// Attach context message computed lazily on error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for core::result::Result<T, E> {
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_message(msg))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().with_message(f()))
    }
}

/// A specialized Result type for rendezvous operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
