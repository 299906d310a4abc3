//! Rendezvous: CSP-style synchronous channels with guarded receives and
//! multi-way select.
//!
//! # Overview
//!
//! Two threads synchronize when one offers to send a value on a channel and
//! the other offers to receive it. Nothing is buffered: both calls return only
//! after the value changed hands. A `select` registers several offers across
//! any number of channels and commits to exactly one of them, even though
//! each channel matches offers independently under its own lock.
//!
//! # Core Guarantees
//!
//! - **Exclusivity**: a send offer commits with at most one receive offer
//! - **Select atomicity**: a select commits exactly one offer; when it returns
//!   none of its other offers remain registered anywhere
//! - **Guard correctness**: a guarded receive only ever resolves to a value
//!   its guard accepts
//! - **FIFO delivery**: protocol messages to one process arrive in send order
//!
//! # Module Structure
//!
//! - [`types`]: Identifiers for channels, offers, processes and epochs
//! - [`error`]: Error types
//! - [`config`]: Registry configuration
//! - [`process`]: Mailboxes, the mailbox registry and per-thread processes
//! - [`channel`]: Synchronous channels and offers
//! - [`action`]: Send and receive actions with continuations
//! - [`command`]: Blocking `execute` and `select`
//!
//! # Example
//!
//! ```ignore
//! use rendezvous::{receive_when, send, Channel};
//!
//! let ch = Channel::<i32>::with_label("numbers");
//! for n in 1..=3 {
//!     let tx = ch.clone();
//!     std::thread::spawn(move || send(&tx, n));
//! }
//! assert_eq!(receive_when(&ch, |n| *n == 2)?, 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod action;
pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod process;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenient access to core types
pub use action::{Action, Arm};
pub use channel::{Channel, ChannelStats, Guard};
pub use command::{execute, receive, receive_when, select, send, SelectSession, Step};
pub use config::{Config, ConfigError};
pub use error::{Error, ErrorCategory, ErrorKind, ProtocolViolation, Result, ResultExt};
pub use process::{Mailbox, Message, MessageKind, Process, Registry};
pub use types::{ChannelId, Epoch, OfferId, ProcessId};
