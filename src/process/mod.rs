//! Mailbox registry: the per-thread delivery substrate.
//!
//! Channels never wake threads directly. They post protocol [`Message`]s to
//! the mailbox of an offer's origin, and the origin thread blocks on its own
//! mailbox until a terminal message arrives.
//!
//! # Guarantees
//!
//! - Posting never blocks and never fails
//! - Messages to one process are received in the order they were posted
//! - Nothing is promised about ordering across different processes
//! - Mailboxes are created lazily and live as long as their registry

mod mailbox;
mod message;
mod registry;

pub use mailbox::Mailbox;
pub use message::{Message, MessageKind};
pub use registry::{Process, Registry};
