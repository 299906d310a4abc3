//! Synchronous channels and the offers registered with them.
//!
//! A [`Channel`] never buffers values. A send completes only when a receive
//! on another process takes the value, and both sides learn the outcome from
//! `Commit` messages in their mailboxes.
//!
//! # Module Contents
//!
//! - [`offer`]: offers, offer kinds and receive guards
//! - [`synchronous`]: the channel, its matching scan and lockdown protocol

pub mod offer;
pub mod synchronous;

pub use offer::{Guard, Offer, OfferKind};
pub use synchronous::{Channel, ChannelStats};
