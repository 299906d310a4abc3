//! Core types for the rendezvous protocol.
//!
//! - [`id`]: Identifier types (`ChannelId`, `OfferId`, `ProcessId`, `Epoch`)

pub mod id;

pub use id::{ChannelId, Epoch, OfferId, ProcessId};
