//! Domain layer: entities, events and repository contracts.
//!
//! - [`entities`] - Short links, cache snapshots and usage counters
//! - [`events`] - Bus messages, envelopes and lifecycle events
//! - [`repositories`] - Store trait definitions
//!
//! The domain layer has no dependency on infrastructure; store and transport
//! implementations live in [`crate::infrastructure`].

pub mod entities;
pub mod events;
pub mod repositories;
