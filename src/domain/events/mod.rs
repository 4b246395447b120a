//! Event model shared by producers and the consumer pipeline.
//!
//! Topics are named `<EntityKind>.<action>` (`URL.create`, `URL.read`). A
//! payload is the serialized [`crate::domain::entities::ShortLink`] plus
//! optional side-channel fields.

pub mod envelope;
pub mod lifecycle;

pub use envelope::{Envelope, Payload, RawMessage};
pub use lifecycle::{ENTITY_KIND, EventAction, EventPayload, LifecycleEvent};
