//! Infrastructure layer: adapters for external systems.
//!
//! - [`cache`] - Redirect snapshot caches and the background write queue
//! - [`persistence`] - Durable link store and metrics store
//! - [`messaging`] - Event bus publishers and sources

pub mod cache;
pub mod messaging;
pub mod persistence;
