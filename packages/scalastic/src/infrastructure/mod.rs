//! Infrastructure layer - Engine adapters
//!
//! Only the in-memory engine lives here; HTTP adapters implement
//! [`crate::domain::SearchEngine`] in the host application.

pub mod memory_engine;

pub use memory_engine::{EngineCall, InMemoryEngine};
