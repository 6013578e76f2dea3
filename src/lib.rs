//! Core library for the `declutter` photo culling tool.
//!
//! Photos are analyzed into embeddings and quality scores, clustered into
//! similarity groups, and tracked by a selection store with linear
//! undo/redo history. Embedding computation is an injected capability
//! ([`core::provider::EmbeddingProvider`]); everything else is local.

pub mod core;
pub mod scan;
pub mod session;
pub mod store;

pub use session::Session;
pub use store::{AppState, Photo, PhotoGroup};
