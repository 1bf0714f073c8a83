//! Error type for the network description layer.
//!
//! The model layer does not define its own error enum — the whole
//! front-end shares one error family (`SonataError`, see §7 of the
//! design), so `sonata-model` re-exports it rather than wrapping the
//! storage layer's error a second time.

pub use sonata_storage::error::{IndexKind, Result, SonataError};
