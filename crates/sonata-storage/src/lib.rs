//! Binary hierarchical container and text-table readers for SONATA
//! network descriptions.
//!
//! This is the leaf layer of the front-end: the "Tabular store" (§4.1,
//! [`sonh`]) and "Record store" (§4.2, [`record`]) components. Everything
//! above this crate — catalogs, the network record, model/IO description,
//! the recipe — consumes typed reads out of these two stores and never
//! touches a raw file itself.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod schemas;
pub mod sonh;
pub mod writer;

pub use error::{IndexKind, Result, SonataError};
pub use record::{RecordStore, TypePopId};
pub use sonh::{DatasetValues, GroupNode, TabularFile};
pub use writer::{write_report, write_spikes, TraceReport};
