//! Network description layer: catalogs, gid assembly, and the recipe
//! query surface for SONATA circuits.
//!
//! Dependency order mirrors the system overview (§2): [`mechanism`] and
//! [`morphology`] are leaves; [`node_catalog`] and [`edge_catalog`] sit
//! above them; [`network`] assembles populations and the gid bijection;
//! [`model_description`] and [`io_description`] build the per-cell query
//! data; [`recipe`] is the thin facade the host simulator talks to.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod edge_catalog;
pub mod error;
pub mod ids;
pub mod io_description;
pub mod mechanism;
pub mod model_description;
pub mod morphology;
pub mod network;
pub mod node_catalog;
pub mod node_sets;
pub mod recipe;

pub use edge_catalog::EdgeCatalog;
pub use error::{IndexKind, Result, SonataError};
pub use ids::{Gid, GlobalEdgeId, Lid, TypePopId};
pub use io_description::{CurrentClamp, IoDescription, ProbeDescriptor, TraceInfo};
pub use mechanism::{MechGroup, MechInstance, MechPlacement, SectionKind};
pub use model_description::{Connection, ModelDescription, SourceSite, TargetSite};
pub use morphology::Morphology;
pub use network::{NetworkRecord, Population, PopulationRole};
pub use node_catalog::{CellKind, NodeCatalog};
pub use node_sets::{NodeSet, NodeSets};
pub use recipe::{CellDescription, GlobalProperties, Recipe};
