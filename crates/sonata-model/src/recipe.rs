//! Recipe adapter (§4.11): the thin, thread-safe facade the host
//! simulator queries per gid.

use std::path::PathBuf;

use parking_lot::Mutex;
use sonata_storage::RecordStore;

use crate::edge_catalog::EdgeCatalog;
use crate::error::Result;
use crate::ids::Gid;
use crate::io_description::{CurrentClamp, IoDescription, TraceInfo};
use crate::mechanism::{MechInstance, SectionKind};
use crate::model_description::{Connection, ModelDescription, SourceSite, TargetSite};
use crate::morphology::Morphology;
use crate::network::NetworkRecord;
use crate::node_catalog::{CellKind, NodeCatalog};

/// Simulation-condition defaults, sourced from the configuration's
/// `conditions`/`run` blocks (§ SUPPLEMENTED FEATURES item 4), not
/// invented here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalProperties {
    /// Bath temperature, in Kelvin (`celsius + 273.15`).
    pub temperature_k: f64,
    /// Initial membrane potential, in millivolts.
    pub v_init_mv: f64,
    /// Default spike-detector threshold, in millivolts.
    pub default_threshold_mv: f64,
}

/// For cable cells: the assembled per-cell bundle a cable-cell factory
/// would consume (that factory call itself is out of scope — §1 "the
/// cable-cell construction call"). For spike-source cells: the cell's
/// spike schedule.
pub enum CellDescription {
    /// A cable cell's morphology, mechanisms, sites, and stimuli.
    Cable {
        /// The cell's morphology tree.
        morphology: Morphology,
        /// Density mechanisms by section kind.
        mechanisms: std::collections::BTreeMap<SectionKind, Vec<MechInstance>>,
        /// Source (detector) sites, each implicitly carrying a spike
        /// threshold.
        sources: Vec<SourceSite>,
        /// Target (synapse) sites.
        targets: Vec<TargetSite>,
        /// Current-clamp stimuli attached to this cell.
        clamps: Vec<CurrentClamp>,
    },
    /// A virtual cell's explicit spike schedule.
    SpikeSource {
        /// Ascending spike times.
        spike_times: Vec<f64>,
    },
}

struct RecipeState {
    node_net: NetworkRecord,
    edge_net: NetworkRecord,
    node_catalog: NodeCatalog,
    edge_catalog: EdgeCatalog,
    edge_types: RecordStore,
    model: ModelDescription,
    io: IoDescription,
    global_properties: GlobalProperties,
    base_dir: PathBuf,
}

/// The query surface handed to the host simulator. Every query acquires
/// a single coarse lock (§5): queries are read-dominated after
/// construction, but morphology/mechanism resolution performs file I/O,
/// so a plain `RwLock` would not buy much over a mutex here.
pub struct Recipe {
    state: Mutex<RecipeState>,
}

impl Recipe {
    /// Assemble a recipe from its already-built components. Construction
    /// (opening files, building catalogs, running `build_local_maps`) is
    /// the caller's responsibility (§2): this type only owns the built
    /// result and answers queries against it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        node_net: NetworkRecord,
        edge_net: NetworkRecord,
        node_catalog: NodeCatalog,
        edge_catalog: EdgeCatalog,
        edge_types: RecordStore,
        model: ModelDescription,
        io: IoDescription,
        global_properties: GlobalProperties,
        base_dir: PathBuf,
    ) -> Self {
        Self {
            state: Mutex::new(RecipeState {
                node_net,
                edge_net,
                node_catalog,
                edge_catalog,
                edge_types,
                model,
                io,
                global_properties,
                base_dir,
            }),
        }
    }

    /// `cell_description(gid)` (§4.11).
    pub fn cell_description(&self, gid: Gid) -> Result<CellDescription> {
        let state = self.state.lock();
        let (node_pop, node_local) = state.node_net.localize(gid)?;
        let node_group = state.node_net.group_of(node_pop)?;
        let node_type_id = node_group.get_int("node_type_id", node_local)? as u32;
        let type_id = sonata_storage::TypePopId::new(node_type_id, node_pop.to_string());

        match state.node_catalog.cell_kind(&type_id)? {
            CellKind::SpikeSource => Ok(CellDescription::SpikeSource {
                spike_times: state.io.spikes(gid).to_vec(),
            }),
            CellKind::Cable => {
                let morphology = state
                    .model
                    .cell_morphology(gid, &state.node_net, &state.node_catalog, &state.base_dir)?
                    .into_owned();
                let mechanisms = state.model.cell_density_mechs(gid, &state.node_net, &state.node_catalog)?;
                let sources = state.model.sources(gid).unwrap_or(&[]).to_vec();
                let targets = state.model.targets(gid).unwrap_or(&[]).iter().map(|(t, _)| t.clone()).collect();
                let clamps = state.io.current_clamps(gid).to_vec();

                Ok(CellDescription::Cable { morphology, mechanisms, sources, targets, clamps })
            }
        }
    }

    /// `num_sources(gid)`.
    pub fn num_sources(&self, gid: Gid) -> usize {
        self.state.lock().model.num_sources(gid)
    }

    /// `num_targets(gid)`.
    pub fn num_targets(&self, gid: Gid) -> usize {
        self.state.lock().model.num_targets(gid)
    }

    /// `connections_on(gid)` (§4.7).
    pub fn connections_on(&self, gid: Gid) -> Result<Vec<Connection>> {
        let state = self.state.lock();
        state.model.connections_on(gid, &state.node_net, &state.edge_net, &state.edge_catalog, &state.edge_types)
    }

    /// `probes(gid)`.
    pub fn probes(&self, gid: Gid) -> Vec<(usize, TraceInfo)> {
        self.state.lock().io.probes(gid).to_vec()
    }

    /// `global_properties()`.
    pub fn global_properties(&self) -> GlobalProperties {
        self.state.lock().global_properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn celsius_to_kelvin_conversion_is_recorded_verbatim() {
        let props = GlobalProperties { temperature_k: 36.0 + 273.15, v_init_mv: -65.0, default_threshold_mv: -10.0 };
        assert!((props.temperature_k - 309.15).abs() < 1e-9);
    }
}
