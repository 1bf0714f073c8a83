//! Assembles a [`sonata_model::Recipe`] from a parsed [`SimConfig`]:
//! opens every binary/text file the configuration names, builds the
//! catalogs and network records, and runs the source/target gather.
//!
//! This wiring lives at the CLI boundary (§2) so `sonata-model` never
//! touches raw JSON.

use std::path::Path;
use std::sync::Arc;

use sonata_model::{
    EdgeCatalog, Gid, GlobalProperties, IoDescription, ModelDescription, NetworkRecord, NodeCatalog, NodeSets,
    PopulationRole, ProbeDescriptor, Recipe,
};
use sonata_storage::{RecordStore, TabularFile};

use crate::config::{CircuitConfig, InputEntry, SimConfig};
use crate::error::{CliError, CliResult};

/// Open and assemble everything a [`Recipe`] needs, returning it
/// alongside the total cell count (`P.back()` of the node network) so
/// the caller can iterate every gid without reaching into the recipe's
/// private state.
pub fn build_recipe(config: &SimConfig, base_dir: &Path) -> CliResult<(Recipe, u64)> {
    let circuit = CircuitConfig::load(&base_dir.join(&config.network))?;

    let mut node_files = Vec::new();
    let mut node_type_paths = Vec::new();
    for entry in &circuit.nodes {
        node_files.push(Arc::new(TabularFile::open(base_dir.join(&entry.nodes_file))?));
        node_type_paths.push(base_dir.join(&entry.node_types_file));
    }
    let mut edge_files = Vec::new();
    let mut edge_type_paths = Vec::new();
    for entry in &circuit.edges {
        edge_files.push(Arc::new(TabularFile::open(base_dir.join(&entry.edges_file))?));
        edge_type_paths.push(base_dir.join(&entry.edge_types_file));
    }

    let node_net = NetworkRecord::build(node_files, PopulationRole::Node)?;
    let edge_net = NetworkRecord::build(edge_files, PopulationRole::Edge)?;

    let node_types = RecordStore::load(&node_type_paths)?;
    let edge_types = RecordStore::load(&edge_type_paths)?;

    let node_catalog = NodeCatalog::build(&node_types, base_dir)?;
    let edge_catalog = EdgeCatalog::build(&edge_types, base_dir)?;

    let num_cells = node_net.num_elements();
    let all_gids: Vec<Gid> = (0..num_cells).map(Gid::new).collect();

    let model = ModelDescription::build_local_maps(&all_gids, &node_net, &edge_net, &edge_catalog, &edge_types)?;

    let node_sets = match &config.node_sets_file {
        Some(path) => Some(NodeSets::load(&base_dir.join(path))?),
        None => None,
    };

    let mut io = IoDescription::default();
    for (name, input) in &config.inputs {
        match input {
            InputEntry::Spikes { input_file, node_set } => {
                let sets = node_sets
                    .as_ref()
                    .ok_or_else(|| CliError::config(format!("input '{name}': node_sets_file not configured")))?;
                let set = sets.resolve(node_set)?;
                let gids: Vec<Gid> =
                    set.node_ids.iter().map(|&id| node_net.globalize(&set.population, id)).collect::<sonata_model::Result<_>>()?;
                let table = TabularFile::open(base_dir.join(input_file))?;
                io.load_spikes(&gids, &node_net, &[(table, set.population.clone())])?;
            }
            InputEntry::CurrentClamp { electrode_file, input_file } => {
                io.load_current_clamps(&base_dir.join(electrode_file), &base_dir.join(input_file), &node_net)?;
            }
        }
    }

    let mut descriptors = Vec::new();
    for (name, report) in &config.reports {
        let sets = node_sets
            .as_ref()
            .ok_or_else(|| CliError::config(format!("report '{name}': node_sets_file not configured")))?;
        let set = sets.resolve(&report.node_set)?;
        descriptors.push(ProbeDescriptor {
            kind: report.variable_name.clone(),
            population: set.population.clone(),
            node_ids: set.node_ids.clone(),
            section_id: report.section_id,
            section_pos: report.section_pos,
            file_name: report.report_file.to_string_lossy().into_owned(),
        });
    }
    io.load_probes(&descriptors, &node_net)?;

    let global_properties = GlobalProperties {
        temperature_k: config.conditions.celsius + 273.15,
        v_init_mv: config.conditions.v_init,
        default_threshold_mv: config.run.spike_threshold,
    };

    let recipe = Recipe::new(node_net, edge_net, node_catalog, edge_catalog, edge_types, model, io, global_properties, base_dir.to_path_buf());

    Ok((recipe, num_cells))
}
