//! Edge catalog (§3 "Edge catalog entry", §4.5).
//!
//! One entry per edge type row: the default point-synapse mechanism, and
//! the type-table fields driving source/target population routing
//! ([`EdgeCatalog::edges_of_source`], [`EdgeCatalog::edges_of_target`],
//! [`EdgeCatalog::edge_to_source_of_target`]).

use std::collections::{BTreeMap, BTreeSet};

use sonata_storage::RecordStore;

use crate::error::{Result, SonataError};
use crate::ids::TypePopId;
use crate::mechanism::{self, MechInstance};

struct EdgeEntry {
    population: String,
    default_mech: MechInstance,
    source_pop_name: String,
    target_pop_name: String,
}

/// Per-edge-population metadata, resolved once at load time.
pub struct EdgeCatalog {
    entries: BTreeMap<TypePopId, EdgeEntry>,
}

impl EdgeCatalog {
    /// Build the catalog from every row of an edge record store, resolving
    /// `dynamics_params` relative to `base_dir`.
    pub fn build(store: &RecordStore, base_dir: &std::path::Path) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for id in store.unique_ids() {
            let model_template = store
                .field(id, "model_template")
                .ok_or_else(|| SonataError::schema(format!("edge type {}/{}: missing model_template", id.type_tag, id.population)))?
                .to_string();

            let default_mech = if let Some(dyn_params) = store.field(id, "dynamics_params") {
                let doc = mechanism::load_json_file(&base_dir.join(dyn_params))?;
                let mech = mechanism::parse_point_mechanism(&doc)?;
                if mech.name != model_template {
                    return Err(SonataError::schema(format!(
                        "edge type {}/{}: point mechanism name '{}' disagrees with model_template '{}'",
                        id.type_tag, id.population, mech.name, model_template
                    )));
                }
                mech
            } else {
                MechInstance::bare(model_template.clone())
            };

            let source_pop_name = store
                .field(id, "source_pop_name")
                .ok_or_else(|| SonataError::schema(format!("edge type {}/{}: missing source_pop_name", id.type_tag, id.population)))?
                .to_string();
            let target_pop_name = store
                .field(id, "target_pop_name")
                .ok_or_else(|| SonataError::schema(format!("edge type {}/{}: missing target_pop_name", id.type_tag, id.population)))?
                .to_string();

            entries.insert(
                id.clone(),
                EdgeEntry {
                    population: id.population.clone(),
                    default_mech,
                    source_pop_name,
                    target_pop_name,
                },
            );
        }

        Ok(Self { entries })
    }

    /// The default point-synapse mechanism for an edge type.
    pub fn default_mech(&self, id: &TypePopId) -> Result<&MechInstance> {
        self.entries
            .get(id)
            .map(|e| &e.default_mech)
            .ok_or_else(|| SonataError::schema(format!("unknown edge type {}/{}", id.type_tag, id.population)))
    }

    /// Edge populations whose type rows declare `source_pop_name = pop`.
    pub fn edges_of_source(&self, pop: &str) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|e| e.source_pop_name == pop)
            .map(|e| e.population.clone())
            .collect()
    }

    /// Edge populations whose type rows declare `target_pop_name = pop`.
    pub fn edges_of_target(&self, pop: &str) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|e| e.target_pop_name == pop)
            .map(|e| e.population.clone())
            .collect()
    }

    /// `(edge_pop, source_pop)` pairs whose targets land on `pop`.
    pub fn edge_to_source_of_target(&self, pop: &str) -> Vec<(String, String)> {
        let pairs: BTreeSet<(String, String)> = self
            .entries
            .values()
            .filter(|e| e.target_pop_name == pop)
            .map(|e| (e.population.clone(), e.source_pop_name.clone()))
            .collect();
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn default_mech_falls_back_to_bare_instance() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(
            &dir,
            "edge_types.csv",
            "edge_type_id,pop_name,source_pop_name,target_pop_name,model_template,dynamics_params\n\
             0,e_to_i,pop_e,pop_i,expsyn,NULL\n",
        );
        let store = RecordStore::load(&[csv]).unwrap();
        let catalog = EdgeCatalog::build(&store, dir.path()).unwrap();

        let id = TypePopId::new(0, "e_to_i");
        let mech = catalog.default_mech(&id).unwrap();
        assert_eq!(mech.name, "expsyn");
        assert!(mech.params.is_empty());
    }

    #[test]
    fn topology_queries_group_by_population() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(
            &dir,
            "edge_types.csv",
            "edge_type_id,pop_name,source_pop_name,target_pop_name,model_template,dynamics_params\n\
             0,e_to_i,pop_e,pop_i,expsyn,NULL\n\
             1,i_to_e,pop_i,pop_e,inhsyn,NULL\n",
        );
        let store = RecordStore::load(&[csv]).unwrap();
        let catalog = EdgeCatalog::build(&store, dir.path()).unwrap();

        assert_eq!(catalog.edges_of_source("pop_e"), BTreeSet::from(["e_to_i".to_string()]));
        assert_eq!(catalog.edges_of_target("pop_i"), BTreeSet::from(["e_to_i".to_string()]));
        assert_eq!(
            catalog.edge_to_source_of_target("pop_i"),
            vec![("e_to_i".to_string(), "pop_e".to_string())]
        );
    }

    #[test]
    fn mismatched_point_mechanism_name_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mech_path = dir.path().join("inhsyn.json");
        std::fs::write(&mech_path, r#"{"expsyn": {"tau": 2.0}}"#).unwrap();
        let csv = write_csv(
            &dir,
            "edge_types.csv",
            &format!(
                "edge_type_id,pop_name,source_pop_name,target_pop_name,model_template,dynamics_params\n\
                 0,e_to_i,pop_e,pop_i,inhsyn,{}\n",
                mech_path.display()
            ),
        );
        let store = RecordStore::load(&[csv]).unwrap();
        let err = EdgeCatalog::build(&store, dir.path()).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }
}
