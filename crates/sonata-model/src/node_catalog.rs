//! Node catalog (§3 "Node catalog entry", §4.4).
//!
//! One entry per node type row: whether the type is a cable cell or a
//! virtual spike source, and — for cable cells — the type's default
//! morphology and mechanism-group map with any `dynamics_params`
//! per-type override already folded in.

use std::collections::BTreeMap;
use std::path::Path;

use sonata_storage::RecordStore;

use crate::error::{Result, SonataError};
use crate::mechanism::{self, DensityDoc, MechInstance, OverrideDoc};
use crate::mechanism::SectionKind;
use crate::morphology::Morphology;
use crate::ids::TypePopId;

/// What a node type row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    /// A cable cell: has morphology and density mechanisms.
    Cable,
    /// A virtual spike source: no morphology, no mechanisms, only a spike
    /// train supplied at simulation time.
    SpikeSource,
}

struct CableEntry {
    morphology: Morphology,
    mechanisms: DensityDoc,
}

enum NodeEntry {
    SpikeSource,
    Cable(CableEntry),
}

/// Per-node-population metadata, resolved once at load time.
pub struct NodeCatalog {
    entries: BTreeMap<TypePopId, NodeEntry>,
}

impl NodeCatalog {
    /// Build the catalog from every row of a node record store, resolving
    /// `morphology` and `model_template` relative to `base_dir`.
    pub fn build(store: &RecordStore, base_dir: &Path) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for id in store.unique_ids() {
            let model_type = store.field(id, "model_type").unwrap_or("biophysical");

            let entry = if model_type == "virtual" {
                NodeEntry::SpikeSource
            } else {
                let morphology_rel = store
                    .field(id, "morphology")
                    .ok_or_else(|| SonataError::schema(format!("node type {}/{}: missing morphology", id.type_tag, id.population)))?;
                let morphology = Morphology::load(&base_dir.join(morphology_rel))?;

                let template_rel = store
                    .field(id, "model_template")
                    .ok_or_else(|| SonataError::schema(format!("node type {}/{}: missing model_template", id.type_tag, id.population)))?;
                let template_json = mechanism::load_json_file(&base_dir.join(template_rel))?;
                let mut mechanisms = mechanism::parse_density_doc(&template_json)?;

                if let Some(dyn_rel) = store.field(id, "dynamics_params") {
                    let overrides_json = mechanism::load_json_file(&base_dir.join(dyn_rel))?;
                    let overrides = mechanism::parse_override_doc(&overrides_json)?;
                    mechanisms = mechanism::apply_overrides(&mechanisms, &overrides);
                }

                NodeEntry::Cable(CableEntry { morphology, mechanisms })
            };

            entries.insert(id.clone(), entry);
        }

        Ok(Self { entries })
    }

    fn entry(&self, id: &TypePopId) -> Result<&NodeEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| SonataError::schema(format!("unknown node type {}/{}", id.type_tag, id.population)))
    }

    /// Whether the type is a cable cell or a virtual spike source.
    pub fn cell_kind(&self, id: &TypePopId) -> Result<CellKind> {
        match self.entry(id)? {
            NodeEntry::SpikeSource => Ok(CellKind::SpikeSource),
            NodeEntry::Cable(_) => Ok(CellKind::Cable),
        }
    }

    /// The type's morphology tree. Fails with [`SonataError::SchemaViolation`]
    /// for virtual cells.
    pub fn morphology(&self, id: &TypePopId) -> Result<&Morphology> {
        match self.entry(id)? {
            NodeEntry::Cable(c) => Ok(&c.morphology),
            NodeEntry::SpikeSource => Err(SonataError::schema(format!(
                "node type {}/{} is virtual and has no morphology",
                id.type_tag, id.population
            ))),
        }
    }

    /// The current resolved free-variable map per mechanism group.
    pub fn dynamic_params(&self, id: &TypePopId) -> Result<BTreeMap<String, BTreeMap<String, f64>>> {
        match self.entry(id)? {
            NodeEntry::Cable(c) => Ok(c
                .mechanisms
                .iter()
                .map(|(group, m)| (group.clone(), m.variables.clone()))
                .collect()),
            NodeEntry::SpikeSource => Err(SonataError::schema(format!(
                "node type {}/{} is virtual and has no dynamics parameters",
                id.type_tag, id.population
            ))),
        }
    }

    /// Apply `overrides` atop the catalog defaults, materialize every
    /// placement with alias substitution, and group the resulting
    /// mechanism instances by section kind.
    pub fn density_mech_desc(
        &self,
        id: &TypePopId,
        overrides: &OverrideDoc,
    ) -> Result<BTreeMap<SectionKind, Vec<MechInstance>>> {
        let base = match self.entry(id)? {
            NodeEntry::Cable(c) => &c.mechanisms,
            NodeEntry::SpikeSource => {
                return Err(SonataError::schema(format!(
                    "node type {}/{} is virtual and has no density mechanisms",
                    id.type_tag, id.population
                )))
            }
        };
        let resolved = mechanism::apply_overrides(base, overrides);

        let mut by_section: BTreeMap<SectionKind, Vec<MechInstance>> = BTreeMap::new();
        for group in resolved.values() {
            for (section, mech) in group.materialize() {
                by_section.entry(section).or_default().push(mech);
            }
        }
        Ok(by_section)
    }

    /// Mutate the catalog in place, applying `overrides` to a type's
    /// stored mechanism-group map. Used only at load time — the recipe
    /// surface queries with [`NodeCatalog::density_mech_desc`] instead,
    /// which never mutates.
    pub fn override_density_params(&mut self, id: &TypePopId, overrides: &OverrideDoc) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| SonataError::schema(format!("unknown node type {}/{}", id.type_tag, id.population)))?;
        match entry {
            NodeEntry::Cable(c) => {
                c.mechanisms = mechanism::apply_overrides(&c.mechanisms, overrides);
                Ok(())
            }
            NodeEntry::SpikeSource => Err(SonataError::schema(format!(
                "node type {}/{} is virtual and cannot carry mechanism overrides",
                id.type_tag, id.population
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn sample_store(dir: &Path) -> RecordStore {
        write_file(
            dir,
            "cellA.swc",
            "1 1 0.0 0.0 0.0 5.0 -1\n2 3 5.0 0.0 0.0 1.0 1\n",
        );
        write_file(
            dir,
            "pas.json",
            r#"{"pas_0": [{"e_pas": -70.0}, {"section": "dend", "mech": "pas", "e": "e_pas"}]}"#,
        );
        write_file(dir, "override.json", r#"{"pas_0": {"e_pas": -80.0}}"#);

        write_file(
            dir,
            "node_types.csv",
            "node_type_id,pop_name,model_type,morphology,model_template,dynamics_params\n\
             0,pop_e,biophysical,cellA.swc,pas.json,override.json\n\
             1,pop_i,virtual,NULL,NULL,NULL\n",
        );

        RecordStore::load(&[dir.join("node_types.csv")]).unwrap()
    }

    #[test]
    fn classifies_cable_and_spike_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        let catalog = NodeCatalog::build(&store, dir.path()).unwrap();

        let cable = TypePopId::new(0, "pop_e");
        let virt = TypePopId::new(1, "pop_i");

        assert_eq!(catalog.cell_kind(&cable).unwrap(), CellKind::Cable);
        assert_eq!(catalog.cell_kind(&virt).unwrap(), CellKind::SpikeSource);
        assert!(catalog.morphology(&cable).unwrap().has_soma());
        assert!(catalog.morphology(&virt).is_err());
    }

    #[test]
    fn per_type_dynamics_params_applied_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        let catalog = NodeCatalog::build(&store, dir.path()).unwrap();

        let cable = TypePopId::new(0, "pop_e");
        let desc = catalog.density_mech_desc(&cable, &OverrideDoc::new()).unwrap();
        let dend = desc.get(&SectionKind::Dend).unwrap();
        assert_eq!(dend[0].params.get("e"), Some(&-80.0), "type-level override from dynamics_params must win");
    }

    #[test]
    fn caller_overrides_layer_atop_type_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());
        let catalog = NodeCatalog::build(&store, dir.path()).unwrap();

        let cable = TypePopId::new(0, "pop_e");
        let mut overrides = OverrideDoc::new();
        overrides.insert("pas_0".to_string(), BTreeMap::from([("e_pas".to_string(), -90.0)]));

        let desc = catalog.density_mech_desc(&cable, &overrides).unwrap();
        let dend = desc.get(&SectionKind::Dend).unwrap();
        assert_eq!(dend[0].params.get("e"), Some(&-90.0));
    }
}
