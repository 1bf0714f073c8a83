//! Network record (§3 "Network record", §4 overview): composition of the
//! binary tabular stores into an ordered population list with a global gid
//! ↔ `(population, local_index)` bijection.

use std::collections::HashMap;
use std::sync::Arc;

use sonata_storage::TabularFile;

use crate::error::{Result, SonataError};
use crate::ids::Gid;

/// One node or edge population: its name and the binary file handle that
/// backs it.
pub struct Population {
    /// Population name.
    pub name: String,
    /// Shared handle to the binary file this population was discovered in.
    pub file: Arc<TabularFile>,
}

/// Whether a [`NetworkRecord`] was built over node or edge populations —
/// only the invariant check in [`NetworkRecord::build`] differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationRole {
    /// Node populations: `node_type_id` required, `node_id` forbidden.
    Node,
    /// Edge populations: `edge_type_id` and `indicies`/`indices` required,
    /// `edge_id` forbidden.
    Edge,
}

/// An ordered list of populations, a name → index lookup, and the
/// cumulative partition vector `P` used for the gid bijection.
pub struct NetworkRecord {
    populations: Vec<Population>,
    index_of: HashMap<String, usize>,
    /// `P[i]` is the first gid of population `i`; `P.len() == populations.len() + 1`.
    partition: Vec<u64>,
    role: PopulationRole,
}

impl NetworkRecord {
    /// Open every binary file, discover its populations, validate the
    /// §3 schema invariant for `role`, and assign gid ranges in file-then-
    /// population order.
    pub fn build(files: Vec<Arc<TabularFile>>, role: PopulationRole) -> Result<Self> {
        let mut populations = Vec::new();
        let mut index_of = HashMap::new();
        let mut partition = vec![0u64];

        for file in files {
            let names: Vec<String> = file.population_names()?.iter().map(|s| s.to_string()).collect();
            for name in names {
                let group = file.population(&name)?;

                match role {
                    PopulationRole::Node => {
                        if !group.has_dataset("node_type_id") {
                            return Err(SonataError::schema(format!("node population '{name}' missing node_type_id")));
                        }
                        if group.has_dataset("node_id") {
                            return Err(SonataError::schema(format!(
                                "node population '{name}' carries a forbidden explicit node_id dataset"
                            )));
                        }
                    }
                    PopulationRole::Edge => {
                        if !group.has_dataset("edge_type_id") {
                            return Err(SonataError::schema(format!("edge population '{name}' missing edge_type_id")));
                        }
                        if group.find_group("indicies").is_none() && group.find_group("indices").is_none() {
                            return Err(SonataError::schema(format!(
                                "edge population '{name}' missing indicies/indices sub-group"
                            )));
                        }
                        if group.has_dataset("edge_id") {
                            return Err(SonataError::schema(format!(
                                "edge population '{name}' carries a forbidden explicit edge_id dataset"
                            )));
                        }
                    }
                }

                let cardinality = match role {
                    PopulationRole::Node => group.dataset_size("node_type_id")?,
                    PopulationRole::Edge => group.dataset_size("edge_type_id")?,
                } as u64;

                if index_of.contains_key(&name) {
                    return Err(SonataError::schema(format!("duplicate population name '{name}' across files")));
                }
                index_of.insert(name.clone(), populations.len());
                populations.push(Population { name, file: file.clone() });
                partition.push(partition.last().unwrap() + cardinality);
            }
        }

        log::info!(
            "built {:?} network record: {} population(s), {} element(s)",
            role,
            populations.len(),
            partition.last().copied().unwrap_or(0)
        );

        Ok(Self {
            populations,
            index_of,
            partition,
            role,
        })
    }

    /// Whether this is a node-population or edge-population network record.
    pub fn role(&self) -> PopulationRole {
        self.role
    }

    /// Populations, in assignment order.
    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    /// Total element count across every population — `P.back()`.
    pub fn num_elements(&self) -> u64 {
        *self.partition.last().unwrap()
    }

    /// The `[start, end)` gid range assigned to a population.
    pub fn range_of(&self, pop_name: &str) -> Result<(u64, u64)> {
        let i = *self
            .index_of
            .get(pop_name)
            .ok_or_else(|| SonataError::schema(format!("unknown population '{pop_name}'")))?;
        Ok((self.partition[i], self.partition[i + 1]))
    }

    /// The group node backing a population, for direct dataset access.
    pub fn group_of(&self, pop_name: &str) -> Result<&sonata_storage::GroupNode> {
        let i = *self
            .index_of
            .get(pop_name)
            .ok_or_else(|| SonataError::schema(format!("unknown population '{pop_name}'")))?;
        self.populations[i].file.population(pop_name)
    }

    /// `localize(gid) -> (pop_name, local_index)`: the highest `i` with
    /// `P[i] <= gid`.
    pub fn localize(&self, gid: Gid) -> Result<(&str, usize)> {
        let gid_raw = gid.raw();
        if gid_raw >= self.num_elements() {
            return Err(SonataError::dataset_index("gid", gid_raw as usize));
        }
        let i = match self.partition.binary_search(&gid_raw) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        Ok((self.populations[i].name.as_str(), (gid_raw - self.partition[i]) as usize))
    }

    /// `globalize(pop_name, local_index) = P[map[pop_name]] + local_index`,
    /// as a raw `u64`. Used for both gid and global-edge-id numbering —
    /// the bijection math is identical, only the interpretation differs.
    pub fn globalize_raw(&self, pop_name: &str, local_index: usize) -> Result<u64> {
        let (start, end) = self.range_of(pop_name)?;
        let id = start + local_index as u64;
        if id >= end {
            return Err(SonataError::dataset_index(pop_name, local_index));
        }
        Ok(id)
    }

    /// `globalize(pop_name, local_index) = P[map[pop_name]] + local_index`.
    pub fn globalize(&self, pop_name: &str, local_index: usize) -> Result<Gid> {
        Ok(Gid::new(self.globalize_raw(pop_name, local_index)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonata_storage::{write_sonh, DatasetValues, GroupNode};

    fn node_file(dir: &std::path::Path, name: &str, pops: &[(&str, usize)]) -> Arc<TabularFile> {
        let groups: Vec<GroupNode> = pops
            .iter()
            .map(|(pop_name, n)| {
                GroupNode::new(*pop_name)
                    .with_dataset("node_type_id", DatasetValues::Int(vec![0; *n]))
                    .with_dataset("node_group_id", DatasetValues::Int(vec![0; *n]))
                    .with_dataset("node_group_index", DatasetValues::Int((0..*n as i64).collect()))
            })
            .collect();
        let path = dir.join(name);
        write_sonh(&path, "nodes", groups).unwrap();
        Arc::new(TabularFile::open(&path).unwrap())
    }

    #[test]
    fn bijection_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let file = node_file(dir.path(), "nodes.sonh", &[("pop_e", 4), ("pop_i", 1)]);
        let net = NetworkRecord::build(vec![file], PopulationRole::Node).unwrap();

        assert_eq!(net.num_elements(), 5);
        assert_eq!(net.range_of("pop_i").unwrap(), (4, 5));

        for (pop, n) in [("pop_e", 4usize), ("pop_i", 1usize)] {
            for k in 0..n {
                let gid = net.globalize(pop, k).unwrap();
                assert_eq!(net.localize(gid).unwrap(), (pop, k));
            }
        }
    }

    #[test]
    fn forbidden_node_id_dataset_is_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        let group = GroupNode::new("pop_e")
            .with_dataset("node_type_id", DatasetValues::Int(vec![0]))
            .with_dataset("node_id", DatasetValues::Int(vec![0]));
        let path = dir.path().join("nodes.sonh");
        write_sonh(&path, "nodes", vec![group]).unwrap();
        let file = Arc::new(TabularFile::open(&path).unwrap());

        let err = NetworkRecord::build(vec![file], PopulationRole::Node).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }

    #[test]
    fn localize_out_of_range_is_dataset_access() {
        let dir = tempfile::tempdir().unwrap();
        let file = node_file(dir.path(), "nodes.sonh", &[("pop_e", 2)]);
        let net = NetworkRecord::build(vec![file], PopulationRole::Node).unwrap();
        let err = net.localize(Gid::new(99)).unwrap_err();
        assert!(matches!(err, SonataError::DatasetAccess { .. }));
    }
}
