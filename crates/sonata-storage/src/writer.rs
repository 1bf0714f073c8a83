//! Output serialization for spikes and recorded traces.
//!
//! The cable simulator and its numerics are out of scope here, but
//! writing outputs back through the same container machinery this crate
//! already reads with is not — so it owns the writers too. gids are
//! always rewritten to population-local indices before serialization,
//! per the output schema.

use std::path::Path;

use crate::error::Result;
use crate::sonh::{write_sonh, DatasetValues, GroupNode};

/// Write a population's spike output: `/spikes/<population>/{node_ids, timestamps}`.
///
/// `node_ids` are already population-local (caller subtracts the
/// population's gid offset before calling).
pub fn write_spikes<P: AsRef<Path>>(
    path: P,
    population: &str,
    node_ids: Vec<i64>,
    timestamps: Vec<f64>,
) -> Result<()> {
    let pop_group = GroupNode::new(population)
        .with_dataset("node_ids", DatasetValues::Int(node_ids))
        .with_dataset("timestamps", DatasetValues::Float(timestamps));
    write_sonh(path, "spikes", vec![pop_group])
}

/// One trace bundle for a recorded population: `/reports/<population>/{data, mapping/...}`.
pub struct TraceReport {
    /// Population this report covers.
    pub population: String,
    /// `num_traces * num_samples`, row-major, one row per recorded site.
    pub data: Vec<f64>,
    /// Sample times shared by every trace in this report.
    pub time: Vec<f64>,
    /// Section/segment index recorded at each site.
    pub element_ids: Vec<i64>,
    /// Section position `[0,1]` recorded at each site.
    pub element_pos: Vec<f64>,
    /// Population-local node id owning each site.
    pub node_ids: Vec<i64>,
    /// CSR-style offsets from node index into `element_ids`/`element_pos`.
    pub index_pointers: Vec<i64>,
}

/// Write a recording report: `/reports/<population>/{data, mapping/{...}}`.
pub fn write_report<P: AsRef<Path>>(path: P, report: TraceReport) -> Result<()> {
    let mapping = GroupNode::new("mapping")
        .with_dataset("time", DatasetValues::Float(report.time))
        .with_dataset("element_ids", DatasetValues::Int(report.element_ids))
        .with_dataset("element_pos", DatasetValues::Float(report.element_pos))
        .with_dataset("node_ids", DatasetValues::Int(report.node_ids))
        .with_dataset("index_pointers", DatasetValues::Int(report.index_pointers));

    let pop_group = GroupNode::new(&report.population)
        .with_dataset("data", DatasetValues::Float(report.data))
        .with_group(mapping);

    write_sonh(path, "reports", vec![pop_group])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sonh::TabularFile;

    #[test]
    fn spike_output_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spikes.sonh");
        write_spikes(&path, "pop_e", vec![0, 2, 1], vec![0.1, 0.2, 0.3]).unwrap();

        let file = TabularFile::open(&path).unwrap();
        let pop = file.population("pop_e").unwrap();
        assert_eq!(pop.get_all_int("node_ids").unwrap(), &[0, 2, 1]);
    }

    #[test]
    fn report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.sonh");
        write_report(
            &path,
            TraceReport {
                population: "pop_e".to_string(),
                data: vec![-70.0, -69.5, -71.0, -70.2],
                time: vec![0.0, 1.0],
                element_ids: vec![0, 1],
                element_pos: vec![0.5, 0.1],
                node_ids: vec![0, 3],
                index_pointers: vec![0, 1, 2],
            },
        )
        .unwrap();

        let file = TabularFile::open(&path).unwrap();
        let pop = file.population("pop_e").unwrap();
        let mapping = pop.group("mapping").unwrap();
        assert_eq!(mapping.get_all_int("node_ids").unwrap(), &[0, 3]);
        assert_eq!(pop.dataset_size("data").unwrap(), 4);
    }
}
