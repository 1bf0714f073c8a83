//! IO description (§4.10): per-cell spike-train inputs, current-clamp
//! schedules, and probe descriptors.

use std::collections::HashMap;
use std::path::Path;

use sonata_storage::TabularFile;

use crate::error::{Result, SonataError};
use crate::ids::Gid;
use crate::network::NetworkRecord;

/// A current-clamp stimulus attached to a cell (§4.10 "Current clamps").
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentClamp {
    /// Stimulus duration.
    pub duration: f64,
    /// Stimulus amplitude.
    pub amplitude: f64,
    /// Delay before onset.
    pub delay: f64,
    /// `(section id, position)` the electrode is attached at.
    pub location: (u32, f64),
}

/// A request to record a variable at a location on a cell (§4.10 "Probes").
#[derive(Debug, Clone)]
pub struct ProbeDescriptor {
    /// Recorded variable kind: `"v"` or `"i"`.
    pub kind: String,
    /// Population the node ids are local to.
    pub population: String,
    /// Local node ids to probe; empty means every node in the population.
    pub node_ids: Vec<usize>,
    /// Section id to record at.
    pub section_id: u32,
    /// Position along the section to record at.
    pub section_pos: f64,
    /// Output file this probe's samples are written to.
    pub file_name: String,
}

/// A resolved probe attached to one gid: its kind and location, absent the
/// gid itself (already the key of [`IoDescription::probe_map`]).
#[derive(Debug, Clone)]
pub struct TraceInfo {
    /// Recorded variable kind.
    pub kind: String,
    /// Section id.
    pub section_id: u32,
    /// Position along the section.
    pub section_pos: f64,
    /// Output file this probe's samples are written to.
    pub file_name: String,
}

/// Resolved per-cell spike trains, current clamps, and probes.
#[derive(Default)]
pub struct IoDescription {
    spikes: HashMap<Gid, Vec<f64>>,
    clamps: HashMap<Gid, Vec<CurrentClamp>>,
    probe_map: HashMap<Gid, Vec<(usize, TraceInfo)>>,
    probe_groups: HashMap<String, Vec<(Gid, usize)>>,
}

impl IoDescription {
    /// Resolve spike-train inputs for every gid in `gids` against a set of
    /// `(spike table, population name)` pairs.
    pub fn load_spikes(&mut self, gids: &[Gid], node_net: &NetworkRecord, tables: &[(TabularFile, String)]) -> Result<()> {
        for &gid in gids {
            let (pop_name, local_index) = node_net.localize(gid)?;
            let mut timestamps = Vec::new();

            for (table, table_pop) in tables {
                if table_pop != pop_name {
                    continue;
                }
                let spikes_group = table.population(table_pop)?;
                let (r0, r1) = spikes_group.get_int_pair("gid_to_range", local_index)?;
                let slice = spikes_group.get_f64_slice("timestamps", r0 as usize, r1 as usize)?;
                timestamps.extend_from_slice(slice);
            }

            timestamps.sort_by(|a, b| a.partial_cmp(b).unwrap());
            self.spikes.insert(gid, timestamps);
        }
        Ok(())
    }

    /// The sorted spike train for `gid`.
    pub fn spikes(&self, gid: Gid) -> &[f64] {
        self.spikes.get(&gid).map_or(&[], Vec::as_slice)
    }

    /// Join an electrode parameter table with a location table (§4.10
    /// "Current clamps") and attach the resulting clamps to their gids.
    pub fn load_current_clamps(&mut self, electrode_file: &Path, location_file: &Path, node_net: &NetworkRecord) -> Result<()> {
        let electrodes = read_csv_rows(electrode_file)?;
        let locations = read_csv_rows(location_file)?;

        let mut electrode_by_id: HashMap<i64, &HashMap<String, String>> = HashMap::new();
        for row in &electrodes {
            let id: i64 = row
                .get("electrode_id")
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| SonataError::schema(format!("{}: missing electrode_id", electrode_file.display())))?;
            electrode_by_id.insert(id, row);
        }

        for row in &locations {
            let id: i64 = row
                .get("electrode_id")
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| SonataError::schema(format!("{}: missing electrode_id", location_file.display())))?;
            let electrode = electrode_by_id.get(&id).ok_or_else(|| {
                SonataError::schema(format!("location electrode_id {id} has no matching electrode parameter row"))
            })?;

            let dur: f64 = electrode.get("dur").and_then(|v| v.parse().ok()).ok_or_else(|| SonataError::schema("missing dur"))?;
            let amp: f64 = electrode.get("amp").and_then(|v| v.parse().ok()).ok_or_else(|| SonataError::schema("missing amp"))?;
            let delay: f64 = electrode.get("delay").and_then(|v| v.parse().ok()).ok_or_else(|| SonataError::schema("missing delay"))?;

            let node_id: usize = row
                .get("node_id")
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| SonataError::schema("missing node_id"))?;
            let population = row.get("population").ok_or_else(|| SonataError::schema("missing population"))?;
            let sec_id: u32 = row.get("sec_id").and_then(|v| v.parse().ok()).ok_or_else(|| SonataError::schema("missing sec_id"))?;
            let seg_x: f64 = row.get("seg_x").and_then(|v| v.parse().ok()).ok_or_else(|| SonataError::schema("missing seg_x"))?;

            let gid = node_net.globalize(population, node_id)?;
            self.clamps.entry(gid).or_default().push(CurrentClamp {
                duration: dur,
                amplitude: amp,
                delay,
                location: (sec_id, seg_x),
            });
        }

        Ok(())
    }

    /// Current clamps attached to `gid`.
    pub fn current_clamps(&self, gid: Gid) -> &[CurrentClamp] {
        self.clamps.get(&gid).map_or(&[], Vec::as_slice)
    }

    /// Assign each probe a dense per-gid index and populate `probe_map`
    /// and `probe_groups` (§4.10 "Probes").
    pub fn load_probes(&mut self, descriptors: &[ProbeDescriptor], node_net: &NetworkRecord) -> Result<()> {
        let mut counters: HashMap<Gid, usize> = HashMap::new();

        for descriptor in descriptors {
            let node_ids: Vec<usize> = if descriptor.node_ids.is_empty() {
                let (start, end) = node_net.range_of(&descriptor.population)?;
                (0..(end - start) as usize).collect()
            } else {
                descriptor.node_ids.clone()
            };

            for local_id in node_ids {
                let gid = node_net.globalize(&descriptor.population, local_id)?;
                let index = counters.entry(gid).or_insert(0);
                let this_index = *index;
                *index += 1;

                self.probe_map.entry(gid).or_default().push((
                    this_index,
                    TraceInfo {
                        kind: descriptor.kind.clone(),
                        section_id: descriptor.section_id,
                        section_pos: descriptor.section_pos,
                        file_name: descriptor.file_name.clone(),
                    },
                ));
                self.probe_groups.entry(descriptor.file_name.clone()).or_default().push((gid, this_index));
            }
        }

        Ok(())
    }

    /// Number of probes attached to `gid`.
    pub fn num_probes(&self, gid: Gid) -> usize {
        self.probe_map.get(&gid).map_or(0, Vec::len)
    }

    /// The `(index, trace info)` pairs attached to `gid`.
    pub fn probes(&self, gid: Gid) -> &[(usize, TraceInfo)] {
        self.probe_map.get(&gid).map_or(&[], Vec::as_slice)
    }

    /// The `(gid, index)` pairs writing to a given output file.
    pub fn probe_group(&self, file_name: &str) -> &[(Gid, usize)] {
        self.probe_groups.get(file_name).map_or(&[], Vec::as_slice)
    }
}

fn read_csv_rows(path: &Path) -> Result<Vec<HashMap<String, String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| SonataError::file_open(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    let headers = reader
        .headers()
        .map_err(|e| SonataError::file_open(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SonataError::file_open(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        let mut row = HashMap::with_capacity(headers.len());
        for (col, header) in headers.iter().enumerate() {
            if let Some(value) = record.get(col) {
                row.insert(header.to_string(), value.to_string());
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonata_storage::{write_sonh, DatasetValues, GroupNode};
    use std::sync::Arc;

    fn node_net_with(dir: &Path, pops: &[(&str, usize)]) -> NetworkRecord {
        let groups: Vec<GroupNode> = pops
            .iter()
            .map(|(name, n)| {
                GroupNode::new(*name)
                    .with_dataset("node_type_id", DatasetValues::Int(vec![0; *n]))
                    .with_dataset("node_group_id", DatasetValues::Int(vec![0; *n]))
                    .with_dataset("node_group_index", DatasetValues::Int((0..*n as i64).collect()))
            })
            .collect();
        let path = dir.join("nodes.sonh");
        write_sonh(&path, "nodes", groups).unwrap();
        let file = Arc::new(TabularFile::open(&path).unwrap());
        NetworkRecord::build(vec![file], crate::network::PopulationRole::Node).unwrap()
    }

    #[test]
    fn spike_input_concatenates_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let node_net = node_net_with(dir.path(), &[("pop_e", 2)]);

        let spikes_group = GroupNode::new("pop_e")
            .with_dataset("gid_to_range", DatasetValues::IntPair(vec![(0, 0), (0, 5)]))
            .with_dataset("timestamps", DatasetValues::Float(vec![0.0, 15.0, 30.0, 45.0, 60.0]));
        let spikes_path = dir.path().join("spikes.sonh");
        write_sonh(&spikes_path, "spikes", vec![spikes_group]).unwrap();
        let spikes_file = TabularFile::open(&spikes_path).unwrap();

        let mut io = IoDescription::default();
        io.load_spikes(&[Gid::new(1)], &node_net, &[(spikes_file, "pop_e".to_string())]).unwrap();
        assert_eq!(io.spikes(Gid::new(1)), &[0.0, 15.0, 30.0, 45.0, 60.0]);
    }

    #[test]
    fn current_clamp_joins_electrode_and_location() {
        let dir = tempfile::tempdir().unwrap();
        let node_net = node_net_with(dir.path(), &[("pop_e", 1)]);

        let electrode = dir.path().join("electrode.csv");
        std::fs::write(&electrode, "electrode_id,dur,amp,delay\n7,5,0.4,0\n").unwrap();
        let location = dir.path().join("location.csv");
        std::fs::write(&location, "electrode_id,node_id,population,sec_id,seg_x\n7,0,pop_e,0,0.5\n").unwrap();

        let mut io = IoDescription::default();
        io.load_current_clamps(&electrode, &location, &node_net).unwrap();

        let clamps = io.current_clamps(Gid::new(0));
        assert_eq!(clamps, &[CurrentClamp { duration: 5.0, amplitude: 0.4, delay: 0.0, location: (0, 0.5) }]);
    }

    #[test]
    fn current_clamp_missing_electrode_row_fails() {
        let dir = tempfile::tempdir().unwrap();
        let node_net = node_net_with(dir.path(), &[("pop_e", 1)]);

        let electrode = dir.path().join("electrode.csv");
        std::fs::write(&electrode, "electrode_id,dur,amp,delay\n").unwrap();
        let location = dir.path().join("location.csv");
        std::fs::write(&location, "electrode_id,node_id,population,sec_id,seg_x\n7,0,pop_e,0,0.5\n").unwrap();

        let mut io = IoDescription::default();
        let err = io.load_current_clamps(&electrode, &location, &node_net).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }

    #[test]
    fn probe_indexing_matches_seed_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let node_net = node_net_with(dir.path(), &[("pop_e", 4)]);

        let descriptors = vec![
            ProbeDescriptor {
                kind: "v".to_string(),
                population: "pop_e".to_string(),
                node_ids: vec![0, 2],
                section_id: 0,
                section_pos: 0.5,
                file_name: "F0".to_string(),
            },
            ProbeDescriptor {
                kind: "i".to_string(),
                population: "pop_e".to_string(),
                node_ids: vec![0, 3],
                section_id: 1,
                section_pos: 0.1,
                file_name: "F1".to_string(),
            },
        ];

        let mut io = IoDescription::default();
        io.load_probes(&descriptors, &node_net).unwrap();

        assert_eq!(io.num_probes(Gid::new(0)), 2);
        assert_eq!(io.num_probes(Gid::new(1)), 0);
        assert_eq!(io.probe_group("F0"), &[(Gid::new(0), 0), (Gid::new(2), 0)]);
        assert_eq!(io.probe_group("F1"), &[(Gid::new(0), 1), (Gid::new(3), 0)]);
    }
}
