//! `SONH` ("SONATA Hierarchical") binary container format.
//!
//! The network description treats the binary node/edge files as an
//! opaque "columnar hierarchical binary file": groups, sub-groups, and
//! typed datasets, read by random access. There is no HDF5 binding here;
//! instead this format follows the bespoke binary container style used
//! elsewhere in this stack (`VCSR`/`VEVT`/`VMSK`): a magic number, a
//! version, a checksum, and `memmap2`-backed reads. This module is a
//! fourth member of that family.
//!
//! On disk: `[magic: 4][version: u32 LE][body_len: u64 LE][body_checksum: u32 LE][bincode body]`.
//! The body is a [`GroupNode`] tree. Opening a file maps it read-only and
//! deserializes the body directly out of the mapped bytes; every typed
//! accessor below is then a cheap slice index into that in-memory tree, no
//! further I/O.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SonataError};
use crate::schemas::{calculate_checksum, magic, validate_checksum, validate_magic, SONH_VERSION};

const HEADER_LEN: usize = 4 + 4 + 8 + 4;

/// One column of a group: a name plus its typed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DatasetValues {
    /// A 1-D array of signed 64-bit integers (ids, type tags, section indices).
    Int(Vec<i64>),
    /// A 2-D, 2-column array of signed 64-bit integers (ranges, row pairs).
    IntPair(Vec<(i64, i64)>),
    /// A 1-D array of double-precision floats (positions, weights, delays).
    Float(Vec<f64>),
    /// A 1-D array of UTF-8 strings (morphology paths, model templates).
    Str(Vec<String>),
}

impl DatasetValues {
    fn len(&self) -> usize {
        match self {
            DatasetValues::Int(v) => v.len(),
            DatasetValues::IntPair(v) => v.len(),
            DatasetValues::Float(v) => v.len(),
            DatasetValues::Str(v) => v.len(),
        }
    }
}

/// A named group: may carry datasets and nested sub-groups.
///
/// Node/edge populations are groups; per-edge-group and per-node-group
/// overrides (keyed by the stringified group id) are nested sub-groups of
/// a population, exactly as laid out in the SONATA binary schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupNode {
    /// This group's local name.
    pub name: String,
    /// Nested sub-groups, in insertion order.
    pub groups: Vec<GroupNode>,
    /// Datasets directly owned by this group, in insertion order.
    pub datasets: Vec<(String, DatasetValues)>,
}

impl GroupNode {
    /// Create an empty, named group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            datasets: Vec::new(),
        }
    }

    /// Attach a dataset to this group, returning `self` for chained
    /// construction (used heavily by tests that build fixtures in-line).
    pub fn with_dataset(mut self, name: impl Into<String>, values: DatasetValues) -> Self {
        self.datasets.push((name.into(), values));
        self
    }

    /// Attach a nested sub-group.
    pub fn with_group(mut self, child: GroupNode) -> Self {
        self.groups.push(child);
        self
    }

    /// Index of a direct child group by name, or `None`.
    pub fn find_group(&self, name: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.name == name)
    }

    /// A direct child group by name.
    pub fn group(&self, name: &str) -> Option<&GroupNode> {
        self.find_group(name).map(|i| &self.groups[i])
    }

    /// Index of a directly-owned dataset by name, or `None`.
    pub fn find_dataset(&self, name: &str) -> Option<usize> {
        self.datasets.iter().position(|(n, _)| n == name)
    }

    fn dataset(&self, name: &str) -> Option<&DatasetValues> {
        self.find_dataset(name).map(|i| &self.datasets[i].1)
    }

    /// Number of elements in a dataset.
    pub fn dataset_size(&self, name: &str) -> Result<usize> {
        self.dataset(name)
            .map(|d| d.len())
            .ok_or_else(|| SonataError::dataset_index(name, 0))
    }

    /// Read a single integer element.
    pub fn get_int(&self, name: &str, i: usize) -> Result<i64> {
        match self.dataset(name) {
            Some(DatasetValues::Int(v)) => {
                v.get(i).copied().ok_or_else(|| SonataError::dataset_index(name, i))
            }
            _ => Err(SonataError::dataset_index(name, i)),
        }
    }

    /// Read a single float element.
    pub fn get_f64(&self, name: &str, i: usize) -> Result<f64> {
        match self.dataset(name) {
            Some(DatasetValues::Float(v)) => {
                v.get(i).copied().ok_or_else(|| SonataError::dataset_index(name, i))
            }
            _ => Err(SonataError::dataset_index(name, i)),
        }
    }

    /// Read a single string element.
    pub fn get_str(&self, name: &str, i: usize) -> Result<&str> {
        match self.dataset(name) {
            Some(DatasetValues::Str(v)) => {
                v.get(i).map(String::as_str).ok_or_else(|| SonataError::dataset_index(name, i))
            }
            _ => Err(SonataError::dataset_index(name, i)),
        }
    }

    /// Read a half-open slice `[i, j)` of an integer dataset.
    pub fn get_int_slice(&self, name: &str, i: usize, j: usize) -> Result<&[i64]> {
        match self.dataset(name) {
            Some(DatasetValues::Int(v)) if j <= v.len() && i <= j => Ok(&v[i..j]),
            _ => Err(SonataError::dataset_range(name, i, j)),
        }
    }

    /// Read a half-open slice `[i, j)` of a float dataset.
    pub fn get_f64_slice(&self, name: &str, i: usize, j: usize) -> Result<&[f64]> {
        match self.dataset(name) {
            Some(DatasetValues::Float(v)) if j <= v.len() && i <= j => Ok(&v[i..j]),
            _ => Err(SonataError::dataset_range(name, i, j)),
        }
    }

    /// Read one row of a 2-column integer dataset.
    pub fn get_int_pair(&self, name: &str, i: usize) -> Result<(i64, i64)> {
        match self.dataset(name) {
            Some(DatasetValues::IntPair(v)) => {
                v.get(i).copied().ok_or_else(|| SonataError::dataset_index(name, i))
            }
            _ => Err(SonataError::dataset_index(name, i)),
        }
    }

    /// Read the entire integer dataset.
    pub fn get_all_int(&self, name: &str) -> Result<&[i64]> {
        match self.dataset(name) {
            Some(DatasetValues::Int(v)) => Ok(v),
            _ => Err(SonataError::dataset_index(name, 0)),
        }
    }

    /// Read the entire 2-column integer dataset.
    pub fn get_all_int_pairs(&self, name: &str) -> Result<&[(i64, i64)]> {
        match self.dataset(name) {
            Some(DatasetValues::IntPair(v)) => Ok(v),
            _ => Err(SonataError::dataset_index(name, 0)),
        }
    }

    /// Whether a dataset exists on this group.
    pub fn has_dataset(&self, name: &str) -> bool {
        self.find_dataset(name).is_some()
    }
}

/// A read-only, memory-mapped `SONH` container.
///
/// Dataset handles are conceptually "opened" and "closed" around each
/// accessor call — in practice this means we never hold anything beyond a
/// shared reference into the mapped, already-parsed tree, so there is
/// nothing to leak on an error return.
pub struct TabularFile {
    // Kept alive for the lifetime of the container; the parsed tree below
    // no longer borrows from it (bincode deserializes owned `String`s and
    // `Vec`s), but dropping the mapping early would be surprising for a
    // type whose whole point is "this file stays open".
    _mmap: Mmap,
    root: GroupNode,
    path: PathBuf,
}

impl TabularFile {
    /// Open and parse a `SONH` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("opening SONH container {}", path.display());
        let file = File::open(&path).map_err(|e| SonataError::file_open(path.clone(), e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| SonataError::file_open(path.clone(), e))?;

        if mmap.len() < HEADER_LEN {
            log::warn!("{}: file too short to contain a SONH header", path.display());
            return Err(SonataError::schema(format!(
                "{}: file too short to contain a SONH header",
                path.display()
            )));
        }

        let found_magic = [mmap[0], mmap[1], mmap[2], mmap[3]];
        validate_magic(found_magic, magic::SONH)?;

        let version = u32::from_le_bytes(mmap[4..8].try_into().unwrap());
        if version != SONH_VERSION {
            return Err(SonataError::schema(format!(
                "unsupported SONH version {version}, expected {SONH_VERSION}"
            )));
        }

        let body_len = u64::from_le_bytes(mmap[8..16].try_into().unwrap()) as usize;
        let body_checksum = u32::from_le_bytes(mmap[16..20].try_into().unwrap());

        let body_start = HEADER_LEN;
        let body_end = body_start
            .checked_add(body_len)
            .filter(|&end| end <= mmap.len())
            .ok_or_else(|| SonataError::schema(format!("{}: truncated SONH body", path.display())))?;
        let body = &mmap[body_start..body_end];

        validate_checksum(body, body_checksum)?;

        let root: GroupNode = bincode::deserialize(body)
            .map_err(|e| SonataError::schema(format!("{}: malformed SONH body: {e}", path.display())))?;

        log::debug!("opened SONH container {} (root group '{}')", path.display(), root.name);

        Ok(Self {
            _mmap: mmap,
            root,
            path,
        })
    }

    /// The path this container was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's single top-level group (conventionally `nodes` or `edges`).
    pub fn top_group(&self) -> Result<&GroupNode> {
        self.root
            .groups
            .first()
            .ok_or_else(|| SonataError::schema(format!("{}: no top-level group", self.path.display())))
    }

    /// Populations discovered by enumerating the top-level group's children.
    pub fn populations(&self) -> Result<&[GroupNode]> {
        Ok(&self.top_group()?.groups)
    }

    /// Look up one population by name.
    pub fn population(&self, name: &str) -> Result<&GroupNode> {
        self.top_group()?
            .group(name)
            .ok_or_else(|| SonataError::schema(format!("population '{name}' not found in {}", self.path.display())))
    }

    /// Population names, in file order.
    pub fn population_names(&self) -> Result<Vec<&str>> {
        Ok(self.populations()?.iter().map(|g| g.name.as_str()).collect())
    }
}

/// Serialize a `GroupNode` tree to a `SONH` file.
///
/// `root_group_name` is the file's single top-level group name (`"nodes"`
/// or `"edges"`); `populations` become its children.
pub fn write_sonh<P: AsRef<Path>>(path: P, root_group_name: &str, populations: Vec<GroupNode>) -> Result<()> {
    let mut seen = HashSet::new();
    for pop in &populations {
        if !seen.insert(pop.name.clone()) {
            return Err(SonataError::schema(format!("duplicate population name '{}'", pop.name)));
        }
    }

    let root = GroupNode {
        name: String::new(),
        groups: vec![GroupNode {
            name: root_group_name.to_string(),
            groups: populations,
            datasets: Vec::new(),
        }],
        datasets: Vec::new(),
    };

    let body = bincode::serialize(&root)
        .map_err(|e| SonataError::schema(format!("failed to serialize SONH body: {e}")))?;
    let checksum = calculate_checksum(&body);

    let path = path.as_ref();
    let mut file = File::create(path).map_err(|e| SonataError::file_open(path, e))?;
    file.write_all(&magic::SONH).map_err(|e| SonataError::file_open(path, e))?;
    file.write_all(&SONH_VERSION.to_le_bytes()).map_err(|e| SonataError::file_open(path, e))?;
    file.write_all(&(body.len() as u64).to_le_bytes()).map_err(|e| SonataError::file_open(path, e))?;
    file.write_all(&checksum.to_le_bytes()).map_err(|e| SonataError::file_open(path, e))?;
    file.write_all(&body).map_err(|e| SonataError::file_open(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_population() -> GroupNode {
        GroupNode::new("pop_e")
            .with_dataset("node_type_id", DatasetValues::Int(vec![0, 0, 1, 1]))
            .with_dataset("node_group_id", DatasetValues::Int(vec![0, 0, 0, 0]))
            .with_dataset("node_group_index", DatasetValues::Int(vec![0, 1, 2, 3]))
    }

    #[test]
    fn round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.sonh");

        write_sonh(&path, "nodes", vec![sample_population()]).unwrap();

        let file = TabularFile::open(&path).unwrap();
        let names = file.population_names().unwrap();
        assert_eq!(names, vec!["pop_e"]);

        let pop = file.population("pop_e").unwrap();
        assert_eq!(pop.dataset_size("node_type_id").unwrap(), 4);
        assert_eq!(pop.get_int("node_type_id", 2).unwrap(), 1);
        assert_eq!(pop.get_int_slice("node_type_id", 1, 3).unwrap(), &[0, 1]);
    }

    #[test]
    fn out_of_range_is_dataset_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.sonh");
        write_sonh(&path, "nodes", vec![sample_population()]).unwrap();
        let file = TabularFile::open(&path).unwrap();
        let pop = file.population("pop_e").unwrap();

        let err = pop.get_int("node_type_id", 99).unwrap_err();
        assert!(matches!(err, SonataError::DatasetAccess { .. }));
    }

    #[test]
    fn missing_dataset_is_dataset_access_error() {
        let pop = sample_population();
        let err = pop.get_int("does_not_exist", 0).unwrap_err();
        assert!(matches!(err, SonataError::DatasetAccess { .. }));
    }

    #[test]
    fn truncated_file_is_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.sonh");
        std::fs::write(&path, b"abc").unwrap();
        let err = TabularFile::open(&path).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }

    #[test]
    fn corrupted_magic_is_schema_violation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.sonh");
        write_sonh(&path, "nodes", vec![sample_population()]).unwrap();
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[0] = b'X';
        std::fs::write(&path, bytes).unwrap();
        let err = TabularFile::open(&path).unwrap_err();
        assert!(matches!(err, SonataError::SchemaViolation { .. }));
    }

    #[test]
    fn nested_group_lookup() {
        let pop = GroupNode::new("pop_e")
            .with_dataset("node_type_id", DatasetValues::Int(vec![0]))
            .with_group(
                GroupNode::new("0")
                    .with_dataset("morphology", DatasetValues::Str(vec!["cellA.swc".to_string()])),
            );
        let sub = pop.group("0").unwrap();
        assert_eq!(sub.get_str("morphology", 0).unwrap(), "cellA.swc");
        assert!(pop.group("missing").is_none());
    }
}
