//! Row-oriented text table reader (the "Record store").
//!
//! A flat `TypePopId -> {field -> value}` map plus an insertion-ordered
//! key list for deterministic iteration, built from one or more
//! delimited files with a header row.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Result, SonataError};

/// `(type_tag, population_name)` — the primary key of a type row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypePopId {
    /// The node/edge type tag (`node_type_id` or `edge_type_id`).
    pub type_tag: u32,
    /// The population this type row applies to.
    pub population: String,
}

impl TypePopId {
    /// Build a new key.
    pub fn new(type_tag: u32, population: impl Into<String>) -> Self {
        Self {
            type_tag,
            population: population.into(),
        }
    }
}

/// Sentinel used by SONATA text tables to mean "field absent".
const NULL_SENTINEL: &str = "NULL";

/// A read-only view over one or more merged delimited text tables, keyed
/// by [`TypePopId`].
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    order: Vec<TypePopId>,
    fields: HashMap<TypePopId, HashMap<String, String>>,
}

impl RecordStore {
    /// Load and merge a set of delimited text files.
    ///
    /// Each file must have a header row; the column whose header contains
    /// the substring `type_id` supplies the type tag, and the column
    /// literally named `pop_name` supplies the population name. Rows
    /// sharing a key across files overwrite silently — last write wins —
    /// but the first occurrence of a key determines its position in the
    /// iteration order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut store = Self::default();
        for path in paths {
            store.merge_file(path.as_ref())?;
        }
        log::debug!("record store merged {} file(s), {} unique keys", paths.len(), store.len());
        Ok(store)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        log::debug!("merging type table {}", path.display());
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(detect_delimiter(path))
            .from_path(path)
            .map_err(|e| SonataError::file_open(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        let headers = reader
            .headers()
            .map_err(|e| SonataError::file_open(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?
            .clone();

        let type_col = headers
            .iter()
            .position(|h| h.contains("type_id"))
            .ok_or_else(|| SonataError::schema(format!("{}: no *type_id column in header", path.display())))?;
        let pop_col = headers
            .iter()
            .position(|h| h == "pop_name")
            .ok_or_else(|| SonataError::schema(format!("{}: no pop_name column in header", path.display())))?;

        for record in reader.records() {
            let record = record.map_err(|e| SonataError::file_open(path, std::io::Error::new(std::io::ErrorKind::Other, e)))?;

            let type_tag: u32 = record
                .get(type_col)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| SonataError::schema(format!("{}: unparseable type_id", path.display())))?;
            let population = record
                .get(pop_col)
                .ok_or_else(|| SonataError::schema(format!("{}: missing pop_name value", path.display())))?
                .to_string();
            let key = TypePopId::new(type_tag, population);

            let mut row = HashMap::with_capacity(headers.len());
            for (col, header) in headers.iter().enumerate() {
                if let Some(value) = record.get(col) {
                    row.insert(header.to_string(), value.to_string());
                }
            }

            if !self.fields.contains_key(&key) {
                self.order.push(key.clone());
            }
            self.fields.insert(key, row);
        }

        Ok(())
    }

    /// Every key present in the store, in first-seen insertion order.
    pub fn unique_ids(&self) -> &[TypePopId] {
        &self.order
    }

    /// All fields for a key.
    pub fn fields(&self, id: &TypePopId) -> Option<&HashMap<String, String>> {
        self.fields.get(id)
    }

    /// A single field's value, or `None` if the row is missing, the column
    /// is missing, or the column holds the literal `NULL` sentinel.
    pub fn field(&self, id: &TypePopId, name: &str) -> Option<&str> {
        self.fields
            .get(id)
            .and_then(|row| row.get(name))
            .map(String::as_str)
            .filter(|v| *v != NULL_SENTINEL)
    }

    /// Number of distinct keys held by the store.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store holds no rows at all.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn detect_delimiter(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    }
}
