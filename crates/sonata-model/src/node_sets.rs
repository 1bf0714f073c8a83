//! Named node set resolution (§6 `node_sets_file`).
//!
//! Resolves a named node set used by current-clamp and probe input
//! entries to a concrete `(population, [node_id...])` list.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SonataError};

/// One named set: a population plus the local node ids it selects.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSet {
    /// Population the ids are local to.
    pub population: String,
    /// Local node ids in the set.
    pub node_ids: Vec<usize>,
}

/// All named node sets declared in a `node_sets_file`.
#[derive(Debug, Clone, Default)]
pub struct NodeSets {
    sets: HashMap<String, NodeSet>,
}

impl NodeSets {
    /// Load and parse a `node_sets_file`: a JSON object of `name ->
    /// {population, node_ids}`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SonataError::file_open(path, e))?;
        let sets: HashMap<String, NodeSet> = serde_json::from_str(&text)
            .map_err(|e| SonataError::schema(format!("{}: invalid node_sets_file: {e}", path.display())))?;
        Ok(Self { sets })
    }

    /// Resolve a named set.
    pub fn resolve(&self, name: &str) -> Result<&NodeSet> {
        self.sets
            .get(name)
            .ok_or_else(|| SonataError::schema(format!("unknown node set '{name}'")))
    }
}
