//! Configuration parsing for the SONATA process front-end (spec §6).
//!
//! The network-description core never touches raw JSON — it only
//! consumes the typed records this module parses with `serde`/
//! `serde_json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{CliError, CliResult};

/// The top-level JSON configuration named by the process's single
/// positional argument (§6).
#[derive(Debug, Deserialize)]
pub struct SimConfig {
    /// Path to a circuit-config file listing `nodes`/`edges` entries.
    pub network: PathBuf,
    /// Path to a named node-set document, if any.
    pub node_sets_file: Option<PathBuf>,
    /// Bath temperature and initial membrane potential.
    pub conditions: Conditions,
    /// Run duration, step size, and the default spike threshold.
    pub run: RunParams,
    /// Current-clamp and spike-train input entries, keyed by name.
    #[serde(default)]
    pub inputs: HashMap<String, InputEntry>,
    /// Spike output destination and ordering.
    pub outputs: OutputConfig,
    /// Trace report entries, keyed by name.
    #[serde(default)]
    pub reports: HashMap<String, ReportEntry>,
}

/// `conditions.{celsius, v_init}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Conditions {
    /// Bath temperature, in degrees Celsius.
    pub celsius: f64,
    /// Initial membrane potential, in millivolts.
    pub v_init: f64,
}

/// `run.{tstop, dt, spike_threshold}`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RunParams {
    /// Simulated run duration.
    pub tstop: f64,
    /// Integration step size.
    pub dt: f64,
    /// Default spike-detector threshold, in millivolts.
    pub spike_threshold: f64,
}

/// One `inputs.*` entry, discriminated by `input_type`.
#[derive(Debug, Deserialize)]
#[serde(tag = "input_type", rename_all = "snake_case")]
pub enum InputEntry {
    /// A current-clamp stimulus: electrode parameters joined against a
    /// location table.
    CurrentClamp {
        /// Electrode parameter table (`electrode_id, dur, amp, delay`).
        electrode_file: PathBuf,
        /// Electrode location table (`electrode_id, node_id, population,
        /// sec_id, seg_x`).
        input_file: PathBuf,
    },
    /// An explicit spike-train input for virtual cells.
    Spikes {
        /// Spike table (`gid_to_range`, `timestamps`).
        input_file: PathBuf,
        /// Named node set the spike table applies to.
        node_set: String,
    },
}

/// `outputs.{spikes_file, spikes_sort_order}`.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Destination for the written spike output.
    pub spikes_file: PathBuf,
    /// Sort order the spike output is written in.
    pub spikes_sort_order: SpikeSortOrder,
}

/// `outputs.spikes_sort_order ∈ {"time","gid"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeSortOrder {
    /// Spikes ordered by timestamp.
    Time,
    /// Spikes ordered by gid.
    Gid,
}

/// One `reports.*` entry.
#[derive(Debug, Deserialize)]
pub struct ReportEntry {
    /// Destination for the written trace output.
    pub report_file: PathBuf,
    /// Recorded variable: `"v"` or `"i"`.
    pub variable_name: String,
    /// Section id to record at.
    pub section_id: u32,
    /// Position along the section to record at.
    pub section_pos: f64,
    /// Named node set this report applies to.
    pub node_set: String,
}

impl SimConfig {
    /// Parse a `SimConfig` from a JSON file on disk.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CliError::Io)?;
        serde_json::from_str(&text).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
    }
}

/// One `nodes`/`edges` entry of a circuit-config file (the `network`
/// field of [`SimConfig`] names this file).
#[derive(Debug, Deserialize)]
pub struct CircuitConfig {
    /// Node population files.
    pub nodes: Vec<NodesEntry>,
    /// Edge population files.
    pub edges: Vec<EdgesEntry>,
}

/// `(nodes_file, node_types_file)`.
#[derive(Debug, Deserialize)]
pub struct NodesEntry {
    /// Binary node population file.
    pub nodes_file: PathBuf,
    /// Node type text table.
    pub node_types_file: PathBuf,
}

/// `(edges_file, edge_types_file)`.
#[derive(Debug, Deserialize)]
pub struct EdgesEntry {
    /// Binary edge population file.
    pub edges_file: PathBuf,
    /// Edge type text table.
    pub edge_types_file: PathBuf,
}

impl CircuitConfig {
    /// Parse a `CircuitConfig` from a JSON file on disk.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path).map_err(CliError::Io)?;
        serde_json::from_str(&text).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
    }
}
