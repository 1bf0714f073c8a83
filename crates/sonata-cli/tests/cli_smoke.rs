//! End-to-end smoke test for the `sonata` binary's process interface
//! (spec §6): single positional JSON config in, exit 0 on success.

use assert_cmd::Command;
use sonata_storage::{write_sonh, DatasetValues, GroupNode};

fn write_minimal_network(dir: &std::path::Path) {
    let pop_e = GroupNode::new("pop_e")
        .with_dataset("node_type_id", DatasetValues::Int(vec![0]))
        .with_dataset("node_group_id", DatasetValues::Int(vec![0]))
        .with_dataset("node_group_index", DatasetValues::Int(vec![0]));
    write_sonh(dir.join("nodes.sonh"), "nodes", vec![pop_e]).unwrap();

    std::fs::write(
        dir.join("node_types.csv"),
        "node_type_id,pop_name,model_type,morphology,model_template,dynamics_params\n\
         0,pop_e,virtual,NULL,NULL,NULL\n",
    )
    .unwrap();

    std::fs::write(
        dir.join("circuit.json"),
        r#"{
            "nodes": [{"nodes_file": "nodes.sonh", "node_types_file": "node_types.csv"}],
            "edges": []
        }"#,
    )
    .unwrap();

    std::fs::write(
        dir.join("config.json"),
        r#"{
            "network": "circuit.json",
            "conditions": {"celsius": 36.0, "v_init": -65.0},
            "run": {"tstop": 100.0, "dt": 0.025, "spike_threshold": -10.0},
            "inputs": {},
            "outputs": {"spikes_file": "out/spikes.sonh", "spikes_sort_order": "time"},
            "reports": {}
        }"#,
    )
    .unwrap();
}

#[test]
fn single_virtual_population_builds_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    write_minimal_network(dir.path());

    let mut cmd = Command::cargo_bin("sonata").unwrap();
    cmd.arg(dir.path().join("config.json"));
    cmd.assert().success();
}

#[test]
fn missing_config_file_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("sonata").unwrap();
    cmd.arg(dir.path().join("does_not_exist.json"));
    cmd.assert().failure();
}
