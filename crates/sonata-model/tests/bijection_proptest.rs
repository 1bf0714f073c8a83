//! Property test for the gid round-trip/bijection invariant (spec §8
//! "Round-trip / bijection"): `localize(globalize(pop, k)) == (pop, k)`
//! for every population and every local id in range.

use std::sync::Arc;

use proptest::prelude::*;
use sonata_model::{NetworkRecord, PopulationRole};
use sonata_storage::{write_sonh, DatasetValues, GroupNode, TabularFile};

fn build_net(dir: &std::path::Path, sizes: &[usize]) -> NetworkRecord {
    let groups: Vec<GroupNode> = sizes
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            GroupNode::new(format!("pop_{i}"))
                .with_dataset("node_type_id", DatasetValues::Int(vec![0; n]))
                .with_dataset("node_group_id", DatasetValues::Int(vec![0; n]))
                .with_dataset("node_group_index", DatasetValues::Int((0..n as i64).collect()))
        })
        .collect();
    let path = dir.join("nodes.sonh");
    write_sonh(&path, "nodes", groups).unwrap();
    let file = Arc::new(TabularFile::open(&path).unwrap());
    NetworkRecord::build(vec![file], PopulationRole::Node).unwrap()
}

proptest! {
    #[test]
    fn localize_globalize_round_trips(sizes in prop::collection::vec(1usize..8, 1..6)) {
        let dir = tempfile::tempdir().unwrap();
        let net = build_net(dir.path(), &sizes);

        for (i, &n) in sizes.iter().enumerate() {
            let pop_name = format!("pop_{i}");
            for k in 0..n {
                let gid = net.globalize(&pop_name, k).unwrap();
                let (resolved_pop, resolved_k) = net.localize(gid).unwrap();
                prop_assert_eq!(resolved_pop, pop_name.as_str());
                prop_assert_eq!(resolved_k, k);
            }
        }
    }
}
