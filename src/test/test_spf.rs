// IsisSim: IS-IS Link-State Routing Simulator written in Rust
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SPF engine and path enumeration tests.

use pretty_assertions::assert_eq;

use super::id;
use crate::builder::{cisco_example_topo, linear_topo};
use crate::instance::{Direction, Instance, LinkSpec};
use crate::prelude::*;

#[test]
fn linear_metrics_and_predecessors() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r1, r2) = (id(&instance, "R0"), id(&instance, "R1"), id(&instance, "R2"));
    let l01 = instance.find_link(r0, "eth0/0").unwrap();
    let l12 = instance.find_link(r1, "eth0/2").unwrap();

    let run = instance.spf(r0, Level::L1).clone();

    assert_eq!(run.metric(r0), 0);
    assert!(run.result(r0).unwrap().preds.ip.is_empty());

    assert_eq!(run.metric(r1), 10);
    let preds = &run.result(r1).unwrap().preds.ip;
    assert_eq!(preds.len(), 1);
    assert_eq!(preds[0].node, r0);
    assert_eq!(preds[0].oif, l01);
    assert_eq!(preds[0].gw, Some("10.1.1.2".parse().unwrap()));

    assert_eq!(run.metric(r2), 20);
    let preds = &run.result(r2).unwrap().preds.ip;
    assert_eq!(preds.len(), 1);
    assert_eq!(preds[0].node, r1);
    assert_eq!(preds[0].oif, l12);
    assert_eq!(preds[0].gw, Some("20.1.1.2".parse().unwrap()));

    // Hop-by-hop forwarding: both destinations leave through eth0/0.
    assert_eq!(run.result(r1).unwrap().next_hops.ip[0].oif, l01);
    assert_eq!(run.result(r2).unwrap().next_hops.ip[0].oif, l01);
    assert_eq!(run.result(r2).unwrap().next_hops.ip[0].node, r1);
}

#[test]
fn linear_path_enumeration() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r1, r2) = (id(&instance, "R0"), id(&instance, "R1"), id(&instance, "R2"));
    let l01 = instance.find_link(r0, "eth0/0").unwrap();
    let l12 = instance.find_link(r1, "eth0/2").unwrap();

    let paths = instance.paths(r0, r2, Level::L1, NhKind::Ipnh);
    assert_eq!(paths.len(), 1);
    let path = &paths[0];
    assert_eq!(path.len(), 3);
    assert_eq!((path[0].node, path[0].oif), (r0, Some(l01)));
    assert_eq!((path[1].node, path[1].oif), (r1, Some(l12)));
    assert_eq!((path[2].node, path[2].oif), (r2, None));
}

#[test]
fn disabled_interface_cuts_the_chain() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r1, r2) = (id(&instance, "R0"), id(&instance, "R1"), id(&instance, "R2"));

    instance.set_interface_enabled(r0, "eth0/0", false).unwrap();
    let run = instance.spf(r0, Level::L1).clone();
    assert_eq!(run.metric(r1), INFINITE_METRIC);
    assert_eq!(run.metric(r2), INFINITE_METRIC);
    assert!(run.result(r1).is_none());
    assert!(instance.paths(r0, r2, Level::L1, NhKind::Ipnh).is_empty());
}

#[test]
fn enable_disable_round_trip_restores_spf() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r1, r2) = (id(&instance, "R0"), id(&instance, "R1"), id(&instance, "R2"));

    let before = instance.spf(r0, Level::L1).clone();
    instance.set_interface_enabled(r0, "eth0/0", false).unwrap();
    instance.spf(r0, Level::L1);
    instance.set_interface_enabled(r0, "eth0/0", true).unwrap();
    let after = instance.spf(r0, Level::L1).clone();

    for node in [r0, r1, r2] {
        assert_eq!(before.result(node), after.result(node));
    }
}

#[test]
fn two_way_check_is_bilateral() {
    let _ = env_logger::try_init();
    // Downing only R1's side of the adjacency must still remove it for R0.
    let mut instance = linear_topo();
    let (r0, r1) = (id(&instance, "R0"), id(&instance, "R1"));

    instance.set_interface_enabled(r1, "eth0/1", false).unwrap();
    let run = instance.spf(r0, Level::L1).clone();
    assert_eq!(run.metric(r1), INFINITE_METRIC);
}

/// R0 -- R1 -- R3 and R0 -- R2 -- R3, all metrics 10.
fn square_topo() -> Instance {
    let mut instance = Instance::new();
    let r0 = instance.add_node("R0", "area1");
    let r1 = instance.add_node("R1", "area1");
    let r2 = instance.add_node("R2", "area1");
    let r3 = instance.add_node("R3", "area1");
    let links = [
        (r0, r1, "eth0/0", "eth0/1", "10.1.1.1/30", "10.1.1.2/30"),
        (r0, r2, "eth0/2", "eth0/3", "20.1.1.1/30", "20.1.1.2/30"),
        (r1, r3, "eth0/4", "eth0/5", "30.1.1.1/30", "30.1.1.2/30"),
        (r2, r3, "eth0/6", "eth0/7", "40.1.1.1/30", "40.1.1.2/30"),
    ];
    for (a, b, ia, ib, pa, pb) in links {
        instance
            .insert_link(
                a,
                b,
                LinkSpec::new(ia, ib, 10, LevelMask::L1)
                    .from_addr(pa)
                    .to_addr(pb),
                Direction::Bidirectional,
            )
            .unwrap();
    }
    instance.set_root(r0);
    instance
}

#[test]
fn equal_cost_paths_are_preserved() {
    let _ = env_logger::try_init();
    let mut instance = square_topo();
    let (r0, r1, r2, r3) = (
        id(&instance, "R0"),
        id(&instance, "R1"),
        id(&instance, "R2"),
        id(&instance, "R3"),
    );

    let run = instance.spf(r0, Level::L1).clone();
    assert_eq!(run.metric(r3), 20);

    // The predecessor set is unordered; check membership, not order.
    let preds = &run.result(r3).unwrap().preds.ip;
    assert_eq!(preds.len(), 2);
    assert!(preds.iter().any(|p| p.node == r1));
    assert!(preds.iter().any(|p| p.node == r2));

    let nhs = &run.result(r3).unwrap().next_hops.ip;
    assert_eq!(nhs.len(), 2);

    let paths = instance.paths(r0, r3, Level::L1, NhKind::Ipnh);
    assert_eq!(paths.len(), 2);
    for path in &paths {
        assert_eq!(path.len(), 3);
        assert_eq!(path[0].node, r0);
        assert_eq!(path[2].node, r3);
    }
}

#[test]
fn overloaded_node_does_not_transit() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r1, r2) = (id(&instance, "R0"), id(&instance, "R1"), id(&instance, "R2"));

    instance.set_overload(r1, Level::L1, true);
    let run = instance.spf(r0, Level::L1).clone();

    // The overloaded node itself stays reachable; what lies behind does not.
    assert_eq!(run.metric(r1), 10);
    assert_eq!(run.metric(r2), INFINITE_METRIC);

    instance.set_overload(r1, Level::L1, false);
    assert_eq!(instance.spf(r0, Level::L1).metric(r2), 20);
}

#[test]
fn single_node_topology() {
    let _ = env_logger::try_init();
    let mut instance = Instance::new();
    let r0 = instance.add_node("R0", "area1");

    let run = instance.spf(r0, Level::L1).clone();
    assert_eq!(run.results().count(), 1);
    assert_eq!(run.metric(r0), 0);
    assert!(run.result(r0).unwrap().preds.ip.is_empty());
    assert!(instance.paths(r0, r0, Level::L1, NhKind::Ipnh).is_empty());
}

#[test]
fn pseudonode_is_transparent() {
    let _ = env_logger::try_init();
    let mut instance = cisco_example_topo();
    let (r1, r2, r3, r4, r5, r6) = (
        id(&instance, "R1"),
        id(&instance, "R2"),
        id(&instance, "R3"),
        id(&instance, "R4"),
        id(&instance, "R5"),
        id(&instance, "R6"),
    );
    let l_r1_r5 = instance.find_link(r1, "eth0/9").unwrap();

    let run = instance.spf(r1, Level::L1).clone();

    // The LAN members are one (zero-cost) hop behind the PN.
    assert_eq!(run.metric(r4), 10);
    assert_eq!(run.metric(r6), 10);
    assert_eq!(run.metric(r2), 10);
    assert_eq!(run.metric(r3), 20);

    // The PN has no result slot, but its distance is still known.
    assert!(run.result(r5).is_none());
    assert_eq!(run.metric(r5), 10);

    // R4's predecessor is the real upstream router, never the PN, and the
    // gateway is the prefix on the PN-to-R4 link.
    let preds = &run.result(r4).unwrap().preds.ip;
    assert_eq!(preds.len(), 1);
    assert_eq!(preds[0].node, r1);
    assert_eq!(preds[0].oif, l_r1_r5);
    assert_eq!(preds[0].gw, Some("50.1.1.3".parse().unwrap()));

    // No predecessor anywhere points at the pseudonode.
    for result in run.results() {
        for pred in &result.preds.ip {
            assert_ne!(pred.node, r5);
        }
    }

    // R3 is reached both through the LAN (via R4) and through R2.
    let preds = &run.result(r3).unwrap().preds.ip;
    assert_eq!(preds.len(), 2);
    assert!(preds.iter().any(|p| p.node == r2));
    assert!(preds.iter().any(|p| p.node == r4));
    assert_eq!(instance.paths(r1, r3, Level::L1, NhKind::Ipnh).len(), 2);
}

#[test]
fn lsp_adjacency_contributes_to_the_lsp_kind() {
    let _ = env_logger::try_init();
    // An equal-cost unidirectional forwarding adjacency R0 -> R2 next to the
    // hop-by-hop chain: the IP and LSP predecessor lists stay separate.
    let mut instance = linear_topo();
    let (r0, r1, r2) = (id(&instance, "R0"), id(&instance, "R1"), id(&instance, "R2"));
    let lsp = instance
        .insert_link(
            r0,
            r2,
            LinkSpec::new("lsp0", "lsp1", 20, LevelMask::L1).lsp(),
            Direction::Unidirectional,
        )
        .unwrap();

    let run = instance.spf(r0, Level::L1).clone();
    assert_eq!(run.metric(r2), 20);

    let result = run.result(r2).unwrap();
    assert_eq!(result.preds.lsp.len(), 1);
    assert_eq!(result.preds.lsp[0].node, r0);
    assert_eq!(result.preds.lsp[0].oif, lsp);
    assert_eq!(result.preds.ip.len(), 1);
    assert_eq!(result.preds.ip[0].node, r1);

    assert_eq!(result.next_hops.lsp.len(), 1);
    assert_eq!(result.next_hops.lsp[0].oif, lsp);
    assert_eq!(result.next_hops.ip.len(), 1);
    assert_eq!(result.next_hops.ip[0].node, r1);

    let lsp_paths = instance.paths(r0, r2, Level::L1, NhKind::Lspnh);
    assert_eq!(lsp_paths.len(), 1);
    assert_eq!(lsp_paths[0].len(), 2);
}

#[test]
fn metric_monotonicity_invariant() {
    let _ = env_logger::try_init();
    // For every predecessor (P, oif, gw) of N: metric(P) + w(edge) ==
    // metric(N), with the PN-composite weight on LAN hops.
    let mut instance = cisco_example_topo();
    let r1 = id(&instance, "R1");
    let run = instance.spf(r1, Level::L1).clone();

    for result in run.results() {
        if result.node == r1 {
            continue;
        }
        assert!(
            !result.preds.ip.is_empty(),
            "reachable nodes have predecessors"
        );
        for pred in &result.preds.ip {
            let nbr = instance
                .logical_neighbors(pred.node, Level::L1)
                .find(|n| n.node == result.node && n.oif == pred.oif)
                .expect("predecessor edge exists");
            assert_eq!(
                run.metric(pred.node) as u64 + nbr.metric as u64,
                result.metric as u64
            );
        }
    }
}

#[test]
fn spf_cache_follows_topology_version() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r2) = (id(&instance, "R0"), id(&instance, "R2"));

    assert_eq!(instance.spf(r0, Level::L1).metric(r2), 20);
    instance.set_metric(r0, "eth0/0", Level::L1, 100).unwrap();
    assert_eq!(instance.spf(r0, Level::L1).metric(r2), 110);

    // Setting the same metric again does not invalidate anything.
    let version = instance.version();
    instance.set_metric(r0, "eth0/0", Level::L1, 100).unwrap();
    assert_eq!(instance.version(), version);
}

#[test]
fn instance_serde_round_trip() {
    let _ = env_logger::try_init();
    let mut instance = linear_topo();
    let (r0, r2) = (id(&instance, "R0"), id(&instance, "R2"));
    let before = instance.spf(r0, Level::L1).clone();

    let json = serde_json::to_string(&instance).unwrap();
    let mut restored: Instance = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.node_id("R2"), Some(r2));
    let after = restored.spf(r0, Level::L1).clone();
    for node in instance.nodes().collect::<Vec<_>>() {
        assert_eq!(before.result(node), after.result(node));
    }
}
