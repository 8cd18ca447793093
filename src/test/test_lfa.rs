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

//! LFA, RLFA and P/Q-space tests.

use maplit::btreeset;
use pretty_assertions::assert_eq;

use super::id;
use crate::builder::{cisco_example_topo, multi_area_topo, ring_topo};
use crate::prelude::*;

#[test]
fn uniform_ring_protects_only_the_midpoint() {
    let _ = env_logger::try_init();
    // With uniform metrics, the alternate A is never loop-free for the far
    // end E (d(A,E) < d(A,S) + d(S,E) fails with 20 < 20) nor for D
    // (30 < 30). The midpoint C, impacted through its equal-cost path via
    // E, is the only destination A can protect.
    let mut instance = ring_topo();
    let (s, a, c, d, e) = (
        id(&instance, "S"),
        id(&instance, "A"),
        id(&instance, "C"),
        id(&instance, "D"),
        id(&instance, "E"),
    );

    let lfa = instance.compute_lfa(s, "eth0/0", Level::L1, false).unwrap();
    assert!(!lfa.pairs.iter().any(|p| p.dest == e));
    assert!(!lfa.pairs.iter().any(|p| p.dest == d));
    assert_eq!(lfa.pairs.len(), 1);
    assert_eq!(lfa.pairs[0].lfa, a);
    assert_eq!(lfa.pairs[0].dest, c);
    assert_eq!(lfa.pairs[0].kind, LfaType::LinkAndNodeProtectionLfa);
}

/// The ring with the B-C segment cheapened to 5, which makes A a loop-free
/// alternate of S for the destination D.
fn shortcut_ring() -> crate::instance::Instance {
    let mut instance = ring_topo();
    let b = id(&instance, "B");
    let c = id(&instance, "C");
    instance.set_metric(c, "eth0/6", Level::L1, 5).unwrap();
    instance.set_metric(b, "eth0/7", Level::L1, 5).unwrap();
    instance
}

#[test]
fn ring_lfa_with_shortcut() {
    let _ = env_logger::try_init();
    let mut instance = shortcut_ring();
    let (s, a, d, e) = (
        id(&instance, "S"),
        id(&instance, "A"),
        id(&instance, "D"),
        id(&instance, "E"),
    );

    // d(A,D) = 25 < d(A,S) + d(S,D) = 10 + 20: loop-free for D.
    // d(A,D) = 25 < d(A,E) + d(E,D) = 20 + 10: node-protecting as well.
    // d(A,E) = 20 < d(A,S) + d(S,E) = 20 fails: no protection for E itself.
    let lfa = instance.compute_lfa(s, "eth0/0", Level::L1, false).unwrap();
    assert_eq!(lfa.pairs.len(), 1);
    let pair = lfa.pairs[0];
    assert_eq!(pair.lfa, a);
    assert_eq!(pair.dest, d);
    assert_eq!(pair.kind, LfaType::LinkAndNodeProtectionLfa);
    assert!(!lfa.pairs.iter().any(|p| p.dest == e));

    // The downstream condition d(A,D) = 25 < d(S,D) = 20 fails, so the
    // strict variant yields nothing.
    let lfa = instance.compute_lfa(s, "eth0/0", Level::L1, true).unwrap();
    assert_eq!(lfa.pairs, vec![]);
}

#[test]
fn no_eligible_backup_excludes_the_candidate() {
    let _ = env_logger::try_init();
    let mut instance = shortcut_ring();
    let s = id(&instance, "S");

    instance.set_no_eligible_backup(s, "eth0/11", true).unwrap();
    let lfa = instance.compute_lfa(s, "eth0/0", Level::L1, false).unwrap();
    assert_eq!(lfa.pairs, vec![]);

    instance.set_no_eligible_backup(s, "eth0/11", false).unwrap();
    let lfa = instance.compute_lfa(s, "eth0/0", Level::L1, false).unwrap();
    assert_eq!(lfa.pairs.len(), 1);
}

#[test]
fn ring_p_and_q_spaces() {
    let _ = env_logger::try_init();
    let mut instance = ring_topo();
    let (s, a, b, c, d) = (
        id(&instance, "S"),
        id(&instance, "A"),
        id(&instance, "B"),
        id(&instance, "C"),
        id(&instance, "D"),
    );

    let p = instance.p_space(s, "eth0/0", Level::L1).unwrap();
    assert_eq!(p, btreeset! {a, b});

    let ext_p = instance.extended_p_space(s, "eth0/0", Level::L1).unwrap();
    assert_eq!(ext_p, btreeset! {a, b, c});

    let q = instance.q_space(s, "eth0/0", Level::L1).unwrap();
    assert_eq!(q, btreeset! {c, d});

    let pq = instance.pq_space(s, "eth0/0", Level::L1).unwrap();
    assert_eq!(pq, btreeset! {c});
}

#[test]
fn ring_rlfa_repairs_through_the_midpoint() {
    let _ = env_logger::try_init();
    let mut instance = ring_topo();
    let (s, c, d) = (id(&instance, "S"), id(&instance, "C"), id(&instance, "D"));

    // C is the only PQ node and is downstream for D: d(C,D) = 10 < d(S,D).
    let rlfas = instance.compute_rlfa(s, "eth0/0", Level::L1, d).unwrap();
    assert_eq!(rlfas, vec![c]);

    // For the destination C itself, the repair node is not downstream of
    // anything better: d(C,C) = 0 < d(S,C) = 30 still holds.
    let rlfas = instance.compute_rlfa(s, "eth0/0", Level::L1, c).unwrap();
    assert_eq!(rlfas, vec![c]);
}

#[test]
fn q_space_restores_the_metrics() {
    let _ = env_logger::try_init();
    let mut instance = ring_topo();
    let (s, e) = (id(&instance, "S"), id(&instance, "E"));
    let link = instance.find_link(s, "eth0/0").unwrap();

    let before = instance.spf(s, Level::L1).clone();
    instance.q_space(s, "eth0/0", Level::L1).unwrap();

    assert_eq!(instance.link(link).metric(Level::L1), 10);
    let after = instance.spf(s, Level::L1).clone();
    assert_eq!(before.metric(e), after.metric(e));
    assert_eq!(before.result(e), after.result(e));
}

#[test]
fn broadcast_lfa_on_the_lan() {
    let _ = env_logger::try_init();
    let mut instance = cisco_example_topo();
    let (r1, r2, r3) = (id(&instance, "R1"), id(&instance, "R2"), id(&instance, "R3"));
    let l_r1_r2 = instance.find_link(r1, "eth0/0").unwrap();

    // Protecting the broadcast link R1 -> R5(PN): of the impacted
    // destinations R3, R4 and R6, only R3 has a loop-free alternate via R2,
    // and R2 avoids both the LAN and the next-hop router.
    let lfa = instance.compute_lfa(r1, "eth0/9", Level::L1, true).unwrap();
    assert_eq!(lfa.pairs.len(), 1);
    let pair = lfa.pairs[0];
    assert_eq!(pair.lfa, r2);
    assert_eq!(pair.oif, l_r1_r2);
    assert_eq!(pair.dest, r3);
    assert_eq!(pair.kind, LfaType::BroadcastLinkAndNodeProtectionLfa);
}

#[test]
fn impacted_destinations_cross_the_protected_link() {
    let _ = env_logger::try_init();
    let mut instance = cisco_example_topo();
    let (r1, r3, r4, r6) = (
        id(&instance, "R1"),
        id(&instance, "R3"),
        id(&instance, "R4"),
        id(&instance, "R6"),
    );

    let impacted = instance
        .impacted_destinations(r1, "eth0/9", Level::L1)
        .unwrap();
    assert_eq!(impacted, vec![r3, r4, r6]);

    // Nothing is impacted by the R1 -> R2 point-to-point link except R2: R3
    // is equal-cost through the LAN.
    let impacted = instance
        .impacted_destinations(r1, "eth0/0", Level::L1)
        .unwrap();
    assert!(impacted.iter().all(|d| *d != r4 && *d != r6));
}

#[test]
fn configured_protection_drives_the_computation() {
    let _ = env_logger::try_init();
    let mut instance = shortcut_ring();
    let (s, a, d) = (id(&instance, "S"), id(&instance, "A"), id(&instance, "D"));

    // Nothing configured, nothing computed.
    assert!(instance.compute_protection(s, Level::L1).is_empty());

    instance
        .set_link_protection(s, "eth0/0", ProtectionType::Link)
        .unwrap();
    let protections = instance.compute_protection(s, Level::L1);
    assert_eq!(protections.len(), 1);
    assert_eq!(protections[0].pairs.len(), 1);
    assert_eq!(protections[0].pairs[0].lfa, a);
    assert_eq!(protections[0].pairs[0].dest, d);

    // The pair is node-protecting, so it survives the stricter config too.
    instance
        .set_link_protection(s, "eth0/0", ProtectionType::LinkNode)
        .unwrap();
    let protections = instance.compute_protection(s, Level::L1);
    assert_eq!(protections[0].pairs.len(), 1);

    // Formatting renders names, not indices.
    let rendered = protections[0].pairs[0].fmt(&instance);
    assert!(rendered.contains("LFA = A"));
    assert!(rendered.contains("Dest = D"));
}

#[test]
fn multi_area_rlfa_needs_a_pq_node() {
    let _ = env_logger::try_init();
    // At L2, R0's only neighbor is R3 across the protected link itself, so
    // the extended P-space (and with it the PQ set) is empty: the
    // protection is simply absent.
    let mut instance = multi_area_topo();
    let (r0, r4) = (id(&instance, "R0"), id(&instance, "R4"));

    assert_eq!(instance.dist(r0, r4, Level::L2), 20);
    let ext_p = instance.extended_p_space(r0, "eth0/2", Level::L2).unwrap();
    assert_eq!(ext_p, btreeset! {});
    let rlfas = instance.compute_rlfa(r0, "eth0/2", Level::L2, r4).unwrap();
    assert_eq!(rlfas, vec![]);
}
