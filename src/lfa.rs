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

//! Protection computation: Loop-Free Alternates (RFC 5286) and Remote LFAs.
//!
//! Given a protected link `S -> E` at a level, candidates are the physical
//! neighbors `N` of `S`, judged per protected destination `D` by the RFC 5286
//! inequalities:
//!
//! 1. loop-free:        `d(N,D) < d(N,S) + d(S,D)`
//! 2. downstream:       `d(N,D) < d(S,D)` (an administrative knob; it trades
//!    LFA coverage for micro-loop safety on multiple failures)
//! 3. node-protecting:  `d(N,D) < d(N,E) + d(E,D)`
//! 4. broadcast (PN = the pseudonode behind the link):
//!    `d(N,D) < d(N,PN) + d(PN,D)`
//!
//! Remote LFAs intersect the extended P-space of `S` with the Q-space of `E`
//! and keep the PQ nodes that are downstream of `S` for the protected
//! destination. An empty result means the protection is simply absent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::instance::{Instance, LinkEndFlags};
use crate::types::{InstanceError, Level, LinkId, NodeId};

/// Classification of an `(N, D)` protection pair.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum LfaType {
    /// Inequality 1 only.
    LinkProtectionLfa,
    /// Inequalities 1 and 2.
    LinkProtectionLfaDownstream,
    /// Inequalities 1, 2 (optional) and 3.
    LinkAndNodeProtectionLfa,
    /// Inequalities 1 and 4.
    BroadcastLinkProtectionLfa,
    /// Inequalities 1, 2 and 4.
    BroadcastLinkProtectionLfaDownstream,
    /// Inequalities 1, 2 (optional), 3 and 4.
    BroadcastLinkAndNodeProtectionLfa,
    /// Node-protecting only: inequality 4 failed, but the candidate reaches
    /// `D` without the failing node, through the broadcast segment.
    BroadcastOnlyNodeProtectionLfa,
    /// A remote LFA reached through an MPLS tunnel, link-protecting.
    LinkProtectionRlfa,
    /// A downstream remote LFA.
    LinkProtectionRlfaDownstream,
    /// A node-protecting remote LFA.
    LinkAndNodeProtectionRlfa,
}

/// One protection pair: the alternate `lfa` protects traffic of `dest`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LfaPair {
    /// The alternate next-hop node.
    pub lfa: NodeId,
    /// Outgoing link on the protecting node towards the alternate.
    pub oif: LinkId,
    /// The protected destination.
    pub dest: NodeId,
    /// What the pair protects against.
    pub kind: LfaType,
}

/// The LFA set of one protected link.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Lfa {
    /// The protected link.
    pub protected_link: LinkId,
    /// The level the computation ran at.
    pub level: Level,
    /// All computed pairs. Empty means no protection exists.
    pub pairs: Vec<LfaPair>,
}

/// A set of nodes, as produced by the P-space/Q-space computations.
pub type NodeSet = BTreeSet<NodeId>;

impl Instance {
    fn eligible_backup(&self, link: LinkId) -> bool {
        !self
            .link(link)
            .from
            .flags
            .contains(LinkEndFlags::NO_ELIGIBLE_BACKUP)
    }

    /// Run SPF from every physical neighbor of `node`, so that neighbor
    /// distances are available from the cache.
    fn warm_neighbor_spfs(&mut self, node: NodeId, level: Level) {
        let nbrs: Vec<NodeId> = self
            .physical_neighbors(node, level)
            .map(|n| n.node)
            .collect();
        for nbr in nbrs {
            self.spf(nbr, level);
        }
    }

    /// Compute the LFA set protecting the link behind interface `iface` of
    /// `s`. `strict_downstream` additionally applies inequality 2, trading
    /// coverage for micro-loop safety.
    pub fn compute_lfa(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
        strict_downstream: bool,
    ) -> Result<Lfa, InstanceError> {
        let protected = self.find_link(s, iface)?;
        self.spf(s, level);
        self.warm_neighbor_spfs(s, level);
        let pairs = if self.is_broadcast_link(protected, level) {
            self.broadcast_lfa_pairs(s, protected, level, strict_downstream)
        } else {
            self.p2p_lfa_pairs(s, protected, level, strict_downstream)
        };
        Ok(Lfa {
            protected_link: protected,
            level,
            pairs,
        })
    }

    fn p2p_lfa_pairs(
        &mut self,
        s: NodeId,
        protected: LinkId,
        level: Level,
        strict_downstream: bool,
    ) -> Vec<LfaPair> {
        let e = self.link_target(protected);

        // Destinations S reaches through E over the protected link.
        let dests: Vec<(NodeId, u32)> = self
            .spf_result(s, level)
            .results()
            .filter(|r| r.node != s)
            .filter(|r| r.next_hops.ip.iter().any(|nh| nh.node == e))
            .map(|r| (r.node, r.metric))
            .collect();

        let candidates: Vec<(NodeId, LinkId)> = self
            .physical_neighbors(s, level)
            .filter(|n| !(n.node == e && n.out_link == protected))
            .map(|n| (n.node, n.out_link))
            .collect();

        let mut pairs = Vec::new();
        for (n, oif) in candidates {
            if !self.eligible_backup(oif) {
                continue;
            }
            let dist_n_s = self.dist(n, s, level);
            for &(d, dist_s_d) in &dests {
                let dist_n_d = self.dist(n, d, level);

                log::trace!(
                    "LFA: testing inequality 1: d({n:?},{d:?})={dist_n_d} < \
                     d({n:?},S)={dist_n_s} + d(S,{d:?})={dist_s_d}"
                );
                if !lt(dist_n_d, dist_n_s as u64 + dist_s_d as u64) {
                    continue;
                }

                let mut kind = LfaType::LinkProtectionLfa;
                if strict_downstream {
                    if !lt(dist_n_d, dist_s_d as u64) {
                        continue;
                    }
                    kind = LfaType::LinkProtectionLfaDownstream;
                }

                let dist_n_e = self.dist(n, e, level);
                let dist_e_d = self.dist(e, d, level);
                if lt(dist_n_d, dist_n_e as u64 + dist_e_d as u64) {
                    kind = LfaType::LinkAndNodeProtectionLfa;
                }
                pairs.push(LfaPair {
                    lfa: n,
                    oif,
                    dest: d,
                    kind,
                });
            }
        }
        pairs
    }

    fn broadcast_lfa_pairs(
        &mut self,
        s: NodeId,
        protected: LinkId,
        level: Level,
        strict_downstream: bool,
    ) -> Vec<LfaPair> {
        let pn = self.link_target(protected);
        self.spf(pn, level);

        // Destinations whose primary next-hop crosses the protected
        // broadcast link, together with the first-hop router E beyond the PN.
        let dests: Vec<(NodeId, u32, NodeId)> = self
            .spf_result(s, level)
            .results()
            .filter(|r| r.node != s)
            .filter_map(|r| {
                r.next_hops
                    .ip
                    .iter()
                    .find(|nh| nh.oif == protected)
                    .map(|nh| (r.node, r.metric, nh.node))
            })
            .collect();

        let candidates: Vec<(NodeId, LinkId)> = self
            .physical_neighbors(s, level)
            .filter(|n| n.out_link != protected)
            .map(|n| (n.node, n.out_link))
            .collect();

        let mut pairs = Vec::new();
        for (n, oif) in candidates {
            if !self.eligible_backup(oif) {
                continue;
            }
            let dist_n_s = self.dist(n, s, level);
            let dist_n_pn = self.dist(n, pn, level);
            let via_broadcast = self.is_broadcast_member(n, protected, level);

            for &(d, dist_s_d, e) in &dests {
                if self.node(d).is_pseudonode(level) {
                    continue;
                }
                let dist_n_d = self.dist(n, d, level);

                if !lt(dist_n_d, dist_n_s as u64 + dist_s_d as u64) {
                    continue;
                }

                let dist_pn_d = self.dist(pn, d, level);
                if lt(dist_n_d, dist_n_pn as u64 + dist_pn_d as u64) {
                    // Inequality 4 holds: N avoids the broadcast segment.
                    let mut kind = LfaType::BroadcastLinkProtectionLfa;
                    if strict_downstream {
                        if !lt(dist_n_d, dist_s_d as u64) {
                            continue;
                        }
                        kind = LfaType::BroadcastLinkProtectionLfaDownstream;
                        let dist_n_e = self.dist(n, e, level);
                        let dist_e_d = self.dist(e, d, level);
                        if lt(dist_n_d, dist_n_e as u64 + dist_e_d as u64) {
                            kind = LfaType::BroadcastLinkAndNodeProtectionLfa;
                        }
                    }
                    pairs.push(LfaPair {
                        lfa: n,
                        oif,
                        dest: d,
                        kind,
                    });
                } else if strict_downstream {
                    // Inequality 4 failed: the alternate may still protect
                    // against the failure of E itself.
                    if !lt(dist_n_d, dist_s_d as u64) {
                        continue;
                    }
                    let dist_n_e = self.dist(n, e, level);
                    let dist_e_d = self.dist(e, d, level);
                    if lt(dist_n_d, dist_n_e as u64 + dist_e_d as u64) {
                        let kind = if via_broadcast {
                            LfaType::BroadcastOnlyNodeProtectionLfa
                        } else {
                            LfaType::BroadcastLinkAndNodeProtectionLfa
                        };
                        pairs.push(LfaPair {
                            lfa: n,
                            oif,
                            dest: d,
                            kind,
                        });
                    }
                }
            }
        }
        pairs
    }

    /// Compute the LFA sets of every interface of `node` with a configured
    /// protection type. `LinkNode` protection keeps only the node-protecting
    /// pairs; plain `Link` protection keeps everything.
    pub fn compute_protection(&mut self, node: NodeId, level: Level) -> Vec<Lfa> {
        let configured: Vec<(String, crate::instance::ProtectionType)> = self
            .physical_neighbors(node, level)
            .map(|n| self.link(n.out_link))
            .filter(|link| link.protection != crate::instance::ProtectionType::None)
            .map(|link| (link.from.name.clone(), link.protection))
            .collect();

        let mut protections = Vec::new();
        for (iface, protection) in configured {
            let mut lfa = self
                .compute_lfa(node, &iface, level, false)
                .expect("the interface was just enumerated");
            if protection == crate::instance::ProtectionType::LinkNode {
                lfa.pairs.retain(|pair| {
                    matches!(
                        pair.kind,
                        LfaType::LinkAndNodeProtectionLfa
                            | LfaType::BroadcastLinkAndNodeProtectionLfa
                            | LfaType::BroadcastOnlyNodeProtectionLfa
                    )
                });
            }
            protections.push(lfa);
        }
        protections
    }

    /// The P-space of `s` with respect to the protected link: all nodes `Y`
    /// with `d(S,Y) < d(S,E) + d(E,Y)`.
    pub fn p_space(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
    ) -> Result<NodeSet, InstanceError> {
        let protected = self.find_link(s, iface)?;
        let e = self.link_target(protected);
        self.spf(s, level);
        self.spf(e, level);

        let dist_s_e = self.dist(s, e, level);
        let nodes: Vec<(NodeId, u32)> = self
            .spf_result(s, level)
            .results()
            .filter(|r| r.node != s)
            .map(|r| (r.node, r.metric))
            .collect();

        let mut space = NodeSet::new();
        for (y, dist_s_y) in nodes {
            let dist_e_y = self.dist(e, y, level);
            if lt(dist_s_y, dist_s_e as u64 + dist_e_y as u64) {
                space.insert(y);
            }
        }
        Ok(space)
    }

    /// The extended P-space of `s`: the union over every eligible physical
    /// neighbor `N` (except across the protected link) of the nodes `Y` with
    /// `d(N,Y) < d(N,S) + d(S,Y)`.
    pub fn extended_p_space(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
    ) -> Result<NodeSet, InstanceError> {
        let protected = self.find_link(s, iface)?;
        self.spf(s, level);
        self.warm_neighbor_spfs(s, level);

        let nodes: Vec<(NodeId, u32)> = self
            .spf_result(s, level)
            .results()
            .filter(|r| r.node != s)
            .map(|r| (r.node, r.metric))
            .collect();
        let candidates: Vec<(NodeId, LinkId)> = self
            .physical_neighbors(s, level)
            .filter(|n| n.out_link != protected)
            .map(|n| (n.node, n.out_link))
            .collect();

        let mut space = NodeSet::new();
        for (y, dist_s_y) in nodes {
            for &(n, oif) in &candidates {
                if !self.eligible_backup(oif) {
                    continue;
                }
                let dist_n_s = self.dist(n, s, level);
                let dist_n_y = self.dist(n, y, level);
                if lt(dist_n_y, dist_n_s as u64 + dist_s_y as u64) {
                    space.insert(y);
                    break;
                }
            }
        }
        Ok(space)
    }

    /// The Q-space of the far end `E` of the protected link: under reversed
    /// metrics, all `Y` with `d(E,Y) < d(S,Y) + d(E,S)`. Computed by
    /// inverting the topology, running SPF from `S` and `E`, and reverting.
    pub fn q_space(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
    ) -> Result<NodeSet, InstanceError> {
        let protected = self.find_link(s, iface)?;
        let e = self.link_target(protected);

        self.invert_metrics(level);
        self.spf(s, level);
        self.spf(e, level);

        let dist_e_s = self.dist(e, s, level);
        let nodes: Vec<(NodeId, u32)> = self
            .spf_result(s, level)
            .results()
            .filter(|r| r.node != e)
            .map(|r| (r.node, r.metric))
            .collect();

        let mut space = NodeSet::new();
        for (y, dist_s_y) in nodes {
            let dist_e_y = self.dist(e, y, level);
            log::trace!(
                "Q-space: testing d(E,{y:?})={dist_e_y} < d(S,{y:?})={dist_s_y} \
                 + d(E,S)={dist_e_s}"
            );
            if lt(dist_e_y, dist_s_y as u64 + dist_e_s as u64) {
                space.insert(y);
            }
        }
        self.invert_metrics(level);
        Ok(space)
    }

    /// The PQ-space: intersection of the extended P-space of `s` and the
    /// Q-space of the far end of the protected link.
    pub fn pq_space(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
    ) -> Result<NodeSet, InstanceError> {
        let p = self.extended_p_space(s, iface, level)?;
        let q = self.q_space(s, iface, level)?;
        Ok(p.intersection(&q).copied().collect())
    }

    /// Compute the RLFA candidates of `s` for the protected link and the
    /// destination `dest`: the PQ nodes that are downstream of `s` with
    /// respect to `dest` (`d(PQ,D) < d(S,D)`), so that traffic released at
    /// the repair node cannot loop back even if the far end failed
    /// completely.
    pub fn compute_rlfa(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
        dest: NodeId,
    ) -> Result<Vec<NodeId>, InstanceError> {
        let pq = self.pq_space(s, iface, level)?;
        let dist_s_d = self.dist(s, dest, level);
        let mut rlfas = Vec::new();
        for pq_node in pq {
            let dist_pq_d = self.dist(pq_node, dest, level);
            if lt(dist_pq_d, dist_s_d as u64) {
                log::debug!("RLFA: PQ node {pq_node:?} protects {dest:?}");
                rlfas.push(pq_node);
            }
        }
        Ok(rlfas)
    }

    /// The destinations whose primary next-hop from `s` crosses the link
    /// behind `iface`.
    pub fn impacted_destinations(
        &mut self,
        s: NodeId,
        iface: &str,
        level: Level,
    ) -> Result<Vec<NodeId>, InstanceError> {
        let protected = self.find_link(s, iface)?;
        self.spf(s, level);
        Ok(self
            .spf_result(s, level)
            .results()
            .filter(|r| r.node != s)
            .filter(|r| r.next_hops.ip.iter().any(|nh| nh.oif == protected))
            .map(|r| r.node)
            .collect())
    }

    /// Swap the per-direction metrics of every bidirectional link at
    /// `level`. Applying it twice restores the original topology.
    fn invert_metrics(&mut self, level: Level) {
        let pairs: Vec<(LinkId, LinkId)> = self
            .graph
            .edge_indices()
            .filter_map(|id| {
                let rev = self.graph[id].reverse?;
                (id < rev).then_some((id, rev))
            })
            .collect();
        for (a, b) in pairs {
            let ma = self.graph[a].metric(level);
            let mb = self.graph[b].metric(level);
            *self.graph[a].metric.get_mut(level) = mb;
            *self.graph[b].metric.get_mut(level) = ma;
        }
        self.bump_version();
    }
}

/// Strict comparison with the left side widened; metric sums stay in `u64`
/// to survive additions of [`crate::types::INFINITE_METRIC`].
fn lt(lhs: u32, rhs: u64) -> bool {
    (lhs as u64) < rhs
}
