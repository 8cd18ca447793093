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

//! The SPF engine: a Dijkstra variant producing, per `(root, level)`, the
//! metric and primary next-hops of every reachable destination together with
//! a predecessor database sufficient to reconstruct every equal-cost
//! shortest path.
//!
//! Equal-cost paths are preserved, never collapsed; the predecessor set of a
//! destination must be treated as unordered. Pseudonodes are handled by the
//! transparent neighbor iterator of the topology, so no predecessor or
//! next-hop ever names one.

mod path;
pub use path::{Path, PathHop};

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::types::{Kinds, Level, LinkId, NhKind, NodeId, INFINITE_METRIC};

/// A predecessor entry: the upstream router on one equal-cost shortest path,
/// the outgoing interface on that router, and the gateway address of the hop.
///
/// Two entries are equal iff all three fields match exactly.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PredEntry {
    /// The predecessor node. Never a pseudonode.
    pub node: NodeId,
    /// The outgoing link on the predecessor towards this node.
    pub oif: LinkId,
    /// The gateway: the address of this node's interface on the link (for a
    /// LAN, the address on the PN-to-node link).
    pub gw: Option<Ipv4Addr>,
}

/// A first-hop next-hop on the root towards a destination.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct NextHop {
    /// The first-hop node of the path.
    pub node: NodeId,
    /// The outgoing link on the root.
    pub oif: LinkId,
    /// Gateway address of the first hop.
    pub gw: Option<Ipv4Addr>,
}

/// The per-destination outcome of one SPF run.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SpfResult {
    /// The destination this result describes.
    pub node: NodeId,
    /// Shortest-path metric from the root.
    pub metric: u32,
    /// Equal-cost predecessor sets, per next-hop kind. Unordered.
    pub preds: Kinds<Vec<PredEntry>>,
    /// First-hop next-hops on the root, per kind.
    pub next_hops: Kinds<Vec<NextHop>>,
}

/// The result of one SPF computation for a `(root, level)` pair.
///
/// Owned by the instance's cache slot for that root; freed and rebuilt
/// whenever the topology version moves.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SpfRun {
    /// The root the run was computed from.
    pub root: NodeId,
    /// The level the run was computed at.
    pub level: Level,
    pub(crate) version: u64,
    results: BTreeMap<NodeId, SpfResult>,
    // Pseudonodes never surface in the results, but protection computations
    // still need distances to them.
    pn_metrics: BTreeMap<NodeId, u32>,
}

impl SpfRun {
    /// The result slot of `node`, or `None` if the node was unreachable.
    /// Pseudonodes have no result slot.
    pub fn result(&self, node: NodeId) -> Option<&SpfResult> {
        self.results.get(&node)
    }

    /// Iterate over the result slots of all reachable nodes.
    pub fn results(&self) -> impl Iterator<Item = &SpfResult> {
        self.results.values()
    }

    /// The metric of `node`, or [`INFINITE_METRIC`] if unreachable. Also
    /// answers for pseudonodes.
    pub fn metric(&self, node: NodeId) -> u32 {
        self.results
            .get(&node)
            .map(|r| r.metric)
            .or_else(|| self.pn_metrics.get(&node).copied())
            .unwrap_or(INFINITE_METRIC)
    }

    /// Whether `node` was reached by this run.
    pub fn reachable(&self, node: NodeId) -> bool {
        self.metric(node) < INFINITE_METRIC
    }
}

/// Scratch state of one node during a run. Metric arithmetic stays in `u64`
/// so that sums involving [`INFINITE_METRIC`] cannot wrap.
struct NodeState {
    metric: u64,
    preds: Kinds<Vec<PredEntry>>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            metric: INFINITE_METRIC as u64,
            preds: Kinds::default(),
        }
    }
}

pub(crate) fn compute_spf(instance: &Instance, root: NodeId, level: Level) -> SpfRun {
    log::trace!(
        "node {}: running SPF at {level}",
        instance.node(root).name
    );

    let mut run = SpfRun {
        root,
        level,
        version: instance.version(),
        results: BTreeMap::new(),
        pn_metrics: BTreeMap::new(),
    };

    let mut states: BTreeMap<NodeId, NodeState> = BTreeMap::new();
    states.insert(
        root,
        NodeState {
            metric: 0,
            preds: Kinds::default(),
        },
    );

    // The candidate tree, keyed on the current metric.
    let mut ctree: PriorityQueue<NodeId, Reverse<u64>> = PriorityQueue::new();
    ctree.push(root, Reverse(0));

    while let Some((candidate, Reverse(metric))) = ctree.pop() {
        log::trace!(
            "node {}: candidate {} removed (metric {metric})",
            instance.node(root).name,
            instance.node(candidate).name
        );

        // The candidate is final: move its predecessor list into the result
        // slot and reset the scratch list, so later equal-cost discoveries
        // through it cannot double-count.
        let preds = std::mem::take(&mut states.get_mut(&candidate).expect("on ctree").preds);
        run.results.insert(
            candidate,
            SpfResult {
                node: candidate,
                metric: metric.min(INFINITE_METRIC as u64) as u32,
                preds,
                next_hops: Kinds::default(),
            },
        );

        let overloaded = *instance.node(candidate).overloaded.get(level);

        for (pn, pn_w) in instance.pn_neighbors(candidate, level) {
            let w = if overloaded {
                INFINITE_METRIC as u64
            } else {
                pn_w as u64
            };
            let cand = (metric + w).min(INFINITE_METRIC as u64) as u32;
            let slot = run.pn_metrics.entry(pn).or_insert(INFINITE_METRIC);
            *slot = (*slot).min(cand);
        }

        for nbr in instance.logical_neighbors(candidate, level) {
            let w = if overloaded {
                INFINITE_METRIC as u64
            } else {
                nbr.metric as u64
            };
            let cand = metric + w;
            let state = states.entry(nbr.node).or_default();
            let entry = PredEntry {
                node: candidate,
                oif: nbr.oif,
                gw: nbr.gw,
            };
            if cand < state.metric {
                state.preds = Kinds::default();
                state.preds.get_mut(nbr.kind).push(entry);
                state.metric = cand;
                if ctree.change_priority(&nbr.node, Reverse(cand)).is_none()
                    && !run.results.contains_key(&nbr.node)
                {
                    ctree.push(nbr.node, Reverse(cand));
                }
            } else if cand == state.metric {
                let list = state.preds.get_mut(nbr.kind);
                // A correct relaxation never produces the same entry twice.
                assert!(!list.contains(&entry), "duplicate predecessor {entry:?}");
                list.push(entry);
            }
        }
    }

    derive_next_hops(&mut run);
    run
}

/// Fill in the per-kind first-hop lists: a destination whose predecessor is
/// the root is its own first hop; every other destination inherits the lists
/// of its predecessors. Predecessors are processed in metric order, so a
/// predecessor's lists are complete before its successors read them.
fn derive_next_hops(run: &mut SpfRun) {
    let mut order: Vec<NodeId> = run.results.keys().copied().collect();
    order.sort_by_key(|n| (run.results[n].metric, *n));

    for node in order {
        if node == run.root {
            continue;
        }
        let mut next_hops: Kinds<Vec<NextHop>> = Kinds::default();
        for kind in NhKind::list() {
            let mut nhs = Vec::new();
            for pred in run.results[&node].preds.get(kind) {
                if pred.node == run.root {
                    nhs.push(NextHop {
                        node,
                        oif: pred.oif,
                        gw: pred.gw,
                    });
                } else {
                    // Inherit same-kind next-hops; an LSP tail reached over
                    // plain IP hops falls back to the IP list.
                    let upstream = &run.results[&pred.node].next_hops;
                    let inherited = upstream.get(kind);
                    if inherited.is_empty() {
                        nhs.extend_from_slice(upstream.get(NhKind::Ipnh));
                    } else {
                        nhs.extend_from_slice(inherited);
                    }
                }
            }
            nhs.sort_unstable();
            nhs.dedup();
            *next_hops.get_mut(kind) = nhs;
        }
        run.results.get_mut(&node).expect("in order").next_hops = next_hops;
    }
}

impl Instance {
    /// Run SPF for `(root, level)`, reusing the cached result if the
    /// topology has not changed since it was computed.
    pub fn spf(&mut self, root: NodeId, level: Level) -> &SpfRun {
        let version = self.version();
        let stale = self
            .spf_cache
            .get(&(root, level))
            .map(|run| run.version != version)
            .unwrap_or(true);
        if stale {
            let run = compute_spf(self, root, level);
            self.spf_cache.insert((root, level), run);
        }
        self.spf_cache.get(&(root, level)).expect("just inserted")
    }

    /// The cached SPF run for `(root, level)`.
    ///
    /// # Panics
    ///
    /// Panics if the run has not been computed or is stale; callers must
    /// invoke [`Instance::spf`] first. Asking for results that were never
    /// produced is a programming error.
    pub fn spf_result(&self, root: NodeId, level: Level) -> &SpfRun {
        let run = self
            .spf_cache
            .get(&(root, level))
            .expect("SPF has not been computed for this root and level");
        assert!(
            run.version == self.version(),
            "stale SPF result: the topology has changed since the run"
        );
        run
    }

    /// Shortest-path distance from `x` to `y` at `level`, running SPF from
    /// `x` if needed. [`INFINITE_METRIC`] if unreachable.
    pub fn dist(&mut self, x: NodeId, y: NodeId, level: Level) -> u32 {
        self.spf(x, level).metric(y)
    }
}
