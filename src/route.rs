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

//! The route builder: projects SPF results and the prefix store into
//! longest-prefix-match route tables, one per level.
//!
//! For every prefix hosted somewhere in the topology, the winning host is
//! selected by minimum `(route preference, spf metric + prefix metric)`. All
//! hosts stay recorded in the route's like-prefix list; the winner's
//! next-hop lists become the primary next-hops. SPRING-capable routes are
//! additionally decorated with MPLS label operations.

use std::collections::BTreeMap;

use prefix_trie::PrefixMap;
use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::lfa::Lfa;
use crate::spf::NextHop;
use crate::srgb::Label;
use crate::types::{
    Kinds, Level, Levels, NodeId, PrefixFlags, PrefixKey, INFINITE_METRIC,
};

/// IS-IS route preference; lower values are preferred. A prefix leaked down
/// with the down bit set competes at its level's external preference.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum RoutePreference {
    /// Level-1 internal route.
    L1Internal,
    /// Level-1 external route.
    L1External,
    /// Level-2 internal route.
    L2Internal,
    /// Level-2 external route.
    L2External,
}

/// Compute the preference of a prefix advertised at `level`.
pub fn route_preference(flags: PrefixFlags, level: Level) -> RoutePreference {
    let external = flags.contains(PrefixFlags::EXTERNAL) || flags.contains(PrefixFlags::DOWN);
    match (level, external) {
        (Level::L1, false) => RoutePreference::L1Internal,
        (Level::L1, true) => RoutePreference::L1External,
        (Level::L2, false) => RoutePreference::L2Internal,
        (Level::L2, true) => RoutePreference::L2External,
    }
}

/// One host advertising the prefix of a route.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LikePrefix {
    /// The hosting node.
    pub node: NodeId,
    /// Preference of this advertisement.
    pub preference: RoutePreference,
    /// `spf_metric(host) + prefix_metric`.
    pub metric: u32,
}

/// MPLS label-stack operation of an SR next-hop. An ingress route pushes the
/// next hop's label; a transit entry swaps it; the penultimate hop pops it
/// unless the SID requests otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum StackOp {
    /// Push the label (ingress).
    Push(Label),
    /// Swap the top label (transit).
    Swap(Label),
    /// Pop the top label (penultimate hop).
    Pop,
}

/// Segment-routing decoration of a route.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SrRoute {
    /// SID index of the winning prefix.
    pub sid_index: u32,
    /// The label this router expects for the prefix (from its own SRGB);
    /// incoming traffic gets its top label swapped to the next hop's.
    pub in_label: Label,
    /// Per-primary-next-hop ingress operation, pushing the label from the
    /// next hop's SRGB. Next-hops without SPRING carry no operation.
    pub ops: Vec<(NextHop, StackOp)>,
}

/// Installation state of a route after a (re)build.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum RouteState {
    /// The route did not exist before.
    #[default]
    Added,
    /// The route existed with different content.
    Updated,
    /// The route is identical to the previous build.
    Unchanged,
}

/// A computed route.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Route {
    /// Canonical prefix of the route.
    pub key: PrefixKey,
    /// Level the route was computed at.
    pub level: Level,
    /// Preference of the winning advertisement.
    pub preference: RoutePreference,
    /// Metric of the winning advertisement.
    pub metric: u32,
    /// Metric of the route over LSP forwarding adjacencies;
    /// [`INFINITE_METRIC`] when the winner has no LSP next-hops.
    pub lsp_metric: u32,
    /// External metric of the winning prefix; 0 for internal prefixes.
    pub ext_metric: u32,
    /// Flags of the winning prefix.
    pub flags: PrefixFlags,
    /// Every host advertising this prefix, ordered by `(preference,
    /// metric)`.
    pub like_prefixes: Vec<LikePrefix>,
    /// Primary next-hops, copied from the winner's SPF result.
    pub primary: Kinds<Vec<NextHop>>,
    /// Backup next-hops, installed by [`RouteTable::apply_protection`].
    pub backups: Kinds<Vec<NextHop>>,
    /// SPRING decoration, present iff the winning prefix carries an active
    /// prefix-SID and this router has SPRING enabled.
    pub sr: Option<SrRoute>,
    /// Outcome of the last build.
    pub state: RouteState,
}

/// The longest-prefix-match route tables of one router, one per level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteTable {
    root: NodeId,
    tables: Levels<PrefixMap<PrefixKey, Route>>,
}

impl RouteTable {
    /// Compute the route tables of `root` at both levels.
    pub fn compute(instance: &mut Instance, root: NodeId) -> Self {
        let mut table = Self {
            root,
            tables: Levels::default(),
        };
        table.rebuild(instance);
        table
    }

    /// The router the table belongs to.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Rebuild both levels from fresh SPF results, diffing each route
    /// against the previous content into its [`RouteState`].
    pub fn rebuild(&mut self, instance: &mut Instance) {
        for level in Level::list() {
            let old = std::mem::take(self.tables.get_mut(level));
            let new = build_level(instance, self.root, level, &old);
            *self.tables.get_mut(level) = new;
        }
    }

    /// Exact-match lookup of a route.
    pub fn get(&self, level: Level, key: &PrefixKey) -> Option<&Route> {
        self.tables.get(level).get(key)
    }

    /// Longest-prefix-match lookup at one level.
    pub fn lookup_level(&self, level: Level, addr: std::net::Ipv4Addr) -> Option<&Route> {
        let key = PrefixKey::new(addr, 32).expect("/32 is always valid");
        self.tables.get(level).get_lpm(&key).map(|(_, route)| route)
    }

    /// Longest-prefix-match lookup across both levels: the longer match
    /// wins, ties go to the better preference, then the smaller metric.
    pub fn lookup(&self, addr: std::net::Ipv4Addr) -> Option<&Route> {
        Level::list()
            .into_iter()
            .filter_map(|level| self.lookup_level(level, addr))
            .max_by_key(|r| {
                (
                    r.key.prefix_len(),
                    std::cmp::Reverse(r.preference),
                    std::cmp::Reverse(r.metric),
                )
            })
    }

    /// Iterate over the routes of one level.
    pub fn routes(&self, level: Level) -> impl Iterator<Item = &Route> {
        self.tables.get(level).iter().map(|(_, route)| route)
    }

    /// Install the backup next-hops of an LFA computation: every `(N, D)`
    /// pair contributes `N` as a backup next-hop to the routes whose winning
    /// host is `D`.
    pub fn apply_protection(&mut self, instance: &Instance, lfa: &Lfa) {
        let level = lfa.level;
        for pair in &lfa.pairs {
            let link = instance.link(pair.oif);
            let backup = NextHop {
                node: pair.lfa,
                oif: pair.oif,
                gw: link.to.prefix.as_ref().map(|p| p.addr),
            };
            let protected: Vec<PrefixKey> = self
                .tables
                .get(level)
                .iter()
                .filter(|(_, route)| {
                    route.like_prefixes.first().map(|h| h.node) == Some(pair.dest)
                })
                .map(|(key, _)| *key)
                .collect();
            for key in protected {
                let route = self
                    .tables
                    .get_mut(level)
                    .get_mut(&key)
                    .expect("key comes from the table");
                let backups = route.backups.get_mut(link.kind.nh_kind());
                if !backups.contains(&backup) {
                    backups.push(backup);
                }
            }
        }
    }
}

fn build_level(
    instance: &mut Instance,
    root: NodeId,
    level: Level,
    old: &PrefixMap<PrefixKey, Route>,
) -> PrefixMap<PrefixKey, Route> {
    instance.spf(root, level);
    let run = instance.spf_result(root, level);

    // Gather every advertisement of every reachable host, keyed by the
    // canonical prefix.
    #[allow(clippy::type_complexity)]
    let mut candidates: BTreeMap<PrefixKey, Vec<(LikePrefix, PrefixFlags, u32, Option<u32>)>> =
        BTreeMap::new();
    for result in run.results() {
        for prefix in instance.node_prefixes(result.node, level) {
            // A type-2 external metric dominates the internal distance
            // instead of adding to it.
            let metric = if prefix.flags.contains(PrefixFlags::EXTERNAL_METRIC_TYPE) {
                prefix.metric
            } else {
                (result.metric as u64 + prefix.metric as u64).min(INFINITE_METRIC as u64) as u32
            };
            let host = LikePrefix {
                node: result.node,
                preference: route_preference(prefix.flags, level),
                metric,
            };
            let sid_index = prefix
                .sid
                .as_ref()
                .filter(|sid| sid.active)
                .map(|sid| sid.value);
            candidates
                .entry(prefix.key())
                .or_default()
                .push((host, prefix.flags, prefix.metric, sid_index));
        }
    }

    let mut table = PrefixMap::new();
    for (key, mut hosts) in candidates {
        hosts.sort_by_key(|(h, _, _, _)| (h.preference, h.metric, h.node));
        let (winner, flags, prefix_metric, sid_index) = hosts[0];

        let primary = run
            .result(winner.node)
            .expect("hosts come from SPF results")
            .next_hops
            .clone();

        let sr = sid_index.and_then(|sid_index| {
            let srgb = instance.srgb(root)?;
            let in_label = srgb.label_from_index(sid_index);
            let ops = primary
                .ip
                .iter()
                .filter_map(|nh| {
                    let label = instance.srgb(nh.node)?.label_from_index(sid_index);
                    Some((*nh, StackOp::Push(label)))
                })
                .collect();
            Some(SrRoute {
                sid_index,
                in_label,
                ops,
            })
        });

        let mut route = Route {
            key,
            level,
            preference: winner.preference,
            metric: winner.metric,
            lsp_metric: if primary.lsp.is_empty() {
                INFINITE_METRIC
            } else {
                winner.metric
            },
            ext_metric: if flags.contains(PrefixFlags::EXTERNAL) {
                prefix_metric
            } else {
                0
            },
            flags,
            like_prefixes: hosts.iter().map(|(h, _, _, _)| *h).collect(),
            primary,
            backups: Kinds::default(),
            sr,
            state: RouteState::Added,
        };
        route.state = match old.get(&key) {
            None => RouteState::Added,
            Some(prev) => {
                if prev.preference == route.preference
                    && prev.metric == route.metric
                    && prev.primary == route.primary
                    && prev.like_prefixes == route.like_prefixes
                {
                    RouteState::Unchanged
                } else {
                    RouteState::Updated
                }
            }
        };
        table.insert(key, route);
    }
    table
}
