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

//! The topology model: nodes, paired directed links, per-level prefix lists,
//! and the [`Instance`] that owns them.
//!
//! A bidirectional adjacency is stored as two symmetric link objects, one per
//! owning node; a unidirectional (LSP forwarding) adjacency as one. Every
//! topology mutation bumps an instance-wide version counter; cached SPF runs
//! compare against it and recompute on mismatch.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use itertools::Either;
use petgraph::prelude::*;
use serde::{Deserialize, Serialize};

use crate::spf::SpfRun;
use crate::srgb::Srgb;
use crate::types::{
    Area, IndexType, InstanceError, Level, LevelMask, Levels, LinkId, NhKind, NodeId, Prefix,
    PrefixFlags, PrefixKey, MAX_NODE_IFACES,
};

/// Per-level classification of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum NodeType {
    /// A real router.
    #[default]
    Real,
    /// A synthetic node representing a broadcast LAN. Pseudonodes are
    /// transparent to SPF consumers: no predecessor or next-hop ever names
    /// one.
    Pseudonode,
}

/// Administrative status of a link.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum LinkStatus {
    /// The link participates in SPF.
    #[default]
    Up,
    /// The link is ignored by SPF, and its interface prefixes are detached
    /// from the owning node.
    Down,
}

/// Protection requested for a link.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum ProtectionType {
    /// No protection.
    #[default]
    None,
    /// Link protection (LFA inequality 1).
    Link,
    /// Link and node protection (LFA inequalities 1 and 3).
    LinkNode,
}

/// Kind of adjacency a link represents.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum LinkKind {
    /// A regular IP adjacency; contributes to [`NhKind::Ipnh`].
    #[default]
    Ip,
    /// A unidirectional LSP forwarding adjacency; contributes to
    /// [`NhKind::Lspnh`] and is exempt from the two-way check.
    Lsp,
}

impl LinkKind {
    /// The next-hop kind this link contributes to.
    pub fn nh_kind(&self) -> NhKind {
        match self {
            LinkKind::Ip => NhKind::Ipnh,
            LinkKind::Lsp => NhKind::Lspnh,
        }
    }
}

/// Configuration flags of a link end.
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkEndFlags(u8);

impl LinkEndFlags {
    /// The interface must not be considered as an LFA/RLFA candidate.
    pub const NO_ELIGIBLE_BACKUP: LinkEndFlags = LinkEndFlags(0b1);

    /// Checks whether all flags in `other` are set.
    pub const fn contains(&self, other: LinkEndFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set or clear the flags in `other`.
    pub fn set(&mut self, other: LinkEndFlags, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl std::fmt::Debug for LinkEndFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.contains(LinkEndFlags::NO_ELIGIBLE_BACKUP) {
            f.write_str("[no-eligible-backup]")
        } else {
            f.write_str("[]")
        }
    }
}

/// A directed interface anchoring a link at a node.
///
/// Only the `from` end of a link owns its interface prefix; the `to` end
/// carries a copy used for gateway resolution (the canonical object lives on
/// the symmetric link owned by the neighbor).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct LinkEnd {
    /// Interface name, e.g. `eth0/0`.
    pub name: String,
    /// Interface address, if configured.
    pub prefix: Option<Prefix>,
    /// Configuration flags.
    pub flags: LinkEndFlags,
}

impl LinkEnd {
    fn new(name: &str, addr: Option<(Ipv4Addr, u8)>) -> Self {
        Self {
            name: name.to_string(),
            prefix: addr.map(|(a, m)| Prefix::new(a, m, 0)),
            flags: LinkEndFlags::default(),
        }
    }
}

/// A directed link between two nodes.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Link {
    /// The end anchored at the owning (source) node.
    pub from: LinkEnd,
    /// The end anchored at the neighbor.
    pub to: LinkEnd,
    /// Per-level metric.
    pub metric: Levels<u32>,
    /// Levels the link participates in.
    pub levels: LevelMask,
    /// Administrative status.
    pub status: LinkStatus,
    /// Requested protection.
    pub protection: ProtectionType,
    /// Adjacency kind.
    pub kind: LinkKind,
    /// The symmetric link of a bidirectional adjacency.
    pub reverse: Option<LinkId>,
}

impl Link {
    /// The metric at `level`.
    pub fn metric(&self, level: Level) -> u32 {
        *self.metric.get(level)
    }

    /// Whether the link is up and participates in `level`.
    pub fn usable(&self, level: Level) -> bool {
        self.status == LinkStatus::Up && self.levels.contains(level)
    }
}

/// Parameters for creating a link with [`Instance::insert_link`].
#[derive(Clone, Debug)]
pub struct LinkSpec {
    from_iface: String,
    to_iface: String,
    metric: u32,
    from_addr: Option<(Ipv4Addr, u8)>,
    to_addr: Option<(Ipv4Addr, u8)>,
    levels: LevelMask,
    kind: LinkKind,
}

impl LinkSpec {
    /// A link between the two named interfaces with the same metric at every
    /// level in `levels`, and no interface addresses.
    pub fn new(from_iface: &str, to_iface: &str, metric: u32, levels: LevelMask) -> Self {
        Self {
            from_iface: from_iface.to_string(),
            to_iface: to_iface.to_string(),
            metric,
            from_addr: None,
            to_addr: None,
            levels,
            kind: LinkKind::Ip,
        }
    }

    /// Set the interface address of the `from` side, given as `"a.b.c.d/len"`.
    pub fn from_addr(mut self, addr: &str) -> Self {
        self.from_addr = Some(parse_addr(addr));
        self
    }

    /// Set the interface address of the `to` side, given as `"a.b.c.d/len"`.
    pub fn to_addr(mut self, addr: &str) -> Self {
        self.to_addr = Some(parse_addr(addr));
        self
    }

    /// Turn the link into an LSP forwarding adjacency.
    pub fn lsp(mut self) -> Self {
        self.kind = LinkKind::Lsp;
        self
    }
}

fn parse_addr(addr: &str) -> (Ipv4Addr, u8) {
    let net: ipnet::Ipv4Net = addr.parse().expect("a valid interface address");
    (net.addr(), net.prefix_len())
}

/// Whether [`Instance::insert_link`] creates the symmetric link as well.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    /// Create both directions.
    Bidirectional,
    /// Create only the forward direction (LSP adjacency).
    Unidirectional,
}

/// A node of the topology.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Unique name.
    pub name: String,
    /// Area tag.
    pub area: Area,
    /// Router-id, also attached as a local /32 prefix at both levels.
    pub router_id: Ipv4Addr,
    /// Per-level node classification.
    pub node_type: Levels<NodeType>,
    /// Per-level overload flag. An overloaded node advertises infinite
    /// outgoing cost, so nothing transits through it.
    pub overloaded: Levels<bool>,
    /// The SRGB, present iff SPRING is enabled on the node.
    pub spring: Option<Srgb>,
    pub(crate) prefixes: Levels<Vec<Prefix>>,
}

impl Node {
    /// Whether the node is a pseudonode at `level`.
    pub fn is_pseudonode(&self, level: Level) -> bool {
        *self.node_type.get(level) == NodeType::Pseudonode
    }

    /// Whether SPRING (segment routing) is enabled.
    pub fn spring_enabled(&self) -> bool {
        self.spring.is_some()
    }
}

/// A logical neighbor of a node, as seen by SPF.
///
/// Pseudonodes are traversed transparently: a neighbor reached across a PN is
/// yielded as the attached real node, with composite metric and the gateway
/// prefix of the PN-to-neighbor link.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LogicalNeighbor {
    /// The (real) neighbor node.
    pub node: NodeId,
    /// The first-hop link on the source node.
    pub oif: LinkId,
    /// Address of the neighbor's interface, used as the gateway.
    pub gw: Option<Ipv4Addr>,
    /// Composite metric of the hop.
    pub metric: u32,
    /// Next-hop kind the adjacency contributes to.
    pub kind: NhKind,
}

/// A physical neighbor of a node, without pseudonode transparency. LFA must
/// see pseudonodes explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PhysicalNeighbor {
    /// The neighbor node (possibly a pseudonode).
    pub node: NodeId,
    /// The outgoing link towards the neighbor.
    pub out_link: LinkId,
    /// The incoming link from the neighbor.
    pub in_link: LinkId,
}

/// An IS-IS instance: the process-wide topology singleton plus derived SPF
/// state.
///
/// All entry points take the instance explicitly, so tests can build multiple
/// isolated topologies.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    pub(crate) graph: StableDiGraph<Node, Link, IndexType>,
    root: Option<NodeId>,
    version: u64,
    #[serde(skip)]
    pub(crate) spf_cache: BTreeMap<(NodeId, Level), SpfRun>,
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

impl Instance {
    /// Create an empty instance.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
            root: None,
            version: 0,
            spf_cache: BTreeMap::new(),
        }
    }

    /// The current topology version. Bumped by every mutating operation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Add a node with the given name and area. The router-id is assigned
    /// sequentially from `192.168.0.0/16` and attached as a host prefix at
    /// both levels.
    pub fn add_node(&mut self, name: &str, area: impl Into<Area>) -> NodeId {
        let n = self.graph.node_count() as u32 + 1;
        let router_id = Ipv4Addr::new(192, 168, (n >> 8) as u8, n as u8);
        let node = Node {
            name: name.to_string(),
            area: area.into(),
            router_id,
            node_type: Levels::default(),
            overloaded: Levels::default(),
            spring: None,
            prefixes: Levels {
                l1: vec![Prefix::new(router_id, 32, 0)],
                l2: vec![Prefix::new(router_id, 32, 0)],
            },
        };
        self.bump_version();
        let id = self.graph.add_node(node);
        log::debug!("created node {name} ({id:?}) with router-id {router_id}");
        id
    }

    /// Look up a node by name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.graph
            .node_indices()
            .find(|id| self.graph[*id].name == name)
    }

    /// Get a reference to a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this instance; node ids are only
    /// obtained from it.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.graph[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.graph[id]
    }

    /// Iterate over all node ids.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Get a reference to a link.
    pub fn link(&self, id: LinkId) -> &Link {
        &self.graph[id]
    }

    /// The node owning the `from` end of a link.
    pub fn link_source(&self, id: LinkId) -> NodeId {
        self.graph.edge_endpoints(id).expect("dangling link id").0
    }

    /// The node at the `to` end of a link.
    pub fn link_target(&self, id: LinkId) -> NodeId {
        self.graph.edge_endpoints(id).expect("dangling link id").1
    }

    /// Set the instance root used by convenience queries.
    pub fn set_root(&mut self, node: NodeId) {
        self.root = Some(node);
    }

    /// The instance root, if set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Insert a link between `a` and `b`. For [`Direction::Bidirectional`],
    /// the symmetric link is created as well and both are tied together.
    pub fn insert_link(
        &mut self,
        a: NodeId,
        b: NodeId,
        spec: LinkSpec,
        direction: Direction,
    ) -> Result<LinkId, InstanceError> {
        let new_ends = match direction {
            Direction::Bidirectional => 2,
            Direction::Unidirectional => 1,
        };
        for node in [a, b] {
            let slots = self.graph.edges(node).count()
                + self.graph.edges_directed(node, Incoming).count();
            if slots + new_ends > MAX_NODE_IFACES {
                return Err(InstanceError::InterfaceSlotsExhausted(
                    self.graph[node].name.clone(),
                ));
            }
        }

        let forward = Link {
            from: LinkEnd::new(&spec.from_iface, spec.from_addr),
            to: LinkEnd::new(&spec.to_iface, spec.to_addr),
            metric: Levels {
                l1: spec.metric,
                l2: spec.metric,
            },
            levels: spec.levels,
            status: LinkStatus::Up,
            protection: ProtectionType::None,
            kind: spec.kind,
            reverse: None,
        };
        let fwd_id = self.graph.add_edge(a, b, forward);
        if direction == Direction::Bidirectional {
            let backward = Link {
                from: LinkEnd::new(&spec.to_iface, spec.to_addr),
                to: LinkEnd::new(&spec.from_iface, spec.from_addr),
                metric: Levels {
                    l1: spec.metric,
                    l2: spec.metric,
                },
                levels: spec.levels,
                status: LinkStatus::Up,
                protection: ProtectionType::None,
                kind: spec.kind,
                reverse: Some(fwd_id),
            };
            let bwd_id = self.graph.add_edge(b, a, backward);
            self.graph[fwd_id].reverse = Some(bwd_id);
        }
        self.bump_version();
        Ok(fwd_id)
    }

    /// Find the outgoing link anchored at `node` whose `from` interface is
    /// named `iface`.
    pub fn find_link(&self, node: NodeId, iface: &str) -> Result<LinkId, InstanceError> {
        self.graph
            .edges(node)
            .find(|e| e.weight().from.name == iface)
            .map(|e| e.id())
            .ok_or_else(|| {
                InstanceError::InterfaceNotFound(self.graph[node].name.clone(), iface.to_string())
            })
    }

    /// Enable or disable the interface `iface` of `node`. Disabling downs the
    /// outgoing link, which detaches its interface prefixes from the node and
    /// (through the two-way check) removes the adjacency in both directions.
    pub fn set_interface_enabled(
        &mut self,
        node: NodeId,
        iface: &str,
        enabled: bool,
    ) -> Result<(), InstanceError> {
        let link = self.find_link(node, iface)?;
        self.graph[link].status = if enabled {
            LinkStatus::Up
        } else {
            LinkStatus::Down
        };
        self.bump_version();
        log::debug!(
            "node {}: interface {iface} {}",
            self.graph[node].name,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Change the metric of the outgoing link `iface` of `node` at `level`.
    pub fn set_metric(
        &mut self,
        node: NodeId,
        iface: &str,
        level: Level,
        metric: u32,
    ) -> Result<(), InstanceError> {
        let link = self.find_link(node, iface)?;
        if !self.graph[link].levels.contains(level) {
            return Err(InstanceError::LevelNotEnabled(iface.to_string(), level));
        }
        if self.graph[link].metric(level) == metric {
            return Ok(());
        }
        *self.graph[link].metric.get_mut(level) = metric;
        self.bump_version();
        Ok(())
    }

    /// Reclassify `node` as a pseudonode at `level`. Outgoing metrics of the
    /// pseudonode are zeroed at that level, the IS-IS convention for
    /// broadcast LAN modeling.
    pub fn mark_pseudonode(&mut self, node: NodeId, level: Level) {
        *self.graph[node].node_type.get_mut(level) = NodeType::Pseudonode;
        let out_links: Vec<LinkId> = self.graph.edges(node).map(|e| e.id()).collect();
        for link in out_links {
            if self.graph[link].levels.contains(level) {
                *self.graph[link].metric.get_mut(level) = 0;
            }
        }
        self.bump_version();
    }

    /// Set or clear the overload flag of `node` at `level`.
    pub fn set_overload(&mut self, node: NodeId, level: Level, overloaded: bool) {
        *self.graph[node].overloaded.get_mut(level) = overloaded;
        self.bump_version();
    }

    /// Set the requested protection of the outgoing link `iface` of `node`.
    pub fn set_link_protection(
        &mut self,
        node: NodeId,
        iface: &str,
        protection: ProtectionType,
    ) -> Result<(), InstanceError> {
        let link = self.find_link(node, iface)?;
        self.graph[link].protection = protection;
        Ok(())
    }

    /// Exclude (or re-admit) the interface as an LFA/RLFA candidate.
    pub fn set_no_eligible_backup(
        &mut self,
        node: NodeId,
        iface: &str,
        value: bool,
    ) -> Result<(), InstanceError> {
        let link = self.find_link(node, iface)?;
        self.graph[link]
            .from
            .flags
            .set(LinkEndFlags::NO_ELIGIBLE_BACKUP, value);
        Ok(())
    }

    // ----- prefixes ----------------------------------------------------

    /// Attach a local prefix to `node` at `level`.
    pub fn attach_prefix(
        &mut self,
        node: NodeId,
        addr: Ipv4Addr,
        mask: u8,
        level: Level,
        metric: u32,
    ) -> Result<(), InstanceError> {
        let prefix = Prefix::new(addr, mask, metric);
        let key = prefix.key();
        if self.node_prefixes(node, level).any(|p| p.has_key(&key)) {
            return Err(InstanceError::DuplicatePrefix(
                key,
                self.graph[node].name.clone(),
                level,
            ));
        }
        self.graph[node].prefixes.get_mut(level).push(prefix);
        self.bump_version();
        Ok(())
    }

    /// Detach a local prefix from `node` at `level` and return it. The
    /// prefix-SID bound to it, if any, is freed and its SRGB index released.
    pub fn detach_prefix(
        &mut self,
        node: NodeId,
        addr: Ipv4Addr,
        mask: u8,
        level: Level,
    ) -> Result<Prefix, InstanceError> {
        let key = crate::types::prefix::canonical(addr, mask);
        let pos = self.graph[node]
            .prefixes
            .get(level)
            .iter()
            .position(|p| p.has_key(&key))
            .ok_or_else(|| {
                InstanceError::PrefixNotFound(key, self.graph[node].name.clone(), level)
            })?;
        let prefix = self.graph[node].prefixes.get_mut(level).remove(pos);
        if let Some(sid) = &prefix.sid {
            if let Some(srgb) = self.graph[node].spring.as_mut() {
                srgb.mark_unused(sid.value);
            }
        }
        self.bump_version();
        Ok(prefix)
    }

    /// Attach a prefix redistributed from another protocol to `node` at
    /// `level`. The prefix competes at its level's external preference; with
    /// `metric_type2`, the external metric dominates the internal distance
    /// during route selection instead of adding to it.
    pub fn redistribute_prefix(
        &mut self,
        node: NodeId,
        addr: Ipv4Addr,
        mask: u8,
        level: Level,
        metric: u32,
        metric_type2: bool,
    ) -> Result<(), InstanceError> {
        self.attach_prefix(node, addr, mask, level, metric)?;
        let key = crate::types::prefix::canonical(addr, mask);
        let prefix = self
            .find_prefix_mut(node, &key, level)
            .expect("attached right above");
        prefix.flags.insert(PrefixFlags::EXTERNAL);
        if metric_type2 {
            prefix.flags.insert(PrefixFlags::EXTERNAL_METRIC_TYPE);
        }
        Ok(())
    }

    /// Leak a prefix hosted on `node` from one level to the other. The leaked
    /// copy keeps the metric and gets the down bit set; leaking twice is
    /// refused.
    pub fn leak_prefix(
        &mut self,
        node: NodeId,
        addr: Ipv4Addr,
        mask: u8,
        from_level: Level,
        to_level: Level,
    ) -> Result<u32, InstanceError> {
        let key = crate::types::prefix::canonical(addr, mask);
        let name = self.graph[node].name.clone();
        let source = self
            .node_prefixes(node, from_level)
            .find(|p| p.has_key(&key))
            .ok_or_else(|| InstanceError::PrefixNotFound(key, name.clone(), from_level))?;
        let mut leaked = Prefix::new(source.addr, source.mask, source.metric);
        leaked.flags = source.flags;
        if self.node_prefixes(node, to_level).any(|p| p.has_key(&key)) {
            return Err(InstanceError::DuplicatePrefix(key, name, to_level));
        }
        leaked.flags.insert(PrefixFlags::DOWN);
        let metric = leaked.metric;
        log::debug!("node {name}: prefix {leaked} leaked from {from_level} to {to_level}");
        self.graph[node].prefixes.get_mut(to_level).push(leaked);
        self.bump_version();
        Ok(metric)
    }

    /// Iterate over the prefixes of `node` at `level`: the local prefix list
    /// followed by the interface addresses of all enabled outgoing links
    /// participating in that level.
    pub fn node_prefixes(&self, node: NodeId, level: Level) -> impl Iterator<Item = &Prefix> + '_ {
        self.graph[node].prefixes.get(level).iter().chain(
            self.graph
                .edges(node)
                .filter(move |e| e.weight().usable(level))
                .filter_map(|e| e.weight().from.prefix.as_ref()),
        )
    }

    /// Find a prefix of `node` at `level` by canonical key, searching the
    /// local list and the interface addresses.
    pub fn find_prefix(&self, node: NodeId, key: &PrefixKey, level: Level) -> Option<&Prefix> {
        self.node_prefixes(node, level).find(|p| p.has_key(key))
    }

    pub(crate) fn find_prefix_mut(
        &mut self,
        node: NodeId,
        key: &PrefixKey,
        level: Level,
    ) -> Option<&mut Prefix> {
        let local = self.graph[node]
            .prefixes
            .get(level)
            .iter()
            .position(|p| p.has_key(key));
        if let Some(pos) = local {
            return self.graph[node].prefixes.get_mut(level).get_mut(pos);
        }
        let link = self
            .graph
            .edges(node)
            .filter(|e| e.weight().usable(level))
            .find(|e| {
                e.weight()
                    .from
                    .prefix
                    .as_ref()
                    .is_some_and(|p| p.has_key(key))
            })
            .map(|e| e.id())?;
        self.graph[link].from.prefix.as_mut()
    }

    // ----- neighbor iterators ------------------------------------------

    /// Whether the adjacency over `link` is valid for SPF at `level`: the
    /// link must be up at that level and, for IP adjacencies, the symmetric
    /// link must exist and be up at that level as well (two-way check).
    pub fn two_way_ok(&self, link: LinkId, level: Level) -> bool {
        let l = &self.graph[link];
        if !l.usable(level) {
            return false;
        }
        match l.kind {
            LinkKind::Lsp => true,
            LinkKind::Ip => l.reverse.is_some_and(|rev| self.graph[rev].usable(level)),
        }
    }

    /// Iterate over the logical neighbors of `node` at `level`, with
    /// pseudonode transparency: a PN is expanded into the real nodes attached
    /// to it, each with composite metric and the gateway prefix of the
    /// PN-to-neighbor link.
    pub fn logical_neighbors(
        &self,
        node: NodeId,
        level: Level,
    ) -> impl Iterator<Item = LogicalNeighbor> + '_ {
        self.graph
            .edges(node)
            .filter(move |e| self.two_way_ok(e.id(), level))
            .flat_map(move |e| {
                let first = e.weight();
                let nbr = e.target();
                if self.graph[nbr].is_pseudonode(level) {
                    Either::Left(
                        self.graph
                            .edges(nbr)
                            .filter(move |e2| self.two_way_ok(e2.id(), level))
                            .filter(move |e2| !self.graph[e2.target()].is_pseudonode(level))
                            .map(move |e2| LogicalNeighbor {
                                node: e2.target(),
                                oif: e.id(),
                                gw: e2.weight().to.prefix.as_ref().map(|p| p.addr),
                                metric: first.metric(level) + e2.weight().metric(level),
                                kind: first.kind.nh_kind(),
                            }),
                    )
                } else {
                    Either::Right(std::iter::once(LogicalNeighbor {
                        node: nbr,
                        oif: e.id(),
                        gw: first.to.prefix.as_ref().map(|p| p.addr),
                        metric: first.metric(level),
                        kind: first.kind.nh_kind(),
                    }))
                }
            })
    }

    /// Iterate over the directly adjacent pseudonodes of `node` at `level`,
    /// with the metric towards them. SPF records pseudonode distances from
    /// these even though pseudonodes never surface in its results.
    pub fn pn_neighbors(
        &self,
        node: NodeId,
        level: Level,
    ) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        self.graph
            .edges(node)
            .filter(move |e| self.two_way_ok(e.id(), level))
            .filter(move |e| self.graph[e.target()].is_pseudonode(level))
            .map(move |e| (e.target(), e.weight().metric(level)))
    }

    /// Iterate over the physical neighbors of `node` at `level`, without
    /// pseudonode transparency. Only two-way adjacencies are yielded.
    pub fn physical_neighbors(
        &self,
        node: NodeId,
        level: Level,
    ) -> impl Iterator<Item = PhysicalNeighbor> + '_ {
        self.graph
            .edges(node)
            .filter(move |e| e.weight().usable(level))
            .filter_map(move |e| {
                let rev = e.weight().reverse?;
                self.graph[rev].usable(level).then_some(PhysicalNeighbor {
                    node: e.target(),
                    out_link: e.id(),
                    in_link: rev,
                })
            })
    }

    /// Whether `link` ends at a pseudonode at `level` (i.e. models a
    /// broadcast LAN).
    pub fn is_broadcast_link(&self, link: LinkId, level: Level) -> bool {
        self.graph[self.link_target(link)].is_pseudonode(level)
    }

    /// Whether `node` is attached to the LAN behind the broadcast link
    /// `link` at `level`.
    pub fn is_broadcast_member(&self, node: NodeId, link: LinkId, level: Level) -> bool {
        let pn = self.link_target(link);
        self.graph
            .edges(node)
            .any(|e| e.target() == pn && self.two_way_ok(e.id(), level))
    }

    // ----- SPRING ------------------------------------------------------

    /// Enable SPRING on `node` with the default SRGB.
    pub fn enable_spring(&mut self, node: NodeId) {
        if self.graph[node].spring.is_none() {
            self.graph[node].spring = Some(Srgb::default());
            self.bump_version();
        }
    }

    /// Disable SPRING on `node`: all prefix-SID bindings of the node are
    /// freed and the SRGB is dropped.
    pub fn disable_spring(&mut self, node: NodeId) {
        if self.graph[node].spring.is_none() {
            return;
        }
        for level in Level::list() {
            for prefix in self.graph[node].prefixes.get_mut(level) {
                prefix.sid = None;
            }
        }
        let out_links: Vec<LinkId> = self.graph.edges(node).map(|e| e.id()).collect();
        for link in out_links {
            if let Some(prefix) = self.graph[link].from.prefix.as_mut() {
                prefix.sid = None;
            }
        }
        self.graph[node].spring = None;
        self.bump_version();
    }

    /// The SRGB of `node`, if SPRING is enabled.
    pub fn srgb(&self, node: NodeId) -> Option<&Srgb> {
        self.graph[node].spring.as_ref()
    }
}
