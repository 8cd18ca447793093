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

//! The segment-routing overlay: prefix-SID bindings, the conflict resolver
//! over competing prefix/SID mappings, and SR tunnel enumeration.
//!
//! A prefix owns at most one prefix-SID. Binding mutations report whether
//! they materially changed anything; a `true` return means conflict
//! resolution should run again. The resolver only ever *deactivates*
//! bindings: a losing prefix stays a regular IP prefix and keeps its SID
//! value, but releases its SRGB index until a later update reactivates it.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::route::RouteTable;
use crate::srgb::Label;
use crate::types::{prefix::canonical, InstanceError, Level, NhKind, NodeId, PrefixKey};

/// Default preference of a prefix-SID advertised by an IGP node.
pub const IGP_DEFAULT_SID_PREFERENCE: u8 = 192;
/// Default preference of a mapping advertised by a mapping server.
pub const SRMS_DEFAULT_SID_PREFERENCE: u8 = 128;

/// SPF algorithm carried by a prefix-SID.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// Plain shortest-path-first (value 0).
    #[default]
    Spf,
    /// Strict shortest-path-first (value 1).
    StrictSpf,
}

/// Prefix-SID flags (bit positions per IS-IS SR: L=2, V=3, E=4, P=5, N=6,
/// R=7).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PrefixSidFlags(u8);

impl PrefixSidFlags {
    /// Local significance.
    pub const L: PrefixSidFlags = PrefixSidFlags(1 << 2);
    /// The SID carries an absolute value instead of an index.
    pub const V: PrefixSidFlags = PrefixSidFlags(1 << 3);
    /// Explicit-null.
    pub const E: PrefixSidFlags = PrefixSidFlags(1 << 4);
    /// No penultimate-hop-popping.
    pub const P: PrefixSidFlags = PrefixSidFlags(1 << 5);
    /// Node SID (a /32 local prefix).
    pub const N: PrefixSidFlags = PrefixSidFlags(1 << 6);
    /// Re-advertisement (leaked or redistributed).
    pub const R: PrefixSidFlags = PrefixSidFlags(1 << 7);

    /// Checks whether all flags in `other` are set.
    pub const fn contains(&self, other: PrefixSidFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set or clear the flags in `other`.
    pub fn set(&mut self, other: PrefixSidFlags, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl std::fmt::Debug for PrefixSidFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (flag, c) in [
            (PrefixSidFlags::R, 'R'),
            (PrefixSidFlags::N, 'N'),
            (PrefixSidFlags::P, 'P'),
            (PrefixSidFlags::E, 'E'),
            (PrefixSidFlags::V, 'V'),
            (PrefixSidFlags::L, 'L'),
        ] {
            if self.contains(flag) {
                write!(f, "{c}")?;
            } else {
                write!(f, "-")?;
            }
        }
        Ok(())
    }
}

/// A prefix-SID binding, owned by its prefix.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PrefixSid {
    /// The SID: an index into the SRGB, or a 20-bit label when the `V` and
    /// `L` flags are set.
    pub value: u32,
    /// The algorithm the SID participates in.
    pub algorithm: Algorithm,
    /// Advertisement flags.
    pub flags: PrefixSidFlags,
    /// Outcome of conflict resolution. Only active bindings hold their SRGB
    /// index.
    pub active: bool,
}

impl PrefixSid {
    /// A fresh active SPF binding with no flags.
    pub fn new(value: u32) -> Self {
        Self {
            value,
            algorithm: Algorithm::Spf,
            flags: PrefixSidFlags::default(),
            active: true,
        }
    }
}

/// A mapping entry derived from a prefix-SID, the unit the conflict resolver
/// works on. Single-prefix entries have `range == 1`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Preference; higher wins.
    pub preference: u8,
    /// First prefix of the range, as a 32-bit integer.
    pub prefix_start: u32,
    /// Last prefix of the range.
    pub prefix_end: u32,
    /// Prefix length.
    pub prefix_len: u8,
    /// 32 for IPv4, 128 for IPv6 (the address family tag).
    pub max_prefix_len: u8,
    /// First SID of the range.
    pub sid_start: u32,
    /// Last SID of the range.
    pub sid_end: u32,
    /// Number of mappings in the range; 1 for IGP-advertised SIDs.
    pub range: u32,
    /// Topology: 0 for IPv4, 2 for IPv6.
    pub topology: u8,
    /// The SPF algorithm.
    pub algorithm: Algorithm,
}

impl MappingEntry {
    fn new(key: &PrefixKey, sid: &PrefixSid) -> Self {
        let prefix = u32::from(key.addr());
        Self {
            preference: IGP_DEFAULT_SID_PREFERENCE,
            prefix_start: prefix,
            prefix_end: prefix,
            prefix_len: key.prefix_len(),
            max_prefix_len: 32,
            sid_start: sid.value,
            sid_end: sid.value,
            range: 1,
            topology: 0,
            algorithm: sid.algorithm,
        }
    }

    /// Two prefixes conflict when their entries agree on topology,
    /// algorithm, address family and prefix length, describe the same
    /// prefix, but carry different SIDs.
    pub fn prefix_conflict(&self, other: &Self) -> bool {
        self.same_family(other)
            && self.prefix_len == other.prefix_len
            && self.prefix_start == other.prefix_start
            && self.prefix_end == other.prefix_end
            && self.sid_start != other.sid_start
    }

    /// Two entries have a SID conflict when they agree on topology,
    /// algorithm and address family, overlap on SID ranges, but describe
    /// different prefixes.
    pub fn sid_conflict(&self, other: &Self) -> bool {
        self.same_family(other)
            && self.sid_start <= other.sid_end
            && other.sid_start <= self.sid_end
            && (self.prefix_start != other.prefix_start || self.prefix_len != other.prefix_len)
    }

    fn same_family(&self, other: &Self) -> bool {
        self.topology == other.topology
            && self.algorithm == other.algorithm
            && self.max_prefix_len == other.max_prefix_len
    }

    /// The resolution order: higher preference, then smaller prefix length,
    /// then larger prefix value, then larger SID start (larger tuple wins,
    /// per RFC 8660).
    pub fn wins_over(&self, other: &Self) -> bool {
        let rank = |e: &Self| {
            (
                e.preference,
                std::cmp::Reverse(e.prefix_len),
                e.prefix_start,
                e.sid_start,
            )
        };
        rank(self) > rank(other)
    }
}

/// One hop of an SR tunnel: the router and the label it expects for the
/// tunnel's prefix-SID.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SrHop {
    /// The router.
    pub node: NodeId,
    /// `node`'s SRGB label for the tunnel's SID index.
    pub label: Label,
}

/// The label-switched paths towards the winning host of a prefix.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SrTunnel {
    /// The prefix the tunnel transports.
    pub prefix: PrefixKey,
    /// SID index of the prefix.
    pub sid_index: u32,
    /// Every equal-cost label-switched path, root first.
    pub paths: Vec<Vec<SrHop>>,
}

impl Instance {
    fn require_spring(&self, node: NodeId) -> Result<(), InstanceError> {
        if self.node(node).spring_enabled() {
            Ok(())
        } else {
            Err(InstanceError::SpringDisabled(self.node(node).name.clone()))
        }
    }

    /// Create or update the prefix-SID binding of the prefix
    /// `addr/mask` of `node` at `level`. Returns `true` when the binding
    /// materially changed, i.e. when conflict resolution should run.
    pub fn update_prefix_sid(
        &mut self,
        node: NodeId,
        addr: Ipv4Addr,
        mask: u8,
        value: u32,
        level: Level,
    ) -> Result<bool, InstanceError> {
        self.require_spring(node)?;
        let key = canonical(addr, mask);
        let old = self
            .find_prefix(node, &key, level)
            .ok_or_else(|| InstanceError::PrefixNotFound(key, self.node(node).name.clone(), level))?
            .sid
            .as_ref()
            .map(|sid| sid.value);

        if old == Some(value) {
            return Ok(false);
        }
        let in_use = self
            .node(node)
            .spring
            .as_ref()
            .expect("checked above")
            .is_used(value);
        if in_use {
            log::warn!(
                "node {}: SID index {value} is already in use, conflict detected",
                self.node(node).name
            );
        }
        let srgb = self.node_mut(node).spring.as_mut().expect("checked above");
        srgb.mark_used(value);
        if let Some(old) = old {
            srgb.mark_unused(old);
        }
        let prefix = self
            .find_prefix_mut(node, &key, level)
            .expect("found right above");
        match prefix.sid.as_mut() {
            Some(sid) => {
                sid.value = value;
                sid.active = true;
            }
            None => prefix.sid = Some(PrefixSid::new(value)),
        }
        Ok(true)
    }

    /// Break the prefix-SID binding of `addr/mask` of `node` at `level` and
    /// release its SRGB index. Returns `true` when a binding existed.
    pub fn free_prefix_sid(
        &mut self,
        node: NodeId,
        addr: Ipv4Addr,
        mask: u8,
        level: Level,
    ) -> Result<bool, InstanceError> {
        self.require_spring(node)?;
        let key = canonical(addr, mask);
        let Some(prefix) = self.find_prefix(node, &key, level) else {
            return Err(InstanceError::PrefixNotFound(
                key,
                self.node(node).name.clone(),
                level,
            ));
        };
        let Some(value) = prefix.sid.as_ref().map(|sid| sid.value) else {
            return Ok(false);
        };
        self.node_mut(node)
            .spring
            .as_mut()
            .expect("checked above")
            .mark_unused(value);
        self.find_prefix_mut(node, &key, level)
            .expect("found right above")
            .sid = None;
        Ok(true)
    }

    /// Assign the node-SID: bind `value` to the router-id host prefix at
    /// both levels. Returns `true` when conflict resolution is triggered.
    pub fn set_node_sid(&mut self, node: NodeId, value: u32) -> Result<bool, InstanceError> {
        self.require_spring(node)?;
        let router_id = self.node(node).router_id;
        let mut trigger = false;
        for level in Level::list() {
            trigger |= self.update_prefix_sid(node, router_id, 32, value, level)?;
        }
        Ok(trigger)
    }

    /// Remove the node-SID binding from both levels.
    pub fn unset_node_sid(&mut self, node: NodeId) -> Result<bool, InstanceError> {
        self.require_spring(node)?;
        let router_id = self.node(node).router_id;
        let mut trigger = false;
        for level in Level::list() {
            trigger |= self.free_prefix_sid(node, router_id, 32, level)?;
        }
        Ok(trigger)
    }

    /// Assign a prefix-SID to the interface address of `iface` at every
    /// level the link participates in.
    pub fn set_interface_prefix_sid(
        &mut self,
        node: NodeId,
        iface: &str,
        value: u32,
    ) -> Result<bool, InstanceError> {
        self.require_spring(node)?;
        let link = self.find_link(node, iface)?;
        let Some((addr, mask)) = self.link(link).from.prefix.as_ref().map(|p| (p.addr, p.mask))
        else {
            return Ok(false);
        };
        let Some(level) = self.link(link).levels.iter().next() else {
            return Ok(false);
        };
        self.update_prefix_sid(node, addr, mask, value, level)
    }

    /// Remove the prefix-SID of the interface address of `iface`.
    pub fn unset_interface_prefix_sid(
        &mut self,
        node: NodeId,
        iface: &str,
    ) -> Result<bool, InstanceError> {
        self.require_spring(node)?;
        let link = self.find_link(node, iface)?;
        let Some((addr, mask)) = self.link(link).from.prefix.as_ref().map(|p| (p.addr, p.mask))
        else {
            return Ok(false);
        };
        let Some(level) = self.link(link).levels.iter().next() else {
            return Ok(false);
        };
        self.free_prefix_sid(node, addr, mask, level)
    }

    /// Search the prefixes of `node` at `level` for an active binding with
    /// the given SID value.
    pub fn find_prefix_by_sid(
        &self,
        node: NodeId,
        level: Level,
        value: u32,
    ) -> Option<&crate::types::Prefix> {
        self.node_prefixes(node, level)
            .find(|p| p.sid.as_ref().is_some_and(|s| s.active && s.value == value))
    }

    /// Run conflict resolution over the global prefix/SID cross-product at
    /// `level`: first prefix conflicts (the same prefix bound to different
    /// SIDs), then SID conflicts (overlapping SIDs bound to different
    /// prefixes). Losers are marked SR-inactive and release their SRGB
    /// index; winners are untouched. Running the resolver twice without an
    /// intervening mutation is a no-op.
    ///
    /// Returns the bindings deactivated by this run.
    pub fn resolve_sr_conflicts(&mut self, level: Level) -> Vec<(NodeId, PrefixKey)> {
        let mut entries: Vec<(NodeId, PrefixKey, MappingEntry)> = Vec::new();
        for node in self.nodes().collect::<Vec<_>>() {
            for prefix in self.node_prefixes(node, level) {
                if let Some(sid) = prefix.sid.as_ref().filter(|sid| sid.active) {
                    entries.push((node, prefix.key(), MappingEntry::new(&prefix.key(), sid)));
                }
            }
        }

        let mut losers: BTreeSet<(NodeId, PrefixKey)> = BTreeSet::new();

        // Pass 1: prefix conflicts.
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (node_a, key_a, a) = &entries[i];
                let (node_b, key_b, b) = &entries[j];
                if a.prefix_conflict(b) {
                    let (lnode, lkey) = if a.wins_over(b) {
                        (*node_b, *key_b)
                    } else {
                        (*node_a, *key_a)
                    };
                    log::warn!(
                        "prefix conflict at {level}: {key_a} (SID {}) vs {key_b} (SID {})",
                        a.sid_start,
                        b.sid_start
                    );
                    losers.insert((lnode, lkey));
                }
            }
        }

        // Pass 2: SID conflicts among the survivors.
        let survivors: Vec<_> = entries
            .iter()
            .filter(|(node, key, _)| !losers.contains(&(*node, *key)))
            .cloned()
            .collect();
        for i in 0..survivors.len() {
            for j in (i + 1)..survivors.len() {
                let (node_a, key_a, a) = &survivors[i];
                let (node_b, key_b, b) = &survivors[j];
                if a.sid_conflict(b) {
                    let (lnode, lkey) = if a.wins_over(b) {
                        (*node_b, *key_b)
                    } else {
                        (*node_a, *key_a)
                    };
                    log::warn!(
                        "SID conflict at {level}: {key_a} (SID {}) vs {key_b} (SID {})",
                        a.sid_start,
                        b.sid_start
                    );
                    losers.insert((lnode, lkey));
                }
            }
        }

        for (node, key) in &losers {
            let Some(prefix) = self.find_prefix_mut(*node, key, level) else {
                continue;
            };
            let Some(sid) = prefix.sid.as_mut() else {
                continue;
            };
            sid.active = false;
            let value = sid.value;
            if let Some(srgb) = self.node_mut(*node).spring.as_mut() {
                srgb.mark_unused(value);
            }
        }

        losers.into_iter().collect()
    }

    /// Enumerate the SR tunnels from `root` towards the longest-prefix-match
    /// route of `addr`. `None` when no SPRING-capable route exists; hops
    /// without SPRING enabled break their path.
    pub fn sr_tunnels(&mut self, root: NodeId, addr: Ipv4Addr) -> Option<SrTunnel> {
        let table = RouteTable::compute(self, root);
        let route = table.lookup(addr)?;
        let sr = route.sr.as_ref()?;
        let sid_index = sr.sid_index;
        let prefix = route.key;
        let level = route.level;
        let hosts: Vec<NodeId> = route
            .like_prefixes
            .iter()
            .filter(|h| h.preference == route.preference)
            .map(|h| h.node)
            .collect();

        let mut paths = Vec::new();
        for host in hosts {
            for path in self.paths(root, host, level, NhKind::Ipnh) {
                let hops: Vec<SrHop> = path
                    .iter()
                    .filter_map(|hop| {
                        self.node(hop.node).spring.as_ref().map(|srgb| SrHop {
                            node: hop.node,
                            label: srgb.label_from_index(sid_index),
                        })
                    })
                    .collect();
                if hops.len() == path.len() {
                    paths.push(hops);
                }
            }
        }
        Some(SrTunnel {
            prefix,
            sid_index,
            paths,
        })
    }
}
