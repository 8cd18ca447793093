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

//! Module containing all type definitions

use ipnet::Ipv4Net;
use petgraph::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) mod prefix;
pub use prefix::{Prefix, PrefixFlags, PrefixKey};

pub(crate) type IndexType = u32;

/// Node identification (and index into the topology graph)
pub type NodeId = NodeIndex<IndexType>;

/// Link identification (and index into the topology graph). Each direction of
/// a bidirectional adjacency is its own link.
pub type LinkId = EdgeIndex<IndexType>;

/// The metric value representing "unreachable". All relaxation arithmetic is
/// performed in `u64` so that sums involving [`INFINITE_METRIC`] cannot wrap.
pub const INFINITE_METRIC: u32 = 0xFE00_0000;

/// Maximum number of interfaces a single node can anchor.
pub const MAX_NODE_IFACES: usize = 16;

/// IS-IS routing level.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Level {
    /// Level-1 (intra-area)
    L1,
    /// Level-2 (backbone)
    L2,
}

impl Level {
    /// Both levels, in order. Operations that take a [`LevelMask`] iterate
    /// this list.
    pub const fn list() -> [Level; 2] {
        [Level::L1, Level::L2]
    }

    pub(crate) const fn idx(&self) -> usize {
        match self {
            Level::L1 => 0,
            Level::L2 => 1,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::L1 => f.write_str("L1"),
            Level::L2 => f.write_str("L2"),
        }
    }
}

/// Set of levels a link (or operation) participates in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LevelMask(u8);

impl LevelMask {
    /// Level-1 only.
    pub const L1: LevelMask = LevelMask(0b01);
    /// Level-2 only.
    pub const L2: LevelMask = LevelMask(0b10);
    /// Both levels.
    pub const L12: LevelMask = LevelMask(0b11);

    /// Checks whether `level` is part of the mask.
    pub const fn contains(&self, level: Level) -> bool {
        self.0 & (1 << level.idx()) != 0
    }

    /// Iterate over the levels present in the mask.
    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        Level::list().into_iter().filter(|l| self.contains(*l))
    }
}

impl From<Level> for LevelMask {
    fn from(level: Level) -> Self {
        match level {
            Level::L1 => LevelMask::L1,
            Level::L2 => LevelMask::L2,
        }
    }
}

impl std::fmt::Debug for LevelMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            LevelMask::L1 => f.write_str("L1"),
            LevelMask::L2 => f.write_str("L2"),
            LevelMask::L12 => f.write_str("L12"),
            _ => f.write_str("none"),
        }
    }
}

/// Container storing one `T` per routing level.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Levels<T> {
    /// Level-1 value
    pub l1: T,
    /// Level-2 value
    pub l2: T,
}

impl<T> Levels<T> {
    /// Get a reference to the value at `level`.
    pub fn get(&self, level: Level) -> &T {
        match level {
            Level::L1 => &self.l1,
            Level::L2 => &self.l2,
        }
    }

    /// Get a mutable reference to the value at `level`.
    pub fn get_mut(&mut self, level: Level) -> &mut T {
        match level {
            Level::L1 => &mut self.l1,
            Level::L2 => &mut self.l2,
        }
    }
}

/// Next-hop kind: plain IP adjacency or LSP (forwarding) adjacency. Routes
/// and SPF results carry parallel lists per kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum NhKind {
    /// IP next-hop, learned over a regular adjacency
    Ipnh,
    /// LSP next-hop, learned over a unidirectional forwarding adjacency
    Lspnh,
}

impl NhKind {
    /// Both kinds, in order.
    pub const fn list() -> [NhKind; 2] {
        [NhKind::Ipnh, NhKind::Lspnh]
    }
}

/// Container storing one `T` per next-hop kind.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Kinds<T> {
    /// IP next-hop value
    pub ip: T,
    /// LSP next-hop value
    pub lsp: T,
}

impl<T> Kinds<T> {
    /// Get a reference to the value of `kind`.
    pub fn get(&self, kind: NhKind) -> &T {
        match kind {
            NhKind::Ipnh => &self.ip,
            NhKind::Lspnh => &self.lsp,
        }
    }

    /// Get a mutable reference to the value of `kind`.
    pub fn get_mut(&mut self, kind: NhKind) -> &mut T {
        match kind {
            NhKind::Ipnh => &mut self.ip,
            NhKind::Lspnh => &mut self.lsp,
        }
    }
}

/// IS-IS area tag of a node.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Area(pub(crate) String);

impl From<&str> for Area {
    fn from(s: &str) -> Self {
        Area(s.to_string())
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instance errors.
///
/// These cover user configuration mistakes only. Broken internal invariants
/// (duplicate predecessors, a result requested for a node the SPF never
/// visited) are programming errors and panic instead. Expected negative
/// outcomes (no LFA, no SR tunnel) are empty results, not errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InstanceError {
    /// The node name is not known to the instance.
    #[error("Node was not found in the instance: {0}")]
    NodeNotFound(String),
    /// The node has no interface with that name.
    #[error("Node {0} has no interface named {1}")]
    InterfaceNotFound(String, String),
    /// All interface slots of the node are taken.
    #[error("All {MAX_NODE_IFACES} interface slots of node {0} are in use")]
    InterfaceSlotsExhausted(String),
    /// The link does not participate in the given level.
    #[error("Interface {0} does not participate in {1}")]
    LevelNotEnabled(String, Level),
    /// The prefix is already present in the target prefix list.
    #[error("Node {1}: prefix {0} is already attached at {2}")]
    DuplicatePrefix(Ipv4Net, String, Level),
    /// The prefix was not found on the node at the given level.
    #[error("Node {1}: prefix {0} does not exist at {2}")]
    PrefixNotFound(Ipv4Net, String, Level),
    /// Segment routing operation on a node without SPRING enabled.
    #[error("SPRING is not enabled on node {0}")]
    SpringDisabled(String),
}
