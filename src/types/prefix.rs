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

//! IPv4 prefix model.
//!
//! A prefix is an `(address, mask-length)` pair. Interface addresses keep
//! their host part (e.g. `10.1.1.2/24`); two prefixes compare equal iff their
//! *canonical* forms (the address with the mask applied) and mask lengths
//! match. [`PrefixKey`] is that canonical form and is the key used by all
//! prefix lists and route tables.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::sr::PrefixSid;

/// Canonical lookup key of a prefix: the network address after applying the
/// mask, together with the mask length.
pub type PrefixKey = Ipv4Net;

/// Per-prefix flags carried in the IS-IS IP reachability advertisement.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PrefixFlags(u8);

impl PrefixFlags {
    /// The prefix was leaked from another level (RFC 5302 up/down bit).
    pub const DOWN: PrefixFlags = PrefixFlags(0b001);
    /// The prefix was redistributed from another protocol.
    pub const EXTERNAL: PrefixFlags = PrefixFlags(0b010);
    /// External metric type (type 2) when set.
    pub const EXTERNAL_METRIC_TYPE: PrefixFlags = PrefixFlags(0b100);

    /// Checks whether all flags in `other` are set.
    pub const fn contains(&self, other: PrefixFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set all flags in `other`.
    pub fn insert(&mut self, other: PrefixFlags) {
        self.0 |= other.0;
    }

    /// Clear all flags in `other`.
    pub fn remove(&mut self, other: PrefixFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for PrefixFlags {
    type Output = PrefixFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        PrefixFlags(self.0 | rhs.0)
    }
}

impl std::fmt::Debug for PrefixFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        if self.contains(PrefixFlags::DOWN) {
            list.entry(&"down");
        }
        if self.contains(PrefixFlags::EXTERNAL) {
            list.entry(&"external");
        }
        if self.contains(PrefixFlags::EXTERNAL_METRIC_TYPE) {
            list.entry(&"metric-type-2");
        }
        list.finish()
    }
}

/// An IPv4 prefix attached to a node (either a local prefix or an interface
/// address). The prefix owns its prefix-SID binding, if any: freeing the
/// prefix frees the SID with it.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Prefix {
    /// The (possibly host) address of the prefix.
    pub addr: Ipv4Addr,
    /// Mask length in `[0, 32]`.
    pub mask: u8,
    /// Advertised metric of the prefix, added to the SPF metric of the
    /// hosting node during route computation.
    pub metric: u32,
    /// Advertisement flags.
    pub flags: PrefixFlags,
    /// The prefix-SID bound to this prefix, at most one.
    pub sid: Option<PrefixSid>,
}

impl Prefix {
    /// Create a new prefix with the given metric and no flags.
    pub fn new(addr: Ipv4Addr, mask: u8, metric: u32) -> Self {
        Self {
            addr,
            mask,
            metric,
            flags: PrefixFlags::default(),
            sid: None,
        }
    }

    /// The canonical key of this prefix (address with the mask applied).
    pub fn key(&self) -> PrefixKey {
        canonical(self.addr, self.mask)
    }

    /// Checks whether this prefix matches the canonical `key`.
    pub fn has_key(&self, key: &PrefixKey) -> bool {
        self.key() == *key
    }

    /// Whether the prefix carries an active prefix-SID, i.e. it survived
    /// conflict resolution.
    pub fn sr_active(&self) -> bool {
        self.sid.as_ref().is_some_and(|sid| sid.active)
    }
}

impl std::fmt::Display for Prefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

/// Apply `mask` to `addr` and return the canonical prefix key.
///
/// # Panics
///
/// Panics if `mask > 32`; mask lengths are validated at the API boundary.
pub(crate) fn canonical(addr: Ipv4Addr, mask: u8) -> PrefixKey {
    Ipv4Net::new(addr, mask)
        .expect("mask length must be in [0, 32]")
        .trunc()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn canonicalization() {
        let a = Prefix::new("10.1.1.1".parse().unwrap(), 24, 0);
        let b = Prefix::new("10.1.1.200".parse().unwrap(), 24, 0);
        let c = Prefix::new("10.1.1.1".parse().unwrap(), 30, 0);
        assert_eq!(a.key(), "10.1.1.0/24".parse().unwrap());
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert!(a.has_key(&b.key()));
    }

    #[test]
    fn flags() {
        let mut flags = PrefixFlags::default();
        assert!(!flags.contains(PrefixFlags::DOWN));
        flags.insert(PrefixFlags::DOWN | PrefixFlags::EXTERNAL);
        assert!(flags.contains(PrefixFlags::DOWN));
        assert!(flags.contains(PrefixFlags::EXTERNAL));
        flags.remove(PrefixFlags::DOWN);
        assert!(!flags.contains(PrefixFlags::DOWN));
        assert!(flags.contains(PrefixFlags::EXTERNAL));
    }
}
