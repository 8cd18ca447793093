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

//! Human-readable rendering of identifiers against an [`Instance`]. Ids are
//! bare indices; formatting them requires the instance that owns them.

use itertools::Itertools;

use crate::instance::Instance;
use crate::lfa::LfaPair;
use crate::spf::{PathHop, PredEntry};
use crate::types::{LinkId, NodeId};

/// Render `self` using the names stored in the instance.
pub trait InstanceFormatter {
    /// Return the formatted string.
    fn fmt(&self, instance: &Instance) -> String;
}

impl InstanceFormatter for NodeId {
    fn fmt(&self, instance: &Instance) -> String {
        instance.node(*self).name.clone()
    }
}

impl InstanceFormatter for LinkId {
    fn fmt(&self, instance: &Instance) -> String {
        let link = instance.link(*self);
        format!(
            "{}:{}",
            instance.node(instance.link_source(*self)).name,
            link.from.name
        )
    }
}

impl InstanceFormatter for PredEntry {
    fn fmt(&self, instance: &Instance) -> String {
        let gw = self.gw.map(|a| a.to_string()).unwrap_or_default();
        format!(
            "{}({}) gw {gw}",
            self.node.fmt(instance),
            instance.link(self.oif).from.name
        )
    }
}

impl InstanceFormatter for [PathHop] {
    fn fmt(&self, instance: &Instance) -> String {
        self.iter()
            .map(|hop| match hop.oif {
                Some(oif) => format!(
                    "{}({})",
                    hop.node.fmt(instance),
                    instance.link(oif).from.name
                ),
                None => hop.node.fmt(instance),
            })
            .join(" -> ")
    }
}

impl InstanceFormatter for LfaPair {
    fn fmt(&self, instance: &Instance) -> String {
        format!(
            "LFA = {}, OIF = {}, Dest = {}, type = {:?}",
            self.lfa.fmt(instance),
            instance.link(self.oif).from.name,
            self.dest.fmt(instance),
            self.kind
        )
    }
}

impl<T: InstanceFormatter> InstanceFormatter for Vec<T> {
    fn fmt(&self, instance: &Instance) -> String {
        self.iter().map(|x| x.fmt(instance)).join(", ")
    }
}
