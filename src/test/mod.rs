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

//! Module for testing the crate against the built-in topologies.

mod test_lfa;
mod test_spf;

use crate::instance::Instance;
use crate::types::NodeId;

/// Look up a node id by name; the tests only use names they created.
fn id(instance: &Instance, name: &str) -> NodeId {
    instance
        .node_id(name)
        .unwrap_or_else(|| panic!("node {name} exists"))
}
