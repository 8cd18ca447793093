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

//! Convenience re-export of the most used types.

pub use crate::formatter::InstanceFormatter;
pub use crate::instance::{Direction, Instance, LinkSpec, ProtectionType};
pub use crate::lfa::{Lfa, LfaType};
pub use crate::route::RouteTable;
pub use crate::spf::{NextHop, PredEntry, SpfRun};
pub use crate::types::{
    InstanceError, Level, LevelMask, LinkId, NhKind, NodeId, INFINITE_METRIC,
};
