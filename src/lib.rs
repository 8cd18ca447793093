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

#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # IsisSim
//!
//! This is a simulator for IS-IS-style link-state routing. It does not model
//! adjacency formation or LSP flooding: the topology is built directly on an
//! [`instance::Instance`], and the simulator computes the converged routing
//! state from it, like a router would after the link-state database settled.
//!
//! The core consists of three cooperating subsystems:
//!
//! - **SPF** ([`spf`]): a Dijkstra variant producing, per root and level,
//!   the metric and primary next-hops of every reachable destination,
//!   together with a predecessor database from which every equal-cost path
//!   can be enumerated.
//! - **Protection** ([`lfa`]): Loop-Free Alternates (point-to-point and
//!   broadcast), P-space / extended P-space / Q-space, and Remote LFA
//!   candidates per RFC 5286.
//! - **Segment routing** ([`sr`], [`srgb`]): prefix-SID bindings over
//!   per-node SRGBs, and the conflict-resolution procedure over competing
//!   prefix/SID mappings.
//!
//! The [`route`] module projects SPF results and the prefix store into
//! longest-prefix-match route tables, decorated with MPLS label operations
//! for SPRING-capable routes.
//!
//! ## Example
//!
//! ```
//! use isissim::builder;
//! use isissim::prelude::*;
//!
//! let mut instance = builder::linear_topo();
//! let r0 = instance.node_id("R0").unwrap();
//! let r2 = instance.node_id("R2").unwrap();
//!
//! // R0 -> R1 -> R2, metric 10 each.
//! let run = instance.spf(r0, Level::L1);
//! assert_eq!(run.metric(r2), 20);
//!
//! // Exactly one shortest path.
//! let paths = instance.paths(r0, r2, Level::L1, NhKind::Ipnh);
//! assert_eq!(paths.len(), 1);
//! ```
//!
//! Every operation takes the instance explicitly; tests can hold as many
//! isolated topologies as they like. The instance is single-threaded and
//! cooperative: operations run to completion, and cached SPF results are
//! invalidated through a topology version counter.

pub mod builder;
pub mod formatter;
pub mod instance;
pub mod lfa;
pub mod prelude;
pub mod route;
pub mod spf;
pub mod sr;
pub mod srgb;
pub mod types;

#[cfg(test)]
mod test;
