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

//! Path enumeration: walk the predecessor database of an SPF run and emit
//! every equal-cost shortest path.
//!
//! The walk is a depth-first traversal of the predecessor DAG. The DAG is
//! acyclic by construction (predecessor edges go from higher metric to
//! strictly lower metric), so the walk always terminates.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::instance::Instance;
use crate::spf::SpfRun;
use crate::types::{Level, LinkId, NhKind, NodeId};

/// One hop of an enumerated path. The final hop (the destination) carries no
/// outgoing interface.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct PathHop {
    /// The node of this hop.
    pub node: NodeId,
    /// Outgoing link towards the next hop; `None` on the destination.
    pub oif: Option<LinkId>,
    /// Gateway address of the *next* hop's interface.
    pub gw: Option<Ipv4Addr>,
}

/// A complete equal-cost path, ordered from root to destination.
pub type Path = Vec<PathHop>;

impl Instance {
    /// Enumerate every equal-cost shortest path from `root` to `dst`,
    /// calling `visitor` with each complete path as a read-only snapshot.
    /// Unreachable destinations yield no paths.
    pub fn enumerate_paths<F>(
        &mut self,
        root: NodeId,
        dst: NodeId,
        level: Level,
        kind: NhKind,
        mut visitor: F,
    ) where
        F: FnMut(&[PathHop]),
    {
        let run = self.spf(root, level);
        if run.result(dst).is_none() {
            return;
        }
        // The stack grows from the destination towards the root; paths are
        // emitted reversed.
        let mut stack: Vec<PathHop> = vec![PathHop {
            node: dst,
            oif: None,
            gw: None,
        }];
        walk(run, dst, kind, &mut stack, &mut visitor);
    }

    /// Collect every equal-cost shortest path from `root` to `dst`.
    pub fn paths(&mut self, root: NodeId, dst: NodeId, level: Level, kind: NhKind) -> Vec<Path> {
        let mut all = Vec::new();
        self.enumerate_paths(root, dst, level, kind, |path| all.push(path.to_vec()));
        all
    }
}

fn walk<F>(run: &SpfRun, frontier: NodeId, kind: NhKind, stack: &mut Vec<PathHop>, visitor: &mut F)
where
    F: FnMut(&[PathHop]),
{
    let result = run
        .result(frontier)
        .expect("predecessors always point at recorded results");
    for pred in result.preds.get(kind) {
        stack.push(PathHop {
            node: pred.node,
            oif: Some(pred.oif),
            gw: pred.gw,
        });
        if pred.node == run.root {
            let path: Path = stack.iter().rev().copied().collect();
            visitor(&path);
        } else {
            walk(run, pred.node, kind, stack, visitor);
        }
        stack.pop();
    }
}
