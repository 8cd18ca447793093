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

//! Canned topologies for tests and experimentation.

use crate::instance::{Direction, Instance, LinkSpec};
use crate::types::{Level, LevelMask};

fn link(
    instance: &mut Instance,
    a: &str,
    b: &str,
    spec: LinkSpec,
) {
    let a = instance.node_id(a).expect("node was created above");
    let b = instance.node_id(b).expect("node was created above");
    instance
        .insert_link(a, b, spec, Direction::Bidirectional)
        .expect("interface slots are available");
}

/// A three-node chain, all metrics 10, both levels:
///
/// ```text
/// +------+               +------+                +-------+
/// |      |0/0    10.1.1.2|      |0/2     20.1.1.2|       |
/// |  R0  +------L12------+  R1  +-----L12--------+  R2   |
/// |      |10.1.1.1    0/1|      |20.1.1.1    0/3 |       |
/// +------+               +------+                +-------+
/// ```
pub fn linear_topo() -> Instance {
    let mut instance = Instance::new();
    let r0 = instance.add_node("R0", "area1");
    instance.add_node("R1", "area1");
    instance.add_node("R2", "area1");

    link(
        &mut instance,
        "R0",
        "R1",
        LinkSpec::new("eth0/0", "eth0/1", 10, LevelMask::L12)
            .from_addr("10.1.1.1/24")
            .to_addr("10.1.1.2/24"),
    );
    link(
        &mut instance,
        "R1",
        "R2",
        LinkSpec::new("eth0/2", "eth0/3", 10, LevelMask::L12)
            .from_addr("20.1.1.1/24")
            .to_addr("20.1.1.2/24"),
    );
    instance.set_root(r0);
    instance
}

/// A six-node ring, all metrics 10, level 1:
///
/// ```text
///     S/-----------\E
///     /             \
///    /               D
///   A               /
///    \             /
///   B \-----------/C
/// ```
pub fn ring_topo() -> Instance {
    let mut instance = Instance::new();
    let s = instance.add_node("S", "area1");
    for name in ["E", "D", "C", "B", "A"] {
        instance.add_node(name, "area1");
    }

    let hops = [
        ("S", "E", "eth0/0", "eth0/1", "10.1.1.1/30", "10.1.1.2/30"),
        ("E", "D", "eth0/2", "eth0/3", "20.1.1.1/30", "20.1.1.2/30"),
        ("D", "C", "eth0/4", "eth0/5", "30.1.1.1/30", "30.1.1.2/30"),
        ("C", "B", "eth0/6", "eth0/7", "40.1.1.1/30", "40.1.1.2/30"),
        ("B", "A", "eth0/8", "eth0/9", "50.1.1.1/30", "50.1.1.2/30"),
        ("A", "S", "eth0/10", "eth0/11", "60.1.1.1/30", "60.1.1.2/30"),
    ];
    for (a, b, ia, ib, pa, pb) in hops {
        link(
            &mut instance,
            a,
            b,
            LinkSpec::new(ia, ib, 10, LevelMask::L1)
                .from_addr(pa)
                .to_addr(pb),
        );
    }
    instance.set_root(s);
    instance
}

/// The four-area test topology: R0..R2 in area1 (L1), R3/R4 in area2, R5/R6
/// in area3, tied together over L2 links R0-R3, R3-R4 (L12), R4-R5 and
/// R2-R5. R1 and R3 host additional local prefixes.
pub fn multi_area_topo() -> Instance {
    let mut instance = Instance::new();
    let r0 = instance.add_node("R0", "area1");
    instance.add_node("R1", "area1");
    instance.add_node("R2", "area1");
    instance.add_node("R3", "area2");
    instance.add_node("R4", "area2");
    instance.add_node("R5", "area3");
    instance.add_node("R6", "area3");

    let links = [
        ("R0", "R1", "eth0/0", "eth0/0", "10.1.1.1/24", "10.1.1.2/24", LevelMask::L1),
        ("R0", "R2", "eth0/1", "eth0/0", "11.1.1.1/24", "11.1.1.2/24", LevelMask::L1),
        ("R1", "R2", "eth0/1", "eth0/1", "12.1.1.1/24", "12.1.1.2/24", LevelMask::L1),
        ("R0", "R3", "eth0/2", "eth0/2", "14.1.1.1/24", "14.1.1.2/24", LevelMask::L2),
        ("R3", "R4", "eth0/1", "eth0/1", "15.1.1.1/24", "15.1.1.2/24", LevelMask::L12),
        ("R4", "R5", "eth0/2", "eth0/1", "16.1.1.1/24", "16.1.1.2/24", LevelMask::L2),
        ("R5", "R6", "eth0/0", "eth0/0", "17.1.1.1/24", "17.1.1.2/24", LevelMask::L1),
        ("R2", "R5", "eth0/2", "eth0/2", "20.1.1.1/24", "20.1.1.2/24", LevelMask::L2),
    ];
    for (a, b, ia, ib, pa, pb, levels) in links {
        link(
            &mut instance,
            a,
            b,
            LinkSpec::new(ia, ib, 10, levels).from_addr(pa).to_addr(pb),
        );
    }

    let r1 = instance.node_id("R1").expect("created above");
    let r3 = instance.node_id("R3").expect("created above");
    instance
        .attach_prefix(r1, "100.1.1.1".parse().unwrap(), 24, Level::L1, 0)
        .expect("prefix is new");
    instance
        .attach_prefix(r3, "101.1.1.1".parse().unwrap(), 24, Level::L2, 0)
        .expect("prefix is new");
    instance
        .attach_prefix(r3, "102.1.1.1".parse().unwrap(), 24, Level::L2, 10)
        .expect("prefix is new");

    instance.set_root(r0);
    instance
}

/// The Cisco remote-LFA example topology, with R5 a pseudonode (broadcast
/// LAN) connecting R1, R4 and R6 at level 1:
///
/// ```text
///        R1 ----------+
///        |            |
///        R2          R5 (PN) --- R6
///        |            |
///        R3 --------- R4
/// ```
pub fn cisco_example_topo() -> Instance {
    let mut instance = Instance::new();
    let r1 = instance.add_node("R1", "area1");
    for name in ["R2", "R3", "R4", "R5", "R6"] {
        instance.add_node(name, "area1");
    }

    link(
        &mut instance,
        "R1",
        "R2",
        LinkSpec::new("eth0/0", "eth0/1", 10, LevelMask::L1)
            .from_addr("10.1.1.1/30")
            .to_addr("10.1.1.2/30"),
    );
    link(
        &mut instance,
        "R2",
        "R3",
        LinkSpec::new("eth0/2", "eth0/3", 10, LevelMask::L1)
            .from_addr("20.1.1.1/30")
            .to_addr("20.1.1.2/30"),
    );
    link(
        &mut instance,
        "R3",
        "R4",
        LinkSpec::new("eth0/4", "eth0/5", 10, LevelMask::L1)
            .from_addr("30.1.1.1/30")
            .to_addr("30.1.1.2/30"),
    );
    link(
        &mut instance,
        "R4",
        "R5",
        LinkSpec::new("eth0/6", "eth0/7", 10, LevelMask::L1).from_addr("50.1.1.3/24"),
    );
    link(
        &mut instance,
        "R5",
        "R1",
        LinkSpec::new("eth0/8", "eth0/9", 10, LevelMask::L1).to_addr("50.1.1.1/24"),
    );
    link(
        &mut instance,
        "R5",
        "R6",
        LinkSpec::new("eth0/10", "eth0/11", 10, LevelMask::L1).to_addr("50.1.1.2/24"),
    );

    let r5 = instance.node_id("R5").expect("created above");
    instance.mark_pseudonode(r5, Level::L1);
    instance.set_root(r1);
    instance
}
