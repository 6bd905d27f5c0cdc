// This file contains some LastGraph files for Gapwalk's unit tests, along with a small builder for
// making them.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::graph::Graph;
use crate::misc::reverse_complement;


pub fn random_seq(length: usize, seed: u64) -> String {
    let bases = ['A', 'C', 'G', 'T'];
    let mut rng = StdRng::seed_from_u64(seed);
    (0..length).map(|_| bases[rng.random_range(0..4)]).collect()
}


struct NodeRecord {
    length: usize,
    coverage: f64,
    forward: String,
    twin: String,
}


/// Builds LastGraph text. Nodes get random (but deterministic) sequences unless given real ones,
/// and arcs and reads use the signed IDs of the file format.
#[derive(Default)]
pub struct LastGraphBuilder {
    hash_length: u32,
    nodes: BTreeMap<u32, NodeRecord>,
    arcs: Vec<(i64, i64)>,
    reads: BTreeMap<i64, Vec<(u64, u64, u64)>>,
}

impl LastGraphBuilder {
    pub fn new(hash_length: u32) -> Self {
        LastGraphBuilder { hash_length, ..Default::default() }
    }

    pub fn node(mut self, id: u32, length: usize, coverage: f64) -> Self {
        let forward = random_seq(length, id as u64);
        let twin = random_seq(length, id as u64 + 1_000_000);
        self.nodes.insert(id, NodeRecord { length, coverage, forward, twin });
        self
    }

    pub fn node_with_seq(mut self, id: u32, forward: &str, twin: &str) -> Self {
        self.nodes.insert(id, NodeRecord { length: forward.len(), coverage: 10.0,
                                         forward: forward.to_string(), twin: twin.to_string() });
        self
    }

    pub fn arc(mut self, begin: i64, end: i64) -> Self {
        self.arcs.push((begin, end));
        self
    }

    pub fn read(mut self, signed_node: i64, read_id: u64, offset: u64, start_coord: u64) -> Self {
        self.reads.entry(signed_node).or_default().push((read_id, offset, start_coord));
        self
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}\t{}\t{}\t1", self.nodes.len(), self.reads.len(),
                                     self.hash_length)];
        for (id, n) in &self.nodes {
            let total = n.coverage * n.length as f64;
            lines.push(format!("NODE\t{}\t{}\t{}\t0\t0\t0", id, n.length, total));
            lines.push(n.forward.clone());
            lines.push(n.twin.clone());
        }
        for (begin, end) in &self.arcs {
            lines.push(format!("ARC\t{}\t{}\t1", begin, end));
        }
        for (node, reads) in &self.reads {
            lines.push(format!("NR\t{}\t{}", node, reads.len()));
            for (read_id, offset, start_coord) in reads {
                lines.push(format!("{}\t{}\t{}", read_id, offset, start_coord));
            }
        }
        lines
    }

    pub fn build(&self) -> Graph {
        Graph::from_velvet_lines(&self.lines()).unwrap()
    }
}


fn spanned_node(genome: &str, first_kmer: usize, kmer_count: usize, k: usize)
        -> (String, String) {
    // The ends of k-mers for a node whose k-mers start at the given genome positions, plus the
    // ends of k-mers of its twin.
    let forward = genome[first_kmer + k - 1..first_kmer + kmer_count + k - 1].to_string();
    let twin = reverse_complement(genome[first_kmer..first_kmer + kmer_count].as_bytes());
    (forward, String::from_utf8(twin).unwrap())
}


pub fn get_linear_graph() -> Vec<String> {
    // 1 -> 2 -> 3 -> 4, all 100 bp at 10x
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .node(4, 100, 10.0).arc(1, 2).arc(2, 3).arc(3, 4).lines()
}


pub fn get_twisted_graph() -> Vec<String> {
    // 1 forward leads into the twin of 2, and the twin of 2 leads into 3
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .arc(1, -2).arc(-2, 3).lines()
}


pub fn get_self_arc_graph() -> Vec<String> {
    // 1 has a loop, 2 has a hairpin on its end and 3 -> 4 is a doubled arc
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .node(4, 100, 10.0)
                             .arc(1, 1).arc(1, 2).arc(2, -2).arc(3, 4).arc(3, 4).lines()
}


pub fn get_bubble_graph() -> Vec<String> {
    // 1 -> {2, 3} -> 4
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .node(4, 100, 10.0).arc(1, 2).arc(2, 4).arc(1, 3).arc(3, 4).lines()
}


pub fn get_cyclic_graph() -> Vec<String> {
    // 1 -> 2 -> 3 -> 4, with 3 also leading back to 2
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .node(4, 100, 10.0).arc(1, 2).arc(2, 3).arc(3, 2).arc(3, 4).lines()
}


pub fn get_reopen_graph() -> Vec<String> {
    // 1 -> 2 (long) -> 5 -> 3 -> 4, plus a shortcut 1 -> 5
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 300, 10.0).node(3, 100, 10.0)
                             .node(4, 100, 10.0).node(5, 100, 10.0)
                             .arc(1, 2).arc(2, 5).arc(1, 5).arc(5, 3).arc(3, 4).lines()
}


pub fn get_coverage_filter_graph() -> Vec<String> {
    // Nodes 2 and 3 are below 3.5x, and between them they touch four of the five arcs.
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 2.0).node(3, 100, 3.0)
                             .node(4, 100, 8.0)
                             .arc(1, 2).arc(2, 3).arc(3, 4).arc(2, 4).arc(1, 4).lines()
}


pub fn get_read_graph() -> Vec<String> {
    // 1 -> {2, 5} -> 3, all 100 bp. Reads 1 and 2 span 1, 2 and 3. Read 3 is on 1 and 5, read 4 is
    // on 5 and 3, so nothing spans 1, 5 and 3.
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .node(5, 100, 10.0)
                             .arc(1, 2).arc(2, 3).arc(1, 5).arc(5, 3)
                             .read(1, 1, 10, 0).read(1, 2, 20, 0).read(1, 3, 30, 0)
                             .read(2, 1, 90, 0).read(2, 2, 95, 0)
                             .read(3, 1, 5, 0).read(3, 2, 10, 0).read(3, 4, 40, 0)
                             .read(5, 3, 50, 0).read(-5, 4, 60, 0).lines()
}


pub fn get_paired_graph() -> Vec<String> {
    // Two 200 bp nodes with no arc between them, 1 forward then 2 forward in the genome with a
    // 100 bp gap. Read pairs (1, 2) and (3, 4) each have one read near the end of 1 pointing
    // towards 2 and its mate on the twin of 2.
    LastGraphBuilder::new(31).node(1, 200, 10.0).node(2, 200, 10.0).node(3, 200, 10.0)
                             .read(1, 1, 150, 0).read(1, 3, 160, 0)
                             .read(-2, 2, 150, 0).read(-2, 4, 140, 0)
                             .read(-1, 5, 100, 0).read(3, 6, 10, 0).lines()
}


pub fn get_sequence_graph() -> (Vec<String>, String) {
    // A real k=5 graph: the 22 bp genome split into nodes of 6, 5 and 7 k-mers, plus a separate
    // 2 bp node.
    let genome = "ACGTTGCAATGCCGTAGGCTAA".to_string();
    let (f1, t1) = spanned_node(&genome, 0, 6, 5);
    let (f2, t2) = spanned_node(&genome, 6, 5, 5);
    let (f3, t3) = spanned_node(&genome, 11, 7, 5);
    let lines = LastGraphBuilder::new(5).node_with_seq(1, &f1, &t1).node_with_seq(2, &f2, &t2)
                                        .node_with_seq(3, &f3, &t3).node_with_seq(4, "GA", "TC")
                                        .arc(1, 2).arc(2, 3).arc(3, 4).lines();
    (lines, genome)
}


pub fn random_dag_graph(seed: u64, node_count: u32, arc_probability: f64) -> LastGraphBuilder {
    // Random forward-only arcs from lower to higher node IDs, so the graph has no cycles. Node 1
    // always leads to node 2 so there's something to find.
    let mut rng = StdRng::seed_from_u64(seed);
    let mut builder = LastGraphBuilder::new(31);
    for id in 1..=node_count {
        builder = builder.node(id, rng.random_range(50..=150), 10.0);
    }
    builder = builder.arc(1, 2);
    for a in 1..=node_count {
        for b in a + 1..=node_count {
            if (a, b) != (1, 2) && rng.random_bool(arc_probability) {
                builder = builder.arc(a as i64, b as i64);
            }
        }
    }
    builder
}


pub fn get_tangled_graph() -> Vec<String> {
    // A fork at 1 into 2 and 6 which both reach 3, then 3 forks into 4 and 5 which both reach 7.
    // 8 is a 20 bp tip off 3, and 9 is a 20 bp tip off 7.
    LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0).node(3, 100, 10.0)
                             .node(4, 100, 10.0).node(5, 120, 10.0).node(6, 150, 10.0)
                             .node(7, 100, 10.0).node(8, 20, 2.0).node(9, 20, 2.0)
                             .arc(1, 2).arc(1, 6).arc(2, 3).arc(6, 3).arc(3, 4).arc(3, 5)
                             .arc(4, 7).arc(5, 7).arc(3, 8).arc(7, 9).lines()
}
