// This file defines the Graph struct: a Velvet de Bruijn graph of nodes joined by arcs, loaded
// from a LastGraph file.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use fxhash::{FxHashMap, FxHashSet};
use log::debug;
use std::path::Path;

use crate::error::{GraphError, Result};
use crate::log::{explanation, section_header};
use crate::misc::{load_file_lines, plural, quit_with_error, spinner};
use crate::node::{Node, NodedRead};
use crate::oriented::{OrientedNode, Side};


/// An arc between two nodes. The direction flags follow the LastGraph convention: a positive begin
/// ID means the arc leaves the end of the begin node, and a positive end ID means it enters the
/// start of the end node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arc {
    pub begin_node_id: u32,
    pub end_node_id: u32,
    pub begin_node_direction: bool,
    pub end_node_direction: bool,
    pub multiplicity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JunctionTopology {
    EndToStart,
    EndToEnd,
    StartToStart,
    StartToEnd,
}

impl Arc {
    pub fn from_signed(begin: i64, end: i64, multiplicity: u32) -> Self {
        Arc { begin_node_id: begin.unsigned_abs() as u32, end_node_id: end.unsigned_abs() as u32,
              begin_node_direction: begin > 0, end_node_direction: end > 0, multiplicity }
    }

    pub fn begin_side(&self) -> Side {
        if self.begin_node_direction { Side::End } else { Side::Start }
    }

    pub fn end_side(&self) -> Side {
        if self.end_node_direction { Side::Start } else { Side::End }
    }

    pub fn is_self_arc(&self) -> bool {
        self.begin_node_id == self.end_node_id
    }

    pub fn topology(&self) -> JunctionTopology {
        match (self.begin_side(), self.end_side()) {
            (Side::End, Side::Start) => JunctionTopology::EndToStart,
            (Side::End, Side::End) => JunctionTopology::EndToEnd,
            (Side::Start, Side::Start) => JunctionTopology::StartToStart,
            (Side::Start, Side::End) => JunctionTopology::StartToEnd,
        }
    }

    pub fn connects(&self, node_1: u32, side_1: Side, node_2: u32, side_2: Side) -> bool {
        // True if this arc joins the given sides of the two nodes, in either order.
        (self.begin_node_id == node_1 && self.begin_side() == side_1 &&
         self.end_node_id == node_2 && self.end_side() == side_2) ||
        (self.begin_node_id == node_2 && self.begin_side() == side_2 &&
         self.end_node_id == node_1 && self.end_side() == side_1)
    }
}


#[derive(Default, Clone)]
pub struct Graph {
    pub hash_length: u32,
    nodes: Vec<Option<Node>>,
    arcs: Vec<Option<Arc>>,
    arcs_by_node: FxHashMap<u32, Vec<usize>>,
}

impl Graph {
    pub fn new(hash_length: u32) -> Self {
        Graph { hash_length, ..Default::default() }
    }

    pub fn from_velvet_file(filename: &Path) -> Result<Self> {
        let lines = load_file_lines(filename)?;
        Self::from_velvet_lines(&lines)
    }

    pub fn from_velvet_lines(lines: &[String]) -> Result<Self> {
        let mut graph = Graph::default();
        let mut i = 0;
        let mut header_seen = false;
        while i < lines.len() {
            let line_num = i + 1;
            let parts: Vec<&str> = lines[i].split_whitespace().collect();
            i += 1;
            let Some(&first) = parts.first() else { continue };
            if !header_seen {
                graph.hash_length = parse_field(&parts, 2, line_num)?;
                header_seen = true;
                continue;
            }
            match first {
                "NODE" => {
                    let mut node = Node::new(parse_field(&parts, 1, line_num)?,
                                             parse_field(&parts, 2, line_num)?);
                    node.coverages = parts.iter().skip(3).step_by(2)
                        .map(|p| p.parse::<f64>().map_err(|_| parse_error(line_num, p)))
                        .collect::<Result<Vec<_>>>()?;
                    if i + 1 >= lines.len() {
                        return Err(GraphError::Parse { line: line_num,
                            message: format!("node {} is missing its sequence lines", node.id) });
                    }
                    node.ends_of_kmers_of_node = lines[i].trim().as_bytes().to_vec();
                    node.ends_of_kmers_of_twin_node = lines[i + 1].trim().as_bytes().to_vec();
                    i += 2;
                    graph.add_node(node);
                }
                "ARC" => {
                    let begin: i64 = parse_field(&parts, 1, line_num)?;
                    let end: i64 = parse_field(&parts, 2, line_num)?;
                    let multiplicity = parse_field(&parts, 3, line_num)?;
                    graph.add_arc(Arc::from_signed(begin, end, multiplicity))?;
                }
                "NR" => {
                    let signed_id: i64 = parse_field(&parts, 1, line_num)?;
                    let count: usize = parse_field(&parts, 2, line_num)?;
                    let node_id = signed_id.unsigned_abs() as u32;
                    let mut reads = Vec::with_capacity(count);
                    for _ in 0..count {
                        let read_line_num = i + 1;
                        let read_parts: Vec<&str> = lines.get(i).map(|l| l.split_whitespace()
                                                                        .collect())
                                                             .unwrap_or_default();
                        reads.push(NodedRead {
                            read_id: parse_field(&read_parts, 0, read_line_num)?,
                            offset_from_start_of_node: parse_field(&read_parts, 1, read_line_num)?,
                            start_coord: parse_field(&read_parts, 2, read_line_num)?,
                            direction: signed_id > 0,
                        });
                        i += 1;
                    }
                    let node = graph.node_mut(node_id).ok_or(GraphError::MissingNode(node_id))?;
                    node.short_reads.extend(reads);
                }
                _ => {}  // SEQ blocks and their read lines are not needed
            }
        }
        if !header_seen {
            return Err(GraphError::Parse { line: 0, message: "empty graph file".to_string() });
        }
        debug!("loaded graph: {} nodes, {} arcs, k={}", graph.node_count(), graph.arc_count(),
               graph.hash_length);
        Ok(graph)
    }

    pub fn add_node(&mut self, node: Node) {
        let index = node.id as usize;
        if self.nodes.len() <= index {
            self.nodes.resize(index + 1, None);
        }
        self.nodes[index] = Some(node);
    }

    pub fn add_arc(&mut self, arc: Arc) -> Result<()> {
        for id in [arc.begin_node_id, arc.end_node_id] {
            if !self.contains_node(id) {
                return Err(GraphError::MissingNode(id));
            }
        }
        let index = self.arcs.len();
        self.arcs.push(Some(arc));
        self.arcs_by_node.entry(arc.begin_node_id).or_default().push(index);
        if !arc.is_self_arc() {
            self.arcs_by_node.entry(arc.end_node_id).or_default().push(index);
        }
        Ok(())
    }

    pub fn node(&self, node_id: u32) -> Option<&Node> {
        self.nodes.get(node_id as usize).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, node_id: u32) -> Option<&mut Node> {
        self.nodes.get_mut(node_id as usize).and_then(|n| n.as_mut())
    }

    pub fn contains_node(&self, node_id: u32) -> bool {
        self.node(node_id).is_some()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.iter().flatten()
    }

    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    pub fn arc_count(&self) -> usize {
        self.arcs().count()
    }

    pub fn length_of(&self, node_id: u32) -> u64 {
        self.node(node_id).map(|n| n.length as u64).unwrap_or(0)
    }

    pub fn total_length(&self) -> u64 {
        self.nodes().map(|n| n.length as u64).sum()
    }

    pub fn arcs_of_node(&self, node_id: u32) -> impl Iterator<Item = &Arc> {
        // Each arc touching the node is given once, including self-arcs.
        self.arcs_by_node.get(&node_id).into_iter().flatten()
            .filter_map(|&i| self.arcs[i].as_ref())
    }

    pub fn get_arcs_by_node_id(&self, node_1: u32, node_2: u32) -> Vec<&Arc> {
        self.arcs_of_node(node_1)
            .filter(|a| (a.begin_node_id == node_1 && a.end_node_id == node_2) ||
                        (a.begin_node_id == node_2 && a.end_node_id == node_1))
            .collect()
    }

    pub fn neighbours_off_end(&self, node_id: u32) -> Vec<OrientedNode> {
        crate::oriented::neighbours_of(self, OrientedNode::forward(node_id))
    }

    pub fn neighbours_into_start(&self, node_id: u32) -> Vec<OrientedNode> {
        // Nodes that lead into the start of this node, given in the orientation that does so.
        crate::oriented::neighbours_of(self, OrientedNode::backward(node_id))
            .into_iter().map(|o| o.reverse()).collect()
    }

    pub fn delete_nodes(&mut self, node_ids: &FxHashSet<u32>) -> (usize, usize) {
        // Removes the nodes and every arc touching them in one pass, so arcs between two deleted
        // nodes are only counted once. Returns the number of nodes and arcs removed.
        let mut removed_arcs = FxHashSet::default();
        for (i, slot) in self.arcs.iter_mut().enumerate() {
            if let Some(arc) = slot {
                if node_ids.contains(&arc.begin_node_id) || node_ids.contains(&arc.end_node_id) {
                    *slot = None;
                    removed_arcs.insert(i);
                }
            }
        }
        let mut removed_nodes = 0;
        for &id in node_ids {
            if let Some(slot) = self.nodes.get_mut(id as usize) {
                if slot.take().is_some() {
                    removed_nodes += 1;
                }
            }
            self.arcs_by_node.remove(&id);
        }
        for indices in self.arcs_by_node.values_mut() {
            indices.retain(|i| !removed_arcs.contains(i));
        }
        (removed_nodes, removed_arcs.len())
    }

    pub fn filter_by_coverage(&mut self, min_coverage: f64) -> (usize, usize) {
        let low: FxHashSet<u32> = self.nodes().filter(|n| n.coverage() < min_coverage)
                                              .map(|n| n.id).collect();
        let (nodes, arcs) = self.delete_nodes(&low);
        debug!("coverage filter {}: removed {} node{} and {} arc{}", min_coverage, nodes,
               plural(nodes), arcs, plural(arcs));
        (nodes, arcs)
    }

    pub fn connected_components(&self) -> Vec<Vec<u32>> {
        let mut visited = FxHashSet::default();
        let mut components = Vec::new();
        for node in self.nodes() {
            if !visited.contains(&node.id) {
                let mut component = Vec::new();
                self.dfs(node.id, &mut visited, &mut component);
                component.sort();
                components.push(component);
            }
        }
        components.sort();
        components
    }

    fn dfs(&self, node_id: u32, visited: &mut FxHashSet<u32>, component: &mut Vec<u32>) {
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            if visited.insert(current) {
                component.push(current);
                for arc in self.arcs_of_node(current) {
                    for neighbour in [arc.begin_node_id, arc.end_node_id] {
                        if !visited.contains(&neighbour) {
                            stack.push(neighbour);
                        }
                    }
                }
            }
        }
    }

    pub fn print_basic_graph_info(&self) {
        let node_count = self.node_count();
        let arc_count = self.arc_count();
        let read_count: usize = self.nodes().map(|n| n.short_reads.len()).sum();
        eprintln!("{} node{}, {} arc{}, k = {}", node_count, plural(node_count), arc_count,
                  plural(arc_count), self.hash_length);
        eprintln!("total length: {} bp", self.total_length());
        if read_count > 0 {
            eprintln!("{} read placement{}", read_count, plural(read_count));
        }
        eprintln!();
    }
}


pub fn load_graph(filename: &Path, min_coverage: Option<f64>) -> Graph {
    section_header("Loading graph");
    explanation("The LastGraph file is now loaded into memory.");
    let pb = spinner("reading LastGraph...");
    let graph = Graph::from_velvet_file(filename);
    pb.finish_and_clear();
    let mut graph = graph.unwrap_or_else(|e| {
        quit_with_error(&format!("failed to load {}: {}", filename.display(), e))
    });
    graph.print_basic_graph_info();
    if let Some(min_coverage) = min_coverage {
        let (nodes, arcs) = graph.filter_by_coverage(min_coverage);
        eprintln!("Removed {} node{} and {} arc{} below {}x coverage", nodes, plural(nodes), arcs,
                  plural(arcs), min_coverage);
        graph.print_basic_graph_info();
    }
    graph
}


fn parse_error(line: usize, token: &str) -> GraphError {
    GraphError::Parse { line, message: format!("could not parse '{}'", token) }
}


fn parse_field<T: std::str::FromStr>(parts: &[&str], index: usize, line: usize) -> Result<T> {
    let token = parts.get(index).ok_or_else(|| GraphError::Parse {
        line, message: format!("expected at least {} fields", index + 1) })?;
    token.parse::<T>().map_err(|_| parse_error(line, token))
}
