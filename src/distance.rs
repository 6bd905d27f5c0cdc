// This file contains closest-first (Dijkstra-style) searches over the graph, which measure how far
// apart nodes are in bp. Neighbours come from a pluggable finder: plain graph adjacency, or that
// plus jumps to the nodes holding mates of paired reads.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use fxhash::{FxHashMap, FxHashSet};
use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::graph::Graph;
use crate::oriented::{distinct_neighbours_of, OrientedNode};
use crate::probes::{ProbedGraph, ReadPairOracle, ReadToNode};
use crate::settings::SearchSettings;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistancedOrientedNode {
    pub onode: OrientedNode,
    pub distance: u64,
}


pub trait NeighbourFinder {
    /// Neighbours of the given oriented node, each with its distance from the search origin
    /// (given the distance to the current node).
    fn neighbours(&self, graph: &Graph, onode: OrientedNode, distance: u64)
        -> Vec<DistancedOrientedNode>;
}


/// Neighbours via arcs. Entering a node costs that node's length.
pub struct DirectNeighbourFinder;

impl NeighbourFinder for DirectNeighbourFinder {
    fn neighbours(&self, graph: &Graph, onode: OrientedNode, distance: u64)
            -> Vec<DistancedOrientedNode> {
        distinct_neighbours_of(graph, onode).into_iter()
            .map(|n| DistancedOrientedNode { onode: n, distance: distance + n.length(graph) })
            .collect()
    }
}


/// Neighbours via arcs, plus nodes holding the mates of reads on the current node. A mate jump is
/// only made for reads pointing along the walk, and the distance is estimated from the insert
/// size and where the two reads sit in their nodes.
pub struct PairedEndNeighbourFinder<'a> {
    pub oracle: &'a dyn ReadPairOracle,
    pub read_to_node: &'a ReadToNode,
    pub insert_size: u64,
}

impl<'a> PairedEndNeighbourFinder<'a> {
    fn mate_neighbours(&self, graph: &Graph, onode: OrientedNode, distance: u64)
            -> Vec<DistancedOrientedNode> {
        let mut result = Vec::new();
        let Some(node) = graph.node(onode.node_id) else { return result };
        let insert = self.insert_size as i64;
        for read in node.short_reads.iter().filter(|r| r.direction == onode.starts_at_start()) {
            let Some(mate_id) = self.oracle.pair_id(read.read_id) else { continue };
            let to_exit = node.length as i64 - read.offset_from_start_of_node as i64;
            for &mate_node_id in self.read_to_node.nodes_of(mate_id) {
                if mate_node_id == onode.node_id {
                    continue;
                }
                let Some(mate_node) = graph.node(mate_node_id) else { continue };
                for mate in mate_node.short_reads.iter().filter(|r| r.read_id == mate_id) {
                    // The mate points back towards the read, so the walk enters its node from the
                    // side the mate is pointing at.
                    let entry = OrientedNode::from_direction(mate_node_id, !mate.direction);
                    let depth = mate_node.length as i64 - mate.offset_from_start_of_node as i64;
                    let gap = insert - to_exit - depth;
                    if gap < -insert || gap > 2 * insert {
                        trace!("implausible gap of {} bp from read {} to its mate", gap,
                               read.read_id);
                        continue;
                    }
                    let estimate = (distance as i64 + gap + mate_node.length as i64).max(0);
                    result.push(DistancedOrientedNode { onode: entry, distance: estimate as u64 });
                }
            }
        }
        result
    }
}

impl<'a> NeighbourFinder for PairedEndNeighbourFinder<'a> {
    fn neighbours(&self, graph: &Graph, onode: OrientedNode, distance: u64)
            -> Vec<DistancedOrientedNode> {
        let mut result = DirectNeighbourFinder.neighbours(graph, onode, distance);
        result.extend(self.mate_neighbours(graph, onode, distance));
        result
    }
}


/// Iterates over the oriented nodes reachable from an origin in order of distance. The origin
/// itself comes first at distance zero. Nodes at equal distance come out in the order they were
/// found.
pub struct ClosestFirst<'a> {
    graph: &'a Graph,
    finder: &'a dyn NeighbourFinder,
    leash: Option<u64>,
    queue: BinaryHeap<Reverse<(u64, u64, OrientedNode)>>,
    pushed: u64,
    best: FxHashMap<OrientedNode, u64>,
    settled: FxHashSet<OrientedNode>,
}

impl<'a> ClosestFirst<'a> {
    pub fn new(graph: &'a Graph, origins: &[OrientedNode], finder: &'a dyn NeighbourFinder,
               leash: Option<u64>) -> Self {
        let mut search = ClosestFirst { graph, finder, leash, queue: BinaryHeap::new(), pushed: 0,
                                        best: FxHashMap::default(),
                                        settled: FxHashSet::default() };
        for &origin in origins {
            search.best.insert(origin, 0);
            search.push(origin, 0);
        }
        search
    }

    fn push(&mut self, onode: OrientedNode, distance: u64) {
        self.queue.push(Reverse((distance, self.pushed, onode)));
        self.pushed += 1;
    }
}

impl<'a> Iterator for ClosestFirst<'a> {
    type Item = DistancedOrientedNode;

    fn next(&mut self) -> Option<DistancedOrientedNode> {
        while let Some(Reverse((distance, _, onode))) = self.queue.pop() {
            if !self.settled.insert(onode) {
                continue;
            }
            for n in self.finder.neighbours(self.graph, onode, distance) {
                if self.settled.contains(&n.onode) {
                    continue;
                }
                if self.leash.is_some_and(|leash| n.distance > leash) {
                    continue;
                }
                if self.best.get(&n.onode).is_some_and(|&d| d <= n.distance) {
                    continue;
                }
                self.best.insert(n.onode, n.distance);
                self.push(n.onode, n.distance);
            }
            return Some(DistancedOrientedNode { onode, distance });
        }
        None
    }
}


/// Minimum distance to every oriented node within the leash. With max_nodes, only the origin and
/// the closest max_nodes others are kept, plus anything tied with the last one kept.
pub fn min_distances(graph: &Graph, origin: OrientedNode, finder: &dyn NeighbourFinder,
                     leash: Option<u64>, max_nodes: Option<usize>)
        -> FxHashMap<OrientedNode, u64> {
    let mut distances = FxHashMap::default();
    let mut last_kept = None;
    for found in ClosestFirst::new(graph, &[origin], finder, leash) {
        if let Some(max) = max_nodes {
            if distances.len() > max && last_kept != Some(found.distance) {
                break;
            }
        }
        distances.insert(found.onode, found.distance);
        last_kept = Some(found.distance);
    }
    distances
}


/// Minimum distance to every node, folding both orientations of a node together. With
/// ignore_directions, the search goes out from both sides of the origin.
pub fn min_distances_by_node(graph: &Graph, origin: OrientedNode, finder: &dyn NeighbourFinder,
                             settings: &SearchSettings) -> BTreeMap<u32, u64> {
    let origins: Vec<OrientedNode> = if settings.ignore_directions {
        vec![origin, origin.reverse()]
    } else {
        vec![origin]
    };
    let mut by_node: BTreeMap<u32, u64> = BTreeMap::new();
    for o in origins {
        let distances = min_distances(graph, o, finder, settings.leash_length, settings.max_nodes);
        for (onode, distance) in distances {
            let entry = by_node.entry(onode.node_id).or_insert(distance);
            *entry = (*entry).min(distance);
        }
    }
    by_node
}


/// Distances between probes, for probe pairs i < j. A connection from probe i to probe j means
/// walking out of probe i's node arrives at probe j's node facing into its contig. The distance
/// counts neither probe node.
pub fn probe_distances(probed: &ProbedGraph, finder: &dyn NeighbourFinder, leash: Option<u64>)
        -> BTreeMap<(usize, usize), u64> {
    let graph = probed.graph.as_ref();
    let mut table = BTreeMap::new();
    for i in 0..probed.probe_count() {
        let Some(origin) = probed.probe_onode(i) else { continue };
        let targets: FxHashMap<OrientedNode, Vec<usize>> =
            (i + 1..probed.probe_count()).filter_map(|j| probed.probe_onode(j).map(|o| (o, j)))
                .fold(FxHashMap::default(), |mut map, (o, j)| {
                    map.entry(o.reverse()).or_insert_with(Vec::new).push(j);
                    map
                });
        if targets.is_empty() {
            continue;
        }
        let mut remaining = targets.len();
        for found in ClosestFirst::new(graph, &[origin], finder, leash) {
            if found.onode == origin {
                continue;
            }
            if let Some(js) = targets.get(&found.onode) {
                for &j in js {
                    let distance = found.distance.saturating_sub(found.onode.length(graph));
                    table.insert((i, j), distance);
                }
                remaining -= 1;
                if remaining == 0 {
                    break;
                }
            }
        }
    }
    debug!("{} probe connection{} found", table.len(), if table.len() == 1 { "" } else { "s" });
    table
}


/// Removes every node further than the leash from all of the given oriented nodes, searching in
/// both directions. Returns the number of nodes and arcs removed.
pub fn filter_by_connectivity(graph: &mut Graph, origins: &[OrientedNode], leash: u64)
        -> (usize, usize) {
    let starts: Vec<OrientedNode> = origins.iter().flat_map(|&o| [o, o.reverse()]).collect();
    let keep: FxHashSet<u32> = ClosestFirst::new(graph, &starts, &DirectNeighbourFinder,
                                                 Some(leash))
        .map(|d| d.onode.node_id).collect();
    let far: FxHashSet<u32> = graph.nodes().map(|n| n.id).filter(|id| !keep.contains(id))
                                   .collect();
    graph.delete_nodes(&far)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{SequentialPairs, TraversalProbeFinder};
    use crate::test_graphs::*;
    use maplit::btreemap;
    use std::rc::Rc;

    fn o(text: &str) -> OrientedNode {
        OrientedNode::parse(text).unwrap()
    }

    #[test]
    fn test_closest_first_order() {
        let graph = Graph::from_velvet_lines(&get_tangled_graph()).unwrap();
        let order: Vec<(String, u64)> =
            ClosestFirst::new(&graph, &[o("1+")], &DirectNeighbourFinder, None)
                .map(|d| (d.onode.to_string(), d.distance)).collect();
        assert_eq!(order[0], ("1+".to_string(), 0));
        assert_eq!(order[1], ("2+".to_string(), 100));
        assert_eq!(order[2], ("6+".to_string(), 150));
        assert_eq!(order[3], ("3+".to_string(), 200));
        assert_eq!(order[4], ("8+".to_string(), 220));
        assert!(order.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(order.len(), 9);
    }

    #[test]
    fn test_closest_first_ties_in_found_order() {
        // 4+ is found from 1+ and 2+ later from 3+, both at 200 bp, so 4+ comes out first.
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0)
                                             .node(3, 100, 10.0).node(4, 200, 10.0)
                                             .arc(1, 3).arc(1, 4).arc(3, 2).build();
        let order: Vec<(String, u64)> =
            ClosestFirst::new(&graph, &[o("1+")], &DirectNeighbourFinder, None)
                .map(|d| (d.onode.to_string(), d.distance)).collect();
        assert_eq!(order, vec![("1+".to_string(), 0), ("3+".to_string(), 100),
                               ("4+".to_string(), 200), ("2+".to_string(), 200)]);
    }

    #[test]
    fn test_min_distances_leash() {
        let graph = Graph::from_velvet_lines(&get_linear_graph()).unwrap();
        let d = min_distances(&graph, o("1+"), &DirectNeighbourFinder, Some(200), None);
        assert_eq!(d.len(), 3);
        assert_eq!(d[&o("3+")], 200);
        assert!(!d.contains_key(&o("4+")));
        let d = min_distances(&graph, o("2-"), &DirectNeighbourFinder, None, None);
        assert_eq!(d.len(), 2);
        assert_eq!(d[&o("1-")], 100);
    }

    #[test]
    fn test_min_distances_max_nodes_keeps_ties() {
        // 2 and 3 are both 100 bp from 1, so asking for one node returns both.
        let graph = Graph::from_velvet_lines(&get_bubble_graph()).unwrap();
        let d = min_distances(&graph, o("1+"), &DirectNeighbourFinder, None, Some(1));
        assert_eq!(d.len(), 3);
        assert!(d.contains_key(&o("2+")) && d.contains_key(&o("3+")));
        let d = min_distances(&graph, o("1+"), &DirectNeighbourFinder, None, Some(0));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_max_nodes_property() {
        for seed in 0..10 {
            let graph = random_dag_graph(seed, 10, 0.3).build();
            let full = min_distances(&graph, o("1+"), &DirectNeighbourFinder, None, None);
            for n in 0..6 {
                let limited = min_distances(&graph, o("1+"), &DirectNeighbourFinder, None,
                                            Some(n));
                assert!(limited.len() >= (n + 1).min(full.len()));
                let max_limited = limited.values().max().unwrap();
                let max_full_same = limited.keys().map(|k| full[k]).max().unwrap();
                assert!(max_limited <= &max_full_same);
                for (k, v) in &limited {
                    assert_eq!(full[k], *v);
                }
            }
        }
    }

    #[test]
    fn test_min_distances_by_node() {
        let graph = Graph::from_velvet_lines(&get_linear_graph()).unwrap();
        let mut settings = SearchSettings::default();
        let d = min_distances_by_node(&graph, o("2+"), &DirectNeighbourFinder, &settings);
        assert_eq!(d, btreemap! { 2 => 0, 3 => 100, 4 => 200 });
        settings.ignore_directions = true;
        let d = min_distances_by_node(&graph, o("2+"), &DirectNeighbourFinder, &settings);
        assert_eq!(d, btreemap! { 1 => 100, 2 => 0, 3 => 100, 4 => 200 });
    }

    #[test]
    fn test_paired_end_neighbours() {
        let graph = Graph::from_velvet_lines(&get_paired_graph()).unwrap();
        let index = ReadToNode::from_graph(&graph);
        let finder = PairedEndNeighbourFinder { oracle: &SequentialPairs, read_to_node: &index,
                                                insert_size: 200 };
        // Both pairs put the start of 2 100 bp past the end of 1.
        let n = finder.neighbours(&graph, o("1+"), 0);
        assert_eq!(n.len(), 2);
        assert!(n.iter().all(|d| d.onode == o("2+") && d.distance == 300));
        // Walking the other way uses read 5, whose mate is on 3.
        let n = finder.neighbours(&graph, o("1-"), 0);
        assert_eq!(n, vec![DistancedOrientedNode { onode: o("3-"), distance: 110 }]);
        // With no arcs, direct searches can't leave node 1.
        assert!(DirectNeighbourFinder.neighbours(&graph, o("1+"), 0).is_empty());
    }

    #[test]
    fn test_paired_end_implausible_gap() {
        let graph = Graph::from_velvet_lines(&get_paired_graph()).unwrap();
        let index = ReadToNode::from_graph(&graph);
        let finder = PairedEndNeighbourFinder { oracle: &SequentialPairs, read_to_node: &index,
                                                insert_size: 20 };
        // gap = 20 - 50 - 50 = -80, which is beyond -20
        assert!(finder.neighbours(&graph, o("1+"), 0).is_empty());
    }

    #[test]
    fn test_paired_end_zero_gap() {
        let graph = Graph::from_velvet_lines(&get_paired_graph()).unwrap();
        let index = ReadToNode::from_graph(&graph);
        let finder = PairedEndNeighbourFinder { oracle: &SequentialPairs, read_to_node: &index,
                                                insert_size: 100 };
        let n = finder.neighbours(&graph, o("1+"), 0);
        assert!(n.iter().all(|d| d.distance == 200));
        let search: Vec<_> = ClosestFirst::new(&graph, &[o("1+")], &finder, None).collect();
        assert_eq!(search.len(), 2);
    }

    #[test]
    fn test_paired_end_distance_never_negative() {
        // gap = 200 - 300 - 50 = -150, which would put node 2 before the origin
        let graph = LastGraphBuilder::new(31).node(1, 300, 10.0).node(2, 50, 10.0)
                                             .read(1, 1, 0, 0).read(-2, 2, 0, 0).build();
        let index = ReadToNode::from_graph(&graph);
        let finder = PairedEndNeighbourFinder { oracle: &SequentialPairs, read_to_node: &index,
                                                insert_size: 200 };
        assert_eq!(finder.neighbours(&graph, o("1+"), 0),
                   vec![DistancedOrientedNode { onode: o("2+"), distance: 0 }]);
    }

    #[test]
    fn test_probe_distances() {
        // Probe 0 faces out of 1 and reaches probe 1 (on the twin of 4) facing back. Probe 1 in turn
        // reaches probe 2 on node 2.
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0)
                                             .node(3, 50, 10.0).node(4, 100, 10.0)
                                             .arc(1, 2).arc(2, 3).arc(3, 4)
                                             .read(1, 11, 0, 0).read(-4, 13, 0, 0)
                                             .read(2, 15, 0, 0).build();
        let probed = ProbedGraph::new(Rc::new(graph), vec![11, 13, 15],
                                      &TraversalProbeFinder).unwrap();
        let table = probe_distances(&probed, &DirectNeighbourFinder, None);
        assert_eq!(table, btreemap! { (0, 1) => 150, (1, 2) => 50 });
        let table = probe_distances(&probed, &DirectNeighbourFinder, Some(200));
        assert_eq!(table, btreemap! { (1, 2) => 50 });
    }

    #[test]
    fn test_filter_by_connectivity() {
        let mut graph = Graph::from_velvet_lines(&get_linear_graph()).unwrap();
        assert_eq!(filter_by_connectivity(&mut graph, &[o("1+")], 150), (2, 2));
        assert_eq!(graph.connected_components(), vec![vec![1, 2]]);
    }
}
