// This file contains probes (contig ends located in the graph via their reads) and the read-pair
// lookups used by paired-end searches.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use fxhash::{FxHashMap, FxHashSet};
use log::{debug, warn};
use std::rc::Rc;

use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::misc::plural;
use crate::node::NodedRead;
use crate::oriented::OrientedNode;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeHit {
    pub node_id: u32,
    pub read: NodedRead,
}

impl ProbeHit {
    pub fn onode(&self) -> OrientedNode {
        OrientedNode::from_direction(self.node_id, self.read.direction)
    }
}


/// Locates reads in the graph. For each requested read ID, returns the node containing it (or None
/// if the read isn't in the graph).
pub trait ProbeFinder {
    fn find(&self, graph: &Graph, read_ids: &[u64]) -> Vec<Option<ProbeHit>>;
}


/// Finds probes by scanning every node's read list. When a read was placed on more than one node,
/// the placement with the lowest start coordinate wins, then the lowest node ID.
pub struct TraversalProbeFinder;

impl ProbeFinder for TraversalProbeFinder {
    fn find(&self, graph: &Graph, read_ids: &[u64]) -> Vec<Option<ProbeHit>> {
        let wanted: FxHashSet<u64> = read_ids.iter().copied().collect();
        let mut best: FxHashMap<u64, ProbeHit> = FxHashMap::default();
        for node in graph.nodes() {
            for read in node.short_reads.iter().filter(|r| wanted.contains(&r.read_id)) {
                let hit = ProbeHit { node_id: node.id, read: *read };
                let better = match best.get(&read.read_id) {
                    None => true,
                    Some(current) => (read.start_coord, node.id) <
                                     (current.read.start_coord, current.node_id),
                };
                if better {
                    best.insert(read.read_id, hit);
                }
            }
        }
        read_ids.iter().map(|id| best.get(id).copied()).collect()
    }
}


/// A graph with probes placed on it. Probes come in pairs, one for each end of a contig: probe 2i
/// is the start of contig i and probe 2i+1 is its end, both facing out of the contig.
#[derive(Clone)]
pub struct ProbedGraph {
    pub graph: Rc<Graph>,
    pub probe_read_ids: Vec<u64>,
    pub hits: Vec<Option<ProbeHit>>,
}

impl ProbedGraph {
    pub fn new(graph: Rc<Graph>, probe_read_ids: Vec<u64>, finder: &dyn ProbeFinder)
            -> Result<Self> {
        let hits = finder.find(&graph, &probe_read_ids);
        let probed = ProbedGraph { graph, probe_read_ids, hits };
        let found = probed.found_count();
        if found == 0 && !probed.hits.is_empty() {
            return Err(GraphError::NoProbesFound);
        }
        for i in probed.missing_probes() {
            warn!("probe {} (read {}) was not found in the graph", i, probed.probe_read_ids[i]);
        }
        debug!("{} of {} probe{} found", found, probed.probe_count(),
               plural(probed.probe_count()));
        Ok(probed)
    }

    pub fn probe_count(&self) -> usize {
        self.hits.len()
    }

    pub fn found_count(&self) -> usize {
        self.hits.iter().filter(|h| h.is_some()).count()
    }

    pub fn missing_probes(&self) -> Vec<usize> {
        self.hits.iter().enumerate().filter(|(_, h)| h.is_none()).map(|(i, _)| i).collect()
    }

    pub fn probe_onode(&self, index: usize) -> Option<OrientedNode> {
        self.hits.get(index).copied().flatten().map(|h| h.onode())
    }

    pub fn subset(&self, indices: &[usize]) -> ProbedGraph {
        // Narrows to the given probes while sharing the same underlying graph.
        ProbedGraph {
            graph: Rc::clone(&self.graph),
            probe_read_ids: indices.iter().filter_map(|&i| self.probe_read_ids.get(i).copied())
                                   .collect(),
            hits: indices.iter().filter_map(|&i| self.hits.get(i).copied()).collect(),
        }
    }

    pub fn print_probe_info(&self) {
        eprintln!("{} of {} probe{} found in the graph", self.found_count(), self.probe_count(),
                  plural(self.probe_count()));
        for (i, hit) in self.hits.iter().enumerate() {
            match hit {
                Some(h) => eprintln!("  probe {}: read {} on {}", i, self.probe_read_ids[i],
                                     h.onode()),
                None => eprintln!("  probe {}: read {} not found", i, self.probe_read_ids[i]),
            }
        }
        eprintln!();
    }
}


/// Answers which read (if any) is paired with a given read.
pub trait ReadPairOracle {
    fn pair_id(&self, read_id: u64) -> Option<u64>;
}


/// Velvet numbers paired reads consecutively from 1, so reads 2k-1 and 2k are mates.
pub struct SequentialPairs;

impl ReadPairOracle for SequentialPairs {
    fn pair_id(&self, read_id: u64) -> Option<u64> {
        match read_id {
            0 => None,
            id if id % 2 == 1 => Some(id + 1),
            id => Some(id - 1),
        }
    }
}


/// Maps read IDs to the nodes they were placed on.
#[derive(Default)]
pub struct ReadToNode {
    nodes: FxHashMap<u64, Vec<u32>>,
}

impl ReadToNode {
    pub fn from_graph(graph: &Graph) -> Self {
        let mut nodes: FxHashMap<u64, Vec<u32>> = FxHashMap::default();
        for node in graph.nodes() {
            for read in &node.short_reads {
                let list = nodes.entry(read.read_id).or_default();
                if list.last() != Some(&node.id) {
                    list.push(node.id);
                }
            }
        }
        ReadToNode { nodes }
    }

    pub fn nodes_of(&self, read_id: u64) -> &[u32] {
        self.nodes.get(&read_id).map(|v| v.as_slice()).unwrap_or(&[])
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::oriented::Side;
    use crate::test_graphs::*;

    #[test]
    fn test_traversal_probe_finder() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        let hits = TraversalProbeFinder.find(&graph, &[4, 99, 3]);
        assert_eq!(hits.len(), 3);
        // Read 4 is on the twin of 5 and on 3, both at coordinate 0, so the lower node ID wins.
        let hit = hits[0].unwrap();
        assert_eq!(hit.node_id, 3);
        assert!(hits[1].is_none());
        assert_eq!(hits[2].unwrap().node_id, 1);
    }

    #[test]
    fn test_probe_start_coord_wins() {
        let graph = LastGraphBuilder::new(31).node(1, 100, 5.0).node(2, 100, 5.0)
                                             .read(1, 7, 10, 40).read(-2, 7, 10, 3).build();
        let hit = TraversalProbeFinder.find(&graph, &[7])[0].unwrap();
        assert_eq!(hit.node_id, 2);
        assert!(!hit.read.direction);
        assert_eq!(hit.onode(), OrientedNode::new(2, Side::End));
    }

    #[test]
    fn test_probed_graph() {
        let graph = Rc::new(Graph::from_velvet_lines(&get_read_graph()).unwrap());
        let probed = ProbedGraph::new(Rc::clone(&graph), vec![1, 99, 4, 3],
                                      &TraversalProbeFinder).unwrap();
        assert_eq!(probed.probe_count(), 4);
        assert_eq!(probed.found_count(), 3);
        assert_eq!(probed.missing_probes(), vec![1]);
        assert_eq!(probed.probe_onode(0), Some(OrientedNode::forward(1)));
        assert_eq!(probed.probe_onode(1), None);
        assert_eq!(probed.probe_onode(10), None);

        let subset = probed.subset(&[2, 3]);
        assert_eq!(subset.probe_count(), 2);
        assert_eq!(subset.probe_read_ids, vec![4, 3]);
        assert!(Rc::ptr_eq(&subset.graph, &graph));
    }

    #[test]
    fn test_no_probes_found() {
        let graph = Rc::new(Graph::from_velvet_lines(&get_read_graph()).unwrap());
        assert!(matches!(ProbedGraph::new(graph, vec![98, 99], &TraversalProbeFinder),
                         Err(GraphError::NoProbesFound)));
    }

    #[test]
    fn test_sequential_pairs() {
        assert_eq!(SequentialPairs.pair_id(1), Some(2));
        assert_eq!(SequentialPairs.pair_id(2), Some(1));
        assert_eq!(SequentialPairs.pair_id(7), Some(8));
        assert_eq!(SequentialPairs.pair_id(0), None);
    }

    #[test]
    fn test_read_to_node() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        let index = ReadToNode::from_graph(&graph);
        assert_eq!(index.nodes_of(1), &[1, 2, 3]);
        assert_eq!(index.nodes_of(4), &[3, 5]);
        assert!(index.nodes_of(42).is_empty());
    }
}
