// This file contains the recoherence check, which resolves forks using single reads that span a
// junction. The assembly k-mer only guarantees adjacency between neighbouring nodes, but a read
// that lies on the last node of a trail and on every node in a longer window before it is
// evidence that the whole window really occurs together in the genome.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use fxhash::{FxHashMap, FxHashSet};
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;

use crate::graph::Graph;
use crate::oriented::OrientedNode;
use crate::settings::SearchSettings;


/// Returns the trailing nodes of the trail needed to cover the given number of bp (or the whole
/// trail if it's too short). Without a k-mer, the window is just the last node. This is the key
/// that searches use when remembering which states they've already visited.
pub fn trailing_window(graph: &Graph, trail: &[OrientedNode], kmer: Option<u32>)
        -> Vec<OrientedNode> {
    let Some(kmer) = kmer else {
        return trail.last().copied().into_iter().collect();
    };
    let mut start = trail.len();
    let mut total = 0;
    while start > 0 {
        start -= 1;
        total += graph.length_of(trail[start].node_id);
        if total >= kmer as u64 {
            break;
        }
    }
    trail[start..].to_vec()
}


pub struct RecoherenceValidator<'a> {
    graph: &'a Graph,
    pub kmer: u32,
    pub min_confirming_reads: usize,
    read_ids: RefCell<FxHashMap<u32, Rc<FxHashSet<u64>>>>,
}

impl<'a> RecoherenceValidator<'a> {
    pub fn new(graph: &'a Graph, kmer: u32, min_confirming_reads: usize) -> Self {
        RecoherenceValidator { graph, kmer, min_confirming_reads,
                               read_ids: RefCell::new(FxHashMap::default()) }
    }

    pub fn from_settings(graph: &'a Graph, settings: &SearchSettings) -> Option<Self> {
        settings.recoherence_kmer.map(|kmer| {
            RecoherenceValidator::new(graph, kmer, settings.min_confirming_recoherence_reads)
        })
    }

    fn reads_of(&self, node_id: u32) -> Rc<FxHashSet<u64>> {
        // Read ID sets are built on first use, since most searches only touch a few nodes.
        let mut cache = self.read_ids.borrow_mut();
        Rc::clone(cache.entry(node_id).or_insert_with(|| {
            Rc::new(self.graph.node(node_id).map(|n| n.read_ids()).unwrap_or_default())
        }))
    }

    pub fn window(&self, trail: &[OrientedNode]) -> Vec<OrientedNode> {
        trailing_window(self.graph, trail, Some(self.kmer))
    }

    /// The number of reads shared by the last node and every node in the window before it. None
    /// means the junction needs no read support (the trail is too short to contain a fork, or
    /// the window is just the adjacent node).
    pub fn confirming_reads(&self, trail: &[OrientedNode]) -> Option<usize> {
        if trail.len() < 3 {
            return None;
        }
        let (last, rest) = trail.split_last()?;
        let window = self.window(rest);
        if window.len() < 2 {
            return None;
        }
        let mut shared: FxHashSet<u64> = self.reads_of(last.node_id).as_ref().clone();
        for onode in window.iter().rev() {
            let reads = self.reads_of(onode.node_id);
            shared.retain(|r| reads.contains(r));
            if shared.is_empty() {
                trace!("no read spans {:?} -> {}", window, last);
                return Some(0);
            }
        }
        Some(shared.len())
    }

    pub fn validate(&self, trail: &[OrientedNode]) -> bool {
        match self.confirming_reads(trail) {
            None => true,
            Some(count) => count >= self.min_confirming_reads.max(1),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::oriented::OrientedTrail;
    use crate::test_graphs::*;

    fn t(text: &str) -> Vec<OrientedNode> {
        OrientedTrail::parse(text).unwrap().trail
    }

    #[test]
    fn test_trailing_window() {
        let graph = Graph::from_velvet_lines(&get_linear_graph()).unwrap();
        let trail = t("1+,2+,3+,4+");
        assert_eq!(trailing_window(&graph, &trail, None), t("4+"));
        assert_eq!(trailing_window(&graph, &trail, Some(100)), t("4+"));
        assert_eq!(trailing_window(&graph, &trail, Some(101)), t("3+,4+"));
        assert_eq!(trailing_window(&graph, &trail, Some(250)), t("2+,3+,4+"));
        assert_eq!(trailing_window(&graph, &trail, Some(10000)), trail);
        assert!(trailing_window(&graph, &[], Some(50)).is_empty());
    }

    #[test]
    fn test_short_trails_always_valid() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        for kmer in [1, 50, 150, 100000] {
            let validator = RecoherenceValidator::new(&graph, kmer, 5);
            assert!(validator.validate(&[]));
            assert!(validator.validate(&t("1+")));
            assert!(validator.validate(&t("1+,5+")));
            assert_eq!(validator.confirming_reads(&t("1+,5+")), None);
        }
    }

    #[test]
    fn test_long_kmer_resolves_fork() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        let validator = RecoherenceValidator::new(&graph, 150, 1);
        assert_eq!(validator.confirming_reads(&t("1+,2+,3+")), Some(2));
        assert_eq!(validator.confirming_reads(&t("1+,5+,3+")), Some(0));
        assert!(validator.validate(&t("1+,2+,3+")));
        assert!(!validator.validate(&t("1+,5+,3+")));
    }

    #[test]
    fn test_short_kmer_does_not_resolve_fork() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        let validator = RecoherenceValidator::new(&graph, 50, 1);
        assert!(validator.validate(&t("1+,2+,3+")));
        assert!(validator.validate(&t("1+,5+,3+")));
    }

    #[test]
    fn test_single_node_window() {
        // Node 2 alone covers a k-mer of 400 and shares no reads with its neighbours. A window of
        // one node is adjacent to the last node, so the junction is taken as read-supported.
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 500, 10.0)
                                             .node(3, 100, 10.0).arc(1, 2).arc(2, 3)
                                             .read(1, 1, 10, 0).read(2, 2, 10, 0)
                                             .read(3, 3, 10, 0).build();
        let validator = RecoherenceValidator::new(&graph, 400, 1);
        assert_eq!(validator.window(&t("1+,2+")), t("2+"));
        assert_eq!(validator.confirming_reads(&t("1+,2+,3+")), None);
        assert!(validator.validate(&t("1+,2+,3+")));

        // Once the window reaches back to node 1, the missing reads count.
        let validator = RecoherenceValidator::new(&graph, 600, 1);
        assert_eq!(validator.confirming_reads(&t("1+,2+,3+")), Some(0));
        assert!(!validator.validate(&t("1+,2+,3+")));
    }

    #[test]
    fn test_min_confirming_reads() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        assert!(RecoherenceValidator::new(&graph, 150, 2).validate(&t("1+,2+,3+")));
        assert!(!RecoherenceValidator::new(&graph, 150, 3).validate(&t("1+,2+,3+")));
    }

    #[test]
    fn test_from_settings() {
        let graph = Graph::from_velvet_lines(&get_read_graph()).unwrap();
        let mut settings = SearchSettings::default();
        assert!(RecoherenceValidator::from_settings(&graph, &settings).is_none());
        settings.recoherence_kmer = Some(150);
        settings.min_confirming_recoherence_reads = 2;
        let validator = RecoherenceValidator::from_settings(&graph, &settings).unwrap();
        assert_eq!((validator.kmer, validator.min_confirming_reads), (150, 2));
    }
}
