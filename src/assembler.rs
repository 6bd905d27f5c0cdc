// This file contains the greedy assemblers. Both walk forward from a starting trail for as long as
// the way on is clear, using the fork resolver to whittle down the choices at each fork. The
// single-ended assembler stops at any fork it can't resolve, while the bubbly assembler steps over
// bubbles and carries on from where their branches meet.

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
use serde::Serialize;
use std::fmt;

use crate::bubble::{Bubble, BubbleFinder};
use crate::distance::PairedEndNeighbourFinder;
use crate::graph::Graph;
use crate::oriented::{distinct_neighbours_of, OrientedNode, OrientedTrail};
use crate::recoherence::RecoherenceValidator;
use crate::settings::SearchSettings;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    DeadEnd,
    IrreducibleFork,
    Leashed,
    Circular,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationReason::DeadEnd => "dead_end",
            TerminationReason::IrreducibleFork => "irreducible_fork",
            TerminationReason::Leashed => "leashed",
            TerminationReason::Circular => "circular",
        };
        write!(f, "{}", text)
    }
}


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetapathElement {
    Node(OrientedNode),
    Bubble(Bubble),
}

impl fmt::Display for MetapathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetapathElement::Node(onode) => write!(f, "{}", onode),
            MetapathElement::Bubble(bubble) => write!(f, "{}", bubble),
        }
    }
}


#[derive(Debug, Clone)]
pub struct Metapath {
    pub elements: Vec<MetapathElement>,
    pub termination: TerminationReason,
    pub distance: u64,
}

impl Metapath {
    pub fn bubble_count(&self) -> usize {
        self.elements.iter().filter(|e| matches!(e, MetapathElement::Bubble(_))).count()
    }

    /// A plain trail through the metapath, taking the first route through each bubble.
    pub fn representative_trail(&self) -> OrientedTrail {
        let mut trail = OrientedTrail::new();
        for element in &self.elements {
            match element {
                MetapathElement::Node(onode) => trail.add_oriented(*onode),
                MetapathElement::Bubble(bubble) => {
                    if let Some(path) = bubble.paths.first() {
                        for onode in &path.trail[1..path.len() - 1] {
                            trail.add_oriented(*onode);
                        }
                    }
                }
            }
        }
        trail
    }
}

impl fmt::Display for Metapath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.elements.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}


/// Returns true if every walk from this oriented node (counting the node itself) dead-ends
/// within the given length. Anything that loops is not a tip.
pub fn is_short_tip(graph: &Graph, onode: OrientedNode, max_tip_length: i64) -> bool {
    if max_tip_length < 0 {
        return false;
    }
    let max = max_tip_length as u64;
    let mut stack: Vec<(Vec<OrientedNode>, u64)> = vec![(vec![onode], onode.length(graph))];
    while let Some((walk, length)) = stack.pop() {
        if length > max {
            return false;
        }
        let Some(&last) = walk.last() else { continue };
        for next in distinct_neighbours_of(graph, last) {
            if walk.contains(&next) {
                return false;
            }
            let mut extended = walk.clone();
            extended.push(next);
            stack.push((extended, length + next.length(graph)));
        }
    }
    true
}


/// Narrows down the neighbours at a fork. Each step only applies when it leaves at least one
/// neighbour: short tips are clipped, then recoherence, then paired-end votes, then the coverage
/// ceiling.
pub struct ForkResolver<'a> {
    graph: &'a Graph,
    max_tip_length: i64,
    max_coverage_at_fork: Option<f64>,
    validator: Option<RecoherenceValidator<'a>>,
    paired: Option<PairedEndNeighbourFinder<'a>>,
}

impl<'a> ForkResolver<'a> {
    pub fn new(graph: &'a Graph, settings: &SearchSettings) -> Self {
        ForkResolver { graph, max_tip_length: settings.max_tip_length,
                       max_coverage_at_fork: settings.max_coverage_at_fork,
                       validator: RecoherenceValidator::from_settings(graph, settings),
                       paired: None }
    }

    pub fn with_paired(mut self, paired: PairedEndNeighbourFinder<'a>) -> Self {
        self.paired = Some(paired);
        self
    }

    pub fn resolve(&self, context: &[OrientedNode], neighbours: &[OrientedNode])
            -> Vec<OrientedNode> {
        let mut remaining = neighbours.to_vec();
        if remaining.len() < 2 {
            return remaining;
        }
        remaining = keep_some(remaining, |&n| !is_short_tip(self.graph, n, self.max_tip_length));
        if remaining.len() < 2 {
            trace!("fork after {:?} resolved by clipping tips", context.last());
            return remaining;
        }
        if let Some(validator) = &self.validator {
            remaining = keep_some(remaining, |&n| {
                let mut extended = context.to_vec();
                extended.push(n);
                validator.validate(&extended)
            });
            if remaining.len() < 2 {
                trace!("fork after {:?} resolved by recoherence", context.last());
                return remaining;
            }
        }
        if let Some(winner) = self.paired_vote(context, &remaining) {
            trace!("fork after {:?} resolved by read pairs", context.last());
            return vec![winner];
        }
        if let Some(ceiling) = self.max_coverage_at_fork {
            remaining = keep_some(remaining, |n| {
                self.graph.node(n.node_id).map_or(true, |node| node.coverage() <= ceiling)
            });
        }
        remaining
    }

    fn paired_vote(&self, context: &[OrientedNode], candidates: &[OrientedNode])
            -> Option<OrientedNode> {
        // Reads on the last insert's worth of the context vote for a neighbour if their mate sits
        // on it. A single clear winner takes the fork.
        let paired = self.paired.as_ref()?;
        let mut votes: FxHashMap<OrientedNode, usize> = FxHashMap::default();
        let mut covered = 0;
        for onode in context.iter().rev() {
            let Some(node) = self.graph.node(onode.node_id) else { continue };
            for read in node.short_reads.iter().filter(|r| r.direction == onode.starts_at_start()) {
                let Some(mate_id) = paired.oracle.pair_id(read.read_id) else { continue };
                let mate_nodes = paired.read_to_node.nodes_of(mate_id);
                for c in candidates.iter().filter(|c| mate_nodes.contains(&c.node_id)) {
                    *votes.entry(*c).or_insert(0) += 1;
                }
            }
            covered += node.length as u64;
            if covered >= paired.insert_size {
                break;
            }
        }
        let best = votes.values().copied().max().filter(|&v| v > 0)?;
        let winners: Vec<OrientedNode> = votes.iter().filter(|(_, &v)| v == best)
                                              .map(|(&o, _)| o).collect();
        if winners.len() == 1 { Some(winners[0]) } else { None }
    }
}


fn keep_some<F>(onodes: Vec<OrientedNode>, keep: F) -> Vec<OrientedNode>
        where F: Fn(&OrientedNode) -> bool {
    let kept: Vec<OrientedNode> = onodes.iter().copied().filter(|o| keep(o)).collect();
    if kept.is_empty() { onodes } else { kept }
}


fn walk(graph: &Graph, resolver: &ForkResolver, bubbles: Option<&BubbleFinder>,
        leash: Option<u64>, start: &OrientedTrail) -> Metapath {
    let mut elements: Vec<MetapathElement> = start.iter().map(|&o| MetapathElement::Node(o))
                                                  .collect();
    let mut visited: FxHashSet<OrientedNode> = start.iter().copied().collect();
    let mut context: Vec<OrientedNode> = start.trail.clone();
    let mut distance = 0;
    let termination = loop {
        let Some(&last) = context.last() else { break TerminationReason::DeadEnd };
        let neighbours = distinct_neighbours_of(graph, last);
        if neighbours.is_empty() {
            break TerminationReason::DeadEnd;
        }
        let choices = resolver.resolve(&context, &neighbours);
        if choices.len() == 1 {
            let next = choices[0];
            if visited.contains(&next) {
                break TerminationReason::Circular;
            }
            let next_distance = distance + next.length(graph);
            if leash.is_some_and(|l| next_distance > l) {
                break TerminationReason::Leashed;
            }
            distance = next_distance;
            visited.insert(next);
            context.push(next);
            elements.push(MetapathElement::Node(next));
            continue;
        }
        let Some(bubble) = bubbles.and_then(|b| b.bubble_from_neighbours(last, &choices)) else {
            debug!("stopping at irreducible fork after {}: {:?}", last, choices);
            break TerminationReason::IrreducibleFork;
        };
        if bubble.members.iter().chain([&bubble.convergence]).any(|o| visited.contains(o)) {
            break TerminationReason::Circular;
        }
        let across = bubble.paths.iter().map(|p| p.distance(graph)).min().unwrap_or(0);
        if leash.is_some_and(|l| distance + across > l) {
            break TerminationReason::Leashed;
        }
        distance += across;
        visited.extend(bubble.members.iter().copied());
        visited.insert(bubble.convergence);

        // Reads can't be trusted to say which branch was taken, so context restarts after it.
        context = vec![bubble.convergence];
        let convergence = bubble.convergence;
        elements.push(MetapathElement::Bubble(bubble));
        elements.push(MetapathElement::Node(convergence));
    };
    let metapath = Metapath { elements, termination, distance };
    debug!("assembled {} ({})", metapath, metapath.termination);
    metapath
}


pub struct SingleEndedAssembler<'a> {
    graph: &'a Graph,
    resolver: ForkResolver<'a>,
    leash: Option<u64>,
}

impl<'a> SingleEndedAssembler<'a> {
    pub fn new(graph: &'a Graph, resolver: ForkResolver<'a>, settings: &SearchSettings) -> Self {
        SingleEndedAssembler { graph, resolver, leash: settings.leash_length }
    }

    pub fn assemble_from(&self, start: &OrientedTrail) -> Metapath {
        walk(self.graph, &self.resolver, None, self.leash, start)
    }
}


pub struct BubblyAssembler<'a> {
    graph: &'a Graph,
    resolver: ForkResolver<'a>,
    bubble_finder: BubbleFinder<'a>,
    leash: Option<u64>,
}

impl<'a> BubblyAssembler<'a> {
    pub fn new(graph: &'a Graph, resolver: ForkResolver<'a>, settings: &SearchSettings) -> Self {
        // The leash bounds the whole walk, not each bubble, so bubbles get their own copy unleashed.
        let bubble_settings = SearchSettings { leash_length: None, ..settings.clone() };
        BubblyAssembler { graph, resolver, bubble_finder: BubbleFinder::new(graph, &bubble_settings),
                          leash: settings.leash_length }
    }

    pub fn assemble_from(&self, start: &OrientedTrail) -> Metapath {
        walk(self.graph, &self.resolver, Some(&self.bubble_finder), self.leash, start)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::{ReadToNode, SequentialPairs};
    use crate::test_graphs::*;

    fn o(text: &str) -> OrientedNode {
        OrientedNode::parse(text).unwrap()
    }

    fn t(text: &str) -> OrientedTrail {
        OrientedTrail::parse(text).unwrap()
    }

    fn node_elements(metapath: &Metapath) -> Vec<OrientedNode> {
        metapath.elements.iter().filter_map(|e| match e {
            MetapathElement::Node(o) => Some(*o),
            MetapathElement::Bubble(_) => None,
        }).collect()
    }

    fn no_tips() -> SearchSettings {
        SearchSettings { max_tip_length: -1, ..Default::default() }
    }

    #[test]
    fn test_short_tips() {
        let graph = Graph::from_velvet_lines(&get_tangled_graph()).unwrap();
        assert!(is_short_tip(&graph, o("8+"), 100));
        assert!(is_short_tip(&graph, o("8+"), 20));
        assert!(!is_short_tip(&graph, o("8+"), 19));
        assert!(!is_short_tip(&graph, o("8+"), -1));
        assert!(!is_short_tip(&graph, o("4+"), 100));
        assert!(is_short_tip(&graph, o("4+"), 220));

        let graph = Graph::from_velvet_lines(&get_cyclic_graph()).unwrap();
        assert!(!is_short_tip(&graph, o("2+"), 10_000));
        assert!(is_short_tip(&graph, o("4+"), 100));
    }

    #[test]
    fn test_bubbly_assembly_of_bubble() {
        let graph = Graph::from_velvet_lines(&get_bubble_graph()).unwrap();
        let settings = no_tips();
        let assembler = BubblyAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                             &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.elements.len(), 3);
        assert_eq!(metapath.elements[0], MetapathElement::Node(o("1+")));
        let MetapathElement::Bubble(bubble) = &metapath.elements[1] else {
            panic!("expected a bubble")
        };
        assert_eq!(bubble.paths, vec![t("1+,2+,4+"), t("1+,3+,4+")]);
        assert_eq!(metapath.elements[2], MetapathElement::Node(o("4+")));
        assert_eq!(metapath.to_string(), "1+,{2+|3+},4+");
        assert_eq!(metapath.termination, TerminationReason::DeadEnd);
        assert_eq!(metapath.distance, 200);
        assert_eq!(metapath.bubble_count(), 1);
        assert_eq!(metapath.representative_trail(), t("1+,2+,4+"));
    }

    #[test]
    fn test_single_ended_stops_at_fork() {
        let graph = Graph::from_velvet_lines(&get_bubble_graph()).unwrap();
        let settings = no_tips();
        let assembler = SingleEndedAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                                  &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(node_elements(&metapath), vec![o("1+")]);
        assert_eq!(metapath.termination, TerminationReason::IrreducibleFork);

        let metapath = assembler.assemble_from(&t("2+"));
        assert_eq!(metapath.to_string(), "2+,4+");
        assert_eq!(metapath.termination, TerminationReason::DeadEnd);
    }

    #[test]
    fn test_bubbly_assembly_with_tips() {
        // The tip off 3 is clipped, and the tip off 7 is followed since it's the only way on.
        let graph = Graph::from_velvet_lines(&get_tangled_graph()).unwrap();
        let settings = SearchSettings::default();
        let assembler = BubblyAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                             &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.to_string(), "1+,{2+|6+},3+,{4+|5+},7+,9+");
        assert_eq!(metapath.termination, TerminationReason::DeadEnd);
        assert_eq!(metapath.distance, 420);
        assert_eq!(metapath.representative_trail(), t("1+,2+,3+,4+,7+,9+"));

        // Without clipping, the tip at 3 makes that fork irreducible.
        let settings = no_tips();
        let assembler = BubblyAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                             &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.to_string(), "1+,{2+|6+},3+");
        assert_eq!(metapath.termination, TerminationReason::IrreducibleFork);
    }

    #[test]
    fn test_circular_and_leashed() {
        // 4 is a tip, so the walk goes back around to 2.
        let graph = Graph::from_velvet_lines(&get_cyclic_graph()).unwrap();
        let settings = SearchSettings::default();
        let assembler = SingleEndedAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                                  &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.to_string(), "1+,2+,3+");
        assert_eq!(metapath.termination, TerminationReason::Circular);

        let graph = Graph::from_velvet_lines(&get_linear_graph()).unwrap();
        let settings = SearchSettings { leash_length: Some(150), ..Default::default() };
        let assembler = SingleEndedAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                                  &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.to_string(), "1+,2+");
        assert_eq!(metapath.termination, TerminationReason::Leashed);
    }

    #[test]
    fn test_recoherence_resolves_fork() {
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0)
                                             .node(3, 100, 10.0).node(4, 100, 10.0)
                                             .arc(1, 2).arc(2, 3).arc(2, 4)
                                             .read(1, 7, 0, 0).read(2, 7, 0, 0).read(3, 7, 0, 0)
                                             .read(4, 8, 0, 0).build();
        let settings = no_tips();
        let assembler = SingleEndedAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                                  &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.to_string(), "1+,2+");
        assert_eq!(metapath.termination, TerminationReason::IrreducibleFork);

        let settings = SearchSettings { recoherence_kmer: Some(150), ..no_tips() };
        let assembler = SingleEndedAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                                  &settings);
        let metapath = assembler.assemble_from(&t("1+"));
        assert_eq!(metapath.to_string(), "1+,2+,3+");
        assert_eq!(metapath.termination, TerminationReason::DeadEnd);
    }

    #[test]
    fn test_paired_vote() {
        // Two pairs link 1 to 2, one pair links 1 to 3.
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0)
                                             .node(3, 100, 10.0).arc(1, 2).arc(1, 3)
                                             .read(1, 1, 50, 0).read(-2, 2, 50, 0)
                                             .read(1, 3, 60, 0).read(-2, 4, 40, 0)
                                             .read(1, 5, 70, 0).read(-3, 6, 30, 0).build();
        let read_to_node = ReadToNode::from_graph(&graph);
        let settings = no_tips();
        let paired = PairedEndNeighbourFinder { oracle: &SequentialPairs,
                                                read_to_node: &read_to_node, insert_size: 300 };
        let resolver = ForkResolver::new(&graph, &settings).with_paired(paired);
        assert_eq!(resolver.resolve(&[o("1+")], &[o("2+"), o("3+")]), vec![o("2+")]);

        // Reads on the twin of 1 point the other way, so they don't vote.
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0)
                                             .node(3, 100, 10.0).arc(1, 2).arc(1, 3)
                                             .read(-1, 1, 50, 0).read(-2, 2, 50, 0).build();
        let read_to_node = ReadToNode::from_graph(&graph);
        let paired = PairedEndNeighbourFinder { oracle: &SequentialPairs,
                                                read_to_node: &read_to_node, insert_size: 300 };
        let resolver = ForkResolver::new(&graph, &settings).with_paired(paired);
        assert_eq!(resolver.resolve(&[o("1+")], &[o("2+"), o("3+")]).len(), 2);
    }

    #[test]
    fn test_coverage_ceiling() {
        let graph = LastGraphBuilder::new(31).node(1, 100, 10.0).node(2, 100, 10.0)
                                             .node(3, 100, 30.0).node(4, 100, 10.0)
                                             .arc(1, 2).arc(1, 3).arc(2, 4).arc(3, 4).build();
        let settings = SearchSettings { max_coverage_at_fork: Some(20.0), ..no_tips() };
        let assembler = SingleEndedAssembler::new(&graph, ForkResolver::new(&graph, &settings),
                                                  &settings);
        assert_eq!(assembler.assemble_from(&t("1+")).to_string(), "1+,2+,4+");

        // A ceiling below everything filters nothing.
        let settings = SearchSettings { max_coverage_at_fork: Some(1.0), ..no_tips() };
        let resolver = ForkResolver::new(&graph, &settings);
        assert_eq!(resolver.resolve(&[o("1+")], &[o("2+"), o("3+")]).len(), 2);
    }
}
