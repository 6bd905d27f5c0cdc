// This file contains leashed depth-first traversals: the graph explorer, which walks out from a
// trail and reports how each branch ended, and the acyclic connection finder, which records the
// fragments of every walk that reaches a terminal node and then stitches them back together.

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
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::dp::TrailSet;
use crate::graph::Graph;
use crate::oriented::{distinct_neighbours_of, OrientedNode, OrientedTrail};
use crate::settings::SearchSettings;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationType {
    Leashed,
    DeadEnd,
    Loop,
    Terminal,
}

impl fmt::Display for TerminationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminationType::Leashed => "leashed",
            TerminationType::DeadEnd => "dead_end",
            TerminationType::Loop => "loop",
            TerminationType::Terminal => "terminal",
        };
        write!(f, "{}", text)
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct ExploredPath {
    pub trail: OrientedTrail,
    pub termination: TerminationType,
}


#[derive(Debug, Default)]
pub struct Exploration {
    pub paths: Vec<ExploredPath>,
    pub truncated: bool,
}

impl Exploration {
    pub fn count(&self, termination: TerminationType) -> usize {
        self.paths.iter().filter(|p| p.termination == termination).count()
    }
}


pub struct GraphExplorer<'a> {
    graph: &'a Graph,
    leash: Option<u64>,
    max_cycles: usize,
    max_explore_nodes: Option<usize>,
    terminals: FxHashSet<OrientedNode>,
}

impl<'a> GraphExplorer<'a> {
    pub fn new(graph: &'a Graph, settings: &SearchSettings) -> Self {
        GraphExplorer { graph, leash: settings.leash_length, max_cycles: settings.max_cycles.max(1),
                        max_explore_nodes: settings.max_explore_nodes,
                        terminals: FxHashSet::default() }
    }

    pub fn with_terminals(mut self, terminals: impl IntoIterator<Item = OrientedNode>) -> Self {
        self.terminals.extend(terminals);
        self
    }

    pub fn explore_from(&self, start: &OrientedTrail) -> Exploration {
        // Depth-first, with the lowest node ID explored first. A node already reached by another
        // branch at an equal or shorter distance isn't explored again.
        let mut exploration = Exploration::default();
        if start.is_empty() {
            return exploration;
        }
        let mut visited: FxHashMap<OrientedNode, u64> = FxHashMap::default();
        let mut stack = vec![start.clone()];
        let mut explored = 0;
        while let Some(trail) = stack.pop() {
            let Some(last) = trail.last() else { continue };
            let distance = trail.distance(self.graph);
            let earlier = trail.trail[..trail.len() - 1].iter().filter(|&&o| o == last).count();
            if earlier == 0 {
                if visited.get(&last).is_some_and(|&d| d <= distance) {
                    continue;
                }
                visited.insert(last, distance);
            }
            explored += 1;
            if self.max_explore_nodes.is_some_and(|max| explored > max) {
                exploration.truncated = true;
                break;
            }
            let termination = if self.leash.is_some_and(|leash| distance > leash) {
                Some(TerminationType::Leashed)
            } else if self.terminals.contains(&last) && trail.len() > 1 {
                Some(TerminationType::Terminal)
            } else {
                None
            };
            if let Some(termination) = termination {
                exploration.paths.push(ExploredPath { trail, termination });
                continue;
            }
            let neighbours = distinct_neighbours_of(self.graph, last);
            if neighbours.is_empty() {
                exploration.paths.push(ExploredPath { trail,
                                                      termination: TerminationType::DeadEnd });
                continue;
            }
            if earlier >= self.max_cycles {
                exploration.paths.push(ExploredPath { trail, termination: TerminationType::Loop });
                continue;
            }
            for neighbour in neighbours.into_iter().rev() {
                stack.push(trail.extended(neighbour));
            }
        }
        debug!("explored {} node{} from {}: {} leashed, {} dead ends, {} loops", explored,
               if explored == 1 { "" } else { "s" }, start,
               exploration.count(TerminationType::Leashed),
               exploration.count(TerminationType::DeadEnd),
               exploration.count(TerminationType::Loop));
        exploration
    }
}


/// Finds trails between two oriented nodes in two passes. The forward pass is a leashed walk
/// which records, for every node it reaches, the nodes it was reached from. The backward pass
/// then starts at the terminal and follows those records back to the origin, so only fragments
/// that actually lead to the terminal are ever turned into trails.
pub struct AcyclicConnectionFinder<'a> {
    graph: &'a Graph,
    leash: Option<u64>,
    max_paths: usize,
    max_explore_nodes: Option<usize>,
}

impl<'a> AcyclicConnectionFinder<'a> {
    pub fn new(graph: &'a Graph, settings: &SearchSettings) -> Self {
        AcyclicConnectionFinder { graph, leash: settings.leash_length,
                                  max_paths: settings.max_gapfill_paths,
                                  max_explore_nodes: settings.max_explore_nodes }
    }

    fn within_leash(&self, distance: u64) -> bool {
        self.leash.map_or(true, |leash| distance <= leash)
    }

    pub fn find_trails_between(&self, start: OrientedNode, terminal: OrientedNode) -> TrailSet {
        let mut result = TrailSet::default();
        let (best, predecessors, truncated) = self.record_fragments(start, terminal);
        result.exploration_truncated = truncated;
        if !best.contains_key(&terminal) {
            return result;
        }
        self.stitch(start, terminal, &best, &predecessors, &mut result);
        result
    }

    fn record_fragments(&self, start: OrientedNode, terminal: OrientedNode)
            -> (FxHashMap<OrientedNode, u64>, FxHashMap<OrientedNode, BTreeSet<OrientedNode>>,
                bool) {
        let mut best: FxHashMap<OrientedNode, u64> = FxHashMap::default();
        let mut predecessors: FxHashMap<OrientedNode, BTreeSet<OrientedNode>> =
            FxHashMap::default();
        best.insert(start, 0);
        let mut stack = vec![(start, 0)];
        let mut explored = 0;
        while let Some((onode, distance)) = stack.pop() {
            if best.get(&onode).is_some_and(|&d| distance > d) {
                continue;  // a shorter arrival has been expanded since this was pushed
            }
            explored += 1;
            if self.max_explore_nodes.is_some_and(|max| explored > max) {
                return (best, predecessors, true);
            }
            if onode == terminal {
                continue;
            }
            for neighbour in distinct_neighbours_of(self.graph, onode).into_iter().rev() {
                let next_distance = distance + neighbour.length(self.graph);
                if !self.within_leash(next_distance) {
                    continue;
                }
                predecessors.entry(neighbour).or_default().insert(onode);
                if best.get(&neighbour).map_or(true, |&d| next_distance < d) {
                    best.insert(neighbour, next_distance);
                    stack.push((neighbour, next_distance));
                }
            }
        }
        (best, predecessors, false)
    }

    fn stitch(&self, start: OrientedNode, terminal: OrientedNode,
              best: &FxHashMap<OrientedNode, u64>,
              predecessors: &FxHashMap<OrientedNode, BTreeSet<OrientedNode>>,
              result: &mut TrailSet) {
        let mut found: BTreeSet<OrientedTrail> = BTreeSet::new();
        let mut stack: Vec<(Vec<OrientedNode>, u64)> = vec![(vec![terminal], 0)];
        while let Some((reversed, suffix_length)) = stack.pop() {
            let Some(&current) = reversed.last() else { continue };
            if current == start {
                let trail = OrientedTrail::from_onodes(reversed.iter().rev().copied().collect());
                if self.within_leash(trail.distance(self.graph)) && !found.contains(&trail) {
                    if found.len() >= self.max_paths {
                        result.max_path_limit_exceeded = true;
                        break;
                    }
                    found.insert(trail);
                }
                if start == terminal {
                    continue;
                }
            }
            let Some(preds) = predecessors.get(&current) else { continue };
            let length = suffix_length + if current == start { 0 }
                                         else { current.length(self.graph) };
            for &pred in preds.iter().rev() {
                if reversed.contains(&pred) {
                    result.circular_paths_detected = true;
                    continue;
                }
                let lower_bound = best.get(&pred).copied().unwrap_or(u64::MAX);
                if !self.within_leash(lower_bound.saturating_add(length)) {
                    continue;
                }
                let mut next = reversed.clone();
                next.push(pred);
                stack.push((next, length));
            }
        }
        result.trails = found.into_iter().collect();
    }
}
