// This file contains the dynamic-programming path finder, which finds every trail between an
// initial oriented node and a terminal oriented node within the leash.

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
use std::collections::BTreeSet;

use crate::graph::Graph;
use crate::oriented::{distinct_neighbours_of, OrientedNode, OrientedTrail};
use crate::recoherence::{trailing_window, RecoherenceValidator};
use crate::settings::SearchSettings;


/// The result of a multi-path search. Running into a limit is reported with the flags rather than
/// as an error, so callers can decide whether to retry with looser settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrailSet {
    pub trails: Vec<OrientedTrail>,
    pub circular_paths_detected: bool,
    pub max_path_limit_exceeded: bool,
    pub exploration_truncated: bool,
}

impl TrailSet {
    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn print(&self, graph: &Graph) {
        for trail in &self.trails {
            println!("{}\t{}", trail, trail.length_in_bp(graph));
        }
        if self.circular_paths_detected {
            eprintln!("circular paths were detected and skipped");
        }
        if self.max_path_limit_exceeded {
            eprintln!("more paths exist than the maximum allowed");
        }
        if self.exploration_truncated {
            eprintln!("the search stopped early after exploring the maximum number of nodes");
        }
    }
}


type Key = Vec<OrientedNode>;

struct Problem {
    min_distance: u64,
    known_paths: Vec<OrientedTrail>,
    predecessor_keys: FxHashSet<Key>,
}

impl Problem {
    fn new(min_distance: u64) -> Self {
        Problem { min_distance, known_paths: Vec::new(), predecessor_keys: FxHashSet::default() }
    }

    fn record(&mut self, path: OrientedTrail, predecessor_key: Key) {
        // Paths arriving from the same predecessor state are interchangeable during backtracking,
        // so only the first is kept.
        if self.predecessor_keys.insert(predecessor_key) {
            self.known_paths.push(path);
        }
    }
}


pub struct PathsBetweenNodesFinder<'a> {
    graph: &'a Graph,
    leash: Option<u64>,
    max_paths: usize,
    max_explore_nodes: Option<usize>,
    recoherence: Option<RecoherenceValidator<'a>>,
}

impl<'a> PathsBetweenNodesFinder<'a> {
    pub fn new(graph: &'a Graph, settings: &SearchSettings) -> Self {
        PathsBetweenNodesFinder {
            graph,
            leash: settings.leash_length,
            max_paths: settings.max_gapfill_paths,
            max_explore_nodes: settings.max_explore_nodes,
            recoherence: RecoherenceValidator::from_settings(graph, settings),
        }
    }

    fn key(&self, trail: &[OrientedNode]) -> Key {
        trailing_window(self.graph, trail, self.recoherence.as_ref().map(|r| r.kmer))
    }

    fn over_leash(&self, distance: u64) -> bool {
        self.leash.is_some_and(|leash| distance > leash)
    }

    pub fn find_all_trails_between(&self, initial: &OrientedTrail, terminal: OrientedNode)
            -> TrailSet {
        let mut result = TrailSet::default();
        if initial.is_empty() {
            return result;
        }
        let (problems, terminal_problem, truncated) = self.explore(initial, terminal);
        result.exploration_truncated = truncated;
        let Some(terminal_problem) = terminal_problem else {
            debug!("no connection found from {} to {}", initial, terminal);
            return result;
        };
        self.backtrack(initial, &problems, &terminal_problem, &mut result);
        debug!("found {} trail{} from {} to {}", result.len(),
               if result.len() == 1 { "" } else { "s" }, initial, terminal);
        result
    }

    fn explore(&self, initial: &OrientedTrail, terminal: OrientedNode)
            -> (FxHashMap<Key, Problem>, Option<Problem>, bool) {
        // Forward pass. Every arrival within the leash is recorded, but a state is only expanded
        // on its first arrival or when a later arrival is strictly shorter, since the shorter
        // arrival may reach nodes that the leash cut off before.
        let mut problems: FxHashMap<Key, Problem> = FxHashMap::default();
        let mut terminal_problem: Option<Problem> = None;
        let mut stack = vec![initial.clone()];
        let mut explored = 0;
        while let Some(path) = stack.pop() {
            explored += 1;
            if self.max_explore_nodes.is_some_and(|max| explored > max) {
                debug!("path search truncated after {} nodes", explored - 1);
                return (problems, terminal_problem, true);
            }
            let Some(last) = path.last() else { continue };
            let distance = path.distance(self.graph);
            if self.over_leash(distance) {
                continue;
            }
            let predecessor_key = if path.len() > initial.len() {
                self.key(&path.trail[..path.len() - 1])
            } else {
                Vec::new()
            };
            if last == terminal {
                let problem = terminal_problem.get_or_insert_with(|| Problem::new(distance));
                problem.min_distance = problem.min_distance.min(distance);
                problem.record(path, predecessor_key);
                continue;
            }
            let key = self.key(&path.trail);
            let expand = match problems.get_mut(&key) {
                Some(problem) => {
                    let improved = distance < problem.min_distance;
                    if improved {
                        trace!("re-opening {:?}: {} -> {} bp", key, problem.min_distance, distance);
                        problem.min_distance = distance;
                    }
                    problem.record(path.clone(), predecessor_key);
                    improved
                }
                None => {
                    let mut problem = Problem::new(distance);
                    problem.record(path.clone(), predecessor_key);
                    problems.insert(key, problem);
                    true
                }
            };
            if expand {
                self.push_neighbours(&path, last, &mut stack);
            }
        }
        (problems, terminal_problem, false)
    }

    fn push_neighbours(&self, path: &OrientedTrail, last: OrientedNode,
                       stack: &mut Vec<OrientedTrail>) {
        // Pushed in reverse so the lowest node ID is explored first.
        for neighbour in distinct_neighbours_of(self.graph, last).into_iter().rev() {
            let next = path.extended(neighbour);
            if let Some(validator) = &self.recoherence {
                if !validator.validate(&next.trail) {
                    trace!("recoherence rejects {}", next);
                    continue;
                }
            }
            stack.push(next);
        }
    }

    fn backtrack(&self, initial: &OrientedTrail, problems: &FxHashMap<Key, Problem>,
                 terminal_problem: &Problem, result: &mut TrailSet) {
        // Backward pass: each known path contributes its last node to the suffix, then the
        // search continues from the known paths of its predecessor state. Known paths of the
        // initial trail's length can only be the initial trail itself, which completes a path.
        let mut found: BTreeSet<OrientedTrail> = BTreeSet::new();
        let mut stack: Vec<(&OrientedTrail, Vec<OrientedNode>, u64)> =
            terminal_problem.known_paths.iter().rev().map(|p| (p, Vec::new(), 0)).collect();
        while let Some((path, suffix, suffix_length)) = stack.pop() {
            if path.len() == initial.len() {
                let mut complete = path.clone();
                for &onode in suffix.iter().rev() {
                    complete.add_oriented(onode);
                }
                if self.over_leash(complete.distance(self.graph)) {
                    continue;
                }
                if !found.contains(&complete) {
                    if found.len() >= self.max_paths {
                        result.max_path_limit_exceeded = true;
                        break;
                    }
                    found.insert(complete);
                }
                continue;
            }
            let Some(last) = path.last() else { continue };
            if suffix.contains(&last) {
                result.circular_paths_detected = true;
                continue;
            }
            let mut new_suffix = suffix.clone();
            new_suffix.push(last);
            let new_suffix_length = suffix_length + last.length(self.graph);
            let predecessor_key = self.key(&path.trail[..path.len() - 1]);
            let Some(problem) = problems.get(&predecessor_key) else { continue };
            if self.over_leash(problem.min_distance + new_suffix_length) {
                continue;
            }
            for known in problem.known_paths.iter().rev() {
                stack.push((known, new_suffix.clone(), new_suffix_length));
            }
        }
        result.trails = found.into_iter().collect();
    }
}
