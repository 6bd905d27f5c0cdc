// This file contains the bubble finder. From a fork, each outgoing branch is extended in turn
// (closest first) until every branch has merged back into one, at which point the bubble closes
// at the first node shared by all of its paths.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use fxhash::FxHashSet;
use log::{debug, trace};
use std::collections::BTreeSet;
use std::fmt;

use crate::graph::Graph;
use crate::height::find_heights;
use crate::oriented::{distinct_neighbours_of, OrientedNode, OrientedTrail};
use crate::settings::SearchSettings;


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bubble {
    pub fork: OrientedNode,
    pub convergence: OrientedNode,

    // Every alternative route, each running from the fork to the convergence node inclusive.
    pub paths: Vec<OrientedTrail>,

    // The nodes strictly between the fork and the convergence node.
    pub members: BTreeSet<OrientedNode>,
}

impl Bubble {
    pub fn interior(&self, path_index: usize) -> &[OrientedNode] {
        let trail = &self.paths[path_index].trail;
        &trail[1..trail.len() - 1]
    }

    pub fn width(&self) -> usize {
        self.paths.len()
    }
}

impl fmt::Display for Bubble {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let alternatives: Vec<String> = (0..self.paths.len()).map(|i| {
            self.interior(i).iter().map(|o| o.to_string()).collect::<Vec<_>>().join(",")
        }).collect();
        write!(f, "{{{}}}", alternatives.join("|"))
    }
}


// All the paths in a branch end at the same node. A stalled branch has hit a dead end, which is
// fine as long as every other branch eventually joins it.
struct Branch {
    paths: Vec<OrientedTrail>,
    distance: u64,
    stalled: bool,
}

impl Branch {
    fn last(&self) -> Option<OrientedNode> {
        self.paths.first().and_then(|p| p.last())
    }

    fn contains(&self, onode: &OrientedNode) -> bool {
        self.paths.iter().any(|p| p.contains(onode))
    }
}


pub struct BubbleFinder<'a> {
    graph: &'a Graph,
    leash: Option<u64>,
    max_paths: usize,
}

impl<'a> BubbleFinder<'a> {
    pub fn new(graph: &'a Graph, settings: &SearchSettings) -> Self {
        BubbleFinder { graph, leash: settings.leash_length,
                       max_paths: settings.max_gapfill_paths.max(2) }
    }

    pub fn bubble_from(&self, fork: OrientedNode) -> Option<Bubble> {
        let neighbours = distinct_neighbours_of(self.graph, fork);
        self.bubble_from_neighbours(fork, &neighbours)
    }

    /// Tries to close a bubble using only the given neighbours of the fork. Returns None if the
    /// branches dead-end apart, loop back on themselves, pass the leash or split into too many
    /// paths.
    pub fn bubble_from_neighbours(&self, fork: OrientedNode, neighbours: &[OrientedNode])
            -> Option<Bubble> {
        let mut starts = neighbours.to_vec();
        starts.sort();
        starts.dedup();
        if starts.len() < 2 || starts.contains(&fork) {
            return None;
        }
        let mut branches: Vec<Branch> = starts.into_iter().map(|n| {
            Branch { paths: vec![OrientedTrail::from_onodes(vec![fork, n])],
                     distance: n.length(self.graph), stalled: false }
        }).collect();
        if !self.within_limits(&branches) {
            return None;
        }

        while branches.len() > 1 {
            let Some(i) = (0..branches.len()).filter(|&i| !branches[i].stalled)
                                             .min_by_key(|&i| (branches[i].distance,
                                                               branches[i].last())) else {
                trace!("bubble from {}: every branch dead-ends", fork);
                return None;
            };
            let last = branches[i].last()?;
            let next = distinct_neighbours_of(self.graph, last);
            if next.is_empty() {
                branches[i].stalled = true;
                continue;
            }
            let branch = branches.swap_remove(i);
            for n in next {
                if branch.contains(&n) {
                    trace!("bubble from {}: cycle through {}", fork, n);
                    return None;
                }
                let mut paths: Vec<OrientedTrail> = branch.paths.iter().map(|p| p.extended(n))
                                                                .collect();
                // If another branch already passed through this node, follow it the rest of the
                // way and the two branches become one.
                if let Some(j) = branches.iter().position(|b| b.contains(&n)) {
                    let suffixes: BTreeSet<Vec<OrientedNode>> = branches[j].paths.iter()
                        .filter_map(|p| p.trail.iter().position(|&o| o == n)
                                                      .map(|k| p.trail[k + 1..].to_vec()))
                        .collect();
                    paths = paths.iter().flat_map(|p| suffixes.iter().map(move |s| {
                        let mut joined = p.clone();
                        joined.trail.extend_from_slice(s);
                        joined
                    })).collect();
                    if paths.iter().any(has_repeat) {
                        trace!("bubble from {}: cycle while joining at {}", fork, n);
                        return None;
                    }
                    branches[j].paths.extend(paths);
                    branches[j].paths.sort();
                    branches[j].paths.dedup();
                    branches[j].distance = self.min_distance(&branches[j].paths);
                } else {
                    let distance = self.min_distance(&paths);
                    branches.push(Branch { paths, distance, stalled: false });
                }
            }
            if !self.within_limits(&branches) {
                return None;
            }
        }

        let paths = branches.pop()?.paths;
        let bubble = close_bubble(fork, paths)?;
        debug!("bubble from {} closed at {}: {}", fork, bubble.convergence, bubble);
        Some(bubble)
    }

    fn min_distance(&self, paths: &[OrientedTrail]) -> u64 {
        paths.iter().map(|p| p.distance(self.graph)).min().unwrap_or(0)
    }

    fn within_limits(&self, branches: &[Branch]) -> bool {
        let path_count: usize = branches.iter().map(|b| b.paths.len()).sum();
        if path_count > self.max_paths {
            trace!("bubble abandoned: {} paths", path_count);
            return false;
        }
        if let Some(leash) = self.leash {
            if branches.iter().any(|b| b.distance > leash) {
                trace!("bubble abandoned: leash of {} bp exceeded", leash);
                return false;
            }
        }
        true
    }
}


fn has_repeat(trail: &OrientedTrail) -> bool {
    let mut seen = FxHashSet::default();
    trail.iter().any(|o| !seen.insert(*o))
}


fn close_bubble(fork: OrientedNode, paths: Vec<OrientedTrail>) -> Option<Bubble> {
    // The convergence node is the first node of the longest suffix common to every path. Paths
    // are then cut back to end there.
    let shortest = paths.iter().map(|p| p.len()).min()?;
    let mut common = 0;
    while common < shortest {
        let onode = paths[0].trail[paths[0].len() - 1 - common];
        if paths.iter().all(|p| p.trail[p.len() - 1 - common] == onode) {
            common += 1;
        } else {
            break;
        }
    }
    if common == 0 || common == shortest {
        return None;
    }
    let convergence = paths[0].trail[paths[0].len() - common];
    let mut cut: Vec<OrientedTrail> = paths.into_iter().map(|p| {
        let keep = p.len() - common + 1;
        OrientedTrail::from_onodes(p.trail[..keep].to_vec())
    }).collect();
    cut.sort();
    cut.dedup();
    if cut.len() < 2 {
        return None;
    }
    let members = cut.iter().flat_map(|p| p.trail[1..p.len() - 1].iter().copied()).collect();
    Some(Bubble { fork, convergence, paths: cut, members })
}


/// Finds every bubble that opens at a fork reachable from the given oriented nodes. Nested and
/// overlapping bubbles are all reported.
pub fn find_bubbles(graph: &Graph, starts: &[OrientedNode], settings: &SearchSettings)
        -> Vec<Bubble> {
    let heights = find_heights(graph, starts);
    let finder = BubbleFinder::new(graph, settings);
    let mut forks: Vec<OrientedNode> = heights.children.iter().filter(|(_, c)| c.len() > 1)
                                                        .map(|(&o, _)| o).collect();
    forks.sort();
    forks.into_iter().filter_map(|fork| finder.bubble_from(fork)).collect()
}
