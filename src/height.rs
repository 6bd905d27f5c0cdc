// This file contains the height finder, which levels the part of the graph reachable from some
// starting oriented nodes: tips have height 0 and every other node sits one above its tallest
// child. Nodes on or above a cycle can't be levelled and are reported in cycle groups instead.

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
use std::collections::BTreeSet;

use crate::graph::Graph;
use crate::misc::plural;
use crate::oriented::{distinct_neighbours_of, OrientedNode};


#[derive(Debug, Default)]
pub struct Heights {
    pub roots: Vec<OrientedNode>,
    pub heights: FxHashMap<OrientedNode, usize>,
    pub children: FxHashMap<OrientedNode, Vec<OrientedNode>>,
    pub cycle_groups: Vec<Vec<OrientedNode>>,
}


pub fn find_heights(graph: &Graph, roots: &[OrientedNode]) -> Heights {
    let mut result = Heights { roots: roots.to_vec(), ..Default::default() };

    // Gather the reachable subgraph.
    let mut stack: Vec<OrientedNode> = roots.to_vec();
    let mut seen: FxHashSet<OrientedNode> = roots.iter().copied().collect();
    while let Some(onode) = stack.pop() {
        let children = distinct_neighbours_of(graph, onode);
        for &c in &children {
            if seen.insert(c) {
                stack.push(c);
            }
        }
        result.children.insert(onode, children);
    }

    // Level from the tips upward: a node is solved once all of its children are.
    let mut parents: FxHashMap<OrientedNode, Vec<OrientedNode>> = FxHashMap::default();
    let mut unsolved_children: FxHashMap<OrientedNode, usize> = FxHashMap::default();
    for (&onode, children) in &result.children {
        unsolved_children.insert(onode, children.len());
        for &c in children {
            parents.entry(c).or_default().push(onode);
        }
    }
    let mut ready: Vec<OrientedNode> = unsolved_children.iter().filter(|(_, &n)| n == 0)
                                                        .map(|(&o, _)| o).collect();
    ready.sort();
    while let Some(onode) = ready.pop() {
        let height = result.children[&onode].iter().filter_map(|c| result.heights.get(c))
                                                   .max().map_or(0, |h| h + 1);
        result.heights.insert(onode, height);
        for &p in parents.get(&onode).into_iter().flatten() {
            if let Some(n) = unsolved_children.get_mut(&p) {
                *n -= 1;
                if *n == 0 {
                    ready.push(p);
                }
            }
        }
    }

    result.cycle_groups = group_unsolved(&result);
    debug!("levelled {} of {} nodes, {} cycle group{}", result.heights.len(),
           result.children.len(), result.cycle_groups.len(), plural(result.cycle_groups.len()));
    result
}


fn group_unsolved(heights: &Heights) -> Vec<Vec<OrientedNode>> {
    // Unsolved nodes joined by an arc (in either direction) go in the same group.
    let unsolved: BTreeSet<OrientedNode> = heights.children.keys()
        .filter(|o| !heights.heights.contains_key(o)).copied().collect();
    let mut links: FxHashMap<OrientedNode, Vec<OrientedNode>> = FxHashMap::default();
    for o in &unsolved {
        for c in heights.children[o].iter().filter(|c| unsolved.contains(c)) {
            links.entry(*o).or_default().push(*c);
            links.entry(*c).or_default().push(*o);
        }
    }
    let mut visited = FxHashSet::default();
    let mut groups = Vec::new();
    for &o in &unsolved {
        if visited.contains(&o) {
            continue;
        }
        let mut group = Vec::new();
        let mut stack = vec![o];
        while let Some(current) = stack.pop() {
            if visited.insert(current) {
                group.push(current);
                for &n in links.get(&current).into_iter().flatten() {
                    stack.push(n);
                }
            }
        }
        group.sort();
        groups.push(group);
    }
    groups
}


impl Heights {
    pub fn max_height(&self) -> Option<usize> {
        self.heights.values().max().copied()
    }

    pub fn is_tip(&self, onode: OrientedNode) -> bool {
        self.heights.get(&onode) == Some(&0)
    }

    fn ascending(&self) -> Vec<OrientedNode> {
        let mut nodes: Vec<OrientedNode> = self.heights.keys().copied().collect();
        nodes.sort_by_key(|o| (self.heights[o], *o));
        nodes
    }

    fn solved_children(&self, onode: OrientedNode) -> impl Iterator<Item = &OrientedNode> {
        self.children.get(&onode).into_iter().flatten()
            .filter(|c| self.heights.contains_key(c))
    }

    /// The number of distinct root-to-tip paths through the levelled part of the graph.
    pub fn max_paths_through(&self) -> u64 {
        let mut paths: FxHashMap<OrientedNode, u64> = FxHashMap::default();
        for onode in self.ascending() {
            let count = if self.heights[&onode] == 0 { 1 } else {
                self.solved_children(onode).map(|c| paths[c])
                                           .fold(0u64, |a, b| a.saturating_add(b))
            };
            paths.insert(onode, count);
        }
        self.roots.iter().filter_map(|r| paths.get(r))
                  .fold(0u64, |a, &b| a.saturating_add(b))
    }

    /// A lower bound on the number of paths needed to cover every levelled node: at least one per
    /// root, and at least one per child at any fork.
    pub fn min_paths_through(&self) -> usize {
        let mut needed: FxHashMap<OrientedNode, usize> = FxHashMap::default();
        for onode in self.ascending() {
            let children: Vec<&OrientedNode> = self.solved_children(onode).collect();
            let from_children = children.iter().map(|c| needed[*c]).max().unwrap_or(1);
            needed.insert(onode, from_children.max(children.len()));
        }
        let from_roots = self.roots.iter().filter_map(|r| needed.get(r)).max().copied()
                             .unwrap_or(0);
        from_roots.max(self.roots.len())
    }
}
