// This file contains the single-coherent wanderer: a closest-first search whose states are
// trailing windows of nodes rather than single nodes, so every step can be checked for read
// support along the actual route taken.

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
use crate::probes::ProbedGraph;
use crate::recoherence::RecoherenceValidator;
use crate::settings::SearchSettings;


#[derive(Debug, Default)]
pub struct Wandering {
    pub distances: FxHashMap<OrientedNode, u64>,
    pub truncated: bool,
}


pub struct SingleCoherentWanderer<'a> {
    graph: &'a Graph,
    validator: RecoherenceValidator<'a>,
    leash: Option<u64>,
    max_explore_nodes: Option<usize>,
}

impl<'a> SingleCoherentWanderer<'a> {
    pub fn new(graph: &'a Graph, validator: RecoherenceValidator<'a>, settings: &SearchSettings)
            -> Self {
        SingleCoherentWanderer { graph, validator, leash: settings.leash_length,
                                 max_explore_nodes: settings.max_explore_nodes }
    }

    pub fn wander(&self, origin: OrientedNode) -> Wandering {
        self.wander_until(origin, &FxHashSet::default())
    }

    pub fn wander_until(&self, origin: OrientedNode, targets: &FxHashSet<OrientedNode>)
            -> Wandering {
        // Returns the minimum distance to each oriented node over all read-supported routes. When
        // targets are given, the search stops once they have all been reached.
        let mut result = Wandering::default();
        // Queued states carry a push counter so that equal distances pop in the order found.
        let mut queue: BinaryHeap<Reverse<(u64, u64, Vec<OrientedNode>)>> = BinaryHeap::new();
        let mut pushed = 0;
        let mut best: FxHashMap<Vec<OrientedNode>, u64> = FxHashMap::default();
        let mut settled: FxHashSet<Vec<OrientedNode>> = FxHashSet::default();
        let start = vec![origin];
        best.insert(start.clone(), 0);
        queue.push(Reverse((0, pushed, start)));
        let mut remaining: FxHashSet<OrientedNode> = targets.clone();
        while let Some(Reverse((distance, _, window))) = queue.pop() {
            if !settled.insert(window.clone()) {
                continue;
            }
            if self.max_explore_nodes.is_some_and(|max| settled.len() > max) {
                result.truncated = true;
                break;
            }
            let Some(&last) = window.last() else { continue };
            let entry = result.distances.entry(last).or_insert(distance);
            *entry = (*entry).min(distance);
            if remaining.remove(&last) && remaining.is_empty() {
                break;
            }
            for neighbour in distinct_neighbours_of(self.graph, last) {
                let mut extended = window.clone();
                extended.push(neighbour);
                if !self.validator.validate(&extended) {
                    trace!("wanderer: no read support for {:?}", extended);
                    continue;
                }
                let next_distance = distance + neighbour.length(self.graph);
                if self.leash.is_some_and(|leash| next_distance > leash) {
                    continue;
                }
                let key = self.validator.window(&extended);
                if settled.contains(&key) || best.get(&key).is_some_and(|&d| d <= next_distance) {
                    continue;
                }
                best.insert(key.clone(), next_distance);
                pushed += 1;
                queue.push(Reverse((next_distance, pushed, key)));
            }
        }
        debug!("wanderer from {} settled {} states", origin, settled.len());
        result
    }

    pub fn probe_distances(&self, probed: &ProbedGraph) -> BTreeMap<(usize, usize), u64> {
        // Like the plain probe distance table, but only over read-supported routes.
        let mut table = BTreeMap::new();
        for i in 0..probed.probe_count() {
            let Some(origin) = probed.probe_onode(i) else { continue };
            let wanted: Vec<(usize, OrientedNode)> = (i + 1..probed.probe_count())
                .filter_map(|j| probed.probe_onode(j).map(|o| (j, o.reverse()))).collect();
            if wanted.is_empty() {
                continue;
            }
            let targets: FxHashSet<OrientedNode> = wanted.iter().map(|&(_, o)| o)
                                                         .filter(|&o| o != origin).collect();
            let wandering = self.wander_until(origin, &targets);
            for (j, target) in wanted {
                if target == origin {
                    continue;
                }
                if let Some(&d) = wandering.distances.get(&target) {
                    table.insert((i, j), d.saturating_sub(target.length(self.graph)));
                }
            }
        }
        table
    }
}
