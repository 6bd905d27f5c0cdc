// This file defines oriented nodes (a node plus the side that a walk enters it from) and trails
// of oriented nodes, which are how every search in Gapwalk represents a path through the graph.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{GraphError, Result};
use crate::graph::{Arc, Graph};
use crate::misc::reverse_complement;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Start,
    End,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Start => Side::End,
            Side::End => Side::Start,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Start => 0,
            Side::End => 1,
        }
    }
}


// Self-arcs (a node linked to itself) can't be handled by the usual "find the other end of the
// arc" logic, because both ends of the arc are on the same node. Instead, this table gives the
// side of the node that a walk re-enters from. Rows are indexed by the arc's begin/end direction
// flags (begin * 2 + end) and columns by the side the walk leaves from. None means the arc isn't
// attached to the side being left.
const SELF_ARC_ENTRY: [[Option<Side>; 2]; 4] = [
    // start -> end (same as a loop, written from the twin)
    [Some(Side::End), Some(Side::Start)],
    // start -> start (hairpin on the start)
    [Some(Side::Start), None],
    // end -> end (hairpin on the end)
    [None, Some(Side::End)],
    // end -> start (loop)
    [Some(Side::End), Some(Side::Start)],
];

pub fn self_arc_entry(arc: &Arc, leaving: Side) -> Option<Side> {
    let row = (arc.begin_node_direction as usize) * 2 + arc.end_node_direction as usize;
    SELF_ARC_ENTRY[row][leaving.index()]
}


/// A node along with the side which is encountered first when walking through it. START first
/// means the walk reads the node's forward sequence, END first means it reads the twin.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrientedNode {
    pub node_id: u32,
    pub first_side: Side,
}

impl OrientedNode {
    pub fn new(node_id: u32, first_side: Side) -> Self {
        OrientedNode { node_id, first_side }
    }

    pub fn forward(node_id: u32) -> Self {
        OrientedNode::new(node_id, Side::Start)
    }

    pub fn backward(node_id: u32) -> Self {
        OrientedNode::new(node_id, Side::End)
    }

    pub fn from_direction(node_id: u32, direction: bool) -> Self {
        OrientedNode::new(node_id, if direction { Side::Start } else { Side::End })
    }

    pub fn starts_at_start(&self) -> bool {
        self.first_side == Side::Start
    }

    pub fn exit_side(&self) -> Side {
        self.first_side.opposite()
    }

    pub fn reverse(&self) -> OrientedNode {
        OrientedNode::new(self.node_id, self.first_side.opposite())
    }

    pub fn signed_id(&self) -> i64 {
        if self.starts_at_start() { self.node_id as i64 } else { -(self.node_id as i64) }
    }

    pub fn parse(token: &str) -> Result<OrientedNode> {
        // Accepts "12+"/"12-" (strand), "12s"/"12e" (first side) or a signed ID ("12"/"-12").
        static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
        let re = TOKEN_RE.get_or_init(|| {
            Regex::new(r"^(-?)([0-9]+)([-+se]?)$").expect("hard-coded regex is valid")
        });
        let invalid = || GraphError::InvalidOrientation { token: token.to_string() };
        let caps = re.captures(token.trim()).ok_or_else(invalid)?;
        let negative = !caps[1].is_empty();
        let node_id: u32 = caps[2].parse().map_err(|_| invalid())?;
        if node_id == 0 {
            return Err(invalid());
        }
        let suffix = &caps[3];
        if negative && !suffix.is_empty() {
            return Err(invalid());
        }
        let start_first = match suffix {
            "+" | "s" => true,
            "-" | "e" => false,
            _ => !negative,
        };
        Ok(OrientedNode::new(node_id, if start_first { Side::Start } else { Side::End }))
    }

    pub fn length(&self, graph: &Graph) -> u64 {
        graph.length_of(self.node_id)
    }
}

impl fmt::Display for OrientedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.node_id, if self.starts_at_start() { "+" } else { "-" })
    }
}

impl fmt::Debug for OrientedNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Display::fmt(self, f) }
}


pub fn neighbours_of(graph: &Graph, onode: OrientedNode) -> Vec<OrientedNode> {
    // Returns every oriented node reachable from the given one via a single arc, leaving by its
    // exit side. There is one entry per arc, so parallel arcs give duplicate neighbours.
    let leaving = onode.exit_side();
    let mut neighbours = Vec::new();
    for arc in graph.arcs_of_node(onode.node_id) {
        if arc.is_self_arc() {
            if let Some(entry) = self_arc_entry(arc, leaving) {
                neighbours.push(OrientedNode::new(onode.node_id, entry));
            }
        } else if arc.begin_node_id == onode.node_id {
            if arc.begin_side() == leaving {
                neighbours.push(OrientedNode::new(arc.end_node_id, arc.end_side()));
            }
        } else if arc.end_side() == leaving {
            neighbours.push(OrientedNode::new(arc.begin_node_id, arc.begin_side()));
        }
    }
    neighbours
}


pub fn distinct_neighbours_of(graph: &Graph, onode: OrientedNode) -> Vec<OrientedNode> {
    // Like neighbours_of, but sorted with parallel arcs collapsed.
    let mut neighbours = neighbours_of(graph, onode);
    neighbours.sort();
    neighbours.dedup();
    neighbours
}


#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrientedTrail {
    pub trail: Vec<OrientedNode>,
}

impl OrientedTrail {
    pub fn new() -> Self {
        OrientedTrail::default()
    }

    pub fn from_onodes(onodes: Vec<OrientedNode>) -> Self {
        OrientedTrail { trail: onodes }
    }

    pub fn single(onode: OrientedNode) -> Self {
        OrientedTrail { trail: vec![onode] }
    }

    pub fn parse(text: &str) -> Result<OrientedTrail> {
        let pieces: Vec<&str> = text.split(',').map(|p| p.trim()).filter(|p| !p.is_empty())
                                    .collect();
        if pieces.is_empty() {
            return Err(GraphError::MalformedTrail { message: format!("no nodes in '{}'", text) });
        }
        let onodes = pieces.into_iter().map(OrientedNode::parse).collect::<Result<Vec<_>>>()?;
        Ok(OrientedTrail::from_onodes(onodes))
    }

    pub fn add(&mut self, node_id: u32, first_side: Side) {
        self.trail.push(OrientedNode::new(node_id, first_side));
    }

    pub fn add_oriented(&mut self, onode: OrientedNode) {
        self.trail.push(onode);
    }

    pub fn first(&self) -> Option<OrientedNode> {
        self.trail.first().copied()
    }

    pub fn last(&self) -> Option<OrientedNode> {
        self.trail.last().copied()
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OrientedNode> {
        self.trail.iter()
    }

    pub fn contains(&self, onode: &OrientedNode) -> bool {
        self.trail.contains(onode)
    }

    pub fn neighbours_of_last(&self, graph: &Graph) -> Vec<OrientedNode> {
        match self.last() {
            Some(last) => neighbours_of(graph, last),
            None => Vec::new(),
        }
    }

    pub fn extended(&self, onode: OrientedNode) -> OrientedTrail {
        let mut trail = Vec::with_capacity(self.trail.len() + 1);
        trail.extend_from_slice(&self.trail);
        trail.push(onode);
        OrientedTrail { trail }
    }

    pub fn length_in_bp(&self, graph: &Graph) -> u64 {
        self.trail.iter().map(|o| o.length(graph)).sum()
    }

    pub fn distance(&self, graph: &Graph) -> u64 {
        // Distance travelled from the first node: the first node itself costs nothing.
        match self.first() {
            Some(first) => self.length_in_bp(graph) - first.length(graph),
            None => 0,
        }
    }

    pub fn reverse(&self) -> OrientedTrail {
        OrientedTrail { trail: self.trail.iter().rev().map(|o| o.reverse()).collect() }
    }

    pub fn check_connected(&self, graph: &Graph) -> Result<()> {
        for w in self.trail.windows(2) {
            if !neighbours_of(graph, w[0]).contains(&w[1]) {
                return Err(GraphError::MalformedTrail {
                    message: format!("{} does not lead to {}", w[0], w[1]) });
            }
        }
        Ok(())
    }

    pub fn sequence(&self, graph: &Graph) -> Result<Vec<u8>> {
        // Each node contributes the ends of its k-mers on the walked strand. The first k-1 bases
        // of the trail aren't in any node's forward contribution, so they are recovered from the
        // twin strand of the trail walked backwards.
        let required = graph.hash_length.saturating_sub(1) as usize;
        let mut twin_context = Vec::new();
        for onode in self.trail.iter().rev() {
            let node = graph.node(onode.node_id).ok_or(GraphError::MissingNode(onode.node_id))?;
            let twin_ends = node.ends_of_kmers(onode.first_side.opposite());
            if twin_ends.len() != node.length as usize {
                return Err(GraphError::UnresolvableTrail {
                    message: format!("node {} has {} bp of twin sequence but is {} bp long",
                                     node.id, twin_ends.len(), node.length) });
            }
            twin_context.extend_from_slice(twin_ends);
        }
        if twin_context.len() < required {
            return Err(GraphError::InsufficientSequence { trail: self.to_string(),
                                                          available: twin_context.len(),
                                                          required });
        }
        let mut seq = reverse_complement(&twin_context[twin_context.len() - required..]);
        for onode in &self.trail {
            let node = graph.node(onode.node_id).ok_or(GraphError::MissingNode(onode.node_id))?;
            let ends = node.ends_of_kmers(onode.first_side);
            if ends.len() != node.length as usize {
                return Err(GraphError::UnresolvableTrail {
                    message: format!("node {} has {} bp of sequence but is {} bp long",
                                     node.id, ends.len(), node.length) });
            }
            seq.extend_from_slice(ends);
        }
        Ok(seq)
    }

    pub fn signed_ids(&self) -> Vec<i64> {
        self.trail.iter().map(|o| o.signed_id()).collect()
    }
}

impl fmt::Display for OrientedTrail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.trail.iter().map(|o| o.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl fmt::Debug for OrientedTrail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Display::fmt(self, f) }
}
