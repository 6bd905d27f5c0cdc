// This file defines the Node struct: one unitig of the de Bruijn graph along with the short reads
// that were threaded through it.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use fxhash::FxHashSet;
use std::fmt;

use crate::oriented::Side;


/// A short read attached to a node. The offset is measured from the start of the strand the read
/// lies on, so reads on the twin strand (direction REVERSE) count from the node's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodedRead {
    pub read_id: u64,
    pub offset_from_start_of_node: u64,
    pub start_coord: u64,
    pub direction: bool,
}


#[derive(Clone, Default)]
pub struct Node {
    pub id: u32,
    pub length: u32,
    pub coverages: Vec<f64>,
    pub ends_of_kmers_of_node: Vec<u8>,
    pub ends_of_kmers_of_twin_node: Vec<u8>,
    pub short_reads: Vec<NodedRead>,
}

impl Node {
    pub fn new(id: u32, length: u32) -> Self {
        Node { id, length, ..Default::default() }
    }

    pub fn coverage(&self) -> f64 {
        // Coverage counts are totals over the node's k-mers, so they are normalised by length.
        if self.length == 0 {
            return 0.0;
        }
        self.coverages.iter().sum::<f64>() / self.length as f64
    }

    pub fn ends_of_kmers(&self, first_side: Side) -> &[u8] {
        // The sequence contributed by this node when it is entered from the given side.
        match first_side {
            Side::Start => &self.ends_of_kmers_of_node,
            Side::End => &self.ends_of_kmers_of_twin_node,
        }
    }

    pub fn read_ids(&self) -> FxHashSet<u64> {
        self.short_reads.iter().map(|r| r.read_id).collect()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}: {} bp, {:.2}x, {} read{}", self.id, self.length, self.coverage(),
               self.short_reads.len(), if self.short_reads.len() == 1 { "" } else { "s" })
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { fmt::Display::fmt(self, f) }
}
