// This file contains the connection interpreter, which turns a table of distances between probes
// into connections between contig ends, and chains unambiguously connected contigs into
// scaffolds.

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
use std::collections::BTreeMap;
use std::fmt;


/// Probe 2i sits at the start of contig i and probe 2i+1 at its end.
pub fn contig_of_probe(probe: usize) -> usize {
    probe / 2
}

pub fn is_start_probe(probe: usize) -> bool {
    probe % 2 == 0
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Connection {
    pub probe1: usize,
    pub probe2: usize,
    pub distance: u64,
}

impl Connection {
    pub fn other(&self, probe: usize) -> Option<usize> {
        if probe == self.probe1 {
            Some(self.probe2)
        } else if probe == self.probe2 {
            Some(self.probe1)
        } else {
            None
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} -> {}{} ({} bp)",
               contig_of_probe(self.probe1), if is_start_probe(self.probe1) { "s" } else { "e" },
               contig_of_probe(self.probe2), if is_start_probe(self.probe2) { "s" } else { "e" },
               self.distance)
    }
}


/// A chain of contigs. Each contig is given with its index and whether it is used forward, and
/// gaps[i] is the distance after contigs[i]. A circular scaffold has one gap per contig (the last
/// one closes the loop), a linear one has one fewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scaffold {
    pub contigs: Vec<(usize, bool)>,
    pub gaps: Vec<u64>,
    pub circular: bool,
}

impl fmt::Display for Scaffold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (i, (contig, forward)) in self.contigs.iter().enumerate() {
            parts.push(format!("{}{}", contig, if *forward { "+" } else { "-" }));
            if let Some(gap) = self.gaps.get(i) {
                parts.push(format!("({})", gap));
            }
        }
        write!(f, "{}{}", parts.join(" "), if self.circular { " circular" } else { "" })
    }
}


pub struct ConnectionInterpreter {
    contig_count: usize,
    connections: Vec<Connection>,
    by_probe: FxHashMap<usize, Vec<Connection>>,
}

impl ConnectionInterpreter {
    pub fn new(table: &BTreeMap<(usize, usize), u64>, contig_count: usize) -> Self {
        let mut connections = Vec::new();
        let mut by_probe: FxHashMap<usize, Vec<Connection>> = FxHashMap::default();
        for (&(probe1, probe2), &distance) in table {
            if probe1 >= contig_count * 2 || probe2 >= contig_count * 2 {
                continue;
            }
            let connection = Connection { probe1, probe2, distance };
            connections.push(connection);
            by_probe.entry(probe1).or_default().push(connection);
            if probe2 != probe1 {
                by_probe.entry(probe2).or_default().push(connection);
            }
        }
        ConnectionInterpreter { contig_count, connections, by_probe }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connections_of(&self, probe: usize) -> &[Connection] {
        self.by_probe.get(&probe).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Connections where neither probe connects to anything else.
    pub fn doubly_single_connections(&self) -> Vec<Connection> {
        self.connections.iter().filter(|c| {
            self.connections_of(c.probe1).len() == 1 && self.connections_of(c.probe2).len() == 1
        }).copied().collect()
    }

    /// Contigs whose end leads unambiguously back around to their own start.
    pub fn circular_contigs(&self) -> Vec<usize> {
        self.doubly_single_connections().iter()
            .filter(|c| contig_of_probe(c.probe1) == contig_of_probe(c.probe2)
                        && c.probe1 != c.probe2)
            .map(|c| contig_of_probe(c.probe1)).collect()
    }

    /// Chains contigs along doubly-single connections. Contigs without such a connection end up
    /// alone in their own scaffold.
    pub fn scaffolds(&self) -> Vec<Scaffold> {
        let mut links: FxHashMap<usize, (usize, u64)> = FxHashMap::default();
        for c in self.doubly_single_connections() {
            // A probe joined to itself is a hairpin, which can't be scaffolded.
            if c.probe1 != c.probe2 {
                links.insert(c.probe1, (c.probe2, c.distance));
                links.insert(c.probe2, (c.probe1, c.distance));
            }
        }
        let mut used: FxHashSet<usize> = FxHashSet::default();
        let mut scaffolds = Vec::new();

        // Linear chains begin at a contig with a free end.
        for contig in 0..self.contig_count {
            if used.contains(&contig) {
                continue;
            }
            let start_free = !links.contains_key(&(contig * 2));
            let end_free = !links.contains_key(&(contig * 2 + 1));
            if !start_free && !end_free {
                continue;
            }
            scaffolds.push(self.follow_chain(&links, contig, start_free, &mut used));
        }

        // Whatever is left is in loops.
        for contig in 0..self.contig_count {
            if !used.contains(&contig) {
                scaffolds.push(self.follow_chain(&links, contig, true, &mut used));
            }
        }
        debug!("{} contigs in {} scaffolds", self.contig_count, scaffolds.len());
        scaffolds
    }

    fn follow_chain(&self, links: &FxHashMap<usize, (usize, u64)>, first: usize, forward: bool,
                    used: &mut FxHashSet<usize>) -> Scaffold {
        let mut contigs = vec![(first, forward)];
        let mut gaps = Vec::new();
        let mut circular = false;
        used.insert(first);
        let mut exit = if forward { first * 2 + 1 } else { first * 2 };
        while let Some(&(entry, distance)) = links.get(&exit) {
            let next = contig_of_probe(entry);
            if next == first && used.contains(&next) {
                gaps.push(distance);
                circular = true;
                break;
            }
            if !used.insert(next) {
                break;
            }
            gaps.push(distance);

            // Entering at a start probe means the next contig is read forward.
            let next_forward = is_start_probe(entry);
            contigs.push((next, next_forward));
            exit = if next_forward { next * 2 + 1 } else { next * 2 };
        }
        Scaffold { contigs, gaps, circular }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn test_probe_numbering() {
        assert_eq!(contig_of_probe(0), 0);
        assert_eq!(contig_of_probe(5), 2);
        assert!(is_start_probe(4));
        assert!(!is_start_probe(3));
    }

    #[test]
    fn test_doubly_single() {
        // Contig 0's end goes to contig 1's start, and contig 1's end is ambiguous.
        let table = btreemap! { (1, 2) => 50, (3, 4) => 10, (3, 5) => 20 };
        let interpreter = ConnectionInterpreter::new(&table, 3);
        assert_eq!(interpreter.connections().len(), 3);
        assert_eq!(interpreter.connections_of(3).len(), 2);
        assert_eq!(interpreter.doubly_single_connections(),
                   vec![Connection { probe1: 1, probe2: 2, distance: 50 }]);
        assert_eq!(interpreter.connections()[0].to_string(), "0e -> 1s (50 bp)");
        assert_eq!(interpreter.connections()[0].other(2), Some(1));
        assert_eq!(interpreter.connections()[0].other(7), None);
    }

    #[test]
    fn test_circular_contigs() {
        let table = btreemap! { (0, 1) => 30, (2, 5) => 10 };
        let interpreter = ConnectionInterpreter::new(&table, 3);
        assert_eq!(interpreter.circular_contigs(), vec![0]);
        let scaffolds = interpreter.scaffolds();
        assert_eq!(scaffolds[0], Scaffold { contigs: vec![(1, false), (2, false)], gaps: vec![10],
                                            circular: false });
        assert_eq!(scaffolds[1], Scaffold { contigs: vec![(0, true)], gaps: vec![30],
                                            circular: true });
    }

    #[test]
    fn test_linear_scaffold() {
        // 0+ then 2- (the end of 0 meets the end of 2) then 1+ (the start of 2 meets the start of
        // 1), with contig 3 unconnected.
        let table = btreemap! { (1, 5) => 100, (2, 4) => 40 };
        let interpreter = ConnectionInterpreter::new(&table, 4);
        let scaffolds = interpreter.scaffolds();
        assert_eq!(scaffolds.len(), 2);
        assert_eq!(scaffolds[0], Scaffold { contigs: vec![(0, true), (2, false), (1, true)],
                                            gaps: vec![100, 40], circular: false });
        assert_eq!(scaffolds[0].to_string(), "0+ (100) 2- (40) 1+");
        assert_eq!(scaffolds[1], Scaffold { contigs: vec![(3, true)], gaps: vec![],
                                            circular: false });
    }

    #[test]
    fn test_chain_started_from_its_end() {
        // Contig 0's start is linked, so its chain is walked backwards from contig 0.
        let table = btreemap! { (0, 3) => 5 };
        let scaffolds = ConnectionInterpreter::new(&table, 2).scaffolds();
        assert_eq!(scaffolds, vec![Scaffold { contigs: vec![(0, false), (1, false)], gaps: vec![5],
                                              circular: false }]);
    }

    #[test]
    fn test_circular_scaffold() {
        let table = btreemap! { (1, 2) => 10, (0, 3) => 20 };
        let scaffolds = ConnectionInterpreter::new(&table, 2).scaffolds();
        assert_eq!(scaffolds, vec![Scaffold { contigs: vec![(0, true), (1, true)],
                                              gaps: vec![10, 20], circular: true }]);
        assert_eq!(scaffolds[0].to_string(), "0+ (10) 1+ (20) circular");
    }

    #[test]
    fn test_out_of_range_probes_ignored() {
        let table = btreemap! { (1, 9) => 10 };
        let interpreter = ConnectionInterpreter::new(&table, 2);
        assert!(interpreter.connections().is_empty());
        assert_eq!(interpreter.scaffolds().len(), 2);
    }
}
