// This file contains the contig printer, which joins contigs using the sequence of the graph
// trails that connect them. When several trails fill the same gap, their fills are aligned and
// collapsed to a consensus.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use log::{debug, warn};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use which::which;

use crate::connection::Scaffold;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use crate::misc::{load_fasta, reverse_complement};
use crate::oriented::OrientedTrail;


/// Multiple sequence alignment. Returns one gapped row per input sequence, in input order.
pub trait Aligner {
    fn align(&self, seqs: &[Vec<u8>]) -> Result<Vec<Vec<u8>>>;
}


pub struct ClustalOmega {
    executable: PathBuf,
}

impl ClustalOmega {
    pub fn locate() -> Result<Self> {
        match which("clustalo") {
            Ok(executable) => Ok(ClustalOmega { executable }),
            Err(_) => Err(GraphError::ExternalTool {
                message: "required program 'clustalo' not found in $PATH".to_string() }),
        }
    }
}

impl Aligner for ClustalOmega {
    fn align(&self, seqs: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("fills.fasta");
        let output = dir.path().join("aligned.fasta");
        let mut file = File::create(&input)?;
        for (i, seq) in seqs.iter().enumerate() {
            writeln!(file, ">{}", i)?;
            file.write_all(seq)?;
            writeln!(file)?;
        }
        drop(file);
        let result = Command::new(&self.executable)
            .arg("-i").arg(&input).arg("-o").arg(&output).arg("--outfmt=fa").arg("--force")
            .output()?;
        if !result.status.success() {
            return Err(GraphError::ExternalTool {
                message: format!("clustalo failed: {}", String::from_utf8_lossy(&result.stderr)) });
        }
        let mut rows: Vec<(usize, Vec<u8>)> = Vec::new();
        for (name, seq) in load_fasta(&output)? {
            let index = name.parse::<usize>().map_err(|_| GraphError::ExternalTool {
                message: format!("unexpected sequence name in clustalo output: {}", name) })?;
            rows.push((index, seq));
        }
        rows.sort();
        if rows.len() != seqs.len() {
            return Err(GraphError::ExternalTool {
                message: format!("clustalo returned {} of {} sequences", rows.len(), seqs.len()) });
        }
        Ok(rows.into_iter().map(|(_, seq)| seq).collect())
    }
}


/// Collapses aligned rows to one sequence: columns where every row agrees keep that base,
/// columns of nothing but gaps are dropped, and anything else becomes an N.
pub fn consensus(rows: &[Vec<u8>]) -> Vec<u8> {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let mut result = Vec::with_capacity(width);
    for col in 0..width {
        let column: Vec<u8> = rows.iter().map(|r| r.get(col).copied().unwrap_or(b'-')).collect();
        if column.iter().all(|&b| b == b'-') {
            continue;
        }
        if column.iter().all(|&b| b == column[0]) {
            result.push(column[0]);
        } else {
            result.push(b'N');
        }
    }
    result
}


fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}


fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}


/// How two contigs are joined: with some sequence between them, or by overlapping the start of
/// the second contig with the end of the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Splice {
    Fill(Vec<u8>),
    Overlap(usize),
}


pub struct ContigPrinter<'a> {
    graph: &'a Graph,
    aligner: Option<&'a dyn Aligner>,
    anchor_length: usize,
}

impl<'a> ContigPrinter<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        ContigPrinter { graph, aligner: None, anchor_length: 50 }
    }

    pub fn with_aligner(mut self, aligner: &'a dyn Aligner) -> Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn with_anchor_length(mut self, anchor_length: usize) -> Self {
        self.anchor_length = anchor_length.max(1);
        self
    }

    fn splice_one(&self, left: &[u8], right: &[u8], trail: &OrientedTrail) -> Result<Splice> {
        // The end of the left contig and the start of the right contig are both located in the
        // trail's sequence, and whatever lies between them is the fill.
        let seq = trail.sequence(self.graph)?;
        let left_anchor = &left[left.len() - self.anchor_length.min(left.len())..];
        let right_anchor = &right[..self.anchor_length.min(right.len())];
        let Some(left_pos) = find(&seq, left_anchor) else {
            return Err(GraphError::UnresolvableTrail {
                message: format!("end of left contig not found in trail {}", trail) });
        };
        let Some(right_pos) = rfind(&seq, right_anchor) else {
            return Err(GraphError::UnresolvableTrail {
                message: format!("start of right contig not found in trail {}", trail) });
        };
        let left_end = left_pos + left_anchor.len();
        if left_end <= right_pos {
            Ok(Splice::Fill(seq[left_end..right_pos].to_vec()))
        } else if left_end - right_pos <= right.len() {
            Ok(Splice::Overlap(left_end - right_pos))
        } else {
            Err(GraphError::UnresolvableTrail {
                message: format!("contigs overlap by more than the right contig in trail {}",
                                 trail) })
        }
    }

    /// Works out how to join two contigs given the trails across the gap between them.
    pub fn splice(&self, left: &[u8], right: &[u8], trails: &[OrientedTrail]) -> Result<Splice> {
        let splices = trails.iter().map(|t| self.splice_one(left, right, t))
                            .collect::<Result<Vec<_>>>()?;
        let Some(first) = splices.first() else {
            return Err(GraphError::UnresolvableTrail { message: "no trails to splice".to_string() });
        };
        if splices.iter().all(|s| s == first) {
            return Ok(first.clone());
        }
        let fills: Vec<Vec<u8>> = splices.into_iter().map(|s| match s {
            Splice::Fill(fill) => fill,
            Splice::Overlap(_) => Vec::new(),
        }).collect();
        Ok(Splice::Fill(self.merge_fills(&fills)?))
    }

    pub fn merge_fills(&self, fills: &[Vec<u8>]) -> Result<Vec<u8>> {
        let mut distinct: Vec<Vec<u8>> = fills.to_vec();
        distinct.sort();
        distinct.dedup();
        if distinct.len() == 1 {
            return Ok(distinct.remove(0));
        }
        let same_length = distinct.iter().all(|f| f.len() == distinct[0].len());
        if same_length {
            return Ok(consensus(&distinct));
        }
        let Some(aligner) = self.aligner else {
            return Err(GraphError::ExternalTool {
                message: "gap fills differ in length and no aligner is available".to_string() });
        };

        // Empty fills can't go to the aligner, so they join afterwards as rows of gaps.
        let non_empty: Vec<Vec<u8>> = distinct.iter().filter(|f| !f.is_empty()).cloned().collect();
        let mut rows = if non_empty.len() > 1 { aligner.align(&non_empty)? } else { non_empty };
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if distinct.iter().any(|f| f.is_empty()) {
            rows.push(vec![b'-'; width]);
        }
        debug!("merged {} alternative gap fills", distinct.len());
        Ok(consensus(&rows))
    }

    pub fn join(&self, left: &[u8], right: &[u8], trails: &[OrientedTrail]) -> Result<Vec<u8>> {
        let mut joined = left.to_vec();
        match self.splice(left, right, trails)? {
            Splice::Fill(fill) => {
                joined.extend_from_slice(&fill);
                joined.extend_from_slice(right);
            }
            Splice::Overlap(overlap) => joined.extend_from_slice(&right[overlap..]),
        }
        Ok(joined)
    }

    /// Works out each gap of a scaffold. A gap is None when it has no trails or when its trails
    /// can't be spliced.
    pub fn gap_splices(&self, contigs: &[(String, Vec<u8>)], scaffold: &Scaffold,
                       gap_trails: &[Vec<OrientedTrail>]) -> Vec<Option<Splice>> {
        let oriented = oriented_contigs(contigs, scaffold);
        (0..scaffold.gaps.len()).map(|i| {
            let trails = gap_trails.get(i).map(|t| t.as_slice()).unwrap_or(&[]);
            if trails.is_empty() {
                return None;
            }
            let next = &oriented[(i + 1) % oriented.len()];
            match self.splice(&oriented[i], next, trails) {
                Ok(splice) => Some(splice),
                Err(e) => {
                    warn!("gap {} of scaffold {} left unfilled: {}", i, scaffold, e);
                    None
                }
            }
        }).collect()
    }

    /// Builds a scaffold's sequence from already worked-out gaps. Unfilled gaps get a run of Ns
    /// as long as the estimated gap (at least one).
    pub fn build_scaffold(&self, contigs: &[(String, Vec<u8>)], scaffold: &Scaffold,
                          splices: &[Option<Splice>]) -> Vec<u8> {
        let mut result = Vec::new();
        for (i, seq) in oriented_contigs(contigs, scaffold).iter().enumerate() {
            result.extend_from_slice(seq);
            let Some(&gap) = scaffold.gaps.get(i) else { break };
            match splices.get(i).cloned().flatten() {
                Some(Splice::Fill(fill)) => result.extend_from_slice(&fill),

                // Overlapping bases come off the end of this contig, which also works for the gap
                // that closes a circular scaffold.
                Some(Splice::Overlap(overlap)) => {
                    result.truncate(result.len().saturating_sub(overlap))
                }
                None => result.extend(std::iter::repeat(b'N').take(gap.max(1) as usize)),
            }
        }
        result
    }

    /// Builds a scaffold's sequence, filling gaps from the graph where their trails allow it.
    pub fn scaffold_sequence(&self, contigs: &[(String, Vec<u8>)], scaffold: &Scaffold,
                             gap_trails: &[Vec<OrientedTrail>]) -> Vec<u8> {
        let splices = self.gap_splices(contigs, scaffold, gap_trails);
        self.build_scaffold(contigs, scaffold, &splices)
    }
}


fn oriented_contigs(contigs: &[(String, Vec<u8>)], scaffold: &Scaffold) -> Vec<Vec<u8>> {
    scaffold.contigs.iter().map(|&(i, forward)| {
        let seq = contigs.get(i).map(|(_, s)| s.clone()).unwrap_or_default();
        if forward { seq } else { reverse_complement(&seq) }
    }).collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_graphs::*;

    // Pads every sequence with trailing gaps, which is a valid (if poor) alignment.
    struct PadAligner;

    impl Aligner for PadAligner {
        fn align(&self, seqs: &[Vec<u8>]) -> Result<Vec<Vec<u8>>> {
            let width = seqs.iter().map(|s| s.len()).max().unwrap_or(0);
            Ok(seqs.iter().map(|s| {
                let mut row = s.clone();
                row.resize(width, b'-');
                row
            }).collect())
        }
    }

    fn sequence_graph() -> (Graph, Vec<u8>) {
        let (lines, genome) = get_sequence_graph();
        (Graph::from_velvet_lines(&lines).unwrap(), genome.into_bytes())
    }

    #[test]
    fn test_consensus() {
        assert_eq!(consensus(&[b"ACGT".to_vec(), b"ACCT".to_vec()]), b"ACNT".to_vec());
        assert_eq!(consensus(&[b"AC-T".to_vec(), b"ACGT".to_vec()]), b"ACNT".to_vec());
        assert_eq!(consensus(&[b"A-C".to_vec(), b"A-C".to_vec()]), b"AC".to_vec());
        assert!(consensus(&[]).is_empty());
    }

    #[test]
    fn test_find() {
        assert_eq!(find(b"ACGTACGT", b"ACG"), Some(0));
        assert_eq!(rfind(b"ACGTACGT", b"ACG"), Some(4));
        assert_eq!(find(b"ACGT", b"TT"), None);
        assert_eq!(find(b"AC", b"ACGT"), None);
    }

    #[test]
    fn test_join_with_fill() {
        let (graph, genome) = sequence_graph();
        let trail = OrientedTrail::parse("1+,2+,3+").unwrap();
        let printer = ContigPrinter::new(&graph).with_anchor_length(4);
        let left = &genome[..8];
        let right = &genome[12..];
        assert_eq!(printer.splice(left, right, &[trail.clone()]).unwrap(),
                   Splice::Fill(b"ATGC".to_vec()));
        assert_eq!(printer.join(left, right, &[trail]).unwrap(), genome);
    }

    #[test]
    fn test_join_with_overlap() {
        let (graph, genome) = sequence_graph();
        let trail = OrientedTrail::parse("1+,2+,3+").unwrap();
        let printer = ContigPrinter::new(&graph).with_anchor_length(4);
        let left = &genome[..14];
        let right = &genome[10..];
        assert_eq!(printer.splice(left, right, &[trail.clone()]).unwrap(), Splice::Overlap(4));
        assert_eq!(printer.join(left, right, &[trail]).unwrap(), genome);
    }

    #[test]
    fn test_missing_anchor() {
        let (graph, genome) = sequence_graph();
        let trail = OrientedTrail::parse("1+,2+,3+").unwrap();
        let printer = ContigPrinter::new(&graph).with_anchor_length(4);
        assert!(matches!(printer.join(b"GGGGGGGG", &genome[12..], &[trail.clone()]),
                         Err(GraphError::UnresolvableTrail { .. })));
        assert!(matches!(printer.join(&genome[..8], b"TTTTTTTT", &[trail]),
                         Err(GraphError::UnresolvableTrail { .. })));
        assert!(matches!(printer.join(&genome[..8], &genome[12..], &[]),
                         Err(GraphError::UnresolvableTrail { .. })));
    }

    #[test]
    fn test_merge_fills() {
        let (graph, _) = sequence_graph();
        let printer = ContigPrinter::new(&graph);
        assert_eq!(printer.merge_fills(&[b"ATGC".to_vec(), b"ATGC".to_vec()]).unwrap(),
                   b"ATGC".to_vec());
        assert_eq!(printer.merge_fills(&[b"ATGC".to_vec(), b"AAGC".to_vec()]).unwrap(),
                   b"ANGC".to_vec());
        assert!(matches!(printer.merge_fills(&[b"ATGC".to_vec(), b"ATG".to_vec()]),
                         Err(GraphError::ExternalTool { .. })));

        let printer = ContigPrinter::new(&graph).with_aligner(&PadAligner);
        assert_eq!(printer.merge_fills(&[b"ATGC".to_vec(), b"ATG".to_vec()]).unwrap(),
                   b"ATGN".to_vec());
        assert_eq!(printer.merge_fills(&[b"AT".to_vec(), Vec::new()]).unwrap(), b"NN".to_vec());
    }

    #[test]
    fn test_scaffold_sequence() {
        let (graph, genome) = sequence_graph();
        let printer = ContigPrinter::new(&graph).with_anchor_length(4);
        let contigs = vec![("a".to_string(), genome[..8].to_vec()),
                           ("b".to_string(), reverse_complement(&genome[12..]))];

        // b is stored as the reverse strand, so it's used backwards.
        let scaffold = Scaffold { contigs: vec![(0, true), (1, false)], gaps: vec![4],
                                  circular: false };
        let trails = vec![vec![OrientedTrail::parse("1+,2+,3+").unwrap()]];
        assert_eq!(printer.scaffold_sequence(&contigs, &scaffold, &trails), genome);

        // Without a trail the gap is filled with Ns.
        let mut expected = genome[..8].to_vec();
        expected.extend_from_slice(b"NNNN");
        expected.extend_from_slice(&genome[12..]);
        assert_eq!(printer.scaffold_sequence(&contigs, &scaffold, &[]), expected);

        // A trail that doesn't hold the contig ends also leaves Ns.
        let bad = vec![vec![OrientedTrail::parse("3+").unwrap()]];
        assert_eq!(printer.gap_splices(&contigs, &scaffold, &bad), vec![None]);
        assert_eq!(printer.scaffold_sequence(&contigs, &scaffold, &bad), expected);
    }
}
