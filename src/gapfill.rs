// This file contains the code for the gapwalk gapfill subcommand.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use log::debug;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::connect::{find_connections, place_probes};
use crate::connection::{ConnectionInterpreter, Scaffold};
use crate::contig_printer::{Aligner, ClustalOmega, ContigPrinter, Splice};
use crate::dp::{PathsBetweenNodesFinder, TrailSet};
use crate::graph::load_graph;
use crate::log::{explanation, section_header};
use crate::misc::{check_if_file_exists, format_duration, load_fasta, parse_probe_ids, plural,
                  quit_with_error};
use crate::oriented::{OrientedNode, OrientedTrail};
use crate::probes::ProbedGraph;
use crate::report::{GapReport, GapfillReport};
use crate::settings::{SearchSettings, SettingsArgs};


pub fn gapfill(graph: PathBuf, contigs: PathBuf, probes: String, out_fasta: PathBuf,
               report: Option<PathBuf>, settings: SettingsArgs) {
    let start_time = Instant::now();
    check_settings(&graph, &contigs);
    starting_message();
    let settings = settings.resolve_or_quit();
    let probe_ids = parse_probe_ids(&probes);
    print_settings(&graph, &contigs, &probe_ids, &out_fasta, &report, &settings);
    let contig_seqs = load_contigs(&contigs, &probe_ids);
    let graph = load_graph(&graph, settings.min_coverage);
    let probed = place_probes(graph, probe_ids, &settings);
    let table = find_connections(&probed, &settings);
    let scaffolds = ConnectionInterpreter::new(&table, contig_seqs.len()).scaffolds();
    let gapfill_report = fill_gaps(&probed, &contig_seqs, &scaffolds, &out_fasta, &settings);
    if let Some(report) = &report {
        gapfill_report.save(report).unwrap_or_else(|e| {
            quit_with_error(&format!("could not save {}: {}", report.display(), e))
        });
    }
    finished_message(&out_fasta, &report, &gapfill_report, start_time);
}


fn check_settings(graph: &Path, contigs: &Path) {
    check_if_file_exists(graph);
    check_if_file_exists(contigs);
}


fn starting_message() {
    section_header("Starting gapwalk gapfill");
    explanation("This command chains contigs into scaffolds using the connections between their \
                 ends in a Velvet graph, then fills each gap with the sequence of the graph paths \
                 that span it.");
}


fn print_settings(graph: &Path, contigs: &Path, probe_ids: &[u64], out_fasta: &Path,
                  report: &Option<PathBuf>, settings: &SearchSettings) {
    eprintln!("Settings:");
    eprintln!("  --graph {}", graph.display());
    eprintln!("  --contigs {}", contigs.display());
    eprintln!("  --probes {}", probe_ids.iter().map(|id| id.to_string())
                                    .collect::<Vec<String>>().join(","));
    eprintln!("  --out_fasta {}", out_fasta.display());
    if let Some(report) = report {
        eprintln!("  --report {}", report.display());
    }
    settings.print();
    eprintln!();
}


fn finished_message(out_fasta: &Path, report: &Option<PathBuf>, gapfill_report: &GapfillReport,
                    start_time: Instant) {
    section_header("Finished!");
    eprintln!("Filled {} of {} gap{}", gapfill_report.gaps_filled, gapfill_report.gaps_total,
              plural(gapfill_report.gaps_total));
    eprintln!("Scaffolds: {}", out_fasta.display());
    if let Some(report) = report {
        eprintln!("Gap-fill report: {}", report.display());
    }
    eprintln!("Time to run: {}", format_duration(start_time.elapsed()));
    eprintln!();
}


fn load_contigs(contigs: &Path, probe_ids: &[u64]) -> Vec<(String, Vec<u8>)> {
    section_header("Loading contigs");
    explanation("Contig sequences are loaded, one probe pair per contig.");
    let seqs = load_fasta(contigs).unwrap_or_else(|e| {
        quit_with_error(&format!("failed to load {}: {}", contigs.display(), e))
    });
    if seqs.len() * 2 != probe_ids.len() {
        quit_with_error(&format!("{} contig{} but {} probe{} (two probes are needed per contig)",
                                 seqs.len(), plural(seqs.len()), probe_ids.len(),
                                 plural(probe_ids.len())));
    }
    for (name, seq) in &seqs {
        eprintln!("  {}: {} bp", name, seq.len());
    }
    eprintln!();
    seqs
}


/// The oriented nodes a gap runs between: out of the probe at the end of the left contig and into
/// the probe at the start of the right contig.
fn gap_ends(probed: &ProbedGraph, left: (usize, bool), right: (usize, bool))
        -> Option<(OrientedTrail, OrientedNode)> {
    let (left_contig, left_forward) = left;
    let (right_contig, right_forward) = right;
    let exit = if left_forward { left_contig * 2 + 1 } else { left_contig * 2 };
    let entry = if right_forward { right_contig * 2 } else { right_contig * 2 + 1 };
    let from = probed.probe_onode(exit)?;
    let to = probed.probe_onode(entry)?.reverse();
    Some((OrientedTrail::single(from), to))
}


fn find_gap_trails(finder: &PathsBetweenNodesFinder, probed: &ProbedGraph, scaffold: &Scaffold)
        -> Vec<TrailSet> {
    (0..scaffold.gaps.len()).map(|i| {
        let left = scaffold.contigs[i];
        let right = scaffold.contigs[(i + 1) % scaffold.contigs.len()];
        match gap_ends(probed, left, right) {
            Some((from, to)) => finder.find_all_trails_between(&from, to),
            None => TrailSet::default(),
        }
    }).collect()
}


pub fn fill_gaps(probed: &ProbedGraph, contigs: &[(String, Vec<u8>)], scaffolds: &[Scaffold],
                 out_fasta: &Path, settings: &SearchSettings) -> GapfillReport {
    section_header("Filling gaps");
    explanation("For each gap, every path between the two contig ends is found. A single path \
                 gives the fill directly, and alternative paths are merged into a consensus \
                 with Ns where they disagree.");
    let graph = probed.graph.as_ref();
    let aligner = ClustalOmega::locate().map_err(|e| debug!("{}", e)).ok();
    let mut printer = ContigPrinter::new(graph);
    if let Some(aligner) = &aligner {
        printer = printer.with_aligner(aligner as &dyn Aligner);
    }
    let finder = PathsBetweenNodesFinder::new(graph, settings);

    let mut report = GapfillReport::new();
    report.scaffold_count = scaffolds.len();
    let mut out = create_fasta(out_fasta);
    for (s, scaffold) in scaffolds.iter().enumerate() {
        let trail_sets = find_gap_trails(&finder, probed, scaffold);
        let gap_trails: Vec<Vec<OrientedTrail>> = trail_sets.iter().map(|t| t.trails.clone())
                                                            .collect();
        let splices = printer.gap_splices(contigs, scaffold, &gap_trails);
        for (i, trails) in trail_sets.iter().enumerate() {
            let name = |(c, _): (usize, bool)| contigs.get(c).map(|(n, _)| n.clone())
                                                       .unwrap_or_default();
            let gap = GapReport {
                scaffold: s,
                left_contig: name(scaffold.contigs[i]),
                right_contig: name(scaffold.contigs[(i + 1) % scaffold.contigs.len()]),
                estimated_distance: scaffold.gaps[i],
                trail_count: trails.len(),
                circular_paths_detected: trails.circular_paths_detected,
                max_path_limit_exceeded: trails.max_path_limit_exceeded,
                filled: splices[i].is_some(),
                fill_length: match &splices[i] {
                    Some(Splice::Fill(fill)) => Some(fill.len()),
                    Some(Splice::Overlap(_)) => Some(0),
                    None => None,
                },
            };
            eprintln!("  scaffold {} gap {}: {} -> {}, {} path{}, {}", s, i, gap.left_contig,
                      gap.right_contig, gap.trail_count, plural(gap.trail_count),
                      if gap.filled { "filled" } else { "left as Ns" });
            report.add_gap(gap);
        }
        let seq = printer.build_scaffold(contigs, scaffold, &splices);
        let circular = if scaffold.circular { " circular=true" } else { "" };
        write_fasta_record(&mut out, &format!("scaffold_{}", s + 1),
                           &format!("{}{}", scaffold, circular), &seq, out_fasta);
    }
    eprintln!();
    report
}


fn create_fasta(out_fasta: &Path) -> BufWriter<File> {
    match File::create(out_fasta) {
        Ok(file) => BufWriter::new(file),
        Err(e) => quit_with_error(&format!("could not create {}: {}", out_fasta.display(), e)),
    }
}


fn write_fasta_record(out: &mut BufWriter<File>, name: &str, description: &str, seq: &[u8],
                      out_fasta: &Path) {
    let result = writeln!(out, ">{} length={} {}", name, seq.len(), description)
        .and_then(|_| out.write_all(seq))
        .and_then(|_| writeln!(out))
        .and_then(|_| out.flush());
    if let Err(e) = result {
        quit_with_error(&format!("could not write to {}: {}", out_fasta.display(), e));
    }
}
