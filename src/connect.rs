// This file contains the code for the gapwalk connect subcommand.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use crate::connection::ConnectionInterpreter;
use crate::distance::{filter_by_connectivity, probe_distances, DirectNeighbourFinder,
                      PairedEndNeighbourFinder};
use crate::graph::{load_graph, Graph};
use crate::log::{explanation, section_header};
use crate::misc::{check_if_file_exists, format_duration, parse_probe_ids, plural,
                  quit_with_error, spinner};
use crate::probes::{ProbeFinder, ProbedGraph, ReadToNode, SequentialPairs, TraversalProbeFinder};
use crate::recoherence::RecoherenceValidator;
use crate::report::ConnectionReport;
use crate::settings::{SearchSettings, SettingsArgs};
use crate::wanderer::SingleCoherentWanderer;


pub fn connect(graph: PathBuf, probes: String, report: Option<PathBuf>, settings: SettingsArgs) {
    let start_time = Instant::now();
    check_settings(&graph);
    starting_message();
    let settings = settings.resolve_or_quit();
    let probe_ids = parse_probe_ids(&probes);
    print_settings(&graph, &probe_ids, &report, &settings);
    let graph = load_graph(&graph, settings.min_coverage);
    let probed = place_probes(graph, probe_ids, &settings);
    let table = find_connections(&probed, &settings);
    let interpreter = ConnectionInterpreter::new(&table, probed.probe_count() / 2);
    print_connections(&interpreter);
    if let Some(report) = &report {
        ConnectionReport::new(&probed, &interpreter).save(report).unwrap_or_else(|e| {
            quit_with_error(&format!("could not save {}: {}", report.display(), e))
        });
    }
    finished_message(&report, start_time);
}


fn check_settings(graph: &Path) {
    check_if_file_exists(graph);
}


fn starting_message() {
    section_header("Starting gapwalk connect");
    explanation("This command places probe reads (one at each end of each contig) in a Velvet \
                 graph, then searches outward from each probe to find which contig ends are \
                 connected and how far apart they are.");
}


fn print_settings(graph: &Path, probe_ids: &[u64], report: &Option<PathBuf>,
                  settings: &SearchSettings) {
    eprintln!("Settings:");
    eprintln!("  --graph {}", graph.display());
    eprintln!("  --probes {}", probe_ids.iter().map(|id| id.to_string())
                                    .collect::<Vec<String>>().join(","));
    if let Some(report) = report {
        eprintln!("  --report {}", report.display());
    }
    settings.print();
    eprintln!();
}


fn finished_message(report: &Option<PathBuf>, start_time: Instant) {
    section_header("Finished!");
    if let Some(report) = report {
        eprintln!("Connection report: {}", report.display());
    }
    eprintln!("Time to run: {}", format_duration(start_time.elapsed()));
    eprintln!();
}


/// Finds the probes in the graph. With a leash, anything beyond the leash from every probe is
/// removed first, since no connection can pass through it.
pub fn place_probes(mut graph: Graph, probe_ids: Vec<u64>, settings: &SearchSettings)
        -> ProbedGraph {
    section_header("Placing probes");
    explanation("Each probe read is located in the graph. Probes 2i and 2i+1 are the start and \
                 end of contig i.");
    if let Some(leash) = settings.leash_length {
        let onodes: Vec<_> = TraversalProbeFinder.find(&graph, &probe_ids).iter().flatten()
                                                 .map(|h| h.onode()).collect();
        let (nodes, arcs) = filter_by_connectivity(&mut graph, &onodes, leash);
        eprintln!("Removed {} node{} and {} arc{} beyond the leash of every probe", nodes,
                  plural(nodes), arcs, plural(arcs));
    }
    let probed = ProbedGraph::new(Rc::new(graph), probe_ids, &TraversalProbeFinder)
        .unwrap_or_else(|e| quit_with_error(&e.to_string()));
    probed.print_probe_info();
    probed
}


/// Builds the probe-to-probe distance table. Read-supported walks are used when a recoherence
/// k-mer is set, otherwise a closest-first search over arcs (and read pairs, with an insert size).
pub fn find_connections(probed: &ProbedGraph, settings: &SearchSettings)
        -> BTreeMap<(usize, usize), u64> {
    section_header("Finding connections");
    let graph = probed.graph.as_ref();
    let pb = spinner("searching between probes...");
    let table = if let Some(validator) = RecoherenceValidator::from_settings(graph, settings) {
        explanation("Walks from each probe only continue through junctions confirmed by reads.");
        SingleCoherentWanderer::new(graph, validator, settings).probe_distances(probed)
    } else if let Some(insert_size) = settings.insert_size {
        explanation("Searches from each probe follow both arcs and read pairs.");
        let read_to_node = ReadToNode::from_graph(graph);
        let finder = PairedEndNeighbourFinder { oracle: &SequentialPairs,
                                                read_to_node: &read_to_node, insert_size };
        probe_distances(probed, &finder, settings.leash_length)
    } else {
        explanation("Searches from each probe follow the arcs of the graph.");
        probe_distances(probed, &DirectNeighbourFinder, settings.leash_length)
    };
    pb.finish_and_clear();
    eprintln!("{} connection{} found", table.len(), plural(table.len()));
    eprintln!();
    table
}


fn print_connections(interpreter: &ConnectionInterpreter) {
    section_header("Interpreting connections");
    explanation("Connections where neither contig end has any other connection are used to \
                 chain contigs into scaffolds.");
    for connection in interpreter.connections() {
        println!("{}", connection);
    }
    let circular = interpreter.circular_contigs();
    if !circular.is_empty() {
        eprintln!("Circular contig{}: {}", plural(circular.len()),
                  circular.iter().map(|c| c.to_string()).collect::<Vec<String>>().join(", "));
    }
    for scaffold in interpreter.scaffolds() {
        eprintln!("  {}", scaffold);
    }
    eprintln!();
}
