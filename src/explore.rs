// This file contains the code for the gapwalk explore subcommand.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::distance::{min_distances_by_node, DirectNeighbourFinder, NeighbourFinder,
                      PairedEndNeighbourFinder};
use crate::graph::{load_graph, Graph};
use crate::height::find_heights;
use crate::log::{explanation, section_header};
use crate::misc::{check_if_file_exists, format_duration, plural, quit_with_error, spinner};
use crate::oriented::{OrientedNode, OrientedTrail};
use crate::probes::{ReadToNode, SequentialPairs};
use crate::settings::{SearchSettings, SettingsArgs};
use crate::traversal::{Exploration, GraphExplorer, TerminationType};


pub fn explore(graph: PathBuf, start: String, terminals: Option<String>, distances: bool,
               settings: SettingsArgs) {
    let start_time = Instant::now();
    check_settings(&graph);
    starting_message();
    let settings = settings.resolve_or_quit();
    let start = OrientedTrail::parse(&start).unwrap_or_else(|e| quit_with_error(&e.to_string()));
    let terminals = parse_terminals(terminals);
    print_settings(&graph, &start, &terminals, distances, &settings);
    let graph = load_graph(&graph, settings.min_coverage);
    let Some(origin) = start.last() else {
        quit_with_error("--start must name at least one oriented node");
    };
    if let Err(e) = start.check_connected(&graph) {
        quit_with_error(&e.to_string());
    }
    let exploration = explore_graph(&graph, &start, &terminals, &settings);
    print_heights(&graph, origin);
    if distances {
        print_distances(&graph, origin, &settings);
    }
    finished_message(&exploration, start_time);
}


fn check_settings(graph: &Path) {
    check_if_file_exists(graph);
}


fn starting_message() {
    section_header("Starting gapwalk explore");
    explanation("This command explores a Velvet graph outward from a starting trail, following \
                 every branch until it runs past the leash, dead-ends, loops or reaches a \
                 terminal node.");
}


fn print_settings(graph: &Path, start: &OrientedTrail, terminals: &[OrientedNode],
                  distances: bool, settings: &SearchSettings) {
    eprintln!("Settings:");
    eprintln!("  --graph {}", graph.display());
    eprintln!("  --start {}", start);
    if !terminals.is_empty() {
        eprintln!("  --terminals {}", OrientedTrail::from_onodes(terminals.to_vec()));
    }
    if distances {
        eprintln!("  --distances");
    }
    settings.print();
    eprintln!();
}


fn finished_message(exploration: &Exploration, start_time: Instant) {
    section_header("Finished!");
    eprintln!("{} explored path{}", exploration.paths.len(), plural(exploration.paths.len()));
    for termination in [TerminationType::Terminal, TerminationType::Leashed,
                        TerminationType::DeadEnd, TerminationType::Loop] {
        eprintln!("  {}: {}", termination, exploration.count(termination));
    }
    if exploration.truncated {
        eprintln!("The exploration stopped early at the node limit.");
    }
    eprintln!("Time to run: {}", format_duration(start_time.elapsed()));
    eprintln!();
}


fn parse_terminals(terminals: Option<String>) -> Vec<OrientedNode> {
    let Some(terminals) = terminals else { return Vec::new() };
    OrientedTrail::parse(&terminals).unwrap_or_else(|e| quit_with_error(&e.to_string()))
                                    .iter().copied().collect()
}


fn explore_graph(graph: &Graph, start: &OrientedTrail, terminals: &[OrientedNode],
                 settings: &SearchSettings) -> Exploration {
    section_header("Exploring");
    explanation("Each explored path is printed to stdout with how it ended.");
    let pb = spinner("exploring...");
    let exploration = GraphExplorer::new(graph, settings)
        .with_terminals(terminals.iter().copied()).explore_from(start);
    pb.finish_and_clear();
    for path in &exploration.paths {
        println!("{}\t{}\t{}", path.trail, path.trail.length_in_bp(graph), path.termination);
    }
    exploration
}


fn print_heights(graph: &Graph, origin: OrientedNode) {
    section_header("Counting paths");
    explanation("The graph reachable from the start is levelled from its tips to count the paths \
                 through it. Nodes in cycles can't be levelled and are listed separately.");
    let heights = find_heights(graph, &[origin]);
    match heights.max_height() {
        Some(height) => eprintln!("Maximum height: {}", height),
        None => eprintln!("No reachable node could be levelled"),
    }
    eprintln!("Paths through: {} to {}", heights.min_paths_through(),
              heights.max_paths_through());
    for group in &heights.cycle_groups {
        eprintln!("Cycle group: {}", OrientedTrail::from_onodes(group.clone()));
    }
    eprintln!();
}


fn print_distances(graph: &Graph, origin: OrientedNode, settings: &SearchSettings) {
    section_header("Measuring distances");
    explanation("The minimum distance from the start to each node is printed to stdout.");
    let read_to_node = ReadToNode::from_graph(graph);
    let paired;
    let finder: &dyn NeighbourFinder = match settings.insert_size {
        Some(insert_size) => {
            paired = PairedEndNeighbourFinder { oracle: &SequentialPairs,
                                                read_to_node: &read_to_node, insert_size };
            &paired
        }
        None => &DirectNeighbourFinder,
    };
    let distances = min_distances_by_node(graph, origin, finder, settings);
    for (node_id, distance) in &distances {
        println!("{}\t{}", node_id, distance);
    }
    eprintln!("{} node{} within reach", distances.len(), plural(distances.len()));
    eprintln!();
}
