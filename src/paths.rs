// This file contains the code for the gapwalk paths subcommand.

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

use crate::dp::{PathsBetweenNodesFinder, TrailSet};
use crate::graph::{load_graph, Graph};
use crate::log::{explanation, section_header};
use crate::misc::{check_if_file_exists, format_duration, plural, quit_with_error, spinner};
use crate::oriented::{OrientedNode, OrientedTrail};
use crate::settings::{SearchSettings, SettingsArgs};
use crate::traversal::AcyclicConnectionFinder;


pub fn paths(graph: PathBuf, from: String, to: String, acyclic: bool, settings: SettingsArgs) {
    let start_time = Instant::now();
    check_settings(&graph);
    starting_message();
    let settings = settings.resolve_or_quit();
    let (start, terminal) = parse_ends(&from, &to);
    print_settings(&graph, &start, terminal, acyclic, &settings);
    let graph = load_graph(&graph, settings.min_coverage);
    check_ends(&graph, &start, terminal);
    let trails = find_paths(&graph, &start, terminal, acyclic, &settings);
    trails.print(&graph);
    finished_message(&trails, start_time);
}


fn check_settings(graph: &Path) {
    check_if_file_exists(graph);
}


fn starting_message() {
    section_header("Starting gapwalk paths");
    explanation("This command finds every path through a Velvet graph from one oriented node (or \
                 trail) to another. Paths are printed to stdout with their lengths.");
}


fn print_settings(graph: &Path, start: &OrientedTrail, terminal: OrientedNode, acyclic: bool,
                  settings: &SearchSettings) {
    eprintln!("Settings:");
    eprintln!("  --graph {}", graph.display());
    eprintln!("  --from {}", start);
    eprintln!("  --to {}", terminal);
    if acyclic {
        eprintln!("  --acyclic");
    }
    settings.print();
    eprintln!();
}


fn finished_message(trails: &TrailSet, start_time: Instant) {
    section_header("Finished!");
    eprintln!("{} path{} found", trails.len(), plural(trails.len()));
    eprintln!("Time to run: {}", format_duration(start_time.elapsed()));
    eprintln!();
}


fn parse_ends(from: &str, to: &str) -> (OrientedTrail, OrientedNode) {
    let start = OrientedTrail::parse(from).unwrap_or_else(|e| quit_with_error(&e.to_string()));
    let terminal = OrientedNode::parse(to).unwrap_or_else(|e| quit_with_error(&e.to_string()));
    if start.is_empty() {
        quit_with_error("--from must name at least one oriented node");
    }
    (start, terminal)
}


fn check_ends(graph: &Graph, start: &OrientedTrail, terminal: OrientedNode) {
    for onode in start.iter().chain(std::iter::once(&terminal)) {
        if !graph.contains_node(onode.node_id) {
            quit_with_error(&format!("node {} is not in the graph", onode.node_id));
        }
    }
    if let Err(e) = start.check_connected(graph) {
        quit_with_error(&e.to_string());
    }
}


fn find_paths(graph: &Graph, start: &OrientedTrail, terminal: OrientedNode, acyclic: bool,
              settings: &SearchSettings) -> TrailSet {
    section_header("Finding paths");
    let pb = spinner("searching for paths...");
    let trails = if acyclic {
        explanation("Paths are found with a depth-first search that never revisits a node.");
        let Some(first) = start.first() else { return TrailSet::default() };
        AcyclicConnectionFinder::new(graph, settings).find_trails_between(first, terminal)
    } else {
        explanation("Paths are found with a dynamic programming search, which allows nodes to be \
                     revisited within the leash.");
        PathsBetweenNodesFinder::new(graph, settings).find_all_trails_between(start, terminal)
    };
    pb.finish_and_clear();
    trails
}
