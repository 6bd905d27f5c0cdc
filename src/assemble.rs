// This file contains the code for the gapwalk assemble subcommand.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::assembler::{BubblyAssembler, ForkResolver, Metapath, SingleEndedAssembler};
use crate::distance::PairedEndNeighbourFinder;
use crate::graph::{load_graph, Graph};
use crate::log::{explanation, section_header};
use crate::misc::{check_if_file_exists, format_duration, plural, quit_with_error};
use crate::oriented::OrientedTrail;
use crate::probes::{ReadToNode, SequentialPairs};
use crate::settings::{SearchSettings, SettingsArgs};


pub fn assemble(graph: PathBuf, start: String, bubbly: bool, out_fasta: Option<PathBuf>,
                settings: SettingsArgs) {
    let start_time = Instant::now();
    check_settings(&graph);
    starting_message(bubbly);
    let settings = settings.resolve_or_quit();
    let start = OrientedTrail::parse(&start).unwrap_or_else(|e| quit_with_error(&e.to_string()));
    if start.is_empty() {
        quit_with_error("--start must name at least one oriented node");
    }
    print_settings(&graph, &start, bubbly, &out_fasta, &settings);
    let graph = load_graph(&graph, settings.min_coverage);
    if let Err(e) = start.check_connected(&graph) {
        quit_with_error(&e.to_string());
    }
    let metapath = run_assembly(&graph, &start, bubbly, &settings);
    println!("{}", metapath);
    if let Some(out_fasta) = &out_fasta {
        save_sequence(&graph, &metapath, out_fasta);
    }
    finished_message(&metapath, start_time);
}


fn check_settings(graph: &Path) {
    check_if_file_exists(graph);
}


fn starting_message(bubbly: bool) {
    section_header("Starting gapwalk assemble");
    if bubbly {
        explanation("This command walks forward through a Velvet graph from a starting trail, \
                     resolving forks where the evidence allows and stepping over bubbles where \
                     alternative paths rejoin.");
    } else {
        explanation("This command walks forward through a Velvet graph from a starting trail, \
                     resolving forks where the evidence allows and stopping at the first fork it \
                     can't resolve.");
    }
}


fn print_settings(graph: &Path, start: &OrientedTrail, bubbly: bool, out_fasta: &Option<PathBuf>,
                  settings: &SearchSettings) {
    eprintln!("Settings:");
    eprintln!("  --graph {}", graph.display());
    eprintln!("  --start {}", start);
    if bubbly {
        eprintln!("  --bubbly");
    }
    if let Some(out_fasta) = out_fasta {
        eprintln!("  --out_fasta {}", out_fasta.display());
    }
    settings.print();
    eprintln!();
}


fn finished_message(metapath: &Metapath, start_time: Instant) {
    section_header("Finished!");
    let bubbles = metapath.bubble_count();
    eprintln!("{} element{} ({} bubble{}), {} bp, stopped at {}", metapath.elements.len(),
              plural(metapath.elements.len()), bubbles, plural(bubbles), metapath.distance,
              metapath.termination);
    eprintln!("Time to run: {}", format_duration(start_time.elapsed()));
    eprintln!();
}


pub fn run_assembly(graph: &Graph, start: &OrientedTrail, bubbly: bool,
                    settings: &SearchSettings) -> Metapath {
    section_header("Assembling");
    explanation("Short tips are clipped at each fork. Remaining forks are resolved by reads \
                 spanning the junction (with a recoherence k-mer), by read pair votes (with an \
                 insert size) and by the coverage ceiling.");
    let read_to_node = ReadToNode::from_graph(graph);
    let mut resolver = ForkResolver::new(graph, settings);
    if let Some(insert_size) = settings.insert_size {
        resolver = resolver.with_paired(PairedEndNeighbourFinder {
            oracle: &SequentialPairs, read_to_node: &read_to_node, insert_size });
    }
    if bubbly {
        BubblyAssembler::new(graph, resolver, settings).assemble_from(start)
    } else {
        SingleEndedAssembler::new(graph, resolver, settings).assemble_from(start)
    }
}


fn save_sequence(graph: &Graph, metapath: &Metapath, out_fasta: &Path) {
    // Bubbles are written with their first path.
    let trail = metapath.representative_trail();
    let seq = trail.sequence(graph).unwrap_or_else(|e| {
        quit_with_error(&format!("could not build the sequence of {}: {}", trail, e))
    });
    let result = File::create(out_fasta).and_then(|mut file| {
        writeln!(file, ">assembly length={} {}", seq.len(), metapath)?;
        file.write_all(&seq)?;
        writeln!(file)
    });
    if let Err(e) = result {
        quit_with_error(&format!("could not write {}: {}", out_fasta.display(), e));
    }
}
