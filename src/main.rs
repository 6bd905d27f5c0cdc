// This is the main file of Gapwalk and where execution starts. It mainly handles the CLI and then
// calls into other files to run whichever subcommand the user chose.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;
use clap::{Parser, Subcommand, crate_version};

mod assemble;
mod assembler;
mod bubble;
mod connect;
mod connection;
mod contig_printer;
mod distance;
mod dp;
mod error;
mod explore;
mod gapfill;
mod graph;
mod height;
mod log;
mod misc;
mod node;
mod oriented;
mod paths;
mod probes;
mod recoherence;
mod report;
mod settings;
mod traversal;
mod wanderer;

#[cfg(test)]
mod test_graphs;

use settings::SettingsArgs;

#[derive(Parser)]
#[clap(name = "Gapwalk",
       version = concat!("v", crate_version!()),
       about = "path search and fork resolution in Velvet assembly graphs for genome finishing",
       before_help = concat!(r#"   ____                          _ _    "#, "\n",
                             r#"  / ___| __ _ _ ____      ____ _| | | __"#, "\n",
                             r#" | |  _ / _` | '_ \ \ /\ / / _` | | |/ /"#, "\n",
                             r#" | |_| | (_| | |_) \ V  V / (_| | |   < "#, "\n",
                             r#"  \____|\__,_| .__/ \_/\_/ \__,_|_|_|\_\"#, "\n",
                             r#"             |_|                        "#))]
#[command(author, version, long_about = None, disable_help_subcommand = true,
          propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {

    /// find all paths between two oriented nodes
    Paths {
        /// Velvet LastGraph file (required)
        #[clap(short = 'g', long = "graph", required = true)]
        graph: PathBuf,

        /// Starting oriented node or trail, e.g. 12+ or 12+,7- (required)
        #[clap(short = 'f', long = "from", required = true, allow_hyphen_values = true)]
        from: String,

        /// Oriented node to finish at, e.g. 30- (required)
        #[clap(short = 't', long = "to", required = true, allow_hyphen_values = true)]
        to: String,

        /// Use the depth-first search which never revisits a node
        #[clap(long = "acyclic")]
        acyclic: bool,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Enable verbose output
        #[clap(long = "verbose")]
        verbose: bool,
    },

    /// assemble forward from an oriented node
    Assemble {
        /// Velvet LastGraph file (required)
        #[clap(short = 'g', long = "graph", required = true)]
        graph: PathBuf,

        /// Starting oriented node or trail, e.g. 12+ (required)
        #[clap(short = 's', long = "start", required = true, allow_hyphen_values = true)]
        start: String,

        /// Step over bubbles instead of stopping at them
        #[clap(long = "bubbly")]
        bubbly: bool,

        /// FASTA file for the assembled sequence
        #[clap(short = 'o', long = "out_fasta")]
        out_fasta: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Enable verbose output
        #[clap(long = "verbose")]
        verbose: bool,
    },

    /// explore the graph outward from an oriented node
    Explore {
        /// Velvet LastGraph file (required)
        #[clap(short = 'g', long = "graph", required = true)]
        graph: PathBuf,

        /// Starting oriented node or trail, e.g. 12+ (required)
        #[clap(short = 's', long = "start", required = true, allow_hyphen_values = true)]
        start: String,

        /// Comma-delimited oriented nodes where exploration stops
        #[clap(long = "terminals", allow_hyphen_values = true)]
        terminals: Option<String>,

        /// Also print the minimum distance to each node
        #[clap(long = "distances")]
        distances: bool,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Enable verbose output
        #[clap(long = "verbose")]
        verbose: bool,
    },

    /// find connections between contig ends
    Connect {
        /// Velvet LastGraph file (required)
        #[clap(short = 'g', long = "graph", required = true)]
        graph: PathBuf,

        /// Comma-delimited probe read IDs, start then end of each contig (required)
        #[clap(short = 'p', long = "probes", required = true)]
        probes: String,

        /// YAML (or .json) file for the connection report
        #[clap(short = 'r', long = "report")]
        report: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Enable verbose output
        #[clap(long = "verbose")]
        verbose: bool,
    },

    /// scaffold contigs and fill the gaps between them
    Gapfill {
        /// Velvet LastGraph file (required)
        #[clap(short = 'g', long = "graph", required = true)]
        graph: PathBuf,

        /// Contigs in FASTA format (required)
        #[clap(short = 'c', long = "contigs", required = true)]
        contigs: PathBuf,

        /// Comma-delimited probe read IDs, start then end of each contig (required)
        #[clap(short = 'p', long = "probes", required = true)]
        probes: String,

        /// FASTA file for the scaffolds (required)
        #[clap(short = 'o', long = "out_fasta", required = true)]
        out_fasta: PathBuf,

        /// YAML (or .json) file for the gap-fill report
        #[clap(short = 'r', long = "report")]
        report: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Enable verbose output
        #[clap(long = "verbose")]
        verbose: bool,
    },
}


fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Paths { graph, from, to, acyclic, settings, verbose }) => {
            log::init_logger(verbose);
            paths::paths(graph, from, to, acyclic, settings);
        },
        Some(Commands::Assemble { graph, start, bubbly, out_fasta, settings, verbose }) => {
            log::init_logger(verbose);
            assemble::assemble(graph, start, bubbly, out_fasta, settings);
        },
        Some(Commands::Explore { graph, start, terminals, distances, settings, verbose }) => {
            log::init_logger(verbose);
            explore::explore(graph, start, terminals, distances, settings);
        },
        Some(Commands::Connect { graph, probes, report, settings, verbose }) => {
            log::init_logger(verbose);
            connect::connect(graph, probes, report, settings);
        },
        Some(Commands::Gapfill { graph, contigs, probes, out_fasta, report, settings, verbose }) => {
            log::init_logger(verbose);
            gapfill::gapfill(graph, contigs, probes, out_fasta, report, settings);
        },
        None => {}
    }
}
