// This file defines the settings which control Gapwalk's graph searches. They can be loaded from
// a YAML file and individually overridden on the command line.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{GraphError, Result};
use crate::misc::quit_with_error;


#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Maximum distance (bp) a search may wander from its origin. None means unbounded.
    pub leash_length: Option<u64>,

    /// Length of the virtual k-mer used to resolve forks with single reads. None turns off
    /// recoherence.
    pub recoherence_kmer: Option<u32>,

    pub min_confirming_recoherence_reads: usize,

    /// Branches that dead-end within this many bp are clipped at forks. Negative values turn off
    /// tip clipping.
    pub max_tip_length: i64,

    /// Fork neighbours with a coverage above this are ignored during assembly.
    pub max_coverage_at_fork: Option<f64>,

    pub max_cycles: usize,
    pub max_gapfill_paths: usize,
    pub max_explore_nodes: Option<usize>,
    pub ignore_directions: bool,
    pub max_nodes: Option<usize>,

    /// Expected paired-end insert size. When given, paired-end neighbours and fork voting are
    /// used.
    pub insert_size: Option<u64>,

    /// Nodes below this coverage are removed when the graph is loaded.
    pub min_coverage: Option<f64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            leash_length: None,
            recoherence_kmer: None,
            min_confirming_recoherence_reads: 1,
            max_tip_length: 100,
            max_coverage_at_fork: None,
            max_cycles: 1,
            max_gapfill_paths: 10,
            max_explore_nodes: None,
            ignore_directions: false,
            max_nodes: None,
            insert_size: None,
            min_coverage: None,
        }
    }
}

impl SearchSettings {
    pub fn load_from_yaml(filename: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(filename)?;
        serde_yaml::from_str(&text).map_err(|e| GraphError::Parse {
            line: e.location().map(|l| l.line()).unwrap_or(0),
            message: format!("{}: {}", filename.display(), e),
        })
    }

    pub fn save_to_yaml(&self, filename: &Path) -> Result<()> {
        let yaml_string = serde_yaml::to_string(self).map_err(|e| GraphError::Parse {
            line: 0, message: e.to_string() })?;
        let mut file = File::create(filename)?;
        file.write_all(yaml_string.as_bytes())?;
        Ok(())
    }

    pub fn print(&self) {
        // Prints the search settings in the same style as the command-line settings.
        let show = |v: Option<String>| v.unwrap_or_else(|| "none".to_string());
        eprintln!("  --leash {}", show(self.leash_length.map(|v| v.to_string())));
        eprintln!("  --recoherence_kmer {}", show(self.recoherence_kmer.map(|v| v.to_string())));
        eprintln!("  --min_confirming_reads {}", self.min_confirming_recoherence_reads);
        eprintln!("  --max_tip_length {}", self.max_tip_length);
        eprintln!("  --max_coverage_at_fork {}",
                  show(self.max_coverage_at_fork.map(|v| v.to_string())));
        eprintln!("  --max_cycles {}", self.max_cycles);
        eprintln!("  --max_gapfill_paths {}", self.max_gapfill_paths);
        eprintln!("  --max_explore_nodes {}", show(self.max_explore_nodes.map(|v| v.to_string())));
        eprintln!("  --max_nodes {}", show(self.max_nodes.map(|v| v.to_string())));
        if self.ignore_directions {
            eprintln!("  --ignore_directions");
        }
        eprintln!("  --insert_size {}", show(self.insert_size.map(|v| v.to_string())));
        eprintln!("  --min_coverage {}", show(self.min_coverage.map(|v| v.to_string())));
    }
}


/// Command-line overrides for SearchSettings. Each value given replaces the value loaded from the
/// settings file (or the default).
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// YAML file of search settings
    #[clap(long = "settings")]
    pub settings: Option<std::path::PathBuf>,

    /// Maximum search distance in bp
    #[clap(long = "leash")]
    pub leash: Option<u64>,

    /// Virtual k-mer length for read-based fork resolution
    #[clap(long = "recoherence_kmer")]
    pub recoherence_kmer: Option<u32>,

    /// Reads required to confirm a recoherent junction
    #[clap(long = "min_confirming_reads")]
    pub min_confirming_reads: Option<usize>,

    /// Clip dead-end branches up to this length at forks (negative to disable)
    #[clap(long = "max_tip_length", allow_hyphen_values = true)]
    pub max_tip_length: Option<i64>,

    /// Ignore fork neighbours above this coverage
    #[clap(long = "max_coverage_at_fork")]
    pub max_coverage_at_fork: Option<f64>,

    /// Times an exploration may pass around the same loop
    #[clap(long = "max_cycles")]
    pub max_cycles: Option<usize>,

    /// Maximum number of alternative paths to report for one gap
    #[clap(long = "max_gapfill_paths")]
    pub max_gapfill_paths: Option<usize>,

    /// Stop searches after exploring this many nodes
    #[clap(long = "max_explore_nodes")]
    pub max_explore_nodes: Option<usize>,

    /// Keep only this many of the closest nodes in distance searches
    #[clap(long = "max_nodes")]
    pub max_nodes: Option<usize>,

    /// Search out from both sides of a node in distance searches
    #[clap(long = "ignore_directions")]
    pub ignore_directions: bool,

    /// Paired-end insert size (enables paired-end neighbours)
    #[clap(long = "insert_size")]
    pub insert_size: Option<u64>,

    /// Remove nodes below this coverage before searching
    #[clap(long = "min_coverage")]
    pub min_coverage: Option<f64>,

    /// Save the effective search settings to this YAML file
    #[clap(long = "save_settings")]
    pub save_settings: Option<std::path::PathBuf>,
}

impl SettingsArgs {
    pub fn resolve(&self) -> Result<SearchSettings> {
        let mut settings = match &self.settings {
            Some(filename) => SearchSettings::load_from_yaml(filename)?,
            None => SearchSettings::default(),
        };
        if self.leash.is_some() { settings.leash_length = self.leash; }
        if self.recoherence_kmer.is_some() { settings.recoherence_kmer = self.recoherence_kmer; }
        if let Some(n) = self.min_confirming_reads { settings.min_confirming_recoherence_reads = n; }
        if let Some(n) = self.max_tip_length { settings.max_tip_length = n; }
        if self.max_coverage_at_fork.is_some() {
            settings.max_coverage_at_fork = self.max_coverage_at_fork;
        }
        if let Some(n) = self.max_cycles { settings.max_cycles = n; }
        if let Some(n) = self.max_gapfill_paths { settings.max_gapfill_paths = n; }
        if self.max_explore_nodes.is_some() { settings.max_explore_nodes = self.max_explore_nodes; }
        if self.max_nodes.is_some() { settings.max_nodes = self.max_nodes; }
        if self.ignore_directions { settings.ignore_directions = true; }
        if self.insert_size.is_some() { settings.insert_size = self.insert_size; }
        if self.min_coverage.is_some() { settings.min_coverage = self.min_coverage; }
        Ok(settings)
    }

    /// Resolves the settings for a subcommand, quitting on a bad settings file, and saves them if
    /// asked to.
    pub fn resolve_or_quit(&self) -> SearchSettings {
        let settings = self.resolve().unwrap_or_else(|e| {
            quit_with_error(&format!("could not load settings: {}", e))
        });
        if let Some(filename) = &self.save_settings {
            settings.save_to_yaml(filename).unwrap_or_else(|e| {
                quit_with_error(&format!("could not save {}: {}", filename.display(), e))
            });
        }
        settings
    }
}
