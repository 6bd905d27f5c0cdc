// This file defines the run reports written by the connect and gapfill subcommands.

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

use crate::connection::{Connection, ConnectionInterpreter};
use crate::error::{GraphError, Result};
use crate::probes::ProbedGraph;


#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ConnectionReport {
    pub probe_count: usize,
    pub probes_found: usize,
    pub missing_probes: Vec<usize>,
    pub connections: Vec<(usize, usize, u64)>,
    pub doubly_single_connections: usize,
    pub circular_contigs: Vec<usize>,
    pub scaffolds: Vec<String>,
}

impl ConnectionReport {
    pub fn new(probed: &ProbedGraph, interpreter: &ConnectionInterpreter) -> Self {
        let as_tuple = |c: &Connection| (c.probe1, c.probe2, c.distance);
        ConnectionReport {
            probe_count: probed.probe_count(),
            probes_found: probed.found_count(),
            missing_probes: probed.missing_probes(),
            connections: interpreter.connections().iter().map(as_tuple).collect(),
            doubly_single_connections: interpreter.doubly_single_connections().len(),
            circular_contigs: interpreter.circular_contigs(),
            scaffolds: interpreter.scaffolds().iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn save(&self, filename: &Path) -> Result<()> { save_report(filename, self) }
}


#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct GapReport {
    pub scaffold: usize,
    pub left_contig: String,
    pub right_contig: String,
    pub estimated_distance: u64,
    pub trail_count: usize,
    pub circular_paths_detected: bool,
    pub max_path_limit_exceeded: bool,
    pub filled: bool,
    pub fill_length: Option<usize>,
}


#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct GapfillReport {
    pub scaffold_count: usize,
    pub gaps_total: usize,
    pub gaps_filled: usize,
    pub gaps: Vec<GapReport>,
}

impl GapfillReport {
    pub fn new() -> Self { Self::default() }

    pub fn add_gap(&mut self, gap: GapReport) {
        self.gaps_total += 1;
        if gap.filled {
            self.gaps_filled += 1;
        }
        self.gaps.push(gap);
    }

    pub fn save(&self, filename: &Path) -> Result<()> { save_report(filename, self) }
}


/// Writes a report as YAML, or as JSON if the filename ends in .json.
pub fn save_report<T: Serialize>(filename: &Path, data: &T) -> Result<()> {
    let is_json = filename.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let text = if is_json {
        serde_json::to_string_pretty(data).map_err(|e| report_error(e.to_string()))?
    } else {
        serde_yaml::to_string(data).map_err(|e| report_error(e.to_string()))?
    };
    let mut file = File::create(filename)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}


fn report_error(message: String) -> GraphError {
    GraphError::Parse { line: 0, message }
}
