// This file contains functions for writing Gapwalk's stderr output: section headers and
// explanations for the user, plus setup of the logger used to trace search decisions.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use chrono::Local;
use colored::Colorize;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};


pub fn section_header(text: &str) {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let date = format!("({})", now);
    eprintln!();
    eprintln!("{} {}", text.bold().bright_yellow().underline(), date.dimmed());
}


pub fn explanation(text: &str) {
    let width = term_width().saturating_sub(1).max(40);
    for line in textwrap::wrap(text, width) {
        eprintln!("{}", line.dimmed());
    }
    eprintln!();
}


fn term_width() -> usize {
    match term_size::dimensions_stderr() {
        Some((w, _)) => w.min(100),
        None => 80,
    }
}


pub fn init_logger(verbose: bool) {
    // Search tracing goes through the log facade. By default only warnings are shown, but
    // --verbose turns on debug-level messages describing forks, bubbles and probe mapping.
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off)
                                     .set_target_level(LevelFilter::Error).build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}
