// This file contains miscellaneous functions used by various parts of Gapwalk.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};
use seq_io::fasta::{Reader, Record};
use std::collections::HashSet;
use std::fs::File;
use std::io::{prelude::*, BufReader, Read};
use std::path::Path;
use std::time::Duration;

use crate::error::{GraphError, Result};


pub mod strand {
    // This module lets me use strand::FORWARD for true and strand::REVERSE for false.
    pub const FORWARD: bool = true;
    pub const REVERSE: bool = false;
}


pub fn check_if_file_exists(filename: &Path) {
    // Quits with an error if the given path is not an existing file.
    let path = Path::new(filename);
    if !path.exists() {
        quit_with_error(&format!("file does not exist: {}", path.display()));
    }
    if !path.is_file() {
        quit_with_error(&format!("{} is not a file", path.display()));
    }
}


#[cfg(not(test))]
pub fn quit_with_error(text: &str) -> ! {
    // For friendly error messages, this function normally just prints the error and quits.
    eprintln!();
    eprintln!("Error: {}", text);
    std::process::exit(1);
}
#[cfg(test)]
pub fn quit_with_error(text: &str) -> ! {
    // But when running unit tests, this function instead panics so I can catch it for the test.
    panic!("{}", text);
}


fn open_maybe_gzipped(filename: &Path) -> Result<Box<dyn Read>> {
    // Returns a reader that works on both unzipped and gzipped files, judged by the first two
    // bytes of the file.
    let mut magic = [0u8; 2];
    let is_gzipped = {
        let mut file = File::open(filename)?;
        file.read_exact(&mut magic).is_ok() && magic[0] == 31 && magic[1] == 139
    };
    let file = File::open(filename)?;
    Ok(if is_gzipped { Box::new(GzDecoder::new(file)) } else { Box::new(file) })
}


pub fn load_file_lines(filename: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(open_maybe_gzipped(filename)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(lines)
}


pub fn load_fasta(filename: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    // Loads a (possibly gzipped) FASTA file into name+sequence tuples. Sequences are upper-cased
    // and names are the header up to the first space. Empty files, empty sequences and duplicate
    // names are rejected.
    let mut reader = Reader::new(open_maybe_gzipped(filename)?);
    let mut fasta_seqs = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| GraphError::Parse { line: 0,
                                                            message: e.to_string() })?;
        let name = record.id().map_err(|e| GraphError::Parse { line: 0,
                                                               message: e.to_string() })?
                         .to_string();
        let mut seq = record.full_seq().to_vec();
        seq.make_ascii_uppercase();
        fasta_seqs.push((name, seq));
    }
    check_load_fasta(&fasta_seqs, filename)?;
    Ok(fasta_seqs)
}


fn check_load_fasta(fasta_seqs: &[(String, Vec<u8>)], filename: &Path) -> Result<()> {
    let fail = |message: String| Err(GraphError::Parse { line: 0, message });
    if fasta_seqs.is_empty() {
        return fail(format!("{} contains no sequences", filename.display()));
    }
    let mut set = HashSet::new();
    for (name, sequence) in fasta_seqs {
        if name.is_empty() {
            return fail(format!("{} has an unnamed sequence", filename.display()));
        }
        if sequence.is_empty() {
            return fail(format!("{} has an empty sequence", filename.display()));
        }
        if !set.insert(name) {
            return fail(format!("{} has a duplicate name: {}", filename.display(), name));
        }
    }
    Ok(())
}


fn complement_base(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        _ => b'N'
    }
}


pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    let mut rev_seq: Vec<u8> = Vec::with_capacity(seq.len());
    for &b in seq.iter().rev() {
        rev_seq.push(complement_base(b));
    }
    rev_seq
}


pub fn format_duration(duration: std::time::Duration) -> String {
    let microseconds = duration.as_micros() % 1000000;
    let seconds =      duration.as_micros() / 1000000 % 60;
    let minutes =      duration.as_micros() / 1000000 / 60 % 60;
    let hours =        duration.as_micros() / 1000000 / 60 / 60;
    format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, microseconds)
}


pub fn spinner(message: &str) -> ProgressBar {
    if cfg!(test) {
        ProgressBar::hidden() // don't show a spinner during unit tests
    } else {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(&["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])
                .template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb
    }
}


pub fn parse_id_list(text: &str) -> Option<Vec<u64>> {
    // Parses a comma-delimited list of positive integers (e.g. read IDs). Returns None if any
    // piece fails to parse.
    text.split(',').map(|s| s.trim()).filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().ok().filter(|&n| n > 0)).collect()
}


pub fn parse_probe_ids(text: &str) -> Vec<u64> {
    // Probe read IDs come in pairs, the start and then the end of each contig.
    let Some(ids) = parse_id_list(text) else {
        quit_with_error(&format!("failed to parse '{}' as a list of read IDs", text));
    };
    if ids.is_empty() || ids.len() % 2 != 0 {
        quit_with_error("probes must be given as start,end read ID pairs, one pair per contig");
    }
    ids
}


pub fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{make_gzipped_test_file, make_test_file};
    use tempfile::tempdir;

    #[test]
    fn test_format_duration() {
        let d1 = std::time::Duration::from_micros(123456789);
        let d2 = std::time::Duration::from_micros(3661000001);
        assert_eq!(format_duration(d1), "0:02:03.456789");
        assert_eq!(format_duration(d2), "1:01:01.000001");
    }

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"GGTATCACTCAGGAAGC"), b"GCTTCCTGAGTGATACC");
        assert_eq!(reverse_complement(b"XYZ"), b"NNN");
        assert_eq!(reverse_complement(b""), b"");
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_id_list(" 7 , 12"), Some(vec![7, 12]));
        assert_eq!(parse_id_list("1,x"), None);
        assert_eq!(parse_id_list("0"), None);
        assert_eq!(parse_id_list(""), Some(vec![]));
    }

    #[test]
    fn test_parse_probe_ids() {
        assert_eq!(parse_probe_ids("3,8,12,20"), vec![3, 8, 12, 20]);
    }

    #[test]
    #[should_panic]
    fn test_parse_probe_ids_unpaired() {
        parse_probe_ids("3,8,12");
    }

    #[test]
    fn test_load_file_lines() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let gzipped = dir.path().join("gzipped.txt.gz");
        make_test_file(&plain, "abc\ndef\n");
        make_gzipped_test_file(&gzipped, "abc\ndef\n");
        assert_eq!(load_file_lines(&plain).unwrap(), vec!["abc", "def"]);
        assert_eq!(load_file_lines(&gzipped).unwrap(), vec!["abc", "def"]);
        assert!(load_file_lines(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_load_fasta() {
        let dir = tempdir().unwrap();
        let fasta = dir.path().join("contigs.fasta");
        make_test_file(&fasta, ">a info\nACGT\nacg\n>b\nTTTT\n");
        let seqs = load_fasta(&fasta).unwrap();
        assert_eq!(seqs, vec![("a".to_string(), b"ACGTACG".to_vec()),
                              ("b".to_string(), b"TTTT".to_vec())]);

        let duplicated = dir.path().join("dup.fasta");
        make_test_file(&duplicated, ">a\nACGT\n>a\nTTTT\n");
        assert!(load_fasta(&duplicated).is_err());
    }
}
