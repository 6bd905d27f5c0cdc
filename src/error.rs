// This file defines the error type returned by Gapwalk's graph code.

// Copyright 2026 Gapwalk contributors

// This file is part of Gapwalk. Gapwalk is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Gapwalk
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Gapwalk. If not, see <http://www.gnu.org/licenses/>.

use thiserror::Error;


/// Errors raised by graph loading, probe mapping and sequence reconstruction. Running out of
/// search space (leash, node caps, path caps) is not an error: searches report it with flags on
/// their results instead.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("not enough sequence information for trail {trail}: {available} bp of twin context \
             available but {required} bp needed")]
    InsufficientSequence { trail: String, available: usize, required: usize },

    #[error("cannot resolve trail sequence: {message}")]
    UnresolvableTrail { message: String },

    #[error("malformed trail: {message}")]
    MalformedTrail { message: String },

    #[error("invalid orientation token: {token}")]
    InvalidOrientation { token: String },

    #[error("node {0} does not exist in the graph")]
    MissingNode(u32),

    #[error("none of the probes could be found in the graph")]
    NoProbesFound,

    #[error("parse error (line {line}): {message}")]
    Parse { line: usize, message: String },

    #[error("external tool failed: {message}")]
    ExternalTool { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
