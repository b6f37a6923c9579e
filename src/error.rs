//! Rich diagnostic error types for the gf-induce engine.
//!
//! Each concern defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. Note that most failure
//! conditions during induction are not errors at all: unresolvable
//! targets, lemmas and paths are logged and skipped so a single bad
//! sentence never aborts a training batch.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the gf-induce engine.
#[derive(Debug, Error, Diagnostic)]
pub enum GfiError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Corpus(#[from] CorpusError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Tree(#[from] TreeError),
}

// ---------------------------------------------------------------------------
// Snapshot errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SnapshotError {
    #[error("cannot write snapshot to {path}: {source}")]
    #[diagnostic(
        code(gfi::snapshot::io),
        help(
            "Check that the target directory exists, has correct permissions, \
             and that the disk is not full. A failed save leaves the in-memory \
             engine intact; retrain or retry with a different path."
        )
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot serialization failed: {message}")]
    #[diagnostic(
        code(gfi::snapshot::serialize),
        help(
            "The engine state could not be encoded. This should not happen \
             for a well-formed engine — file a bug report."
        )
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Corpus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CorpusError {
    #[error("cannot read corpus file {path}: {source}")]
    #[diagnostic(
        code(gfi::corpus::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed corpus JSON in {path}: {message}")]
    #[diagnostic(
        code(gfi::corpus::json),
        help(
            "The corpus must be JSON with a top-level `sentences` array, \
             each entry carrying a `tree` (node list) and an `annotation` \
             (frames with frame elements)."
        )
    )]
    Json { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Tree errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TreeError {
    #[error("node {node} references parent {parent}, which does not precede it")]
    #[diagnostic(
        code(gfi::tree::bad_parent),
        help(
            "Serialized trees are flat node lists in parent-first order; \
             every `parent` index must point at an earlier entry."
        )
    )]
    BadParent { node: usize, parent: u32 },
}

/// Convenience alias for functions returning gf-induce results.
pub type GfiResult<T> = std::result::Result<T, GfiError>;
