//! # gf-induce
//!
//! Grammatical-function induction and subcategorization-frame matching
//! for semantic role labeling.
//!
//! Given parse trees with FrameNet-style frames annotated on top of the
//! syntax, where frame elements carry grammatical-function (GF) and
//! phrase-type (PT) attributes, the engine learns a mapping from
//! tree-traversal paths to GFs and the subcat frames each predicate
//! occurs with. Applied to a new sentence, it proposes candidate role
//! fillers: which nodes realize which GF, grouped into the subcat frames
//! known for the predicate and ranked by training frequency.
//!
//! ## Architecture
//!
//! - **Path mapping** ([`path_map`]): frequency-annotated tries from path
//!   step sequences to GFs, per part-of-speech; queried by a BFS over the
//!   sentence tree.
//! - **Subcat frames** ([`subcat`]): per-lemma GF/preposition slot sets
//!   with multiplicity, matched with strict or subset semantics.
//! - **Orchestration** ([`induce`]): walks annotated sentences, feeds
//!   both stores, and exposes the end-to-end [`induce::GfInducer::apply`]
//!   query plus whole-engine snapshot persistence.
//!
//! Sentence structure stays external: the engine sees trees only through
//! the [`interp::SynInterpreter`] trait and opaque [`interp::NodeId`]
//! handles. [`tree::SyntaxTree`] is the bundled reference backend.
//!
//! ## Library usage
//!
//! ```no_run
//! use gf_induce::induce::GfInducer;
//! use gf_induce::model::SentenceAnnotation;
//! use gf_induce::tree::SyntaxTree;
//!
//! let tree = SyntaxTree::new();
//! let annotation = SentenceAnnotation::default();
//!
//! let mut engine = GfInducer::new(false);
//! engine.induce_from_sent(&tree, &annotation);
//! engine.compute_mapping();
//! let matches = engine.apply(&tree, &[], false);
//! ```

pub mod error;
pub mod induce;
pub mod interp;
pub mod model;
pub mod path;
pub mod path_map;
pub mod subcat;
pub mod tree;

pub use error::{GfiError, GfiResult};
pub use induce::GfInducer;
pub use interp::{NodeId, SynInterpreter};
