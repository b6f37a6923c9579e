//! gfi CLI: grammatical-function induction over JSON corpora.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use tracing::warn;

use gf_induce::error::{CorpusError, GfiResult};
use gf_induce::induce::GfInducer;
use gf_induce::interp::NodeId;
use gf_induce::model::SentenceAnnotation;
use gf_induce::tree::SyntaxTree;

#[derive(Parser)]
#[command(name = "gfi", version, about = "Grammatical-function induction engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Induce GF/path mappings and subcat frames from an annotated corpus.
    Train {
        /// Path to the JSON corpus (sentences with trees and annotations).
        #[arg(long)]
        corpus: PathBuf,

        /// Where to write the trained engine snapshot.
        #[arg(long)]
        out: PathBuf,

        /// Keep frame and FE names in stored subcat frames.
        #[arg(long)]
        include_sem: bool,

        /// Drop all paths that traverse upward.
        #[arg(long)]
        downpaths_only: bool,

        /// Drop all paths longer than this.
        #[arg(long)]
        max_pathlen: Option<usize>,

        /// Remove a GF label after induction (repeatable).
        #[arg(long = "remove-gf")]
        remove_gfs: Vec<String>,

        /// Treat a failed snapshot save as fatal instead of warning.
        #[arg(long)]
        strict_save: bool,
    },

    /// Apply a trained engine to one sentence.
    Apply {
        /// Path to a trained engine snapshot.
        #[arg(long)]
        engine: PathBuf,

        /// Path to the JSON sentence (tree plus target node ids).
        #[arg(long)]
        sentence: PathBuf,

        /// Only return frames where every found GF fits a slot.
        #[arg(long)]
        strict: bool,
    },

    /// Show statistics of a trained engine snapshot.
    Inspect {
        /// Path to a trained engine snapshot.
        #[arg(long)]
        engine: PathBuf,
    },
}

/// Training corpus: one tree and one annotation layer per sentence.
#[derive(Deserialize)]
struct Corpus {
    sentences: Vec<CorpusSentence>,
}

#[derive(Deserialize)]
struct CorpusSentence {
    tree: SyntaxTree,
    annotation: SentenceAnnotation,
}

/// Apply input: a tree and the candidate predicate expression.
#[derive(Deserialize)]
struct ApplyInput {
    tree: SyntaxTree,
    target: Vec<NodeId>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> GfiResult<T> {
    let content = std::fs::read_to_string(path).map_err(|source| CorpusError::Io {
        path: path.clone(),
        source,
    })?;
    let value = serde_json::from_str(&content).map_err(|e| CorpusError::Json {
        path: path.clone(),
        message: e.to_string(),
    })?;
    Ok(value)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            corpus,
            out,
            include_sem,
            downpaths_only,
            max_pathlen,
            remove_gfs,
            strict_save,
        } => {
            let corpus_data: Corpus = read_json(&corpus)?;

            let mut engine = GfInducer::new(include_sem);
            for sentence in &corpus_data.sentences {
                engine.induce_from_sent(&sentence.tree, &sentence.annotation);
            }
            engine.compute_mapping();

            if downpaths_only {
                engine.restrict_to_downpaths();
            }
            if let Some(n) = max_pathlen {
                engine.restrict_pathlen(n);
            }
            if !remove_gfs.is_empty() {
                engine.remove_gfs(&remove_gfs);
            }

            match engine.save(&out) {
                Ok(()) => {
                    println!(
                        "Trained on {} sentence(s), snapshot at {}",
                        corpus_data.sentences.len(),
                        out.display()
                    );
                }
                Err(e) if strict_save => return Err(e.into()),
                Err(e) => warn!(error = %e, "snapshot save failed, continuing"),
            }

            println!(
                "{}",
                serde_json::to_string_pretty(&engine.stats()).into_diagnostic()?
            );
        }

        Commands::Apply {
            engine,
            sentence,
            strict,
        } => {
            let Some(trained) = GfInducer::load(&engine) else {
                miette::bail!("no usable engine snapshot at {}", engine.display());
            };
            let input: ApplyInput = read_json(&sentence)?;

            let matches = trained.apply(&input.tree, &input.target, strict);
            println!("{}", serde_json::to_string_pretty(&matches).into_diagnostic()?);
        }

        Commands::Inspect { engine } => {
            let Some(trained) = GfInducer::load(&engine) else {
                miette::bail!("no usable engine snapshot at {}", engine.display());
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&trained.stats()).into_diagnostic()?
            );
        }
    }

    Ok(())
}
