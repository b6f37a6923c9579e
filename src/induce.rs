//! The induction engine: learns GF/path mappings and subcat frames from
//! annotated sentences and proposes role fillers for new ones.
//!
//! Two-phase lifecycle: accumulate observations with
//! [`GfInducer::induce_from_sent`], freeze with
//! [`GfInducer::compute_mapping`], then query with [`GfInducer::apply`].
//! The engine owns only its learned state; tree access always goes
//! through a [`SynInterpreter`] passed into the call, so a frozen engine
//! can be snapshot to disk and reloaded independently of any sentence
//! model.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path as FsPath;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GfiResult, SnapshotError};
use crate::interp::{NodeId, SynInterpreter};
use crate::model::SentenceAnnotation;
use crate::path_map::GfPathMapping;
use crate::subcat::{FrameMatch, SubcatFrameStore, SubcatTuple};

/// Counts describing a trained engine, for inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub pos_buckets: usize,
    pub gf_tries: usize,
    pub path_lemmas: usize,
    pub subcat_lemmas: usize,
    pub subcat_frames: usize,
    pub distinct_signatures: usize,
}

/// Grammatical-function induction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GfInducer {
    gf_path_map: GfPathMapping,
    subcat_frames: SubcatFrameStore,
}

impl GfInducer {
    /// Create an empty engine, ready for `induce_from_sent`.
    ///
    /// `include_sem`: keep frame and FE names as part of stored subcat
    /// frames; when `false` those fields stay `None`.
    pub fn new(include_sem: bool) -> Self {
        Self {
            gf_path_map: GfPathMapping::new(),
            subcat_frames: SubcatFrameStore::new(include_sem),
        }
    }

    // -----------------------------------------------------------------
    // Inducing mappings from training data
    // -----------------------------------------------------------------

    /// Learn from one annotated sentence.
    ///
    /// Frames without a resolvable target or lemma are skipped, as are
    /// frame elements without GF/PT attributes and FE nodes without a
    /// path from the target. A bad sentence never aborts the batch.
    pub fn induce_from_sent(&mut self, interp: &dyn SynInterpreter, sent: &SentenceAnnotation) {
        for frame in &sent.frames {
            if frame.target.is_empty() {
                continue;
            }
            let Some((maintarget, lemma, pos)) = main_node_and_lemma(interp, &frame.target) else {
                debug!(frame = %frame.name, "unresolvable target, skipping frame");
                continue;
            };

            let mut subcatframe: Vec<SubcatTuple> = Vec::new();

            for fe in &frame.elements {
                if fe.name == "target" {
                    continue;
                }
                if fe.gf.is_none() && fe.pt.is_none() {
                    // No GF or PT information: nothing to learn here.
                    continue;
                }
                let gfpt = format!(
                    "{} {}",
                    fe.gf.as_deref().unwrap_or(""),
                    fe.pt.as_deref().unwrap_or("")
                );

                for &syn_node in &fe.nodes {
                    let Some(path) = interp.path_between(maintarget, syn_node) else {
                        debug!(frame = %frame.name, fe = %fe.name, "no path to FE node, skipping");
                        continue;
                    };

                    self.gf_path_map
                        .store_mapping(&gfpt, &path, syn_node, &lemma, &pos, interp);

                    let prep = interp.preposition(syn_node).map(|p| p.to_lowercase());
                    subcatframe.push((gfpt.clone(), prep, fe.name.clone()));
                }
            }

            self.subcat_frames
                .store_subcatframe(&subcatframe, &frame.name, &lemma, &pos);
        }
    }

    /// Finish inducing: reencode the learned mappings in the form that
    /// makes `apply` fast. Call once, after the whole training batch.
    pub fn compute_mapping(&mut self) {
        self.gf_path_map.finish_inducing();
    }

    // -----------------------------------------------------------------
    // Restricting induced mappings
    // -----------------------------------------------------------------

    /// Exclude all paths that include an upward edge.
    pub fn restrict_to_downpaths(&mut self) {
        self.gf_path_map.restrict_to_downpaths();
    }

    /// Only keep paths up to length `n`.
    pub fn restrict_pathlen(&mut self, n: usize) {
        self.gf_path_map.restrict_pathlen(n);
    }

    /// Remove GFs that are often incorrect.
    pub fn remove_gfs(&mut self, gf_list: &[String]) {
        self.gf_path_map.remove_gfs(gf_list);
    }

    // -----------------------------------------------------------------
    // Applying mappings to new data
    // -----------------------------------------------------------------

    /// Determine all consistent subcat frames for the main node of
    /// `nodelist` (a candidate predicate expression, single- or
    /// multi-node), ranked by training frequency.
    ///
    /// `strict`: only return frames where every found GF fits a slot;
    /// otherwise frames matching a subset of the found GFs qualify too.
    pub fn apply(
        &self,
        interp: &dyn SynInterpreter,
        nodelist: &[NodeId],
        strict: bool,
    ) -> Vec<FrameMatch> {
        let Some((mainnode, lemma, pos)) = main_node_and_lemma(interp, nodelist) else {
            return Vec::new();
        };
        if !self.subcat_frames.lemma_known(&lemma, &pos) {
            // Nothing known about the lemma.
            return Vec::new();
        }

        let node_to_gf = self
            .gf_path_map
            .potential_gfs_of_node(mainnode, &lemma, &pos, interp);

        self.subcat_frames
            .match_frames(&lemma, &pos, &node_to_gf, strict)
    }

    /// Apply the engine and flatten the best (most frequent) matched
    /// frame into a node -> `"<gf> <prep>"` label map, the view a
    /// downstream feature extractor wants.
    pub fn best_gf_labels(
        &self,
        interp: &dyn SynInterpreter,
        nodelist: &[NodeId],
    ) -> BTreeMap<NodeId, String> {
        let mut node_to_label = BTreeMap::new();
        let matches = self.apply(interp, nodelist, false);
        // `apply` ranks by frequency, best first.
        let Some(best) = matches.first() else {
            return node_to_label;
        };
        for slot in &best.slots {
            for &node in &slot.nodes {
                node_to_label.insert(
                    node,
                    format!("{} {}", slot.gf, slot.prep.as_deref().unwrap_or("")),
                );
            }
        }
        node_to_label
    }

    /// Counts describing the trained engine.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            pos_buckets: self.gf_path_map.pos_count(),
            gf_tries: self.gf_path_map.gf_count(),
            path_lemmas: self.gf_path_map.lemma_count(),
            subcat_lemmas: self.subcat_frames.lemma_count(),
            subcat_frames: self.subcat_frames.frame_count(),
            distinct_signatures: self.subcat_frames.signature_count(),
        }
    }

    // -----------------------------------------------------------------
    // Snapshot persistence
    // -----------------------------------------------------------------

    /// Snapshot the whole engine to `path`.
    ///
    /// The caller decides whether a failed save is fatal; the in-memory
    /// engine is unaffected either way.
    pub fn save(&self, path: &FsPath) -> GfiResult<()> {
        let file = File::create(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        bincode::serialize_into(BufWriter::new(file), self).map_err(|e| {
            SnapshotError::Serialization {
                message: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// Load an engine snapshot from `path`.
    ///
    /// A missing or corrupt snapshot logs a warning and returns `None`;
    /// the caller decides whether the absence of a trained engine is
    /// fatal.
    pub fn load(path: &FsPath) -> Option<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read engine snapshot");
                return None;
            }
        };
        match bincode::deserialize(&bytes) {
            Ok(engine) => Some(engine),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed engine snapshot");
                None
            }
        }
    }
}

/// Main node, lemma and POS of an expression. The POS of a verb with
/// detectable voice is suffixed with it (e.g. `"verb-passive"`), for
/// training and inference alike.
fn main_node_and_lemma(
    interp: &dyn SynInterpreter,
    nodelist: &[NodeId],
) -> Option<(NodeId, String, String)> {
    let mainnode = interp.main_node_of_expr(nodelist)?;
    let lemma = interp.lemma_backoff(mainnode)?;
    let mut pos = interp.category(mainnode).unwrap_or_default();
    if let Some(voice) = interp.voice(mainnode) {
        pos = format!("{pos}-{voice}");
    }
    Some((mainnode, lemma, pos))
}
