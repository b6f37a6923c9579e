//! Subcategorization frames: which GF/preposition slots co-occur for a
//! predicate, and matching candidate role fillers against them.
//!
//! A subcat frame is the canonically sorted list of (GF, preposition)
//! slots observed together in one predicate occurrence, each slot tagged
//! with a multiplicity. Frames are stored per lemma/POS; a global
//! signature counter tracks how often each frame shape occurred, which is
//! what ranks match results.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::interp::NodeId;
use crate::path_map::GfAssignment;

/// How many fillers a slot had in the observed occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    One,
    Many,
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiplicity::One => f.write_str("one"),
            Multiplicity::Many => f.write_str("many"),
        }
    }
}

/// One slot of a subcat frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcatSlot {
    pub gf: String,
    pub prep: Option<String>,
    /// Space-joined FE names, or `None` when semantic labels are excluded.
    pub fe: Option<String>,
    pub multiplicity: Multiplicity,
}

/// A subcat frame: slots sorted by (GF, preposition).
pub type SubcatFrame = Vec<SubcatSlot>;

/// A slot of a matched frame, with multiplicity resolved to the actual
/// filler nodes (best frequency first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSlot {
    pub gf: String,
    pub prep: Option<String>,
    pub fe: Option<String>,
    pub nodes: Vec<NodeId>,
}

/// One frame matched against a sentence, ranked by training frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMatch {
    /// Frame name, `None` when semantic labels are excluded.
    pub frame: Option<String>,
    pub slots: Vec<MatchedSlot>,
    pub freq: u32,
}

/// One (GF, preposition, FE name) observation within a predicate
/// occurrence, as collected by the orchestrator.
pub type SubcatTuple = (String, Option<String>, String);

/// Per-lemma store of observed subcat frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcatFrameStore {
    /// "lemma!pos" -> list of (frame name, subcat frame).
    word_to_frames: BTreeMap<String, Vec<(Option<String>, SubcatFrame)>>,
    /// Frame signature -> occurrence count.
    frame_freq: BTreeMap<String, u32>,
    /// Keep frame and FE names in stored frames?
    include_sem: bool,
}

impl SubcatFrameStore {
    pub fn new(include_sem: bool) -> Self {
        Self {
            word_to_frames: BTreeMap::new(),
            frame_freq: BTreeMap::new(),
            include_sem,
        }
    }

    // -----------------------------------------------------------------
    // Storing induced frames
    // -----------------------------------------------------------------

    /// Record the subcat frame of one predicate occurrence, given as the
    /// list of (gfpt, preposition, FE name) tuples observed for it.
    pub fn store_subcatframe(
        &mut self,
        tuples: &[SubcatTuple],
        frame: &str,
        lemma: &str,
        pos: &str,
    ) {
        let frame_name = if self.include_sem {
            Some(frame.to_string())
        } else {
            None
        };

        // Group by (gf, prep) in first-seen order, counting occurrences
        // and collecting distinct FE names per pair.
        let mut pair_order: Vec<(String, Option<String>)> = Vec::new();
        let mut pair_count: HashMap<(String, Option<String>), u32> = HashMap::new();
        let mut pair_fes: HashMap<(String, Option<String>), Vec<String>> = HashMap::new();

        for (gf, prep, fe) in tuples {
            let pair = (gf.clone(), prep.clone());
            if !pair_count.contains_key(&pair) {
                pair_order.push(pair.clone());
            }
            *pair_count.entry(pair.clone()).or_insert(0) += 1;
            let fes = pair_fes.entry(pair).or_default();
            if !fes.contains(fe) {
                fes.push(fe.clone());
            }
        }

        let mut subcatframe: SubcatFrame = pair_order
            .into_iter()
            .map(|pair| {
                let count = pair_count[&pair];
                let fe = if self.include_sem {
                    Some(pair_fes[&pair].join(" "))
                } else {
                    None
                };
                let (gf, prep) = pair;
                SubcatSlot {
                    gf,
                    prep,
                    fe,
                    multiplicity: if count == 1 {
                        Multiplicity::One
                    } else {
                        Multiplicity::Many
                    },
                }
            })
            .collect();
        subcatframe.sort_by(|a, b| {
            (a.gf.as_str(), a.prep.as_deref().unwrap_or(""))
                .cmp(&(b.gf.as_str(), b.prep.as_deref().unwrap_or("")))
        });

        let key = crate::path_map::lemma_pos_key(lemma, pos);
        let stored = self.word_to_frames.entry(key).or_default();
        let entry = (frame_name, subcatframe);
        if !stored.contains(&entry) {
            stored.push(entry.clone());
        }

        // Occurrence count, not distinct-frame count: bump even when the
        // frame itself was already stored.
        *self
            .frame_freq
            .entry(frame_signature(&entry.1))
            .or_insert(0) += 1;
    }

    // -----------------------------------------------------------------
    // Using stored data
    // -----------------------------------------------------------------

    pub fn lemma_known(&self, lemma: &str, pos: &str) -> bool {
        self.word_to_frames
            .contains_key(&crate::path_map::lemma_pos_key(lemma, pos))
    }

    /// Match a node -> GF assignment against all frames known for
    /// `lemma`/`pos`.
    ///
    /// Returns matched frames ranked by descending training frequency,
    /// deduplicated by the extended-frame signature (slot labels plus
    /// assigned node ids); the first occurrence after sorting wins.
    pub fn match_frames(
        &self,
        lemma: &str,
        pos: &str,
        node_to_gf: &BTreeMap<NodeId, GfAssignment>,
        strict: bool,
    ) -> Vec<FrameMatch> {
        let Some(frames) = self
            .word_to_frames
            .get(&crate::path_map::lemma_pos_key(lemma, pos))
        else {
            return Vec::new();
        };

        let mut matches: Vec<FrameMatch> = frames
            .iter()
            .filter_map(|(frame_name, subcatframe)| {
                match_subcat(subcatframe, node_to_gf, strict).map(|slots| FrameMatch {
                    frame: frame_name.clone(),
                    slots,
                    freq: self
                        .frame_freq
                        .get(&frame_signature(subcatframe))
                        .copied()
                        .unwrap_or(0),
                })
            })
            .collect();

        debug!(
            lemma,
            pos,
            candidates = frames.len(),
            matched = matches.len(),
            "subcat frame matching"
        );

        // A "many" slot filled by a single node can make two stored
        // frames extend identically; sort by frequency, then drop the
        // duplicates.
        matches.sort_by(|a, b| b.freq.cmp(&a.freq));
        let mut seen: HashSet<String> = HashSet::new();
        matches.retain(|m| seen.insert(extended_signature(&m.slots)));
        matches
    }

    /// Number of lemma/POS keys with stored frames.
    pub fn lemma_count(&self) -> usize {
        self.word_to_frames.len()
    }

    /// Number of stored (lemma, frame) entries.
    pub fn frame_count(&self) -> usize {
        self.word_to_frames.values().map(Vec::len).sum()
    }

    /// Number of distinct frame signatures seen in training.
    pub fn signature_count(&self) -> usize {
        self.frame_freq.len()
    }
}

/// Match one subcat frame against a node -> GF assignment.
///
/// Every node must fit some slot when `strict` is set; every slot must be
/// filled by at least one node regardless of `strict`. Slots with
/// multiplicity `One` that attracted several nodes keep only the filler
/// with the highest path frequency.
fn match_subcat(
    subcatframe: &SubcatFrame,
    node_to_gf: &BTreeMap<NodeId, GfAssignment>,
    strict: bool,
) -> Option<Vec<MatchedSlot>> {
    let mut slot_nodes: BTreeMap<(String, Option<String>), Vec<NodeId>> = BTreeMap::new();

    for (node, assignment) in node_to_gf {
        let fits = subcatframe
            .iter()
            .any(|slot| slot.gf == assignment.gf && slot.prep == assignment.prep);
        if fits {
            slot_nodes
                .entry((assignment.gf.clone(), assignment.prep.clone()))
                .or_default()
                .push(*node);
        } else if strict {
            return None;
        }
    }

    // Opposite direction: every slot needs at least one filler.
    for slot in subcatframe {
        let key = (slot.gf.clone(), slot.prep.clone());
        let nodes = slot_nodes.get_mut(&key)?;

        if slot.multiplicity == Multiplicity::One && nodes.len() > 1 {
            nodes.sort_by(|a, b| node_to_gf[b].freq.cmp(&node_to_gf[a].freq));
            nodes.truncate(1);
        }
    }

    Some(
        subcatframe
            .iter()
            .map(|slot| {
                let mut nodes = slot_nodes[&(slot.gf.clone(), slot.prep.clone())].clone();
                nodes.sort_by(|a, b| node_to_gf[b].freq.cmp(&node_to_gf[a].freq));
                MatchedSlot {
                    gf: slot.gf.clone(),
                    prep: slot.prep.clone(),
                    fe: slot.fe.clone(),
                    nodes,
                }
            })
            .collect(),
    )
}

/// Canonical signature of a stored frame, used as frequency key.
fn frame_signature(subcatframe: &SubcatFrame) -> String {
    let mut parts: Vec<String> = subcatframe
        .iter()
        .map(|slot| {
            format!(
                "{} {} {}",
                slot.gf,
                slot.prep.as_deref().unwrap_or(""),
                slot.multiplicity
            )
        })
        .collect();
    parts.sort();
    parts.join(", ")
}

/// Signature of an extended frame including the assigned node ids, used
/// for deduplicating match results.
fn extended_signature(slots: &[MatchedSlot]) -> String {
    let mut parts: Vec<String> = slots
        .iter()
        .map(|slot| {
            let ids: Vec<String> = slot.nodes.iter().map(ToString::to_string).collect();
            format!(
                "{} {} {}",
                slot.gf,
                slot.prep.as_deref().unwrap_or(""),
                ids.join(",")
            )
        })
        .collect();
    parts.sort();
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(gf: &str, prep: Option<&str>, freq: u32) -> GfAssignment {
        GfAssignment {
            gf: gf.to_string(),
            prep: prep.map(str::to_string),
            freq,
        }
    }

    fn tuple(gf: &str, prep: Option<&str>, fe: &str) -> SubcatTuple {
        (gf.to_string(), prep.map(str::to_string), fe.to_string())
    }

    fn ext_obj_store() -> SubcatFrameStore {
        let mut store = SubcatFrameStore::new(false);
        store.store_subcatframe(
            &[tuple("Ext", None, "Donor"), tuple("Obj", None, "Theme")],
            "Giving",
            "give",
            "verb",
        );
        store
    }

    #[test]
    fn slots_are_sorted_and_counted() {
        let mut store = SubcatFrameStore::new(true);
        store.store_subcatframe(
            &[
                tuple("Obj", None, "Theme"),
                tuple("Ext", None, "Donor"),
                tuple("Obj", None, "Goal"),
            ],
            "Giving",
            "give",
            "verb",
        );

        let frames = &store.word_to_frames["give!verb"];
        assert_eq!(frames.len(), 1);
        let (name, frame) = &frames[0];
        assert_eq!(name.as_deref(), Some("Giving"));
        assert_eq!(frame[0].gf, "Ext");
        assert_eq!(frame[0].multiplicity, Multiplicity::One);
        assert_eq!(frame[1].gf, "Obj");
        assert_eq!(frame[1].multiplicity, Multiplicity::Many);
        assert_eq!(frame[1].fe.as_deref(), Some("Theme Goal"));
    }

    #[test]
    fn repeat_occurrences_count_frequency_not_frames() {
        let mut store = SubcatFrameStore::new(false);
        for _ in 0..3 {
            store.store_subcatframe(&[tuple("Ext", None, "Donor")], "Giving", "give", "verb");
        }

        assert_eq!(store.frame_count(), 1);
        assert_eq!(store.frame_freq["Ext  one"], 3);
    }

    #[test]
    fn lemma_known_reflects_stored_frames() {
        let store = ext_obj_store();
        assert!(store.lemma_known("give", "verb"));
        assert!(!store.lemma_known("take", "verb"));
        assert!(!store.lemma_known("give", "noun"));
    }

    #[test]
    fn uncovered_slot_fails_even_without_strict() {
        let store = ext_obj_store();
        let mut node_to_gf = BTreeMap::new();
        node_to_gf.insert(NodeId(1), assignment("Ext", None, 5));

        assert!(store.match_frames("give", "verb", &node_to_gf, false).is_empty());
        assert!(store.match_frames("give", "verb", &node_to_gf, true).is_empty());
    }

    #[test]
    fn strict_rejects_unmatched_nodes_subset_ignores_them() {
        let mut store = SubcatFrameStore::new(false);
        store.store_subcatframe(&[tuple("Ext", None, "Donor")], "Giving", "give", "verb");

        let mut node_to_gf = BTreeMap::new();
        node_to_gf.insert(NodeId(1), assignment("Ext", None, 5));
        node_to_gf.insert(NodeId(2), assignment("Comp", None, 4));

        assert!(store.match_frames("give", "verb", &node_to_gf, true).is_empty());

        let matches = store.match_frames("give", "verb", &node_to_gf, false);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slots.len(), 1);
        assert_eq!(matches[0].slots[0].nodes, vec![NodeId(1)]);
    }

    #[test]
    fn preposition_must_match_exactly() {
        let mut store = SubcatFrameStore::new(false);
        store.store_subcatframe(&[tuple("Comp", Some("to"), "Recipient")], "Giving", "give", "verb");

        let mut node_to_gf = BTreeMap::new();
        node_to_gf.insert(NodeId(1), assignment("Comp", Some("for"), 5));

        assert!(store.match_frames("give", "verb", &node_to_gf, false).is_empty());

        node_to_gf.insert(NodeId(2), assignment("Comp", Some("to"), 5));
        let matches = store.match_frames("give", "verb", &node_to_gf, false);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slots[0].nodes, vec![NodeId(2)]);
    }

    #[test]
    fn multiplicity_one_keeps_highest_frequency_node() {
        let mut store = SubcatFrameStore::new(false);
        store.store_subcatframe(&[tuple("Ext", None, "Donor")], "Giving", "give", "verb");

        let mut node_to_gf = BTreeMap::new();
        node_to_gf.insert(NodeId(1), assignment("Ext", None, 3));
        node_to_gf.insert(NodeId(2), assignment("Ext", None, 7));

        let matches = store.match_frames("give", "verb", &node_to_gf, false);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slots[0].nodes, vec![NodeId(2)]);
    }

    #[test]
    fn many_slot_returns_all_nodes_best_first() {
        let mut store = SubcatFrameStore::new(false);
        store.store_subcatframe(
            &[tuple("Obj", None, "Theme"), tuple("Obj", None, "Goal")],
            "Giving",
            "give",
            "verb",
        );

        let mut node_to_gf = BTreeMap::new();
        node_to_gf.insert(NodeId(1), assignment("Obj", None, 3));
        node_to_gf.insert(NodeId(2), assignment("Obj", None, 7));

        let matches = store.match_frames("give", "verb", &node_to_gf, false);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].slots[0].nodes, vec![NodeId(2), NodeId(1)]);
    }

    #[test]
    fn results_are_ranked_by_frequency_and_deduplicated() {
        let mut store = SubcatFrameStore::new(false);
        // Same extension from two stored frames: (Ext one) and (Ext many),
        // with the "many" variant seen more often.
        store.store_subcatframe(&[tuple("Ext", None, "Donor")], "Giving", "give", "verb");
        for _ in 0..3 {
            store.store_subcatframe(
                &[tuple("Ext", None, "Donor"), tuple("Ext", None, "Theme")],
                "Giving",
                "give",
                "verb",
            );
        }

        let mut node_to_gf = BTreeMap::new();
        node_to_gf.insert(NodeId(1), assignment("Ext", None, 5));

        let matches = store.match_frames("give", "verb", &node_to_gf, false);
        // Both frames extend to the same single-node assignment; the more
        // frequent one survives deduplication.
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].freq, 3);
    }
}
