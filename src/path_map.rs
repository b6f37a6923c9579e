//! Frequency-weighted mapping from tree paths to grammatical functions.
//!
//! During training, every observed (GF, path) pair is counted in a flat
//! per-POS table. [`GfPathMapping::finish_inducing`] then prunes rare
//! mappings and reencodes the survivors as per-GF tries keyed by path
//! steps, which is what makes [`GfPathMapping::potential_gfs_of_node`]
//! fast: a breadth-first search over the sentence tree walks the trie in
//! lockstep with the tree edges and reports every node from which a known
//! GF path terminates.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::interp::{NodeId, SynInterpreter};
use crate::path::{Path, Step};

/// Minimum observation count for a (GF, path) mapping to survive pruning.
const MIN_PATH_FREQ: u32 = 5;

/// GF labels kept regardless of frequency. Deliberately a substring match,
/// not an exact-label whitelist: `"NotAHead"` matches too.
static PRIVILEGED_GF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("Head|Appositive|Quant|Protagonist").unwrap());

/// A node in the path trie: either a terminating frequency or a map of
/// further steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrieNode {
    /// A path ends here, observed this many times.
    Leaf(u32),
    /// More steps are possible from here.
    Interior(Trie),
}

/// One level of the path trie, keyed by [`Step::key`] strings.
///
/// `BTreeMap` keeps iteration, pruning and serialization deterministic.
pub type Trie = BTreeMap<String, TrieNode>;

/// One GF observed for a lemma: label plus the preposition and head
/// category the filler node is expected to carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfEntry {
    pub gf: String,
    pub prep: Option<String>,
    pub headcat: Option<String>,
}

/// A GF assigned to a node by [`GfPathMapping::potential_gfs_of_node`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GfAssignment {
    pub gf: String,
    pub prep: Option<String>,
    /// Training frequency of the path that led here; higher wins.
    pub freq: u32,
}

/// A live BFS candidate: a GF still reachable from the current node, with
/// the unconsumed suffix of its trie.
#[derive(Clone)]
struct Candidate<'a> {
    gf: &'a str,
    prep: &'a Option<String>,
    headcat: &'a Option<String>,
    trie: &'a Trie,
}

/// Per-POS mapping from grammatical functions to tree paths.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GfPathMapping {
    /// Flat accumulation form: POS -> GF -> path key -> frequency.
    /// Cleared by `finish_inducing`.
    gf_to_paths: BTreeMap<String, BTreeMap<String, BTreeMap<String, u32>>>,
    /// Query form: POS -> GF -> path trie. Built by `finish_inducing`.
    gf_tries: BTreeMap<String, BTreeMap<String, Trie>>,
    /// "lemma!pos" -> all GF/prep/headcat combinations ever observed.
    lemma_gfs: BTreeMap<String, Vec<GfEntry>>,
    /// Path key -> step sequence, kept only until `finish_inducing`.
    path_steps: BTreeMap<String, Vec<Step>>,
}

pub(crate) fn lemma_pos_key(lemma: &str, pos: &str) -> String {
    format!("{lemma}!{pos}")
}

impl GfPathMapping {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Storing induced mappings
    // -----------------------------------------------------------------

    /// Record one observation: `gf` was realized at `node`, reached from
    /// the target via `path`.
    pub fn store_mapping(
        &mut self,
        gf: &str,
        path: &Path,
        node: NodeId,
        lemma: &str,
        pos: &str,
        interp: &dyn SynInterpreter,
    ) {
        let path_key = path.key();
        let prep = interp.preposition(node).map(|p| p.to_lowercase());
        let headcat = interp
            .head_terminal(node)
            .and_then(|h| interp.category(h));

        self.path_steps
            .entry(path_key.clone())
            .or_insert_with(|| path.steps().cloned().collect());

        let freq = self
            .gf_to_paths
            .entry(pos.to_string())
            .or_default()
            .entry(gf.to_string())
            .or_default()
            .entry(path_key)
            .or_insert(0);
        *freq += 1;

        let entry = GfEntry {
            gf: gf.to_string(),
            prep,
            headcat,
        };
        let gflist = self
            .lemma_gfs
            .entry(lemma_pos_key(lemma, pos))
            .or_default();
        if !gflist.contains(&entry) {
            gflist.push(entry);
        }
    }

    /// Freeze the mapping: prune rare paths and reencode the survivors as
    /// tries. The flat accumulation form is discarded.
    pub fn finish_inducing(&mut self) {
        self.gf_tries.clear();

        for (pos, gf_map) in &self.gf_to_paths {
            let pos_tries = self.gf_tries.entry(pos.clone()).or_default();

            for (gf, paths) in gf_map {
                for (path_key, &freq) in paths {
                    let steps = match self.path_steps.get(path_key) {
                        Some(steps) if !steps.is_empty() => steps,
                        _ => {
                            warn!(gf = %gf, freq, "found empty path, skipping");
                            continue;
                        }
                    };

                    if freq >= MIN_PATH_FREQ || PRIVILEGED_GF.is_match(gf) {
                        let trie = pos_tries.entry(gf.clone()).or_default();
                        enter_path(trie, steps, freq);
                    }
                }
            }
        }

        self.gf_to_paths.clear();
        self.path_steps.clear();
    }

    // -----------------------------------------------------------------
    // Restricting induced mappings
    // -----------------------------------------------------------------

    /// Drop every path that ever traverses upward. Irreversible.
    pub fn restrict_to_downpaths(&mut self) {
        for pos_tries in self.gf_tries.values_mut() {
            for trie in pos_tries.values_mut() {
                restrict_trie_to_downpaths(trie);
            }
        }
    }

    /// Drop all path continuations beyond length `n`. Irreversible.
    pub fn restrict_pathlen(&mut self, n: usize) {
        for pos_tries in self.gf_tries.values_mut() {
            for trie in pos_tries.values_mut() {
                restrict_trie_len(trie, n);
            }
        }
    }

    /// Remove the named GFs outright, for every POS.
    pub fn remove_gfs(&mut self, gf_list: &[String]) {
        for gf in gf_list {
            for pos_tries in self.gf_tries.values_mut() {
                pos_tries.remove(gf);
            }
        }
    }

    // -----------------------------------------------------------------
    // Using stored data
    // -----------------------------------------------------------------

    /// Find all nodes realizing a known GF of `lemma`/`pos`, starting the
    /// search at `start_node`.
    ///
    /// Breadth-first search over the sentence tree: each reachable GF
    /// candidate carries the unconsumed suffix of its path trie, and is
    /// either resolved (the step hits a frequency leaf and the node's
    /// preposition and head category match) or carried one node further.
    /// The start node itself is never assigned a GF. Per node, the
    /// highest-frequency assignment wins; equal frequencies go to the
    /// lexicographically smaller GF label.
    pub fn potential_gfs_of_node(
        &self,
        start_node: NodeId,
        lemma: &str,
        pos: &str,
        interp: &dyn SynInterpreter,
    ) -> BTreeMap<NodeId, GfAssignment> {
        let mut potential_gfs: HashMap<NodeId, Vec<Candidate<'_>>> = HashMap::new();
        potential_gfs.insert(start_node, self.potential_gfs_of_lemma(lemma, pos));

        let mut agenda: VecDeque<NodeId> = VecDeque::new();
        agenda.push_back(start_node);
        let mut been_there: HashSet<NodeId> = HashSet::new();
        been_there.insert(start_node);

        let mut node_to_gf: BTreeMap<NodeId, GfAssignment> = BTreeMap::new();

        while let Some(prev_node) = agenda.pop_front() {
            let prev_cands = match potential_gfs.get(&prev_node) {
                Some(cands) if !cands.is_empty() => cands.clone(),
                _ => continue,
            };

            for (node, edge_path) in interp.surrounding_nodes(prev_node) {
                if !been_there.insert(node) {
                    continue;
                }

                let myprep = interp.preposition(node).map(|p| p.to_lowercase());
                let my_headcat = interp
                    .head_terminal(node)
                    .and_then(|h| interp.category(h));

                let mut carried: Vec<Candidate<'_>> = Vec::new();

                for step in edge_path.steps() {
                    let step_key = step.key();

                    for cand in &prev_cands {
                        match cand.trie.get(&step_key) {
                            Some(TrieNode::Leaf(freq)) => {
                                // The GF has been reached. Accept only if the
                                // node carries the expected preposition and
                                // head category.
                                if myprep != *cand.prep || my_headcat != *cand.headcat {
                                    continue;
                                }
                                let better = match node_to_gf.get(&node) {
                                    None => true,
                                    Some(old) => {
                                        *freq > old.freq
                                            || (*freq == old.freq && cand.gf < old.gf.as_str())
                                    }
                                };
                                if better {
                                    node_to_gf.insert(
                                        node,
                                        GfAssignment {
                                            gf: cand.gf.to_string(),
                                            prep: cand.prep.clone(),
                                            freq: *freq,
                                        },
                                    );
                                }
                            }
                            Some(TrieNode::Interior(deeper)) => {
                                carried.push(Candidate {
                                    trie: deeper,
                                    ..cand.clone()
                                });
                            }
                            None => {}
                        }
                    }
                }

                if !carried.is_empty() {
                    agenda.push_back(node);
                }
                potential_gfs.insert(node, carried);
            }
        }

        node_to_gf
    }

    /// All GFs ever observed for `lemma`/`pos` that still have a trie
    /// entry after pruning and restriction.
    fn potential_gfs_of_lemma(&self, lemma: &str, pos: &str) -> Vec<Candidate<'_>> {
        let Some(gflist) = self.lemma_gfs.get(&lemma_pos_key(lemma, pos)) else {
            return Vec::new();
        };
        let Some(pos_tries) = self.gf_tries.get(pos) else {
            return Vec::new();
        };
        gflist
            .iter()
            .filter_map(|entry| {
                pos_tries.get(&entry.gf).map(|trie| Candidate {
                    gf: entry.gf.as_str(),
                    prep: &entry.prep,
                    headcat: &entry.headcat,
                    trie,
                })
            })
            .collect()
    }

    /// Frequency recorded for the exact `path` under `pos`/`gf`, if the
    /// trie contains it as a terminating path.
    pub fn path_freq(&self, pos: &str, gf: &str, path: &Path) -> Option<u32> {
        let mut trie = self.gf_tries.get(pos)?.get(gf)?;
        let steps: Vec<&Step> = path.steps().collect();
        let (last, prefix) = steps.split_last()?;
        for step in prefix {
            match trie.get(&step.key())? {
                TrieNode::Interior(deeper) => trie = deeper,
                TrieNode::Leaf(_) => return None,
            }
        }
        match trie.get(&last.key())? {
            TrieNode::Leaf(freq) => Some(*freq),
            TrieNode::Interior(_) => None,
        }
    }

    /// Number of POS buckets in the frozen trie form.
    pub fn pos_count(&self) -> usize {
        self.gf_tries.len()
    }

    /// Number of (POS, GF) trie entries in the frozen form.
    pub fn gf_count(&self) -> usize {
        self.gf_tries.values().map(BTreeMap::len).sum()
    }

    /// Number of lemma/POS keys with recorded GF lists.
    pub fn lemma_count(&self) -> usize {
        self.lemma_gfs.len()
    }

    #[cfg(test)]
    fn trie(&self, pos: &str, gf: &str) -> Option<&Trie> {
        self.gf_tries.get(pos)?.get(gf)
    }
}

/// Insert one pruned (path, frequency) mapping into a trie.
///
/// Conflicts between a shorter and a longer path sharing a prefix are
/// resolved by frequency:
/// - extending past an existing leaf replaces it only when the new
///   frequency is strictly greater; otherwise the insertion is abandoned
///   and the old shorter mapping stands;
/// - terminating on an existing interior replaces the whole subtree only
///   when the new frequency is strictly greater than every leaf inside it.
fn enter_path(trie: &mut Trie, steps: &[Step], freq: u32) {
    let (first, rest) = match steps.split_first() {
        Some(split) => split,
        None => return,
    };
    let key = first.key();

    if rest.is_empty() {
        match trie.get(&key) {
            Some(TrieNode::Interior(subtree)) if freq <= max_leaf_freq(subtree) => {}
            _ => {
                trie.insert(key, TrieNode::Leaf(freq));
            }
        }
        return;
    }

    match trie.get(&key) {
        Some(TrieNode::Leaf(old)) => {
            // A shorter path for the same GF ends here. The higher
            // frequency wins; on a tie the old mapping stands.
            if freq > *old {
                trie.insert(key.clone(), TrieNode::Interior(Trie::new()));
            } else {
                return;
            }
        }
        Some(TrieNode::Interior(_)) => {}
        None => {
            trie.insert(key.clone(), TrieNode::Interior(Trie::new()));
        }
    }

    if let Some(TrieNode::Interior(deeper)) = trie.get_mut(&key) {
        enter_path(deeper, rest, freq);
    }
}

fn max_leaf_freq(trie: &Trie) -> u32 {
    trie.values()
        .map(|node| match node {
            TrieNode::Leaf(freq) => *freq,
            TrieNode::Interior(deeper) => max_leaf_freq(deeper),
        })
        .max()
        .unwrap_or(0)
}

fn restrict_trie_to_downpaths(trie: &mut Trie) {
    trie.retain(|key, _| !key.starts_with('U'));
    for node in trie.values_mut() {
        if let TrieNode::Interior(deeper) = node {
            restrict_trie_to_downpaths(deeper);
        }
    }
}

fn restrict_trie_len(trie: &mut Trie, n: usize) {
    if n == 0 {
        trie.clear();
        return;
    }
    for node in trie.values_mut() {
        if let TrieNode::Interior(deeper) = node {
            restrict_trie_len(deeper, n - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Direction;

    fn step(dir: Direction, edge: &str, node: &str) -> Step {
        Step::new(dir, edge, node)
    }

    fn up(edge: &str, node: &str) -> Step {
        step(Direction::Up, edge, node)
    }

    fn down(edge: &str, node: &str) -> Step {
        step(Direction::Down, edge, node)
    }

    #[test]
    fn enter_path_inserts_leaf_at_last_step() {
        let mut trie = Trie::new();
        enter_path(&mut trie, &[up("HD", "S"), down("SB", "NP")], 7);
        assert_eq!(
            trie.get("U HD S"),
            Some(&TrieNode::Interior(BTreeMap::from([(
                "D SB NP".to_string(),
                TrieNode::Leaf(7)
            )])))
        );
    }

    #[test]
    fn lower_frequency_short_path_does_not_clobber_deeper_mapping() {
        let mut trie = Trie::new();
        enter_path(&mut trie, &[up("HD", "S"), down("SB", "NP")], 5);
        enter_path(&mut trie, &[up("HD", "S")], 3);

        // The two-step mapping stays intact.
        assert!(matches!(trie.get("U HD S"), Some(TrieNode::Interior(_))));
    }

    #[test]
    fn higher_frequency_short_path_replaces_deeper_mapping() {
        let mut trie = Trie::new();
        enter_path(&mut trie, &[up("HD", "S"), down("SB", "NP")], 5);
        enter_path(&mut trie, &[up("HD", "S")], 9);

        assert_eq!(trie.get("U HD S"), Some(&TrieNode::Leaf(9)));
    }

    #[test]
    fn lower_frequency_extension_is_abandoned() {
        let mut trie = Trie::new();
        enter_path(&mut trie, &[up("HD", "S")], 5);
        enter_path(&mut trie, &[up("HD", "S"), down("SB", "NP")], 3);

        // The old shorter mapping stands, the extension is gone.
        assert_eq!(trie.get("U HD S"), Some(&TrieNode::Leaf(5)));
    }

    #[test]
    fn equal_frequency_extension_keeps_old_leaf() {
        let mut trie = Trie::new();
        enter_path(&mut trie, &[up("HD", "S")], 5);
        enter_path(&mut trie, &[up("HD", "S"), down("SB", "NP")], 5);

        assert_eq!(trie.get("U HD S"), Some(&TrieNode::Leaf(5)));
    }

    #[test]
    fn higher_frequency_extension_replaces_leaf() {
        let mut trie = Trie::new();
        enter_path(&mut trie, &[up("HD", "S")], 5);
        enter_path(&mut trie, &[up("HD", "S"), down("SB", "NP")], 8);

        match trie.get("U HD S") {
            Some(TrieNode::Interior(deeper)) => {
                assert_eq!(deeper.get("D SB NP"), Some(&TrieNode::Leaf(8)));
            }
            other => panic!("expected interior, got {other:?}"),
        }
    }

    fn store_n(map: &mut GfPathMapping, gf: &str, path: &Path, n: u32, interp: &dyn SynInterpreter) {
        for _ in 0..n {
            map.store_mapping(gf, path, NodeId(1), "give", "verb", interp);
        }
    }

    /// Minimal interpreter: no prepositions, no heads, no structure.
    struct NullInterp;

    impl SynInterpreter for NullInterp {
        fn path_between(&self, _: NodeId, _: NodeId) -> Option<Path> {
            None
        }
        fn preposition(&self, _: NodeId) -> Option<String> {
            None
        }
        fn head_terminal(&self, _: NodeId) -> Option<NodeId> {
            None
        }
        fn category(&self, _: NodeId) -> Option<String> {
            None
        }
        fn main_node_of_expr(&self, _: &[NodeId]) -> Option<NodeId> {
            None
        }
        fn lemma_backoff(&self, _: NodeId) -> Option<String> {
            None
        }
        fn voice(&self, _: NodeId) -> Option<String> {
            None
        }
        fn surrounding_nodes(&self, _: NodeId) -> Vec<(NodeId, Path)> {
            Vec::new()
        }
    }

    #[test]
    fn pruning_keeps_frequent_paths_only() {
        let mut map = GfPathMapping::new();
        let frequent = Path::new(vec![up("HD", "S"), down("SB", "NP")]);
        let rare = Path::new(vec![up("HD", "S"), down("OA", "NP")]);
        store_n(&mut map, "Obj NP", &frequent, 5, &NullInterp);
        store_n(&mut map, "Obj NP", &rare, 4, &NullInterp);
        map.finish_inducing();

        assert_eq!(map.path_freq("verb", "Obj NP", &frequent), Some(5));
        assert_eq!(map.path_freq("verb", "Obj NP", &rare), None);
    }

    #[test]
    fn privileged_labels_survive_any_frequency() {
        let mut map = GfPathMapping::new();
        let path = Path::new(vec![down("SB", "NP")]);
        store_n(&mut map, "Head NP", &path, 1, &NullInterp);
        store_n(&mut map, "Quant", &path, 1, &NullInterp);
        // Substring match by design: this one is privileged too.
        store_n(&mut map, "NotAHead", &path, 1, &NullInterp);
        store_n(&mut map, "Obj NP", &path, 1, &NullInterp);
        map.finish_inducing();

        assert_eq!(map.path_freq("verb", "Head NP", &path), Some(1));
        assert_eq!(map.path_freq("verb", "Quant", &path), Some(1));
        assert_eq!(map.path_freq("verb", "NotAHead", &path), Some(1));
        assert_eq!(map.path_freq("verb", "Obj NP", &path), None);
    }

    #[test]
    fn restrict_to_downpaths_is_idempotent() {
        let mut map = GfPathMapping::new();
        let with_up = Path::new(vec![up("HD", "S"), down("SB", "NP")]);
        let down_only = Path::new(vec![down("OA", "NP"), down("HD", "NN")]);
        store_n(&mut map, "Obj NP", &with_up, 6, &NullInterp);
        store_n(&mut map, "Obj NP", &down_only, 6, &NullInterp);
        map.finish_inducing();

        map.restrict_to_downpaths();
        let once = map.clone();
        map.restrict_to_downpaths();

        assert_eq!(map.trie("verb", "Obj NP"), once.trie("verb", "Obj NP"));
        assert_eq!(map.path_freq("verb", "Obj NP", &with_up), None);
        assert_eq!(map.path_freq("verb", "Obj NP", &down_only), Some(6));
    }

    #[test]
    fn restrict_pathlen_cuts_deep_paths() {
        let mut map = GfPathMapping::new();
        let short = Path::new(vec![down("SB", "NP")]);
        let long = Path::new(vec![up("HD", "S"), down("OA", "NP"), down("HD", "NN")]);
        store_n(&mut map, "Obj NP", &short, 6, &NullInterp);
        store_n(&mut map, "Comp NP", &long, 6, &NullInterp);
        map.finish_inducing();

        map.restrict_pathlen(2);

        assert_eq!(map.path_freq("verb", "Obj NP", &short), Some(6));
        assert_eq!(map.path_freq("verb", "Comp NP", &long), None);
    }

    #[test]
    fn remove_gfs_deletes_top_level_entries() {
        let mut map = GfPathMapping::new();
        let path = Path::new(vec![down("SB", "NP")]);
        store_n(&mut map, "Obj NP", &path, 6, &NullInterp);
        store_n(&mut map, "Ext NP", &path, 6, &NullInterp);
        map.finish_inducing();

        map.remove_gfs(&["Obj NP".to_string()]);

        assert_eq!(map.path_freq("verb", "Obj NP", &path), None);
        assert_eq!(map.path_freq("verb", "Ext NP", &path), Some(6));
    }

    #[test]
    fn empty_path_is_skipped_during_freeze() {
        let mut map = GfPathMapping::new();
        store_n(&mut map, "Head NP", &Path::default(), 2, &NullInterp);
        map.finish_inducing();

        assert_eq!(map.gf_count(), 0);
    }
}
