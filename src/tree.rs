//! An owned constituency tree implementing [`SynInterpreter`].
//!
//! The engine itself never owns sentence structure; this tree is the
//! reference backend used by the CLI and the test suite. Nodes carry a
//! category label, the label of the edge to their parent, and optional
//! terminal annotations (word, lemma, voice). The JSON form is a flat
//! node list with parent indices; child lists are rebuilt on load.

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::interp::{NodeId, SynInterpreter};
use crate::path::{Direction, Path, Step};

#[derive(Debug, Clone)]
struct NodeData {
    category: String,
    edge: String,
    word: Option<String>,
    lemma: Option<String>,
    voice: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Flat serialized form of one node. Parents must precede their children
/// in the node list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub category: String,
    #[serde(default)]
    pub edge: String,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default)]
    pub lemma: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

/// A constituency tree over owned nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<NodeSpec>", into = "Vec<NodeSpec>")]
pub struct SyntaxTree {
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interior node. `edge` is the label of the edge to `parent`.
    pub fn add_node(&mut self, parent: Option<NodeId>, category: &str, edge: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            category: category.to_string(),
            edge: edge.to_string(),
            word: None,
            lemma: None,
            voice: None,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0 as usize].children.push(id);
        }
        id
    }

    /// Add a terminal node carrying a surface word.
    pub fn add_terminal(
        &mut self,
        parent: Option<NodeId>,
        category: &str,
        edge: &str,
        word: &str,
    ) -> NodeId {
        let id = self.add_node(parent, category, edge);
        self.nodes[id.0 as usize].word = Some(word.to_string());
        id
    }

    pub fn set_lemma(&mut self, node: NodeId, lemma: &str) {
        self.nodes[node.0 as usize].lemma = Some(lemma.to_string());
    }

    pub fn set_voice(&mut self, node: NodeId, voice: &str) {
        self.nodes[node.0 as usize].voice = Some(voice.to_string());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Internal access for ids the tree itself handed out.
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0 as usize]
    }

    /// Checked access for ids coming from outside, e.g. target node ids
    /// in CLI input.
    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0 as usize)
    }

    /// Ancestor chain starting at `id`, ending at the root.
    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    fn is_terminal(&self, id: NodeId) -> bool {
        self.node(id).children.is_empty()
    }

    /// First terminal under `id` (including `id`) whose category marks a
    /// preposition.
    fn find_preposition(&self, id: NodeId) -> Option<&NodeData> {
        let data = self.node(id);
        if self.is_terminal(id) {
            if data.category == "IN" || data.category.starts_with("APPR") {
                return Some(data);
            }
            return None;
        }
        data.children
            .iter()
            .find_map(|&child| self.find_preposition(child))
    }
}

impl TryFrom<Vec<NodeSpec>> for SyntaxTree {
    type Error = TreeError;

    fn try_from(specs: Vec<NodeSpec>) -> Result<Self, Self::Error> {
        let mut tree = SyntaxTree::new();
        for (index, spec) in specs.into_iter().enumerate() {
            if let Some(parent) = spec.parent {
                if parent as usize >= index {
                    return Err(TreeError::BadParent {
                        node: index,
                        parent,
                    });
                }
            }
            let id = tree.add_node(spec.parent.map(NodeId), &spec.category, &spec.edge);
            let data = &mut tree.nodes[id.0 as usize];
            data.word = spec.word;
            data.lemma = spec.lemma;
            data.voice = spec.voice;
        }
        Ok(tree)
    }
}

impl From<SyntaxTree> for Vec<NodeSpec> {
    fn from(tree: SyntaxTree) -> Self {
        tree.nodes
            .into_iter()
            .map(|data| NodeSpec {
                category: data.category,
                edge: data.edge,
                parent: data.parent.map(|p| p.0),
                word: data.word,
                lemma: data.lemma,
                voice: data.voice,
            })
            .collect()
    }
}

impl SynInterpreter for SyntaxTree {
    fn path_between(&self, from: NodeId, to: NodeId) -> Option<Path> {
        self.get(from)?;
        self.get(to)?;
        let from_chain = self.ancestors(from);
        let to_chain = self.ancestors(to);

        // Lowest common ancestor: first node of `to`'s chain that also
        // lies on `from`'s chain.
        let (lca_in_to, lca) = to_chain
            .iter()
            .enumerate()
            .find(|&(_, id)| from_chain.contains(id))
            .map(|(i, &id)| (i, id))?;

        let mut steps = Vec::new();
        for &id in from_chain.iter().take_while(|&&id| id != lca) {
            let parent = self.node(id).parent?;
            steps.push(Step::new(
                Direction::Up,
                self.node(id).edge.clone(),
                self.node(parent).category.clone(),
            ));
        }
        for &id in to_chain[..lca_in_to].iter().rev() {
            steps.push(Step::new(
                Direction::Down,
                self.node(id).edge.clone(),
                self.node(id).category.clone(),
            ));
        }
        Some(Path::new(steps))
    }

    fn preposition(&self, node: NodeId) -> Option<String> {
        self.get(node)?;
        self.find_preposition(node).and_then(|data| data.word.clone())
    }

    fn head_terminal(&self, node: NodeId) -> Option<NodeId> {
        let data = self.get(node)?;
        if data.children.is_empty() {
            return Some(node);
        }
        let head = data
            .children
            .iter()
            .find(|&&child| self.node(child).edge == "HD")
            .or_else(|| data.children.first())?;
        self.head_terminal(*head)
    }

    fn category(&self, node: NodeId) -> Option<String> {
        Some(self.get(node)?.category.clone())
    }

    fn main_node_of_expr(&self, nodes: &[NodeId]) -> Option<NodeId> {
        if nodes.iter().any(|&id| self.get(id).is_none()) {
            return None;
        }
        match nodes {
            [] => None,
            [single] => Some(*single),
            _ => {
                // The single node whose parent lies outside the
                // expression; true multiword expressions have none.
                let mut tops = nodes.iter().filter(|&&id| {
                    self.node(id)
                        .parent
                        .is_none_or(|parent| !nodes.contains(&parent))
                });
                let top = *tops.next()?;
                if tops.next().is_some() { None } else { Some(top) }
            }
        }
    }

    fn lemma_backoff(&self, node: NodeId) -> Option<String> {
        let data = self.get(node)?;
        data.lemma
            .clone()
            .or_else(|| data.word.as_ref().map(|w| w.to_lowercase()))
    }

    fn voice(&self, node: NodeId) -> Option<String> {
        self.get(node)?.voice.clone()
    }

    fn surrounding_nodes(&self, node: NodeId) -> Vec<(NodeId, Path)> {
        let Some(data) = self.get(node) else {
            return Vec::new();
        };
        let mut neighbors = Vec::new();
        if let Some(parent) = data.parent {
            neighbors.push((
                parent,
                Path::single(Step::new(
                    Direction::Up,
                    data.edge.clone(),
                    self.node(parent).category.clone(),
                )),
            ));
        }
        for &child in &data.children {
            neighbors.push((
                child,
                Path::single(Step::new(
                    Direction::Down,
                    self.node(child).edge.clone(),
                    self.node(child).category.clone(),
                )),
            ));
        }
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// S -> NP/SB (PRP "She") , V/HD "gives" , NP/OA (NN "books")
    fn gives_tree() -> (SyntaxTree, NodeId, NodeId, NodeId) {
        let mut tree = SyntaxTree::new();
        let s = tree.add_node(None, "S", "");
        let subj = tree.add_node(Some(s), "NP", "SB");
        tree.add_terminal(Some(subj), "PRP", "HD", "She");
        let verb = tree.add_terminal(Some(s), "V", "HD", "gives");
        tree.set_lemma(verb, "give");
        let obj = tree.add_node(Some(s), "NP", "OA");
        tree.add_terminal(Some(obj), "NN", "HD", "books");
        (tree, verb, subj, obj)
    }

    #[test]
    fn path_between_goes_up_then_down() {
        let (tree, verb, subj, _) = gives_tree();
        let path = tree.path_between(verb, subj).unwrap();
        assert_eq!(path.key(), "U HD S D SB NP");
    }

    #[test]
    fn path_between_same_node_is_empty() {
        let (tree, verb, _, _) = gives_tree();
        assert!(tree.path_between(verb, verb).unwrap().is_empty());
    }

    #[test]
    fn head_terminal_follows_head_edges() {
        let (tree, _, subj, _) = gives_tree();
        let head = tree.head_terminal(subj).unwrap();
        assert_eq!(tree.category(head).as_deref(), Some("PRP"));
    }

    #[test]
    fn preposition_found_in_pp() {
        let mut tree = SyntaxTree::new();
        let pp = tree.add_node(None, "PP", "MO");
        tree.add_terminal(Some(pp), "IN", "AC", "To");
        let np = tree.add_node(Some(pp), "NP", "NK");
        tree.add_terminal(Some(np), "NN", "HD", "her");

        assert_eq!(tree.preposition(pp).as_deref(), Some("To"));
        assert_eq!(tree.preposition(np), None);
    }

    #[test]
    fn main_node_of_expr_picks_topmost() {
        let (tree, verb, subj, _) = gives_tree();
        assert_eq!(tree.main_node_of_expr(&[verb]), Some(verb));

        // subj dominates its terminal: subj is the main node.
        let prp = NodeId(2);
        assert_eq!(tree.main_node_of_expr(&[subj, prp]), Some(subj));

        // Two unrelated tops: a true multiword expression.
        assert_eq!(tree.main_node_of_expr(&[subj, verb]), None);
        assert_eq!(tree.main_node_of_expr(&[]), None);
    }

    #[test]
    fn lemma_backs_off_to_lowercased_word() {
        let (tree, verb, _, _) = gives_tree();
        assert_eq!(tree.lemma_backoff(verb).as_deref(), Some("give"));
        assert_eq!(tree.lemma_backoff(NodeId(2)).as_deref(), Some("she"));
    }

    #[test]
    fn surrounding_nodes_cover_parent_and_children() {
        let (tree, _, subj, _) = gives_tree();
        let neighbors = tree.surrounding_nodes(subj);
        assert_eq!(neighbors.len(), 2);
        assert_eq!(neighbors[0].1.key(), "U SB S");
        assert_eq!(neighbors[1].1.key(), "D HD PRP");
    }

    #[test]
    fn out_of_range_ids_resolve_to_nothing() {
        let (tree, verb, _, _) = gives_tree();
        let bogus = NodeId(999);

        assert_eq!(tree.category(bogus), None);
        assert_eq!(tree.lemma_backoff(bogus), None);
        assert_eq!(tree.voice(bogus), None);
        assert_eq!(tree.preposition(bogus), None);
        assert_eq!(tree.head_terminal(bogus), None);
        assert_eq!(tree.path_between(verb, bogus), None);
        assert_eq!(tree.path_between(bogus, verb), None);
        assert!(tree.surrounding_nodes(bogus).is_empty());
        assert_eq!(tree.main_node_of_expr(&[bogus]), None);
        assert_eq!(tree.main_node_of_expr(&[verb, bogus]), None);
    }

    #[test]
    fn parent_index_must_precede_node() {
        // Forward reference.
        let result: Result<SyntaxTree, _> =
            serde_json::from_str(r#"[{"category":"S","edge":"","parent":5}]"#);
        assert!(result.is_err());

        // Self reference.
        let result: Result<SyntaxTree, _> =
            serde_json::from_str(r#"[{"category":"S","edge":"","parent":0}]"#);
        assert!(result.is_err());
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let (tree, verb, subj, _) = gives_tree();
        let json = serde_json::to_string(&tree).unwrap();
        let back: SyntaxTree = serde_json::from_str(&json).unwrap();

        assert_eq!(back.len(), tree.len());
        assert_eq!(
            back.path_between(verb, subj).unwrap().key(),
            "U HD S D SB NP"
        );
        assert_eq!(back.lemma_backoff(verb).as_deref(), Some("give"));
    }
}
