//! The interpreter contract: how the engine sees an externally owned
//! syntax tree.
//!
//! The induction engine never owns sentence structure. Nodes are opaque
//! [`NodeId`] handles and every structural question (paths, neighbors,
//! heads, prepositions) goes through a [`SynInterpreter`]. This keeps the
//! learned state free of references into any particular tree and lets the
//! same engine run over different tree backends.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::Path;

/// Opaque handle to a node in an externally owned syntax tree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Structural queries against a syntax tree.
///
/// Implementations answer for one sentence at a time; all methods are
/// read-only. Any method may return `None` when the question has no answer
/// for the given node — the engine treats that as "skip, don't abort".
pub trait SynInterpreter {
    /// Path from `from` to `to`, or `None` if no path exists.
    fn path_between(&self, from: NodeId, to: NodeId) -> Option<Path>;

    /// Preposition introducing the constituent at `node`, if any.
    fn preposition(&self, node: NodeId) -> Option<String>;

    /// Head terminal of the constituent at `node`.
    fn head_terminal(&self, node: NodeId) -> Option<NodeId>;

    /// Syntactic category label of `node`.
    fn category(&self, node: NodeId) -> Option<String>;

    /// Main node of a (possibly multi-word) expression, or `None` for true
    /// multiword expressions with no single head.
    fn main_node_of_expr(&self, nodes: &[NodeId]) -> Option<NodeId>;

    /// Lemma of `node`, backing off to the surface word when no lemma is
    /// annotated.
    fn lemma_backoff(&self, node: NodeId) -> Option<String>;

    /// Voice of a verbal node (`"active"` / `"passive"`), if detectable.
    fn voice(&self, node: NodeId) -> Option<String>;

    /// Immediate neighbors of `node`, each with the path leading to it.
    fn surrounding_nodes(&self, node: NodeId) -> Vec<(NodeId, Path)>;
}
