//! Narrow view of a semantically annotated sentence.
//!
//! This is the minimal projection of a FrameNet-style annotation layer the
//! engine reads during training: frames with a target expression and frame
//! elements carrying grammatical-function / phrase-type attributes. The
//! full sentence object model stays outside the crate; annotations refer
//! to tree nodes by [`NodeId`].

use serde::{Deserialize, Serialize};

use crate::interp::NodeId;

/// All frames annotated on one sentence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentenceAnnotation {
    pub frames: Vec<FrameAnnotation>,
}

/// One frame instance: a named frame evoked by a target expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAnnotation {
    /// Frame name, e.g. `"Giving"`.
    pub name: String,
    /// Syntactic nodes of the target expression. Empty for targetless
    /// frames, which are skipped during induction.
    #[serde(default)]
    pub target: Vec<NodeId>,
    /// Frame elements annotated for this frame instance.
    #[serde(default)]
    pub elements: Vec<FrameElement>,
}

/// One frame element: a semantic role bound to syntactic nodes, with the
/// grammatical-function and phrase-type attributes of the annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameElement {
    /// Role name, e.g. `"Donor"`.
    pub name: String,
    /// Grammatical function attribute, e.g. `"Ext"`.
    #[serde(default)]
    pub gf: Option<String>,
    /// Phrase type attribute, e.g. `"NP"`.
    #[serde(default)]
    pub pt: Option<String>,
    /// Syntactic nodes this role points to.
    #[serde(default)]
    pub nodes: Vec<NodeId>,
}
