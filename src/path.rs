//! Tree-path primitives: directed edge steps between syntax nodes.
//!
//! A [`Path`] is the ordered sequence of edges between two nodes in a
//! constituency tree, as computed by a [`SynInterpreter`](crate::interp::SynInterpreter).
//! This module only defines the value types; path computation lives with the
//! tree implementation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a single edge traversal: towards the root or away from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "U",
            Direction::Down => "D",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One edge traversal: direction, the label of the edge walked, and the
/// category label of the node stepped onto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Step {
    pub direction: Direction,
    pub edge: String,
    pub node: String,
}

impl Step {
    pub fn new(direction: Direction, edge: impl Into<String>, node: impl Into<String>) -> Self {
        Self {
            direction,
            edge: edge.into(),
            node: node.into(),
        }
    }

    /// Canonical string key for this step, used as a trie key.
    pub fn key(&self) -> String {
        format!("{} {} {}", self.direction, self.edge, self.node)
    }
}

/// An ordered sequence of steps between two tree nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    steps: Vec<Step>,
}

impl Path {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn single(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    /// Canonical string key for the whole path: step keys joined by spaces.
    pub fn key(&self) -> String {
        self.steps
            .iter()
            .map(Step::key)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
