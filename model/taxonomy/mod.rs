/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Read-only category tree ("taxonomy").
//!
//! Core structures:
//! - `TaxonomyPath`: slash-delimited path from a branch root to a node
//!   (`Phase/Group/Subgroup`).
//! - `TaxonomyModel`: the immutable tree, built once at startup from TOML or
//!   from a list of paths, answering node lookup, children listing and depth.
//!
//! Top-level nodes are "branches"; they partition Branch Memory.

use std::collections::HashMap;
use std::fmt;

pub const PATH_SEPARATOR: char = '/';

/// Slash-delimited category path, unique within the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxonomyPath(String);

impl TaxonomyPath {
    /// Parse a path, trimming each segment. Empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, TaxonomyError> {
        let segments: Vec<&str> = raw.split(PATH_SEPARATOR).map(str::trim).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(TaxonomyError::EmptySegment {
                path: raw.to_string(),
            });
        }
        Ok(Self(segments.join("/")))
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self, TaxonomyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|segment| segment.as_ref().trim().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self::parse(&joined)
    }

    /// Path of a top-level branch.
    pub fn branch_root(branch: &str) -> Result<Self, TaxonomyError> {
        Self::parse(branch)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR)
    }

    /// Number of segments; a branch root has depth 1.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// First segment: the top-level branch this path lives under.
    pub fn branch(&self) -> &str {
        self.0
            .split(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Last segment.
    pub fn name(&self) -> &str {
        self.0
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    pub fn is_branch_root(&self) -> bool {
        !self.0.contains(PATH_SEPARATOR)
    }

    pub fn parent(&self) -> Option<TaxonomyPath> {
        self.0
            .rsplit_once(PATH_SEPARATOR)
            .map(|(parent, _)| TaxonomyPath(parent.to_string()))
    }

    pub fn child(&self, name: &str) -> Result<TaxonomyPath, TaxonomyError> {
        Self::parse(&format!("{}/{}", self.0, name))
    }

    /// Every prefix of this path, shallowest first, ending with the path itself.
    pub fn prefixes(&self) -> Vec<TaxonomyPath> {
        let mut out = Vec::with_capacity(self.depth());
        let mut current = String::with_capacity(self.0.len());
        for segment in self.segments() {
            if !current.is_empty() {
                current.push(PATH_SEPARATOR);
            }
            current.push_str(segment);
            out.push(TaxonomyPath(current.clone()));
        }
        out
    }

    /// Prefixes excluding the path itself.
    pub fn proper_prefixes(&self) -> Vec<TaxonomyPath> {
        let mut prefixes = self.prefixes();
        prefixes.pop();
        prefixes
    }

    /// True when `self` equals `prefix` or nests under it.
    pub fn is_within(&self, prefix: &TaxonomyPath) -> bool {
        self.0 == prefix.0
            || (self.0.starts_with(prefix.0.as_str())
                && self.0.as_bytes().get(prefix.0.len()) == Some(&(PATH_SEPARATOR as u8)))
    }

    /// Sort key placing parents before their children.
    pub fn depth_order_key(&self) -> (usize, &str) {
        (self.depth(), self.as_str())
    }
}

impl fmt::Display for TaxonomyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaxonomyPath {
    type Error = TaxonomyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TaxonomyPath> for String {
    fn from(path: TaxonomyPath) -> Self {
        path.0
    }
}

impl std::str::FromStr for TaxonomyPath {
    type Err = TaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    Parse(String),
    EmptySegment { path: String },
    InvalidNode { path: String, reason: &'static str },
    Empty,
}

impl fmt::Display for TaxonomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "taxonomy definition could not be parsed: {message}"),
            Self::EmptySegment { path } => {
                write!(f, "taxonomy path '{path}' contains an empty segment")
            }
            Self::InvalidNode { path, reason } => {
                write!(f, "taxonomy node '{path}' is invalid: {reason}")
            }
            Self::Empty => write!(f, "taxonomy has no branches"),
        }
    }
}

impl std::error::Error for TaxonomyError {}

/// One category in the tree. Leaves have no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyNode {
    pub path: TaxonomyPath,
    /// Child names in definition order.
    pub children: Vec<String>,
}

impl TaxonomyNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn label(&self) -> &str {
        self.path.name()
    }
}

/// Immutable category tree. Built once, never mutated for the session.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyModel {
    nodes: HashMap<TaxonomyPath, TaxonomyNode>,
    branches: Vec<String>,
}

impl TaxonomyModel {
    /// Build from nested TOML tables. A table maps child names to their own
    /// children; an empty table or an array of strings denotes leaves.
    ///
    /// ```toml
    /// [Recon.Passive]
    /// [Recon.Active]
    /// Scanning = ["Ports", "Services"]
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, TaxonomyError> {
        let table: toml::Table =
            toml::from_str(source).map_err(|e| TaxonomyError::Parse(e.to_string()))?;
        let mut model = Self::default();
        for (name, value) in &table {
            let root = TaxonomyPath::branch_root(name)?;
            model.insert_subtree(root, value)?;
        }
        if model.branches.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        Ok(model)
    }

    /// Build from full paths. Intermediate nodes are created on demand;
    /// first-seen order is kept for children and branches.
    pub fn from_paths<I, S>(paths: I) -> Result<Self, TaxonomyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut model = Self::default();
        for raw in paths {
            let path = TaxonomyPath::parse(raw.as_ref())?;
            for prefix in path.prefixes() {
                model.insert_node(prefix);
            }
        }
        if model.branches.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        Ok(model)
    }

    fn insert_subtree(&mut self, path: TaxonomyPath, value: &toml::Value) -> Result<(), TaxonomyError> {
        self.insert_node(path.clone());
        match value {
            toml::Value::Table(children) => {
                for (name, child) in children {
                    let child_path = path.child(name)?;
                    self.insert_subtree(child_path, child)?;
                }
                Ok(())
            }
            toml::Value::Array(leaves) => {
                for leaf in leaves {
                    let Some(name) = leaf.as_str() else {
                        return Err(TaxonomyError::InvalidNode {
                            path: path.to_string(),
                            reason: "leaf lists may only contain strings",
                        });
                    };
                    self.insert_node(path.child(name)?);
                }
                Ok(())
            }
            _ => Err(TaxonomyError::InvalidNode {
                path: path.to_string(),
                reason: "expected a table of children or an array of leaf names",
            }),
        }
    }

    fn insert_node(&mut self, path: TaxonomyPath) {
        if self.nodes.contains_key(&path) {
            return;
        }
        match path.parent() {
            Some(parent) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.push(path.name().to_string());
                }
            }
            None => self.branches.push(path.as_str().to_string()),
        }
        self.nodes.insert(
            path.clone(),
            TaxonomyNode {
                path,
                children: Vec::new(),
            },
        );
    }

    /// Top-level branch names in definition order.
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn has_branch(&self, branch: &str) -> bool {
        self.branches.iter().any(|name| name == branch)
    }

    pub fn contains(&self, path: &TaxonomyPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn node(&self, path: &TaxonomyPath) -> Option<&TaxonomyNode> {
        self.nodes.get(path)
    }

    /// Child paths in definition order; empty for leaves and unknown paths.
    pub fn child_paths(&self, path: &TaxonomyPath) -> Vec<TaxonomyPath> {
        self.nodes
            .get(path)
            .map(|node| {
                node.children
                    .iter()
                    .map(|name| TaxonomyPath(format!("{}/{}", path.as_str(), name)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_leaf(&self, path: &TaxonomyPath) -> bool {
        self.nodes.get(path).is_some_and(TaxonomyNode::is_leaf)
    }

    pub fn depth(&self, path: &TaxonomyPath) -> Option<usize> {
        self.nodes.get(path).map(|node| node.path.depth())
    }

    /// All nodes strictly below `path`, depth-first in definition order.
    pub fn descendants(&self, path: &TaxonomyPath) -> Vec<TaxonomyPath> {
        let mut out = Vec::new();
        let mut stack: Vec<TaxonomyPath> = self.child_paths(path).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(self.child_paths(&next).into_iter().rev());
            out.push(next);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SAMPLE: &str = r#"
        [Recon.Passive]
        [Recon.Active]
        Scanning = ["Ports", "Services"]

        [Exploitation.Web]
    "#;

    fn path(raw: &str) -> TaxonomyPath {
        TaxonomyPath::parse(raw).expect("valid path")
    }

    #[test]
    fn toml_definition_keeps_document_order() {
        let model = TaxonomyModel::from_toml_str(SAMPLE).expect("sample parses");

        assert_eq!(model.branches(), ["Recon", "Exploitation"]);
        assert_eq!(
            model.child_paths(&path("Recon")),
            vec![path("Recon/Passive"), path("Recon/Active")]
        );
        assert_eq!(
            model.child_paths(&path("Recon/Active/Scanning")),
            vec![path("Recon/Active/Scanning/Ports"), path("Recon/Active/Scanning/Services")]
        );
        assert!(model.is_leaf(&path("Recon/Passive")));
        assert!(!model.is_leaf(&path("Recon/Active")));
        assert_eq!(model.depth(&path("Recon/Active/Scanning/Ports")), Some(4));
    }

    #[test]
    fn from_paths_creates_intermediate_nodes() {
        let model = TaxonomyModel::from_paths(["A/B/C", "A/D", "E"]).expect("paths parse");

        assert!(model.contains(&path("A/B")));
        assert_eq!(model.branches(), ["A", "E"]);
        assert_eq!(
            model.descendants(&path("A")),
            vec![path("A/B"), path("A/B/C"), path("A/D")]
        );
        assert_eq!(model.len(), 5);
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        assert!(matches!(
            TaxonomyModel::from_toml_str(""),
            Err(TaxonomyError::Empty)
        ));
        assert!(matches!(
            TaxonomyModel::from_toml_str("Recon = 3"),
            Err(TaxonomyError::InvalidNode { .. })
        ));
        assert!(matches!(
            TaxonomyModel::from_toml_str("Recon = [1]"),
            Err(TaxonomyError::InvalidNode { .. })
        ));
    }

    #[rstest]
    #[case("A/B/C", "A/B", true)]
    #[case("A/B", "A/B", true)]
    #[case("A/BC", "A/B", false)]
    #[case("A", "A/B", false)]
    fn is_within_respects_segment_boundaries(
        #[case] candidate: &str,
        #[case] prefix: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(path(candidate).is_within(&path(prefix)), expected);
    }

    #[test]
    fn prefixes_are_shallowest_first() {
        let p = path(" Phase1 / GroupA /Sub ");
        assert_eq!(p.as_str(), "Phase1/GroupA/Sub");
        assert_eq!(
            p.prefixes(),
            vec![path("Phase1"), path("Phase1/GroupA"), path("Phase1/GroupA/Sub")]
        );
        assert_eq!(p.proper_prefixes().len(), 2);
        assert_eq!(p.branch(), "Phase1");
        assert_eq!(p.name(), "Sub");
        assert_eq!(p.parent(), Some(path("Phase1/GroupA")));
        assert!(TaxonomyPath::parse("A//B").is_err());
    }
}
