//! Plain-text rule dump of a fitted tree.

use std::fmt::Write;

use crate::node::{Node, NodeIndex};
use crate::tree::DecisionTree;

/// Default number of levels printed before branches are truncated.
pub const DEFAULT_EXPORT_DEPTH: usize = 10;

const SPACING: usize = 3;

impl DecisionTree {
    /// Render the tree as indented `|---` rules, one line per condition or leaf.
    ///
    /// ```text
    /// |--- age <= 24.50
    /// |   |--- class: 0
    /// |--- age >  24.50
    /// |   |--- class: 1
    /// ```
    ///
    /// Thresholds are printed with two decimals. Branches below `max_depth`
    /// levels are replaced by `truncated branch of depth N`. Features without
    /// a name fall back to `feature_{i}`.
    #[must_use]
    pub fn export_text(&self, feature_names: &[String], max_depth: usize) -> String {
        let mut out = String::new();
        self.write_rules(&mut out, NodeIndex::ROOT, 1, feature_names, max_depth);
        out
    }

    fn write_rules(
        &self,
        out: &mut String,
        idx: NodeIndex,
        depth: usize,
        names: &[String],
        max_depth: usize,
    ) {
        let mut indent = format!("|{}", " ".repeat(SPACING)).repeat(depth);
        indent.truncate(indent.len() - SPACING);
        indent.push_str(&"-".repeat(SPACING));

        let node = self.node(idx);
        if depth > max_depth + 1 {
            if let Node::Leaf { class, .. } = node {
                let _ = writeln!(out, "{indent} class: {class}");
            } else {
                let levels = self.subtree_depth(idx) + 1;
                let _ = writeln!(out, "{indent} truncated branch of depth {levels}");
            }
            return;
        }

        match node {
            Node::Leaf { class, .. } => {
                let _ = writeln!(out, "{indent} class: {class}");
            }
            Node::Branch {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                let name = names
                    .get(feature.index())
                    .cloned()
                    .unwrap_or_else(|| format!("feature_{}", feature.index()));
                let _ = writeln!(out, "{indent} {name} <= {threshold:.2}");
                self.write_rules(out, *left, depth + 1, names, max_depth);
                let _ = writeln!(out, "{indent} {name} >  {threshold:.2}");
                self.write_rules(out, *right, depth + 1, names, max_depth);
            }
        }
    }
}
