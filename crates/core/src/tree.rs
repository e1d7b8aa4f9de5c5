//! Folding a flat listing of repository paths into a directory tree.
//!
//! Revision listings only ever name files, so directories are inferred from
//! path prefixes. A node first seen as a file is upgraded to a directory as
//! soon as another path proves it has children.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A node in the repository tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    /// Root-relative, `/`-joined path.
    pub path: String,
    pub is_directory: bool,
    /// `Some` for directories, `None` for files.
    pub children: Option<Vec<TreeNode>>,
    /// UI-only expansion flag.
    pub expanded: bool,
}

impl TreeNode {
    fn new(name: &str, path: String, is_directory: bool) -> Self {
        Self {
            name: name.to_string(),
            path,
            is_directory,
            children: is_directory.then(Vec::new),
            expanded: false,
        }
    }

    fn mark_directory(&mut self) {
        self.is_directory = true;
        if self.children.is_none() {
            self.children = Some(Vec::new());
        }
    }

    /// Child nodes, empty for files.
    pub fn children(&self) -> &[TreeNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Look up a descendant (or this node) by its full path.
    pub fn find(&self, path: &str) -> Option<&TreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(path))
    }

    fn find_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        if self.path == path {
            return Some(self);
        }
        self.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| child.find_mut(path))
    }
}

/// Build the root-level nodes for a set of repository-relative file paths.
///
/// The result does not depend on the order of `paths`. Empty segments
/// (`a//b`, leading or trailing `/`) are folded away.
pub fn build_tree<I, S>(paths: I) -> Vec<TreeNode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut root = TreeNode::new("", String::new(), true);

    for path in paths {
        let path = path.as_ref();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            debug!(path, "ignoring path without segments");
            continue;
        }
        if segments.len() != path.split('/').count() {
            debug!(path, "folding empty path segments");
        }
        insert_path(&mut root, &segments);
    }

    root.children.unwrap_or_default()
}

fn insert_path(root: &mut TreeNode, segments: &[&str]) {
    let mut current = root;
    let mut prefix = String::new();

    for (depth, segment) in segments.iter().enumerate() {
        let is_last = depth + 1 == segments.len();
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);

        current.mark_directory();
        let children = current.children.get_or_insert_with(Vec::new);
        let idx = match children.iter().position(|c| c.name == *segment) {
            Some(idx) => {
                if !is_last {
                    children[idx].mark_directory();
                }
                idx
            }
            None => {
                children.push(TreeNode::new(segment, prefix.clone(), !is_last));
                children.len() - 1
            }
        };

        // Re-sort after every touch; the index moves, so look it up again.
        let name = children[idx].name.clone();
        children.sort_by(compare_nodes);
        let idx = children
            .iter()
            .position(|c| c.name == name)
            .unwrap_or(idx);
        current = &mut children[idx];
    }
}

/// Directories before files, then case-sensitive by name.
fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.cmp(&b.name))
}

/// A tree node flattened for list-style rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatTreeEntry {
    pub name: String,
    pub path: String,
    pub depth: usize,
    pub is_directory: bool,
}

/// Pre-order flattening. Children of collapsed directories are skipped unless
/// `expand_all` is set.
pub fn flatten_tree(nodes: &[TreeNode], expand_all: bool) -> Vec<FlatTreeEntry> {
    let mut out = Vec::new();
    flatten_into(nodes, 0, expand_all, &mut out);
    out
}

fn flatten_into(nodes: &[TreeNode], depth: usize, expand_all: bool, out: &mut Vec<FlatTreeEntry>) {
    for node in nodes {
        out.push(FlatTreeEntry {
            name: node.name.clone(),
            path: node.path.clone(),
            depth,
            is_directory: node.is_directory,
        });
        if node.is_directory && (expand_all || node.expanded) {
            flatten_into(node.children(), depth + 1, expand_all, out);
        }
    }
}

/// Toggle the UI expansion flag of the node at `path`. Returns `false` if
/// no such node exists.
pub fn set_expanded(nodes: &mut [TreeNode], path: &str, expanded: bool) -> bool {
    for node in nodes.iter_mut() {
        if let Some(target) = node.find_mut(path) {
            target.expanded = expanded;
            return true;
        }
    }
    false
}

/// Number of file (leaf) nodes in the tree.
pub fn count_files(nodes: &[TreeNode]) -> usize {
    nodes
        .iter()
        .map(|n| {
            if n.is_directory {
                count_files(n.children())
            } else {
                1
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_empty_listing() {
        let tree = build_tree(Vec::<String>::new());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_build_tree() {
        let tree = build_tree(["src/main.rs", "src/lib.rs", "README.md"]);

        assert_eq!(names(&tree), vec!["src", "README.md"]);
        assert!(tree[0].is_directory);
        assert_eq!(names(tree[0].children()), vec!["lib.rs", "main.rs"]);
        assert_eq!(tree[0].children()[1].path, "src/main.rs");
        assert!(!tree[1].is_directory);
        assert!(tree[1].children.is_none());
    }

    #[test]
    fn test_directory_upgrade() {
        let tree = build_tree(["a", "a/b"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "a");
        assert!(tree[0].is_directory);
        assert_eq!(names(tree[0].children()), vec!["b"]);
    }

    #[test]
    fn test_directory_upgrade_is_sticky() {
        // A later file-shaped observation never downgrades a directory.
        let tree = build_tree(["a/b", "a"]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_directory);
    }

    #[test]
    fn test_order_independent() {
        let paths = vec![
            "docs/guide.md",
            "src/a/x.rs",
            "Zeta",
            "src/b.rs",
            "alpha",
            "src",
            "docs/api/index.md",
        ];
        let forward = build_tree(&paths);
        let mut reversed = paths.clone();
        reversed.reverse();
        let backward = build_tree(&reversed);
        let mut rotated = paths.clone();
        rotated.rotate_left(3);
        assert_eq!(forward, backward);
        assert_eq!(forward, build_tree(&rotated));
    }

    #[test]
    fn test_sort_directories_first_case_sensitive() {
        let tree = build_tree(["b.txt", "A.txt", "a.txt", "zdir/f", "Bdir/f"]);
        assert_eq!(names(&tree), vec!["Bdir", "zdir", "A.txt", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_duplicates_are_merged() {
        let tree = build_tree(["x/y.rs", "x/y.rs", "x/z.rs"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children().len(), 2);
    }

    #[test]
    fn test_empty_segments_folded() {
        let tree = build_tree(["a//b", "/c", "d/", "///"]);
        assert_eq!(names(&tree), vec!["a", "c", "d"]);
        assert_eq!(tree[0].children()[0].path, "a/b");
    }

    #[test]
    fn test_flatten_honours_expansion() {
        let mut tree = build_tree(["src/main.rs", "src/git/mod.rs", "Cargo.toml"]);

        let collapsed = flatten_tree(&tree, false);
        assert_eq!(collapsed.len(), 2);

        assert!(set_expanded(&mut tree, "src", true));
        let one_level = flatten_tree(&tree, false);
        let paths: Vec<&str> = one_level.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["src", "src/git", "src/main.rs", "Cargo.toml"]);
        assert_eq!(one_level[1].depth, 1);

        let all = flatten_tree(&tree, true);
        assert_eq!(all.len(), 5);
        assert!(!set_expanded(&mut tree, "missing", true));
    }

    #[test]
    fn test_find_and_count() {
        let tree = build_tree(["a/b/c.txt", "a/d.txt", "e.txt"]);
        assert_eq!(count_files(&tree), 3);
        let node = tree[0].find("a/b/c.txt").unwrap();
        assert_eq!(node.name, "c.txt");
        assert!(tree[0].find("a/zzz").is_none());
    }
}
