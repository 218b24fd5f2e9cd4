//! Snapshot model of the items selected for copying.

use std::path::{Path, PathBuf};

use crate::spec::EnumFileKind;

/// One file of a tree snapshot, or one file materialized by a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecFileNode {
    /// Normalized location inside the owning store.
    pub path: PathBuf,
    pub name: String,
    pub kind: EnumFileKind,
    /// Opaque charset tag, carried through copies untouched.
    pub encoding: Option<String>,
}

/// One directory of a tree snapshot with its children in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecDirNode {
    pub path: PathBuf,
    pub name: String,
    pub encoding: Option<String>,
    pub children: Vec<Node>,
}

/// File-system tree item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    File(SpecFileNode),
    Directory(SpecDirNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Self::File(f) => &f.name,
            Self::Directory(d) => &d.name,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::File(f) => &f.path,
            Self::Directory(d) => &d.path,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Strict ancestry by location: a node is never its own ancestor.
    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        self.is_directory() && is_strict_ancestor(self.path(), other.path())
    }

    /// Depth-first iterator over this node and all of its descendants.
    pub fn iter(&self) -> IterNode<'_> {
        IterNode { stack: vec![self] }
    }
}

/// Pre-order traversal, children visited in listing order.
pub struct IterNode<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for IterNode<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Node::Directory(d) = node {
            self.stack.extend(d.children.iter().rev());
        }
        Some(node)
    }
}

pub(crate) fn is_strict_ancestor(path_ancestor: &Path, path: &Path) -> bool {
    path != path_ancestor && path.starts_with(path_ancestor)
}

/// Default destination for a selection: the outermost parent directory.
///
/// Each item contributes its parent; a parent that strictly contains the
/// current candidate replaces it. Unrelated parents keep the first candidate.
pub fn common_parent_directory(items: &[Node]) -> Option<PathBuf> {
    let mut path_result: Option<&Path> = None;
    for item in items {
        let Some(path_parent) = item.path().parent() else {
            continue;
        };
        match path_result {
            None => path_result = Some(path_parent),
            Some(path_current) if is_strict_ancestor(path_parent, path_current) => {
                path_result = Some(path_parent);
            }
            Some(_) => {}
        }
    }
    path_result.map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{Node, SpecDirNode, SpecFileNode, common_parent_directory};
    use crate::spec::EnumFileKind;

    fn file(path: &str) -> Node {
        let path = PathBuf::from(path);
        Node::File(SpecFileNode {
            name: path.file_name().unwrap().to_string_lossy().to_string(),
            path,
            kind: EnumFileKind::Text,
            encoding: None,
        })
    }

    fn dir(path: &str, children: Vec<Node>) -> Node {
        let path = PathBuf::from(path);
        Node::Directory(SpecDirNode {
            name: path.file_name().unwrap().to_string_lossy().to_string(),
            path,
            encoding: None,
            children,
        })
    }

    #[test]
    fn ancestry_is_strict_and_directory_only() {
        let d = dir("/p/a", vec![]);
        let f = file("/p/a/x.txt");
        let f_lookalike = file("/p/ab/x.txt");

        assert!(d.is_ancestor_of(&f));
        assert!(!d.is_ancestor_of(&d));
        assert!(!d.is_ancestor_of(&f_lookalike));
        assert!(!f.is_ancestor_of(&d));
    }

    #[test]
    fn iter_is_preorder_in_listing_order() {
        let tree = dir(
            "/p/a",
            vec![
                dir("/p/a/b", vec![file("/p/a/b/1.txt")]),
                file("/p/a/2.txt"),
            ],
        );
        let names: Vec<&str> = tree.iter().map(Node::name).collect();
        assert_eq!(names, ["a", "b", "1.txt", "2.txt"]);
    }

    #[test]
    fn common_parent_prefers_outermost_parent() {
        let items = [file("/p/a/b/x.txt"), file("/p/a/y.txt")];
        assert_eq!(
            common_parent_directory(&items).as_deref(),
            Some(Path::new("/p/a"))
        );

        let items = [file("/p/a/y.txt"), file("/q/z.txt")];
        assert_eq!(
            common_parent_directory(&items).as_deref(),
            Some(Path::new("/p/a"))
        );

        assert_eq!(common_parent_directory(&[]), None);
    }
}
