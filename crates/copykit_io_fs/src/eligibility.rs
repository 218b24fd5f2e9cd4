//! Batch-level preconditions checked before anything is written.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use crate::node::Node;
use crate::store::TreeStore;

/// Why a selection cannot be copied as one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumIneligibleReason {
    /// Item vanished from its store since it was selected.
    Invalid(PathBuf),
    /// Compiled/read-only representation.
    NotCopyable(PathBuf),
    /// Two selected items share a name.
    DuplicateName(String),
    /// A selected item lives inside another selected directory.
    NestedItem {
        ancestor: PathBuf,
        descendant: PathBuf,
    },
}

impl fmt::Display for EnumIneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(path) => write!(f, "Item no longer exists: {}", path.display()),
            Self::NotCopyable(path) => write!(f, "Item cannot be copied: {}", path.display()),
            Self::DuplicateName(name) => write!(f, "Duplicate name in selection: {name}"),
            Self::NestedItem {
                ancestor,
                descendant,
            } => write!(
                f,
                "Selected item {} is inside selected directory {}",
                descendant.display(),
                ancestor.display()
            ),
        }
    }
}

/// First reason the selection is not copyable, scanning in selection order.
pub fn find_ineligible(items: &[Node]) -> Option<EnumIneligibleReason> {
    let mut set_names: HashSet<&str> = HashSet::with_capacity(items.len());
    for item in items {
        if let Node::File(f) = item
            && !f.kind.is_copyable()
        {
            return Some(EnumIneligibleReason::NotCopyable(f.path.clone()));
        }
        if !set_names.insert(item.name()) {
            return Some(EnumIneligibleReason::DuplicateName(item.name().to_string()));
        }
    }

    for ancestor in items {
        if let Some(descendant) = items.iter().find(|other| ancestor.is_ancestor_of(other)) {
            return Some(EnumIneligibleReason::NestedItem {
                ancestor: ancestor.path().to_path_buf(),
                descendant: descendant.path().to_path_buf(),
            });
        }
    }
    None
}

/// `true` when the selection can be copied as one batch.
pub fn check_copyable(items: &[Node]) -> bool {
    find_ineligible(items).is_none()
}

/// Like [`find_ineligible`], also rejecting items missing from `store`.
pub fn find_ineligible_in<S>(store: &S, items: &[Node]) -> Option<EnumIneligibleReason>
where
    S: TreeStore + ?Sized,
{
    if let Some(item) = items.iter().find(|item| !store.exists(item.path())) {
        return Some(EnumIneligibleReason::Invalid(item.path().to_path_buf()));
    }
    find_ineligible(items)
}

pub fn check_copyable_in<S>(store: &S, items: &[Node]) -> bool
where
    S: TreeStore + ?Sized,
{
    find_ineligible_in(store, items).is_none()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{EnumIneligibleReason, check_copyable, check_copyable_in, find_ineligible};
    use crate::spec::EnumFileKind;
    use crate::store::{TreeStore, load_nodes};
    use crate::store_memory::StoreMemory;

    fn fixture() -> StoreMemory {
        let mut store = StoreMemory::new();
        store
            .add_file("/p/a/x.txt", "x")
            .add_file("/p/b/x.txt", "other x")
            .add_file("/p/b/y.txt", "y")
            .add_file_with("/p/b/Y.class", "cafe", None, EnumFileKind::Compiled);
        store
    }

    #[test]
    fn accepts_distinct_unrelated_items() {
        let store = fixture();
        let items = load_nodes(&store, &["/p/a", "/p/b/y.txt"]).expect("load");
        assert!(check_copyable(&items));
        assert!(check_copyable_in(&store, &items));
    }

    #[test]
    fn empty_selection_is_vacuously_copyable() {
        assert!(check_copyable(&[]));
    }

    #[test]
    fn rejects_duplicate_names() {
        let store = fixture();
        let items = load_nodes(&store, &["/p/a/x.txt", "/p/b/x.txt"]).expect("load");
        assert_eq!(
            find_ineligible(&items),
            Some(EnumIneligibleReason::DuplicateName("x.txt".to_string()))
        );
    }

    #[test]
    fn rejects_item_nested_in_selected_directory() {
        let store = fixture();
        let items = load_nodes(&store, &["/p/b/y.txt", "/p/b"]).expect("load");
        assert_eq!(
            find_ineligible(&items),
            Some(EnumIneligibleReason::NestedItem {
                ancestor: PathBuf::from("/p/b"),
                descendant: PathBuf::from("/p/b/y.txt"),
            })
        );
    }

    #[test]
    fn rejects_compiled_files() {
        let store = fixture();
        let items = load_nodes(&store, &["/p/b/Y.class"]).expect("load");
        assert!(!check_copyable(&items));
        assert!(matches!(
            find_ineligible(&items),
            Some(EnumIneligibleReason::NotCopyable(_))
        ));
    }

    #[test]
    fn rejects_items_gone_from_store() {
        let mut store = fixture();
        let items = load_nodes(&store, &["/p/a/x.txt"]).expect("load");
        store.delete(Path::new("/p/a/x.txt")).expect("delete");

        assert!(check_copyable(&items));
        assert!(!check_copyable_in(&store, &items));
    }

    #[test]
    fn accepted_batches_hold_name_and_nesting_invariants() {
        let store = fixture();
        let candidates = [
            vec!["/p/a", "/p/b"],
            vec!["/p/a/x.txt", "/p/b/y.txt"],
            vec!["/p", "/p/a"],
            vec!["/p/a/x.txt", "/p/b/x.txt", "/p/b/y.txt"],
        ];
        for paths in candidates {
            let items = load_nodes(&store, &paths).expect("load");
            if !check_copyable(&items) {
                continue;
            }
            for (i, left) in items.iter().enumerate() {
                for right in items.iter().skip(i + 1) {
                    assert_ne!(left.name(), right.name());
                    assert!(!left.is_ancestor_of(right));
                    assert!(!right.is_ancestor_of(left));
                }
            }
        }
    }
}
