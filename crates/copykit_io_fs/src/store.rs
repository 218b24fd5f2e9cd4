//! Storage seam consumed by the copy engine.
//!
//! A [`TreeStore`] is both the content source of the selected items and the
//! destination tree. Directory arguments named `dir_target` play the role of
//! a target directory handle: the engine only ever addresses children of an
//! already-resolved directory through them.

use std::io;
use std::path::{Path, PathBuf};

use crate::node::{Node, SpecFileNode};
use crate::util::normalize_path_lexically;

pub trait TreeStore {
    /// Snapshot of the item at `path`, directories loaded recursively with
    /// children sorted by name.
    fn load_node(&self, path: &Path) -> io::Result<Node>;

    /// Normalized identity of `path` inside this store.
    fn canonical_path(&self, path: &Path) -> PathBuf {
        normalize_path_lexically(path)
    }

    fn exists(&self, path: &Path) -> bool;

    fn is_directory(&self, path: &Path) -> bool;

    /// Regular file named `name` directly inside `dir_target`.
    fn find_child_file(&self, dir_target: &Path, name: &str) -> Option<PathBuf>;

    /// Directory named `name` directly inside `dir_target`.
    fn find_subdirectory(&self, dir_target: &Path, name: &str) -> Option<PathBuf>;

    /// Create `name` inside `dir_target`, or return the existing directory.
    fn create_subdirectory(&mut self, dir_target: &Path, name: &str) -> io::Result<PathBuf>;

    /// Duplicate the bytes and encoding tag of `file_src` as a new file
    /// `name` inside `dir_target`. Fails if the name is already taken.
    fn copy_file_into(
        &mut self,
        dir_target: &Path,
        name: &str,
        file_src: &SpecFileNode,
    ) -> io::Result<PathBuf>;

    /// Remove one file.
    fn delete(&mut self, path_file: &Path) -> io::Result<()>;

    fn read_content(&self, path_file: &Path) -> io::Result<Vec<u8>>;

    fn read_encoding(&self, path: &Path) -> Option<String>;

    fn write_encoding(&mut self, path: &Path, encoding: Option<&str>) -> io::Result<()>;
}

/// Load several selected paths at once, keeping selection order.
pub fn load_nodes<S, P>(store: &S, paths: &[P]) -> io::Result<Vec<Node>>
where
    S: TreeStore + ?Sized,
    P: AsRef<Path>,
{
    paths.iter().map(|p| store.load_node(p.as_ref())).collect()
}
