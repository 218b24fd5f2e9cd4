//! In-memory tree store for headless runs and deterministic tests.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::node::{Node, SpecDirNode, SpecFileNode};
use crate::spec::EnumFileKind;
use crate::store::TreeStore;
use crate::util::{name_of, normalize_path_lexically, validate_entry_name};

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryMemory {
    File {
        content: Vec<u8>,
        encoding: Option<String>,
        kind: EnumFileKind,
    },
    Directory {
        encoding: Option<String>,
    },
}

/// Absolute-path keyed tree. The root `/` always exists.
#[derive(Debug, Clone)]
pub struct StoreMemory {
    entries: BTreeMap<PathBuf, EntryMemory>,
    paths_fail_write: BTreeSet<PathBuf>,
    n_writes: u64,
}

impl Default for StoreMemory {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PathBuf::from("/"), EntryMemory::Directory { encoding: None });
        Self {
            entries,
            paths_fail_write: BTreeSet::new(),
            n_writes: 0,
        }
    }
}

impl StoreMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory and any missing ancestors.
    pub fn add_directory(&mut self, path: impl AsRef<Path>) -> &mut Self {
        let path = key(path.as_ref());
        for path_ancestor in path.ancestors().collect::<Vec<_>>().into_iter().rev() {
            self.entries
                .entry(path_ancestor.to_path_buf())
                .or_insert(EntryMemory::Directory { encoding: None });
        }
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> &mut Self {
        self.add_file_with(path, content, None, EnumFileKind::Text)
    }

    pub fn add_file_with(
        &mut self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        encoding: Option<&str>,
        kind: EnumFileKind,
    ) -> &mut Self {
        let path = key(path.as_ref());
        if let Some(path_parent) = path.parent() {
            self.add_directory(path_parent);
        }
        self.entries.insert(
            path,
            EntryMemory::File {
                content: content.into(),
                encoding: encoding.map(str::to_string),
                kind,
            },
        );
        self
    }

    /// Make every later write addressing `path` fail.
    pub fn fail_writes_at(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.paths_fail_write.insert(key(path.as_ref()));
        self
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        match self.entries.get(&key(path.as_ref()))? {
            EntryMemory::File { content, .. } => Some(content),
            EntryMemory::Directory { .. } => None,
        }
    }

    /// Number of successful mutations since construction (setup excluded).
    pub fn write_count(&self) -> u64 {
        self.n_writes
    }

    /// All paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    fn check_fault(&self, path: &Path) -> io::Result<()> {
        if self.paths_fail_write.contains(path) {
            return Err(io::Error::other(format!(
                "Injected write failure: {}",
                path.display()
            )));
        }
        Ok(())
    }

    fn require_directory(&self, path: &Path) -> io::Result<()> {
        match self.entries.get(path) {
            Some(EntryMemory::Directory { .. }) => Ok(()),
            Some(EntryMemory::File { .. }) => Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("Not a directory: {}", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    fn children_of<'a>(&'a self, path_dir: &'a Path) -> impl Iterator<Item = &'a Path> + 'a {
        self.entries
            .keys()
            .filter(move |p| p.parent() == Some(path_dir))
            .map(PathBuf::as_path)
    }
}

impl TreeStore for StoreMemory {
    fn load_node(&self, path: &Path) -> io::Result<Node> {
        let path = key(path);
        match self.entries.get(&path) {
            Some(EntryMemory::File { encoding, kind, .. }) => Ok(Node::File(SpecFileNode {
                name: name_of(&path),
                kind: *kind,
                encoding: encoding.clone(),
                path,
            })),
            Some(EntryMemory::Directory { encoding }) => {
                let children = self
                    .children_of(&path)
                    .map(|p| self.load_node(p))
                    .collect::<io::Result<Vec<_>>>()?;
                Ok(Node::Directory(SpecDirNode {
                    name: name_of(&path),
                    encoding: encoding.clone(),
                    children,
                    path,
                }))
            }
            None => Err(not_found(&path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.contains_key(&key(path))
    }

    fn is_directory(&self, path: &Path) -> bool {
        matches!(
            self.entries.get(&key(path)),
            Some(EntryMemory::Directory { .. })
        )
    }

    fn find_child_file(&self, dir_target: &Path, name: &str) -> Option<PathBuf> {
        validate_entry_name(name).ok()?;
        let path = key(dir_target).join(name);
        match self.entries.get(&path)? {
            EntryMemory::File { .. } => Some(path),
            EntryMemory::Directory { .. } => None,
        }
    }

    fn find_subdirectory(&self, dir_target: &Path, name: &str) -> Option<PathBuf> {
        validate_entry_name(name).ok()?;
        let path = key(dir_target).join(name);
        match self.entries.get(&path)? {
            EntryMemory::Directory { .. } => Some(path),
            EntryMemory::File { .. } => None,
        }
    }

    fn create_subdirectory(&mut self, dir_target: &Path, name: &str) -> io::Result<PathBuf> {
        validate_entry_name(name)?;
        let dir_target = key(dir_target);
        let path = dir_target.join(name);
        match self.entries.get(&path) {
            Some(EntryMemory::Directory { .. }) => return Ok(path),
            Some(EntryMemory::File { .. }) => return Err(already_exists(&path)),
            None => {}
        }
        self.require_directory(&dir_target)?;
        self.check_fault(&path)?;
        self.entries
            .insert(path.clone(), EntryMemory::Directory { encoding: None });
        self.n_writes += 1;
        Ok(path)
    }

    fn copy_file_into(
        &mut self,
        dir_target: &Path,
        name: &str,
        file_src: &SpecFileNode,
    ) -> io::Result<PathBuf> {
        validate_entry_name(name)?;
        let dir_target = key(dir_target);
        let path = dir_target.join(name);
        if self.entries.contains_key(&path) {
            return Err(already_exists(&path));
        }
        self.require_directory(&dir_target)?;
        let content = self.read_content(&file_src.path)?;
        self.check_fault(&path)?;
        self.entries.insert(
            path.clone(),
            EntryMemory::File {
                content,
                encoding: file_src.encoding.clone(),
                kind: file_src.kind,
            },
        );
        self.n_writes += 1;
        Ok(path)
    }

    fn delete(&mut self, path_file: &Path) -> io::Result<()> {
        let path_file = key(path_file);
        match self.entries.get(&path_file) {
            Some(EntryMemory::File { .. }) => {}
            Some(EntryMemory::Directory { .. }) => {
                return Err(io::Error::new(
                    io::ErrorKind::IsADirectory,
                    format!("Is a directory: {}", path_file.display()),
                ));
            }
            None => return Err(not_found(&path_file)),
        }
        self.check_fault(&path_file)?;
        self.entries.remove(&path_file);
        self.n_writes += 1;
        Ok(())
    }

    fn read_content(&self, path_file: &Path) -> io::Result<Vec<u8>> {
        let path_file = key(path_file);
        match self.entries.get(&path_file) {
            Some(EntryMemory::File { content, .. }) => Ok(content.clone()),
            Some(EntryMemory::Directory { .. }) => Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("Is a directory: {}", path_file.display()),
            )),
            None => Err(not_found(&path_file)),
        }
    }

    fn read_encoding(&self, path: &Path) -> Option<String> {
        match self.entries.get(&key(path))? {
            EntryMemory::File { encoding, .. } | EntryMemory::Directory { encoding } => {
                encoding.clone()
            }
        }
    }

    fn write_encoding(&mut self, path: &Path, encoding: Option<&str>) -> io::Result<()> {
        let path = key(path);
        self.check_fault(&path)?;
        match self.entries.get_mut(&path) {
            Some(EntryMemory::File { encoding: slot, .. } | EntryMemory::Directory { encoding: slot }) => {
                *slot = encoding.map(str::to_string);
            }
            None => return Err(not_found(&path)),
        }
        self.n_writes += 1;
        Ok(())
    }
}

fn key(path: &Path) -> PathBuf {
    normalize_path_lexically(&Path::new("/").join(path))
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("No such entry: {}", path.display()),
    )
}

fn already_exists(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("Entry already exists: {}", path.display()),
    )
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::{Path, PathBuf};

    use super::StoreMemory;
    use crate::node::Node;
    use crate::spec::EnumFileKind;
    use crate::store::TreeStore;

    #[test]
    fn load_node_lists_children_sorted_by_name() {
        let mut store = StoreMemory::new();
        store
            .add_file("/p/d/b.txt", "b")
            .add_file("/p/d/a.txt", "a")
            .add_directory("/p/d/c");

        let Node::Directory(d) = store.load_node(Path::new("/p/d")).expect("load") else {
            panic!("expected directory");
        };
        let names: Vec<&str> = d.children.iter().map(Node::name).collect();
        assert_eq!(names, ["a.txt", "b.txt", "c"]);
    }

    #[test]
    fn create_subdirectory_is_idempotent() {
        let mut store = StoreMemory::new();
        store.add_directory("/t");

        let first = store.create_subdirectory(Path::new("/t"), "sub").expect("create");
        let second = store.create_subdirectory(Path::new("/t"), "sub").expect("reuse");
        assert_eq!(first, second);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn create_subdirectory_refuses_file_with_same_name() {
        let mut store = StoreMemory::new();
        store.add_file("/t/sub", "x");

        let err = store
            .create_subdirectory(Path::new("/t"), "sub")
            .expect_err("file in the way");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn copy_file_into_duplicates_bytes_encoding_and_kind() {
        let mut store = StoreMemory::new();
        store
            .add_file_with(
                "/s/img.dat",
                vec![0_u8, 1, 2],
                Some("windows-1252"),
                EnumFileKind::Binary,
            )
            .add_directory("/t");
        let Node::File(f) = store.load_node(Path::new("/s/img.dat")).expect("load") else {
            panic!("expected file");
        };

        let path_new = store
            .copy_file_into(Path::new("/t"), "copy.dat", &f)
            .expect("copy");
        assert_eq!(path_new, PathBuf::from("/t/copy.dat"));
        assert_eq!(store.content("/t/copy.dat"), Some(&[0_u8, 1, 2][..]));
        assert_eq!(
            store.read_encoding(&path_new).as_deref(),
            Some("windows-1252")
        );

        let err = store
            .copy_file_into(Path::new("/t"), "copy.dat", &f)
            .expect_err("name taken");
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn injected_fault_fails_only_that_path() {
        let mut store = StoreMemory::new();
        store.add_directory("/t").fail_writes_at("/t/bad");

        assert!(store.create_subdirectory(Path::new("/t"), "bad").is_err());
        assert!(store.create_subdirectory(Path::new("/t"), "good").is_ok());
        assert!(!store.exists(Path::new("/t/bad")));
    }

    #[test]
    fn relative_and_dotted_paths_share_identity() {
        let mut store = StoreMemory::new();
        store.add_file("p/./a/../b.txt", "x");
        assert!(store.exists(Path::new("/p/b.txt")));
        assert_eq!(
            store.find_child_file(Path::new("/p"), "b.txt"),
            Some(PathBuf::from("/p/b.txt"))
        );
    }
}
