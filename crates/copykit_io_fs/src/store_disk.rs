//! Real filesystem store.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::node::{Node, SpecDirNode, SpecFileNode};
use crate::spec::{CopyBatchError, EnumFileKind, SpecStoreOptions};
use crate::store::TreeStore;
use crate::util::{
    TypeCopyPatternSeq, compile_patterns, copy_file_with_metadata, is_pattern_matching, name_of,
    normalize_path, read_encoding_xattr, sniff_binary, validate_entry_name, write_encoding_xattr,
};

#[derive(Debug, Clone)]
pub struct StoreDisk {
    spec_store_options: SpecStoreOptions,
    patterns_compiled: Option<TypeCopyPatternSeq>,
    patterns_binary: Option<TypeCopyPatternSeq>,
}

impl StoreDisk {
    /// Compile classification patterns up front.
    pub fn new(spec_store_options: SpecStoreOptions) -> Result<Self, CopyBatchError> {
        let patterns_compiled = compile_patterns(
            spec_store_options.patterns_compiled.as_deref(),
            spec_store_options.rule_pattern,
        )?;
        let patterns_binary = compile_patterns(
            spec_store_options.patterns_binary.as_deref(),
            spec_store_options.rule_pattern,
        )?;
        Ok(Self {
            spec_store_options,
            patterns_compiled,
            patterns_binary,
        })
    }

    fn classify(&self, path_file: &Path, name_file: &str) -> EnumFileKind {
        if is_pattern_matching(name_file, self.patterns_compiled.as_ref()) {
            return EnumFileKind::Compiled;
        }
        if is_pattern_matching(name_file, self.patterns_binary.as_ref()) {
            return EnumFileKind::Binary;
        }
        if self.spec_store_options.if_sniff_binary {
            match sniff_binary(path_file) {
                Ok(true) => return EnumFileKind::Binary,
                Ok(false) => {}
                Err(e) => warn!(path = %path_file.display(), "Failed to sniff file content ({e})"),
            }
        }
        EnumFileKind::Text
    }

    fn load_normalized(&self, path: &Path) -> io::Result<Node> {
        let meta = fs::symlink_metadata(path)?;
        let name = match path.file_name() {
            None => name_of(path),
            Some(v) => v.to_str().map(str::to_string).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("File name is not valid UTF-8: {}", path.display()),
                )
            })?,
        };
        let encoding = read_encoding_xattr(path);

        if meta.is_file() {
            return Ok(Node::File(SpecFileNode {
                kind: self.classify(path, &name),
                path: path.to_path_buf(),
                name,
                encoding,
            }));
        }
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Not a regular file or directory: {}", path.display()),
            ));
        }

        let mut l_entries = Vec::new();
        for entry_res in fs::read_dir(path)? {
            let entry = entry_res?;
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                warn!(path = %entry.path().display(), "Symlink skipped");
                continue;
            }
            if !file_type.is_file() && !file_type.is_dir() {
                warn!(path = %entry.path().display(), "Special file skipped");
                continue;
            }
            if entry.file_name().to_str().is_none() {
                warn!(path = %entry.path().display(), "Non-UTF-8 file name skipped");
                continue;
            }
            l_entries.push(entry.path());
        }
        l_entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let children = l_entries
            .iter()
            .map(|p| self.load_normalized(p))
            .collect::<io::Result<Vec<_>>>()?;
        Ok(Node::Directory(SpecDirNode {
            path: path.to_path_buf(),
            name,
            encoding,
            children,
        }))
    }
}

impl TreeStore for StoreDisk {
    fn load_node(&self, path: &Path) -> io::Result<Node> {
        self.load_normalized(&normalize_path(path))
    }

    fn canonical_path(&self, path: &Path) -> PathBuf {
        normalize_path(path)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn find_child_file(&self, dir_target: &Path, name: &str) -> Option<PathBuf> {
        validate_entry_name(name).ok()?;
        let path = dir_target.join(name);
        let meta = fs::symlink_metadata(&path).ok()?;
        meta.is_file().then(|| normalize_path(&path))
    }

    fn find_subdirectory(&self, dir_target: &Path, name: &str) -> Option<PathBuf> {
        validate_entry_name(name).ok()?;
        let path = dir_target.join(name);
        let meta = fs::symlink_metadata(&path).ok()?;
        meta.is_dir().then(|| normalize_path(&path))
    }

    fn create_subdirectory(&mut self, dir_target: &Path, name: &str) -> io::Result<PathBuf> {
        validate_entry_name(name)?;
        let path = dir_target.join(name);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let meta = fs::symlink_metadata(&path)?;
                if !meta.is_dir() {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
        Ok(normalize_path(&path))
    }

    fn copy_file_into(
        &mut self,
        dir_target: &Path,
        name: &str,
        file_src: &SpecFileNode,
    ) -> io::Result<PathBuf> {
        validate_entry_name(name)?;
        let path_file_dst = dir_target.join(name);
        match fs::symlink_metadata(&path_file_dst) {
            Ok(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Destination exists: {}", path_file_dst.display()),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        copy_file_with_metadata(&file_src.path, &path_file_dst)?;
        if file_src.encoding.is_some()
            && let Err(e) = write_encoding_xattr(&path_file_dst, file_src.encoding.as_deref())
        {
            warn!(path = %path_file_dst.display(), "Failed to carry encoding tag ({e})");
        }
        Ok(normalize_path(&path_file_dst))
    }

    fn delete(&mut self, path_file: &Path) -> io::Result<()> {
        fs::remove_file(path_file)
    }

    fn read_content(&self, path_file: &Path) -> io::Result<Vec<u8>> {
        fs::read(path_file)
    }

    fn read_encoding(&self, path: &Path) -> Option<String> {
        read_encoding_xattr(path)
    }

    fn write_encoding(&mut self, path: &Path, encoding: Option<&str>) -> io::Result<()> {
        write_encoding_xattr(path, encoding)
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use super::StoreDisk;
    use crate::node::Node;
    use crate::spec::{CopyBatchError, EnumCopyPatternMode, EnumFileKind, SpecStoreOptions};
    use crate::store::TreeStore;

    fn write_bytes(path: &Path, raw: &[u8]) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, raw).expect("write bytes");
    }

    #[test]
    fn load_node_classifies_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        write_bytes(&src.join("Main.java"), b"class Main {}");
        write_bytes(&src.join("Main.class"), b"\xca\xfe\xba\xbe");
        write_bytes(&src.join("logo.png"), &[0x89, b'P', b'N', b'G', 0, 0]);

        let store = StoreDisk::new(SpecStoreOptions::default()).expect("store");
        let Node::Directory(d) = store.load_node(&src).expect("load") else {
            panic!("expected directory");
        };

        let kinds: Vec<(&str, EnumFileKind)> = d
            .children
            .iter()
            .map(|c| match c {
                Node::File(f) => (f.name.as_str(), f.kind),
                Node::Directory(_) => panic!("unexpected directory"),
            })
            .collect();
        assert_eq!(
            kinds,
            [
                ("Main.class", EnumFileKind::Compiled),
                ("Main.java", EnumFileKind::Text),
                ("logo.png", EnumFileKind::Binary),
            ]
        );
    }

    #[test]
    fn binary_patterns_apply_without_sniffing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("notes.dat");
        write_bytes(&path_file, b"looks like text");

        let store = StoreDisk::new(SpecStoreOptions {
            patterns_binary: Some(vec![r"\.dat$".to_string()]),
            patterns_compiled: None,
            rule_pattern: EnumCopyPatternMode::Regex,
            if_sniff_binary: false,
        })
        .expect("store");
        let Node::File(f) = store.load_node(&path_file).expect("load") else {
            panic!("expected file");
        };
        assert_eq!(f.kind, EnumFileKind::Binary);
    }

    #[test]
    fn invalid_pattern_rejected_at_construction() {
        let err = StoreDisk::new(SpecStoreOptions {
            patterns_compiled: Some(vec!["[".to_string()]),
            ..SpecStoreOptions::default()
        })
        .expect_err("invalid glob");
        assert!(matches!(err, CopyBatchError::InvalidPattern(_)));
    }

    #[test]
    fn create_subdirectory_reuses_existing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut store = StoreDisk::new(SpecStoreOptions::default()).expect("store");

        let first = store.create_subdirectory(tmp.path(), "sub").expect("create");
        write_bytes(&first.join("keep.txt"), b"keep");
        let second = store.create_subdirectory(tmp.path(), "sub").expect("reuse");

        assert_eq!(first, second);
        assert!(second.join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn load_node_skips_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        write_bytes(&src.join("a.txt"), b"a");
        symlink(src.join("a.txt"), src.join("link.txt")).expect("symlink");

        let store = StoreDisk::new(SpecStoreOptions::default()).expect("store");
        let Node::Directory(d) = store.load_node(&src).expect("load") else {
            panic!("expected directory");
        };
        let names: Vec<&str> = d.children.iter().map(Node::name).collect();
        assert_eq!(names, ["a.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn load_node_refuses_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let name_raw = OsStr::from_bytes(b"caf\xe9.txt");
        write_bytes(&src.join(name_raw), b"latin-1 name");
        write_bytes(&src.join("ok.txt"), b"ok");

        let store = StoreDisk::new(SpecStoreOptions::default()).expect("store");
        let Node::Directory(d) = store.load_node(&src).expect("load") else {
            panic!("expected directory");
        };
        let names: Vec<&str> = d.children.iter().map(Node::name).collect();
        assert_eq!(names, ["ok.txt"]);

        let err = store
            .load_node(&src.join(name_raw))
            .expect_err("non-UTF-8 item");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
