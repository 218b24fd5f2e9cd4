use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{CopyBatchError, EnumCopyPatternMode};

/// Extended attribute holding the charset tag of a file or directory.
pub(crate) const C_XATTR_ENCODING: &str = "user.charset";

const N_BYTES_SNIFF: usize = 8000;

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeCopyPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeCopyPatternSeq {
    pub(crate) fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p)),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

pub(crate) fn compile_patterns(
    patterns: Option<&[String]>,
    rule_pattern: EnumCopyPatternMode,
) -> Result<Option<TypeCopyPatternSeq>, CopyBatchError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumCopyPatternMode::Literal => Ok(Some(TypeCopyPatternSeq::Literal(patterns.to_vec()))),
        EnumCopyPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| CopyBatchError::InvalidPattern(format!("`{pattern}`: {e}")))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeCopyPatternSeq::Glob(l_glob)))
        }
        EnumCopyPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern)
                    .map_err(|e| CopyBatchError::InvalidPattern(format!("`{pattern}`: {e}")))?;
                l_regex.push(regex);
            }
            Ok(Some(TypeCopyPatternSeq::Regex(l_regex)))
        }
    }
}

pub(crate) fn is_pattern_matching(value: &str, patterns: Option<&TypeCopyPatternSeq>) -> bool {
    patterns.is_some_and(|p| p.is_match(value))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Resolve symlinks when the path exists, otherwise absolutize it lexically.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    normalize_path_lexically(&absolutize_path(path))
}

fn absolutize_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

/// Drop `.` components and fold `..` without touching the filesystem.
pub(crate) fn normalize_path_lexically(path: &Path) -> PathBuf {
    let mut path_out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let b_can_pop = matches!(
                    path_out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if b_can_pop {
                    path_out.pop();
                } else if !path_out.has_root() {
                    path_out.push(component.as_os_str());
                }
            }
            other => path_out.push(other.as_os_str()),
        }
    }
    path_out
}

/// A child name must address exactly one entry below its directory.
pub(crate) fn validate_entry_name(name: &str) -> Result<(), io::Error> {
    let b_is_invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.chars().any(std::path::is_separator)
        || name.contains('\0');
    if b_is_invalid {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid entry name: `{name}`"),
        ));
    }
    Ok(())
}

pub(crate) fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FileContent

/// `true` if the head of the file contains a NUL byte.
pub(crate) fn sniff_binary(path_file: &Path) -> Result<bool, io::Error> {
    let mut file = fs::File::open(path_file)?;
    let mut buf_head = vec![0_u8; N_BYTES_SNIFF];
    let mut n_read = 0;
    while n_read < buf_head.len() {
        let n = file.read(&mut buf_head[n_read..])?;
        if n == 0 {
            break;
        }
        n_read += n;
    }
    Ok(buf_head[..n_read].contains(&0))
}

pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<(), io::Error> {
    fs::copy(path_file_src, path_file_dst)?;
    #[cfg(target_os = "linux")]
    {
        apply_metadata_linux(path_file_src, path_file_dst)?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply_metadata_linux(path_file_src: &Path, path_file_dst: &Path) -> Result<(), io::Error> {
    use filetime::{FileTime, set_file_times};

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(&stat_src);
    let file_time_modify = FileTime::from_last_modification_time(&stat_src);
    set_file_times(path_file_dst, file_time_access, file_time_modify)?;

    copy_xattrs_linux(path_file_src, path_file_dst);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_file_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        let _ = xattr::set(path_file_dst, &name, &raw_value);
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Encoding

#[cfg(target_os = "linux")]
pub(crate) fn read_encoding_xattr(path: &Path) -> Option<String> {
    let raw_value = xattr::get(path, C_XATTR_ENCODING).ok().flatten()?;
    String::from_utf8(raw_value).ok()
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn read_encoding_xattr(_path: &Path) -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
pub(crate) fn write_encoding_xattr(path: &Path, encoding: Option<&str>) -> Result<(), io::Error> {
    match encoding {
        Some(v) => xattr::set(path, C_XATTR_ENCODING, v.as_bytes()),
        None if read_encoding_xattr(path).is_none() => Ok(()),
        None => xattr::remove(path, C_XATTR_ENCODING),
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn write_encoding_xattr(_path: &Path, encoding: Option<&str>) -> Result<(), io::Error> {
    match encoding {
        None => Ok(()),
        Some(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Encoding tags are unsupported on this platform",
        )),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
