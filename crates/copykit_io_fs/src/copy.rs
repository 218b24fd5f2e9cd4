//! Depth-first copy orchestration for selected files and directories.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::decision::{DecisionProvider, resolve_conflict};
use crate::eligibility::find_ineligible_in;
use crate::node::{Node, SpecDirNode, SpecFileNode, common_parent_directory, is_strict_ancestor};
use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{CopyBatchError, EnumConflictDecision};
use crate::store::TreeStore;
use crate::util::validate_entry_name;

/// Receives the first file produced by a finished batch.
pub trait OutcomeSink {
    /// `if_open_in_editor` is `false` for binary files.
    fn accept(&mut self, file_first: &SpecFileNode, if_open_in_editor: bool);
}

impl<F> OutcomeSink for F
where
    F: FnMut(&SpecFileNode, bool),
{
    fn accept(&mut self, file_first: &SpecFileNode, if_open_in_editor: bool) {
        self(file_first, if_open_in_editor)
    }
}

struct SpecCopyContext<'a, S: TreeStore + ?Sized> {
    store: &'a mut S,
    decider: &'a mut dyn DecisionProvider,
    /// Sticky decision slot; `None` when the batch is one lone file.
    choice: Option<EnumConflictDecision>,
    builder_cp_report: ReportCopyBuilder,
}

/// Copy `items` into `dir_target` as one batch.
///
/// This function performs:
/// 1. Argument validation (`name_new` only for a single item, target must
///    be a directory).
/// 2. Self-containment check of every directory item against the target,
///    before anything is written.
/// 3. Depth-first copy of each item, merging into existing directories and
///    asking `decider` about colliding files.
///
/// A collision answered "for all" is applied to every later collision of the
/// same call. The first error aborts the rest of the batch; whatever was
/// copied before it stays in place.
pub fn copy_batch<S>(
    store: &mut S,
    items: &[Node],
    name_new: Option<&str>,
    dir_target: &Path,
    decider: &mut dyn DecisionProvider,
) -> Result<ReportCopy, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    let Some(item_head) = items.first() else {
        return Err(CopyBatchError::InvalidArgument(
            "No items to copy.".to_string(),
        ));
    };
    if let Some(name) = name_new {
        if items.len() != 1 {
            return Err(CopyBatchError::InvalidArgument(format!(
                "A new name can only be given for a single item; got {} items.",
                items.len()
            )));
        }
        validate_entry_name(name).map_err(|e| CopyBatchError::InvalidArgument(e.to_string()))?;
    }

    let path_dir_target = store.canonical_path(dir_target);
    if !store.is_directory(&path_dir_target) {
        return Err(CopyBatchError::InvalidArgument(format!(
            "Target is not a directory: {}",
            path_dir_target.display()
        )));
    }
    for item in items.iter().filter(|item| item.is_directory()) {
        let path_dir_item = store.canonical_path(item.path());
        if is_strict_ancestor(&path_dir_item, &path_dir_target) {
            return Err(CopyBatchError::SelfContainment {
                directory: path_dir_item,
                destination: path_dir_target,
            });
        }
    }

    let b_if_thread_choice = items.len() > 1 || item_head.is_directory();
    let mut spec_cp_ctx = SpecCopyContext {
        store,
        decider,
        choice: b_if_thread_choice.then_some(EnumConflictDecision::Unset),
        builder_cp_report: ReportCopyBuilder::default(),
    };

    info!(
        n_items = items.len(),
        dir_target = %path_dir_target.display(),
        "Copying batch"
    );
    for item in items {
        let file = copy_node(&mut spec_cp_ctx, item, name_new, &path_dir_target)?;
        spec_cp_ctx.builder_cp_report.offer_file(file.as_ref());
    }

    let report = spec_cp_ctx.builder_cp_report.build();
    info!(dir_target = %path_dir_target.display(), "{report}");
    Ok(report)
}

/// Copy one item, recursively, without a batch-wide sticky decision.
///
/// Collisions are asked with only overwrite/skip offered.
pub fn copy_to_directory<S>(
    store: &mut S,
    item: &Node,
    name_new: Option<&str>,
    dir_target: &Path,
    decider: &mut dyn DecisionProvider,
) -> Result<Option<SpecFileNode>, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    let path_dir_target = store.canonical_path(dir_target);
    let mut spec_cp_ctx = SpecCopyContext {
        store,
        decider,
        choice: None,
        builder_cp_report: ReportCopyBuilder::default(),
    };
    copy_node(&mut spec_cp_ctx, item, name_new, &path_dir_target)
}

/// Duplicate `item` next to itself under `name_new`.
pub fn clone_item<S>(
    store: &mut S,
    item: &Node,
    name_new: &str,
    decider: &mut dyn DecisionProvider,
) -> Result<ReportCopy, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    let path_item = store.canonical_path(item.path());
    let Some(path_dir_parent) = path_item.parent() else {
        return Err(CopyBatchError::InvalidArgument(format!(
            "Cannot clone root item: {}",
            path_item.display()
        )));
    };
    if name_new == item.name() {
        return Err(CopyBatchError::InvalidArgument(format!(
            "Clone of `{name_new}` needs a different name."
        )));
    }
    copy_batch(
        store,
        std::slice::from_ref(item),
        Some(name_new),
        path_dir_parent,
        decider,
    )
}

/// Check, resolve the target, copy, then hand the first file to `sink`.
///
/// Without `dir_target` the outermost parent directory of the selection is
/// used.
pub fn copy_as_files<S>(
    store: &mut S,
    items: &[Node],
    dir_target: Option<&Path>,
    name_new: Option<&str>,
    decider: &mut dyn DecisionProvider,
    sink: Option<&mut dyn OutcomeSink>,
) -> Result<ReportCopy, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    if let Some(reason) = find_ineligible_in(store, items) {
        return Err(CopyBatchError::InvalidArgument(reason.to_string()));
    }
    let path_dir_target: PathBuf = match dir_target {
        Some(path) => path.to_path_buf(),
        None => common_parent_directory(items).ok_or_else(|| {
            CopyBatchError::InvalidArgument("No target directory could be derived.".to_string())
        })?,
    };

    let report = copy_batch(store, items, name_new, &path_dir_target, decider)?;
    if let Some(sink) = sink
        && let Some(file_first) = report.file_first.as_ref()
    {
        sink.accept(file_first, report.file_to_open().is_some());
    }
    Ok(report)
}

fn copy_node<S>(
    spec_cp_ctx: &mut SpecCopyContext<'_, S>,
    node: &Node,
    name_new: Option<&str>,
    dir_target: &Path,
) -> Result<Option<SpecFileNode>, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    match node {
        Node::File(file_src) => copy_file_node(spec_cp_ctx, file_src, name_new, dir_target),
        Node::Directory(dir_src) => copy_dir_node(spec_cp_ctx, dir_src, name_new, dir_target),
    }
}

fn copy_file_node<S>(
    spec_cp_ctx: &mut SpecCopyContext<'_, S>,
    file_src: &SpecFileNode,
    name_new: Option<&str>,
    dir_target: &Path,
) -> Result<Option<SpecFileNode>, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    let name = name_new.unwrap_or(&file_src.name);

    if let Some(path_existing) = spec_cp_ctx.store.find_child_file(dir_target, name) {
        if path_existing == spec_cp_ctx.store.canonical_path(&file_src.path) {
            debug!(path = %path_existing.display(), "File is its own copy");
            spec_cp_ctx
                .builder_cp_report
                .add_counts(&["cnt_unchanged"], 1);
            return Ok(Some(file_src.clone()));
        }

        let (b_overwrite, b_prompted) = resolve_conflict(
            &mut *spec_cp_ctx.decider,
            spec_cp_ctx.choice.as_mut(),
            name,
            dir_target,
        )?;
        if b_prompted {
            spec_cp_ctx.builder_cp_report.add_counts(&["cnt_prompted"], 1);
        }
        if !b_overwrite {
            debug!(path = %path_existing.display(), "Existing file kept");
            spec_cp_ctx.builder_cp_report.add_counts(&["cnt_skipped"], 1);
            return Ok(None);
        }

        spec_cp_ctx
            .store
            .delete(&path_existing)
            .map_err(|e| CopyBatchError::io(&path_existing, e))?;
        spec_cp_ctx
            .builder_cp_report
            .add_counts(&["cnt_overwritten"], 1);
    }

    let path_file_new = spec_cp_ctx
        .store
        .copy_file_into(dir_target, name, file_src)
        .map_err(|e| CopyBatchError::io(dir_target.join(name), e))?;
    spec_cp_ctx.builder_cp_report.add_counts(&["cnt_copied"], 1);
    debug!(
        src = %file_src.path.display(),
        dst = %path_file_new.display(),
        "File copied"
    );

    Ok(Some(SpecFileNode {
        path: path_file_new,
        name: name.to_string(),
        kind: file_src.kind,
        encoding: file_src.encoding.clone(),
    }))
}

fn copy_dir_node<S>(
    spec_cp_ctx: &mut SpecCopyContext<'_, S>,
    dir_src: &SpecDirNode,
    name_new: Option<&str>,
    dir_target: &Path,
) -> Result<Option<SpecFileNode>, CopyBatchError>
where
    S: TreeStore + ?Sized,
{
    if spec_cp_ctx.store.canonical_path(&dir_src.path).as_path() == dir_target {
        debug!(path = %dir_target.display(), "Directory is its own target");
        return Ok(None);
    }

    let name = name_new.unwrap_or(&dir_src.name);
    let path_dir_sub = match spec_cp_ctx.store.find_subdirectory(dir_target, name) {
        Some(path_existing) => {
            debug!(path = %path_existing.display(), "Merging into existing directory");
            spec_cp_ctx
                .builder_cp_report
                .add_counts(&["cnt_dirs_merged"], 1);
            path_existing
        }
        None => {
            let path_created = spec_cp_ctx
                .store
                .create_subdirectory(dir_target, name)
                .map_err(|e| CopyBatchError::io(dir_target.join(name), e))?;
            spec_cp_ctx
                .builder_cp_report
                .add_counts(&["cnt_dirs_created"], 1);
            path_created
        }
    };
    carry_dir_encoding(spec_cp_ctx, dir_src, &path_dir_sub);

    let mut file_first = None;
    for child in &dir_src.children {
        let file = copy_node(spec_cp_ctx, child, None, &path_dir_sub)?;
        if file_first.is_none() {
            file_first = file;
        }
    }
    Ok(file_first)
}

fn carry_dir_encoding<S>(
    spec_cp_ctx: &mut SpecCopyContext<'_, S>,
    dir_src: &SpecDirNode,
    path_dir_dst: &Path,
) where
    S: TreeStore + ?Sized,
{
    let Some(encoding) = dir_src.encoding.as_deref() else {
        return;
    };
    if spec_cp_ctx.store.read_encoding(path_dir_dst).as_deref() == Some(encoding) {
        return;
    }
    if let Err(e) = spec_cp_ctx.store.write_encoding(path_dir_dst, Some(encoding)) {
        warn!(path = %path_dir_dst.display(), "Failed to carry directory encoding ({e})");
        spec_cp_ctx.builder_cp_report.add_warning(format!(
            "Failed to carry encoding `{encoding}` to {} ({e})",
            path_dir_dst.display()
        ));
    }
}
