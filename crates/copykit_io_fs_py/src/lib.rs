use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use copykit_io_fs::{
    CopyBatchError, DecisionProvider, EnumConflictDecision, EnumCopyPatternMode, Node,
    ReportCopy, SpecStoreOptions, StoreDisk, TreeStore, check_copyable_in, clone_item,
    copy_as_files, find_ineligible,
};
use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "copykit.fs.copy_paths.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

#[pyclass(name = "ReportCopy")]
#[derive(Debug, Clone)]
struct PyReportCopy {
    #[pyo3(get)]
    file_first: Option<String>,
    #[pyo3(get)]
    file_to_open: Option<String>,
    #[pyo3(get)]
    cnt_copied: u64,
    #[pyo3(get)]
    cnt_dirs_created: u64,
    #[pyo3(get)]
    cnt_dirs_merged: u64,
    #[pyo3(get)]
    cnt_overwritten: u64,
    #[pyo3(get)]
    cnt_skipped: u64,
    #[pyo3(get)]
    cnt_unchanged: u64,
    #[pyo3(get)]
    cnt_prompted: u64,
    #[pyo3(get)]
    warnings: Vec<String>,
    dict_counts: BTreeMap<String, u64>,
    txt_summary: String,
}

impl From<ReportCopy> for PyReportCopy {
    fn from(report_copy: ReportCopy) -> Self {
        let file_to_open = report_copy
            .file_to_open()
            .map(|f| f.path.to_string_lossy().to_string());
        Self {
            file_first: report_copy
                .file_first
                .as_ref()
                .map(|f| f.path.to_string_lossy().to_string()),
            file_to_open,
            cnt_copied: report_copy.cnt_copied,
            cnt_dirs_created: report_copy.cnt_dirs_created,
            cnt_dirs_merged: report_copy.cnt_dirs_merged,
            cnt_overwritten: report_copy.cnt_overwritten,
            cnt_skipped: report_copy.cnt_skipped,
            cnt_unchanged: report_copy.cnt_unchanged,
            cnt_prompted: report_copy.cnt_prompted,
            dict_counts: report_copy.to_dict(),
            txt_summary: report_copy.format(""),
            warnings: report_copy.warnings,
        }
    }
}

#[pymethods]
impl PyReportCopy {
    #[getter]
    fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    fn to_dict(&self) -> BTreeMap<String, u64> {
        self.dict_counts.clone()
    }

    #[pyo3(signature = (prefix = "[COPY]"))]
    fn format(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.txt_summary)
    }

    fn __str__(&self) -> String {
        self.format("[COPY]")
    }
}

/// Conflict answers from a Python callable, or a fixed fallback.
struct DecisionPy {
    callback: Option<PyObject>,
    decision_fallback: EnumConflictDecision,
    /// Exception raised by `callback`, re-raised once the batch returns.
    err_callback: Option<PyErr>,
}

impl DecisionProvider for DecisionPy {
    fn ask(
        &mut self,
        name_existing: &str,
        dir_target: &Path,
        if_allow_all: bool,
    ) -> Result<EnumConflictDecision, CopyBatchError> {
        let Some(callback) = self.callback.as_ref() else {
            return Ok(self.decision_fallback);
        };
        let answer = Python::with_gil(|py| {
            let value = callback
                .call1(
                    py,
                    (
                        name_existing,
                        dir_target.to_string_lossy().to_string(),
                        if_allow_all,
                    ),
                )?
                .extract::<String>(py)?;
            parse_decision(&value)
        });
        answer.map_err(|err| {
            let message = err.to_string();
            self.err_callback = Some(err);
            CopyBatchError::Cancelled(message)
        })
    }
}

fn parse_rule_pattern(value: &str) -> PyResult<EnumCopyPatternMode> {
    match value {
        "glob" => Ok(EnumCopyPatternMode::Glob),
        "regex" => Ok(EnumCopyPatternMode::Regex),
        "literal" => Ok(EnumCopyPatternMode::Literal),
        _ => Err(PyValueError::new_err(format!(
            "Invalid pattern strategy: `{value}`. Expected one of: ['glob', 'regex', 'literal']"
        ))),
    }
}

fn parse_decision(value: &str) -> PyResult<EnumConflictDecision> {
    match value {
        "overwrite" => Ok(EnumConflictDecision::OverwriteOnce),
        "skip" => Ok(EnumConflictDecision::SkipOnce),
        "overwrite_all" => Ok(EnumConflictDecision::OverwriteAll),
        "skip_all" => Ok(EnumConflictDecision::SkipAll),
        _ => Err(PyValueError::new_err(format!(
            "Invalid conflict decision: `{value}`. Expected one of: ['overwrite', 'skip', 'overwrite_all', 'skip_all']"
        ))),
    }
}

fn parse_rule_conflict(value: &str) -> PyResult<EnumConflictDecision> {
    match value {
        "overwrite" | "skip" => parse_decision(value),
        _ => Err(PyValueError::new_err(format!(
            "Invalid file conflict strategy: `{value}`. Expected one of: ['overwrite', 'skip']"
        ))),
    }
}

fn build_store(
    patterns_compiled: Option<Vec<String>>,
    patterns_binary: Option<Vec<String>>,
    rule_pattern: &str,
    if_sniff_binary: bool,
) -> PyResult<StoreDisk> {
    let spec_store_options = SpecStoreOptions {
        patterns_compiled: patterns_compiled.or(SpecStoreOptions::default().patterns_compiled),
        patterns_binary,
        rule_pattern: parse_rule_pattern(rule_pattern)?,
        if_sniff_binary,
    };
    StoreDisk::new(spec_store_options).map_err(|e| PyValueError::new_err(e.to_string()))
}

fn build_decider(decide: Option<PyObject>, rule_conflict: &str) -> PyResult<DecisionPy> {
    Ok(DecisionPy {
        callback: decide,
        decision_fallback: parse_rule_conflict(rule_conflict)?,
        err_callback: None,
    })
}

fn load_items(store: &StoreDisk, paths: &[String]) -> Result<Vec<Node>, CopyBatchError> {
    paths
        .iter()
        .map(|p| {
            store
                .load_node(Path::new(p))
                .map_err(|source| CopyBatchError::IoFailure {
                    path: PathBuf::from(p),
                    source,
                })
        })
        .collect()
}

fn map_copy_batch_error(exception: CopyBatchError, decider: &mut DecisionPy) -> PyErr {
    match &exception {
        CopyBatchError::Cancelled(message) => decider
            .err_callback
            .take()
            .unwrap_or_else(|| PyRuntimeError::new_err(format!("Copy cancelled: {message}"))),
        CopyBatchError::IoFailure { .. } => PyOSError::new_err(exception.to_string()),
        CopyBatchError::InvalidArgument(_)
        | CopyBatchError::SelfContainment { .. }
        | CopyBatchError::InvalidPattern(_) => PyValueError::new_err(exception.to_string()),
    }
}

#[pyfunction(name = "copy_paths")]
#[pyo3(signature = (
    paths_source,
    dir_target = None,
    name_new = None,
    decide = None,
    rule_conflict = "skip",
    patterns_compiled = None,
    patterns_binary = None,
    rule_pattern = "glob",
    if_sniff_binary = true
))]
#[allow(clippy::too_many_arguments)]
fn copy_paths_py(
    py: Python<'_>,
    paths_source: Vec<String>,
    dir_target: Option<String>,
    name_new: Option<String>,
    decide: Option<PyObject>,
    rule_conflict: &str,
    patterns_compiled: Option<Vec<String>>,
    patterns_binary: Option<Vec<String>>,
    rule_pattern: &str,
    if_sniff_binary: bool,
) -> PyResult<PyReportCopy> {
    let mut store = build_store(patterns_compiled, patterns_binary, rule_pattern, if_sniff_binary)?;
    let mut decider = build_decider(decide, rule_conflict)?;

    let report_copy = py.allow_threads(|| {
        let items = load_items(&store, &paths_source)?;
        copy_as_files(
            &mut store,
            &items,
            dir_target.as_deref().map(Path::new),
            name_new.as_deref(),
            &mut decider,
            None,
        )
    });
    let report_copy = report_copy.map_err(|e| map_copy_batch_error(e, &mut decider))?;
    Ok(PyReportCopy::from(report_copy))
}

#[pyfunction(name = "clone_path")]
#[pyo3(signature = (
    path_source,
    name_new,
    decide = None,
    rule_conflict = "skip",
    patterns_compiled = None,
    patterns_binary = None,
    rule_pattern = "glob",
    if_sniff_binary = true
))]
#[allow(clippy::too_many_arguments)]
fn clone_path_py(
    py: Python<'_>,
    path_source: String,
    name_new: String,
    decide: Option<PyObject>,
    rule_conflict: &str,
    patterns_compiled: Option<Vec<String>>,
    patterns_binary: Option<Vec<String>>,
    rule_pattern: &str,
    if_sniff_binary: bool,
) -> PyResult<PyReportCopy> {
    let mut store = build_store(patterns_compiled, patterns_binary, rule_pattern, if_sniff_binary)?;
    let mut decider = build_decider(decide, rule_conflict)?;

    let report_copy = py.allow_threads(|| {
        let items = load_items(&store, std::slice::from_ref(&path_source))?;
        if let Some(reason) = find_ineligible(&items) {
            return Err(CopyBatchError::InvalidArgument(reason.to_string()));
        }
        let [item] = items.as_slice() else {
            return Err(CopyBatchError::InvalidArgument(format!(
                "Expected one item to clone: {path_source}"
            )));
        };
        clone_item(&mut store, item, &name_new, &mut decider)
    });
    let report_copy = report_copy.map_err(|e| map_copy_batch_error(e, &mut decider))?;
    Ok(PyReportCopy::from(report_copy))
}

#[pyfunction(name = "check_copyable")]
#[pyo3(signature = (
    paths_source,
    patterns_compiled = None,
    patterns_binary = None,
    rule_pattern = "glob",
    if_sniff_binary = true
))]
fn check_copyable_py(
    py: Python<'_>,
    paths_source: Vec<String>,
    patterns_compiled: Option<Vec<String>>,
    patterns_binary: Option<Vec<String>>,
    rule_pattern: &str,
    if_sniff_binary: bool,
) -> PyResult<bool> {
    let store = build_store(patterns_compiled, patterns_binary, rule_pattern, if_sniff_binary)?;
    Ok(py.allow_threads(|| match load_items(&store, &paths_source) {
        Ok(items) => check_copyable_in(&store, &items),
        Err(_) => false,
    }))
}

#[pymodule]
fn _copykit_io_fs_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyReportCopy>()?;
    module.add_function(wrap_pyfunction!(copy_paths_py, module)?)?;
    module.add_function(wrap_pyfunction!(clone_path_py, module)?)?;
    module.add_function(wrap_pyfunction!(check_copyable_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
