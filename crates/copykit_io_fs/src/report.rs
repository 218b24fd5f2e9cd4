//! Copy report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::node::SpecFileNode;
use crate::spec::EnumFileKind;

/// Outcome of one batch.
#[derive(Debug, Default, Clone)]
pub struct ReportCopy {
    /// First file materialized in depth-first order, if any.
    pub file_first: Option<SpecFileNode>,
    /// Files written into the destination.
    pub cnt_copied: u64,
    /// Destination directories created.
    pub cnt_dirs_created: u64,
    /// Destination directories reused (merge).
    pub cnt_dirs_merged: u64,
    /// Files replaced after an overwrite decision.
    pub cnt_overwritten: u64,
    /// Files left alone after a skip decision.
    pub cnt_skipped: u64,
    /// Files that already were their own copy.
    pub cnt_unchanged: u64,
    /// Questions asked to the decision provider.
    pub cnt_prompted: u64,
    /// Non-fatal warnings collected during the batch.
    pub warnings: Vec<String>,
}

impl ReportCopy {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// First produced file, unless it is binary.
    pub fn file_to_open(&self) -> Option<&SpecFileNode> {
        self.file_first
            .as_ref()
            .filter(|f| f.kind == EnumFileKind::Text)
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_dirs_merged".to_string(), self.cnt_dirs_merged);
        dict_counts.insert("cnt_overwritten".to_string(), self.cnt_overwritten);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_unchanged".to_string(), self.cnt_unchanged);
        dict_counts.insert("cnt_prompted".to_string(), self.cnt_prompted);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} copied={} dirs_created={} dirs_merged={} overwritten={} skipped={} unchanged={} prompted={} warnings={}",
            self.cnt_copied,
            self.cnt_dirs_created,
            self.cnt_dirs_merged,
            self.cnt_overwritten,
            self.cnt_skipped,
            self.cnt_unchanged,
            self.cnt_prompted,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COPY]"))
    }
}

/// Mutable accumulator threaded through one batch.
#[derive(Debug, Default, Clone)]
pub struct ReportCopyBuilder {
    pub file_first: Option<SpecFileNode>,
    pub cnt_copied: u64,
    pub cnt_dirs_created: u64,
    pub cnt_dirs_merged: u64,
    pub cnt_overwritten: u64,
    pub cnt_skipped: u64,
    pub cnt_unchanged: u64,
    pub cnt_prompted: u64,
    pub warnings: Vec<String>,
}

impl ReportCopyBuilder {
    /// Increment one or more named counters by `value`.
    ///
    /// Unknown names are ignored.
    pub fn add_counts(&mut self, field_names: &[&str], value: u64) {
        for field_name in field_names {
            match *field_name {
                "cnt_copied" => self.cnt_copied += value,
                "cnt_dirs_created" => self.cnt_dirs_created += value,
                "cnt_dirs_merged" => self.cnt_dirs_merged += value,
                "cnt_overwritten" => self.cnt_overwritten += value,
                "cnt_skipped" => self.cnt_skipped += value,
                "cnt_unchanged" => self.cnt_unchanged += value,
                "cnt_prompted" => self.cnt_prompted += value,
                _ => {}
            }
        }
    }

    /// Record a produced file; only the first one is kept.
    pub fn offer_file(&mut self, file: Option<&SpecFileNode>) {
        if self.file_first.is_none()
            && let Some(file) = file
        {
            self.file_first = Some(file.clone());
        }
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportCopy {
        ReportCopy {
            file_first: self.file_first,
            cnt_copied: self.cnt_copied,
            cnt_dirs_created: self.cnt_dirs_created,
            cnt_dirs_merged: self.cnt_dirs_merged,
            cnt_overwritten: self.cnt_overwritten,
            cnt_skipped: self.cnt_skipped,
            cnt_unchanged: self.cnt_unchanged,
            cnt_prompted: self.cnt_prompted,
            warnings: self.warnings,
        }
    }
}
