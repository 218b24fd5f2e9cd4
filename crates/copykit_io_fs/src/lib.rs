//! `copykit_io_fs` v1:
//! Recursive file/directory copy engine with merge and sticky conflict decisions.
//!
//! Modules:
//! - `copy`        : batch orchestration, clone and default-target helpers
//! - `decision`    : conflict decision providers and the sticky protocol
//! - `eligibility` : preconditions on a selection
//! - `node`        : file/directory snapshots
//! - `store`       : storage seam, with disk and in-memory backends
//! - `spec`        : enums/options/errors
//! - `report`      : run-time report model
//! - `util`        : shared helper functions

pub mod copy;
pub mod decision;
pub mod eligibility;
pub mod node;
pub mod report;
pub mod spec;
pub mod store;
mod store_disk;
mod store_memory;
mod util;

pub use copy::{OutcomeSink, clone_item, copy_as_files, copy_batch, copy_to_directory};
pub use decision::{DecisionFixed, DecisionProvider, format_conflict_message};
pub use eligibility::{
    EnumIneligibleReason, check_copyable, check_copyable_in, find_ineligible, find_ineligible_in,
};
pub use node::{Node, SpecDirNode, SpecFileNode, common_parent_directory};
pub use report::{ReportCopy, ReportCopyBuilder};
pub use spec::{
    CopyBatchError, EnumConflictDecision, EnumCopyPatternMode, EnumFileKind, SpecStoreOptions,
};
pub use store::{TreeStore, load_nodes};
pub use store_disk::StoreDisk;
pub use store_memory::StoreMemory;
