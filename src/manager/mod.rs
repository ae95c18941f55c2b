//! Per-partition reading: the [`ReaderManager`] state machine and the
//! [`ReaderManagerService`] registry that keeps one alive per partition.

pub mod reader_manager;
pub mod service;

pub use reader_manager::{FormatKind, ManagerPollOutcome, ReaderManager};
pub use service::{ManagerFactory, ReaderManagerService};
