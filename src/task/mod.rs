//! The host-facing task lifecycle: `SourceTask` and the machinery that
//! wires the rest of the crate together at `start` time.

pub mod factory;
pub mod state;

pub use factory::{ContextOffsetFn, TaskManagerFactory};
pub use state::{SourceTask, StateError};
