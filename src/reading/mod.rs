//! Per-object record decoding: the [`FormatStreamReader`] capability and the
//! [`ResultReader`] that layers routing metadata on top of it.

pub mod format_reader;
pub mod result_reader;

pub use format_reader::{DecodedRecord, FormatStreamReader, LineFormatReader};
pub use result_reader::{ResultReader, RetrievedBatch};
