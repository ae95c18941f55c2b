//! Directory discovery: the paginated, resumable partition lister and the
//! multi-root searcher built on top of it.

pub mod lister;
pub mod searcher;

pub use lister::DirectoryLister;
pub use searcher::PartitionSearcher;
