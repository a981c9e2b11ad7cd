//! `blob-sort` is a memory-bounded parallel external sort for flat binary files
//! of 32-bit unsigned values.
//!
//! The input file is treated as a contiguous sequence of little-endian `u32`
//! values and may be far larger than the available RAM. Sorting works by
//! recursively halving the file into ranges small enough to sort in memory,
//! sorting those leaves on a worker thread pool, and streaming pairs of sorted
//! runs back together with a two-way merge. For more information see
//! [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Bounded memory:**
//!   all in-memory sorting happens inside a fixed pool of equally sized
//!   buffers; leaf tasks block until a buffer is free, so total buffer memory
//!   never exceeds the configured ceiling.
//! * **Fork-join parallelism:**
//!   range halves are executed concurrently on a work-stealing thread pool,
//!   so live thread count stays bounded no matter how deep the recursion goes.
//! * **Streaming merges:**
//!   sorted runs are recombined with buffered sequential I/O; no merge ever
//!   materializes a run fully in memory.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use blob_sort::{BlobSorterBuilder, SortError};
//!
//! fn main() -> Result<(), SortError> {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let sorter = BlobSorterBuilder::new()
//!         .with_memory_limit(64 * 1024 * 1024)
//!         .build()?;
//!
//!     sorter.sort(Path::new("input.blob"), Path::new("output.blob"))
//! }
//! ```

pub mod buffer;
pub mod chunk;
pub mod merger;
pub mod scratch;
pub mod sort;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer::{BufferLease, BufferPool, PoolConfig};
pub use merger::merge_runs;
pub use scratch::ScratchDir;
pub use sort::{sort_blob32, BlobSorter, BlobSorterBuilder, SortError, DEFAULT_MEMORY_LIMIT};
