//! External blob sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use crate::buffer::{BufferPool, PoolConfig};
use crate::chunk;
use crate::merger;
use crate::scratch::ScratchDir;

/// Default memory ceiling for buffer allocation (256 MiB).
pub const DEFAULT_MEMORY_LIMIT: u64 = 256 << 20;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Input file is not a flat sequence of 4-byte values.
    Config(String),
    /// Scratch directory creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPool(rayon::ThreadPoolBuildError),
    /// Common I/O error.
    Io(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::Config(_) => None,
            SortError::TempDir(err) => Some(err),
            SortError::ThreadPool(err) => Some(err),
            SortError::Io(err) => Some(err),
        }
    }
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(msg) => write!(f, "invalid input: {}", msg),
            SortError::TempDir(err) => write!(f, "scratch directory not created: {}", err),
            SortError::ThreadPool(err) => write!(f, "thread pool initialization failed: {}", err),
            SortError::Io(err) => write!(f, "I/O operation failed: {}", err),
        }
    }
}

/// Half-open byte range of the input assigned to one recursion node.
///
/// `size` is always a multiple of 4 so every task covers whole values.
#[derive(Debug, Clone, Copy)]
struct SortTask {
    offset: u64,
    size: u64,
}

impl SortTask {
    /// Splits the range into two halves on a value boundary.
    fn split(self) -> (SortTask, SortTask) {
        let left_size = self.size / 4 / 2 * 4;
        let left = SortTask {
            offset: self.offset,
            size: left_size,
        };
        let right = SortTask {
            offset: self.offset + left_size,
            size: self.size - left_size,
        };

        return (left, right);
    }
}

/// Blob sorter builder. Provides methods for [`BlobSorter`] initialization.
#[derive(Clone, Default)]
pub struct BlobSorterBuilder {
    /// Number of worker threads to run recursion tasks on.
    threads_number: Option<usize>,
    /// Directory the scratch directory is created under.
    tmp_dir: Option<Box<Path>>,
    /// Ceiling for the total memory held by the buffer pool.
    memory_limit: Option<u64>,
    /// Explicit pool sizing, overrides `memory_limit`.
    pool_config: Option<PoolConfig>,
}

impl BlobSorterBuilder {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        BlobSorterBuilder::default()
    }

    /// Builds a [`BlobSorter`] instance using provided configuration.
    ///
    /// The buffer pool is sized once here: unless an explicit [`PoolConfig`]
    /// was supplied, buffers are derived from the memory limit so that two
    /// exist per worker thread.
    pub fn build(self) -> Result<BlobSorter, SortError> {
        let threads_number = match self.threads_number {
            Some(threads_number) => threads_number,
            None => thread::available_parallelism().map(usize::from).unwrap_or(1),
        };

        let pool_config = self.pool_config.unwrap_or_else(|| {
            PoolConfig::for_memory_limit(
                self.memory_limit.unwrap_or(DEFAULT_MEMORY_LIMIT),
                threads_number,
            )
        });

        BlobSorter::new(threads_number, self.tmp_dir.as_deref(), pool_config)
    }

    /// Sets number of threads to be used to sort data in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> BlobSorterBuilder {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> BlobSorterBuilder {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets the memory ceiling for the buffer pool.
    pub fn with_memory_limit(mut self, memory_limit: u64) -> BlobSorterBuilder {
        self.memory_limit = Some(memory_limit);
        return self;
    }

    /// Sets an explicit buffer pool configuration.
    pub fn with_pool_config(mut self, pool_config: PoolConfig) -> BlobSorterBuilder {
        self.pool_config = Some(pool_config);
        return self;
    }
}

/// Parallel external sorter for flat files of 32-bit unsigned values.
pub struct BlobSorter {
    /// Sorting thread pool.
    thread_pool: rayon::ThreadPool,
    /// Buffer pool sizing used for every invocation.
    pool_config: PoolConfig,
    /// Directory the scratch directory is created under.
    tmp_dir: Option<Box<Path>>,
}

impl BlobSorter {
    /// Creates a new blob sorter instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of worker threads to run recursion tasks on.
    /// * `tmp_dir` - Directory the per-invocation scratch directory is created
    ///   under. If the parameter is [`None`] the OS temporary directory is used.
    /// * `pool_config` - Buffer pool sizing, computed once by the caller.
    pub fn new(
        threads_number: usize,
        tmp_dir: Option<&Path>,
        pool_config: PoolConfig,
    ) -> Result<Self, SortError> {
        return Ok(BlobSorter {
            thread_pool: Self::init_thread_pool(threads_number)?,
            pool_config,
            tmp_dir: tmp_dir.map(Into::into),
        });
    }

    fn init_thread_pool(threads_number: usize) -> Result<rayon::ThreadPool, SortError> {
        log::info!("initializing thread-pool (threads: {})", threads_number);

        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads_number)
            .build()
            .map_err(SortError::ThreadPool)?;

        return Ok(thread_pool);
    }

    /// Sorts the values of `input` into `output`.
    ///
    /// The input length is validated before anything is created on disk. The
    /// scratch directory lives only for the duration of this call and is
    /// removed (best-effort) before any error reaches the caller.
    pub fn sort(&self, input: &Path, output: &Path) -> Result<(), SortError> {
        let input_len = fs::metadata(input).map_err(SortError::Io)?.len();
        if input_len % 4 != 0 {
            return Err(SortError::Config(format!(
                "length of {} is {} bytes, not a multiple of 4",
                input.display(),
                input_len
            )));
        }

        log::info!(
            "sorting {} values from {} into {}",
            input_len / 4,
            input.display(),
            output.display()
        );

        let scratch = ScratchDir::new(self.tmp_dir.as_deref()).map_err(SortError::TempDir)?;
        let pool = BufferPool::new(self.pool_config);

        let context = SortContext {
            input,
            scratch: &scratch,
            pool: &pool,
        };
        let root = SortTask {
            offset: 0,
            size: input_len,
        };

        self.thread_pool.install(|| context.solve(root, Some(output)))?;

        log::info!("sorting done");

        return Ok(());
    }
}

/// Shared per-invocation state threaded through the recursion.
struct SortContext<'a> {
    input: &'a Path,
    scratch: &'a ScratchDir,
    pool: &'a BufferPool,
}

impl SortContext<'_> {
    /// Solves one task, returning the path of its sorted run.
    ///
    /// A task that fits in one buffer is sorted in memory; anything larger is
    /// split on a value boundary and both halves run concurrently. Both halves
    /// always run to completion, even when one of them fails; the failure is
    /// reported only after the join, and the left failure wins when both do.
    fn solve(&self, task: SortTask, dest: Option<&Path>) -> Result<PathBuf, SortError> {
        if task.size <= self.pool.buffer_size() as u64 {
            let dest = self.run_dest(task, dest);
            chunk::write_sorted_run(self.pool, self.input, task.offset, task.size, &dest)
                .map_err(SortError::Io)?;

            return Ok(dest);
        }

        let (left_task, right_task) = task.split();
        let (left, right) = rayon::join(
            || self.solve(left_task, None),
            || self.solve(right_task, None),
        );
        let left_run = left?;
        let right_run = right?;

        let dest = self.run_dest(task, dest);
        merger::merge_runs(&left_run, &right_run, &dest).map_err(SortError::Io)?;

        for run in [&left_run, &right_run] {
            if let Err(err) = fs::remove_file(run) {
                log::warn!("failed to remove consumed run {}: {}", run.display(), err);
            }
        }

        return Ok(dest);
    }

    fn run_dest(&self, task: SortTask, dest: Option<&Path>) -> PathBuf {
        match dest {
            Some(dest) => dest.to_path_buf(),
            None => self.scratch.run_path(task.offset, task.size),
        }
    }
}

/// Sorts the 32-bit unsigned values of `input` into `output`.
///
/// Convenience entry point using the default configuration: a worker thread
/// per CPU and a 256 MiB memory ceiling.
pub fn sort_blob32(input: &Path, output: &Path) -> Result<(), SortError> {
    BlobSorterBuilder::new().build()?.sort(input, output)
}

#[cfg(test)]
mod test {
    use rand::Rng;
    use rstest::*;

    use super::{BlobSorterBuilder, SortError};
    use crate::buffer::PoolConfig;
    use crate::test_support::{read_values, write_values};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    fn small_sorter(buffer_values: usize) -> super::BlobSorter {
        BlobSorterBuilder::new()
            .with_threads_number(2)
            .with_pool_config(PoolConfig {
                buffer_size: buffer_values * 4,
                buffer_count: 4,
            })
            .build()
            .unwrap()
    }

    #[rstest]
    fn test_sort_fits_one_buffer(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_values(&input, &[5, 3, 9, 1, 8, 2, 7, 4]);

        small_sorter(8).sort(&input, &output).unwrap();

        assert_eq!(read_values(&output), vec![1, 2, 3, 4, 5, 7, 8, 9]);
    }

    #[rstest]
    fn test_sort_forced_split(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_values(&input, &[4, 1, 3, 2]);

        small_sorter(2).sort(&input, &output).unwrap();

        assert_eq!(read_values(&output), vec![1, 2, 3, 4]);
    }

    #[rstest]
    fn test_sort_one_value_past_buffer(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_values(&input, &[5, 4, 3, 2, 1]);

        small_sorter(4).sort(&input, &output).unwrap();

        assert_eq!(read_values(&output), vec![1, 2, 3, 4, 5]);
    }

    #[rstest]
    fn test_sort_empty_input(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        write_values(&input, &[]);

        small_sorter(2).sort(&input, &output).unwrap();

        assert_eq!(read_values(&output), vec![]);
    }

    #[rstest]
    #[case(1_000)]
    #[case(10_000)]
    fn test_sort_preserves_multiset(tmp_dir: tempfile::TempDir, #[case] count: usize) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");

        let mut rng = rand::thread_rng();
        let values: Vec<u32> = (0..count).map(|_| rng.gen_range(0..1000)).collect();
        write_values(&input, &values);

        small_sorter(64).sort(&input, &output).unwrap();

        let mut expected = values;
        expected.sort_unstable();
        assert_eq!(read_values(&output), expected);
    }

    #[rstest]
    fn test_sort_is_deterministic(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let first = tmp_dir.path().join("first");
        let second = tmp_dir.path().join("second");

        let mut rng = rand::thread_rng();
        let values: Vec<u32> = (0..5_000).map(|_| rng.gen()).collect();
        write_values(&input, &values);

        let sorter = small_sorter(32);
        sorter.sort(&input, &first).unwrap();
        sorter.sort(&input, &second).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }

    #[rstest]
    fn test_sort_already_sorted_is_identity(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");

        let values: Vec<u32> = (0..1_000).collect();
        write_values(&input, &values);

        small_sorter(16).sort(&input, &output).unwrap();

        assert_eq!(std::fs::read(&input).unwrap(), std::fs::read(&output).unwrap());
    }

    #[rstest]
    fn test_sort_rejects_unaligned_length(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("input");
        let output = tmp_dir.path().join("output");
        std::fs::write(&input, b"1234567").unwrap();

        let err = small_sorter(2).sort(&input, &output).unwrap_err();

        assert!(matches!(err, SortError::Config(_)), "{:?}", err);
        assert!(!output.exists());
    }

    #[rstest]
    fn test_sort_missing_input(tmp_dir: tempfile::TempDir) {
        let input = tmp_dir.path().join("missing");
        let output = tmp_dir.path().join("output");

        let err = small_sorter(2).sort(&input, &output).unwrap_err();

        assert!(matches!(err, SortError::Io(_)), "{:?}", err);
        assert!(!output.exists());
    }
}
