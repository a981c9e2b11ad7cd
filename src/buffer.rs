//! Bounded blocking buffer pool.

use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex};

/// Buffer pool sizing.
///
/// Computed once by the caller (typically from a memory ceiling and a thread
/// count) and passed into the engine, so the core never inspects the hardware
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Size of a single buffer in bytes. Always a non-zero multiple of 4.
    pub buffer_size: usize,
    /// Number of buffers owned by the pool.
    pub buffer_count: usize,
}

impl PoolConfig {
    /// Derives a pool configuration from a total memory ceiling.
    ///
    /// Buffers are sized as `memory_limit / (2 * threads)` so that at least
    /// two buffers exist per worker thread and `buffer_size * buffer_count`
    /// never exceeds the ceiling.
    pub fn for_memory_limit(memory_limit: u64, threads: usize) -> Self {
        let buffer_count = threads.max(1) * 2;
        let buffer_size = (memory_limit / buffer_count as u64) / 4 * 4;
        let buffer_size = (buffer_size as usize).max(4);

        PoolConfig {
            buffer_size,
            buffer_count,
        }
    }
}

/// Fixed set of equally sized value buffers shared by all leaf sorters.
///
/// [`acquire`](BufferPool::acquire) blocks until a buffer is free; the
/// returned [`BufferLease`] grants exclusive access and returns the buffer to
/// the pool when dropped, waking at most one waiter.
pub struct BufferPool {
    buffer_size: usize,
    free: Mutex<Vec<Vec<u32>>>,
    available: Condvar,
}

impl BufferPool {
    /// Creates a pool with `config.buffer_count` buffers, each holding
    /// `config.buffer_size / 4` values.
    pub fn new(config: PoolConfig) -> Self {
        let values_per_buffer = config.buffer_size / 4;
        let free = (0..config.buffer_count)
            .map(|_| Vec::with_capacity(values_per_buffer))
            .collect();

        BufferPool {
            buffer_size: config.buffer_size,
            free: Mutex::new(free),
            available: Condvar::new(),
        }
    }

    /// Buffer capacity in bytes.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Takes a free buffer out of the pool, blocking until one is available.
    pub fn acquire(&self) -> BufferLease<'_> {
        let mut free = self.free.lock().expect("buffer pool mutex poisoned");
        loop {
            match free.pop() {
                Some(buffer) => {
                    return BufferLease {
                        pool: self,
                        buffer: Some(buffer),
                    }
                }
                None => free = self.available.wait(free).expect("buffer pool mutex poisoned"),
            }
        }
    }

    fn release(&self, buffer: Vec<u32>) {
        {
            let mut free = self.free.lock().expect("buffer pool mutex poisoned");
            free.push(buffer);
        }

        self.available.notify_one();
    }
}

/// Exclusive handle to one pooled buffer.
///
/// Created only by [`BufferPool::acquire`]. The buffer goes back to the pool
/// when the lease is dropped, on every exit path.
pub struct BufferLease<'a> {
    pool: &'a BufferPool,
    buffer: Option<Vec<u32>>,
}

impl Deref for BufferLease<'_> {
    type Target = Vec<u32>;

    fn deref(&self) -> &Self::Target {
        self.buffer.as_ref().expect("lease already released")
    }
}

impl DerefMut for BufferLease<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buffer.as_mut().expect("lease already released")
    }
}

impl Drop for BufferLease<'_> {
    fn drop(&mut self) {
        if let Some(mut buffer) = self.buffer.take() {
            buffer.clear();
            self.pool.release(buffer);
        }
    }
}
