//! Leaf sorter: sorts one buffer-sized slice of the input in memory.

use std::fs;
use std::io::{self, prelude::*, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::buffer::BufferPool;

/// Sorts the `size` bytes of `input` starting at `offset` and writes the
/// result to `dest`.
///
/// Blocks until a pool buffer is free; `size` must not exceed the pool's
/// buffer capacity. Reading fewer than `size` bytes or writing fewer than
/// `size` bytes fails the call. The leased buffer is returned to the pool on
/// every path, including early returns on I/O errors.
pub fn write_sorted_run(
    pool: &BufferPool,
    input: &Path,
    offset: u64,
    size: u64,
    dest: &Path,
) -> io::Result<()> {
    debug_assert!(size <= pool.buffer_size() as u64);
    debug_assert_eq!(size % 4, 0);

    let values = (size / 4) as usize;
    log::debug!("sorting {} values at offset {:#x}", values, offset);

    let mut lease = pool.acquire();
    lease.resize(values, 0);

    let mut reader = fs::File::open(input)?;
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_u32_into::<LittleEndian>(&mut lease[..])?;

    lease.sort_unstable();

    let mut writer = io::BufWriter::new(fs::File::create(dest)?);
    for value in lease.iter() {
        writer.write_u32::<LittleEndian>(*value)?;
    }
    writer.flush()?;

    Ok(())
}
