//! Streaming two-way run merger.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Buffered reader over one sorted run file.
struct RunReader {
    reader: io::Take<io::BufReader<fs::File>>,
}

impl RunReader {
    fn open(path: &Path) -> io::Result<Self> {
        let file = fs::File::open(path)?;
        let len = file.metadata()?.len();

        Ok(RunReader {
            reader: io::BufReader::new(file).take(len),
        })
    }

    /// Returns the next value, or [`None`] once the run is exhausted.
    fn next_value(&mut self) -> io::Result<Option<u32>> {
        if self.reader.limit() == 0 {
            Ok(None)
        } else {
            self.reader.read_u32::<LittleEndian>().map(Some)
        }
    }
}

/// Merges two ascending-sorted run files into a single sorted output file.
///
/// Both inputs are streamed; neither is ever held fully in memory. The output
/// length equals the sum of the input lengths. Equal values are emitted from
/// the left run first, so merging is deterministic. The input files are left
/// in place; deleting consumed runs is the caller's job.
pub fn merge_runs(left: &Path, right: &Path, output: &Path) -> io::Result<()> {
    log::debug!(
        "merging {} and {} into {}",
        left.display(),
        right.display(),
        output.display()
    );

    let mut left_run = RunReader::open(left)?;
    let mut right_run = RunReader::open(right)?;
    let mut writer = io::BufWriter::new(fs::File::create(output)?);

    let mut left_head = left_run.next_value()?;
    let mut right_head = right_run.next_value()?;

    loop {
        match (left_head, right_head) {
            // Ties advance the left side.
            (Some(l), Some(r)) if l <= r => {
                writer.write_u32::<LittleEndian>(l)?;
                left_head = left_run.next_value()?;
            }
            (_, Some(r)) => {
                writer.write_u32::<LittleEndian>(r)?;
                right_head = right_run.next_value()?;
            }
            (Some(l), None) => {
                writer.write_u32::<LittleEndian>(l)?;
                left_head = left_run.next_value()?;
            }
            (None, None) => break,
        }
    }

    writer.flush()
}
