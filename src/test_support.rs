//! Helpers shared by the module tests.

use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub(crate) fn write_values(path: &Path, values: &[u32]) {
    let mut writer = io::BufWriter::new(fs::File::create(path).unwrap());
    for value in values {
        writer.write_u32::<LittleEndian>(*value).unwrap();
    }
    writer.flush().unwrap();
}

pub(crate) fn read_values(path: &Path) -> Vec<u32> {
    let data = fs::read(path).unwrap();
    assert_eq!(data.len() % 4, 0, "file is not a whole number of values");

    let mut values = vec![0u32; data.len() / 4];
    io::Cursor::new(data)
        .read_u32_into::<LittleEndian>(&mut values)
        .unwrap();

    values
}
