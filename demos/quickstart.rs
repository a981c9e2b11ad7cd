use std::path::Path;

use env_logger;
use log;

use blob_sort::BlobSorterBuilder;

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let sorter = BlobSorterBuilder::new()
        .with_memory_limit(50 * 1024 * 1024)
        .build()
        .unwrap();

    sorter
        .sort(Path::new("input.blob"), Path::new("output.blob"))
        .unwrap();
}
