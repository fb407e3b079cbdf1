pub mod batch;

pub use batch::{BatchError, BatchRow, process, process_file};
