mod block_cache;
mod blocking;
mod file_reader;
mod http_reader;
mod range_reader;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
pub use blocking::BlockingRangeCursor;
pub use file_reader::FileRangeReader;
pub use http_reader::{create_http_client, HttpRangeReader};
pub use range_reader::{check_range, RangeReader};
