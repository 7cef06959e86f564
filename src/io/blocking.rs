use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

use tokio::runtime::Handle;

use super::RangeReader;

/// Synchronous `Read + Seek` view over an async [`RangeReader`].
///
/// The PDF engine runs on its own OS thread and pulls bytes through the
/// standard I/O traits. Each read is forwarded to the async reader and
/// driven to completion on the runtime captured at construction.
///
/// Must not be used from inside a runtime worker thread: `Handle::block_on`
/// panics there.
pub struct BlockingRangeCursor {
    reader: Arc<dyn RangeReader>,
    handle: Handle,
    position: u64,
}

impl BlockingRangeCursor {
    pub fn new(reader: Arc<dyn RangeReader>, handle: Handle) -> Self {
        Self {
            reader,
            handle,
            position: 0,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Read for BlockingRangeCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.reader.size();
        if self.position >= size || buf.is_empty() {
            return Ok(0);
        }

        let len = std::cmp::min(buf.len() as u64, size - self.position) as usize;
        let reader = self.reader.clone();
        let offset = self.position;

        let data = self
            .handle
            .block_on(async move { reader.read_exact_at(offset, len).await })
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        buf[..data.len()].copy_from_slice(&data);
        self.position += data.len() as u64;
        Ok(data.len())
    }
}

impl Seek for BlockingRangeCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let size = self.reader.size() as i128;
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(delta) => size + delta as i128,
            SeekFrom::Current(delta) => self.position as i128 + delta as i128,
        };

        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of document",
            ));
        }

        self.position = target as u64;
        Ok(self.position)
    }
}
