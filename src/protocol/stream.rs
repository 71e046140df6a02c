//! Length-aware adapters between the byte connection and the message
//! codec: a budgeted, chunked input stream and a batching output stream.

use crate::connection::Connection;
use crate::error::{Error, Result, code};

/// Chunked reader with a per-operation byte budget.
///
/// The engine grants a budget per logical unit (frame header, then frame
/// payload); once the budget is exhausted the stream reports end of
/// stream, which keeps the codec from crossing a frame boundary. An I/O
/// failure is latched so that a timeout while waiting for a header can be
/// cleared and retried, while a timeout after the header was committed
/// stays fatal for the frame.
pub(crate) struct InputStream {
    buffer: Vec<u8>,
    start: usize,
    end: usize,
    budget: usize,
    io_error: Option<Error>,
}

impl InputStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0; capacity.max(16)],
            start: 0,
            end: 0,
            budget: 0,
            io_error: None,
        }
    }

    /// Grant a new read budget for the next logical unit.
    pub fn allowed_read(&mut self, bytes: usize) {
        self.budget = bytes;
    }

    pub fn last_io_error(&self) -> Option<&Error> {
        self.io_error.as_ref()
    }

    pub fn clear_io_error(&mut self) {
        self.io_error = None;
    }

    /// Hand out the next chunk, reading from the connection when the
    /// buffer is drained. `None` means the budget is exhausted.
    pub fn next<'a>(&'a mut self, connection: &mut Connection) -> Result<Option<&'a [u8]>> {
        if self.start == self.end {
            if self.budget == 0 {
                return Ok(None);
            }
            let want = self.budget.min(self.buffer.len());
            let n = match connection.read(&mut self.buffer[..want]) {
                Ok(n) => n,
                Err(e) => {
                    self.io_error = Some(e.clone());
                    return Err(e);
                }
            };
            self.start = 0;
            self.end = n;
            self.budget -= n;
        }

        let chunk = &self.buffer[self.start..self.end];
        self.start = self.end;
        Ok(Some(chunk))
    }

    /// Return the trailing `bytes` of the last chunk to the stream.
    pub fn back_up(&mut self, bytes: usize) {
        debug_assert!(bytes <= self.start);
        self.start -= bytes;
    }

    pub fn read_exact(&mut self, connection: &mut Connection, out: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < out.len() {
            let missing = out.len() - filled;
            match self.next(connection)? {
                Some(chunk) => {
                    let take = chunk.len().min(missing);
                    out[filled..filled + take].copy_from_slice(&chunk[..take]);
                    let excess = chunk.len() - take;
                    filled += take;
                    if excess > 0 {
                        self.back_up(excess);
                    }
                }
                None => {
                    return Err(Error::new(
                        code::MALFORMED_PACKET,
                        "Unexpected end of message",
                    ));
                }
            }
        }
        Ok(())
    }

}

const OUTPUT_BATCH_CAPACITY: usize = 1024;

/// Batches small writes and flushes when full; the first failure sticks.
pub(crate) struct OutputStream {
    buffer: Vec<u8>,
    error: Option<Error>,
}

impl Default for OutputStream {
    fn default() -> Self {
        Self {
            buffer: Vec::with_capacity(OUTPUT_BATCH_CAPACITY),
            error: None,
        }
    }
}

impl OutputStream {
    pub fn write(&mut self, connection: &mut Connection, bytes: &[u8]) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }

        if self.buffer.len() + bytes.len() <= OUTPUT_BATCH_CAPACITY {
            self.buffer.extend_from_slice(bytes);
            return Ok(());
        }

        self.flush(connection)?;

        if bytes.len() <= OUTPUT_BATCH_CAPACITY {
            self.buffer.extend_from_slice(bytes);
            Ok(())
        } else {
            self.write_through(connection, bytes)
        }
    }

    pub fn flush(&mut self, connection: &mut Connection) -> Result<()> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if self.buffer.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buffer);
        let result = self.write_through(connection, &pending);
        self.buffer = pending;
        self.buffer.clear();
        result
    }

    fn write_through(&mut self, connection: &mut Connection, bytes: &[u8]) -> Result<()> {
        match connection.write(bytes) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.error = Some(e.clone());
                Err(e)
            }
        }
    }
}
