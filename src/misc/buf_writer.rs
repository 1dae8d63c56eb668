//! Frame buffered writer.
//! Collects a whole console frame so it reaches the terminal in one write.

use std::io::Write;

/// Buffered writer.
/// Wont flush automatically, you will need to call `flush` manually.
/// Anything not flushed is dropped with the writer.
pub struct FrameWriter<T: Write> {
    inner: T,
    frame: Vec<u8>,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            frame: Vec::with_capacity(256),
        }
    }

    /// Bytes waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.frame.len()
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write> Write for FrameWriter<T> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.frame.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.write_all(&self.frame)?;
        self.frame.clear();
        self.inner.flush()
    }
}
