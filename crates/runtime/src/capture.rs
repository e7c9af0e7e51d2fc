//! Shared output buffer for embedders and tests
//!
//! `println` writes through the VM's output sink. Handing the VM a
//! `CaptureBuffer` clone lets the caller read everything the program
//! printed after the run finishes.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// A cloneable, thread-safe byte sink.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> CaptureBuffer {
        CaptureBuffer::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        match self.inner.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.extend_from_slice(buf);
                Ok(buf.len())
            }
            Err(_) => Err(io::Error::other("capture buffer poisoned")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_contents() {
        let buffer = CaptureBuffer::new();
        let mut writer = buffer.clone();
        writer.write_all(b"hello").unwrap();
        assert_eq!(buffer.contents(), "hello");
    }
}
