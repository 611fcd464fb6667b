use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared view of how many raw bytes have been pulled from a source.
///
/// The decompressor owns the source, so the reader keeps this handle to
/// report the compressed-file offset for progress display.
#[derive(Debug, Clone, Default)]
pub struct Position(Arc<AtomicU64>);

impl Position {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn advance(&self, n: usize) {
        self.0.fetch_add(n as u64, Ordering::Relaxed);
    }
}

/// `Read` adapter that records consumed bytes into a [`Position`].
pub struct CountingReader<R> {
    inner: R,
    position: Position,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> (Self, Position) {
        let position = Position::default();
        (
            Self {
                inner,
                position: position.clone(),
            },
            position,
        )
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_bytes_read() {
        let data = vec![7u8; 1000];
        let (mut reader, position) = CountingReader::new(&data[..]);
        let mut buf = [0u8; 300];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(position.get(), 300);
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(position.get(), 1000);
    }
}
