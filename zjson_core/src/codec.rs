use std::io::{self, Read, Write};

use crate::options::WriteOptions;
use crate::Result;

/// Raw compressed bytes flowing into a decoder.
pub type Source = Box<dyn Read + Send>;

/// Raw compressed bytes flowing out of an encoder.
pub type Sink = Box<dyn Write + Send>;

/// Read side of a format strategy.
///
/// A `ReadCodec` wraps the raw file handle in a streaming decompressor. It
/// never sees records: line splitting and JSON parsing happen in
/// [`RecordReader`](crate::RecordReader), so every format shares one
/// per-record error policy.
pub trait ReadCodec: Send + Sync {
    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Wrap `source` in a decompressor yielding the decompressed text.
    fn decoder(&self, source: Source) -> io::Result<Source>;

    /// Whether leading NUL bytes must be stripped from each line before
    /// parsing. Some zst producers pad lines with them.
    fn strips_leading_nul(&self) -> bool {
        false
    }
}

/// Write side of a format strategy.
pub trait WriteCodec: Send + Sync {
    /// Human-readable codec name for logs and CLI display.
    fn name(&self) -> &'static str;

    /// Wrap `sink` in a compressor configured from `options`.
    ///
    /// Level validation happens here, so a bad level fails before any byte
    /// reaches the sink.
    fn encoder(&self, sink: Sink, options: &WriteOptions) -> Result<Box<dyn Encoder>>;
}

/// A streaming compressor that must be finalized.
///
/// `flush` pushes every byte written so far through to the sink, in a form
/// a decoder can already read. `finish` writes the format trailer and hands
/// the sink back so the caller can release it.
pub trait Encoder: Write + Send {
    fn finish(self: Box<Self>) -> io::Result<Sink>;
}
