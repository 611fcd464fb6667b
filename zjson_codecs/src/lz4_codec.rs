use std::io::{self, Write};

use lz4_flex::frame::{FrameDecoder, FrameEncoder};

use tracing::trace;
use zjson_core::{Encoder, ReadCodec, Result, Sink, Source, WriteCodec, WriteOptions};

/// LZ4 frame codec (`.lz4`).
///
/// Fastest decompression of the bundled codecs, at the cost of ratio.
/// LZ4 has no levels here, so `WriteOptions::level` is ignored.
pub struct Lz4Codec;

impl ReadCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn decoder(&self, source: Source) -> io::Result<Source> {
        Ok(Box::new(FrameDecoder::new(source)))
    }
}

impl WriteCodec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn encoder(&self, sink: Sink, options: &WriteOptions) -> Result<Box<dyn Encoder>> {
        trace!(ignored_level = ?options.level, "lz4 encoder ready");
        Ok(Box::new(Lz4Writer(FrameEncoder::new(sink))))
    }
}

struct Lz4Writer(FrameEncoder<Sink>);

impl Write for Lz4Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    /// Emits the pending block; the frame stays open.
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for Lz4Writer {
    fn finish(self: Box<Self>) -> io::Result<Sink> {
        self.0
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
