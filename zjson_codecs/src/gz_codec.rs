use std::io::{self, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use tracing::trace;
use zjson_core::{Encoder, ReadCodec, Result, Sink, Source, WriteCodec, WriteOptions};

/// gzip codec (`.gz`). Multi-member files read as one stream.
pub struct GzCodec {
    pub level: i32,
}

impl Default for GzCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl ReadCodec for GzCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn decoder(&self, source: Source) -> io::Result<Source> {
        Ok(Box::new(MultiGzDecoder::new(source)))
    }
}

impl WriteCodec for GzCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn encoder(&self, sink: Sink, options: &WriteOptions) -> Result<Box<dyn Encoder>> {
        let level = options.level_in("gzip", self.level, 0..=9)?;
        trace!(level, "gzip encoder ready");
        Ok(Box::new(GzWriter(GzEncoder::new(sink, Compression::new(level as u32)))))
    }
}

struct GzWriter(GzEncoder<Sink>);

impl Write for GzWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for GzWriter {
    fn finish(self: Box<Self>) -> io::Result<Sink> {
        self.0.finish()
    }
}
