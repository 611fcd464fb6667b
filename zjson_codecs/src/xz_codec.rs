use std::io::{self, Write};

use xz2::read::XzDecoder;
use xz2::write::XzEncoder;

use tracing::trace;
use zjson_core::{Encoder, ReadCodec, Result, Sink, Source, WriteCodec, WriteOptions};

/// xz / LZMA2 codec (`.xz`).
pub struct XzCodec {
    /// liblzma preset, 0–9. 6 is liblzma's own default.
    pub level: i32,
}

impl Default for XzCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl ReadCodec for XzCodec {
    fn name(&self) -> &'static str {
        "xz"
    }

    fn decoder(&self, source: Source) -> io::Result<Source> {
        Ok(Box::new(XzDecoder::new_multi_decoder(source)))
    }
}

impl WriteCodec for XzCodec {
    fn name(&self) -> &'static str {
        "xz"
    }

    fn encoder(&self, sink: Sink, options: &WriteOptions) -> Result<Box<dyn Encoder>> {
        let level = options.level_in("xz", self.level, 0..=9)?;
        trace!(level, "xz encoder ready");
        Ok(Box::new(XzWriter(XzEncoder::new(sink, level as u32))))
    }
}

struct XzWriter(XzEncoder<Sink>);

impl Write for XzWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    /// LZMA sync flush: closes the current chunk without ending the stream.
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for XzWriter {
    fn finish(self: Box<Self>) -> io::Result<Sink> {
        self.0.finish()
    }
}
