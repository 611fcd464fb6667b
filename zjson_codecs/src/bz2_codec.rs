use std::io::{self, Write};

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;

use tracing::trace;
use zjson_core::{Encoder, ReadCodec, Result, Sink, Source, WriteCodec, WriteOptions};

/// bzip2 codec (`.bz2`).
///
/// Reads concatenated bzip2 streams as one, the way `bzcat` does.
pub struct Bz2Codec {
    /// Block size level, 1–9 (×100 KB).
    pub level: i32,
}

impl Default for Bz2Codec {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl ReadCodec for Bz2Codec {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn decoder(&self, source: Source) -> io::Result<Source> {
        Ok(Box::new(MultiBzDecoder::new(source)))
    }
}

impl WriteCodec for Bz2Codec {
    fn name(&self) -> &'static str {
        "bzip2"
    }

    fn encoder(&self, sink: Sink, options: &WriteOptions) -> Result<Box<dyn Encoder>> {
        let level = options.level_in("bzip2", self.level, 1..=9)?;
        trace!(level, "bzip2 encoder ready");
        let encoder = BzEncoder::new(sink, Compression::new(level as u32));
        Ok(Box::new(Bz2Encoder(encoder)))
    }
}

struct Bz2Encoder(BzEncoder<Sink>);

impl Write for Bz2Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for Bz2Encoder {
    fn finish(self: Box<Self>) -> io::Result<Sink> {
        self.0.finish()
    }
}
