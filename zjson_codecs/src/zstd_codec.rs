use std::io::{self, Write};

use tracing::trace;
use zjson_core::{Encoder, Error, ReadCodec, Result, Sink, Source, WriteCodec, WriteOptions};

/// Zstandard stream codec (`.zst`).
///
/// Reading accepts frames with windows up to `2^window_log_max` bytes. The
/// default of 31 (2 GiB) covers archives written with `--long=31`, which a
/// stock decoder rejects. Lines are stripped of leading NUL bytes, an
/// artifact of some zst dump producers.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
    /// Log2 of the largest accepted decompression window.
    pub window_log_max: u32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self {
            level: 3,
            window_log_max: 31,
        }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

impl ReadCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn decoder(&self, source: Source) -> io::Result<Source> {
        let mut decoder = zstd::stream::read::Decoder::new(source)?;
        decoder.window_log_max(self.window_log_max)?;
        trace!(window_log_max = self.window_log_max, "zstd decoder ready");
        Ok(Box::new(decoder))
    }

    fn strips_leading_nul(&self) -> bool {
        true
    }
}

impl WriteCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn encoder(&self, sink: Sink, options: &WriteOptions) -> Result<Box<dyn Encoder>> {
        let level = options.level_in("zstd", self.level, zstd::compression_level_range())?;
        let encoder = zstd::stream::write::Encoder::new(sink, level)
            .map_err(|source| Error::Codec { codec: "zstd", source })?;
        trace!(level, "zstd encoder ready");
        Ok(Box::new(ZstdEncoder(encoder)))
    }
}

struct ZstdEncoder(zstd::stream::write::Encoder<'static, Sink>);

impl Write for ZstdEncoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    /// Ends the current zstd block so everything written so far decodes.
    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for ZstdEncoder {
    fn finish(self: Box<Self>) -> io::Result<Sink> {
        self.0.finish()
    }
}
