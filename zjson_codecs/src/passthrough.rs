use std::io::{self, Write};

use zjson_core::{Encoder, ReadCodec, Result, Sink, Source, WriteCodec, WriteOptions};

/// No-op codec for plain `.jsonl` files.
///
/// Useful for:
/// - Mixing uncompressed files into a directory scan.
/// - Checking record handling independently of any codec.
pub struct PassThroughCodec;

impl ReadCodec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn decoder(&self, source: Source) -> io::Result<Source> {
        Ok(source)
    }
}

impl WriteCodec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn encoder(&self, sink: Sink, _options: &WriteOptions) -> Result<Box<dyn Encoder>> {
        Ok(Box::new(Plain(sink)))
    }
}

struct Plain(Sink);

impl Write for Plain {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl Encoder for Plain {
    fn finish(self: Box<Self>) -> io::Result<Sink> {
        Ok(self.0)
    }
}
