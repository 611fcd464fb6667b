use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::{Encoder, WriteCodec};
use crate::options::WriteOptions;
use crate::registry::WriterRegistry;
use crate::{Error, Result};

/// Streaming writer for one compressed JSON-lines file.
///
/// # Write contract
/// Each [`write`](Self::write) serializes one record as compact JSON, appends
/// exactly one `\n`, and flushes the encoder before returning. Once a
/// `write` returns, the record is on its way to the OS and readable by a
/// decoder even if the process dies before [`finish`](Self::finish). This
/// costs compression ratio and throughput.
///
/// The file is handed to the encoder unbuffered, so every encoder flush
/// becomes `write(2)` calls.
///
/// # Close order
/// `finish` (or Drop, on any other exit path) finalizes the encoder, which
/// writes the format trailer, and only then flushes and releases the file.
pub struct RecordWriter {
    path: PathBuf,
    codec: &'static str,
    encoder: Option<Box<dyn Encoder>>,
    line: Vec<u8>,
    records: u64,
}

impl RecordWriter {
    /// Create (or truncate) `path` with the codec registered for its extension.
    pub fn create(
        path: impl AsRef<Path>,
        registry: &WriterRegistry,
        options: WriteOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let codec = registry.resolve(path)?;
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        Self::from_writer(path, file, codec.as_ref(), &options)
    }

    /// Compress into any sink. `label` names the sink in errors and logs.
    pub fn from_writer(
        label: impl Into<PathBuf>,
        sink: impl Write + Send + 'static,
        codec: &dyn WriteCodec,
        options: &WriteOptions,
    ) -> Result<Self> {
        let path = label.into();
        let encoder = codec.encoder(Box::new(sink), options)?;
        debug!(path = %path.display(), codec = codec.name(), level = ?options.level, "opened record writer");
        Ok(Self {
            path,
            codec: codec.name(),
            encoder: Some(encoder),
            line: Vec::new(),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Append one record and flush it through the encoder.
    pub fn write<T: Serialize + ?Sized>(&mut self, record: &T) -> Result<()> {
        self.line.clear();
        serde_json::to_writer(&mut self.line, record).map_err(|source| Error::Serialize {
            path: self.path.clone(),
            source,
        })?;
        self.line.push(b'\n');

        let Some(encoder) = self.encoder.as_mut() else {
            return Err(Error::io(
                &self.path,
                io::Error::new(io::ErrorKind::BrokenPipe, "writer already finished"),
            ));
        };
        encoder
            .write_all(&self.line)
            .and_then(|()| encoder.flush())
            .map_err(|e| Error::io(&self.path, e))?;
        self.records += 1;
        Ok(())
    }

    /// [`write`](Self::write) every record from `records`, stopping at the
    /// first failure.
    pub fn write_records<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let mut n = 0;
        for record in records {
            self.write(&record)?;
            n += 1;
        }
        Ok(n)
    }

    /// Write the format trailer, flush, and release the file.
    pub fn finish(mut self) -> Result<()> {
        self.finalize()
    }

    fn finalize(&mut self) -> Result<()> {
        let Some(encoder) = self.encoder.take() else {
            return Ok(());
        };
        let mut sink = encoder.finish().map_err(|e| Error::io(&self.path, e))?;
        sink.flush().map_err(|e| Error::io(&self.path, e))?;
        drop(sink);
        debug!(path = %self.path.display(), records = self.records, "closed record writer");
        Ok(())
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        if let Err(err) = self.finalize() {
            warn!(error = %err, "failed to finalize record writer on drop");
        }
    }
}
