use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec::{ReadCodec, Source};
use crate::error::RecordErrorKind;
use crate::format::RAW_PREFIX_LEN;
use crate::options::{ErrorPolicy, ReadOptions};
use crate::position::{CountingReader, Position};
use crate::registry::ReaderRegistry;
use crate::{Error, Result};

/// Streaming reader for one compressed JSON-lines file.
///
/// # Open sequence
/// 1. Resolve the codec from the file extension.
/// 2. Open the file and wrap it in a byte counter (for progress reporting).
/// 3. Wrap that in the codec's decompressor.
///
/// # Access pattern
/// Records are produced one line at a time as the caller pulls them; nothing
/// beyond the decompressor's own buffer is held in memory. A stream cannot
/// be rewound: reopen the file to read it again.
///
/// Dropping the reader (or calling [`close`](Self::close)) releases the
/// decompressor and the file handle together, whether or not the stream was
/// read to the end.
pub struct RecordReader {
    path: PathBuf,
    codec: &'static str,
    lines: BufReader<Source>,
    position: Position,
    options: ReadOptions,
    strip_nul: bool,
    buf: Vec<u8>,
    line: u64,
    records: u64,
    skipped: u64,
    done: bool,
}

impl RecordReader {
    /// Open `path` with the codec registered for its extension.
    pub fn open(
        path: impl AsRef<Path>,
        registry: &ReaderRegistry,
        options: ReadOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let codec = registry.resolve(path)?;
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        Self::from_reader(path, file, codec.as_ref(), options)
    }

    /// Read compressed bytes from any source. `label` names the source in
    /// errors and logs.
    pub fn from_reader(
        label: impl Into<PathBuf>,
        source: impl Read + Send + 'static,
        codec: &dyn ReadCodec,
        options: ReadOptions,
    ) -> Result<Self> {
        let path = label.into();
        let (counting, position) = CountingReader::new(source);
        let decoder = codec
            .decoder(Box::new(counting))
            .map_err(|e| Error::io(&path, e))?;
        debug!(path = %path.display(), codec = codec.name(), "opened record reader");
        Ok(Self {
            path,
            codec: codec.name(),
            lines: BufReader::new(decoder),
            position,
            options,
            strip_nul: codec.strips_leading_nul(),
            buf: Vec::new(),
            line: 0,
            records: 0,
            skipped: 0,
            done: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec
    }

    /// Raw compressed bytes consumed from the underlying file so far.
    ///
    /// Decompressors read ahead, so this runs slightly ahead of the record
    /// most recently returned.
    pub fn compressed_position(&self) -> u64 {
        self.position.get()
    }

    /// 1-based number of the last line read (0 before the first).
    pub fn line_number(&self) -> u64 {
        self.line
    }

    pub fn records_read(&self) -> u64 {
        self.records
    }

    /// Lines dropped under [`ErrorPolicy::Skip`].
    pub fn skipped_lines(&self) -> u64 {
        self.skipped
    }

    /// Decode the next record, or `None` at end of stream.
    ///
    /// After an `Err` is returned the stream is finished and every later call
    /// returns `None`.
    pub fn next_record<T: DeserializeOwned>(&mut self) -> Option<Result<T>> {
        while !self.done {
            self.buf.clear();
            match self.lines.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    debug!(
                        path = %self.path.display(),
                        records = self.records,
                        skipped = self.skipped,
                        "end of stream"
                    );
                    return None;
                }
                Ok(_) => self.line += 1,
                Err(source) => {
                    self.done = true;
                    return Some(Err(Error::Decompress {
                        path: self.path.clone(),
                        line: self.line,
                        source,
                    }));
                }
            }

            match self.parse_line() {
                Ok(record) => {
                    self.records += 1;
                    return Some(Ok(record));
                }
                Err(kind) => {
                    let err = Error::Record {
                        path: self.path.clone(),
                        line: self.line,
                        kind,
                        prefix: raw_prefix(&self.buf),
                    };
                    match self.options.error_policy {
                        ErrorPolicy::Abort => {
                            self.done = true;
                            return Some(Err(err));
                        }
                        ErrorPolicy::Skip => {
                            warn!(error = %err, "skipping unreadable line");
                            self.skipped += 1;
                        }
                    }
                }
            }
        }
        None
    }

    /// Every line is exactly one record: an empty line is invalid JSON.
    fn parse_line<T: DeserializeOwned>(&self) -> std::result::Result<T, RecordErrorKind> {
        let mut text = std::str::from_utf8(&self.buf)?;
        if self.strip_nul {
            text = text.trim_start_matches('\0');
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Iterate records by reference, leaving the reader usable afterwards.
    pub fn records<T: DeserializeOwned>(&mut self) -> Records<'_, T> {
        Records {
            reader: self,
            _marker: PhantomData,
        }
    }

    /// Iterate records, taking ownership of the reader.
    pub fn into_records<T: DeserializeOwned>(self) -> IntoRecords<T> {
        IntoRecords {
            reader: self,
            _marker: PhantomData,
        }
    }

    /// Release the decompressor and the file handle.
    pub fn close(self) {
        debug!(
            path = %self.path.display(),
            line = self.line,
            records = self.records,
            "closed record reader"
        );
    }
}

fn raw_prefix(line: &[u8]) -> String {
    let end = line.len().min(RAW_PREFIX_LEN);
    String::from_utf8_lossy(&line[..end])
        .trim_end_matches(&['\n', '\r'][..])
        .to_string()
}

/// Borrowing record iterator, see [`RecordReader::records`].
pub struct Records<'a, T = Value> {
    reader: &'a mut RecordReader,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Iterator for Records<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record()
    }
}

impl<T: DeserializeOwned> FusedIterator for Records<'_, T> {}

/// Owning record iterator, see [`RecordReader::into_records`].
pub struct IntoRecords<T = Value> {
    reader: RecordReader,
    _marker: PhantomData<fn() -> T>,
}

impl<T> IntoRecords<T> {
    /// The reader being drained, e.g. for its compressed position.
    pub fn reader(&self) -> &RecordReader {
        &self.reader
    }

    pub fn into_inner(self) -> RecordReader {
        self.reader
    }
}

impl<T: DeserializeOwned> Iterator for IntoRecords<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record()
    }
}

impl<T: DeserializeOwned> FusedIterator for IntoRecords<T> {}

impl IntoIterator for RecordReader {
    type Item = Result<Value>;
    type IntoIter = IntoRecords<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::io::{self, Cursor};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Identity codec; optionally behaves like zst and strips NULs.
    struct Plain {
        strip_nul: bool,
    }

    impl ReadCodec for Plain {
        fn name(&self) -> &'static str {
            "plain"
        }

        fn decoder(&self, source: Source) -> io::Result<Source> {
            Ok(source)
        }

        fn strips_leading_nul(&self) -> bool {
            self.strip_nul
        }
    }

    const PLAIN: Plain = Plain { strip_nul: false };

    fn reader(data: &[u8], codec: &Plain, options: ReadOptions) -> RecordReader {
        RecordReader::from_reader("mem.jsonl", Cursor::new(data.to_vec()), codec, options).unwrap()
    }

    #[test]
    fn reads_one_value_per_line() {
        let data = b"{\"a\":1}\n[1,2]\n\"s\"\n3\nnull";
        let values: Vec<Value> = reader(data, &PLAIN, ReadOptions::default())
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values, vec![json!({"a": 1}), json!([1, 2]), json!("s"), json!(3), Value::Null]);
    }

    #[test]
    fn deserializes_into_typed_records() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Comment {
            id: String,
            score: i64,
        }
        let data = b"{\"id\":\"x1\",\"score\":5}\n{\"id\":\"x2\",\"score\":-2}\n";
        let mut r = reader(data, &PLAIN, ReadOptions::default());
        let comments: Vec<Comment> = r.records().collect::<Result<_>>().unwrap();
        assert_eq!(comments[1], Comment { id: "x2".into(), score: -2 });
        assert_eq!(r.records_read(), 2);
    }

    #[test]
    fn strips_leading_nuls_when_codec_asks() {
        let data = b"\0\0{\"a\":1}\n\0{\"a\":2}\n";
        let zst_like = Plain { strip_nul: true };
        let values: Vec<Value> = reader(data, &zst_like, ReadOptions::default())
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(values, vec![json!({"a": 1}), json!({"a": 2})]);
    }

    #[test]
    fn leading_nuls_are_an_error_without_stripping() {
        let mut r = reader(b"\0{\"a\":1}\n", &PLAIN, ReadOptions::default());
        assert!(matches!(
            r.next_record::<Value>(),
            Some(Err(Error::Record { kind: RecordErrorKind::Json(_), .. }))
        ));
    }

    #[test]
    fn blank_line_aborts_by_default() {
        let mut r = reader(b"1\n\n2\n", &PLAIN, ReadOptions::default());
        let results: Vec<Result<Value>> = r.records().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &json!(1));
        match &results[1] {
            Err(Error::Record { line, kind, prefix, .. }) => {
                assert_eq!(*line, 2);
                assert!(matches!(kind, RecordErrorKind::Json(_)));
                assert_eq!(prefix, "");
            }
            other => panic!("expected record error, got {other:?}"),
        }
        assert!(r.next_record::<Value>().is_none());
    }

    #[test]
    fn blank_lines_are_counted_when_skipping() {
        let options = ReadOptions::default().error_policy(ErrorPolicy::Skip);
        let mut r = reader(b"1\n\n   \n\0\n2\r\n", &PLAIN, options);
        let values: Vec<Value> = r.records().collect::<Result<_>>().unwrap();
        assert_eq!(values, vec![json!(1), json!(2)]);
        assert_eq!(r.skipped_lines(), 3);
        assert_eq!(r.line_number(), 5);
    }

    #[test]
    fn nul_only_line_is_invalid_after_stripping() {
        let zst_like = Plain { strip_nul: true };
        let mut r = reader(b"\0\0\n", &zst_like, ReadOptions::default());
        assert!(matches!(
            r.next_record::<Value>(),
            Some(Err(Error::Record { line: 1, kind: RecordErrorKind::Json(_), .. }))
        ));
    }

    #[test]
    fn abort_reports_line_and_prefix_then_stops() {
        let data = b"{\"ok\":1}\n{\"ok\":2}\n{broken\n{\"ok\":4}\n";
        let mut r = reader(data, &PLAIN, ReadOptions::default());
        assert!(r.next_record::<Value>().unwrap().is_ok());
        assert!(r.next_record::<Value>().unwrap().is_ok());
        match r.next_record::<Value>() {
            Some(Err(Error::Record { path, line, kind, prefix })) => {
                assert_eq!(path, Path::new("mem.jsonl"));
                assert_eq!(line, 3);
                assert!(matches!(kind, RecordErrorKind::Json(_)));
                assert_eq!(prefix, "{broken");
            }
            other => panic!("expected record error, got {other:?}"),
        }
        assert!(r.next_record::<Value>().is_none());
        assert!(r.next_record::<Value>().is_none());
    }

    #[test]
    fn invalid_utf8_is_reported_with_line_number() {
        let data = b"1\n2\n\xff\xfe\"bad\"\n4\n";
        let mut r = reader(data, &PLAIN, ReadOptions::default());
        let results: Vec<Result<Value>> = r.records().collect();
        assert_eq!(results.len(), 3);
        let err = results[2].as_ref().unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err, Error::Record { kind: RecordErrorKind::Utf8(_), .. }));
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn skip_policy_continues_past_bad_lines() {
        let data = b"1\n\xff\n{nope\n4\n";
        let options = ReadOptions::default().error_policy(ErrorPolicy::Skip);
        let mut r = reader(data, &PLAIN, options);
        let values: Vec<Value> = r.records().collect::<Result<_>>().unwrap();
        assert_eq!(values, vec![json!(1), json!(4)]);
        assert_eq!(r.skipped_lines(), 2);
    }

    /// Yields `good` bytes, then fails like a corrupt compressed frame.
    struct Corrupt {
        good: Cursor<Vec<u8>>,
    }

    impl Read for Corrupt {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.good.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::InvalidData, "corrupt frame")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn decompression_failure_ends_stream_even_when_skipping() {
        let source = Corrupt {
            good: Cursor::new(b"1\n2\n".to_vec()),
        };
        let options = ReadOptions::default().error_policy(ErrorPolicy::Skip);
        let mut r = RecordReader::from_reader("bad.zst", source, &PLAIN, options).unwrap();
        let results: Vec<Result<Value>> = r.records().collect();
        assert_eq!(results.len(), 3);
        match &results[2] {
            Err(Error::Decompress { line, source, .. }) => {
                assert_eq!(*line, 2);
                assert_eq!(source.kind(), io::ErrorKind::InvalidData);
            }
            other => panic!("expected decompress error, got {other:?}"),
        }
    }

    #[test]
    fn tracks_compressed_position() {
        let data = b"{\"a\":1}\n{\"a\":2}\n";
        let mut r = reader(data, &PLAIN, ReadOptions::default());
        assert_eq!(r.compressed_position(), 0);
        r.records::<Value>().for_each(drop);
        assert_eq!(r.compressed_position(), data.len() as u64);
    }

    struct DropFlag {
        inner: Cursor<Vec<u8>>,
        dropped: Arc<AtomicBool>,
    }

    impl Read for DropFlag {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn close_after_partial_read_releases_source() {
        let dropped = Arc::new(AtomicBool::new(false));
        let source = DropFlag {
            inner: Cursor::new(b"1\n2\n3\n".to_vec()),
            dropped: dropped.clone(),
        };
        let mut r = RecordReader::from_reader("m", source, &PLAIN, ReadOptions::default()).unwrap();
        assert_eq!(r.next_record::<Value>().unwrap().unwrap(), json!(1));
        assert!(!dropped.load(Ordering::SeqCst));
        r.close();
        assert!(dropped.load(Ordering::SeqCst));
    }
}
