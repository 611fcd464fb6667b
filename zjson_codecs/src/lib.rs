mod bz2_codec;
mod gz_codec;
mod lz4_codec;
mod passthrough;
mod xz_codec;
mod zstd_codec;

pub use bz2_codec::Bz2Codec;
pub use gz_codec::GzCodec;
pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use xz_codec::XzCodec;
pub use zstd_codec::ZstdCodec;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use zjson_core::{
    DirectoryScan, IntoRecords, ReadOptions, ReaderRegistry, RecordReader, RecordWriter, Result,
    ScanRecords, WriteOptions, WriterRegistry, EXT_BZ2, EXT_GZ, EXT_JSONL, EXT_LZ4, EXT_XZ,
    EXT_ZST,
};

/// Fresh reader registry holding every bundled codec.
///
/// Start from this to plug in extra formats, then pass the result to
/// [`RecordReader::open`] or [`DirectoryScan::records`].
pub fn builtin_readers() -> Result<ReaderRegistry> {
    ReaderRegistry::new()
        .with(EXT_ZST, Arc::new(ZstdCodec::default()))?
        .with(EXT_BZ2, Arc::new(Bz2Codec::default()))?
        .with(EXT_XZ, Arc::new(XzCodec::default()))?
        .with(EXT_GZ, Arc::new(GzCodec::default()))?
        .with(EXT_LZ4, Arc::new(Lz4Codec))?
        .with(EXT_JSONL, Arc::new(PassThroughCodec))
}

/// Fresh writer registry holding every bundled codec.
pub fn builtin_writers() -> Result<WriterRegistry> {
    WriterRegistry::new()
        .with(EXT_ZST, Arc::new(ZstdCodec::default()))?
        .with(EXT_BZ2, Arc::new(Bz2Codec::default()))?
        .with(EXT_XZ, Arc::new(XzCodec::default()))?
        .with(EXT_GZ, Arc::new(GzCodec::default()))?
        .with(EXT_LZ4, Arc::new(Lz4Codec))?
        .with(EXT_JSONL, Arc::new(PassThroughCodec))
}

/// Process-wide reader registry, built on first use and never mutated.
///
/// # Panics
/// Only if two bundled codecs claim the same extension, which the tests
/// rule out.
pub fn default_readers() -> &'static ReaderRegistry {
    static READERS: OnceLock<ReaderRegistry> = OnceLock::new();
    READERS.get_or_init(|| builtin_readers().expect("bundled reader extensions are unique"))
}

/// Process-wide writer registry, built on first use and never mutated.
///
/// # Panics
/// Only if two bundled codecs claim the same extension.
pub fn default_writers() -> &'static WriterRegistry {
    static WRITERS: OnceLock<WriterRegistry> = OnceLock::new();
    WRITERS.get_or_init(|| builtin_writers().expect("bundled writer extensions are unique"))
}

/// Every record of one compressed file, codec chosen by extension.
pub fn read_json_file(path: impl AsRef<Path>) -> Result<IntoRecords<Value>> {
    Ok(RecordReader::open(path, default_readers(), ReadOptions::default())?.into_records())
}

/// Every record of every file in `directory` whose extension is in
/// `extensions`, in sorted filename order, optionally starting at the file
/// named `resume_from`.
pub fn read_json_dir<I, S>(
    directory: impl Into<PathBuf>,
    extensions: I,
    resume_from: Option<&str>,
) -> Result<ScanRecords<'static, Value>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scan = DirectoryScan::new(directory).extensions(extensions);
    if let Some(name) = resume_from {
        scan = scan.resume_from(OsString::from(name));
    }
    scan.records(default_readers())
}

/// Create (or truncate) a compressed file, codec chosen by extension.
pub fn create_json_file(path: impl AsRef<Path>, options: WriteOptions) -> Result<RecordWriter> {
    RecordWriter::create(path, default_writers(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zjson_core::{Error, WriteCodec};

    #[test]
    fn bundled_extensions_register_cleanly() {
        let readers = builtin_readers().unwrap();
        let writers = builtin_writers().unwrap();
        let expected = vec![".bz2", ".gz", ".jsonl", ".lz4", ".xz", ".zst"];
        assert_eq!(readers.extensions().collect::<Vec<_>>(), expected);
        assert_eq!(writers.extensions().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn resolves_fixed_formats() {
        let readers = default_readers();
        assert_eq!(readers.resolve("RS_2020-01.zst").unwrap().name(), "zstd");
        assert_eq!(readers.resolve("dump.json.bz2").unwrap().name(), "bzip2");
        assert_eq!(readers.resolve("dump.xz").unwrap().name(), "xz");
        assert!(readers.resolve("dump.json").is_err());
        assert_eq!(default_writers().resolve("x.xz").unwrap().name(), "xz");
    }

    #[test]
    fn reader_and_writer_namespaces_are_independent() {
        // .zst is already taken in the reader table but not in a fresh writer table.
        let mut readers = builtin_readers().unwrap();
        assert!(matches!(
            readers.register(".zst", Arc::new(ZstdCodec::default())),
            Err(Error::DuplicateExtension(_))
        ));
        let mut writers = WriterRegistry::new();
        writers.register(".zst", Arc::new(ZstdCodec::default())).unwrap();
    }

    #[test]
    fn registry_accepts_new_formats() {
        let mut readers = builtin_readers().unwrap();
        readers.register(".ndjson", Arc::new(PassThroughCodec)).unwrap();
        assert_eq!(readers.resolve("a.ndjson").unwrap().name(), "passthrough");
    }

    #[test]
    fn default_levels() {
        assert_eq!(ZstdCodec::default().level, 3);
        assert_eq!(ZstdCodec::default().window_log_max, 31);
        assert_eq!(Bz2Codec::default().level, 9);
        assert_eq!(XzCodec::default().level, 6);
        assert_eq!(ZstdCodec::new(19).level, 19);
    }

    #[test]
    fn level_ranges_enforced() {
        let bad = [
            (&Bz2Codec::default() as &dyn WriteCodec, 0),
            (&Bz2Codec::default() as &dyn WriteCodec, 10),
            (&XzCodec::default() as &dyn WriteCodec, 10),
            (&GzCodec::default() as &dyn WriteCodec, -1),
            (&ZstdCodec::default() as &dyn WriteCodec, 99),
        ];
        for (codec, level) in bad {
            let sink = Box::new(std::io::sink());
            let result = codec.encoder(sink, &WriteOptions::default().level(level));
            assert!(
                matches!(result, Err(Error::InvalidLevel { level: l, .. }) if l == level),
                "{} accepted level {level}",
                codec.name()
            );
        }
    }

    mod events {
        use std::fmt;
        use std::sync::{Arc, Mutex};

        use tracing::field::{Field, Visit};
        use tracing::span::{Attributes, Id, Record};
        use tracing::{Event, Metadata, Subscriber};

        /// Collects the message of every event emitted while installed.
        #[derive(Clone, Default)]
        pub struct Recorder(pub Arc<Mutex<Vec<String>>>);

        struct Message<'a>(&'a mut String);

        impl Visit for Message<'_> {
            fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
                if field.name() == "message" {
                    *self.0 = format!("{value:?}");
                }
            }
        }

        impl Subscriber for Recorder {
            fn enabled(&self, _: &Metadata<'_>) -> bool {
                true
            }

            fn new_span(&self, _: &Attributes<'_>) -> Id {
                Id::from_u64(1)
            }

            fn record(&self, _: &Id, _: &Record<'_>) {}

            fn record_follows_from(&self, _: &Id, _: &Id) {}

            fn event(&self, event: &Event<'_>) {
                let mut message = String::new();
                event.record(&mut Message(&mut message));
                self.0.lock().unwrap().push(message);
            }

            fn enter(&self, _: &Id) {}

            fn exit(&self, _: &Id) {}
        }
    }

    #[test]
    fn every_encoder_traces_its_settings() {
        let recorder = events::Recorder::default();
        let codecs: [(&dyn WriteCodec, &str); 5] = [
            (&ZstdCodec::default(), "zstd encoder ready"),
            (&Bz2Codec::default(), "bzip2 encoder ready"),
            (&XzCodec::default(), "xz encoder ready"),
            (&GzCodec::default(), "gzip encoder ready"),
            (&Lz4Codec, "lz4 encoder ready"),
        ];
        tracing::subscriber::with_default(recorder.clone(), || {
            for (codec, _) in codecs {
                codec
                    .encoder(Box::new(std::io::sink()), &WriteOptions::default())
                    .unwrap();
            }
        });
        let seen = recorder.0.lock().unwrap();
        for (codec, message) in codecs {
            assert!(
                seen.iter().any(|m| m == message),
                "{} logged nothing, saw {seen:?}",
                codec.name()
            );
        }
    }
}
