pub mod codec;
pub mod error;
pub mod format;
pub mod options;
pub mod position;
pub mod reader;
pub mod registry;
pub mod search;
pub mod walk;
pub mod writer;

pub use codec::{Encoder, ReadCodec, Sink, Source, WriteCodec};
pub use error::{Error, RecordErrorKind, Result};
pub use format::{extension_of, EXT_BZ2, EXT_GZ, EXT_JSONL, EXT_LZ4, EXT_XZ, EXT_ZST};
pub use options::{ErrorPolicy, ReadOptions, WriteOptions};
pub use reader::{IntoRecords, RecordReader, Records};
pub use registry::{ReaderRegistry, Registry, WriterRegistry};
pub use walk::{DirectoryScan, ScanRecords};
pub use writer::RecordWriter;
