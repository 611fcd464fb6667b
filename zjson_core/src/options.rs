//! Read and write configuration with sensible defaults.

/// What a reader does with a line that is not valid UTF-8 or not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Yield the error (file, line number, raw prefix) and end the stream.
    #[default]
    Abort,

    /// Log the error at `warn`, count it, and continue with the next line.
    ///
    /// Decompression failures still end the stream: the codec cannot resync.
    Skip,
}

/// Options applied when opening a [`RecordReader`](crate::RecordReader).
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub error_policy: ErrorPolicy,
}

impl ReadOptions {
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}

/// Options applied when creating a [`RecordWriter`](crate::RecordWriter).
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Compression level; `None` picks the codec's own default.
    pub level: Option<i32>,
}

impl WriteOptions {
    pub fn level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    /// `level` if set, otherwise `default`, checked against `range`.
    pub fn level_in(
        &self,
        codec: &'static str,
        default: i32,
        range: std::ops::RangeInclusive<i32>,
    ) -> crate::Result<i32> {
        let level = self.level.unwrap_or(default);
        if range.contains(&level) {
            Ok(level)
        } else {
            Err(crate::Error::InvalidLevel { codec, level })
        }
    }
}
