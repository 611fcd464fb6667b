use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::codec::{ReadCodec, WriteCodec};
use crate::format::{extension_of, normalize_extension};
use crate::{Error, Result};

/// Extension → strategy table.
///
/// Populated by ordinary `register` calls at startup and only read after
/// that. Readers and writers each get their own table, so `.zst` may be
/// registered once in each.
pub struct Registry<C: ?Sized> {
    by_extension: BTreeMap<String, Arc<C>>,
}

pub type ReaderRegistry = Registry<dyn ReadCodec>;
pub type WriterRegistry = Registry<dyn WriteCodec>;

impl<C: ?Sized> Default for Registry<C> {
    fn default() -> Self {
        Self {
            by_extension: BTreeMap::new(),
        }
    }
}

impl<C: ?Sized> Registry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `extension` (with or without leading dot) to `codec`.
    pub fn register(&mut self, extension: &str, codec: Arc<C>) -> Result<()> {
        let key = normalize_extension(extension);
        if self.by_extension.contains_key(&key) {
            return Err(Error::DuplicateExtension(key));
        }
        self.by_extension.insert(key, codec);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, extension: &str, codec: Arc<C>) -> Result<Self> {
        self.register(extension, codec)?;
        Ok(self)
    }

    /// Strategy for the extension of `path`.
    pub fn resolve(&self, path: impl AsRef<Path>) -> Result<Arc<C>> {
        let path = path.as_ref();
        let extension = extension_of(path).unwrap_or_default();
        self.by_extension
            .get(&extension)
            .cloned()
            .ok_or_else(|| Error::UnknownExtension {
                extension,
                path: path.to_path_buf(),
            })
    }

    /// Strategy for an extension given directly.
    pub fn get(&self, extension: &str) -> Option<&Arc<C>> {
        self.by_extension.get(&normalize_extension(extension))
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Registered extensions in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_extension.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_extension.is_empty()
    }
}

impl<C: ?Sized> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_extension.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Source;
    use std::io;

    struct Dummy(&'static str);

    impl ReadCodec for Dummy {
        fn name(&self) -> &'static str {
            self.0
        }

        fn decoder(&self, source: Source) -> io::Result<Source> {
            Ok(source)
        }
    }

    fn registry() -> ReaderRegistry {
        let mut r = ReaderRegistry::new();
        r.register(".zst", Arc::new(Dummy("zst"))).unwrap();
        r.register("bz2", Arc::new(Dummy("bz2"))).unwrap();
        r
    }

    #[test]
    fn resolves_by_final_extension() {
        let r = registry();
        assert_eq!(r.resolve("dumps/RC_2019.json.zst").unwrap().name(), "zst");
        assert_eq!(r.resolve("x.bz2").unwrap().name(), "bz2");
    }

    #[test]
    fn unknown_extension() {
        let err = registry().resolve("notes.txt").err().unwrap();
        match err {
            Error::UnknownExtension { extension, path } => {
                assert_eq!(extension, ".txt");
                assert_eq!(path, Path::new("notes.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_extension_is_unknown() {
        assert!(matches!(
            registry().resolve("README"),
            Err(Error::UnknownExtension { .. })
        ));
    }

    #[test]
    fn duplicate_extension_rejected_even_without_dot() {
        let mut r = registry();
        let err = r.register("zst", Arc::new(Dummy("other"))).unwrap_err();
        assert!(matches!(err, Error::DuplicateExtension(ref e) if e == ".zst"));
        // The first binding is untouched.
        assert_eq!(r.resolve("a.zst").unwrap().name(), "zst");
    }

    #[test]
    fn lists_sorted_extensions() {
        let r = registry();
        assert_eq!(r.extensions().collect::<Vec<_>>(), vec![".bz2", ".zst"]);
        assert_eq!(r.len(), 2);
        assert!(r.contains("zst"));
        assert!(!r.contains(".xz"));
    }
}
