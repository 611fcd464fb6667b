//! Sequential scan over every matching file in a directory.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::format::{extension_of, normalize_extension};
use crate::options::ReadOptions;
use crate::reader::{IntoRecords, RecordReader};
use crate::registry::ReaderRegistry;
use crate::search::rightmost_le;
use crate::{Error, Result};

/// Builder for a directory scan.
///
/// Files are visited in byte-wise sorted filename order. With a resume
/// point, everything sorting before it is skipped; the resume file itself
/// must exist. Only files whose extension is in the requested set are read.
#[derive(Debug, Clone)]
pub struct DirectoryScan {
    directory: PathBuf,
    extensions: BTreeSet<String>,
    resume_from: Option<OsString>,
    options: ReadOptions,
}

impl DirectoryScan {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            extensions: BTreeSet::new(),
            resume_from: None,
            options: ReadOptions::default(),
        }
    }

    /// Add extensions to read, with or without the leading dot.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions
            .extend(extensions.into_iter().map(|e| normalize_extension(e.as_ref())));
        self
    }

    /// Start at this filename (a bare name, not a path).
    pub fn resume_from(mut self, name: impl Into<OsString>) -> Self {
        self.resume_from = Some(name.into());
        self
    }

    pub fn options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The files the scan would read, in order.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let dir_err = |e: io::Error| Error::io(&self.directory, e);
        let mut names = fs::read_dir(&self.directory)
            .map_err(dir_err)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<OsString>>>()
            .map_err(dir_err)?;
        names.sort();

        if let Some(resume) = &self.resume_from {
            match rightmost_le(&names, resume) {
                Some(start) if names[start] == *resume => {
                    info!(
                        directory = %self.directory.display(),
                        resume_from = %resume.to_string_lossy(),
                        skipped = start,
                        "resuming directory scan"
                    );
                    names.drain(..start);
                }
                _ => {
                    return Err(Error::FileNotFound {
                        directory: self.directory.clone(),
                        name: resume.to_string_lossy().into_owned(),
                    })
                }
            }
        }

        Ok(names
            .into_iter()
            .filter(|name| extension_of(name).is_some_and(|ext| self.extensions.contains(&ext)))
            .map(|name| self.directory.join(name))
            .collect())
    }

    /// Lazily chain the records of every selected file.
    ///
    /// Fails up front if a requested extension has no codec in `registry`,
    /// if the directory cannot be listed, or if the resume file is missing.
    /// Files are opened one at a time as the previous one is exhausted.
    pub fn records<'r, T: DeserializeOwned>(
        &self,
        registry: &'r ReaderRegistry,
    ) -> Result<ScanRecords<'r, T>> {
        if let Some(missing) = self.extensions.iter().find(|e| !registry.contains(e)) {
            return Err(Error::UnknownExtension {
                extension: missing.clone(),
                path: self.directory.clone(),
            });
        }
        let files = self.files()?;
        debug!(directory = %self.directory.display(), files = files.len(), "planned directory scan");
        Ok(ScanRecords {
            registry,
            options: self.options.clone(),
            files: files.into_iter(),
            current: None,
            done: false,
        })
    }
}

/// Records from a [`DirectoryScan`], file after file.
///
/// The first error (from opening a file or from any record) is yielded once
/// and ends the scan.
pub struct ScanRecords<'r, T = Value> {
    registry: &'r ReaderRegistry,
    options: ReadOptions,
    files: std::vec::IntoIter<PathBuf>,
    current: Option<IntoRecords<T>>,
    done: bool,
}

impl<T> ScanRecords<'_, T> {
    /// The file currently being read.
    pub fn current_file(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.reader().path())
    }

    /// Compressed bytes consumed from the current file.
    pub fn compressed_position(&self) -> u64 {
        self.current
            .as_ref()
            .map_or(0, |c| c.reader().compressed_position())
    }

    /// Files not yet opened.
    pub fn remaining_files(&self) -> &[PathBuf] {
        self.files.as_slice()
    }
}

impl<T: DeserializeOwned> Iterator for ScanRecords<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(err)) => {
                        self.done = true;
                        self.current = None;
                        return Some(Err(err));
                    }
                    None => {
                        if let Some(finished) = self.current.take() {
                            finished.into_inner().close();
                        }
                    }
                }
            }

            let path = self.files.next()?;
            info!(path = %path.display(), "reading file");
            match RecordReader::open(&path, self.registry, self.options.clone()) {
                Ok(reader) => self.current = Some(reader.into_records()),
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<T: DeserializeOwned> FusedIterator for ScanRecords<'_, T> {}
