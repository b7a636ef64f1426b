//! Indexed, random-access view of one ZIP container.

use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ZipFsError, ZipFsResult};
use crate::io::{LocalFileReader, ReadAt, read_dir_names, read_dir_names_blocking};
use crate::path::{base_name, entry_key, join, normalize};

use super::extractor::ZipExtractor;
use super::structures::{CompressionMethod, ZipEntry};

/// Text encodings a read can be decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
}

/// Options for [`ZipArchive::read_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
    /// Decode the contents to text instead of returning raw bytes.
    pub encoding: Option<Encoding>,
}

/// Result of a read: raw bytes, or text when an encoding was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Bytes(Vec<u8>),
    Text(String),
}

impl FileContents {
    fn decode(bytes: Vec<u8>, options: ReadOptions) -> ZipFsResult<Self> {
        Ok(match options.encoding {
            None => FileContents::Bytes(bytes),
            Some(Encoding::Utf8) => FileContents::Text(String::from_utf8(bytes)?),
        })
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileContents::Bytes(b) => b,
            FileContents::Text(s) => s.into_bytes(),
        }
    }
}

/// Metadata of an indexed entry, served from the index without I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStat {
    pub name: String,
    pub is_directory: bool,
    pub size: u64,
    pub compressed_size: u64,
    pub compression_method: CompressionMethod,
    pub crc32: u32,
    /// (year, month, day, hour, minute, second)
    pub modified: (u16, u8, u8, u8, u8, u8),
}

impl From<&ZipEntry> for EntryStat {
    fn from(e: &ZipEntry) -> Self {
        let (year, month, day) = e.mod_date();
        let (hour, minute, second) = e.mod_time();
        Self {
            name: e.name.clone(),
            is_directory: e.is_directory,
            size: e.uncompressed_size,
            compressed_size: e.compressed_size,
            compression_method: e.compression_method,
            crc32: e.crc32,
            modified: (year, month, day, hour, minute, second),
        }
    }
}

/// Answer to a `stat` query.
///
/// Paths the index doesn't know get a host existence probe only, not a
/// full host stat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stat {
    Entry(EntryStat),
    /// A directory with no record of its own, implied by deeper entries.
    ImpliedDir { name: String },
    Host { exists: bool },
}

impl Stat {
    pub fn exists(&self) -> bool {
        match self {
            Stat::Entry(_) | Stat::ImpliedDir { .. } => true,
            Stat::Host { exists } => *exists,
        }
    }

    pub fn is_dir(&self) -> bool {
        match self {
            Stat::Entry(e) => e.is_directory,
            Stat::ImpliedDir { .. } => true,
            Stat::Host { .. } => false,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Stat::Entry(e) if !e.is_directory)
    }

    pub fn entry(&self) -> Option<&EntryStat> {
        match self {
            Stat::Entry(e) => Some(e),
            _ => None,
        }
    }
}

/// An open ZIP container with its central directory indexed.
///
/// The index is built once by [`ZipArchive::open`] and never changes. Keys
/// are entry names relative to the archive root; a directory `a/` is
/// indexed as both `a/` and `a`. Paths the index doesn't know are passed to
/// the host filesystem unchanged.
///
/// All reads are positioned reads against one shared descriptor, so async
/// reads may be interleaved freely. The descriptor is released by
/// [`ZipArchive::close`], after which every operation fails with
/// [`ZipFsError::Closed`].
pub struct ZipArchive {
    path: String,
    extractor: ZipExtractor<dyn ReadAt>,
    entries: Vec<ZipEntry>,
    /// Index keys in central directory order.
    keys: Vec<String>,
    index: HashMap<String, usize>,
    closed: AtomicBool,
}

impl std::fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchive")
            .field("path", &self.path)
            .field("size", &self.extractor.parser().size())
            .field("entries", &self.entries.len())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl ZipArchive {
    /// Open and index the container at `path`.
    pub async fn open(path: impl AsRef<Path>) -> ZipFsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let label = path.to_string_lossy().into_owned();
        let reader = tokio::task::spawn_blocking(move || LocalFileReader::new(&path)).await??;
        Self::from_reader(label, Arc::new(reader)).await
    }

    /// Blocking form of [`ZipArchive::open`].
    pub fn open_blocking(path: impl AsRef<Path>) -> ZipFsResult<Self> {
        let path = path.as_ref();
        let reader = LocalFileReader::new(path)?;
        Self::from_reader_blocking(path.to_string_lossy().into_owned(), Arc::new(reader))
    }

    /// Index an archive served by any [`ReadAt`] source. `path` is only used
    /// for [`ZipArchive::realpath`] and diagnostics.
    pub async fn from_reader(path: String, reader: Arc<dyn ReadAt>) -> ZipFsResult<Self> {
        let extractor = ZipExtractor::new(reader);
        match extractor.list_entries().await {
            Ok(entries) => Ok(Self::build(path, extractor, entries)),
            Err(e) => {
                extractor.parser().reader().close();
                Err(e)
            }
        }
    }

    /// Blocking form of [`ZipArchive::from_reader`].
    pub fn from_reader_blocking(path: String, reader: Arc<dyn ReadAt>) -> ZipFsResult<Self> {
        let extractor = ZipExtractor::new(reader);
        match extractor.list_entries_blocking() {
            Ok(entries) => Ok(Self::build(path, extractor, entries)),
            Err(e) => {
                extractor.parser().reader().close();
                Err(e)
            }
        }
    }

    fn build(path: String, extractor: ZipExtractor<dyn ReadAt>, entries: Vec<ZipEntry>) -> Self {
        let mut keys = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            // Stored keys go through the same transform as lookups.
            let key = entry_key(&entry.name);
            if key.is_empty() || key == "/" {
                debug!("{path}: skipping root entry {:?}", entry.name);
                continue;
            }
            let mut names = Vec::with_capacity(2);
            if let Some(alias) = key.strip_suffix('/') {
                names.push(alias.to_string());
            }
            names.push(key);

            for name in names {
                match index.insert(name.clone(), i) {
                    None => keys.push(name),
                    Some(_) => warn!("{path}: duplicate entry {name}, using the later record"),
                }
            }
        }

        debug!(
            "{path}: indexed {} entries under {} keys",
            entries.len(),
            keys.len()
        );

        Self {
            path: normalize(&path),
            extractor,
            entries,
            keys,
            index,
            closed: AtomicBool::new(false),
        }
    }

    /// Normalized path of the container itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Total byte length of the container.
    pub fn size(&self) -> u64 {
        self.extractor.parser().size()
    }

    /// Number of logical entries (central directory records).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logical entries in central directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Index keys in central directory order, directory aliases included.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// The entry indexed under `path`, if any.
    pub fn lookup(&self, path: &str) -> Option<&ZipEntry> {
        self.index.get(&entry_key(path)).map(|&i| &self.entries[i])
    }

    /// True iff `path` is an index key. No host probe.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(&entry_key(path))
    }

    /// True if `path` names something listable inside the archive: the
    /// root, an index key, or a directory only implied by deeper entries.
    pub fn contains_dir(&self, path: &str) -> bool {
        let key = entry_key(path);
        if key.is_empty() || self.index.contains_key(&key) {
            return true;
        }
        let prefix = join(&key, "/");
        self.keys.iter().any(|k| k.starts_with(&prefix))
    }

    fn check_open(&self) -> ZipFsResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ZipFsError::Closed);
        }
        Ok(())
    }

    /// Read and decompress an entry, or read the host file at `path` if the
    /// index doesn't know it.
    pub async fn read_file(&self, path: &str) -> ZipFsResult<Vec<u8>> {
        self.check_open()?;
        match self.lookup(path) {
            Some(entry) => self.extractor.extract_to_memory(entry).await,
            None => {
                debug!("{}: {path} not indexed, reading host file", self.path);
                Ok(tokio::fs::read(path).await?)
            }
        }
    }

    /// Blocking form of [`ZipArchive::read_file`].
    pub fn read_file_blocking(&self, path: &str) -> ZipFsResult<Vec<u8>> {
        self.check_open()?;
        match self.lookup(path) {
            Some(entry) => self.extractor.extract_to_memory_blocking(entry),
            None => {
                debug!("{}: {path} not indexed, reading host file", self.path);
                Ok(std::fs::read(path)?)
            }
        }
    }

    /// [`ZipArchive::read_file`] with optional text decoding.
    pub async fn read_with(&self, path: &str, options: ReadOptions) -> ZipFsResult<FileContents> {
        FileContents::decode(self.read_file(path).await?, options)
    }

    /// Blocking form of [`ZipArchive::read_with`].
    pub fn read_with_blocking(
        &self,
        path: &str,
        options: ReadOptions,
    ) -> ZipFsResult<FileContents> {
        FileContents::decode(self.read_file_blocking(path)?, options)
    }

    pub async fn read_to_string(&self, path: &str) -> ZipFsResult<String> {
        Ok(String::from_utf8(self.read_file(path).await?)?)
    }

    pub fn read_to_string_blocking(&self, path: &str) -> ZipFsResult<String> {
        Ok(String::from_utf8(self.read_file_blocking(path)?)?)
    }

    /// Describe an indexed entry without I/O, or probe the host for
    /// existence if the index doesn't know `path`.
    pub async fn stat(&self, path: &str) -> ZipFsResult<Stat> {
        self.check_open()?;
        if let Some(stat) = self.index_stat(path) {
            return Ok(stat);
        }
        Ok(Stat::Host {
            exists: tokio::fs::try_exists(path).await.unwrap_or(false),
        })
    }

    /// Blocking form of [`ZipArchive::stat`].
    pub fn stat_blocking(&self, path: &str) -> ZipFsResult<Stat> {
        self.check_open()?;
        if let Some(stat) = self.index_stat(path) {
            return Ok(stat);
        }
        Ok(Stat::Host {
            exists: Path::new(path).exists(),
        })
    }

    fn index_stat(&self, path: &str) -> Option<Stat> {
        if let Some(entry) = self.lookup(path) {
            return Some(Stat::Entry(entry.into()));
        }
        let key = entry_key(path);
        if self.contains_dir(path) && !key.is_empty() {
            let name = format!("{}/", key.trim_end_matches('/'));
            return Some(Stat::ImpliedDir { name });
        }
        None
    }

    /// True iff `path` is an index key, a directory implied by deeper
    /// entries, or exists on the host.
    pub fn exists(&self, path: &str) -> ZipFsResult<bool> {
        self.check_open()?;
        Ok(self.index_stat(path).is_some() || Path::new(path).exists())
    }

    /// Names of the direct children of `dir`, in index order.
    ///
    /// Directories only implied by deeper entries are listed once. A `dir`
    /// unknown to the archive is listed from the host instead.
    pub async fn readdir(&self, dir: &str) -> ZipFsResult<Vec<String>> {
        self.check_open()?;
        if let Some(children) = self.children(dir) {
            return Ok(children);
        }
        debug!("{}: {dir} not indexed, listing host directory", self.path);
        Ok(read_dir_names(dir).await?)
    }

    /// Blocking form of [`ZipArchive::readdir`].
    pub fn readdir_blocking(&self, dir: &str) -> ZipFsResult<Vec<String>> {
        self.check_open()?;
        if let Some(children) = self.children(dir) {
            return Ok(children);
        }
        debug!("{}: {dir} not indexed, listing host directory", self.path);
        Ok(read_dir_names_blocking(dir)?)
    }

    fn children(&self, dir: &str) -> Option<Vec<String>> {
        if !self.contains_dir(dir) {
            return None;
        }
        let key = entry_key(dir);
        let prefix = if key.is_empty() {
            String::new()
        } else {
            join(&key, "/")
        };

        let mut out: Vec<String> = Vec::new();
        for k in &self.keys {
            let Some(rest) = k.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let child = base_name(rest.split_inclusive('/').next().unwrap_or_default());
            if !child.is_empty() && !out.iter().any(|c| c == child) {
                out.push(child.to_string());
            }
        }
        Some(out)
    }

    /// `path` as seen through the archive: the container's path joined with
    /// the entry path. No existence check.
    pub fn realpath(&self, path: &str) -> String {
        join(&self.path, path)
    }

    /// Release the descriptor. In-flight async reads complete; anything
    /// issued afterwards fails with [`ZipFsError::Closed`].
    pub fn close(&self) -> ZipFsResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ZipFsError::Closed);
        }
        self.extractor.parser().reader().close();
        debug!("{}: closed", self.path);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
