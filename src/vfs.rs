//! Filesystem facade over ZIP containers and the host filesystem.
//!
//! [`ZipFs`] takes ordinary host paths. A path with a component ending in
//! `.zip` is served from that container's index, and a miss there is
//! [`ZipFsError::NotFound`]; every other path goes to the host filesystem
//! with the same arguments. Nothing global is patched: callers opt in by
//! going through a `ZipFs`.

use log::debug;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ZipFsError, ZipFsResult};
use crate::io::{read_dir_names, read_dir_names_blocking};
use crate::path::normalize;
use crate::resolve::Resolver;
use crate::zip::{Stat, ZipArchive};

/// Split a host path at the first component ending in `.zip`.
///
/// Returns `(container, entry)` with both halves normalized; `entry` is
/// relative to the container root and may be empty.
///
/// ```
/// use zipvfs::split_archive_path;
///
/// assert_eq!(
///     split_archive_path(r"C:\apps\mods.zip\lib\index.js"),
///     Some(("C:/apps/mods.zip".to_string(), "lib/index.js".to_string()))
/// );
/// assert_eq!(split_archive_path("/srv/plain/file.txt"), None);
/// ```
pub fn split_archive_path(path: &str) -> Option<(String, String)> {
    let path = normalize(path);
    let mut start = 0;
    for segment in path.split('/') {
        let end = start + segment.len();
        if segment.len() > ".zip".len() && segment.ends_with(".zip") {
            let entry = path[end..].trim_start_matches('/').to_string();
            return Some((path[..end].to_string(), entry));
        }
        start = end + 1;
    }
    None
}

/// Open archives keyed by normalized container path.
///
/// Owned by the caller; there is no eviction. An archive stays open until
/// [`ArchiveRegistry::remove`] or [`ArchiveRegistry::close_all`] closes it.
#[derive(Debug, Default)]
pub struct ArchiveRegistry {
    archives: Mutex<HashMap<String, Arc<ZipArchive>>>,
}

impl ArchiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<ZipArchive>>> {
        self.archives.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, container: &str) -> Option<Arc<ZipArchive>> {
        self.lock().get(&normalize(container)).cloned()
    }

    /// Blocking form of [`ArchiveRegistry::get_or_open`].
    pub fn get_or_open_blocking(&self, container: &str) -> ZipFsResult<Arc<ZipArchive>> {
        let key = normalize(container);
        let mut archives = self.lock();
        if let Some(archive) = archives.get(&key) {
            return Ok(archive.clone());
        }
        debug!("opening {key}");
        let archive = Arc::new(ZipArchive::open_blocking(container)?);
        archives.insert(key, archive.clone());
        Ok(archive)
    }

    /// The open archive for `container`, opening and indexing it on first
    /// use. If two callers race to open the same container, the first one
    /// registered wins and the other handle is closed.
    pub async fn get_or_open(&self, container: &str) -> ZipFsResult<Arc<ZipArchive>> {
        let key = normalize(container);
        if let Some(archive) = self.get(&key) {
            return Ok(archive);
        }
        debug!("opening {key}");
        let opened = Arc::new(ZipArchive::open(container).await?);
        let winner = self.lock().entry(key).or_insert_with(|| opened.clone()).clone();
        if !Arc::ptr_eq(&winner, &opened) {
            opened.close()?;
        }
        Ok(winner)
    }

    /// Unregister and close the archive for `container`.
    pub fn remove(&self, container: &str) -> ZipFsResult<bool> {
        let removed = self.lock().remove(&normalize(container));
        match removed {
            Some(archive) => {
                archive.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close every registered archive.
    pub fn close_all(&self) -> ZipFsResult<()> {
        let drained: Vec<_> = self.lock().drain().map(|(_, a)| a).collect();
        for archive in drained {
            archive.close()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// "Try the archive index, else the host filesystem" for host paths.
#[derive(Debug, Default)]
pub struct ZipFs {
    registry: ArchiveRegistry,
    resolver: Resolver,
}

impl ZipFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resolver(resolver: Resolver) -> Self {
        Self {
            registry: ArchiveRegistry::new(),
            resolver,
        }
    }

    pub fn registry(&self) -> &ArchiveRegistry {
        &self.registry
    }

    fn locate_blocking(&self, path: &str) -> ZipFsResult<Option<(Arc<ZipArchive>, String)>> {
        match split_archive_path(path) {
            Some((container, entry)) => {
                let archive = self.registry.get_or_open_blocking(&container)?;
                Ok(Some((archive, entry)))
            }
            None => Ok(None),
        }
    }

    async fn locate(&self, path: &str) -> ZipFsResult<Option<(Arc<ZipArchive>, String)>> {
        match split_archive_path(path) {
            Some((container, entry)) => {
                let archive = self.registry.get_or_open(&container).await?;
                Ok(Some((archive, entry)))
            }
            None => Ok(None),
        }
    }

    /// Blocking form of [`ZipFs::exists`].
    pub fn exists_blocking(&self, path: &str) -> ZipFsResult<bool> {
        if let Some((archive, entry)) = self.locate_blocking(path)? {
            return Ok(archive.contains_dir(&entry));
        }
        Ok(Path::new(path).exists())
    }

    pub async fn exists(&self, path: &str) -> ZipFsResult<bool> {
        if let Some((archive, entry)) = self.locate(path).await? {
            return Ok(archive.contains_dir(&entry));
        }
        Ok(tokio::fs::try_exists(path).await.unwrap_or(false))
    }

    /// Blocking form of [`ZipFs::is_dir`].
    pub fn is_dir_blocking(&self, path: &str) -> ZipFsResult<bool> {
        if let Some((archive, entry)) = self.locate_blocking(path)? {
            return Ok(archive_is_dir(&archive, &entry));
        }
        Ok(Path::new(path).is_dir())
    }

    /// True for directories inside an archive (explicit, implied, or the
    /// archive root) and for host directories.
    pub async fn is_dir(&self, path: &str) -> ZipFsResult<bool> {
        if let Some((archive, entry)) = self.locate(path).await? {
            return Ok(archive_is_dir(&archive, &entry));
        }
        Ok(tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    pub fn stat_blocking(&self, path: &str) -> ZipFsResult<Stat> {
        if let Some((archive, entry)) = self.locate_blocking(path)? {
            if entry.is_empty() {
                return Ok(Stat::Host { exists: true });
            }
            if !archive.contains_dir(&entry) {
                return Ok(Stat::Host { exists: false });
            }
            return archive.stat_blocking(&entry);
        }
        Ok(Stat::Host {
            exists: Path::new(path).exists(),
        })
    }

    pub async fn stat(&self, path: &str) -> ZipFsResult<Stat> {
        if let Some((archive, entry)) = self.locate(path).await? {
            if entry.is_empty() {
                return Ok(Stat::Host { exists: true });
            }
            if !archive.contains_dir(&entry) {
                return Ok(Stat::Host { exists: false });
            }
            return archive.stat(&entry).await;
        }
        Ok(Stat::Host {
            exists: tokio::fs::try_exists(path).await.unwrap_or(false),
        })
    }

    /// The container path itself reads as the host file it is.
    pub fn read_file_blocking(&self, path: &str) -> ZipFsResult<Vec<u8>> {
        let located = self.locate_blocking(path)?;
        if let Some((archive, entry)) = located.filter(|(_, e)| !e.is_empty()) {
            if !archive.contains(&entry) {
                return Err(ZipFsError::NotFound(normalize(path)));
            }
            return archive.read_file_blocking(&entry);
        }
        Ok(std::fs::read(path)?)
    }

    pub async fn read_file(&self, path: &str) -> ZipFsResult<Vec<u8>> {
        let located = self.locate(path).await?;
        if let Some((archive, entry)) = located.filter(|(_, e)| !e.is_empty()) {
            if !archive.contains(&entry) {
                return Err(ZipFsError::NotFound(normalize(path)));
            }
            return archive.read_file(&entry).await;
        }
        Ok(tokio::fs::read(path).await?)
    }

    pub fn read_to_string_blocking(&self, path: &str) -> ZipFsResult<String> {
        Ok(String::from_utf8(self.read_file_blocking(path)?)?)
    }

    pub async fn read_to_string(&self, path: &str) -> ZipFsResult<String> {
        Ok(String::from_utf8(self.read_file(path).await?)?)
    }

    pub fn readdir_blocking(&self, path: &str) -> ZipFsResult<Vec<String>> {
        if let Some((archive, entry)) = self.locate_blocking(path)? {
            if !archive.contains_dir(&entry) {
                return Err(ZipFsError::NotFound(normalize(path)));
            }
            return archive.readdir_blocking(&entry);
        }
        Ok(read_dir_names_blocking(path)?)
    }

    pub async fn readdir(&self, path: &str) -> ZipFsResult<Vec<String>> {
        if let Some((archive, entry)) = self.locate(path).await? {
            if !archive.contains_dir(&entry) {
                return Err(ZipFsError::NotFound(normalize(path)));
            }
            return archive.readdir(&entry).await;
        }
        Ok(read_dir_names(path).await?)
    }

    /// Paths inside a container come back as container path joined with the
    /// entry path; host paths are canonicalized by the host.
    pub fn realpath(&self, path: &str) -> ZipFsResult<String> {
        if let Some((archive, entry)) = self.locate_blocking(path)? {
            return Ok(archive.realpath(&entry));
        }
        Ok(normalize(&std::fs::canonicalize(path)?.to_string_lossy()))
    }

    /// Blocking form of [`ZipFs::resolve`].
    pub fn resolve_blocking(&self, path: &str) -> ZipFsResult<Option<String>> {
        match self.locate_blocking(path)? {
            Some((archive, entry)) => self.resolver.resolve_blocking(&archive, &entry),
            None => Ok(None),
        }
    }

    /// Resolve a module request inside a container to the real path of the
    /// file it names. `None` for host paths and for requests that resolve to
    /// nothing.
    pub async fn resolve(&self, path: &str) -> ZipFsResult<Option<String>> {
        match self.locate(path).await? {
            Some((archive, entry)) => self.resolver.resolve(&archive, &entry).await,
            None => Ok(None),
        }
    }
}

fn archive_is_dir(archive: &ZipArchive, entry: &str) -> bool {
    archive.contains_dir(entry) && archive.lookup(entry).is_none_or(|e| e.is_directory)
}
