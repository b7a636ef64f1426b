//! Module entry resolution inside an archive.
//!
//! Given a request like `lib/util` this finds the file a module loader
//! would pick: the path itself, the path with a known extension, the
//! `main` named by a `package.json`, or an `index` file.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{ZipFsError, ZipFsResult};
use crate::path::{entry_key, join};
use crate::zip::ZipArchive;

pub const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json", ".node"];

/// The `main` field of `<dir>/package.json` inside `archive`.
///
/// `Ok(None)` when there's no descriptor or it has no string `main`; a
/// descriptor that isn't valid JSON is [`ZipFsError::InvalidPackage`].
pub async fn package_main(archive: &ZipArchive, dir: &str) -> ZipFsResult<Option<String>> {
    let json_path = join(&entry_key(dir), "package.json");
    if !archive.contains(&json_path) {
        return Ok(None);
    }
    let text = archive.read_to_string(&json_path).await?;
    parse_main(archive, &json_path, &text)
}

/// Blocking form of [`package_main`].
pub fn package_main_blocking(archive: &ZipArchive, dir: &str) -> ZipFsResult<Option<String>> {
    let json_path = join(&entry_key(dir), "package.json");
    if !archive.contains(&json_path) {
        return Ok(None);
    }
    let text = archive.read_to_string_blocking(&json_path)?;
    parse_main(archive, &json_path, &text)
}

fn parse_main(archive: &ZipArchive, json_path: &str, text: &str) -> ZipFsResult<Option<String>> {
    let value: Value = serde_json::from_str(text).map_err(|source| ZipFsError::InvalidPackage {
        path: archive.realpath(json_path),
        source,
    })?;
    Ok(value.get("main").and_then(Value::as_str).map(str::to_string))
}

/// Resolves module requests against archives, caching package `main`
/// lookups per (archive, directory) for its own lifetime.
#[derive(Debug)]
pub struct Resolver {
    extensions: Vec<String>,
    package_cache: Mutex<HashMap<(String, String), Option<String>>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_EXTENSIONS.iter().copied())
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
            package_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Cached [`package_main`]. Errors aren't cached.
    pub async fn package_main(
        &self,
        archive: &ZipArchive,
        dir: &str,
    ) -> ZipFsResult<Option<String>> {
        let key = cache_key(archive, dir);
        if let Some(hit) = self.cache().get(&key) {
            return Ok(hit.clone());
        }
        let main = package_main(archive, dir).await?;
        self.cache().insert(key, main.clone());
        Ok(main)
    }

    /// Blocking form of [`Resolver::package_main`].
    pub fn package_main_blocking(
        &self,
        archive: &ZipArchive,
        dir: &str,
    ) -> ZipFsResult<Option<String>> {
        let key = cache_key(archive, dir);
        if let Some(hit) = self.cache().get(&key) {
            return Ok(hit.clone());
        }
        let main = package_main_blocking(archive, dir)?;
        self.cache().insert(key, main.clone());
        Ok(main)
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Option<String>>> {
        self.package_cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Real path of the file `request` resolves to, if any.
    ///
    /// A request ending in `/` only resolves as a directory: through its
    /// `package.json` or its `index` file.
    pub async fn resolve(
        &self,
        archive: &ZipArchive,
        request: &str,
    ) -> ZipFsResult<Option<String>> {
        let (entry, as_file) = split_request(request);
        if as_file {
            if let Some(found) = self.try_file_or_extensions(archive, &entry) {
                return Ok(Some(found));
            }
        }
        let main = self.package_main(archive, &entry).await?;
        Ok(self.try_package_or_index(archive, &entry, main))
    }

    /// Blocking form of [`Resolver::resolve`].
    pub fn resolve_blocking(
        &self,
        archive: &ZipArchive,
        request: &str,
    ) -> ZipFsResult<Option<String>> {
        let (entry, as_file) = split_request(request);
        if as_file {
            if let Some(found) = self.try_file_or_extensions(archive, &entry) {
                return Ok(Some(found));
            }
        }
        let main = self.package_main_blocking(archive, &entry)?;
        Ok(self.try_package_or_index(archive, &entry, main))
    }

    fn try_file(&self, archive: &ZipArchive, path: &str) -> Option<String> {
        match archive.lookup(path) {
            Some(e) if !e.is_directory => Some(archive.realpath(path)),
            _ => None,
        }
    }

    fn try_extensions(&self, archive: &ZipArchive, path: &str) -> Option<String> {
        self.extensions
            .iter()
            .find_map(|ext| self.try_file(archive, &format!("{path}{ext}")))
    }

    fn try_file_or_extensions(&self, archive: &ZipArchive, path: &str) -> Option<String> {
        self.try_file(archive, path)
            .or_else(|| self.try_extensions(archive, path))
    }

    fn try_package_or_index(
        &self,
        archive: &ZipArchive,
        dir: &str,
        main: Option<String>,
    ) -> Option<String> {
        main.and_then(|main| {
            let filename = join(dir, &main);
            self.try_file_or_extensions(archive, &filename)
                .or_else(|| self.try_extensions(archive, &join(&filename, "index")))
        })
        .or_else(|| self.try_extensions(archive, &join(dir, "index")))
    }
}

fn cache_key(archive: &ZipArchive, dir: &str) -> (String, String) {
    (archive.path().to_string(), entry_key(dir))
}

/// The request's index key without a trailing slash, and whether it may
/// name a file.
fn split_request(request: &str) -> (String, bool) {
    let key = entry_key(request);
    (key.trim_end_matches('/').to_string(), !request.ends_with('/'))
}
