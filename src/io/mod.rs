mod local;

pub use local::LocalFileReader;

use async_trait::async_trait;

use crate::error::{ZipFsError, ZipFsResult};

/// Trait for random access reading from a data source.
///
/// Every read is positioned: there is no shared cursor, so reads issued
/// concurrently against the same source never disturb each other.
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ZipFsResult<usize>;

    /// Blocking form of [`ReadAt::read_at`]
    fn read_at_blocking(&self, offset: u64, buf: &mut [u8]) -> ZipFsResult<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Release the underlying source. Later reads fail with
    /// [`ZipFsError::Closed`].
    fn close(&self);
}

/// Fill `buf` from `offset`, failing with [`ZipFsError::ShortRead`] if the
/// source runs out first.
pub async fn read_exact_at<R: ReadAt + ?Sized>(
    reader: &R,
    offset: u64,
    buf: &mut [u8],
) -> ZipFsResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read_at(offset + filled as u64, &mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    check_filled(buf.len(), filled)
}

/// Blocking form of [`read_exact_at`]
pub fn read_exact_at_blocking<R: ReadAt + ?Sized>(
    reader: &R,
    offset: u64,
    buf: &mut [u8],
) -> ZipFsResult<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read_at_blocking(offset + filled as u64, &mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    check_filled(buf.len(), filled)
}

/// Names of the entries of a host directory, in the order the host
/// returns them.
pub async fn read_dir_names(path: &str) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut rd = tokio::fs::read_dir(path).await?;
    while let Some(entry) = rd.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Blocking form of [`read_dir_names`]
pub fn read_dir_names_blocking(path: &str) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

fn check_filled(expected: usize, actual: usize) -> ZipFsResult<()> {
    if actual < expected {
        return Err(ZipFsError::ShortRead { expected, actual });
    }
    Ok(())
}
