use super::ReadAt;
use crate::error::{ZipFsError, ZipFsResult};
use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Local file reader with random access support.
///
/// One descriptor is opened per reader and shared by every read. Async reads
/// run the positioned read on tokio's blocking pool and hold their own
/// reference to the descriptor, so a read already in flight when
/// [`ReadAt::close`] is called still completes.
pub struct LocalFileReader {
    file: RwLock<Option<Arc<File>>>,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> ZipFsResult<Self> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: RwLock::new(Some(Arc::new(file))),
            size,
        })
    }

    fn handle(&self) -> ZipFsResult<Arc<File>> {
        let guard = self.file.read().unwrap_or_else(|e| e.into_inner());
        guard.clone().ok_or(ZipFsError::Closed)
    }
}

fn pread(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }

    #[cfg(windows)]
    {
        // seek_read moves the handle's cursor, but every read here passes its
        // own offset so nothing depends on it.
        use std::os::windows::fs::FileExt;
        file.seek_read(buf, offset)
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> ZipFsResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let file = self.handle()?;
        let len = buf.len();
        let (data, n) = tokio::task::spawn_blocking(move || {
            let mut data = vec![0u8; len];
            pread(&file, offset, &mut data).map(|n| (data, n))
        })
        .await??;
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }

    fn read_at_blocking(&self, offset: u64, buf: &mut [u8]) -> ZipFsResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let file = self.handle()?;
        Ok(pread(&file, offset, buf)?)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn close(&self) {
        let mut guard = self.file.write().unwrap_or_else(|e| e.into_inner());
        guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn positioned_blocking_reads() {
        let f = temp_file(b"0123456789");
        let reader = LocalFileReader::new(f.path()).unwrap();
        assert_eq!(reader.size(), 10);

        let mut buf = [0u8; 3];
        assert_eq!(reader.read_at_blocking(4, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"456");
        // No shared cursor: the same offset reads the same bytes again.
        assert_eq!(reader.read_at_blocking(4, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"456");
    }

    #[tokio::test]
    async fn async_reads_and_close() {
        let f = temp_file(b"abcdef");
        let reader = LocalFileReader::new(f.path()).unwrap();

        let mut buf = [0u8; 4];
        let n = reader.read_at(4, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ef");

        reader.close();
        assert!(matches!(
            reader.read_at(0, &mut buf).await,
            Err(ZipFsError::Closed)
        ));
        assert!(matches!(
            reader.read_at_blocking(0, &mut buf),
            Err(ZipFsError::Closed)
        ));
    }
}
