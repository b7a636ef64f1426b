use flate2::read::DeflateDecoder;
use std::io::Read;
use std::sync::Arc;

use crate::error::{ZipFsError, ZipFsResult};
use crate::io::{ReadAt, read_exact_at, read_exact_at_blocking};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipEntry};

/// Reads entry payloads and decompresses them.
pub struct ZipExtractor<R: ReadAt + ?Sized> {
    parser: ZipParser<R>,
}

impl<R: ReadAt + ?Sized> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    pub fn parser(&self) -> &ZipParser<R> {
        &self.parser
    }

    /// List all entries in the archive
    pub async fn list_entries(&self) -> ZipFsResult<Vec<ZipEntry>> {
        self.parser.list_entries().await
    }

    /// Blocking form of [`ZipExtractor::list_entries`]
    pub fn list_entries_blocking(&self) -> ZipFsResult<Vec<ZipEntry>> {
        self.parser.list_entries_blocking()
    }

    /// Extract entry data to memory
    pub async fn extract_to_memory(&self, entry: &ZipEntry) -> ZipFsResult<Vec<u8>> {
        let data_offset = self.parser.data_offset(entry).await?;
        let len = self.parser.span(data_offset, entry.compressed_size)?;
        let mut buf = vec![0u8; len];
        read_exact_at(&**self.parser.reader(), data_offset, &mut buf).await?;
        decompress(entry, buf)
    }

    /// Blocking form of [`ZipExtractor::extract_to_memory`]
    pub fn extract_to_memory_blocking(&self, entry: &ZipEntry) -> ZipFsResult<Vec<u8>> {
        let data_offset = self.parser.data_offset_blocking(entry)?;
        let len = self.parser.span(data_offset, entry.compressed_size)?;
        let mut buf = vec![0u8; len];
        read_exact_at_blocking(&**self.parser.reader(), data_offset, &mut buf)?;
        decompress(entry, buf)
    }
}

/// Undo the entry's compression method.
pub fn decompress(entry: &ZipEntry, data: Vec<u8>) -> ZipFsResult<Vec<u8>> {
    match entry.compression_method {
        CompressionMethod::Stored => Ok(data),
        CompressionMethod::Deflate => {
            // The declared size is only a hint; cap it so a bogus header
            // can't force a huge allocation up front.
            let hint = (entry.uncompressed_size as usize).min(data.len().saturating_mul(8));
            let mut out = Vec::with_capacity(hint);
            DeflateDecoder::new(data.as_slice()).read_to_end(&mut out)?;
            Ok(out)
        }
        CompressionMethod::Unsupported(method) => Err(ZipFsError::UnsupportedMethod(method)),
    }
}
