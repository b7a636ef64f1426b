//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Read the End of Central Directory (EOCD) at `size - 22`
//! 2. Read the whole Central Directory in one positioned read
//! 3. Walk its records to get metadata for all entries
//! 4. For reads, consult each entry's Local File Header for the data offset
//!
//! Every step has a blocking and an async form sharing the same decoding.
//! Only the fixed-offset EOCD is supported: an archive comment, ZIP64 and
//! multi-disk archives all fail with [`ZipFsError::Format`].

use log::trace;
use std::io::Cursor;
use std::sync::Arc;

use crate::error::{ZipFsError, ZipFsResult};
use crate::io::{ReadAt, read_exact_at, read_exact_at_blocking};

use super::structures::*;

/// Location of the Central Directory, as declared by the EOCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralDirectoryInfo {
    pub entries: u16,
    pub size: u32,
    pub offset: u32,
}

/// Low-level ZIP file parser.
///
/// Typically used through [`ZipArchive`](crate::ZipArchive)
/// rather than directly.
///
/// ## Example
///
/// ```ignore
/// let parser = ZipParser::new(reader);
/// let entries = parser.list_entries_blocking()?;
/// for entry in entries {
///     let offset = parser.data_offset_blocking(&entry)?;
///     // Read entry data from offset...
/// }
/// ```
pub struct ZipParser<R: ReadAt + ?Sized> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt + ?Sized> ZipParser<R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    fn eocd_offset(&self) -> ZipFsResult<u64> {
        self.size
            .checked_sub(EndOfCentralDirectory::SIZE as u64)
            .ok_or(ZipFsError::Format("too small to hold an EOCD record"))
    }

    /// Read and parse the End of Central Directory record.
    ///
    /// # Errors
    ///
    /// [`ZipFsError::Format`] if the trailer's signature isn't at
    /// `size - 22`.
    pub async fn read_eocd(&self) -> ZipFsResult<CentralDirectoryInfo> {
        let offset = self.eocd_offset()?;
        let mut buf = [0u8; EndOfCentralDirectory::SIZE];
        read_exact_at(&*self.reader, offset, &mut buf).await?;
        decode_eocd(&buf)
    }

    /// Blocking form of [`ZipParser::read_eocd`].
    pub fn read_eocd_blocking(&self) -> ZipFsResult<CentralDirectoryInfo> {
        let offset = self.eocd_offset()?;
        let mut buf = [0u8; EndOfCentralDirectory::SIZE];
        read_exact_at_blocking(&*self.reader, offset, &mut buf)?;
        decode_eocd(&buf)
    }

    /// List all entries in the ZIP archive, in central directory order.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is invalid or cannot be read. No
    /// entries are returned unless every record parsed.
    pub async fn list_entries(&self) -> ZipFsResult<Vec<ZipEntry>> {
        let info = self.read_eocd().await?;
        // Read the entire Central Directory in one request
        let len = self.span(info.offset as u64, info.size as u64)?;
        let mut cd_data = vec![0u8; len];
        read_exact_at(&*self.reader, info.offset as u64, &mut cd_data).await?;
        parse_central_directory(&cd_data, info.entries)
    }

    /// Blocking form of [`ZipParser::list_entries`].
    pub fn list_entries_blocking(&self) -> ZipFsResult<Vec<ZipEntry>> {
        let info = self.read_eocd_blocking()?;
        let len = self.span(info.offset as u64, info.size as u64)?;
        let mut cd_data = vec![0u8; len];
        read_exact_at_blocking(&*self.reader, info.offset as u64, &mut cd_data)?;
        parse_central_directory(&cd_data, info.entries)
    }

    /// Get the actual data offset for an entry.
    ///
    /// The Local File Header has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry.
    /// This reads the LFH to calculate where the entry's data begins.
    pub async fn data_offset(&self, entry: &ZipEntry) -> ZipFsResult<u64> {
        let mut lfh_buf = [0u8; LocalFileHeader::SIZE];
        read_exact_at(&*self.reader, entry.lfh_offset, &mut lfh_buf).await?;
        decode_data_offset(entry, &lfh_buf)
    }

    /// Blocking form of [`ZipParser::data_offset`].
    pub fn data_offset_blocking(&self, entry: &ZipEntry) -> ZipFsResult<u64> {
        let mut lfh_buf = [0u8; LocalFileHeader::SIZE];
        read_exact_at_blocking(&*self.reader, entry.lfh_offset, &mut lfh_buf)?;
        decode_data_offset(entry, &lfh_buf)
    }

    /// Length of a read of `len` bytes at `offset`, or
    /// [`ZipFsError::ShortRead`] if the archive ends first. Checked before
    /// any buffer is sized from a header field.
    pub fn span(&self, offset: u64, len: u64) -> ZipFsResult<usize> {
        let available = self.size.saturating_sub(offset);
        if len > available {
            return Err(ZipFsError::ShortRead {
                expected: usize::try_from(len).unwrap_or(usize::MAX),
                actual: usize::try_from(available).unwrap_or(usize::MAX),
            });
        }
        usize::try_from(len).map_err(|_| ZipFsError::Format("entry too large for this platform"))
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Total size of the archive in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}

fn decode_eocd(buf: &[u8]) -> ZipFsResult<CentralDirectoryInfo> {
    let eocd = EndOfCentralDirectory::from_bytes(buf)?;
    trace!("{:?}", eocd);
    Ok(CentralDirectoryInfo {
        entries: eocd.total_entries,
        size: eocd.cd_size,
        offset: eocd.cd_offset,
    })
}

fn decode_data_offset(entry: &ZipEntry, lfh_buf: &[u8]) -> ZipFsResult<u64> {
    let lfh = LocalFileHeader::from_bytes(lfh_buf)?;
    // Data starts after: LFH (30 bytes) + filename + extra field
    let offset = entry.lfh_offset + lfh.total_len();
    trace!("{}: data at {}", entry.name, offset);
    Ok(offset)
}

/// Walk `count` Central Directory records from the start of `cd_data`.
pub fn parse_central_directory(cd_data: &[u8], count: u16) -> ZipFsResult<Vec<ZipEntry>> {
    let mut entries = Vec::with_capacity(count as usize);
    let mut cursor = Cursor::new(cd_data);

    for _ in 0..count {
        let record = CentralDirectoryRecord::read_from(&mut cursor)?;
        trace!("{:?}", record);
        entries.push(ZipEntry::from_record(&record));
    }

    Ok(entries)
}
