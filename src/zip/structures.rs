use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::{ZipFsError, ZipFsResult};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unsupported(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unsupported(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unsupported(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes.
///
/// Only read at the fixed offset `file_len - 22`; a trailing archive
/// comment is not searched for.
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> ZipFsResult<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ZipFsError::Format("couldn't find EOCD signature"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes plus name, extra field
/// and comment.
#[derive(Debug)]
pub struct CentralDirectoryRecord {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: u16,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name: Vec<u8>,
    pub extra_len: u16,
    pub comment_len: u16,
    pub lfh_offset: u32,
}

impl CentralDirectoryRecord {
    pub const SIGNATURE: &'static [u8] = b"PK\x01\x02";
    pub const SIZE: usize = 46;

    /// Parse one record from the cursor, leaving it at the start of the next.
    pub fn read_from(cursor: &mut Cursor<&[u8]>) -> ZipFsResult<Self> {
        let mut sig = [0u8; 4];
        cursor
            .read_exact(&mut sig)
            .map_err(|_| ZipFsError::Format("truncated central directory"))?;
        if sig != Self::SIGNATURE {
            return Err(ZipFsError::Format("couldn't find central directory signature"));
        }
        Self::read_fields(cursor).map_err(|_| ZipFsError::Format("truncated central directory"))
    }

    fn read_fields(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        let version_made_by = cursor.read_u16::<LittleEndian>()?;
        let version_needed = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()?;
        let file_name_len = cursor.read_u16::<LittleEndian>()?;
        let extra_len = cursor.read_u16::<LittleEndian>()?;
        let comment_len = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()?;

        let mut file_name = vec![0u8; file_name_len as usize];
        cursor.read_exact(&mut file_name)?;

        // Extra field and comment aren't interpreted; the next record starts
        // right after them.
        let skip = extra_len as u64 + comment_len as u64;
        let end = cursor.position() + skip;
        if end > cursor.get_ref().len() as u64 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        cursor.set_position(end);

        Ok(Self {
            version_made_by,
            version_needed,
            flags,
            compression_method,
            last_mod_time,
            last_mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            file_name,
            extra_len,
            comment_len,
            lfh_offset,
        })
    }
}

/// Local File Header (LFH) - 30 bytes plus name and extra field.
///
/// Its own name/extra lengths decide where the entry's data starts; they
/// don't have to agree with the central directory's.
#[derive(Debug)]
pub struct LocalFileHeader {
    pub file_name_len: u16,
    pub extra_len: u16,
}

impl LocalFileHeader {
    pub const SIGNATURE: &'static [u8] = b"PK\x03\x04";
    pub const SIZE: usize = 30;

    pub fn from_bytes(data: &[u8]) -> ZipFsResult<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(ZipFsError::Format("couldn't find local file header signature"));
        }

        // Offset to filename length field
        let mut cursor = Cursor::new(&data[26..]);
        Ok(Self {
            file_name_len: cursor.read_u16::<LittleEndian>()?,
            extra_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Length of the header including its variable fields.
    pub fn total_len(&self) -> u64 {
        Self::SIZE as u64 + self.file_name_len as u64 + self.extra_len as u64
    }
}

/// Parsed ZIP entry information, one per central directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Slash-separated path relative to the archive root, as recorded.
    pub name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ZipEntry {
    pub(crate) fn from_record(record: &CentralDirectoryRecord) -> Self {
        let name = crate::path::normalize(&String::from_utf8_lossy(&record.file_name));
        let is_directory = name.ends_with('/');
        Self {
            name,
            compression_method: CompressionMethod::from_u16(record.compression_method),
            compressed_size: record.compressed_size as u64,
            uncompressed_size: record.uncompressed_size as u64,
            crc32: record.crc32,
            lfh_offset: record.lfh_offset as u64,
            last_mod_time: record.last_mod_time,
            last_mod_date: record.last_mod_date,
            is_directory,
        }
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
