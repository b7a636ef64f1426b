//! ZIP archive parsing and random-access reads.
//!
//! ## Architecture
//!
//! The module is organized into four components:
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`extractor`]: Reading and decompressing entry payloads
//! - [`archive`]: The indexed archive handle with its filesystem-like API
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the file), then the Central
//! Directory, which is indexed once. Entry reads then need only the local
//! header and the entry's own bytes.
//!
//! ## Supported Features
//!
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No archive comment (the EOCD must be the last 22 bytes)
//! - No ZIP64 extensions
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod extractor;
mod parser;
mod structures;

pub use archive::{EntryStat, Encoding, FileContents, ReadOptions, Stat, ZipArchive};
pub use extractor::{ZipExtractor, decompress};
pub use parser::{CentralDirectoryInfo, ZipParser, parse_central_directory};
pub use structures::*;
