//! Builds small ZIP archives for the integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::DeflateEncoder;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Entry {
    name: String,
    method: u16,
    payload: Vec<u8>,
    uncompressed_size: u32,
    declared_compressed_size: Option<u32>,
    local_extra: Vec<u8>,
    central_extra: Vec<u8>,
    comment: Vec<u8>,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<Entry>,
    archive_comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, method: u16, payload: Vec<u8>, size: usize) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            method,
            payload,
            uncompressed_size: size as u32,
            declared_compressed_size: None,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: Vec::new(),
        });
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.push(name, 0, data.to_vec(), data.len())
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::best());
        enc.write_all(data).unwrap();
        let packed = enc.finish().unwrap();
        self.push(name, 8, packed, data.len())
    }

    pub fn dir(self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.push(name, 0, Vec::new(), 0)
    }

    /// An entry with an arbitrary method code and opaque payload.
    pub fn raw(self, name: &str, method: u16, payload: &[u8]) -> Self {
        self.push(name, method, payload.to_vec(), payload.len())
    }

    /// Give the last entry a local extra field the central directory
    /// doesn't know about, and a different central one.
    pub fn with_mismatched_extra(mut self) -> Self {
        let last = self.entries.last_mut().unwrap();
        last.local_extra = vec![0x55, 0x54, 0x05, 0x00, 1, 2, 3, 4, 5];
        last.central_extra = vec![0x0a, 0x00, 0x00, 0x00];
        last.comment = b"entry comment".to_vec();
        self
    }

    /// Make the central directory claim more compressed bytes for the last
    /// entry than the file holds.
    pub fn with_declared_compressed_size(mut self, size: u32) -> Self {
        self.entries.last_mut().unwrap().declared_compressed_size = Some(size);
        self
    }

    pub fn with_archive_comment(mut self, comment: &[u8]) -> Self {
        self.archive_comment = comment.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::new();

        for e in &self.entries {
            offsets.push(out.len() as u32);
            let csize = e.payload.len() as u32;
            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&e.method.to_le_bytes());
            out.extend_from_slice(&[0; 4]); // time, date
            out.extend_from_slice(&0u32.to_le_bytes()); // crc
            out.extend_from_slice(&csize.to_le_bytes());
            out.extend_from_slice(&e.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(e.local_extra.len() as u16).to_le_bytes());
            out.extend_from_slice(e.name.as_bytes());
            out.extend_from_slice(&e.local_extra);
            out.extend_from_slice(&e.payload);
        }

        let cd_offset = out.len() as u32;
        for (e, offset) in self.entries.iter().zip(&offsets) {
            let csize = e.declared_compressed_size.unwrap_or(e.payload.len() as u32);
            out.extend_from_slice(b"PK\x01\x02");
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&e.method.to_le_bytes());
            // 2020-06-15 12:30:00
            out.extend_from_slice(&((12u16 << 11) | (30 << 5)).to_le_bytes());
            out.extend_from_slice(&(((2020u16 - 1980) << 9) | (6 << 5) | 15).to_le_bytes());
            out.extend_from_slice(&0u32.to_le_bytes());
            out.extend_from_slice(&csize.to_le_bytes());
            out.extend_from_slice(&e.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(e.central_extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&(e.comment.len() as u16).to_le_bytes());
            out.extend_from_slice(&[0; 8]); // disk, internal, external attrs
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(e.name.as_bytes());
            out.extend_from_slice(&e.central_extra);
            out.extend_from_slice(&e.comment);
        }
        let cd_size = out.len() as u32 - cd_offset;

        let count = self.entries.len() as u16;
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.archive_comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.archive_comment);
        out
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// Deterministic, poorly compressible-then-repetitive test content.
pub fn sample_content(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u32).wrapping_mul(31).wrapping_add(seed as u32 * 7) as u8 % 61 + b'!')
        .collect()
}
