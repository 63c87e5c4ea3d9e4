//! Archive listings: zip, tar (optionally gzip-compressed), rar

use crate::error::ProcessError;
use crate::extractors::Extractor;
use crate::types::ExtractionResult;
use async_trait::async_trait;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};

/// Gzip member magic
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

const RAR4_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x00";
const RAR5_SIGNATURE: &[u8] = b"Rar!\x1a\x07\x01\x00";

/// Lists zip entry names in central directory order
pub struct ZipExtractor;

#[async_trait]
impl Extractor for ZipExtractor {
    fn name(&self) -> &'static str {
        "zip"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| ProcessError::decode("zip", e))?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| ProcessError::decode("zip", e))?;
            names.push(entry.name().to_string());
        }
        Ok(ExtractionResult::Listing(names))
    }
}

/// Lists tar member names; gzip-compressed tarballs are detected and inflated
pub struct TarExtractor;

#[async_trait]
impl Extractor for TarExtractor {
    fn name(&self) -> &'static str {
        "tar"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let reader: Box<dyn Read + '_> = if content.starts_with(&GZIP_MAGIC) {
            Box::new(GzDecoder::new(content))
        } else {
            Box::new(content)
        };

        let mut archive = tar::Archive::new(reader);
        let entries = archive
            .entries()
            .map_err(|e| ProcessError::decode("tar", e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ProcessError::decode("tar", e))?;
            let path = entry.path().map_err(|e| ProcessError::decode("tar", e))?;
            names.push(path.to_string_lossy().into_owned());
        }
        Ok(ExtractionResult::Listing(names))
    }
}

/// Lists rar entry names by walking the block headers (RAR 1.5-4.x and 5.0)
///
/// Nothing is decompressed; archives with encrypted headers cannot be listed.
pub struct RarExtractor;

#[async_trait]
impl Extractor for RarExtractor {
    fn name(&self) -> &'static str {
        "rar"
    }

    async fn extract(&self, content: &[u8]) -> Result<ExtractionResult, ProcessError> {
        let names = if content.starts_with(RAR5_SIGNATURE) {
            rar5_names(&content[RAR5_SIGNATURE.len()..])
        } else if content.starts_with(RAR4_SIGNATURE) {
            rar4_names(&content[RAR4_SIGNATURE.len()..])
        } else {
            Err("missing rar signature")
        };
        names
            .map(ExtractionResult::Listing)
            .map_err(|e| ProcessError::decode("rar", e))
    }
}

/// Little-endian reader over a byte slice
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.bytes(1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.bytes(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Option<u32> {
        self.bytes(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// RAR5 variable-length integer: 7 bits per byte, high bit continues
    fn vint(&mut self) -> Option<u64> {
        let mut value = 0u64;
        for shift in (0..70).step_by(7) {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Some(value);
            }
        }
        None
    }
}

fn rar_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('\\', "/")
}

fn rar4_names(buf: &[u8]) -> Result<Vec<String>, &'static str> {
    const FILE_HEAD: u8 = 0x74;
    const END_OF_ARCHIVE: u8 = 0x7b;
    const LONG_BLOCK: u16 = 0x8000;
    const LARGE_FILE: u16 = 0x0100;
    const UNICODE_NAME: u16 = 0x0200;

    let mut names = Vec::new();
    let mut pos = 0usize;

    while pos < buf.len() {
        let mut reader = ByteReader::at(buf, pos);
        let truncated = "truncated block header";
        let _crc = reader.u16().ok_or(truncated)?;
        let block_type = reader.u8().ok_or(truncated)?;
        let flags = reader.u16().ok_or(truncated)?;
        let head_size = usize::from(reader.u16().ok_or(truncated)?);
        if head_size < 7 {
            return Err("invalid block header size");
        }

        if block_type == END_OF_ARCHIVE {
            break;
        }

        let mut data_size = if flags & LONG_BLOCK != 0 {
            u64::from(reader.u32().ok_or(truncated)?)
        } else {
            0
        };

        if block_type == FILE_HEAD {
            let truncated = "truncated file header";
            // unp_size, host_os, file_crc, ftime, unp_ver, method
            reader.bytes(4 + 1 + 4 + 4 + 1 + 1).ok_or(truncated)?;
            let name_size = usize::from(reader.u16().ok_or(truncated)?);
            let _attributes = reader.u32().ok_or(truncated)?;
            if flags & LARGE_FILE != 0 {
                let high_pack = reader.u32().ok_or(truncated)?;
                let _high_unpacked = reader.u32().ok_or(truncated)?;
                data_size |= u64::from(high_pack) << 32;
            }
            let mut raw_name = reader.bytes(name_size).ok_or(truncated)?;
            if flags & UNICODE_NAME != 0 {
                if let Some(nul) = raw_name.iter().position(|&b| b == 0) {
                    raw_name = &raw_name[..nul];
                }
            }
            names.push(rar_name(raw_name));
        }

        let next = (pos as u64)
            .checked_add(head_size as u64)
            .and_then(|p| p.checked_add(data_size))
            .ok_or("block size overflow")?;
        pos = usize::try_from(next).map_err(|_| "block size overflow")?;
    }

    Ok(names)
}

fn rar5_names(buf: &[u8]) -> Result<Vec<String>, &'static str> {
    const FILE_HEADER: u64 = 2;
    const ENCRYPTION_HEADER: u64 = 4;
    const END_OF_ARCHIVE: u64 = 5;
    const HAS_EXTRA: u64 = 0x1;
    const HAS_DATA: u64 = 0x2;
    const FILE_HAS_MTIME: u64 = 0x2;
    const FILE_HAS_CRC: u64 = 0x4;

    let mut names = Vec::new();
    let mut pos = 0usize;
    let truncated = "truncated header";

    while pos < buf.len() {
        let mut reader = ByteReader::at(buf, pos);
        let _crc = reader.u32().ok_or(truncated)?;
        let header_size = reader.vint().ok_or(truncated)?;
        let header_start = reader.pos;

        let header_type = reader.vint().ok_or(truncated)?;
        let header_flags = reader.vint().ok_or(truncated)?;
        if header_flags & HAS_EXTRA != 0 {
            reader.vint().ok_or(truncated)?;
        }
        let data_size = if header_flags & HAS_DATA != 0 {
            reader.vint().ok_or(truncated)?
        } else {
            0
        };

        match header_type {
            END_OF_ARCHIVE => break,
            ENCRYPTION_HEADER => return Err("archive headers are encrypted"),
            FILE_HEADER => {
                let file_flags = reader.vint().ok_or(truncated)?;
                let _unpacked_size = reader.vint().ok_or(truncated)?;
                let _attributes = reader.vint().ok_or(truncated)?;
                if file_flags & FILE_HAS_MTIME != 0 {
                    reader.u32().ok_or(truncated)?;
                }
                if file_flags & FILE_HAS_CRC != 0 {
                    reader.u32().ok_or(truncated)?;
                }
                let _compression = reader.vint().ok_or(truncated)?;
                let _host_os = reader.vint().ok_or(truncated)?;
                let name_len = usize::try_from(reader.vint().ok_or(truncated)?)
                    .map_err(|_| "name too long")?;
                let raw_name = reader.bytes(name_len).ok_or(truncated)?;
                names.push(rar_name(raw_name));
            }
            _ => {}
        }

        let next = (header_start as u64)
            .checked_add(header_size)
            .and_then(|p| p.checked_add(data_size))
            .ok_or("header size overflow")?;
        pos = usize::try_from(next).map_err(|_| "header size overflow")?;
    }

    Ok(names)
}
