use crate::block::{BUFRFile, MessageBlock};
use crate::bufr::Bufr;
use crate::config::TableCache;
use crate::errors::{Error, Result};
use crate::structs::MessageHeader;
use crate::tables::Tables;
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use std::{
    fs::File,
    io::{BufReader, Cursor, Read, Seek, SeekFrom},
    path::{Path, PathBuf},
};

const BUFR_PATTERN: &[u8] = b"BUFR";
const BUFFER_SIZE: usize = 8192;

trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// Plain or gzip-compressed file, chosen by the gzip magic.
fn open<P: AsRef<Path>>(path: P) -> Result<Box<dyn ReadSeek>> {
    let file = File::open(path.as_ref())?;
    let mut reader = BufReader::new(file);

    let mut magic_bytes = [0u8; 2];
    reader.read_exact(&mut magic_bytes)?;
    reader.seek(SeekFrom::Start(0))?;
    if magic_bytes == [0x1F, 0x8B] {
        let mut gz_decoder = GzDecoder::new(reader);
        let mut bytes = vec![];
        gz_decoder.read_to_end(&mut bytes)?;
        tracing::debug!(
            "{}: {} bytes after gunzip",
            path.as_ref().display(),
            bytes.len()
        );
        Ok(Box::new(Cursor::new(bytes)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Where each message gets its tables from.
enum TableSource<'a, 'c> {
    Fixed(&'a Tables),
    PerMessage(&'a mut TableCache<'c>),
}

impl TableSource<'_, '_> {
    fn tables_for(&mut self, message: &[u8]) -> Result<&Tables> {
        match self {
            TableSource::Fixed(tables) => Ok(*tables),
            TableSource::PerMessage(cache) => {
                let header = MessageHeader::read(&mut Cursor::new(message))?;
                Ok(cache.get(&header.table_info()))
            }
        }
    }
}

/// Decode every message in a file against one set of tables. Messages that
/// fail are logged and skipped.
pub fn parse<P: AsRef<Path>>(path: P, tables: &Tables) -> Result<BUFRFile> {
    let mut reader = open(path)?;
    parse_inner(&mut reader, TableSource::Fixed(tables))
}

pub fn parse_bytes(bytes: &[u8], tables: &Tables) -> Result<BUFRFile> {
    parse_inner(&mut Cursor::new(bytes), TableSource::Fixed(tables))
}

/// Like [`parse`], but each message is decoded against the tables its own
/// section 1 names.
pub fn parse_with<P: AsRef<Path>>(path: P, cache: &mut TableCache<'_>) -> Result<BUFRFile> {
    let mut reader = open(path)?;
    parse_inner(&mut reader, TableSource::PerMessage(cache))
}

pub fn parse_bytes_with(bytes: &[u8], cache: &mut TableCache<'_>) -> Result<BUFRFile> {
    parse_inner(&mut Cursor::new(bytes), TableSource::PerMessage(cache))
}

/// Sections 0 to 3 of the first message in a file.
pub fn first_header<P: AsRef<Path>>(path: P) -> Result<MessageHeader> {
    let mut reader = open(path)?;
    let offset = find_bufr_offsets(&mut reader)?
        .into_iter()
        .next()
        .ok_or(Error::NotBufr)?;
    reader.seek(SeekFrom::Start(offset))?;
    MessageHeader::read(&mut reader)
}

/// True when the first message of `path` was observed in `[start, end)`.
/// Unreadable files never cover anything.
pub fn covers<P: AsRef<Path>>(path: P, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    match first_header(path.as_ref()) {
        Ok(header) => (start..end).contains(&header.time()),
        Err(e) => {
            tracing::debug!("{}: {}", path.as_ref().display(), e);
            false
        }
    }
}

/// Files matching a glob pattern whose first message lies in `[start, end)`.
pub fn select_files(pattern: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern)
        .map_err(|e| Error::ParseError(format!("Invalid pattern {:?}: {}", pattern, e)))?;

    let mut selected = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                if covers(&path, start, end) {
                    selected.push(path);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping unreadable path: {}", e),
        }
    }
    selected.sort();
    Ok(selected)
}

fn find_bufr_offsets<R: Read + Seek + ?Sized>(reader: &mut R) -> Result<Vec<u64>> {
    let mut offsets = Vec::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut file_offset = 0u64;
    let mut overlap = vec![0u8; BUFR_PATTERN.len() - 1];
    let mut overlap_len = 0;

    reader.seek(SeekFrom::Start(0))?;

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        let mut search_buffer = Vec::with_capacity(overlap_len + bytes_read);
        search_buffer.extend_from_slice(&overlap[..overlap_len]);
        search_buffer.extend_from_slice(&buffer[..bytes_read]);

        for (i, window) in search_buffer.windows(BUFR_PATTERN.len()).enumerate() {
            if window == BUFR_PATTERN {
                offsets.push(file_offset - overlap_len as u64 + i as u64);
            }
        }

        // Keep the tail so a marker split across reads is still found
        let keep = (BUFR_PATTERN.len() - 1).min(search_buffer.len());
        overlap[..keep].copy_from_slice(&search_buffer[search_buffer.len() - keep..]);
        overlap_len = keep;

        file_offset += bytes_read as u64;
    }

    Ok(offsets)
}

fn read_message_at_offset<R: Read + Seek + ?Sized>(reader: &mut R, offset: u64) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;

    let mut section0_buf = [0u8; 8];
    reader.read_exact(&mut section0_buf)?;

    let total_length = u32::from_be_bytes([0, section0_buf[4], section0_buf[5], section0_buf[6]]);
    if (total_length as usize) < section0_buf.len() {
        return Err(Error::ParseError(format!(
            "Declared message length {} is too short",
            total_length
        )));
    }

    let mut message_buf = vec![0u8; total_length as usize];
    reader.seek(SeekFrom::Start(offset))?;
    reader.read_exact(&mut message_buf)?;

    Ok(message_buf)
}

fn parse_inner<R>(buf_reader: &mut R, mut source: TableSource<'_, '_>) -> Result<BUFRFile>
where
    R: Read + Seek + ?Sized,
{
    let offsets = find_bufr_offsets(buf_reader)?;
    let mut file_block = BUFRFile::new();
    // "BUFR" can also occur inside a message we already decoded
    let mut consumed_until = 0u64;

    for offset in offsets {
        if offset < consumed_until {
            continue;
        }
        let message_data = match read_message_at_offset(buf_reader, offset) {
            Ok(message_data) => message_data,
            Err(e) => {
                tracing::warn!("Failed to read BUFR message at offset {}: {}", offset, e);
                continue;
            }
        };

        let tables = match source.tables_for(&message_data) {
            Ok(tables) => tables,
            Err(e) => {
                tracing::warn!("Failed to read BUFR header at offset {}: {}", offset, e);
                continue;
            }
        };
        let mut bufr = Bufr::new(tables);
        match bufr.from_bytes(&message_data) {
            Ok(()) => {
                consumed_until = offset + message_data.len() as u64;
                if let Some((header, data)) = bufr.into_parts() {
                    file_block.push_message(MessageBlock::new(header, data));
                }
            }
            Err(e) => {
                tracing::warn!("Failed to parse BUFR message at offset {}: {}", offset, e);
            }
        }
    }

    tracing::debug!("Decoded {} messages", file_block.message_count());
    Ok(file_block)
}
