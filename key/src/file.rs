//! Decoding and encoding of whole KEY files.
//!
//! KEY file format (all integers little-endian):
//!
//! ``` text
//!     1. Header : From Start 0
//!         signature [4], version [4], archive_count u32, resource_count u32,
//!         archive_offset u32, resource_offset u32
//!
//!     2. Archives : From Start archive_offset
//!         for 0 to archive_count
//!             length u32, filename_offset u32, filename_length u16, file_location u16
//!
//!     3. Filenames : anywhere, addressed by the archive records
//!
//!     4. Resources : From Start resource_offset
//!         for 0 to resource_count
//!             name [8], type u16, location u32
//! ```

use crate::header::{
    Header, RawArchive, ARCHIVE_RECORD_SIZE, HEADER_SIZE, RESOURCE_RECORD_SIZE,
};
use crate::index::{ArchiveRecord, Index, ResourceEntry, CANONICAL_FILE_LOCATION};
use crate::location::Location;
use crate::resref::{ResRef, RESREF_LEN};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, trace, warn};
use std::fmt::{Display, Formatter};
use std::io;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

/// Longest filename that still fits the `u16` length field with its
/// terminating null.
pub const MAX_FILENAME_LEN: usize = u16::MAX as usize - 1;

#[derive(Debug)]
pub enum DecodeError {
    /// Underlying stream failed for other reason than a short read.
    Io(io::Error),
    /// The stream ended while reading the named structure.
    Truncated(&'static str),
    /// A table declares more records than the stream can hold.
    CountTooLarge {
        table: &'static str,
        count: u32,
        offset: u32,
        stream_len: u64,
    },
    /// Filename of an archive lies (partly) outside of the stream.
    FilenameOutOfBounds {
        archive: usize,
        offset: u32,
        length: u16,
    },
    /// Strict decoding found two resources with the same identity.
    DuplicateIdentity { name: String, kind: u16 },
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Io(e) => write!(f, "io error: {}", e),
            DecodeError::Truncated(what) => write!(f, "unexpected end of stream in {}", what),
            DecodeError::CountTooLarge {
                table,
                count,
                offset,
                stream_len,
            } => write!(
                f,
                "{} table with {} records at offset {} does not fit into {} bytes",
                table, count, offset, stream_len
            ),
            DecodeError::FilenameOutOfBounds {
                archive,
                offset,
                length,
            } => write!(
                f,
                "filename of archive {} ({} bytes at offset {}) is outside of the stream",
                archive, length, offset
            ),
            DecodeError::DuplicateIdentity { name, kind } => {
                write!(f, "duplicate resource {} of type {}", name, kind)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::Io(e)
    }
}

/// Maps a short read to `Truncated` and keeps other io errors as they are.
fn short_read(what: &'static str) -> impl Fn(io::Error) -> DecodeError {
    move |e| match e.kind() {
        ErrorKind::UnexpectedEof => DecodeError::Truncated(what),
        _ => DecodeError::Io(e),
    }
}

#[derive(Debug, Copy, Clone, Default)]
pub struct DecodeOptions {
    /// Reject streams that contain the same identity more than once instead
    /// of resolving it to the last occurrence.
    pub strict: bool,
}

/// Decodes a KEY file from specified reader using default (lenient) options.
pub fn decode<R: Read + Seek>(reader: &mut R) -> Result<Index, DecodeError> {
    decode_with(reader, DecodeOptions::default())
}

/// Decodes a KEY file from specified reader. The whole stream is read
/// before the `Index` is returned, no partially decoded index is ever
/// exposed.
pub fn decode_with<R: Read + Seek>(
    reader: &mut R,
    options: DecodeOptions,
) -> Result<Index, DecodeError> {
    let stream_len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let header = Header::read(reader).map_err(short_read("header"))?;
    if !header.is_canonical() {
        debug!(
            "non-canonical signature {:?} version {:?}",
            String::from_utf8_lossy(&header.signature),
            String::from_utf8_lossy(&header.version)
        );
    }

    check_table(
        "archive",
        header.archive_count,
        header.archive_offset,
        ARCHIVE_RECORD_SIZE,
        stream_len,
    )?;
    check_table(
        "resource",
        header.resource_count,
        header.resource_offset,
        RESOURCE_RECORD_SIZE,
        stream_len,
    )?;

    reader.seek(SeekFrom::Start(header.archive_offset as u64))?;
    let mut raw_archives = Vec::with_capacity(header.archive_count as usize);
    for _ in 0..header.archive_count {
        raw_archives.push(RawArchive::read(reader).map_err(short_read("archive table"))?);
    }

    let mut archives = Vec::with_capacity(raw_archives.len());
    for (idx, raw) in raw_archives.iter().enumerate() {
        let end = raw.filename_offset as u64 + raw.filename_length as u64;
        if end > stream_len {
            return Err(DecodeError::FilenameOutOfBounds {
                archive: idx,
                offset: raw.filename_offset,
                length: raw.filename_length,
            });
        }

        reader.seek(SeekFrom::Start(raw.filename_offset as u64))?;
        let mut buf = vec![0u8; raw.filename_length as usize];
        reader
            .read_exact(&mut buf)
            .map_err(short_read("archive filename"))?;

        let filename = normalize_filename(&buf);
        trace!("archive {}: {} ({} bytes)", idx, filename, raw.length);

        archives.push(ArchiveRecord {
            length: raw.length,
            filename,
            file_location: raw.file_location,
        });
    }

    reader.seek(SeekFrom::Start(header.resource_offset as u64))?;
    let mut resources = Vec::with_capacity(header.resource_count as usize);
    for _ in 0..header.resource_count {
        resources.push(read_resource(reader).map_err(short_read("resource table"))?);
    }

    let index = Index::from_parts(archives, resources);
    check_duplicates(&index, options)?;

    debug!(
        "decoded {} archives and {} resources",
        index.archives().len(),
        index.resources().len()
    );

    Ok(index)
}

fn check_table(
    table: &'static str,
    count: u32,
    offset: u32,
    record_size: u32,
    stream_len: u64,
) -> Result<(), DecodeError> {
    if count == 0 {
        return Ok(());
    }

    let end = offset as u64 + count as u64 * record_size as u64;
    if end > stream_len {
        return Err(DecodeError::CountTooLarge {
            table,
            count,
            offset,
            stream_len,
        });
    }
    Ok(())
}

/// Entries hidden by a later entry of the same identity are reported as
/// warnings, or as an error in strict mode.
fn check_duplicates(index: &Index, options: DecodeOptions) -> Result<(), DecodeError> {
    if index.identity_count() == index.resources().len() {
        return Ok(());
    }

    for (idx, res) in index.resources().iter().enumerate() {
        let identity = res.identity();
        if index.position(&identity) == Some(idx) {
            continue;
        }

        if options.strict {
            return Err(DecodeError::DuplicateIdentity {
                name: identity.name,
                kind: identity.kind,
            });
        }
        warn!(
            "resource {} of type {} at position {} is shadowed by a later entry",
            identity.name, identity.kind, idx
        );
    }

    Ok(())
}

fn read_resource<R: Read>(reader: &mut R) -> io::Result<ResourceEntry> {
    let mut name = [0u8; RESREF_LEN];
    reader.read_exact(&mut name)?;
    let kind = reader.read_u16::<LittleEndian>()?;
    let location = reader.read_u32::<LittleEndian>()?;

    Ok(ResourceEntry::new(
        ResRef::from_bytes(name),
        kind,
        Location::from_raw(location),
    ))
}

fn write_resource<W: Write>(writer: &mut W, resource: &ResourceEntry) -> io::Result<()> {
    writer.write_all(resource.name.as_bytes())?;
    writer.write_u16::<LittleEndian>(resource.kind)?;
    writer.write_u32::<LittleEndian>(resource.location.raw())?;
    Ok(())
}

/// Converts raw filename bytes into a clean relative path with forward
/// slashes.
fn normalize_filename(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let trimmed = text.trim_matches('\0').replace('\\', "/");
    clean_path(&trimmed)
}

/// Lexically cleans a slash separated path: removes empty and `.`
/// segments and resolves `..` against the preceding segment.
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if rooted => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn too_large(what: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidInput, format!("{} too large for KEY file", what))
}

/// Encodes the index into specified writer in a single forward pass. All
/// offsets are recomputed, signature and version are always the canonical
/// ones.
pub fn encode<W: Write>(index: &Index, writer: &mut W) -> io::Result<()> {
    let archives = index.archives();
    let resources = index.resources();

    // filename block in archive order, each name null-terminated
    let mut filenames = Vec::new();
    for archive in archives {
        if archive.filename.len() > MAX_FILENAME_LEN {
            return Err(too_large("archive filename"));
        }
        filenames.extend_from_slice(archive.filename.as_bytes());
        filenames.push(0);
    }

    let archive_count = u32_len(archives.len(), "archive count")?;
    let resource_count = u32_len(resources.len(), "resource count")?;
    let block_len = u32_len(filenames.len(), "filename block")?;

    let archive_offset = HEADER_SIZE;
    let filenames_offset = archive_count
        .checked_mul(ARCHIVE_RECORD_SIZE)
        .and_then(|t| t.checked_add(archive_offset))
        .ok_or_else(|| too_large("archive table"))?;
    let resource_offset = filenames_offset
        .checked_add(block_len)
        .ok_or_else(|| too_large("filename block"))?;

    Header::new(archive_count, resource_count, archive_offset, resource_offset).write(writer)?;

    let mut offset = filenames_offset;
    for archive in archives {
        let length = archive.filename.len() as u32 + 1;
        RawArchive {
            length: archive.length,
            filename_offset: offset,
            filename_length: length as u16,
            file_location: CANONICAL_FILE_LOCATION,
        }
        .write(writer)?;
        offset += length;
    }

    writer.write_all(&filenames)?;

    for resource in resources {
        write_resource(writer, resource)?;
    }

    debug!(
        "encoded {} archives and {} resources",
        archive_count, resource_count
    );

    Ok(())
}

fn u32_len(len: usize, what: &str) -> io::Result<u32> {
    if len > u32::MAX as usize {
        return Err(too_large(what));
    }
    Ok(len as u32)
}

/// Encodes the index into a freshly allocated buffer.
pub fn encode_to_vec(index: &Index) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    encode(index, &mut bytes)?;
    Ok(bytes)
}
