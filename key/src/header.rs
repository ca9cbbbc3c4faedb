use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::{Read, Write};

/* "KEY " and "V1  " as written by the engine */
pub const KEY_SIGNATURE: [u8; 4] = *b"KEY ";
pub const KEY_VERSION: [u8; 4] = *b"V1  ";

/// Size of the header in bytes.
pub const HEADER_SIZE: u32 = 24;
/// Size of one archive record in bytes.
pub const ARCHIVE_RECORD_SIZE: u32 = 12;
/// Size of one resource record in bytes.
pub const RESOURCE_RECORD_SIZE: u32 = 14;

/// Header of every KEY file. Signature and version are kept as read and
/// are not validated.
#[derive(Eq, PartialEq, Hash, Debug, Copy, Clone)]
pub struct Header {
    pub signature: [u8; 4],
    pub version: [u8; 4],
    pub archive_count: u32,
    pub resource_count: u32,
    pub archive_offset: u32,
    pub resource_offset: u32,
}

impl Header {
    /// Creates a canonical header for specified table layout.
    pub fn new(
        archive_count: u32,
        resource_count: u32,
        archive_offset: u32,
        resource_offset: u32,
    ) -> Self {
        Header {
            signature: KEY_SIGNATURE,
            version: KEY_VERSION,
            archive_count,
            resource_count,
            archive_offset,
            resource_offset,
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut signature = [0u8; 4];
        let mut version = [0u8; 4];
        reader.read_exact(&mut signature)?;
        reader.read_exact(&mut version)?;

        Ok(Header {
            signature,
            version,
            archive_count: reader.read_u32::<LittleEndian>()?,
            resource_count: reader.read_u32::<LittleEndian>()?,
            archive_offset: reader.read_u32::<LittleEndian>()?,
            resource_offset: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.signature)?;
        writer.write_all(&self.version)?;
        writer.write_u32::<LittleEndian>(self.archive_count)?;
        writer.write_u32::<LittleEndian>(self.resource_count)?;
        writer.write_u32::<LittleEndian>(self.archive_offset)?;
        writer.write_u32::<LittleEndian>(self.resource_offset)?;
        Ok(())
    }

    /// Whether signature and version match the ones this crate writes.
    pub fn is_canonical(&self) -> bool {
        self.signature == KEY_SIGNATURE && self.version == KEY_VERSION
    }
}

/// Archive record exactly as stored in the archive table.
#[derive(Eq, PartialEq, Debug, Copy, Clone)]
pub(crate) struct RawArchive {
    pub length: u32,
    pub filename_offset: u32,
    pub filename_length: u16,
    pub file_location: u16,
}

impl RawArchive {
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(RawArchive {
            length: reader.read_u32::<LittleEndian>()?,
            filename_offset: reader.read_u32::<LittleEndian>()?,
            filename_length: reader.read_u16::<LittleEndian>()?,
            file_location: reader.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.length)?;
        writer.write_u32::<LittleEndian>(self.filename_offset)?;
        writer.write_u16::<LittleEndian>(self.filename_length)?;
        writer.write_u16::<LittleEndian>(self.file_location)?;
        Ok(())
    }
}
