//! In-memory representation of a KEY file.

use crate::location::Location;
use crate::registry::TypeRegistry;
use crate::resref::ResRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Value of the file location flag written for every archive.
pub const CANONICAL_FILE_LOCATION: u16 = 1;

/// One archive (BIF file) referenced by the index. The position of the
/// record inside `Index::archives()` is its archive index.
#[derive(Eq, PartialEq, Clone, Debug, Serialize)]
pub struct ArchiveRecord {
    /// Opaque length field, copied through.
    pub length: u32,
    /// Normalized relative path using forward slashes.
    pub filename: String,
    /// Opaque location flag as read from the source file.
    pub file_location: u16,
}

impl ArchiveRecord {
    pub fn new(length: u32, filename: String) -> Self {
        ArchiveRecord {
            length,
            filename,
            file_location: CANONICAL_FILE_LOCATION,
        }
    }
}

/// One named and typed resource.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Serialize)]
pub struct ResourceEntry {
    pub name: ResRef,
    #[serde(rename = "type")]
    pub kind: u16,
    pub location: Location,
}

impl ResourceEntry {
    pub fn new(name: ResRef, kind: u16, location: Location) -> Self {
        ResourceEntry {
            name,
            kind,
            location,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            name: self.name.identity(),
            kind: self.kind,
        }
    }

    /// Returns `NAME.ext` using the provided registry.
    pub fn file_name(&self, registry: &TypeRegistry) -> String {
        format!(
            "{}.{}",
            self.name.identity(),
            registry.type_to_extension(self.kind)
        )
    }
}

/// Key that uniquely addresses a resource inside an index.
#[derive(Eq, PartialEq, Hash, Clone, Debug)]
pub struct Identity {
    /// Upper-cased canonical name.
    pub name: String,
    pub kind: u16,
}

impl Identity {
    pub fn new(name: &str, kind: u16) -> Self {
        Identity {
            name: name.to_uppercase(),
            kind,
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum IndexError {
    ArchiveOutOfBounds { archive: u32, count: usize },
    ResourceNotFound { archive: u32, slot: u32 },
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::ArchiveOutOfBounds { archive, count } => write!(
                f,
                "archive index {} out of bounds (index has {} archives)",
                archive, count
            ),
            IndexError::ResourceNotFound { archive, slot } => {
                write!(f, "no resource at archive {} slot {}", archive, slot)
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Archives and resources of one KEY file together with a lookup from
/// resource identity to the position of the resource.
///
/// The sequences can only be changed through the methods of this struct
/// so the lookup always points at current positions.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Index {
    archives: Vec<ArchiveRecord>,
    resources: Vec<ResourceEntry>,
    #[serde(skip)]
    lookup: HashMap<Identity, usize>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from already decoded sequences. Duplicate identities
    /// resolve to the last occurrence.
    pub fn from_parts(archives: Vec<ArchiveRecord>, resources: Vec<ResourceEntry>) -> Self {
        let mut lookup = HashMap::with_capacity(resources.len());
        for (idx, res) in resources.iter().enumerate() {
            lookup.insert(res.identity(), idx);
        }

        Index {
            archives,
            resources,
            lookup,
        }
    }

    #[inline]
    pub fn archives(&self) -> &[ArchiveRecord] {
        &self.archives
    }

    #[inline]
    pub fn resources(&self) -> &[ResourceEntry] {
        &self.resources
    }

    /// Number of distinct identities. Smaller than `resources().len()` when
    /// the index contains duplicates.
    #[inline]
    pub fn identity_count(&self) -> usize {
        self.lookup.len()
    }

    /// Appends an archive and returns its archive index.
    pub fn push_archive(&mut self, archive: ArchiveRecord) -> u32 {
        self.archives.push(archive);
        (self.archives.len() - 1) as u32
    }

    /// Appends a resource and makes its identity resolve to it. Returns the
    /// position of the new resource.
    pub fn push_resource(&mut self, resource: ResourceEntry) -> usize {
        let position = self.resources.len();
        self.lookup.insert(resource.identity(), position);
        self.resources.push(resource);
        position
    }

    /// Returns the position of the resource with specified identity.
    #[inline]
    pub fn position(&self, identity: &Identity) -> Option<usize> {
        self.lookup.get(identity).copied()
    }

    /// Finds a resource by (case-insensitive) name and type.
    pub fn find(&self, name: &str, kind: u16) -> Option<&ResourceEntry> {
        self.position(&Identity::new(name, kind))
            .map(|idx| &self.resources[idx])
    }

    /// Points the resource with specified identity to a different archive and
    /// slot. Tileset bits of the resource are kept. Returns `false` if no
    /// such resource exists.
    pub fn repoint(&mut self, identity: &Identity, archive: u32, slot: u32) -> bool {
        match self.position(identity) {
            None => false,
            Some(idx) => {
                let res = &mut self.resources[idx];
                res.location = res.location.with_archive(archive).with_slot(slot);
                true
            }
        }
    }

    /// Returns the path of archive with specified index.
    pub fn archive_path(&self, archive: u32) -> Result<&str, IndexError> {
        self.archives
            .get(archive as usize)
            .map(|a| a.filename.as_str())
            .ok_or(IndexError::ArchiveOutOfBounds {
                archive,
                count: self.archives.len(),
            })
    }

    /// Returns `NAME.ext` of the resource stored exactly at specified archive
    /// and slot (with tileset bits equal to zero).
    pub fn resource_name(
        &self,
        archive: u32,
        slot: u32,
        registry: &TypeRegistry,
    ) -> Result<String, IndexError> {
        let wanted = Location::new(archive, 0, slot);
        self.resources
            .iter()
            .find(|r| r.location == wanted)
            .map(|r| r.file_name(registry))
            .ok_or(IndexError::ResourceNotFound { archive, slot })
    }

    /// Checks that every resource references an existing archive.
    pub fn validate(&self) -> Result<(), IndexError> {
        for res in &self.resources {
            self.archive_path(res.location.archive())?;
        }
        Ok(())
    }
}
