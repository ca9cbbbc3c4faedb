//! Merging of a mod index into a base index.
//!
//! Archives of the source are appended after the archives of the target and
//! every source resource is renumbered accordingly. A source resource with
//! the same identity as a target resource overwrites where the target
//! resource points to (the mod shadows the base game). Other source
//! resources are appended.

use crate::index::{ArchiveRecord, Index, ResourceEntry};
use crate::location::MAX_ARCHIVE;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Eq, PartialEq)]
pub enum MergeError {
    /// The renumbered archive index does not fit into the location field.
    ArchiveOverflow { resource: String, archive: u32 },
    /// The merged index would have more archives than a location can address.
    TooManyArchives { count: u64 },
    /// A source resource references an archive the source does not have.
    UnknownArchive {
        resource: String,
        archive: u32,
        count: usize,
    },
}

impl Display for MergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::ArchiveOverflow { resource, archive } => write!(
                f,
                "resource {} would be moved to archive {} (maximum is {})",
                resource, archive, MAX_ARCHIVE
            ),
            MergeError::TooManyArchives { count } => write!(
                f,
                "merged index would have {} archives (maximum is {})",
                count,
                MAX_ARCHIVE as u64 + 1
            ),
            MergeError::UnknownArchive {
                resource,
                archive,
                count,
            } => write!(
                f,
                "resource {} references archive {} but the mod index has {} archives",
                resource, archive, count
            ),
        }
    }
}

impl std::error::Error for MergeError {}

/// Replaces whole path segments equal (ignoring case) to `from` by `to`.
///
/// Mods ship their archives in a `data` directory which is extracted next
/// to the game under a different name.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PathRewrite {
    pub from: String,
    pub to: String,
}

impl PathRewrite {
    pub fn new<A: Into<String>, B: Into<String>>(from: A, to: B) -> Self {
        PathRewrite {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn apply(&self, path: &str) -> String {
        path.split('/')
            .map(|segment| {
                if segment.eq_ignore_ascii_case(&self.from) {
                    self.to.as_str()
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Default for PathRewrite {
    fn default() -> Self {
        PathRewrite::new("data", "mod")
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Rewrite applied to filenames of appended archives. `None` keeps the
    /// filenames as they are.
    pub rewrite: Option<PathRewrite>,
}

/// Summary of a successful merge.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct MergeStats {
    pub archive_offset: u32,
    pub archives_added: usize,
    pub resources_overwritten: usize,
    pub resources_added: usize,
}

/// Merges `source` into `target`.
///
/// Source archives start at the current archive count of `target`, so
/// merging several sources one after another gives every source its own
/// archive range. The source is only read. When an error is returned the
/// target is left unchanged.
pub fn merge_into(
    target: &mut Index,
    source: &Index,
    options: &MergeOptions,
) -> Result<MergeStats, MergeError> {
    let archive_offset = target.archives().len() as u32;

    // nothing is modified until every source resource has been checked
    for res in source.resources() {
        remapped_archive(res, archive_offset, source.archives().len())?;
    }
    let count = archive_offset as u64 + source.archives().len() as u64;
    if count > MAX_ARCHIVE as u64 + 1 {
        return Err(MergeError::TooManyArchives { count });
    }

    let mut stats = MergeStats {
        archive_offset,
        ..MergeStats::default()
    };

    for archive in source.archives() {
        let filename = match &options.rewrite {
            Some(rewrite) => rewrite.apply(&archive.filename),
            None => archive.filename.clone(),
        };
        let id = target.push_archive(ArchiveRecord::new(archive.length, filename));
        trace!("archive {} -> {}", archive.filename, id);
        stats.archives_added += 1;
    }

    for res in source.resources() {
        let archive = res.location.archive() + archive_offset;
        let identity = res.identity();

        if target.repoint(&identity, archive, res.location.slot()) {
            trace!("{} {} overwritten -> {}", identity.name, identity.kind, archive);
            stats.resources_overwritten += 1;
        } else {
            target.push_resource(ResourceEntry::new(
                res.name,
                res.kind,
                res.location.with_archive(archive),
            ));
            stats.resources_added += 1;
        }
    }

    debug!(
        "merged {} archives at offset {}, {} resources overwritten, {} added",
        stats.archives_added,
        archive_offset,
        stats.resources_overwritten,
        stats.resources_added
    );

    Ok(stats)
}

fn remapped_archive(
    res: &ResourceEntry,
    archive_offset: u32,
    source_archives: usize,
) -> Result<u32, MergeError> {
    let archive = res.location.archive();
    if archive as usize >= source_archives {
        return Err(MergeError::UnknownArchive {
            resource: res.name.canonical(),
            archive,
            count: source_archives,
        });
    }

    let remapped = archive as u64 + archive_offset as u64;
    if remapped > MAX_ARCHIVE as u64 {
        return Err(MergeError::ArchiveOverflow {
            resource: res.name.canonical(),
            archive: remapped as u32,
        });
    }

    Ok(remapped as u32)
}
