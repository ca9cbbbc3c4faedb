//! Reading, writing and merging of KEY resource index files.

mod file;
mod header;
mod index;
mod location;
mod merge;
mod registry;
mod resref;

pub use file::{
    clean_path, decode, decode_with, encode, encode_to_vec, DecodeError, DecodeOptions,
    MAX_FILENAME_LEN,
};
pub use header::{Header, HEADER_SIZE, KEY_SIGNATURE, KEY_VERSION};
pub use index::{
    ArchiveRecord, Identity, Index, IndexError, ResourceEntry, CANONICAL_FILE_LOCATION,
};
pub use location::{Location, MAX_ARCHIVE, MAX_SLOT, MAX_TILESET};
pub use merge::{merge_into, MergeError, MergeOptions, MergeStats, PathRewrite};
pub use registry::{TypeRegistry, STANDARD_TYPES};
pub use resref::{ResRef, RESREF_LEN};
