use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

/// Size of the name field in bytes.
pub const RESREF_LEN: usize = 8;

/// Fixed 8-byte, null-padded resource name.
///
/// The canonical value of the name is the prefix before the first null
/// byte. Names are compared case-insensitively when they identify a
/// resource (see `ResRef::identity`).
#[derive(Eq, PartialEq, Hash, Copy, Clone, Default)]
pub struct ResRef([u8; RESREF_LEN]);

impl ResRef {
    /// Wraps the raw bytes as stored on disk.
    #[inline]
    pub fn from_bytes(bytes: [u8; RESREF_LEN]) -> Self {
        ResRef(bytes)
    }

    /// Creates a name from a string. Returns `None` if the string does
    /// not fit into 8 bytes.
    pub fn new(name: &str) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.len() > RESREF_LEN {
            return None;
        }

        let mut buf = [0u8; RESREF_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(ResRef(buf))
    }

    /// Raw padded bytes. Only meant to be written back to a stream.
    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8; RESREF_LEN] {
        &self.0
    }

    /// Returns the name up to the first null byte.
    pub fn canonical(&self) -> String {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(RESREF_LEN);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }

    /// Upper-cased canonical name used as the identity of a resource.
    pub fn identity(&self) -> String {
        self.canonical().to_uppercase()
    }
}

impl Display for ResRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl std::fmt::Debug for ResRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResRef({:?})", self.canonical())
    }
}

impl Serialize for ResRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.canonical())
    }
}

#[cfg(test)]
mod tests {
    use crate::resref::ResRef;

    #[test]
    fn canonical_stops_at_first_null() {
        let name = ResRef::from_bytes(*b"AR01\0XYZ");

        assert_eq!(name.canonical(), "AR01");
    }

    #[test]
    fn full_length_name_has_no_terminator() {
        let name = ResRef::new("AJANTIS1").unwrap();

        assert_eq!(name.canonical(), "AJANTIS1");
    }

    #[test]
    fn identity_is_case_insensitive() {
        let a = ResRef::new("ajantis").unwrap();
        let b = ResRef::new("AJANTIS").unwrap();

        assert_ne!(a, b);
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn rejects_long_names() {
        assert!(ResRef::new("TOOLONGNAME").is_none());
        assert_eq!(ResRef::new("").unwrap(), ResRef::default());
    }
}
