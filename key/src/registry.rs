use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Resource types known to the engine, as `(extension, code)` pairs.
pub const STANDARD_TYPES: &[(&str, u16)] = &[
    ("bmp", 1),
    ("mve", 2),
    ("tga", 3),
    ("wav", 4),
    ("wfx", 5),
    ("plt", 6),
    ("bam", 1000),
    ("wed", 1001),
    ("chu", 1002),
    ("tis", 1003),
    ("mos", 1004),
    ("itm", 1005),
    ("spl", 1006),
    ("bcs", 1007),
    ("ids", 1008),
    ("cre", 1009),
    ("are", 1010),
    ("dlg", 1011),
    ("2da", 1012),
    ("gam", 1013),
    ("sto", 1014),
    ("wmp", 1015),
    ("eff", 1016),
    ("bs", 1017),
    ("chr", 1018),
    ("vvc", 1019),
    ("vef", 1020),
    ("pro", 1021),
    ("bio", 1022),
    ("wbm", 1023),
    ("fnt", 1024),
    ("gui", 1026),
    ("sql", 1027),
    ("pvrz", 1028),
    ("glsl", 1029),
    ("tot", 1030),
    ("toh", 1031),
    ("menu", 1032),
    ("lua", 1033),
    ("ttf", 1034),
    ("ini", 2050),
];

static STANDARD: Lazy<TypeRegistry> = Lazy::new(|| TypeRegistry::new(STANDARD_TYPES));

/// Bidirectional mapping between resource type codes and file extensions.
///
/// The registry is immutable once built. Use `TypeRegistry::standard()` for
/// the table of the engine or `TypeRegistry::new()` to build a custom one.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    by_extension: HashMap<String, u16>,
    by_code: HashMap<u16, String>,
}

impl TypeRegistry {
    pub fn new(table: &[(&str, u16)]) -> Self {
        let mut by_extension = HashMap::with_capacity(table.len());
        let mut by_code = HashMap::with_capacity(table.len());

        for (ext, code) in table {
            let ext = ext.to_lowercase();
            by_code.insert(*code, ext.clone());
            by_extension.insert(ext, *code);
        }

        TypeRegistry {
            by_extension,
            by_code,
        }
    }

    /// Returns the lazily initialized registry of all standard types.
    pub fn standard() -> &'static TypeRegistry {
        &STANDARD
    }

    /// Returns the extension (without dot) for specified type code or an empty
    /// string when the code is unknown.
    pub fn type_to_extension(&self, code: u16) -> &str {
        self.by_code.get(&code).map(String::as_str).unwrap_or("")
    }

    /// Returns the type code of specified extension. Leading dots are ignored
    /// and the comparison is case-insensitive.
    pub fn extension_to_type(&self, ext: &str) -> Option<u16> {
        let ext = ext.trim_start_matches('.').to_lowercase();
        self.by_extension.get(&ext).copied()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
