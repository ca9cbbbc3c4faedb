use crate::settings::Settings;
use crate::KeyMergeParameters;
use common::impl_stats_struct;
use common::measure_scope;
use common::tool::Tool;
use key::{DecodeError, DecodeOptions, Index, MergeError, MergeOptions, MergeStats};
use log::info;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

// generate `Statistics` struct with `Stopwatch`es
impl_stats_struct!(pub Statistics; decode, merge, backup, encode);

#[derive(Debug)]
pub enum KeyMergeError {
    InputIoError(PathBuf, std::io::Error),
    InvalidKeyFile(PathBuf, DecodeError),
    CannotMerge(PathBuf, MergeError),
    BackupIoError(PathBuf, std::io::Error),
    SaveIoError(PathBuf, std::io::Error),
}

impl Display for KeyMergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMergeError::InputIoError(p, e) => write!(f, "cannot open {:?}: {}", p, e),
            KeyMergeError::InvalidKeyFile(p, e) => write!(f, "cannot read {:?}: {}", p, e),
            KeyMergeError::CannotMerge(p, e) => write!(f, "cannot merge {:?}: {}", p, e),
            KeyMergeError::BackupIoError(p, e) => write!(f, "cannot back up to {:?}: {}", p, e),
            KeyMergeError::SaveIoError(p, e) => write!(f, "cannot write {:?}: {}", p, e),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct MergeReport {
    pub stats: Statistics<'static>,
    pub merges: Vec<MergeStats>,
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
    pub archives: usize,
    pub resources: usize,
}

/// Merges one or more mod key files into a base key file.
pub struct KeyMerge {
    settings: Settings,
}

impl KeyMerge {
    pub fn new(settings: Settings) -> Self {
        KeyMerge { settings }
    }

    /// Command line flags override the rewrite policy from settings.
    fn merge_options(&self, params: &KeyMergeParameters) -> MergeOptions {
        if params.no_rewrite {
            return MergeOptions { rewrite: None };
        }

        let mut rewrite = self.settings.rewrite.clone();
        if params.rewrite_from.is_some() || params.rewrite_to.is_some() {
            let mut r = rewrite.unwrap_or_default();
            if let Some(from) = &params.rewrite_from {
                r.from = from.clone();
            }
            if let Some(to) = &params.rewrite_to {
                r.to = to.clone();
            }
            rewrite = Some(r);
        }

        MergeOptions { rewrite }
    }

    fn decode_options(&self, params: &KeyMergeParameters) -> DecodeOptions {
        DecodeOptions {
            strict: params.strict || self.settings.strict,
        }
    }

    /// Opens and decodes one key file.
    fn load(path: &Path, options: DecodeOptions) -> Result<Index, KeyMergeError> {
        let file = File::open(path).map_err(|e| KeyMergeError::InputIoError(path.into(), e))?;
        let index = key::decode_with(&mut BufReader::new(file), options)
            .map_err(|e| KeyMergeError::InvalidKeyFile(path.into(), e))?;

        info!(
            "loaded {:?}: {} archives, {} resources",
            path,
            index.archives().len(),
            index.resources().len()
        );
        Ok(index)
    }

    /// Copies the base file next to itself with `.bak` appended.
    fn backup(base: &Path) -> Result<PathBuf, KeyMergeError> {
        let mut name = base.as_os_str().to_owned();
        name.push(".bak");
        let backup = PathBuf::from(name);

        std::fs::copy(base, &backup).map_err(|e| KeyMergeError::BackupIoError(backup.clone(), e))?;
        Ok(backup)
    }

    fn save(index: &Index, output: &Path) -> Result<(), KeyMergeError> {
        let save_error = |e| KeyMergeError::SaveIoError(output.into(), e);

        let mut writer = BufWriter::new(File::create(output).map_err(save_error)?);
        key::encode(index, &mut writer).map_err(save_error)?;
        writer.flush().map_err(save_error)?;
        Ok(())
    }
}

/// Resolves symlinks and `..` segments. A path that does not exist yet is
/// resolved through its parent directory.
fn resolve(path: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = path.canonicalize() {
        return Some(resolved);
    }

    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    parent.canonicalize().ok().map(|p| p.join(name))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (resolve(a), resolve(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

impl Tool for KeyMerge {
    type Params = KeyMergeParameters;
    type Result = Result<MergeReport, KeyMergeError>;

    fn execute(&self, params: Self::Params) -> Self::Result {
        let mut stats = Statistics::default();
        let decode_options = self.decode_options(&params);
        let merge_options = self.merge_options(&params);
        let output = params.output.clone().unwrap_or_else(|| params.base.clone());

        // every input is fully decoded and merged before anything is written
        let (mut base, mods) = {
            measure_scope!(stats.decode);

            let base = Self::load(&params.base, decode_options)?;
            let mut mods = Vec::with_capacity(params.mods.len());
            for path in &params.mods {
                mods.push((path, Self::load(path, decode_options)?));
            }
            (base, mods)
        };

        let mut merges = Vec::with_capacity(mods.len());
        {
            measure_scope!(stats.merge);

            for (path, index) in &mods {
                let result = key::merge_into(&mut base, index, &merge_options)
                    .map_err(|e| KeyMergeError::CannotMerge(path.to_path_buf(), e))?;
                info!(
                    "merged {:?}: {} archives added, {} resources overwritten, {} added",
                    path, result.archives_added, result.resources_overwritten, result.resources_added
                );
                merges.push(result);
            }
        }

        let backup = {
            measure_scope!(stats.backup);

            let overwrites_base = same_file(&output, &params.base);
            if overwrites_base && self.settings.backup && !params.no_backup {
                Some(Self::backup(&params.base)?)
            } else {
                None
            }
        };

        {
            measure_scope!(stats.encode);
            Self::save(&base, &output)?;
        }

        Ok(MergeReport {
            stats,
            merges,
            output,
            backup,
            archives: base.archives().len(),
            resources: base.resources().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::settings::Settings;
    use crate::tool::{same_file, KeyMerge, KeyMergeError};
    use crate::KeyMergeParameters;
    use common::tool::Tool;
    use key::{ArchiveRecord, DecodeError, Index, Location, PathRewrite, ResRef, ResourceEntry};
    use matches::assert_matches;
    use std::fs::File;
    use std::io::BufReader;
    use std::path::{Path, PathBuf};

    const ARE: u16 = 1010;
    const CRE: u16 = 1009;

    fn write_key(path: &Path, archives: &[&str], resources: &[(&str, u16, u32, u32)]) {
        let mut index = Index::new();
        for a in archives {
            index.push_archive(ArchiveRecord::new(0, a.to_string()));
        }
        for (name, kind, archive, slot) in resources {
            index.push_resource(ResourceEntry::new(
                ResRef::new(name).unwrap(),
                *kind,
                Location::new(*archive, 0, *slot),
            ));
        }
        std::fs::write(path, key::encode_to_vec(&index).unwrap()).unwrap();
    }

    fn read_key(path: &Path) -> Index {
        key::decode(&mut BufReader::new(File::open(path).unwrap())).unwrap()
    }

    fn params(base: PathBuf, mods: Vec<PathBuf>, output: Option<PathBuf>) -> KeyMergeParameters {
        KeyMergeParameters {
            base,
            mods,
            output,
            rewrite_from: None,
            rewrite_to: None,
            no_rewrite: false,
            strict: false,
            no_backup: false,
        }
    }

    #[test]
    fn merges_into_separate_output() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chitin.key");
        let modkey = dir.path().join("mod.key");
        let output = dir.path().join("output.key");
        write_key(&base, &["data/a.bif"], &[("AJANTIS", ARE, 0, 3)]);
        write_key(&modkey, &["data/b.bif"], &[("AJANTIS", ARE, 0, 7), ("IMOEN", CRE, 0, 2)]);

        let report = KeyMerge::new(Settings::default())
            .execute(params(base.clone(), vec![modkey], Some(output.clone())))
            .unwrap();

        assert!(report.backup.is_none());
        assert_eq!(report.merges.len(), 1);
        assert_eq!(report.stats.merge.runs(), 1);

        let merged = read_key(&output);
        let names: Vec<&str> = merged.archives().iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["data/a.bif", "mod/b.bif"]);
        assert_eq!(merged.find("AJANTIS", ARE).unwrap().location, Location::new(1, 0, 7));
        assert_eq!(merged.find("IMOEN", CRE).unwrap().location, Location::new(1, 0, 2));

        // base untouched
        assert_eq!(read_key(&base).archives().len(), 1);
    }

    #[test]
    fn overwriting_base_creates_backup() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chitin.key");
        let first = dir.path().join("a.key");
        let second = dir.path().join("b.key");
        write_key(&base, &["data/a.bif"], &[("AJANTIS", ARE, 0, 3)]);
        write_key(&first, &["data/b.bif"], &[("IMOEN", CRE, 0, 2)]);
        write_key(&second, &["data/c.bif"], &[("IMOEN", CRE, 0, 5)]);
        let original = std::fs::read(&base).unwrap();

        let mut p = params(base.clone(), vec![first, second], None);
        p.rewrite_to = Some("sod-dlc".into());
        let report = KeyMerge::new(Settings::default()).execute(p).unwrap();

        let backup = report.backup.unwrap();
        assert_eq!(backup, dir.path().join("chitin.key.bak"));
        assert_eq!(std::fs::read(&backup).unwrap(), original);

        let merged = read_key(&base);
        let names: Vec<&str> = merged.archives().iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["data/a.bif", "sod-dlc/b.bif", "sod-dlc/c.bif"]);
        assert_eq!(merged.find("IMOEN", CRE).unwrap().location, Location::new(2, 0, 5));
        assert_eq!(merged.resources().len(), 2);
    }

    #[test]
    fn output_reaching_base_through_parent_dir_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let base = dir.path().join("chitin.key");
        let modkey = dir.path().join("mod.key");
        write_key(&base, &["data/a.bif"], &[("AJANTIS", ARE, 0, 3)]);
        write_key(&modkey, &["data/b.bif"], &[("IMOEN", CRE, 0, 2)]);
        let original = std::fs::read(&base).unwrap();

        let output = dir.path().join("sub").join("..").join("chitin.key");
        let report = KeyMerge::new(Settings::default())
            .execute(params(base.clone(), vec![modkey], Some(output)))
            .unwrap();

        let backup = report.backup.unwrap();
        assert_eq!(std::fs::read(&backup).unwrap(), original);
        assert_eq!(read_key(&base).archives().len(), 2);
    }

    #[test]
    fn same_file_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chitin.key");
        std::fs::write(&base, b"").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        assert!(same_file(&base, &dir.path().join("sub/../chitin.key")));
        assert!(!same_file(&base, &dir.path().join("out.key")));
        assert!(!same_file(&base, &dir.path().join("sub/chitin.key")));
    }

    #[test]
    fn invalid_mod_leaves_base_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chitin.key");
        let modkey = dir.path().join("mod.key");
        write_key(&base, &["data/a.bif"], &[("AJANTIS", ARE, 0, 3)]);
        std::fs::write(&modkey, b"KEY V1  \x01\x00").unwrap();
        let original = std::fs::read(&base).unwrap();

        let result = KeyMerge::new(Settings::default()).execute(params(base.clone(), vec![modkey], None));

        assert_matches!(
            result,
            Err(KeyMergeError::InvalidKeyFile(_, DecodeError::Truncated(_)))
        );
        assert_eq!(std::fs::read(&base).unwrap(), original);
        assert!(!dir.path().join("chitin.key.bak").exists());
    }

    #[test]
    fn strict_flag_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("chitin.key");
        let modkey = dir.path().join("mod.key");
        write_key(&base, &["data/a.bif"], &[("AR0100", ARE, 0, 1), ("ar0100", ARE, 0, 2)]);
        write_key(&modkey, &["data/b.bif"], &[]);

        let mut p = params(base.clone(), vec![modkey.clone()], Some(dir.path().join("out.key")));
        p.strict = true;
        assert_matches!(
            KeyMerge::new(Settings::default()).execute(p),
            Err(KeyMergeError::InvalidKeyFile(_, DecodeError::DuplicateIdentity { .. }))
        );

        let p = params(base, vec![modkey], Some(dir.path().join("out.key")));
        assert!(KeyMerge::new(Settings::default()).execute(p).is_ok());
    }

    #[test]
    fn rewrite_options_resolution() {
        let tool = KeyMerge::new(Settings {
            rewrite: None,
            ..Settings::default()
        });
        let mut p = params(PathBuf::from("a"), vec![], None);

        assert_eq!(tool.merge_options(&p).rewrite, None);

        p.rewrite_to = Some("dlc".into());
        assert_eq!(tool.merge_options(&p).rewrite, Some(PathRewrite::new("data", "dlc")));

        p.no_rewrite = true;
        assert_eq!(tool.merge_options(&p).rewrite, None);
    }
}
