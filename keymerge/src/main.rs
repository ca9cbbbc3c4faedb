use crate::settings::load_settings;
use crate::tool::KeyMerge;
use common::tool::Tool;
use log::{error, info};
use std::path::PathBuf;
use structopt::StructOpt;

mod settings;
mod tool;

#[derive(StructOpt, Debug)]
#[structopt(name = "keymerge")]
pub struct KeyMergeParameters {
    /// Base game key file.
    #[structopt(short, long, parse(from_os_str), default_value = "chitin.key")]
    base: PathBuf,

    /// Mod key file. Can be repeated, mods are merged in the given order.
    #[structopt(short, long = "mod", parse(from_os_str), required = true)]
    mods: Vec<PathBuf>,

    /// Output key file. Defaults to the base key file.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Archive path segment to replace in mod archive filenames.
    #[structopt(long)]
    rewrite_from: Option<String>,

    /// Replacement for the `rewrite-from` segment (e.g. the mod folder name).
    #[structopt(long)]
    rewrite_to: Option<String>,

    /// Keep mod archive filenames as they are.
    #[structopt(long)]
    no_rewrite: bool,

    /// Fail when a key file contains the same resource twice.
    #[structopt(long)]
    strict: bool,

    /// Do not create `<base>.bak` when overwriting the base key file.
    #[structopt(long)]
    no_backup: bool,
}

fn main() {
    env_logger::init();

    let params = KeyMergeParameters::from_args();
    let settings = match load_settings() {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            std::process::exit(2);
        }
    };

    match KeyMerge::new(settings).execute(params) {
        Ok(report) => {
            for (stage, time) in report.stats.stages() {
                println!("{}={}ms", stage, time.as_millis());
            }
            if let Some(backup) = &report.backup {
                info!("base key backed up to {:?}", backup);
            }
            println!(
                "Conversion complete. {:?} has {} archives and {} resources.",
                report.output, report.archives, report.resources
            );
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
