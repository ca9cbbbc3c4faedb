use key::{DecodeOptions, Index, TypeRegistry};
use log::error;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "keyinfo")]
struct Opt {
    /// Key file to inspect.
    #[structopt(short, long, parse(from_os_str))]
    input: PathBuf,

    /// Print every resource.
    #[structopt(short, long)]
    resources: bool,

    /// Dump the whole index as JSON instead.
    #[structopt(short, long)]
    json: bool,

    /// Fail on duplicate resources.
    #[structopt(long)]
    strict: bool,

    /// Print the name of the resource stored at specified archive and slot.
    #[structopt(long, number_of_values = 2, value_names = &["ARCHIVE", "SLOT"])]
    locate: Option<Vec<u32>>,
}

fn main() {
    env_logger::init();

    let opt = Opt::from_args();
    let index = match load(&opt) {
        Ok(index) => index,
        Err(e) => {
            error!("cannot read {:?}: {}", opt.input, e);
            std::process::exit(1);
        }
    };

    if opt.json {
        match serde_json::to_string_pretty(&index) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("cannot serialize index: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let registry = TypeRegistry::standard();

    if let Some(location) = &opt.locate {
        match index.resource_name(location[0], location[1], registry) {
            Ok(name) => println!("{}", name),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    print_summary(&index, opt.resources, registry);

    if let Err(e) = index.validate() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn load(opt: &Opt) -> Result<Index, Box<dyn std::error::Error>> {
    let file = File::open(&opt.input)?;
    let index = key::decode_with(
        &mut BufReader::new(file),
        DecodeOptions { strict: opt.strict },
    )?;
    Ok(index)
}

fn print_summary(index: &Index, resources: bool, registry: &TypeRegistry) {
    println!("archives={}", index.archives().len());
    println!("resources={}", index.resources().len());
    println!("identities={}", index.identity_count());

    for (idx, archive) in index.archives().iter().enumerate() {
        println!(
            "archive idx={} path={} length={} location={}",
            idx, archive.filename, archive.length, archive.file_location
        );
    }

    if !resources {
        return;
    }

    for res in index.resources() {
        let archive = res.location.archive();
        let path = index.archive_path(archive).unwrap_or("<missing>");
        let ext = match registry.type_to_extension(res.kind) {
            "" => format!("{:#06x}", res.kind),
            ext => ext.to_string(),
        };
        println!(
            "res {}.{}: {} {} in {}",
            res.name.identity(),
            ext,
            archive,
            res.location.slot(),
            path
        );
    }
}
