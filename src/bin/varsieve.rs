use anyhow::Result;
use structopt::StructOpt;

use varsieve::cli::{run, Varsieve};

pub fn main() -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("{}: {}", record.level(), message))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr())
        .apply()?;

    run(Varsieve::from_args())
}
