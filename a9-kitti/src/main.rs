mod dump;
mod info;
mod opts;

use a9_kitti::ConvertConfig;
use clap::Parser;
use eyre::{bail, Result, WrapErr};
use log::info;
use opts::{Info, Opts};

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    match opts {
        Opts::Convert(args) => {
            let config = ConvertConfig::from(args);
            info!(
                "Start converting '{}' into '{}'",
                config.load_dir.display(),
                config.save_dir.display()
            );

            let summary = a9_kitti::convert(&config).wrap_err("conversion aborted")?;
            if summary.failed > 0 {
                bail!(
                    "{} of {} frames failed to convert",
                    summary.failed,
                    summary.total
                );
            }
            info!("Finished");
        }
        Opts::Info(Info { file }) => {
            crate::info::info(file)?;
        }
        Opts::Dump(args) => {
            crate::dump::dump(args)?;
        }
    }

    Ok(())
}
