use anyhow::Context;
use definitions::Alphabet;
use std::path::PathBuf;
use stitch_cli::pipeline::{run_pipeline, PipelineConfig};
#[macro_use]
extern crate log;

fn main() -> anyhow::Result<()> {
    let matches = stitch_cli::stitch_commands::stitch_parser().get_matches();
    let config = match matches.subcommand() {
        Some(("pipeline", sub_m)) => {
            let path: &String = sub_m.get_one("profile").context("profile")?;
            PipelineConfig::from_path(path)?
        }
        Some(("consensus", sub_m)) => {
            let input: &String = sub_m.get_one("input").context("input")?;
            let output = sub_m.get_one::<String>("output").map(PathBuf::from);
            let alphabet = sub_m.get_one::<Alphabet>("alphabet").cloned();
            let threads = sub_m.get_one::<usize>("threads").copied().unwrap_or(1);
            let verbose = sub_m.get_count("verbose") as usize;
            let with_quality = sub_m.get_flag("with_quality");
            PipelineConfig::new(input.into(), output, alphabet, verbose, threads, with_quality)
        }
        _ => unreachable!(),
    };
    let level = match config.verbose() {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    set_threads(config.threads());
    run_pipeline(&config)
}

fn set_threads(threads: usize) {
    debug!("Set Threads\t{}", threads);
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        warn!("{:?}", why);
    }
}
