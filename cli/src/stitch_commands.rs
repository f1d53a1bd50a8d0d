use clap::{value_parser, Arg, ArgAction, Command};
use definitions::Alphabet;

fn verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .help("Debug mode")
}

fn subcommand_consensus() -> Command {
    Command::new("consensus")
        .version("0.1")
        .about("Stitch predictions on overlapping chunks (JSON) into consensus sequences (JSON).")
        .arg(verbose())
        .arg(
            Arg::new("input")
                .long("input")
                .short('i')
                .value_name("CHUNKS")
                .required(true)
                .help("Input JSON file. Either a job with regions or a list of chunks."),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .value_name("PATH")
                .help("Output JSON file. Stdout if not given."),
        )
        .arg(
            Arg::new("alphabet")
                .long("alphabet")
                .value_name("SYMBOLS")
                .allow_hyphen_values(true)
                .value_parser(|s: &str| s.parse::<Alphabet>())
                .help("Output channels of the network. The first one is the placeholder. Overrides the input."),
        )
        .arg(
            Arg::new("with_quality")
                .long("with_quality")
                .action(ArgAction::SetTrue)
                .help("Report the probability and Phred score of each base."),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(usize))
                .default_value("1")
                .help("number of threads"),
        )
}

fn subcommand_pipeline() -> Command {
    Command::new("pipeline")
        .version("0.1")
        .about("Run the stitching with the parameters in a TOML profile.")
        .arg(
            Arg::new("profile")
                .value_name("TOML")
                .required(true)
                .help("TOML setting file."),
        )
}

pub fn stitch_parser() -> Command {
    Command::new("stitch")
        .version("0.1")
        .about("Consensus from chunked predictions")
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(subcommand_consensus())
        .subcommand(subcommand_pipeline())
}
