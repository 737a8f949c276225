// Command handlers module
pub mod info;
pub mod run;
pub mod version;

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

use crate::core::config::KNOWN_SOURCES;

/// Options shared by every command that resolves a `Config`
fn config_args() -> Vec<Arg> {
    vec![
        Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("JSON config file (default: <config dir>/hostmon/config.json if present)")
            .value_parser(value_parser!(PathBuf)),
        Arg::new("interval")
            .short('i')
            .long("interval")
            .value_name("SECONDS")
            .help("Seconds between two samples")
            .value_parser(value_parser!(u64)),
        Arg::new("ticks-per-flush")
            .short('k')
            .long("ticks-per-flush")
            .value_name("TICKS")
            .help("Write buffered samples to disk once every TICKS samples")
            .value_parser(value_parser!(u32)),
        Arg::new("disk-path")
            .short('d')
            .long("disk-path")
            .value_name("PATH")
            .help("Report usage of the filesystem holding PATH")
            .value_parser(value_parser!(PathBuf)),
        Arg::new("output")
            .short('o')
            .long("output")
            .value_name("FILE")
            .help("CSV file to write")
            .value_parser(value_parser!(PathBuf)),
        Arg::new("source-timeout-ms")
            .long("source-timeout-ms")
            .value_name("MS")
            .help("Read budget per source and tick (default: half the interval)")
            .value_parser(value_parser!(u64)),
        Arg::new("sources")
            .short('s')
            .long("sources")
            .value_name("LIST")
            .help(format!(
                "Comma-separated categories to sample ({})",
                KNOWN_SOURCES.join(",")
            ))
            .value_delimiter(','),
    ]
}

/// Command-line definition
pub fn build_cli() -> Command {
    Command::new("hostmon")
        .about("Samples host metrics and stores them in an append-only CSV file")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("run")
                .about("Sample until interrupted, flushing to disk in batches")
                .args(config_args())
                .arg(
                    Arg::new("ticks")
                        .long("ticks")
                        .value_name("N")
                        .help("Stop after N samples instead of waiting for a signal")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Print static machine information as CSV")
                .args(config_args()),
        )
        .subcommand(Command::new("version").about("Shows version information"))
}
