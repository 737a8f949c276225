use anyhow::Result;

use hostmon::commands;

fn main() -> Result<()> {
    hostmon::init_logging();

    let matches = commands::build_cli().get_matches();

    if matches.get_flag("version") {
        return commands::version::execute();
    }

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run::execute(sub_matches)?,
        Some(("info", sub_matches)) => commands::info::execute(sub_matches)?,
        Some(("version", _)) => commands::version::execute()?,
        _ => {
            println!("Welcome to hostmon!");
            println!("Use 'hostmon --help' for more information.");
        }
    }

    Ok(())
}
