use clap::{Arg, Command};
use std::process;

mod commands;
mod error;

use commands::*;
use error::CliError;

fn cli() -> Command<'static> {
    Command::new("Rollcall")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Leader election over a shared store")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML, YAML or JSON configuration file")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            Command::new("start")
                .about("Run a leadership candidate until interrupted")
                .arg(
                    Arg::new("id")
                        .short('i')
                        .long("id")
                        .value_name("ID")
                        .help("Sets the member ID (random UUID by default)")
                        .takes_value(true),
                ),
        )
        .subcommand(Command::new("members").about("List the membership table"))
        .subcommand(Command::new("status").about("Print a health report"))
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    let result = match matches.subcommand() {
        Some(("start", sub_matches)) => handle_start_command(&matches, sub_matches).await,
        Some(("members", _)) => handle_members_command(&matches).await,
        Some(("status", _)) => handle_status_command(&matches).await,
        Some((cmd, _)) => Err(CliError::UnknownCommand(cmd.to_string())),
        None => Err(CliError::NoCommand),
    };

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        process::exit(1);
    }
}
