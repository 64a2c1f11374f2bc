pub mod members;
pub mod start;
pub mod status;

pub use members::handle_members_command;
pub use start::handle_start_command;
pub use status::handle_status_command;

use clap::ArgMatches;
use rollcall::ServiceConfig;
use std::path::Path;

use crate::error::CliResult;

/// Loads the configuration named by the global `--config` option.
pub fn load_config(matches: &ArgMatches) -> CliResult<ServiceConfig> {
    let path = matches.value_of("config").map(Path::new);
    Ok(ServiceConfig::load(path)?)
}
