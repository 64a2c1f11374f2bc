use clap::ArgMatches;
use rollcall::StorageAdapterFactory;
use rollcall::health::HealthChecker;

use super::load_config;
use crate::error::{CliError, CliResult};

/// Prints a JSON health report for the configured storage and dependencies.
pub async fn handle_status_command(global: &ArgMatches) -> CliResult<()> {
    let config = load_config(global)?;
    let storage = StorageAdapterFactory::create(&config.storage)?;

    let report = HealthChecker::from_config(storage, &config).check().await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.healthy {
        return Ok(());
    }
    let mut problems: Vec<String> = report.storage_error.into_iter().collect();
    problems.extend(
        report
            .failed_dependencies
            .into_iter()
            .map(|failure| format!("{} {}", failure.url, failure.error)),
    );
    Err(CliError::Unhealthy(problems.join("; ")))
}
