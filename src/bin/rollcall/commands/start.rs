use clap::ArgMatches;
use log::{error, info};
use rollcall::health::HealthChecker;
use rollcall::leadership::{ElectionSettings, LeaderElection};
use rollcall::shutdown::Shutdown;
use rollcall::{StorageAdapterFactory, logging, web};
use std::sync::Arc;

use super::load_config;
use crate::error::{CliError, CliResult};

fn validate_id(matches: &ArgMatches) -> CliResult<Option<String>> {
    match matches.value_of("id") {
        Some(id) if id.trim().is_empty() => Err(CliError::ParseError {
            field: "id".to_string(),
            message: "Member ID cannot be empty.".to_string(),
        }),
        Some(id) => Ok(Some(id.to_string())),
        None => Ok(None),
    }
}

/// Runs a candidate until Ctrl-C or a fatal election error.
pub async fn handle_start_command(global: &ArgMatches, matches: &ArgMatches) -> CliResult<()> {
    let id = validate_id(matches)?;
    let config = load_config(global)?;
    logging::init(&config.logging)?;

    let storage = StorageAdapterFactory::create(&config.storage)?;
    let settings = ElectionSettings::from_config(&config);
    let election = Arc::new(match id {
        Some(id) => LeaderElection::with_id(&id, Arc::clone(&storage), settings),
        None => LeaderElection::new(Arc::clone(&storage), settings),
    });
    info!(
        "starting member {} with {} storage, heartbeat every {:?}",
        election.id(),
        config.storage.storage_type,
        election.settings().heartbeat_interval
    );

    let shutdown = Shutdown::default();
    shutdown.initialize_signal_handlers()?;

    if let Some(elected) = election.elected() {
        let id = election.id().to_string();
        tokio::spawn(async move {
            if let Some(result) = elected.await {
                info!("{}: {}, leader-only work may begin", id, result);
            }
        });
    }

    let server = match &config.server.listen {
        Some(listen) => {
            let checker =
                HealthChecker::from_config(storage, &config).with_election(Arc::clone(&election));
            Some(web::bind(listen, checker)?)
        }
        None => None,
    };

    let handle = election.start(shutdown.clone()).await?;
    match server {
        Some(server) => {
            if let Err(e) = web::serve_until_shutdown(server, &shutdown).await {
                error!("health endpoint stopped: {}", e);
            }
        }
        None => shutdown.wait_for_shutdown().await,
    }

    if let Err(errors) = handle.stop().await {
        for e in errors {
            error!("{}", e);
        }
    }

    match election.take_failure() {
        Some(failure) => Err(failure.into()),
        None => {
            info!("member {} stopped", election.id());
            Ok(())
        }
    }
}
