//! Module for the background loops of an election.
//!
//! Every registered process runs the heartbeat loop, which refreshes its own
//! membership row once per heartbeat interval. Followers also run the monitor
//! loop, which checks the leader twice per interval and re-elects once the
//! leader has been quiet for two full intervals.
//!
//! Both loops sleep through [`Shutdown::sleep`] and stop at the next
//! suspension point once shutdown is requested. A leader whose row was
//! removed by a peer records the eviction and requests shutdown, since the
//! peers have already elected someone else.

use log::{debug, error, info, warn};
use std::sync::Arc;

use super::election::{LeaderElection, MonitorOutcome};
use super::error::ElectionError;
use crate::metrics;
use crate::shutdown::Shutdown;

pub(crate) async fn run_heartbeat(election: Arc<LeaderElection>, shutdown: Shutdown) {
    let interval = election.settings().heartbeat_interval;
    debug!("heartbeat loop started for {} every {:?}", election.id(), interval);

    while shutdown.sleep(interval).await {
        match election.heartbeat().await {
            Ok(0) if election.is_leader() => {
                let evicted = ElectionError::Evicted {
                    id: election.id().to_string(),
                };
                error!("{}, stepping down", evicted);
                election.record_failure(evicted);
                shutdown.initiate_shutdown();
                break;
            }
            Ok(_) => metrics::HEARTBEATS.inc(),
            Err(e) => {
                metrics::HEARTBEAT_FAILURES.inc();
                warn!("[{}] {}, retrying next tick", e.category(), e);
            }
        }
    }
    debug!("heartbeat loop stopped for {}", election.id());
}

pub(crate) async fn run_monitor(election: Arc<LeaderElection>, shutdown: Shutdown) {
    let interval = election.settings().monitor_interval();
    debug!("monitor loop started for {} every {:?}", election.id(), interval);

    while shutdown.sleep(interval).await {
        match election.check_leader().await {
            Ok(MonitorOutcome::Healthy) => {}
            Ok(MonitorOutcome::Elected) => {
                info!("node {} took over leadership", election.id());
                break;
            }
            Ok(MonitorOutcome::LeaderChanged(leader)) => {
                info!("node {} now monitors leader {}", election.id(), leader.id);
            }
            Err(e) if e.is_fatal() => {
                error!("monitor for {} stopped: {}", election.id(), e);
                election.record_failure(e);
                shutdown.initiate_shutdown();
                break;
            }
            Err(e) => warn!(
                "[{}] leader check failed for {}: {}",
                e.category(),
                election.id(),
                e
            ),
        }
    }
    debug!("monitor loop stopped for {}", election.id());
}
