//! Health reporting.
//!
//! A check pings the store, folds the shared membership table the same way
//! every candidate does, and probes the configured HTTP dependencies. A
//! checker attached to a running election also reports that process's own
//! id and role.

use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::leadership::member::{elect, now_millis};
use crate::leadership::{LeaderElection, Member, NodeRole, read_members};
use crate::storage::{StorageAdapter, StorageResult};

const DEFAULT_DEPENDENCY_TIMEOUT: Duration = Duration::from_secs(5);

/// The view of the process running the check.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct NodeStatus {
    pub id: String,
    pub role: NodeRole,
    pub leader_id: Option<String>,
}

/// What every candidate would conclude from the membership table right now.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MembershipSummary {
    pub leader_id: Option<String>,
    /// The leader has been quiet long enough to be replaced.
    pub leader_stale: bool,
    pub members: usize,
    pub stale_members: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DependencyFailure {
    pub url: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthReport {
    pub healthy: bool,
    pub election_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeStatus>,
    /// Absent for memory storage and when storage checks are off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership: Option<MembershipSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_dependencies: Vec<DependencyFailure>,
}

pub struct HealthChecker {
    storage: Arc<dyn StorageAdapter>,
    heartbeat_interval: Duration,
    election: Option<Arc<LeaderElection>>,
    check_storage: bool,
    dependencies: Vec<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HealthChecker {
    /// Creates a checker for a store, without any dependencies.
    ///
    /// # Arguments
    ///
    /// * `storage` - The shared store to ping and summarize.
    /// * `heartbeat_interval` - The candidates' interval, used for staleness.
    pub fn new(storage: Arc<dyn StorageAdapter>, heartbeat_interval: Duration) -> Self {
        Self {
            storage,
            heartbeat_interval,
            election: None,
            check_storage: true,
            dependencies: Vec::new(),
            timeout: DEFAULT_DEPENDENCY_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Creates a checker with the storage toggle and dependencies of `config`.
    pub fn from_config(storage: Arc<dyn StorageAdapter>, config: &ServiceConfig) -> Self {
        Self::new(storage, config.leadership.heartbeat_interval())
            .check_storage(config.health.check_storage)
            .with_dependencies(config.health.dependencies.clone(), config.health.timeout())
    }

    /// Creates a checker reporting on a running election.
    pub fn for_election(election: Arc<LeaderElection>) -> Self {
        let mut checker = Self::new(
            Arc::clone(election.storage()),
            election.settings().heartbeat_interval,
        );
        checker.election = Some(election);
        checker
    }

    /// Attaches a running election to a checker built from config.
    pub fn with_election(mut self, election: Arc<LeaderElection>) -> Self {
        self.election = Some(election);
        self
    }

    pub fn check_storage(mut self, enabled: bool) -> Self {
        self.check_storage = enabled;
        self
    }

    /// Sets the HTTP endpoints probed by every check.
    ///
    /// # Arguments
    ///
    /// * `dependencies` - URLs requested with `GET`; a status of 400 or above fails.
    /// * `timeout` - Upper bound for each request.
    pub fn with_dependencies(mut self, dependencies: Vec<String>, timeout: Duration) -> Self {
        self.dependencies = dependencies;
        self.timeout = timeout;
        self
    }

    /// Runs every configured check once.
    pub async fn check(&self) -> HealthReport {
        let election_enabled = self.storage.model().is_persistent();

        let (membership, storage_error) = if self.check_storage {
            match self.storage_check(election_enabled).await {
                Ok(membership) => (membership, None),
                Err(e) => {
                    warn!("health check failure: storage check failed: {}", e);
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let failed_dependencies = self.check_dependencies().await;

        let node = self.election.as_ref().map(|election| NodeStatus {
            id: election.id().to_string(),
            role: election.role(),
            leader_id: election.leader().map(|leader| leader.id),
        });

        HealthReport {
            healthy: storage_error.is_none() && failed_dependencies.is_empty(),
            election_enabled,
            node,
            membership,
            storage_error,
            failed_dependencies,
        }
    }

    async fn storage_check(&self, election_enabled: bool) -> StorageResult<Option<MembershipSummary>> {
        self.storage.ping().await?;
        if !election_enabled {
            return Ok(None);
        }
        let members = read_members(self.storage.as_ref()).await?;
        Ok(Some(summarize(&members, now_millis(), self.heartbeat_interval)))
    }

    async fn check_dependencies(&self) -> Vec<DependencyFailure> {
        let mut failures = Vec::new();
        for url in &self.dependencies {
            let error = match self.client.get(url).timeout(self.timeout).send().await {
                Ok(response) if response.status().as_u16() >= 400 => {
                    format!("returned response code {}", response.status().as_u16())
                }
                Ok(_) => {
                    debug!("dependency {} is healthy", url);
                    continue;
                }
                Err(e) => format!("request failed: {}", e),
            };
            warn!("health check failure: dependency {} {}", url, error);
            failures.push(DependencyFailure {
                url: url.clone(),
                error,
            });
        }
        failures
    }
}

/// Folds `members` into the leader every candidate agrees on and counts stale rows.
pub fn summarize(members: &[Member], now: i64, heartbeat_interval: Duration) -> MembershipSummary {
    let leader = elect(None, members.iter().cloned());
    MembershipSummary {
        leader_stale: leader
            .as_ref()
            .is_some_and(|leader| leader.is_stale(now, heartbeat_interval)),
        leader_id: leader.map(|leader| leader.id),
        members: members.len(),
        stale_members: members
            .iter()
            .filter(|member| member.is_stale(now, heartbeat_interval))
            .count(),
    }
}
