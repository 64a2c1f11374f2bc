//! Module for leader election.
//!
//! The `LeaderElection` struct runs one process's side of the election over a
//! shared membership table. Processes never talk to each other: each one
//! registers a row, keeps its heartbeat fresh, and folds the table into the
//! same deterministic winner.
//!
//! # Example
//! The following example runs an election over in-process storage, which
//! disables the election and makes the caller leader right away.
//! ```
//! use rollcall::leadership::{ElectionSettings, LeaderElection, NodeRole};
//! use rollcall::shutdown::Shutdown;
//! use rollcall::storage::MemoryAdapter;
//! use std::sync::Arc;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let election = Arc::new(LeaderElection::new(
//!     Arc::new(MemoryAdapter::new()),
//!     ElectionSettings::default(),
//! ));
//! let elected = election.elected().unwrap();
//! let handle = election.start(Shutdown::default()).await.unwrap();
//!
//! assert!(elected.await.is_some());
//! assert_eq!(election.role(), NodeRole::Leader);
//! handle.stop().await.unwrap();
//! # });
//! ```

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

use super::error::{ElectionError, LeadershipResult};
use super::heartbeat::{run_heartbeat, run_monitor};
use super::member::{Member, elect, now_millis};
use super::notifier::{ElectedSignal, ResultNotifier};
use super::state::NodeRole;
use super::table::{Replication, TableOptions, ensure_membership_table, read_members};
use crate::config::ServiceConfig;
use crate::metrics;
use crate::shutdown::{Shutdown, TaskManager};
use crate::storage::{Statement, StorageAdapter, StorageError};

/// Timing and table settings for one election.
#[derive(Debug, Clone)]
pub struct ElectionSettings {
    pub heartbeat_interval: Duration,
    pub table: TableOptions,
}

impl Default for ElectionSettings {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl ElectionSettings {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            heartbeat_interval,
            table: TableOptions::default(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        let options = &config.storage.config;
        let replication = match (&options.region, options.global) {
            (Some(region), true) => Some(Replication {
                region: region.clone(),
                regions: options.regions.clone(),
            }),
            _ => None,
        };
        Self {
            heartbeat_interval: config.leadership.heartbeat_interval(),
            table: TableOptions {
                replication,
                ..TableOptions::default()
            },
        }
    }

    /// Followers check the leader twice per heartbeat interval.
    pub fn monitor_interval(&self) -> Duration {
        self.heartbeat_interval / 2
    }

    /// A leader quiet for this long is replaced.
    pub fn staleness_threshold(&self) -> Duration {
        self.heartbeat_interval.saturating_mul(2)
    }
}

/// What one leader freshness check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The leader's heartbeat is fresh.
    Healthy,
    /// The leader was stale and this process won the re-election.
    Elected,
    /// The leader was stale and another member won.
    LeaderChanged(Member),
}

#[derive(Debug, Default)]
struct ElectionState {
    leader: Option<Member>,
    role: NodeRole,
}

/// One process's participation in the election.
pub struct LeaderElection {
    id: String,
    storage: Arc<dyn StorageAdapter>,
    settings: ElectionSettings,
    state: RwLock<ElectionState>,
    notifier: ResultNotifier,
    failure: Mutex<Option<ElectionError>>,
    started: AtomicBool,
}

impl LeaderElection {
    /// Creates an election with a fresh random member id.
    pub fn new(storage: Arc<dyn StorageAdapter>, settings: ElectionSettings) -> Self {
        Self::with_id(&Uuid::new_v4().to_string(), storage, settings)
    }

    /// Creates an election for a fixed member id.
    ///
    /// # Arguments
    ///
    /// * `id` - The member id written to the membership table.
    /// * `storage` - The shared store every candidate points at.
    /// * `settings` - Heartbeat interval and table options.
    ///
    /// # Examples
    ///
    /// ```
    /// use rollcall::leadership::{ElectionSettings, LeaderElection, NodeRole};
    /// use rollcall::storage::MemoryAdapter;
    /// use std::sync::Arc;
    ///
    /// let election = LeaderElection::with_id(
    ///     "scheduler-1",
    ///     Arc::new(MemoryAdapter::new()),
    ///     ElectionSettings::default(),
    /// );
    /// assert_eq!(election.id(), "scheduler-1");
    /// assert_eq!(election.role(), NodeRole::Unregistered);
    /// ```
    pub fn with_id(id: &str, storage: Arc<dyn StorageAdapter>, settings: ElectionSettings) -> Self {
        Self {
            id: id.to_string(),
            storage,
            settings,
            state: RwLock::new(ElectionState::default()),
            notifier: ResultNotifier::new(),
            failure: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Gets the timing and table settings.
    ///
    /// # Returns
    /// The settings the election was created with.
    pub fn settings(&self) -> &ElectionSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    /// The most recently elected member, possibly this process.
    pub fn leader(&self) -> Option<Member> {
        self.state.read().leader.clone()
    }

    pub fn role(&self) -> NodeRole {
        self.state.read().role
    }

    pub fn is_leader(&self) -> bool {
        self.role() == NodeRole::Leader
    }

    /// Hands out the one-shot "elected" signal. Only the first call gets it.
    pub fn elected(&self) -> Option<ElectedSignal> {
        self.notifier.subscribe()
    }

    /// False for process-local storage, where there is nobody to elect against.
    pub fn election_enabled(&self) -> bool {
        self.storage.model().is_persistent()
    }

    /// The fatal error that ended the monitor loop, if any.
    pub fn take_failure(&self) -> Option<ElectionError> {
        self.failure.lock().take()
    }

    pub(crate) fn record_failure(&self, error: ElectionError) {
        *self.failure.lock() = Some(error);
    }

    pub async fn prepare_table(&self) -> LeadershipResult<()> {
        ensure_membership_table(self.storage.as_ref(), &self.settings.table).await
    }

    /// Writes this process's membership row.
    ///
    /// The registration timestamp is taken now and decides seniority for
    /// every later election. Registering again replaces the row and so
    /// forfeits the old seniority.
    ///
    /// # Returns
    /// The member row as written.
    pub async fn register(&self) -> LeadershipResult<Member> {
        let member = Member::new(&self.id, now_millis());
        self.storage
            .create_or_replace(&member)
            .await
            .map_err(|source| ElectionError::Registration {
                id: self.id.clone(),
                source,
            })?;
        self.set_role(NodeRole::Registered);
        info!("registered member {} at {}", self.id, member.registration);
        Ok(member)
    }

    /// Refreshes this process's heartbeat.
    ///
    /// # Returns
    /// The number of rows touched: 1 normally, 0 once a peer removed the row.
    ///
    /// A row removed by a peer is not re-created: the process keeps running
    /// but is no longer a candidate.
    pub async fn heartbeat(&self) -> LeadershipResult<u64> {
        let touched = self
            .storage
            .execute(&Statement::update_heartbeat(&self.id, now_millis()))
            .await
            .map_err(|source| ElectionError::Heartbeat {
                id: self.id.clone(),
                source,
            })?;
        if touched == 0 {
            warn!(
                "heartbeat for {} touched no rows, the member was removed by a peer",
                self.id
            );
        } else {
            debug!("heartbeat sent for {}", self.id);
        }
        Ok(touched)
    }

    /// Runs the election over the current membership table.
    ///
    /// A re-election first removes the current (stale) leader's row.
    ///
    /// # Arguments
    ///
    /// * `re_election` - `true` when replacing a stale leader.
    ///
    /// # Returns
    /// The winning member. This process becomes leader when it is the winner.
    pub async fn elect_leader(&self, re_election: bool) -> LeadershipResult<Member> {
        let current = self.leader();

        if re_election {
            if let Some(stale) = &current {
                self.storage
                    .delete(&stale.id)
                    .await
                    .map_err(|source| ElectionError::RemoveLeader {
                        id: stale.id.clone(),
                        source,
                    })?;
                info!("removed stale leader {}", stale.id);
            }
        }

        let members = self
            .storage
            .list()
            .await
            .map_err(ElectionError::ListMembers)?;
        let seed = if re_election { None } else { current };
        let winner = elect(seed, members).ok_or(ElectionError::NoCandidates)?;

        self.state.write().leader = Some(winner.clone());
        metrics::ELECTIONS.inc();
        if re_election {
            metrics::REELECTIONS.inc();
        }

        if winner.id == self.id {
            self.become_leader();
        } else {
            self.set_role(NodeRole::Follower);
            info!("node {} follows leader {}", self.id, winner.id);
        }
        Ok(winner)
    }

    /// Checks the leader's freshness once and re-elects when it went stale.
    ///
    /// A leader row that no longer exists counts as stale.
    ///
    /// # Returns
    /// What the check concluded, see [`MonitorOutcome`]. Errors from the
    /// leader lookup or the member listing are transient; a failed removal
    /// of the stale leader is fatal.
    pub async fn check_leader(&self) -> LeadershipResult<MonitorOutcome> {
        let Some(leader) = self.leader() else {
            return self.re_elect().await;
        };

        let staleness = match self.storage.get(&leader.id).await {
            Ok(fresh) => {
                let staleness = fresh.staleness(now_millis());
                self.state.write().leader = Some(fresh);
                staleness
            }
            Err(StorageError::NotFound(_)) => Duration::MAX,
            Err(source) => {
                return Err(ElectionError::LeaderLookup {
                    id: leader.id.clone(),
                    source,
                });
            }
        };

        if staleness < self.settings.staleness_threshold() {
            debug!("leader {} is healthy ({:?} since last heartbeat)", leader.id, staleness);
            return Ok(MonitorOutcome::Healthy);
        }

        if staleness == Duration::MAX {
            warn!("leader {} is gone from the membership table", leader.id);
        } else {
            warn!("leader {} is stale ({:?} since last heartbeat)", leader.id, staleness);
        }
        self.re_elect().await
    }

    async fn re_elect(&self) -> LeadershipResult<MonitorOutcome> {
        let winner = self.elect_leader(true).await?;
        if winner.id == self.id {
            Ok(MonitorOutcome::Elected)
        } else {
            Ok(MonitorOutcome::LeaderChanged(winner))
        }
    }

    /// Every registered member, most senior first.
    pub async fn members(&self) -> LeadershipResult<Vec<Member>> {
        read_members(self.storage.as_ref())
            .await
            .map_err(ElectionError::ListMembers)
    }

    /// Runs the startup sequence and spawns the background loops.
    ///
    /// Fatal errors (table setup, registration, the initial election) are
    /// returned and nothing is left running.
    pub async fn start(self: &Arc<Self>, shutdown: Shutdown) -> LeadershipResult<ElectionHandle> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ElectionError::AlreadyStarted);
        }
        let tasks = TaskManager::new(shutdown.clone());

        if !self.election_enabled() {
            info!("memory storage configured, leader election is disabled");
            self.state.write().leader = Some(Member::new(&self.id, now_millis()));
            self.become_leader();
            return Ok(ElectionHandle { tasks, shutdown });
        }

        self.prepare_table().await?;
        self.register().await?;

        tasks.register_task(
            "heartbeat",
            tokio::spawn(run_heartbeat(Arc::clone(self), shutdown.clone())),
        );

        let leader = match self.elect_leader(false).await {
            Ok(leader) => leader,
            Err(e) => {
                error!("initial election failed for {}: {}", self.id, e);
                tasks.abort_all();
                return Err(e);
            }
        };

        if leader.id != self.id {
            tasks.register_task(
                "monitor",
                tokio::spawn(run_monitor(Arc::clone(self), shutdown.clone())),
            );
        }
        Ok(ElectionHandle { tasks, shutdown })
    }

    fn become_leader(&self) {
        self.set_role(NodeRole::Leader);
        metrics::IS_LEADER.set(1);
        if self.notifier.notify() {
            info!("node {} is now the leader", self.id);
        }
    }

    fn set_role(&self, next: NodeRole) {
        let mut state = self.state.write();
        if state.role.can_become(next) {
            state.role = next;
        } else if state.role != next {
            debug!("ignoring role change {} -> {} for {}", state.role, next, self.id);
        }
    }
}

/// Owns the background loops started by [`LeaderElection::start`].
pub struct ElectionHandle {
    tasks: TaskManager,
    shutdown: Shutdown,
}

impl ElectionHandle {
    /// Number of loops still tracked.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Names of the loops that are still running.
    pub fn running_tasks(&self) -> Vec<String> {
        self.tasks.running()
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Signals shutdown and joins the loops.
    pub async fn stop(self) -> Result<(), Vec<String>> {
        self.shutdown.initiate_shutdown();
        self.tasks.shutdown_all_tasks().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAdapter;
    use crate::storage::SqliteAdapter;

    fn sqlite_election(id: &str, storage: Arc<SqliteAdapter>) -> LeaderElection {
        LeaderElection::with_id(id, storage, ElectionSettings::new(Duration::from_millis(100)))
    }

    #[test]
    fn test_settings() {
        let settings = ElectionSettings::new(Duration::from_secs(60));
        assert_eq!(settings.monitor_interval(), Duration::from_secs(30));
        assert_eq!(settings.staleness_threshold(), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_memory_storage_elects_immediately() {
        let storage = Arc::new(MemoryAdapter::new());
        let election = Arc::new(LeaderElection::new(storage.clone(), ElectionSettings::default()));
        assert!(!election.election_enabled());

        let handle = election.start(Shutdown::default()).await.unwrap();
        assert!(election.is_leader());
        assert_eq!(handle.task_count(), 0);
        // No registration happened.
        assert!(storage.is_empty());
        assert!(election.elected().unwrap().await.is_some());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let election = Arc::new(LeaderElection::new(
            Arc::new(MemoryAdapter::new()),
            ElectionSettings::default(),
        ));
        election.start(Shutdown::default()).await.unwrap();
        assert!(matches!(
            election.start(Shutdown::default()).await,
            Err(ElectionError::AlreadyStarted)
        ));
    }

    /// Tests the election order over a shared SQLite store.
    ///
    /// # Purpose
    /// The earliest registration wins and a later registrant follows it.
    ///
    /// # Steps
    /// 1. Register two members, `first` before `second`.
    /// 2. Elect from both sides.
    /// 3. Verify both agree and only `first` is leader.
    #[tokio::test]
    async fn test_earliest_registrant_wins() {
        let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
        let first = sqlite_election("first", storage.clone());
        let second = sqlite_election("second", storage.clone());
        first.prepare_table().await.unwrap();

        storage.create_or_replace(&Member::new("first", 10)).await.unwrap();
        storage.create_or_replace(&Member::new("second", 20)).await.unwrap();

        assert_eq!(second.elect_leader(false).await.unwrap().id, "first");
        assert_eq!(first.elect_leader(false).await.unwrap().id, "first");
        assert_eq!(second.role(), NodeRole::Follower);
        assert!(first.is_leader());
        assert!(first.elected().unwrap().await.is_some());
    }

    #[tokio::test]
    async fn test_empty_table_has_no_candidates() {
        let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
        let election = sqlite_election("lonely", storage);
        election.prepare_table().await.unwrap();
        assert!(matches!(
            election.elect_leader(false).await,
            Err(ElectionError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn test_fresh_leader_is_healthy() {
        let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
        let follower = sqlite_election("follower", storage.clone());
        follower.prepare_table().await.unwrap();

        let now = now_millis();
        storage.create_or_replace(&Member::new("leader", now - 1_000).with_heartbeat(now)).await.unwrap();
        follower.register().await.unwrap();
        follower.elect_leader(false).await.unwrap();

        assert_eq!(follower.check_leader().await.unwrap(), MonitorOutcome::Healthy);
        assert_eq!(follower.role(), NodeRole::Follower);
    }

    /// Tests takeover after the leader stops heartbeating.
    ///
    /// # Purpose
    /// A stale leader is removed and the next most senior member wins.
    ///
    /// # Steps
    /// 1. Store a leader whose heartbeat is far in the past.
    /// 2. Register the follower and run the initial election.
    /// 3. Check the leader and verify the follower took over.
    #[tokio::test]
    async fn test_stale_leader_is_replaced() {
        let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
        let follower = sqlite_election("follower", storage.clone());
        follower.prepare_table().await.unwrap();

        storage.create_or_replace(&Member::new("leader", 1)).await.unwrap();
        follower.register().await.unwrap();
        assert_eq!(follower.elect_leader(false).await.unwrap().id, "leader");

        assert_eq!(follower.check_leader().await.unwrap(), MonitorOutcome::Elected);
        assert!(follower.is_leader());
        assert!(matches!(storage.get("leader").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_heartbeat_after_removal_touches_nothing() {
        let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
        let election = sqlite_election("ghost", storage.clone());
        election.prepare_table().await.unwrap();
        election.register().await.unwrap();
        assert_eq!(election.heartbeat().await.unwrap(), 1);

        storage.delete("ghost").await.unwrap();
        assert_eq!(election.heartbeat().await.unwrap(), 0);
        // The row is not re-created.
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_members_are_sorted_by_seniority() {
        let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
        let election = sqlite_election("x", storage.clone());
        election.prepare_table().await.unwrap();
        for (id, registration) in [("c", 30), ("a", 10), ("b", 10)] {
            storage.create_or_replace(&Member::new(id, registration)).await.unwrap();
        }
        let ids: Vec<String> = election
            .members()
            .await
            .unwrap()
            .into_iter()
            .map(|member| member.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
