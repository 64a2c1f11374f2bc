//! # rollcall
//!
//! Rollcall is leader election for a fleet of identical service instances
//! that share a persistent store.
//! Exactly one instance at a time runs singleton work (scheduled jobs,
//! cleanups); the others stay passive and take over when the leader stops
//! refreshing its heartbeat. The shared store is the only rendezvous point:
//! instances never talk to each other directly.
//!
//! ## Installation
//!
//! To use Rollcall, add the following to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rollcall = "0.1"
//! ```
//!
//! ## Features
//!
//! - Deterministic election: earliest registration wins, ties go to the
//!   smallest member id
//! - Heartbeat and staleness based failover
//! - Relational (SQLite bundled; PostgreSQL and MySQL statement rendering)
//!   and key-value membership tables, with multi-region replication
//! - One-shot "elected" signal for a scheduler gate
//! - Health report, Prometheus metrics and graceful shutdown
//! - CLI based console
//!
//! ## Basic Usage
//!
//! ```rust
//! use rollcall::leadership::{ElectionSettings, LeaderElection};
//! use rollcall::shutdown::Shutdown;
//! use rollcall::storage::SqliteAdapter;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let storage = Arc::new(SqliteAdapter::open_in_memory().unwrap());
//! let election = Arc::new(LeaderElection::new(
//!     storage,
//!     ElectionSettings::new(Duration::from_secs(10)),
//! ));
//!
//! let elected = election.elected().unwrap();
//! let shutdown = Shutdown::default();
//! let handle = election.start(shutdown.clone()).await.unwrap();
//!
//! // The only member elects itself.
//! assert!(elected.await.is_some());
//! handle.stop().await.unwrap();
//! # });
//! ```
//!
//! ## Configuration
//!
//! [`config::ServiceConfig`] is read from TOML, YAML or JSON and can be
//! overridden through `ROLLCALL_*` environment variables:
//!
//! ```toml
//! [leadership]
//! heartbeat_interval_ms = 60000
//!
//! [storage]
//! type = "sql"
//! provider = "sqlite"
//!
//! [storage.config]
//! path = "./data/rollcall.db"
//! ```
//!
//! With `type = "memory"` nothing is shared, so the election is disabled
//! and every instance is leader at once.
//!
//! ## CLI Features
//!
//! ### start
//!
//! Runs a candidate until Ctrl-C or a fatal election error.
//!
//! ```bash
//! rollcall --config rollcall.toml start [--id <MEMBER_ID>]
//! ```
//!
//! ### members
//!
//! Prints the membership table, most senior first, with staleness.
//!
//! ```bash
//! rollcall --config rollcall.toml members
//! ```
//!
//! ### status
//!
//! Prints a JSON health report: storage reachability, the leader every
//! candidate agrees on, member and stale counts, and failed HTTP
//! dependencies.
//!
//! ```bash
//! rollcall --config rollcall.toml status
//! ```
//!
//! A running `start` serves the same report on `/health` and its metrics on
//! `/metrics` when `server.listen` is configured:
//!
//! ```toml
//! [health]
//! dependencies = ["http://localhost:8080/health"]
//!
//! [server]
//! listen = "127.0.0.1:9464"
//! ```

pub mod config;
pub mod health;
pub mod leadership;
pub mod logging;
pub mod metrics;
pub mod shutdown;
pub mod storage;
pub mod web;

pub use config::ServiceConfig;
pub use leadership::{ElectionCell, ElectionResult, LeaderElection, Member};
pub use storage::{StorageAdapter, StorageAdapterFactory};
