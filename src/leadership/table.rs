//! Membership table lifecycle.
//!
//! Every process runs [`ensure_membership_table`] before registering. The
//! call is safe to race: losers of a concurrent create see "already exists"
//! and carry on.

use log::{debug, info};
use std::time::Duration;

use super::error::{ElectionError, LeadershipResult};
use super::member::Member;
use crate::storage::statement::{MEMBERS_TABLE, TableSchema};
use crate::storage::{
    Statement, StorageAdapter, StorageError, StorageResult, TableModel, TableStatus,
};

/// Multi-region replication of a key-value membership table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replication {
    /// The region this process runs in.
    pub region: String,
    /// Every region the table should live in, the local one included.
    pub regions: Vec<String>,
}

impl Replication {
    /// Regions to replicate into, excluding the local one.
    pub fn replica_regions(&self) -> Vec<String> {
        self.regions
            .iter()
            .filter(|region| **region != self.region)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Upper bound for a key-value table to become active.
    pub active_timeout: Duration,
    pub poll_interval: Duration,
    pub replication: Option<Replication>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            active_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
            replication: None,
        }
    }
}

/// Makes sure the membership table exists and is usable.
pub async fn ensure_membership_table(
    storage: &dyn StorageAdapter,
    options: &TableOptions,
) -> LeadershipResult<()> {
    match storage.model() {
        TableModel::Memory => {
            debug!("memory storage keeps no membership table");
            Ok(())
        }
        TableModel::Relational(provider) => {
            storage
                .execute(&Statement::CreateTable(TableSchema::members()))
                .await
                .map_err(ElectionError::TableSetup)?;
            info!("membership table ready ({})", provider);
            Ok(())
        }
        TableModel::KeyValue => {
            create_tolerating_existing(storage, Statement::CreateTable(TableSchema::members()))
                .await?;
            wait_until_active(storage, options).await?;
            if let Some(replication) = &options.replication {
                replicate(storage, replication).await?;
            }
            info!("membership table ready (key-value)");
            Ok(())
        }
    }
}

/// Reads the membership table without creating it, most senior first.
///
/// A table that was never created reads as empty.
pub async fn read_members(storage: &dyn StorageAdapter) -> StorageResult<Vec<Member>> {
    let mut members = match storage.list().await {
        Ok(members) => members,
        Err(StorageError::NotFound(what)) => {
            debug!("membership table missing ({}), no members yet", what);
            Vec::new()
        }
        Err(e) => return Err(e),
    };
    members.sort_by(|a, b| a.seniority(b));
    Ok(members)
}

async fn create_tolerating_existing(
    storage: &dyn StorageAdapter,
    statement: Statement,
) -> LeadershipResult<()> {
    match storage.execute(&statement).await {
        Ok(_) => Ok(()),
        Err(StorageError::AlreadyExists(_)) => {
            debug!("{} already exists", statement.table());
            Ok(())
        }
        Err(e) => Err(ElectionError::TableSetup(e)),
    }
}

async fn wait_until_active(
    storage: &dyn StorageAdapter,
    options: &TableOptions,
) -> LeadershipResult<()> {
    let poll = async {
        loop {
            match storage
                .table_status(MEMBERS_TABLE)
                .await
                .map_err(ElectionError::TableSetup)?
            {
                TableStatus::Active => return Ok::<(), ElectionError>(()),
                TableStatus::Deleting => {
                    return Err(ElectionError::TableSetup(StorageError::Backend(format!(
                        "{} is being deleted",
                        MEMBERS_TABLE
                    ))));
                }
                status => {
                    debug!("waiting for {} to become active ({:?})", MEMBERS_TABLE, status);
                    tokio::time::sleep(options.poll_interval).await;
                }
            }
        }
    };
    tokio::time::timeout(options.active_timeout, poll)
        .await
        .map_err(|_| ElectionError::TableTimeout(options.active_timeout))?
}

async fn replicate(storage: &dyn StorageAdapter, replication: &Replication) -> LeadershipResult<()> {
    let regions = replication.replica_regions();
    if regions.is_empty() {
        debug!("no remote regions to replicate {} into", MEMBERS_TABLE);
        return Ok(());
    }
    info!("replicating {} into {}", MEMBERS_TABLE, regions.join(", "));
    create_tolerating_existing(
        storage,
        Statement::CreateReplicationGroup {
            table: MEMBERS_TABLE.to_string(),
            regions,
        },
    )
    .await
}
