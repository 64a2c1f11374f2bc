//! Storage port used by leader election.
//!
//! The election core talks to its backing store only through the
//! [`StorageAdapter`] trait. Adapters are either relational (rows in a SQL
//! table), key-value (items in a managed, possibly replicated table) or the
//! in-process [`MemoryAdapter`], which disables election altogether.
//!
//! # Example
//! ```
//! use rollcall::config::StorageConfig;
//! use rollcall::storage::{StorageAdapterFactory, TableModel};
//!
//! let adapter = StorageAdapterFactory::create(&StorageConfig::default()).unwrap();
//! assert_eq!(adapter.model(), TableModel::Memory);
//! ```

pub mod dialect;
pub mod error;
pub mod memory;
pub mod sqlite;
pub mod statement;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::StorageConfig;
use crate::leadership::Member;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryAdapter;
pub use sqlite::SqliteAdapter;
pub use statement::Statement;

/// The configured kind of storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Sql,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::Memory => write!(f, "memory"),
            StorageType::Sql => write!(f, "sql"),
        }
    }
}

impl FromStr for StorageType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageType::Memory),
            "sql" => Ok(StorageType::Sql),
            other => Err(StorageError::Unsupported(format!(
                "storage type {} isn't supported",
                other
            ))),
        }
    }
}

/// SQL dialects understood by the statement renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlProvider {
    Postgresql,
    Mysql,
    Sqlite,
}

impl fmt::Display for SqlProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlProvider::Postgresql => write!(f, "postgresql"),
            SqlProvider::Mysql => write!(f, "mysql"),
            SqlProvider::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for SqlProvider {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" => Ok(SqlProvider::Postgresql),
            "mysql" => Ok(SqlProvider::Mysql),
            "sqlite" => Ok(SqlProvider::Sqlite),
            other => Err(StorageError::Unsupported(format!(
                "SQL provider {} isn't supported, supported providers are: postgresql, mysql, and sqlite",
                other
            ))),
        }
    }
}

/// How a backend organizes the membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableModel {
    /// Process-local storage. Nothing is shared, so there is nothing to elect.
    Memory,
    /// Rows in a SQL table.
    Relational(SqlProvider),
    /// Items in a managed key-value table.
    KeyValue,
}

impl TableModel {
    pub fn is_persistent(&self) -> bool {
        !matches!(self, TableModel::Memory)
    }
}

/// Lifecycle state of a backend table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

/// The narrow contract the election core needs from a backing store.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn model(&self) -> TableModel;

    /// Run a structured statement, returning the number of affected rows.
    async fn execute(&self, statement: &Statement) -> StorageResult<u64>;

    async fn ping(&self) -> StorageResult<()>;

    /// Fetch one member. A missing row is [`StorageError::NotFound`].
    async fn get(&self, id: &str) -> StorageResult<Member>;

    async fn list(&self) -> StorageResult<Vec<Member>>;

    async fn create_or_replace(&self, member: &Member) -> StorageResult<()>;

    /// Remove one member. Removing a missing row succeeds.
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Relational tables are usable as soon as they are created.
    async fn table_status(&self, _table: &str) -> StorageResult<TableStatus> {
        Ok(TableStatus::Active)
    }
}

/// Builds the adapter selected by `storage.type` and `storage.provider`.
pub struct StorageAdapterFactory;

impl StorageAdapterFactory {
    pub fn create(config: &StorageConfig) -> StorageResult<Arc<dyn StorageAdapter>> {
        match config.storage_type {
            StorageType::Memory => Ok(Arc::new(MemoryAdapter::new())),
            StorageType::Sql => match config.provider {
                Some(SqlProvider::Sqlite) => {
                    let path = config.config.path.as_deref().ok_or_else(|| {
                        StorageError::Unsupported("sqlite storage requires a path".to_string())
                    })?;
                    Ok(Arc::new(SqliteAdapter::open(path)?))
                }
                Some(provider) => Err(StorageError::Unsupported(format!(
                    "no {} driver is bundled, supply a StorageAdapter for it",
                    provider
                ))),
                None => Err(StorageError::Unsupported(
                    "sql storage requires a provider".to_string(),
                )),
            },
        }
    }
}
