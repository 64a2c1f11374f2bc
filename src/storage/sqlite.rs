//! SQLite storage adapter.
//!
//! Several processes on one host (or on a shared volume) can point at the same
//! database file; SQLite's file locking serializes their writes. Calls run on
//! the blocking pool so the async runtime never waits on disk.

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params_from_iter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::dialect::{RenderedStatement, SqlDialect};
use super::error::{StorageError, StorageResult};
use super::statement::{MEMBERS_TABLE, Statement, Value};
use super::{SqlProvider, StorageAdapter, TableModel};
use crate::leadership::Member;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteAdapter {
    conn: Arc<Mutex<Connection>>,
    dialect: SqlDialect,
}

impl SqliteAdapter {
    /// Opens (or creates) the database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StorageError::Backend(format!(
                        "failed to create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        debug!("opening sqlite database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    /// A private in-memory database, mostly useful in tests.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            dialect: SqlDialect::new(SqlProvider::Sqlite),
        })
    }

    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await?
    }

    async fn run_execute(&self, rendered: RenderedStatement) -> StorageResult<u64> {
        self.run(move |conn| {
            let affected = conn.execute(&rendered.sql, params_from_iter(bind(&rendered.params)))?;
            Ok(affected as u64)
        })
        .await
    }
}

fn bind(params: &[Value]) -> Vec<rusqlite::types::Value> {
    params
        .iter()
        .map(|value| match value {
            Value::Text(text) => rusqlite::types::Value::Text(text.clone()),
            Value::Integer(int) => rusqlite::types::Value::Integer(*int),
        })
        .collect()
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Member> {
    Ok(Member {
        id: row.get(0)?,
        registration: row.get(1)?,
        heartbeat: row.get(2)?,
    })
}

#[async_trait]
impl StorageAdapter for SqliteAdapter {
    fn model(&self) -> TableModel {
        TableModel::Relational(SqlProvider::Sqlite)
    }

    async fn execute(&self, statement: &Statement) -> StorageResult<u64> {
        let rendered = self.dialect.render(statement)?;
        self.run_execute(rendered).await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.run(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> StorageResult<Member> {
        let rendered = self.dialect.select_one(MEMBERS_TABLE, id)?;
        let id = id.to_string();
        self.run(move |conn| {
            conn.query_row(
                &rendered.sql,
                params_from_iter(bind(&rendered.params)),
                member_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("member {}", id)))
        })
        .await
    }

    async fn list(&self) -> StorageResult<Vec<Member>> {
        let rendered = self.dialect.select_all(MEMBERS_TABLE)?;
        self.run(move |conn| {
            let mut stmt = conn.prepare(&rendered.sql)?;
            let rows = stmt.query_map(params_from_iter(bind(&rendered.params)), member_from_row)?;
            let members = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(members)
        })
        .await
    }

    async fn create_or_replace(&self, member: &Member) -> StorageResult<()> {
        let rendered = self.dialect.upsert(MEMBERS_TABLE, member)?;
        self.run_execute(rendered).await.map(|_| ())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        let rendered = self.dialect.delete(MEMBERS_TABLE, id)?;
        self.run_execute(rendered).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::statement::TableSchema;

    async fn adapter_with_table() -> SqliteAdapter {
        let adapter = SqliteAdapter::open_in_memory().unwrap();
        adapter
            .execute(&Statement::CreateTable(TableSchema::members()))
            .await
            .unwrap();
        adapter
    }

    #[tokio::test]
    async fn test_create_table_is_idempotent() {
        let adapter = adapter_with_table().await;
        adapter
            .execute(&Statement::CreateTable(TableSchema::members()))
            .await
            .unwrap();
        assert!(adapter.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_member_round_trip() {
        let adapter = adapter_with_table().await;
        adapter.create_or_replace(&Member::new("a", 100)).await.unwrap();
        adapter.create_or_replace(&Member::new("b", 200)).await.unwrap();

        let a = adapter.get("a").await.unwrap();
        assert_eq!(a, Member::new("a", 100));

        let mut members = adapter.list().await.unwrap();
        members.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].registration, 200);

        adapter.delete("a").await.unwrap();
        assert!(matches!(adapter.get("a").await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_heartbeat_update_counts_rows() {
        let adapter = adapter_with_table().await;
        adapter.create_or_replace(&Member::new("a", 100)).await.unwrap();

        let touched = adapter
            .execute(&Statement::update_heartbeat("a", 150))
            .await
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(adapter.get("a").await.unwrap().heartbeat, 150);

        let touched = adapter
            .execute(&Statement::update_heartbeat("gone", 150))
            .await
            .unwrap();
        assert_eq!(touched, 0);
    }

    #[tokio::test]
    async fn test_hostile_id_is_stored_verbatim() {
        let adapter = adapter_with_table().await;
        let id = "x'); DROP TABLE members; --";
        adapter.create_or_replace(&Member::new(id, 1)).await.unwrap();
        assert_eq!(adapter.get(id).await.unwrap().id, id);
        assert_eq!(adapter.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found() {
        let adapter = SqliteAdapter::open_in_memory().unwrap();
        assert!(matches!(adapter.list().await, Err(StorageError::NotFound(_))));
        adapter.ping().await.unwrap();
    }
}
