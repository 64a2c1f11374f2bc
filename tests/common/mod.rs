//! Shared in-process store for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rollcall::leadership::Member;
use rollcall::storage::{
    MemoryAdapter, Statement, StorageAdapter, StorageError, StorageResult, TableModel,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Routes library logs to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A membership table shared by several elections in one test, with
/// switches to make individual operations fail.
pub struct FakeStore {
    rows: MemoryAdapter,
    model: TableModel,
    pub fail_updates: AtomicBool,
    pub fail_gets: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_lists: AtomicBool,
    pub fail_ping: AtomicBool,
    pub update_attempts: AtomicUsize,
    statements: Mutex<Vec<Statement>>,
}

impl FakeStore {
    /// A key-value store, so election is enabled.
    pub fn new() -> Self {
        Self::with_model(TableModel::KeyValue)
    }

    pub fn with_model(model: TableModel) -> Self {
        Self {
            rows: MemoryAdapter::new(),
            model,
            fail_updates: AtomicBool::new(false),
            fail_gets: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            fail_ping: AtomicBool::new(false),
            update_attempts: AtomicUsize::new(0),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    /// Statements other than heartbeat updates.
    pub fn schema_statements(&self) -> Vec<Statement> {
        self.statements.lock().clone()
    }

    pub fn updates(&self) -> usize {
        self.update_attempts.load(Ordering::SeqCst)
    }

    fn injected(flag: &AtomicBool, operation: &str) -> StorageResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StorageError::Backend(format!("injected {} failure", operation)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StorageAdapter for FakeStore {
    fn model(&self) -> TableModel {
        self.model
    }

    async fn execute(&self, statement: &Statement) -> StorageResult<u64> {
        match statement {
            Statement::Update { .. } => {
                self.update_attempts.fetch_add(1, Ordering::SeqCst);
                Self::injected(&self.fail_updates, "update")?;
                self.rows.execute(statement).await
            }
            _ => {
                self.statements.lock().push(statement.clone());
                Ok(0)
            }
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        Self::injected(&self.fail_ping, "ping")
    }

    async fn get(&self, id: &str) -> StorageResult<Member> {
        Self::injected(&self.fail_gets, "get")?;
        self.rows.get(id).await
    }

    async fn list(&self) -> StorageResult<Vec<Member>> {
        Self::injected(&self.fail_lists, "list")?;
        self.rows.list().await
    }

    async fn create_or_replace(&self, member: &Member) -> StorageResult<()> {
        self.rows.create_or_replace(member).await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        Self::injected(&self.fail_deletes, "delete")?;
        self.rows.delete(id).await
    }
}
