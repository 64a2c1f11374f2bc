//! Process-local storage adapter.
//!
//! Rows live in a map owned by the process, so no other instance can see
//! them. Leader election treats this adapter as "election disabled".

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::error::{StorageError, StorageResult};
use super::statement::{HEARTBEAT_COLUMN, ID_COLUMN, REGISTRATION_COLUMN, Statement, Value};
use super::{StorageAdapter, TableModel};
use crate::leadership::Member;

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    members: RwLock<HashMap<String, Member>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    fn apply_update(member: &mut Member, column: &str, value: &Value) -> StorageResult<()> {
        let value = value.as_integer().ok_or_else(|| {
            StorageError::Unsupported(format!("column {} only holds integers", column))
        })?;
        match column {
            HEARTBEAT_COLUMN => member.heartbeat = value,
            REGISTRATION_COLUMN => member.registration = value,
            other => {
                return Err(StorageError::Unsupported(format!(
                    "unknown column {}",
                    other
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn model(&self) -> TableModel {
        TableModel::Memory
    }

    async fn execute(&self, statement: &Statement) -> StorageResult<u64> {
        match statement {
            Statement::CreateTable(_) => Ok(0),
            Statement::CreateReplicationGroup { .. } => Err(StorageError::Unsupported(
                "memory adapter doesn't replicate".to_string(),
            )),
            Statement::Update { key, set, .. } => {
                if key.column != ID_COLUMN {
                    return Err(StorageError::Unsupported(format!(
                        "rows are keyed by {}, not {}",
                        ID_COLUMN, key.column
                    )));
                }
                let id = key.value.as_text().ok_or_else(|| {
                    StorageError::Unsupported("member ids are text".to_string())
                })?;
                let mut members = self.members.write();
                match members.get_mut(id) {
                    Some(member) => {
                        for field in set {
                            Self::apply_update(member, &field.column, &field.value)?;
                        }
                        Ok(1)
                    }
                    None => Ok(0),
                }
            }
        }
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }

    async fn get(&self, id: &str) -> StorageResult<Member> {
        self.members
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("member {}", id)))
    }

    async fn list(&self) -> StorageResult<Vec<Member>> {
        Ok(self.members.read().values().cloned().collect())
    }

    async fn create_or_replace(&self, member: &Member) -> StorageResult<()> {
        self.members
            .write()
            .insert(member.id.clone(), member.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.members.write().remove(id);
        Ok(())
    }
}
