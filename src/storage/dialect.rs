//! Rendering of structured statements into parameterized SQL.
//!
//! Each [`SqlProvider`] gets its own column types and placeholder style:
//!
//! | provider   | id            | timestamps | placeholders |
//! |------------|---------------|------------|--------------|
//! | postgresql | `TEXT`        | `NUMERIC`  | `$1, $2`     |
//! | mysql      | `VARCHAR(50)` | `BIGINT`   | `?, ?`       |
//! | sqlite     | `TEXT`        | `INTEGER`  | `?1, ?2`     |
//!
//! # Example
//! ```
//! use rollcall::storage::SqlProvider;
//! use rollcall::storage::dialect::SqlDialect;
//! use rollcall::storage::statement::Statement;
//!
//! let dialect = SqlDialect::new(SqlProvider::Postgresql);
//! let rendered = dialect.render(&Statement::update_heartbeat("node-1", 7)).unwrap();
//! assert_eq!(rendered.sql, "UPDATE members SET heartbeat = $1 WHERE id = $2");
//! assert_eq!(rendered.params.len(), 2);
//! ```

use super::SqlProvider;
use super::error::{StorageError, StorageResult};
use super::statement::{
    ColumnType, HEARTBEAT_COLUMN, ID_COLUMN, REGISTRATION_COLUMN, Statement, TableSchema, Value,
};
use crate::leadership::Member;

/// SQL text plus the values bound to its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlDialect {
    provider: SqlProvider,
}

impl SqlDialect {
    pub fn new(provider: SqlProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> SqlProvider {
        self.provider
    }

    pub fn column_type(&self, column_type: ColumnType) -> &'static str {
        match (self.provider, column_type) {
            (SqlProvider::Postgresql, ColumnType::Identifier) => "TEXT",
            (SqlProvider::Postgresql, ColumnType::Timestamp) => "NUMERIC",
            (SqlProvider::Mysql, ColumnType::Identifier) => "VARCHAR(50)",
            (SqlProvider::Mysql, ColumnType::Timestamp) => "BIGINT",
            (SqlProvider::Sqlite, ColumnType::Identifier) => "TEXT",
            (SqlProvider::Sqlite, ColumnType::Timestamp) => "INTEGER",
        }
    }

    /// Placeholder for the 1-based parameter `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self.provider {
            SqlProvider::Postgresql => format!("${}", index),
            SqlProvider::Mysql => "?".to_string(),
            SqlProvider::Sqlite => format!("?{}", index),
        }
    }

    pub fn render(&self, statement: &Statement) -> StorageResult<RenderedStatement> {
        match statement {
            Statement::CreateTable(schema) => self.create_table(schema),
            Statement::CreateReplicationGroup { table, .. } => Err(StorageError::Unsupported(
                format!("relational table {} cannot join a replication group", table),
            )),
            Statement::Update { table, key, set } => {
                if set.is_empty() {
                    return Err(StorageError::Unsupported(format!(
                        "update of {} without assignments",
                        table
                    )));
                }
                let mut params = Vec::with_capacity(set.len() + 1);
                let mut assignments = Vec::with_capacity(set.len());
                for field in set {
                    params.push(field.value.clone());
                    assignments.push(format!(
                        "{} = {}",
                        identifier(&field.column)?,
                        self.placeholder(params.len())
                    ));
                }
                params.push(key.value.clone());
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = {}",
                    identifier(table)?,
                    assignments.join(", "),
                    identifier(&key.column)?,
                    self.placeholder(params.len())
                );
                Ok(RenderedStatement { sql, params })
            }
        }
    }

    fn create_table(&self, schema: &TableSchema) -> StorageResult<RenderedStatement> {
        let mut columns = Vec::with_capacity(schema.columns.len());
        for column in &schema.columns {
            let mut definition = format!(
                "{} {}",
                identifier(&column.name)?,
                self.column_type(column.column_type)
            );
            if column.primary_key {
                definition.push_str(" PRIMARY KEY");
            }
            columns.push(definition);
        }
        Ok(RenderedStatement {
            sql: format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                identifier(&schema.name)?,
                columns.join(", ")
            ),
            params: Vec::new(),
        })
    }

    /// Insert a member row, replacing any row with the same id.
    pub fn upsert(&self, table: &str, member: &Member) -> StorageResult<RenderedStatement> {
        let table = identifier(table)?;
        let values = format!(
            "{}, {}, {}",
            self.placeholder(1),
            self.placeholder(2),
            self.placeholder(3)
        );
        let sql = match self.provider {
            SqlProvider::Mysql => format!(
                "INSERT INTO {table} ({id}, {reg}, {hb}) VALUES ({values}) \
                 ON DUPLICATE KEY UPDATE {reg} = VALUES({reg}), {hb} = VALUES({hb})",
                id = ID_COLUMN,
                reg = REGISTRATION_COLUMN,
                hb = HEARTBEAT_COLUMN,
            ),
            SqlProvider::Postgresql | SqlProvider::Sqlite => format!(
                "INSERT INTO {table} ({id}, {reg}, {hb}) VALUES ({values}) \
                 ON CONFLICT ({id}) DO UPDATE SET {reg} = excluded.{reg}, {hb} = excluded.{hb}",
                id = ID_COLUMN,
                reg = REGISTRATION_COLUMN,
                hb = HEARTBEAT_COLUMN,
            ),
        };
        Ok(RenderedStatement {
            sql,
            params: vec![
                Value::Text(member.id.clone()),
                Value::Integer(member.registration),
                Value::Integer(member.heartbeat),
            ],
        })
    }

    pub fn select_one(&self, table: &str, id: &str) -> StorageResult<RenderedStatement> {
        Ok(RenderedStatement {
            sql: format!(
                "SELECT {}, {}, {} FROM {} WHERE {} = {}",
                ID_COLUMN,
                REGISTRATION_COLUMN,
                HEARTBEAT_COLUMN,
                identifier(table)?,
                ID_COLUMN,
                self.placeholder(1)
            ),
            params: vec![Value::Text(id.to_string())],
        })
    }

    pub fn select_all(&self, table: &str) -> StorageResult<RenderedStatement> {
        Ok(RenderedStatement {
            sql: format!(
                "SELECT {}, {}, {} FROM {}",
                ID_COLUMN,
                REGISTRATION_COLUMN,
                HEARTBEAT_COLUMN,
                identifier(table)?
            ),
            params: Vec::new(),
        })
    }

    pub fn delete(&self, table: &str, id: &str) -> StorageResult<RenderedStatement> {
        Ok(RenderedStatement {
            sql: format!(
                "DELETE FROM {} WHERE {} = {}",
                identifier(table)?,
                ID_COLUMN,
                self.placeholder(1)
            ),
            params: vec![Value::Text(id.to_string())],
        })
    }
}

/// Table and column names are never bound, so only plain identifiers pass.
fn identifier(name: &str) -> StorageResult<&str> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StorageError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::statement::{Field, MEMBERS_TABLE};

    fn create_sql(provider: SqlProvider) -> String {
        SqlDialect::new(provider)
            .render(&Statement::CreateTable(TableSchema::members()))
            .unwrap()
            .sql
    }

    #[test]
    fn test_create_table_per_dialect() {
        assert_eq!(
            create_sql(SqlProvider::Postgresql),
            "CREATE TABLE IF NOT EXISTS members (id TEXT PRIMARY KEY, registration NUMERIC, heartbeat NUMERIC)"
        );
        assert_eq!(
            create_sql(SqlProvider::Mysql),
            "CREATE TABLE IF NOT EXISTS members (id VARCHAR(50) PRIMARY KEY, registration BIGINT, heartbeat BIGINT)"
        );
        assert_eq!(
            create_sql(SqlProvider::Sqlite),
            "CREATE TABLE IF NOT EXISTS members (id TEXT PRIMARY KEY, registration INTEGER, heartbeat INTEGER)"
        );
    }

    #[test]
    fn test_update_binds_values() {
        let hostile = "x'; DROP TABLE members; --";
        let rendered = SqlDialect::new(SqlProvider::Sqlite)
            .render(&Statement::update_heartbeat(hostile, 99))
            .unwrap();
        assert_eq!(
            rendered.sql,
            "UPDATE members SET heartbeat = ?1 WHERE id = ?2"
        );
        assert!(!rendered.sql.contains(hostile));
        assert_eq!(
            rendered.params,
            vec![Value::Integer(99), Value::Text(hostile.to_string())]
        );
    }

    #[test]
    fn test_mysql_upsert() {
        let member = Member::new("node-1", 10);
        let rendered = SqlDialect::new(SqlProvider::Mysql)
            .upsert(MEMBERS_TABLE, &member)
            .unwrap();
        assert!(rendered.sql.starts_with(
            "INSERT INTO members (id, registration, heartbeat) VALUES (?, ?, ?)"
        ));
        assert!(rendered.sql.contains("ON DUPLICATE KEY UPDATE"));
        assert_eq!(rendered.params.len(), 3);
    }

    #[test]
    fn test_postgres_select_and_delete() {
        let dialect = SqlDialect::new(SqlProvider::Postgresql);
        assert_eq!(
            dialect.select_one(MEMBERS_TABLE, "a").unwrap().sql,
            "SELECT id, registration, heartbeat FROM members WHERE id = $1"
        );
        assert_eq!(
            dialect.delete(MEMBERS_TABLE, "a").unwrap().sql,
            "DELETE FROM members WHERE id = $1"
        );
    }

    #[test]
    fn test_rejects_invalid_identifiers() {
        let statement = Statement::Update {
            table: "members; DROP".to_string(),
            key: Field::new("id", Value::Text("a".into())),
            set: vec![Field::new("heartbeat", Value::Integer(1))],
        };
        let result = SqlDialect::new(SqlProvider::Sqlite).render(&statement);
        assert!(matches!(result, Err(StorageError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_replication_group_is_unsupported() {
        let statement = Statement::CreateReplicationGroup {
            table: MEMBERS_TABLE.to_string(),
            regions: vec!["eu-west-1".into()],
        };
        let result = SqlDialect::new(SqlProvider::Postgresql).render(&statement);
        assert!(matches!(result, Err(StorageError::Unsupported(_))));
    }
}
