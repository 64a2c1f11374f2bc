//! Structured statements accepted by [`StorageAdapter::execute`].
//!
//! Statements describe intent rather than carrying query text. Relational
//! adapters render them through a [`SqlDialect`] into parameterized SQL, and
//! key-value adapters map them onto their native table operations. Values are
//! always bound, never formatted into statement text.
//!
//! [`StorageAdapter::execute`]: crate::storage::StorageAdapter::execute
//! [`SqlDialect`]: crate::storage::dialect::SqlDialect

use std::fmt;

/// Name of the membership table shared by every candidate.
pub const MEMBERS_TABLE: &str = "members";

/// Column holding the member identity.
pub const ID_COLUMN: &str = "id";
/// Column holding the registration timestamp.
pub const REGISTRATION_COLUMN: &str = "registration";
/// Column holding the last heartbeat timestamp.
pub const HEARTBEAT_COLUMN: &str = "heartbeat";

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            Value::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{}", text),
            Value::Integer(value) => write!(f, "{}", value),
        }
    }
}

/// Logical column types; dialects choose the concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Identifier,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            primary_key: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// Table definition used for creation on any backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    /// Provisioned read capacity, honored by key-value backends.
    pub read_capacity: u32,
    /// Provisioned write capacity, honored by key-value backends.
    pub write_capacity: u32,
}

impl TableSchema {
    /// The membership table: `id` primary key plus two timestamps.
    pub fn members() -> Self {
        Self {
            name: MEMBERS_TABLE.to_string(),
            columns: vec![
                Column::new(ID_COLUMN, ColumnType::Identifier).primary_key(),
                Column::new(REGISTRATION_COLUMN, ColumnType::Timestamp),
                Column::new(HEARTBEAT_COLUMN, ColumnType::Timestamp),
            ],
            read_capacity: 5,
            write_capacity: 5,
        }
    }
}

/// A column/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub column: String,
    pub value: Value,
}

impl Field {
    pub fn new(column: &str, value: Value) -> Self {
        Self {
            column: column.to_string(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// Create a table if it does not exist yet.
    CreateTable(TableSchema),
    /// Replicate a key-value table into the listed regions.
    CreateReplicationGroup { table: String, regions: Vec<String> },
    /// Update the row matching `key`. Never inserts.
    Update {
        table: String,
        key: Field,
        set: Vec<Field>,
    },
}

impl Statement {
    /// Refresh the heartbeat of one member row.
    pub fn update_heartbeat(id: &str, heartbeat: i64) -> Self {
        Statement::Update {
            table: MEMBERS_TABLE.to_string(),
            key: Field::new(ID_COLUMN, Value::Text(id.to_string())),
            set: vec![Field::new(HEARTBEAT_COLUMN, Value::Integer(heartbeat))],
        }
    }

    /// The table the statement targets.
    pub fn table(&self) -> &str {
        match self {
            Statement::CreateTable(schema) => &schema.name,
            Statement::CreateReplicationGroup { table, .. } => table,
            Statement::Update { table, .. } => table,
        }
    }
}
