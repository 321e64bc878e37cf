//! Data access over a shared connection.
//!
//! No driver is bundled: the host implements [`Connection`] for its client of choice, opens it
//! through a [`HandleSlot`] so every [`Database`] shares one handle, and uses the builders in
//! [`sql`] to produce statement text. Outcomes come back as [`QueryResult`] values; a failed
//! statement is reported in the result rather than raised.

mod handle;
pub mod sql;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub use handle::HandleSlot;
pub use sql::{Direction, Select, SqlValue, Where};

/// One result row keyed by column name.
pub type Row = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DbError {
    #[error("error while connecting to database")]
    Connect { code: u32 },

    #[error("{message}")]
    Query { code: u32, message: String },

    #[error("refusing to run {statement} without a WHERE condition")]
    MissingCondition { statement: &'static str },
}

impl DbError {
    pub fn query<S: ToString>(code: u32, message: S) -> Self {
        Self::Query { code, message: message.to_string() }
    }

    /// Driver error number, 0 when there is none.
    pub fn code(&self) -> u32 {
        match self {
            Self::Connect { code } | Self::Query { code, .. } => *code,
            Self::MissingCondition { .. } => 0,
        }
    }
}

/// What the driver reports for one statement. `rows` stays empty for statements without a result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Executed {
    pub affected_rows: u64,
    pub rows: Vec<Row>,
}

#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send + Sync {
    fn execute(&self, sql: &str) -> Result<Executed, DbError>;

    /// Escapes `value` for use inside a single-quoted string literal.
    fn escape(&self, value: &str) -> String {
        sql::escape_mysql(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub status: bool,
    pub sql_query: String,
    pub error: Option<String>,
    pub error_code: u32,
    pub num_rows: usize,
    pub affected_rows: u64,
    pub rows: Vec<Row>,
}

impl QueryResult {
    fn failed(sql_query: String, e: &DbError) -> Self {
        Self { sql_query, error: Some(e.to_string()), error_code: e.code(), ..Self::default() }
    }
}

#[derive(Debug)]
pub struct Database<C> {
    conn: Arc<C>,
}

impl<C> Clone for Database<C> {
    fn clone(&self) -> Self {
        Self { conn: Arc::clone(&self.conn) }
    }
}

impl<C: Connection> Database<C> {
    pub fn new(conn: Arc<C>) -> Self {
        Self { conn }
    }

    /// Shares the slot's live connection, opening one with `connect` if there is none.
    pub fn open<E>(slot: &HandleSlot<C>, connect: impl FnOnce() -> Result<C, E>) -> Result<Self, E> {
        slot.acquire(connect).map(Self::new)
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    pub fn escape(&self, value: &str) -> String {
        self.conn.escape(value)
    }

    pub fn query(&self, sql: impl Into<String>) -> QueryResult {
        let sql = sql.into();
        match self.conn.execute(&sql) {
            Ok(executed) => {
                debug!(sql = %sql, affected_rows = executed.affected_rows, rows = executed.rows.len(), "query executed");
                QueryResult {
                    status: true,
                    sql_query: sql,
                    error: None,
                    error_code: 0,
                    num_rows: executed.rows.len(),
                    affected_rows: executed.affected_rows,
                    rows: executed.rows,
                }
            }
            Err(e) => {
                warn!(sql = %sql, cause = %e, "query failed");
                QueryResult::failed(sql, &e)
            }
        }
    }

    pub fn select(&self, select: &Select) -> QueryResult {
        self.query(select.to_sql(self.connection()))
    }

    pub fn insert(&self, table: &str, fields: &[(&str, SqlValue)]) -> QueryResult {
        self.query(sql::insert_sql(table, fields, self.connection()))
    }

    pub fn update(&self, table: &str, fields: &[(&str, SqlValue)], condition: &Where) -> QueryResult {
        match sql::update_sql(table, fields, condition, self.connection()) {
            Some(statement) => self.query(statement),
            None => Self::refuse("UPDATE", table),
        }
    }

    pub fn delete(&self, table: &str, condition: &Where) -> QueryResult {
        match sql::delete_sql(table, condition, self.connection()) {
            Some(statement) => self.query(statement),
            None => Self::refuse("DELETE", table),
        }
    }

    fn refuse(statement: &'static str, table: &str) -> QueryResult {
        let e = DbError::MissingCondition { statement };
        warn!(table, cause = %e, "statement not sent");
        QueryResult::failed(String::new(), &e)
    }
}

#[cfg(test)]
mod tests {
    use super::{Database, DbError, Executed, MockConnection, Row, Select, Where};
    use mockall::predicate::eq;
    use serde_json::json;
    use std::sync::Arc;

    fn database(conn: MockConnection) -> Database<MockConnection> {
        Database::new(Arc::new(conn))
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_query_success() {
        let mut conn = MockConnection::new();
        conn.expect_execute().with(eq("SELECT * FROM todos")).times(1).returning(|_| {
            Ok(Executed { affected_rows: 2, rows: vec![row(json!({"id": 1})), row(json!({"id": 2}))] })
        });

        let result = database(conn).query("SELECT * FROM todos");

        assert!(result.status);
        assert_eq!(result.num_rows, 2);
        assert_eq!(result.affected_rows, 2);
        assert_eq!(result.rows[1]["id"], 2);
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_query_failure_is_reported_in_result() {
        let mut conn = MockConnection::new();
        conn.expect_execute().returning(|_| Err(DbError::query(1146, "Table 'app.nope' doesn't exist")));

        let result = database(conn).query("SELECT * FROM nope");

        assert!(!result.status);
        assert_eq!(result.sql_query, "SELECT * FROM nope");
        assert_eq!(result.error.as_deref(), Some("Table 'app.nope' doesn't exist"));
        assert_eq!(result.error_code, 1146);
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_connect_failure() {
        let mut conn = MockConnection::new();
        conn.expect_execute().returning(|_| Err(DbError::Connect { code: 2002 }));

        let result = database(conn).query("SELECT 1");
        assert_eq!(result.error.as_deref(), Some("error while connecting to database"));
        assert_eq!(result.error_code, 2002);
    }

    #[test]
    fn test_builders_escape_through_connection() {
        let mut conn = MockConnection::new();
        conn.expect_escape().returning(|value| value.replace('\'', "''"));
        conn.expect_execute()
            .with(eq("SELECT id FROM users WHERE name = 'O''Brien' LIMIT 1"))
            .times(1)
            .returning(|_| Ok(Executed::default()));

        let select = Select::from("users").field("id").filter(Where::column("name", "O'Brien")).limit(1);
        assert!(database(conn).select(&select).status);
    }

    #[test]
    fn test_insert_update_delete() {
        let mut conn = MockConnection::new();
        conn.expect_escape().returning(|value| value.to_string());
        conn.expect_execute()
            .with(eq("INSERT INTO todos (title) VALUES ('milk')"))
            .returning(|_| Ok(Executed { affected_rows: 1, rows: vec![] }));
        conn.expect_execute()
            .with(eq("UPDATE todos SET done = true WHERE id = 1"))
            .returning(|_| Ok(Executed { affected_rows: 1, rows: vec![] }));
        conn.expect_execute()
            .with(eq("DELETE FROM todos WHERE id = 1"))
            .returning(|_| Ok(Executed { affected_rows: 1, rows: vec![] }));

        let db = database(conn);
        assert_eq!(db.insert("todos", &[("title", "milk".into())]).affected_rows, 1);
        assert_eq!(db.update("todos", &[("done", true.into())], &Where::column("id", 1)).affected_rows, 1);
        assert_eq!(db.delete("todos", &Where::column("id", 1)).affected_rows, 1);
    }

    #[test]
    fn test_unconditional_delete_is_refused() {
        let mut conn = MockConnection::new();
        conn.expect_execute().never();

        let result = database(conn).delete("todos", &Where::default());
        assert!(!result.status);
        assert_eq!(result.error.as_deref(), Some("refusing to run DELETE without a WHERE condition"));
        assert_eq!(result.error_code, 0);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut conn = MockConnection::new();
        conn.expect_execute().returning(|_| Ok(Executed::default()));

        let value = serde_json::to_value(database(conn).query("SELECT 1")).unwrap();
        assert_eq!(
            value,
            json!({
                "status": true,
                "sqlQuery": "SELECT 1",
                "error": null,
                "errorCode": 0,
                "numRows": 0,
                "affectedRows": 0,
                "rows": []
            })
        );
    }
}
