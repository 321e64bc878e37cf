//! SQL text builders.
//!
//! Values are typed so the builder knows how to render them: text is escaped through the
//! connection and single-quoted, [`SqlValue::Raw`] goes in verbatim (column references,
//! `NOW()` and the like).

use std::fmt;

use super::Connection;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Raw(String),
}

impl SqlValue {
    pub fn raw(expr: impl Into<String>) -> Self {
        Self::Raw(expr.into())
    }

    pub(crate) fn render<C: Connection + ?Sized>(&self, conn: &C) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) if f.is_finite() => f.to_string(),
            // SQL has no NaN or infinity literal
            Self::Float(_) => "NULL".to_string(),
            Self::Text(s) => format!("'{}'", conn.escape(s)),
            Self::Raw(expr) => expr.clone(),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

macro_rules! int_value {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(i: $ty) -> Self {
                    Self::Int(i64::from(i))
                }
            }
        )+
    };
}

int_value!(i8, i16, i32, i64, u8, u16, u32);

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Raw(String),
    Eq(String, SqlValue),
}

/// A WHERE condition: raw text and `column = value` pairs, joined by `AND`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    clauses: Vec<Clause>,
}

impl Where {
    pub fn raw(condition: impl Into<String>) -> Self {
        Self::default().and_raw(condition)
    }

    pub fn column(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::default().and(name, value)
    }

    pub fn and(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.clauses.push(Clause::Eq(name.into(), value.into()));
        self
    }

    /// Adds a raw condition. Blank text adds nothing, so it cannot pass for a real condition.
    pub fn and_raw(mut self, condition: impl Into<String>) -> Self {
        let condition = condition.into();
        if !condition.trim().is_empty() {
            self.clauses.push(Clause::Raw(condition));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `None` for an empty condition. Raw text is parenthesized when combined with other clauses.
    pub(crate) fn render<C: Connection + ?Sized>(&self, conn: &C) -> Option<String> {
        if let [Clause::Raw(condition)] = self.clauses.as_slice() {
            return Some(condition.clone());
        }
        if self.clauses.is_empty() {
            return None;
        }

        let rendered = self
            .clauses
            .iter()
            .map(|clause| match clause {
                Clause::Raw(condition) => format!("({condition})"),
                Clause::Eq(name, value) => format!("{name} = {}", value.render(conn)),
            })
            .collect::<Vec<_>>();
        Some(rendered.join(" AND "))
    }
}

fn assignments<C: Connection + ?Sized>(fields: &[(&str, SqlValue)], conn: &C) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("{name} = {}", value.render(conn)))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("ASC"),
            Self::Desc => f.write_str("DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    expr: String,
    alias: Option<String>,
}

/// `SELECT` statement builder. No fields selects `*`.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    fields: Vec<Field>,
    condition: Option<Where>,
    order_by: Vec<String>,
    direction: Option<Direction>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Vec::new(),
            condition: None,
            order_by: Vec::new(),
            direction: None,
            limit: None,
            offset: None,
        }
    }

    pub fn field(mut self, expr: impl Into<String>) -> Self {
        self.fields.push(Field { expr: expr.into(), alias: None });
        self
    }

    pub fn field_as(mut self, expr: impl Into<String>, alias: impl Into<String>) -> Self {
        self.fields.push(Field { expr: expr.into(), alias: Some(alias.into()) });
        self
    }

    pub fn filter(mut self, condition: Where) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(column.into());
        self
    }

    /// Only rendered together with at least one `order_by` column.
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Only rendered together with a limit.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_sql<C: Connection + ?Sized>(&self, conn: &C) -> String {
        let fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields
                .iter()
                .map(|field| match &field.alias {
                    Some(alias) => format!("{} as {alias}", field.expr),
                    None => field.expr.clone(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {fields} FROM {}", self.table);

        if let Some(condition) = self.condition.as_ref().and_then(|c| c.render(conn)) {
            sql.push_str(" WHERE ");
            sql.push_str(&condition);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
            if let Some(direction) = self.direction {
                sql.push_str(&format!(" {direction}"));
            }
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = self.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        sql
    }
}

pub fn insert_sql<C: Connection + ?Sized>(table: &str, fields: &[(&str, SqlValue)], conn: &C) -> String {
    let columns = fields.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ");
    let values = fields.iter().map(|(_, value)| value.render(conn)).collect::<Vec<_>>().join(", ");
    format!("INSERT INTO {table} ({columns}) VALUES ({values})")
}

/// `None` when `condition` is empty.
pub fn update_sql<C: Connection + ?Sized>(
    table: &str,
    fields: &[(&str, SqlValue)],
    condition: &Where,
    conn: &C,
) -> Option<String> {
    let condition = condition.render(conn)?;
    Some(format!("UPDATE {table} SET {} WHERE {condition}", assignments(fields, conn)))
}

/// `None` when `condition` is empty.
pub fn delete_sql<C: Connection + ?Sized>(table: &str, condition: &Where, conn: &C) -> Option<String> {
    let condition = condition.render(conn)?;
    Some(format!("DELETE FROM {table} WHERE {condition}"))
}

/// Escapes the characters MySQL treats specially inside a quoted string.
pub fn escape_mysql(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '\x1a' => escaped.push_str("\\Z"),
            c => escaped.push(c),
        }
    }
    escaped
}
