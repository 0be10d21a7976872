// src/realtime/mod.rs

//! Row-level change events for the application tables.
//!
//! Events come from Postgres triggers (see `listener`) or straight from the
//! in-memory store, are fanned out by `feed::ChangeFeed`, narrowed per role by
//! `policy`, and folded into local state by `reconcile`.

pub mod feed;
pub mod listener;
pub mod policy;
pub mod reconcile;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Quizzes,
    Questions,
    QuizAttempts,
    Answers,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Profiles,
        Table::Quizzes,
        Table::Questions,
        Table::QuizAttempts,
        Table::Answers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Quizzes => "quizzes",
            Table::Questions => "questions",
            Table::QuizAttempts => "quiz_attempts",
            Table::Answers => "answers",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|table| table.as_str() == s)
            .ok_or_else(|| AppError::NotFound(format!("Unknown table '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change. `new` is absent for deletes, `old` for inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl ChangeEvent {
    pub fn insert<T: Serialize>(table: Table, row: &T) -> Self {
        Self {
            table,
            kind: ChangeKind::Insert,
            new: Some(row_image(row)),
            old: None,
        }
    }

    pub fn update<T: Serialize>(table: Table, old: &T, new: &T) -> Self {
        Self {
            table,
            kind: ChangeKind::Update,
            new: Some(row_image(new)),
            old: Some(row_image(old)),
        }
    }

    pub fn delete<T: Serialize>(table: Table, row: &T) -> Self {
        Self {
            table,
            kind: ChangeKind::Delete,
            new: None,
            old: Some(row_image(row)),
        }
    }

    /// The row image a filter is evaluated against.
    pub fn record(&self) -> Option<&Value> {
        self.new.as_ref().or(self.old.as_ref())
    }

    pub fn field(&self, column: &str) -> Option<&Value> {
        self.record().and_then(|row| row.get(column))
    }
}

/// Row images never carry the expanded relations or the attempt snapshot,
/// matching what the database triggers publish.
fn row_image<T: Serialize>(row: &T) -> Value {
    let mut value = serde_json::to_value(row).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("creator");
        map.remove("snapshot_quiz");
        map.remove("password_hash");
    }
    value
}

/// Equality filter in the `column=eq.value` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: &str, value: impl ToString) -> Self {
        Self {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match event.field(&self.column) {
            Some(Value::String(s)) => s == &self.value,
            Some(Value::Null) | None => false,
            Some(other) => other.to_string() == self.value,
        }
    }
}

impl FromStr for Filter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::BadRequest(format!("Invalid filter '{s}', expected column=eq.value"));

        let (column, rest) = s.split_once('=').ok_or_else(invalid)?;
        let value = rest.strip_prefix("eq.").ok_or_else(invalid)?;
        if column.is_empty() || value.is_empty() {
            return Err(invalid());
        }

        Ok(Filter::eq(column, value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}
