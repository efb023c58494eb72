//! Collection-oriented document storage.
//!
//! A [`DocumentCollection`] holds schema-less JSON object bodies keyed by a
//! store-assigned [`DocumentId`]. Queries are expressed with [`Filter`] and
//! [`Sort`], which every backend evaluates with the same semantics.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

pub use memory::MemoryCollection;
pub use postgres::PgCollection;

pub type Body = Map<String, Value>;

pub type Collection = Arc<dyn DocumentCollection>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DocumentId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub body: Body,
}

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Text(String),
    /// Compared chronologically against RFC 3339 strings stored in the body.
    Timestamp(OffsetDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Bound),
    Lte(Bound),
    Gte(Bound),
    /// The field is missing or explicitly null.
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Id(DocumentId),
    Field { name: String, cond: Condition },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn field(name: impl Into<String>, cond: Condition) -> Self {
        Self::Field {
            name: name.into(),
            cond,
        }
    }

    pub fn lte_timestamp(name: impl Into<String>, at: OffsetDateTime) -> Self {
        Self::field(name, Condition::Lte(Bound::Timestamp(at)))
    }

    pub fn gte_timestamp(name: impl Into<String>, at: OffsetDateTime) -> Self {
        Self::field(name, Condition::Gte(Bound::Timestamp(at)))
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self::field(name, Condition::Absent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Text,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub kind: SortKind,
    pub direction: Direction,
}

impl Sort {
    pub fn descending_timestamp(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: SortKind::Timestamp,
            direction: Direction::Descending,
        }
    }
}

#[axum::async_trait]
pub trait DocumentCollection: Send + Sync {
    async fn find(&self, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Document>>;

    async fn insert_one(&self, body: Body) -> Result<DocumentId>;

    /// Merges `changes` into the first matching document. Returns the matched count.
    async fn update_one(&self, filter: &Filter, changes: Body) -> Result<u64>;

    /// Removes the first matching document. Returns the deleted count.
    async fn delete_one(&self, filter: &Filter) -> Result<u64>;

    async fn ping(&self) -> Result<()>;
}
