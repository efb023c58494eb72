use anyhow::Result;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    Body, Bound, Condition, Direction, Document, DocumentCollection, DocumentId, Filter, Sort,
    SortKind,
};

/// In-process collection. Each operation holds the lock for its whole duration,
/// so single-document writes are atomic with respect to each other.
#[derive(Clone, Default)]
pub struct MemoryCollection {
    documents: Arc<RwLock<BTreeMap<DocumentId, Body>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn get(&self, id: DocumentId) -> Option<Body> {
        self.documents.read().await.get(&id).cloned()
    }
}

#[axum::async_trait]
impl DocumentCollection for MemoryCollection {
    async fn find(&self, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        let mut found: Vec<Document> = documents
            .iter()
            .filter(|(id, body)| matches(**id, body, filter))
            .map(|(id, body)| Document {
                id: *id,
                body: body.clone(),
            })
            .collect();

        if let Some(sort) = sort {
            found.sort_by(|a, b| {
                let ordering = sort_key(&a.body, sort).cmp(&sort_key(&b.body, sort));
                match sort.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(found)
    }

    async fn insert_one(&self, body: Body) -> Result<DocumentId> {
        let id = DocumentId::new();
        self.documents.write().await.insert(id, body);
        Ok(id)
    }

    async fn update_one(&self, filter: &Filter, changes: Body) -> Result<u64> {
        let mut documents = self.documents.write().await;
        let target = match filter {
            Filter::Id(id) => documents.get_mut(id),
            _ => documents
                .iter_mut()
                .find(|(id, body)| matches(**id, body, filter))
                .map(|(_, body)| body),
        };

        match target {
            Some(body) => {
                body.extend(changes);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64> {
        let mut documents = self.documents.write().await;
        if let Filter::Id(id) = filter {
            return Ok(documents.remove(id).map_or(0, |_| 1));
        }

        let target = documents
            .iter()
            .find(|(id, body)| matches(**id, body, filter))
            .map(|(id, _)| *id);

        match target {
            Some(id) => {
                documents.remove(&id);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn matches(id: DocumentId, body: &Body, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Id(expected) => id == *expected,
        Filter::Field { name, cond } => matches_condition(body.get(name), cond),
        Filter::And(filters) => filters.iter().all(|f| matches(id, body, f)),
        Filter::Or(filters) => filters.iter().any(|f| matches(id, body, f)),
    }
}

fn matches_condition(value: Option<&Value>, cond: &Condition) -> bool {
    match cond {
        Condition::Absent => value.map_or(true, Value::is_null),
        Condition::Eq(bound) => compare(value, bound) == Some(Ordering::Equal),
        Condition::Lte(bound) => {
            matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal))
        }
        Condition::Gte(bound) => {
            matches!(compare(value, bound), Some(Ordering::Greater | Ordering::Equal))
        }
    }
}

/// Orders the stored value against the bound. `None` when the value is missing,
/// null, or not of the bound's type.
fn compare(value: Option<&Value>, bound: &Bound) -> Option<Ordering> {
    let raw = value?.as_str()?;
    match bound {
        Bound::Text(expected) => Some(raw.cmp(expected.as_str())),
        Bound::Timestamp(expected) => {
            let parsed = OffsetDateTime::parse(raw, &Rfc3339).ok()?;
            Some(parsed.cmp(expected))
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Text(String),
    Timestamp(OffsetDateTime),
}

// Missing values are `None`, which orders before every present value.
fn sort_key(body: &Body, sort: &Sort) -> Option<SortValue> {
    let raw = body.get(&sort.field)?.as_str()?;
    match sort.kind {
        SortKind::Text => Some(SortValue::Text(raw.to_string())),
        SortKind::Timestamp => OffsetDateTime::parse(raw, &Rfc3339)
            .ok()
            .map(SortValue::Timestamp),
    }
}
