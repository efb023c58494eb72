use anyhow::{anyhow, Result};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::{
    Body, Bound, Condition, Direction, Document, DocumentCollection, DocumentId, Filter, Sort,
    SortKind,
};
use crate::infra::db::Db;

/// A named collection stored as JSONB rows of the shared `documents` table.
#[derive(Clone)]
pub struct PgCollection {
    db: Db,
    name: String,
}

impl PgCollection {
    pub fn new(db: Db, name: impl Into<String>) -> Self {
        Self {
            db,
            name: name.into(),
        }
    }

    /// Starts a `... WHERE collection = $1 AND (<filter>)` clause.
    fn push_scope(&self, qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
        qb.push(" WHERE collection = ");
        qb.push_bind(self.name.clone());
        qb.push(" AND (");
        push_filter(qb, filter);
        qb.push(")");
    }
}

#[axum::async_trait]
impl DocumentCollection for PgCollection {
    async fn find(&self, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Document>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT id, body FROM documents");
        self.push_scope(&mut qb, filter);

        qb.push(" ORDER BY ");
        if let Some(sort) = sort {
            match sort.kind {
                SortKind::Text => push_field_text(&mut qb, &sort.field),
                SortKind::Timestamp => push_field_timestamp(&mut qb, &sort.field),
            }
            // Missing values sort as the lowest, in either direction.
            match sort.direction {
                Direction::Ascending => qb.push(" ASC NULLS FIRST, "),
                Direction::Descending => qb.push(" DESC NULLS LAST, "),
            };
        }
        qb.push("inserted_at, id");

        let rows = qb.build().fetch_all(self.db.pool()).await?;
        rows.into_iter()
            .map(|row| -> Result<Document> {
                let id: Uuid = row.try_get("id")?;
                let body: Value = row.try_get("body")?;
                match body {
                    Value::Object(body) => Ok(Document {
                        id: DocumentId::from(id),
                        body,
                    }),
                    other => Err(anyhow!("document {} has non-object body: {}", id, other)),
                }
            })
            .collect()
    }

    async fn insert_one(&self, body: Body) -> Result<DocumentId> {
        let id = DocumentId::new();
        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(&self.name)
            .bind(Json(body))
            .execute(self.db.pool())
            .await?;
        Ok(id)
    }

    async fn update_one(&self, filter: &Filter, changes: Body) -> Result<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE documents SET body = body || ");
        qb.push_bind(Json(changes));
        qb.push(" WHERE id = (SELECT id FROM documents");
        self.push_scope(&mut qb, filter);
        qb.push(" LIMIT 1 FOR UPDATE)");

        let result = qb.build().execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, filter: &Filter) -> Result<u64> {
        let mut qb =
            QueryBuilder::<Postgres>::new("DELETE FROM documents WHERE id = (SELECT id FROM documents");
        self.push_scope(&mut qb, filter);
        qb.push(" LIMIT 1 FOR UPDATE)");

        let result = qb.build().execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}

fn push_field_text(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("(body ->> ");
    qb.push_bind(field.to_string());
    qb.push("::text)");
}

/// Unparsable values come back as NULL rather than failing the statement.
fn push_field_timestamp(qb: &mut QueryBuilder<'_, Postgres>, field: &str) {
    qb.push("document_timestamp(body ->> ");
    qb.push_bind(field.to_string());
    qb.push("::text)");
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::Id(id) => {
            qb.push("id = ");
            qb.push_bind(id.as_uuid());
        }
        Filter::Field { name, cond } => push_condition(qb, name, cond),
        Filter::And(filters) => push_joined(qb, filters, " AND ", "TRUE"),
        Filter::Or(filters) => push_joined(qb, filters, " OR ", "FALSE"),
    }
}

fn push_joined(
    qb: &mut QueryBuilder<'_, Postgres>,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) {
    if filters.is_empty() {
        qb.push(empty);
        return;
    }
    for (index, filter) in filters.iter().enumerate() {
        if index > 0 {
            qb.push(separator);
        }
        qb.push("(");
        push_filter(qb, filter);
        qb.push(")");
    }
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, field: &str, cond: &Condition) {
    let (operator, bound) = match cond {
        Condition::Absent => {
            qb.push("coalesce(jsonb_typeof(body -> ");
            qb.push_bind(field.to_string());
            qb.push("::text), 'null') = 'null'");
            return;
        }
        Condition::Eq(bound) => (" = ", bound),
        Condition::Lte(bound) => (" <= ", bound),
        Condition::Gte(bound) => (" >= ", bound),
    };

    match bound {
        Bound::Text(value) => {
            push_field_text(qb, field);
            qb.push(operator);
            qb.push_bind(value.clone());
        }
        Bound::Timestamp(at) => {
            push_field_timestamp(qb, field);
            qb.push(operator);
            qb.push_bind(*at);
        }
    }
}
