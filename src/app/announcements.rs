use anyhow::Result;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::domain::announcement::{
    fields, Announcement, AnnouncementChanges, AnnouncementDocument, NewAnnouncement,
};
use crate::infra::store::{Body, Collection, DocumentId, Filter, Sort};

#[derive(Clone)]
pub struct AnnouncementService {
    collection: Collection,
}

impl AnnouncementService {
    pub fn new(collection: Collection) -> Self {
        Self { collection }
    }

    pub async fn list_active(&self) -> Result<Vec<Announcement>> {
        self.list_active_at(OffsetDateTime::now_utc()).await
    }

    /// Announcements whose window contains `now`, furthest expiration first.
    pub async fn list_active_at(&self, now: OffsetDateTime) -> Result<Vec<Announcement>> {
        let documents = self
            .collection
            .find(
                &visible_at(now),
                Some(&Sort::descending_timestamp(fields::EXPIRATION_DATE)),
            )
            .await?;

        let announcements = documents
            .into_iter()
            .filter_map(|document| {
                let id = document.id;
                match Announcement::from_document(document) {
                    Ok(announcement) => Some(announcement),
                    Err(err) => {
                        tracing::warn!(error = ?err, announcement_id = %id, "skipping malformed announcement");
                        None
                    }
                }
            })
            .collect();

        Ok(announcements)
    }

    pub async fn create(&self, created_by: &str, input: NewAnnouncement) -> Result<DocumentId> {
        let now = utc(OffsetDateTime::now_utc());
        let document = AnnouncementDocument {
            title: input.title,
            message: input.message,
            start_date: input.start_date.map(utc),
            expiration_date: utc(input.expiration_date),
            created_by: created_by.to_string(),
            created_at: now,
            last_modified: now,
        };

        self.collection.insert_one(document.into_body()?).await
    }

    /// Applies the mutable fields present in `changes` and bumps `last_modified`.
    /// Returns `false` when no announcement has this id.
    pub async fn update(&self, id: &str, changes: AnnouncementChanges) -> Result<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };

        let mut set = Body::new();
        if let Some(title) = changes.title {
            set.insert(fields::TITLE.into(), Value::String(title));
        }
        if let Some(message) = changes.message {
            set.insert(fields::MESSAGE.into(), Value::String(message));
        }
        if let Some(start_date) = changes.start_date {
            let value = match start_date {
                Some(start) => timestamp_value(start)?,
                None => Value::Null,
            };
            set.insert(fields::START_DATE.into(), value);
        }
        if let Some(expiration_date) = changes.expiration_date {
            set.insert(
                fields::EXPIRATION_DATE.into(),
                timestamp_value(expiration_date)?,
            );
        }
        set.insert(
            fields::LAST_MODIFIED.into(),
            timestamp_value(OffsetDateTime::now_utc())?,
        );

        let matched = self.collection.update_one(&Filter::Id(id), set).await?;
        Ok(matched > 0)
    }

    /// Returns `false` when nothing was deleted.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };

        let deleted = self.collection.delete_one(&Filter::Id(id)).await?;
        Ok(deleted > 0)
    }
}

/// `(start_date <= now OR start_date is absent) AND expiration_date >= now`
pub fn visible_at(now: OffsetDateTime) -> Filter {
    Filter::And(vec![
        Filter::Or(vec![
            Filter::lte_timestamp(fields::START_DATE, now),
            Filter::absent(fields::START_DATE),
        ]),
        Filter::gte_timestamp(fields::EXPIRATION_DATE, now),
    ])
}

// Ids are always store-native; a path segment that is not one matches nothing.
fn parse_id(raw: &str) -> Option<DocumentId> {
    raw.parse().ok()
}

fn utc(at: OffsetDateTime) -> OffsetDateTime {
    at.to_offset(UtcOffset::UTC)
}

fn timestamp_value(at: OffsetDateTime) -> Result<Value> {
    Ok(Value::String(utc(at).format(&Rfc3339)?))
}
