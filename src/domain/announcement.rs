use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::infra::store::{Body, Document, DocumentId};

pub mod fields {
    pub const TITLE: &str = "title";
    pub const MESSAGE: &str = "message";
    pub const START_DATE: &str = "start_date";
    pub const EXPIRATION_DATE: &str = "expiration_date";
    pub const CREATED_BY: &str = "created_by";
    pub const CREATED_AT: &str = "created_at";
    pub const LAST_MODIFIED: &str = "last_modified";
}

/// A time-windowed message, visible from `start_date` (or immediately) until
/// `expiration_date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: DocumentId,
    pub title: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub expiration_date: OffsetDateTime,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

impl Announcement {
    pub fn from_document(document: Document) -> Result<Self> {
        let stored: AnnouncementDocument = serde_json::from_value(Value::Object(document.body))
            .map_err(|err| anyhow!("malformed announcement {}: {}", document.id, err))?;
        Ok(stored.with_id(document.id))
    }
}

/// The stored body of an announcement. The id lives beside it, not inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnouncementDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub expiration_date: OffsetDateTime,
    #[serde(default)]
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

impl AnnouncementDocument {
    pub fn into_body(self) -> Result<Body> {
        match serde_json::to_value(self)? {
            Value::Object(body) => Ok(body),
            other => Err(anyhow!("announcement serialized to non-object: {}", other)),
        }
    }

    fn with_id(self, id: DocumentId) -> Announcement {
        Announcement {
            id,
            title: self.title,
            message: self.message,
            start_date: self.start_date,
            expiration_date: self.expiration_date,
            created_by: self.created_by,
            created_at: self.created_at,
            last_modified: self.last_modified,
        }
    }
}

/// Validated input for creating an announcement.
#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub title: String,
    pub message: String,
    pub start_date: Option<OffsetDateTime>,
    pub expiration_date: OffsetDateTime,
}

/// The mutable subset of an announcement. `None` leaves a field untouched;
/// `start_date: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementChanges {
    pub title: Option<String>,
    pub message: Option<String>,
    pub start_date: Option<Option<OffsetDateTime>>,
    pub expiration_date: Option<OffsetDateTime>,
}
