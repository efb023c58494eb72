use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

use crate::app::announcements::AnnouncementService;
use crate::domain::announcement::{fields, Announcement, AnnouncementChanges, NewAnnouncement};
use crate::infra::store::DocumentId;
use crate::http::{AdminToken, AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.collection.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "document store ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

#[derive(Deserialize)]
pub struct IssueTokenRequest {
    pub username: String,
}

#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
}

pub async fn issue_token(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<IssueTokenRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }

    let issued = state.auth.issue_access_token(username).map_err(|err| {
        tracing::error!(error = ?err, "failed to issue access token");
        AppError::internal("failed to issue access token")
    })?;

    Ok(Json(AccessTokenResponse {
        access_token: issued.token,
        access_expires_at: issued.expires_at,
    }))
}

pub async fn list_announcements(
    State(state): State<AppState>,
) -> Result<Json<Vec<Announcement>>, AppError> {
    let service = AnnouncementService::new(state.collection.clone());
    let announcements = service.list_active().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list announcements");
        AppError::internal("failed to list announcements")
    })?;

    Ok(Json(announcements))
}

/// Every field is optional so that validation can name the first one missing.
#[derive(Deserialize)]
pub struct CreateAnnouncementRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiration_date: Option<OffsetDateTime>,
}

impl CreateAnnouncementRequest {
    fn validate(self) -> Result<NewAnnouncement, AppError> {
        let title = self.title.ok_or_else(|| missing(fields::TITLE))?;
        let message = self.message.ok_or_else(|| missing(fields::MESSAGE))?;
        let expiration_date = self
            .expiration_date
            .ok_or_else(|| missing(fields::EXPIRATION_DATE))?;

        Ok(NewAnnouncement {
            title,
            message,
            start_date: self.start_date,
            expiration_date,
        })
    }
}

fn missing(field: &str) -> AppError {
    AppError::bad_request(format!("missing {}", field))
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: DocumentId,
}

pub async fn create_announcement(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let input = payload.validate()?;

    let service = AnnouncementService::new(state.collection.clone());
    let id = service.create(&auth.username, input).await.map_err(|err| {
        tracing::error!(error = ?err, created_by = %auth.username, "failed to create announcement");
        AppError::internal("failed to create announcement")
    })?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Only these fields can change after creation; anything else in the body is ignored.
#[derive(Deserialize)]
pub struct UpdateAnnouncementRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "nullable_timestamp")]
    pub start_date: Option<Option<OffsetDateTime>>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiration_date: Option<OffsetDateTime>,
}

// Present-but-null becomes `Some(None)`; a missing field stays `None` via `default`.
fn nullable_timestamp<'de, D>(deserializer: D) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    time::serde::rfc3339::option::deserialize(deserializer).map(Some)
}

impl From<UpdateAnnouncementRequest> for AnnouncementChanges {
    fn from(request: UpdateAnnouncementRequest) -> Self {
        Self {
            title: request.title,
            message: request.message,
            start_date: request.start_date,
            expiration_date: request.expiration_date,
        }
    }
}

pub async fn update_announcement(
    Path(id): Path<String>,
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateAnnouncementRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let service = AnnouncementService::new(state.collection.clone());
    let updated = service.update(&id, payload.into()).await.map_err(|err| {
        tracing::error!(error = ?err, announcement_id = %id, "failed to update announcement");
        AppError::internal("failed to update announcement")
    })?;

    if updated {
        Ok(SuccessResponse::ok())
    } else {
        Err(AppError::not_found("Announcement not found"))
    }
}

pub async fn delete_announcement(
    Path(id): Path<String>,
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse>, AppError> {
    let service = AnnouncementService::new(state.collection.clone());
    let deleted = service.delete(&id).await.map_err(|err| {
        tracing::error!(error = ?err, announcement_id = %id, "failed to delete announcement");
        AppError::internal("failed to delete announcement")
    })?;

    if deleted {
        Ok(SuccessResponse::ok())
    } else {
        Err(AppError::not_found("Announcement not found"))
    }
}
