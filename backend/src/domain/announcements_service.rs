//! Notice listing and administration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::announcements::{Announcement, AnnouncementKind, AnnouncementPatch};
use crate::domain::ports::AnnouncementRepository;
use crate::domain::{Error, Viewer};

/// Fields of a new notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnnouncement {
    pub title: String,
    pub message: String,
    pub kind: AnnouncementKind,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn required_text(field: &str, value: &str) -> Result<String, Error> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid_request(format!("{field} must not be empty"))
            .with_details(json!({"field": field, "code": "missing_field"})));
    }
    Ok(value.to_owned())
}

fn check_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), Error> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(Error::invalid_request(
            "startDate must not be after endDate",
        )
        .with_details(json!({"field": "startDate", "code": "invalid_range"}))),
        _ => Ok(()),
    }
}

/// Notice use-cases.
#[derive(Clone)]
pub struct AnnouncementService {
    announcements: Arc<dyn AnnouncementRepository>,
    clock: Arc<dyn Clock>,
}

impl AnnouncementService {
    pub fn new(announcements: Arc<dyn AnnouncementRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            announcements,
            clock,
        }
    }

    /// Notices visible now, newest first.
    pub async fn active(&self) -> Result<Vec<Announcement>, Error> {
        Ok(self.announcements.list_active(self.clock.utc()).await?)
    }

    /// Every notice, for administrators.
    pub async fn list_all(&self, viewer: &Viewer) -> Result<Vec<Announcement>, Error> {
        viewer.require_admin()?;
        Ok(self.announcements.list_all().await?)
    }

    pub async fn create(
        &self,
        viewer: &Viewer,
        draft: NewAnnouncement,
    ) -> Result<Announcement, Error> {
        viewer.require_admin()?;
        check_window(draft.start_date, draft.end_date)?;
        let announcement = Announcement {
            id: Uuid::new_v4(),
            title: required_text("title", &draft.title)?,
            message: required_text("message", &draft.message)?,
            kind: draft.kind,
            is_active: draft.is_active,
            start_date: draft.start_date,
            end_date: draft.end_date,
            created_at: self.clock.utc(),
        };
        self.announcements.create(&announcement).await?;
        info!(announcement_id = %announcement.id, "announcement created");
        Ok(announcement)
    }

    pub async fn update(
        &self,
        viewer: &Viewer,
        id: &Uuid,
        patch: AnnouncementPatch,
    ) -> Result<Announcement, Error> {
        viewer.require_admin()?;
        let patch = AnnouncementPatch {
            title: patch.title.as_deref().map(|t| required_text("title", t)).transpose()?,
            message: patch
                .message
                .as_deref()
                .map(|m| required_text("message", m))
                .transpose()?,
            ..patch
        };
        check_window(patch.start_date.flatten(), patch.end_date.flatten())?;
        self.announcements
            .update(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("announcement not found"))
    }

    pub async fn delete(&self, viewer: &Viewer, id: &Uuid) -> Result<(), Error> {
        viewer.require_admin()?;
        if self.announcements.delete(id).await? {
            info!(announcement_id = %id, "announcement deleted");
            Ok(())
        } else {
            Err(Error::not_found("announcement not found"))
        }
    }
}
