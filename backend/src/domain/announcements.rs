//! Site notices with optional display windows.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::exam::UnsupportedValue;

/// Visual tone of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementKind {
    #[default]
    Info,
    Warning,
    Success,
    Error,
}

impl AnnouncementKind {
    /// Persisted string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl FromStr for AnnouncementKind {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => Err(UnsupportedValue(other.to_owned())),
        }
    }
}

/// A notice shown to users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: AnnouncementKind,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Announcement {
    /// Active when flagged and `now` falls inside the optional window.
    ///
    /// Both window bounds are inclusive.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.start_date.is_none_or(|start| start <= now)
            && self.end_date.is_none_or(|end| end >= now)
    }
}

/// Partial update. `None` keeps the stored value; a window bound set to
/// `Some(None)` is cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub kind: Option<AnnouncementKind>,
    pub is_active: Option<bool>,
    pub start_date: Option<Option<DateTime<Utc>>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
}

impl AnnouncementPatch {
    /// Apply the patch in place.
    pub fn apply_to(&self, target: &mut Announcement) {
        if let Some(title) = &self.title {
            target.title.clone_from(title);
        }
        if let Some(message) = &self.message {
            target.message.clone_from(message);
        }
        if let Some(kind) = self.kind {
            target.kind = kind;
        }
        if let Some(is_active) = self.is_active {
            target.is_active = is_active;
        }
        if let Some(start) = self.start_date {
            target.start_date = start;
        }
        if let Some(end) = self.end_date {
            target.end_date = end;
        }
    }
}
