//! PostgreSQL-backed `AnnouncementRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::announcements::{Announcement, AnnouncementKind, AnnouncementPatch};
use crate::domain::ports::{AnnouncementRepository, RepositoryError};

use super::error_mapping::{invalid_column, map_diesel_error, map_pool_error};
use super::models::{AnnouncementChangeset, AnnouncementRow};
use super::pool::DbPool;
use super::schema::announcements;

/// Diesel implementation of [`AnnouncementRepository`].
#[derive(Clone)]
pub struct DieselAnnouncementRepository {
    pool: DbPool,
}

impl DieselAnnouncementRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_announcement(row: AnnouncementRow) -> Result<Announcement, RepositoryError> {
    let kind: AnnouncementKind = row
        .kind
        .parse()
        .map_err(|_| invalid_column("announcements.kind", &row.kind))?;
    Ok(Announcement {
        id: row.id,
        title: row.title,
        message: row.message,
        kind,
        is_active: row.is_active,
        start_date: row.start_date,
        end_date: row.end_date,
        created_at: row.created_at,
    })
}

fn patch_to_changeset(patch: &AnnouncementPatch) -> AnnouncementChangeset<'_> {
    AnnouncementChangeset {
        title: patch.title.as_deref(),
        message: patch.message.as_deref(),
        kind: patch.kind.map(AnnouncementKind::as_str),
        is_active: patch.is_active,
        start_date: patch.start_date,
        end_date: patch.end_date,
    }
}

fn is_empty(changes: &AnnouncementChangeset<'_>) -> bool {
    changes.title.is_none()
        && changes.message.is_none()
        && changes.kind.is_none()
        && changes.is_active.is_none()
        && changes.start_date.is_none()
        && changes.end_date.is_none()
}

#[async_trait]
impl AnnouncementRepository for DieselAnnouncementRepository {
    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AnnouncementRow> = announcements::table
            .filter(announcements::is_active.eq(true))
            .filter(
                announcements::start_date
                    .is_null()
                    .or(announcements::start_date.le(now)),
            )
            .filter(
                announcements::end_date
                    .is_null()
                    .or(announcements::end_date.ge(now)),
            )
            .order(announcements::created_at.desc())
            .select(AnnouncementRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_announcement).collect()
    }

    async fn list_all(&self) -> Result<Vec<Announcement>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<AnnouncementRow> = announcements::table
            .order(announcements::created_at.desc())
            .select(AnnouncementRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_announcement).collect()
    }

    async fn create(&self, announcement: &Announcement) -> Result<(), RepositoryError> {
        let row = AnnouncementRow {
            id: announcement.id,
            title: announcement.title.clone(),
            message: announcement.message.clone(),
            kind: announcement.kind.as_str().to_owned(),
            is_active: announcement.is_active,
            start_date: announcement.start_date,
            end_date: announcement.end_date,
            created_at: announcement.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(announcements::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(
        &self,
        id: &Uuid,
        patch: &AnnouncementPatch,
    ) -> Result<Option<Announcement>, RepositoryError> {
        let changes = patch_to_changeset(patch);
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Diesel rejects an empty SET clause; an empty patch is a plain read.
        let row: Option<AnnouncementRow> = if is_empty(&changes) {
            announcements::table
                .find(id)
                .select(AnnouncementRow::as_select())
                .first(&mut conn)
                .await
                .optional()
        } else {
            diesel::update(announcements::table.find(id))
                .set(&changes)
                .returning(AnnouncementRow::as_returning())
                .get_result(&mut conn)
                .await
                .optional()
        }
        .map_err(map_diesel_error)?;
        row.map(row_to_announcement).transpose()
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(announcements::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
