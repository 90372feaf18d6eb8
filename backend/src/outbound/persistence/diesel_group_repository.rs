//! PostgreSQL-backed `GroupRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::groups::Group;
use crate::domain::ports::{GroupRepository, RepositoryError};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{GroupRow, NewMemberRow};
use super::pool::DbPool;
use super::schema::{group_members, study_groups};

/// Diesel implementation of [`GroupRepository`].
#[derive(Clone)]
pub struct DieselGroupRepository {
    pool: DbPool,
}

impl DieselGroupRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_group(row: GroupRow) -> Group {
    Group {
        id: row.id,
        name: row.name,
        invite_code: row.invite_code,
        owner_id: UserId::from_uuid(row.owner_id),
        created_at: row.created_at,
    }
}

#[async_trait]
impl GroupRepository for DieselGroupRepository {
    async fn create(&self, group: &Group) -> Result<(), RepositoryError> {
        let row = GroupRow {
            id: group.id,
            name: group.name.clone(),
            invite_code: group.invite_code.clone(),
            owner_id: *group.owner_id.as_uuid(),
            created_at: group.created_at,
        };
        let owner = NewMemberRow {
            group_id: group.id,
            user_id: *group.owner_id.as_uuid(),
            joined_at: group.created_at,
        };

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::insert_into(study_groups::table)
                    .values(&row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(group_members::table)
                    .values(&owner)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(map_diesel_error)
    }

    async fn find(&self, id: &Uuid) -> Result<Option<Group>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<GroupRow> = study_groups::table
            .find(id)
            .select(GroupRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_group))
    }

    async fn find_by_invite_code(&self, code: &str) -> Result<Option<Group>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<GroupRow> = study_groups::table
            .filter(study_groups::invite_code.eq(code))
            .select(GroupRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_group))
    }

    async fn rename(&self, id: &Uuid, name: &str) -> Result<Option<Group>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<GroupRow> = diesel::update(study_groups::table.find(id))
            .set(study_groups::name.eq(name))
            .returning(GroupRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_group))
    }

    async fn add_member(
        &self,
        group_id: &Uuid,
        user_id: &UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let inserted = diesel::insert_into(group_members::table)
            .values(&NewMemberRow {
                group_id: *group_id,
                user_id: *user_id.as_uuid(),
                joined_at,
            })
            .on_conflict_do_nothing()
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(inserted > 0)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let member_of = group_members::table
            .filter(group_members::user_id.eq(user_id.as_uuid()))
            .select(group_members::group_id);
        let rows: Vec<GroupRow> = study_groups::table
            .filter(
                study_groups::owner_id
                    .eq(user_id.as_uuid())
                    .or(study_groups::id.eq_any(member_of)),
            )
            .order(study_groups::created_at.desc())
            .select(GroupRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_group).collect())
    }

    async fn member_ids(&self, group_id: &Uuid) -> Result<Vec<UserId>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let ids: Vec<Uuid> = group_members::table
            .filter(group_members::group_id.eq(group_id))
            .order(group_members::joined_at.asc())
            .select(group_members::user_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(ids.into_iter().map(UserId::from_uuid).collect())
    }
}
