//! PostgreSQL-backed `CommunityRepository`.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::community::{CommunityPost, ThreadSummary};
use crate::domain::ports::{CommunityRepository, RepositoryError};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::CommunityPostRow;
use super::pool::DbPool;
use super::schema::community_posts;

/// Diesel implementation of [`CommunityRepository`].
#[derive(Clone)]
pub struct DieselCommunityRepository {
    pool: DbPool,
}

impl DieselCommunityRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_post(row: CommunityPostRow) -> CommunityPost {
    CommunityPost {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        author_name: row.author_name,
        title: row.title,
        body: row.body,
        parent_id: row.parent_id,
        created_at: row.created_at,
    }
}

#[async_trait]
impl CommunityRepository for DieselCommunityRepository {
    async fn list_threads(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ThreadSummary>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let threads: Vec<CommunityPostRow> = community_posts::table
            .filter(community_posts::parent_id.is_null())
            .order(community_posts::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(CommunityPostRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        if threads.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = threads.iter().map(|row| row.id).collect();
        let counts: HashMap<Uuid, i64> = community_posts::table
            .filter(community_posts::parent_id.eq_any(&ids))
            .group_by(community_posts::parent_id)
            .select((community_posts::parent_id, count_star()))
            .load::<(Option<Uuid>, i64)>(&mut conn)
            .await
            .map_err(map_diesel_error)?
            .into_iter()
            .filter_map(|(parent, count)| parent.map(|id| (id, count)))
            .collect();

        Ok(threads
            .into_iter()
            .map(|row| ThreadSummary {
                reply_count: counts.get(&row.id).copied().unwrap_or(0),
                post: row_to_post(row),
            })
            .collect())
    }

    async fn find(&self, id: &Uuid) -> Result<Option<CommunityPost>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<CommunityPostRow> = community_posts::table
            .find(id)
            .select(CommunityPostRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(row_to_post))
    }

    async fn replies(&self, parent_id: &Uuid) -> Result<Vec<CommunityPost>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CommunityPostRow> = community_posts::table
            .filter(community_posts::parent_id.eq(parent_id))
            .order(community_posts::created_at.asc())
            .select(CommunityPostRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(row_to_post).collect())
    }

    async fn create(&self, post: &CommunityPost) -> Result<(), RepositoryError> {
        let row = CommunityPostRow {
            id: post.id,
            user_id: *post.user_id.as_uuid(),
            author_name: post.author_name.clone(),
            title: post.title.clone(),
            body: post.body.clone(),
            parent_id: post.parent_id,
            created_at: post.created_at,
        };
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(community_posts::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        // Replies go with their thread through the parent_id cascade.
        let deleted = diesel::delete(community_posts::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}
