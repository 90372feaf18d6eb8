//! PostgreSQL-backed `ProfileRepository`.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{ProfileRepository, RepositoryError};
use crate::domain::{LoginStreak, Profile, ProfileUpdate, Role, UserId};

use super::error_mapping::{invalid_column, map_diesel_error, map_pool_error};
use super::models::{NewProfileRow, ProfileDetailsChangeset, ProfileRow, SubscriptionChangeset};
use super::pool::DbPool;
use super::schema::profiles;

/// Diesel implementation of [`ProfileRepository`].
#[derive(Clone)]
pub struct DieselProfileRepository {
    pool: DbPool,
}

impl DieselProfileRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_profile(row: ProfileRow) -> Result<Profile, RepositoryError> {
    let role: Role = row
        .role
        .parse()
        .map_err(|_| invalid_column("profiles.role", &row.role))?;
    Ok(Profile {
        id: UserId::from_uuid(row.id),
        full_name: row.full_name,
        role,
        grade: row.grade,
        school_name: row.school_name,
        cram_school_id: row.cram_school_id,
        login_id: row.login_id,
        is_pro: row.is_pro,
        stripe_customer_id: row.stripe_customer_id,
        stripe_subscription_id: row.stripe_subscription_id,
        test_count: row.test_count,
        total_writing_checks: row.total_writing_checks,
        consecutive_login_days: row.consecutive_login_days,
        last_login_at: row.last_login_at,
        created_at: row.created_at,
    })
}

fn rows_to_profiles(rows: Vec<ProfileRow>) -> Result<Vec<Profile>, RepositoryError> {
    rows.into_iter().map(row_to_profile).collect()
}

#[async_trait]
impl ProfileRepository for DieselProfileRepository {
    async fn find(&self, id: &UserId) -> Result<Option<Profile>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProfileRow> = profiles::table
            .find(id.as_uuid())
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_profile).transpose()
    }

    async fn find_by_login_id(&self, login_id: &str) -> Result<Option<Profile>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<ProfileRow> = profiles::table
            .filter(profiles::login_id.eq(login_id))
            .select(ProfileRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_profile).transpose()
    }

    async fn find_many(&self, ids: &[UserId]) -> Result<Vec<Profile>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ProfileRow> = profiles::table
            .filter(profiles::id.eq_any(&uuids))
            .select(ProfileRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows_to_profiles(rows)
    }

    async fn insert(&self, profile: &Profile) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewProfileRow {
            id: *profile.id.as_uuid(),
            full_name: profile.full_name.as_deref(),
            role: profile.role.as_str(),
            grade: profile.grade.as_deref(),
            school_name: profile.school_name.as_deref(),
            cram_school_id: profile.cram_school_id,
            login_id: profile.login_id.as_deref(),
            is_pro: profile.is_pro,
            test_count: profile.test_count,
            total_writing_checks: profile.total_writing_checks,
            consecutive_login_days: profile.consecutive_login_days,
            last_login_at: profile.last_login_at,
            created_at: profile.created_at,
        };
        diesel::insert_into(profiles::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update_details(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<Option<Profile>, RepositoryError> {
        if update.is_empty() {
            return self.find(id).await;
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = ProfileDetailsChangeset {
            full_name: update.full_name.as_deref(),
            grade: update.grade.as_deref(),
            school_name: update.school_name.as_deref(),
        };
        let row: Option<ProfileRow> = diesel::update(profiles::table.find(id.as_uuid()))
            .set(&changes)
            .returning(ProfileRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(row_to_profile).transpose()
    }

    async fn increment_writing_checks(&self, id: &UserId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(profiles::table.find(id.as_uuid()))
            .set(profiles::total_writing_checks.eq(profiles::total_writing_checks + 1))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn increment_test_count(&self, id: &UserId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(profiles::table.find(id.as_uuid()))
            .set(profiles::test_count.eq(profiles::test_count + 1))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn record_login(
        &self,
        id: &UserId,
        streak: &LoginStreak,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(profiles::table.find(id.as_uuid()))
            .set((
                profiles::consecutive_login_days.eq(streak.consecutive_days),
                profiles::last_login_at.eq(Some(streak.last_login_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn activate_subscription(
        &self,
        id: &UserId,
        customer_id: Option<String>,
        subscription_id: Option<String>,
    ) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let changes = SubscriptionChangeset {
            is_pro: true,
            stripe_customer_id: customer_id.as_deref(),
            stripe_subscription_id: subscription_id.as_deref(),
        };
        let updated = diesel::update(profiles::table.find(id.as_uuid()))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(updated > 0)
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let updated = diesel::update(
            profiles::table.filter(profiles::stripe_subscription_id.eq(subscription_id)),
        )
        .set(profiles::is_pro.eq(false))
        .execute(&mut conn)
        .await
        .map_err(map_diesel_error)?;
        Ok(u64::try_from(updated).unwrap_or(u64::MAX))
    }

    async fn list_students(&self, cram_school_id: &Uuid) -> Result<Vec<Profile>, RepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<ProfileRow> = profiles::table
            .filter(profiles::cram_school_id.eq(cram_school_id))
            .filter(profiles::role.eq(Role::Student.as_str()))
            .order(profiles::full_name.asc())
            .select(ProfileRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows_to_profiles(rows)
    }
}
