//! In-memory study groups.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::UserId;
use crate::domain::groups::Group;
use crate::domain::ports::{GroupRepository, RepositoryError};

use super::lock;

#[derive(Debug, Clone)]
struct Membership {
    group_id: Uuid,
    user_id: UserId,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct GroupData {
    groups: Vec<Group>,
    members: Vec<Membership>,
}

/// Groups and memberships.
#[derive(Debug, Default)]
pub struct InMemoryGroupRepository {
    data: Mutex<GroupData>,
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create(&self, group: &Group) -> Result<(), RepositoryError> {
        let mut data = lock(&self.data);
        if data
            .groups
            .iter()
            .any(|existing| existing.invite_code == group.invite_code)
        {
            return Err(RepositoryError::duplicate("invite code is taken"));
        }
        data.groups.push(group.clone());
        data.members.push(Membership {
            group_id: group.id,
            user_id: group.owner_id,
            joined_at: group.created_at,
        });
        Ok(())
    }

    async fn find(&self, id: &Uuid) -> Result<Option<Group>, RepositoryError> {
        Ok(lock(&self.data)
            .groups
            .iter()
            .find(|group| &group.id == id)
            .cloned())
    }

    async fn find_by_invite_code(&self, code: &str) -> Result<Option<Group>, RepositoryError> {
        Ok(lock(&self.data)
            .groups
            .iter()
            .find(|group| group.invite_code == code)
            .cloned())
    }

    async fn rename(&self, id: &Uuid, name: &str) -> Result<Option<Group>, RepositoryError> {
        let mut data = lock(&self.data);
        Ok(data
            .groups
            .iter_mut()
            .find(|group| &group.id == id)
            .map(|group| {
                group.name = name.to_owned();
                group.clone()
            }))
    }

    async fn add_member(
        &self,
        group_id: &Uuid,
        user_id: &UserId,
        joined_at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut data = lock(&self.data);
        if data
            .members
            .iter()
            .any(|member| &member.group_id == group_id && &member.user_id == user_id)
        {
            return Ok(false);
        }
        data.members.push(Membership {
            group_id: *group_id,
            user_id: *user_id,
            joined_at,
        });
        Ok(true)
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Group>, RepositoryError> {
        let data = lock(&self.data);
        let mut groups: Vec<Group> = data
            .groups
            .iter()
            .filter(|group| {
                &group.owner_id == user_id
                    || data
                        .members
                        .iter()
                        .any(|member| member.group_id == group.id && &member.user_id == user_id)
            })
            .cloned()
            .collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(groups)
    }

    async fn member_ids(&self, group_id: &Uuid) -> Result<Vec<UserId>, RepositoryError> {
        let data = lock(&self.data);
        let mut members: Vec<&Membership> = data
            .members
            .iter()
            .filter(|member| &member.group_id == group_id)
            .collect();
        members.sort_by_key(|member| member.joined_at);
        Ok(members.into_iter().map(|member| member.user_id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(code: &str) -> Group {
        Group {
            id: Uuid::new_v4(),
            name: "英単語部".to_owned(),
            invite_code: code.to_owned(),
            owner_id: UserId::random(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_enrols_owner_and_rejects_taken_code() {
        let store = InMemoryGroupRepository::default();
        let first = group("ABC123");
        store.create(&first).await.expect("create");

        assert_eq!(
            store.member_ids(&first.id).await.expect("members"),
            vec![first.owner_id]
        );
        assert!(matches!(
            store.create(&group("ABC123")).await,
            Err(RepositoryError::Duplicate { .. })
        ));
    }

    #[tokio::test]
    async fn joining_twice_is_reported() {
        let store = InMemoryGroupRepository::default();
        let existing = group("XYZ789");
        store.create(&existing).await.expect("create");
        let member = UserId::random();

        assert!(store.add_member(&existing.id, &member, Utc::now()).await.expect("join"));
        assert!(!store.add_member(&existing.id, &member, Utc::now()).await.expect("rejoin"));
    }
}
