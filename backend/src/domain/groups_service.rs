//! Study group use-cases: creation, joining, renaming, and rankings.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::groups::{
    Group, GroupValidationError, RankingEntry, generate_invite_code, normalize_invite_code,
    rank_members, validate_group_name,
};
use crate::domain::ports::{GroupRepository, ProfileRepository, RepositoryError};
use crate::domain::{Error, UserId};

/// Invite code draws before giving up on collisions.
const INVITE_CODE_ATTEMPTS: usize = 5;

fn map_validation_error(error: &GroupValidationError) -> Error {
    let field = match error {
        GroupValidationError::EmptyName | GroupValidationError::NameTooLong { .. } => "name",
        GroupValidationError::InvalidInviteCode { .. } => "inviteCode",
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": "invalid_value",
    }))
}

/// Result of a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub group: Group,
    /// False when the caller was already a member.
    pub joined: bool,
}

/// Group use-cases.
#[derive(Clone)]
pub struct GroupService {
    groups: Arc<dyn GroupRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl GroupService {
    pub fn new(
        groups: Arc<dyn GroupRepository>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            groups,
            profiles,
            clock,
        }
    }

    /// Create a group owned by `owner`, who also becomes its first member.
    pub async fn create(&self, owner: UserId, name: &str) -> Result<Group, Error> {
        let name = validate_group_name(name).map_err(|err| map_validation_error(&err))?;
        for attempt in 1..=INVITE_CODE_ATTEMPTS {
            let group = Group {
                id: Uuid::new_v4(),
                name: name.clone(),
                invite_code: generate_invite_code(&mut rand::thread_rng()),
                owner_id: owner,
                created_at: self.clock.utc(),
            };
            match self.groups.create(&group).await {
                Ok(()) => {
                    info!(group_id = %group.id, "group created");
                    return Ok(group);
                }
                Err(RepositoryError::Duplicate { .. }) => {
                    warn!(attempt, "invite code collision");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(Error::conflict("could not allocate a unique invite code"))
    }

    /// Join by invite code. Joining twice is harmless.
    pub async fn join(&self, user_id: UserId, invite_code: &str) -> Result<JoinOutcome, Error> {
        let code = normalize_invite_code(invite_code).map_err(|err| map_validation_error(&err))?;
        let group = self
            .groups
            .find_by_invite_code(&code)
            .await?
            .ok_or_else(|| Error::not_found("invite code not found"))?;
        let joined = self
            .groups
            .add_member(&group.id, &user_id, self.clock.utc())
            .await?;
        Ok(JoinOutcome { group, joined })
    }

    /// Rename a group. Only its owner may.
    pub async fn rename(&self, caller: &UserId, group_id: &Uuid, name: &str) -> Result<Group, Error> {
        let name = validate_group_name(name).map_err(|err| map_validation_error(&err))?;
        let group = self.require_group(group_id).await?;
        if group.owner_id != *caller {
            return Err(Error::forbidden("only the owner can rename the group"));
        }
        self.groups
            .rename(group_id, &name)
            .await?
            .ok_or_else(|| Error::not_found("group not found"))
    }

    /// Groups the caller owns or joined.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Group>, Error> {
        Ok(self.groups.list_for_user(user_id).await?)
    }

    /// Ranking inside one group. Only members may read it.
    pub async fn ranking(&self, caller: &UserId, group_id: &Uuid) -> Result<Vec<RankingEntry>, Error> {
        let (group, members) = tokio::join!(
            self.groups.find(group_id),
            self.groups.member_ids(group_id)
        );
        let group = group?.ok_or_else(|| Error::not_found("group not found"))?;
        let members = members?;
        if group.owner_id != *caller && !members.contains(caller) {
            return Err(Error::forbidden("only members can view the ranking"));
        }
        self.rank(&members).await
    }

    /// Ranking across every group the caller belongs to.
    pub async fn overall_ranking(&self, caller: &UserId) -> Result<Vec<RankingEntry>, Error> {
        let groups = self.groups.list_for_user(caller).await?;
        let mut members = Vec::new();
        for group in &groups {
            members.extend(self.groups.member_ids(&group.id).await?);
        }
        self.rank(&members).await
    }

    async fn rank(&self, members: &[UserId]) -> Result<Vec<RankingEntry>, Error> {
        let profiles = self.profiles.find_many(members).await?;
        Ok(rank_members(members, &profiles))
    }

    async fn require_group(&self, id: &Uuid) -> Result<Group, Error> {
        self.groups
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("group not found"))
    }
}

#[cfg(test)]
#[path = "groups_service_tests.rs"]
mod tests;
