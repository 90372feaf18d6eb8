//! Study groups joined by invite code, and test-count rankings.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use super::{Profile, UserId};

/// Invite code characters. Glyphs that read alike (`I`, `O`, `l`, `0`, `1`)
/// are left out.
pub const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
/// Invite code length.
pub const INVITE_CODE_LEN: usize = 6;
/// Longest accepted group name, in characters.
pub const GROUP_NAME_MAX_CHARS: usize = 50;

/// A study group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Validation failures for group input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupValidationError {
    #[error("group name must not be empty")]
    EmptyName,
    #[error("group name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("invite code must be {len} characters")]
    InvalidInviteCode { len: usize },
}

/// Trim and bound a group name.
pub fn validate_group_name(raw: &str) -> Result<String, GroupValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(GroupValidationError::EmptyName);
    }
    if name.chars().count() > GROUP_NAME_MAX_CHARS {
        return Err(GroupValidationError::NameTooLong {
            max: GROUP_NAME_MAX_CHARS,
        });
    }
    Ok(name.to_owned())
}

/// Trim an invite code and check its length. Case is significant.
pub fn normalize_invite_code(raw: &str) -> Result<String, GroupValidationError> {
    let code = raw.trim();
    if code.chars().count() != INVITE_CODE_LEN {
        return Err(GroupValidationError::InvalidInviteCode {
            len: INVITE_CODE_LEN,
        });
    }
    Ok(code.to_owned())
}

/// Draw a fresh invite code.
pub fn generate_invite_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..INVITE_CODE_LEN)
        .map(|_| char::from(INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())]))
        .collect()
}

/// One row of a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub full_name: Option<String>,
    pub test_count: i32,
}

/// Rank members by test count, highest first.
///
/// Members without a profile rank with a count of zero. Each user appears
/// once even when listed several times. Ties keep the order of `members`.
pub fn rank_members(members: &[UserId], profiles: &[Profile]) -> Vec<RankingEntry> {
    let mut seen = HashSet::new();
    let mut entries: Vec<RankingEntry> = members
        .iter()
        .filter(|id| seen.insert(**id))
        .map(|id| {
            let profile = profiles.iter().find(|p| p.id == *id);
            RankingEntry {
                rank: 0,
                user_id: *id,
                full_name: profile.and_then(|p| p.full_name.clone()),
                test_count: profile.map_or(0, |p| p.test_count),
            }
        })
        .collect();
    entries.sort_by(|a, b| b.test_count.cmp(&a.test_count));
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = u32::try_from(index + 1).unwrap_or(u32::MAX);
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rstest::rstest;

    fn profile(id: UserId, name: &str, test_count: i32) -> Profile {
        let mut profile = Profile::new(id, Role::Student, Utc::now());
        profile.full_name = Some(name.to_owned());
        profile.test_count = test_count;
        profile
    }

    #[rstest]
    fn invite_codes_use_unambiguous_alphabet() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let code = generate_invite_code(&mut rng);
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b)));
            assert!(!code.contains(['0', 'O', 'I', 'l', '1']));
        }
    }

    #[rstest]
    #[case::blank("  ", Err(GroupValidationError::EmptyName))]
    #[case::trimmed(" 英語部 ", Ok("英語部".to_owned()))]
    fn validates_names(#[case] raw: &str, #[case] expected: Result<String, GroupValidationError>) {
        assert_eq!(validate_group_name(raw), expected);
    }

    #[rstest]
    fn long_names_are_rejected() {
        let raw = "あ".repeat(GROUP_NAME_MAX_CHARS + 1);
        assert!(matches!(
            validate_group_name(&raw),
            Err(GroupValidationError::NameTooLong { .. })
        ));
    }

    #[rstest]
    fn ranking_orders_by_test_count_and_deduplicates() {
        let (a, b, c) = (UserId::random(), UserId::random(), UserId::random());
        let profiles = vec![profile(a, "A", 3), profile(b, "B", 9)];

        let ranking = rank_members(&[a, b, c, b], &profiles);

        let order: Vec<_> = ranking.iter().map(|e| (e.rank, e.user_id)).collect();
        assert_eq!(order, vec![(1, b), (2, a), (3, c)]);
        assert_eq!(ranking[2].test_count, 0);
        assert!(ranking[2].full_name.is_none());
    }
}
