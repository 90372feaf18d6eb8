//! In-memory announcements and community board.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::announcements::{Announcement, AnnouncementPatch};
use crate::domain::community::{CommunityPost, ThreadSummary};
use crate::domain::ports::{AnnouncementRepository, CommunityRepository, RepositoryError};

use super::lock;

/// Notices in creation order.
#[derive(Debug, Default)]
pub struct InMemoryAnnouncementRepository {
    notices: Mutex<Vec<Announcement>>,
}

impl InMemoryAnnouncementRepository {
    fn newest_first(&self, keep: impl Fn(&Announcement) -> bool) -> Vec<Announcement> {
        let mut notices: Vec<Announcement> = lock(&self.notices)
            .iter()
            .filter(|notice| keep(notice))
            .cloned()
            .collect();
        notices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notices
    }
}

#[async_trait]
impl AnnouncementRepository for InMemoryAnnouncementRepository {
    async fn list_active(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>, RepositoryError> {
        Ok(self.newest_first(|notice| notice.is_visible_at(now)))
    }

    async fn list_all(&self) -> Result<Vec<Announcement>, RepositoryError> {
        Ok(self.newest_first(|_| true))
    }

    async fn create(&self, announcement: &Announcement) -> Result<(), RepositoryError> {
        lock(&self.notices).push(announcement.clone());
        Ok(())
    }

    async fn update(
        &self,
        id: &Uuid,
        patch: &AnnouncementPatch,
    ) -> Result<Option<Announcement>, RepositoryError> {
        let mut notices = lock(&self.notices);
        Ok(notices
            .iter_mut()
            .find(|notice| &notice.id == id)
            .map(|notice| {
                patch.apply_to(notice);
                notice.clone()
            }))
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut notices = lock(&self.notices);
        let before = notices.len();
        notices.retain(|notice| &notice.id != id);
        Ok(notices.len() != before)
    }
}

/// Threads and replies in one list.
#[derive(Debug, Default)]
pub struct InMemoryCommunityRepository {
    posts: Mutex<Vec<CommunityPost>>,
}

#[async_trait]
impl CommunityRepository for InMemoryCommunityRepository {
    async fn list_threads(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ThreadSummary>, RepositoryError> {
        let posts = lock(&self.posts);
        let mut threads: Vec<&CommunityPost> =
            posts.iter().filter(|post| post.is_thread()).collect();
        threads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let skip = usize::try_from(offset).unwrap_or(0);
        let take = usize::try_from(limit).unwrap_or(0);
        Ok(threads
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|thread| {
                let replies = posts
                    .iter()
                    .filter(|post| post.parent_id == Some(thread.id))
                    .count();
                ThreadSummary {
                    post: thread.clone(),
                    reply_count: i64::try_from(replies).unwrap_or(i64::MAX),
                }
            })
            .collect())
    }

    async fn find(&self, id: &Uuid) -> Result<Option<CommunityPost>, RepositoryError> {
        Ok(lock(&self.posts).iter().find(|post| &post.id == id).cloned())
    }

    async fn replies(&self, parent_id: &Uuid) -> Result<Vec<CommunityPost>, RepositoryError> {
        let mut replies: Vec<CommunityPost> = lock(&self.posts)
            .iter()
            .filter(|post| post.parent_id.as_ref() == Some(parent_id))
            .cloned()
            .collect();
        replies.sort_by_key(|post| post.created_at);
        Ok(replies)
    }

    async fn create(&self, post: &CommunityPost) -> Result<(), RepositoryError> {
        lock(&self.posts).push(post.clone());
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        let mut posts = lock(&self.posts);
        let before = posts.len();
        posts.retain(|post| &post.id != id && post.parent_id.as_ref() != Some(id));
        Ok(posts.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use chrono::Duration;

    fn post(parent_id: Option<Uuid>, minutes: i64) -> CommunityPost {
        CommunityPost {
            id: Uuid::new_v4(),
            user_id: UserId::random(),
            author_name: "匿名".to_owned(),
            title: parent_id.is_none().then(|| "質問".to_owned()),
            body: "本文".to_owned(),
            parent_id,
            created_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn deleting_a_thread_removes_its_replies() {
        let store = InMemoryCommunityRepository::default();
        let thread = post(None, 0);
        store.create(&thread).await.expect("thread");
        store.create(&post(Some(thread.id), 1)).await.expect("reply");

        let listed = store.list_threads(20, 0).await.expect("list");
        assert_eq!(listed.first().map(|t| t.reply_count), Some(1));

        assert!(store.delete(&thread.id).await.expect("delete"));
        assert!(store.replies(&thread.id).await.expect("replies").is_empty());
    }

    #[tokio::test]
    async fn patch_clears_window_bound() {
        let store = InMemoryAnnouncementRepository::default();
        let notice = Announcement {
            id: Uuid::new_v4(),
            title: "メンテナンス".to_owned(),
            message: "本日 22 時から".to_owned(),
            kind: Default::default(),
            is_active: true,
            start_date: None,
            end_date: Some(Utc::now() - Duration::days(1)),
            created_at: Utc::now(),
        };
        store.create(&notice).await.expect("create");
        assert!(store.list_active(Utc::now()).await.expect("active").is_empty());

        let patch = AnnouncementPatch {
            end_date: Some(None),
            ..AnnouncementPatch::default()
        };
        store.update(&notice.id, &patch).await.expect("update");
        assert_eq!(store.list_active(Utc::now()).await.expect("active").len(), 1);
    }
}
