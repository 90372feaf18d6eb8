//! Community board use-cases.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::domain::community::{
    ANONYMOUS_AUTHOR, CommunityPost, PostValidationError, ThreadSummary, ensure_reply_target,
    validate_post,
};
use crate::domain::ports::{CommunityRepository, ProfileRepository};
use crate::domain::{Error, Viewer};

/// Threads per page when the caller does not ask.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: i64 = 100;

fn map_validation_error(error: &PostValidationError) -> Error {
    let field = match error {
        PostValidationError::EmptyBody | PostValidationError::BodyTooLong { .. } => "body",
        PostValidationError::TitleTooLong { .. } => "title",
        PostValidationError::NestedReply => "parentId",
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": "invalid_value",
    }))
}

/// A thread starter with its replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub post: CommunityPost,
    pub replies: Vec<CommunityPost>,
}

/// Input for a new post or reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: Option<String>,
    pub body: String,
    pub parent_id: Option<Uuid>,
}

/// Community use-cases.
#[derive(Clone)]
pub struct CommunityService {
    posts: Arc<dyn CommunityRepository>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl CommunityService {
    pub fn new(
        posts: Arc<dyn CommunityRepository>,
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            posts,
            profiles,
            clock,
        }
    }

    /// Thread starters, newest first.
    pub async fn threads(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<ThreadSummary>, Error> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = offset.unwrap_or(0).max(0);
        Ok(self.posts.list_threads(limit, offset).await?)
    }

    /// A thread with replies, oldest reply first.
    pub async fn thread(&self, id: &Uuid) -> Result<Thread, Error> {
        let post = self
            .posts
            .find(id)
            .await?
            .filter(CommunityPost::is_thread)
            .ok_or_else(|| Error::not_found("thread not found"))?;
        let replies = self.posts.replies(id).await?;
        Ok(Thread { post, replies })
    }

    /// Publish a thread or a reply under the caller's display name.
    pub async fn create(&self, viewer: &Viewer, draft: NewPost) -> Result<CommunityPost, Error> {
        let content = validate_post(draft.title.as_deref(), &draft.body)
            .map_err(|err| map_validation_error(&err))?;

        if let Some(parent_id) = &draft.parent_id {
            let parent = self
                .posts
                .find(parent_id)
                .await?
                .ok_or_else(|| Error::not_found("parent post not found"))?;
            ensure_reply_target(&parent).map_err(|err| map_validation_error(&err))?;
        }

        let author_name = self.author_name(viewer).await?;
        let post = CommunityPost {
            id: Uuid::new_v4(),
            user_id: viewer.user_id,
            author_name,
            // Replies carry no title.
            title: content.title.filter(|_| draft.parent_id.is_none()),
            body: content.body,
            parent_id: draft.parent_id,
            created_at: self.clock.utc(),
        };
        self.posts.create(&post).await?;
        info!(post_id = %post.id, reply = post.parent_id.is_some(), "community post created");
        Ok(post)
    }

    /// Delete a post and its replies. Authors and administrators only.
    pub async fn delete(&self, viewer: &Viewer, id: &Uuid) -> Result<(), Error> {
        let post = self
            .posts
            .find(id)
            .await?
            .ok_or_else(|| Error::not_found("post not found"))?;
        if post.user_id != viewer.user_id && !viewer.is_admin() {
            return Err(Error::forbidden("only the author can delete this post"));
        }
        self.posts.delete(id).await?;
        info!(post_id = %id, "community post deleted");
        Ok(())
    }

    async fn author_name(&self, viewer: &Viewer) -> Result<String, Error> {
        let profile = match &viewer.profile {
            Some(profile) => Some(profile.clone()),
            None => self.profiles.find(&viewer.user_id).await?,
        };
        Ok(profile
            .and_then(|p| p.full_name)
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockCommunityRepository, MockProfileRepository};
    use crate::domain::{ErrorCode, Profile, Role, UserId};
    use chrono::Utc;
    use mockable::MockClock;
    use rstest::rstest;

    fn clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_utc().return_const(Utc::now());
        Arc::new(clock)
    }

    fn viewer(full_name: Option<&str>, role: Role) -> Viewer {
        let id = UserId::random();
        let mut profile = Profile::new(id, role, Utc::now());
        profile.full_name = full_name.map(str::to_owned);
        Viewer {
            user_id: id,
            email: None,
            profile: Some(profile),
        }
    }

    fn post(author: UserId, parent_id: Option<Uuid>) -> CommunityPost {
        CommunityPost {
            id: Uuid::new_v4(),
            user_id: author,
            author_name: "山田".to_owned(),
            title: None,
            body: "質問です".to_owned(),
            parent_id,
            created_at: Utc::now(),
        }
    }

    #[rstest]
    #[case::named(Some("山田 太郎"), "山田 太郎")]
    #[case::blank(Some("  "), ANONYMOUS_AUTHOR)]
    #[case::unnamed(None, ANONYMOUS_AUTHOR)]
    #[tokio::test]
    async fn author_name_falls_back_to_anonymous(
        #[case] full_name: Option<&str>,
        #[case] expected: &str,
    ) {
        let mut posts = MockCommunityRepository::new();
        posts.expect_create().times(1).returning(|_| Ok(()));
        let service = CommunityService::new(
            Arc::new(posts),
            Arc::new(MockProfileRepository::new()),
            clock(),
        );
        let draft = NewPost {
            title: Some("英語".to_owned()),
            body: "関係代名詞が分かりません".to_owned(),
            parent_id: None,
        };

        let created = service
            .create(&viewer(full_name, Role::Student), draft)
            .await
            .expect("created");

        assert_eq!(created.author_name, expected);
        assert_eq!(created.title.as_deref(), Some("英語"));
    }

    #[tokio::test]
    async fn replies_to_replies_are_rejected() {
        let reply = post(UserId::random(), Some(Uuid::new_v4()));
        let reply_id = reply.id;
        let mut posts = MockCommunityRepository::new();
        posts
            .expect_find()
            .returning(move |_| Ok(Some(reply.clone())));
        posts.expect_create().never();
        let service = CommunityService::new(
            Arc::new(posts),
            Arc::new(MockProfileRepository::new()),
            clock(),
        );
        let draft = NewPost {
            title: None,
            body: "返信".to_owned(),
            parent_id: Some(reply_id),
        };

        let error = service
            .create(&viewer(None, Role::Student), draft)
            .await
            .expect_err("nested reply");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[case::stranger(Role::Student, false)]
    #[case::admin(Role::Admin, true)]
    #[tokio::test]
    async fn delete_is_limited_to_author_or_admin(#[case] role: Role, #[case] allowed: bool) {
        let existing = post(UserId::random(), None);
        let mut posts = MockCommunityRepository::new();
        posts
            .expect_find()
            .returning(move |_| Ok(Some(existing.clone())));
        posts
            .expect_delete()
            .times(usize::from(allowed))
            .returning(|_| Ok(true));
        let service = CommunityService::new(
            Arc::new(posts),
            Arc::new(MockProfileRepository::new()),
            clock(),
        );

        let outcome = service
            .delete(&viewer(None, role), &Uuid::new_v4())
            .await;

        assert_eq!(outcome.is_ok(), allowed);
    }
}
