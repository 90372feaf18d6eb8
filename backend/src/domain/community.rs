//! Community board posts. Replies nest one level deep.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::UserId;

/// Longest accepted post body, in characters.
pub const BODY_MAX_CHARS: usize = 2000;
/// Longest accepted thread title, in characters.
pub const TITLE_MAX_CHARS: usize = 100;
/// Shown when the author has no profile name.
pub const ANONYMOUS_AUTHOR: &str = "匿名";

/// A thread starter or a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommunityPost {
    pub id: Uuid,
    pub user_id: UserId,
    pub author_name: String,
    pub title: Option<String>,
    pub body: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl CommunityPost {
    /// Whether this post starts a thread.
    pub fn is_thread(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A thread with its reply count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSummary {
    pub post: CommunityPost,
    pub reply_count: i64,
}

/// Validation failures for new posts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostValidationError {
    #[error("post body must not be empty")]
    EmptyBody,
    #[error("post body must be at most {max} characters")]
    BodyTooLong { max: usize },
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("replies cannot be nested")]
    NestedReply,
}

/// Validated content of a new post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent {
    pub title: Option<String>,
    pub body: String,
}

/// Trim and bound the title and body. A blank title is dropped.
pub fn validate_post(title: Option<&str>, body: &str) -> Result<PostContent, PostValidationError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(PostValidationError::EmptyBody);
    }
    if body.chars().count() > BODY_MAX_CHARS {
        return Err(PostValidationError::BodyTooLong {
            max: BODY_MAX_CHARS,
        });
    }
    let title = title.map(str::trim).filter(|t| !t.is_empty());
    if title.is_some_and(|t| t.chars().count() > TITLE_MAX_CHARS) {
        return Err(PostValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(PostContent {
        title: title.map(str::to_owned),
        body: body.to_owned(),
    })
}

/// Replies may only target thread starters.
pub fn ensure_reply_target(parent: &CommunityPost) -> Result<(), PostValidationError> {
    if parent.is_thread() {
        Ok(())
    } else {
        Err(PostValidationError::NestedReply)
    }
}
