//! Port for blog content held in the headless CMS.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::define_port_error;

define_port_error! {
    /// Errors raised by content adapters.
    pub enum ContentSourceError {
        /// CMS could not be reached or answered with an error.
        Transport { message: String } => "content source failed: {message}",
        /// CMS payload could not be decoded.
        Decode { message: String } => "content payload could not be decoded: {message}",
    }
}

/// Cover image of a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eyecatch {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Post category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    /// HTML body; list queries may omit it.
    pub content: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub eyecatch: Option<Eyecatch>,
    pub category: Option<Category>,
}

/// Page request for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlogQuery {
    pub limit: u32,
    pub offset: u32,
}

/// One page of posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPage {
    pub contents: Vec<BlogPost>,
    pub total_count: u32,
    pub limit: u32,
    pub offset: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Published posts, newest first, without the excluded category.
    async fn list_posts(&self, query: &BlogQuery) -> Result<BlogPage, ContentSourceError>;

    /// One post by id.
    async fn get_post(&self, id: &str) -> Result<Option<BlogPost>, ContentSourceError>;
}

/// Source used when no CMS is configured: the blog is empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyContentSource;

#[async_trait]
impl ContentSource for EmptyContentSource {
    async fn list_posts(&self, query: &BlogQuery) -> Result<BlogPage, ContentSourceError> {
        Ok(BlogPage {
            contents: Vec::new(),
            total_count: 0,
            limit: query.limit,
            offset: query.offset,
        })
    }

    async fn get_post(&self, _id: &str) -> Result<Option<BlogPost>, ContentSourceError> {
        Ok(None)
    }
}
