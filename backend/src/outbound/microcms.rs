//! microCMS blog adapter.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::{
    BlogPage, BlogPost, BlogQuery, Category, ContentSource, ContentSourceError, Eyecatch,
};
use crate::outbound::http_support::status_message;

/// Category held back from listings; its posts are reachable by id only.
pub const EXCLUDED_CATEGORY_ID: &str = "9dj-wo0gj";
const API_KEY_HEADER: &str = "X-MICROCMS-API-KEY";
const LIST_FIELDS: &str = "id,title,publishedAt,eyecatch,category";

/// Content source reading the `blogs` endpoint of one microCMS service.
pub struct MicroCmsSource {
    client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
}

impl MicroCmsSource {
    /// Build a source for `https://{service_domain}.microcms.io`.
    ///
    /// # Errors
    ///
    /// Returns an error when the domain does not form a valid URL or the
    /// client cannot be constructed.
    pub fn new(
        service_domain: &str,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, ContentSourceError> {
        let endpoint = Url::parse(&format!("https://{service_domain}.microcms.io/api/v1/blogs"))
            .map_err(|err| ContentSourceError::transport(format!("invalid cms url: {err}")))?;
        Self::with_endpoint(endpoint, api_key, timeout)
    }

    /// Build a source against an explicit `blogs` endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn with_endpoint(
        endpoint: Url,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, ContentSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ContentSourceError::transport(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    fn list_url(&self, query: &BlogQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("orders", "-publishedAt")
            .append_pair("fields", LIST_FIELDS)
            .append_pair(
                "filters",
                &format!("category[not_equals]{EXCLUDED_CATEGORY_ID}"),
            )
            .append_pair("limit", &query.limit.to_string())
            .append_pair("offset", &query.offset.to_string());
        url
    }

    fn post_url(&self, id: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(id);
        }
        url
    }

    async fn fetch(&self, url: Url) -> Result<(StatusCode, Vec<u8>), ContentSourceError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.api_key.as_str())
            .send()
            .await
            .map_err(|err| ContentSourceError::transport(err.to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| ContentSourceError::transport(err.to_string()))?;
        Ok((status, body.to_vec()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDto {
    contents: Vec<PostDto>,
    total_count: u32,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostDto {
    id: String,
    #[serde(default)]
    title: String,
    content: Option<String>,
    published_at: Option<DateTime<Utc>>,
    eyecatch: Option<EyecatchDto>,
    category: Option<CategoryDto>,
}

#[derive(Debug, Deserialize)]
struct EyecatchDto {
    url: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CategoryDto {
    id: String,
    #[serde(default)]
    name: String,
}

impl From<PostDto> for BlogPost {
    fn from(dto: PostDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            content: dto.content,
            published_at: dto.published_at,
            eyecatch: dto.eyecatch.map(|image| Eyecatch {
                url: image.url,
                width: image.width,
                height: image.height,
            }),
            category: dto.category.map(|category| Category {
                id: category.id,
                name: category.name,
            }),
        }
    }
}

#[async_trait]
impl ContentSource for MicroCmsSource {
    async fn list_posts(&self, query: &BlogQuery) -> Result<BlogPage, ContentSourceError> {
        let (status, body) = self.fetch(self.list_url(query)).await?;
        if !status.is_success() {
            return Err(ContentSourceError::transport(status_message(status, &body)));
        }
        let list: ListDto = serde_json::from_slice(&body)
            .map_err(|err| ContentSourceError::decode(err.to_string()))?;
        debug!(count = list.contents.len(), total = list.total_count, "blog page fetched");
        Ok(BlogPage {
            contents: list.contents.into_iter().map(BlogPost::from).collect(),
            total_count: list.total_count,
            limit: list.limit,
            offset: list.offset,
        })
    }

    async fn get_post(&self, id: &str) -> Result<Option<BlogPost>, ContentSourceError> {
        let (status, body) = self.fetch(self.post_url(id)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ContentSourceError::transport(status_message(status, &body)));
        }
        let post: PostDto = serde_json::from_slice(&body)
            .map_err(|err| ContentSourceError::decode(err.to_string()))?;
        Ok(Some(post.into()))
    }
}
