//! Blog reads with an in-process cache, and cache revalidation.
//!
//! CMS responses are cached for a TTL with random jitter so entries written
//! together do not all expire together. A CMS webhook or an operator with
//! the shared secret clears the cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use mockable::Clock;
use rand::Rng;
use sha2::Sha256;
use tracing::{debug, info, warn};

use crate::domain::Error;
use crate::domain::ports::{BlogPage, BlogPost, BlogQuery, ContentSource, ContentSourceError};

/// Posts per page when the caller does not ask.
pub const DEFAULT_BLOG_LIMIT: u32 = 10;
/// Largest page a caller may request.
pub const MAX_BLOG_LIMIT: u32 = 100;

/// Cache lifetime and jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub max_jitter: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_jitter: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    List(BlogQuery),
    Post(String),
}

#[derive(Debug, Clone)]
enum Cached {
    List(BlogPage),
    Post(Option<BlogPost>),
}

#[derive(Debug)]
struct Entry {
    value: Cached,
    expires_at: DateTime<Utc>,
}

fn map_source_error(error: ContentSourceError) -> Error {
    warn!(%error, "content source failed");
    Error::service_unavailable("blog content is temporarily unavailable")
}

/// Blog use-cases.
pub struct ContentService {
    source: Arc<dyn ContentSource>,
    clock: Arc<dyn Clock>,
    policy: CachePolicy,
    revalidate_secret: Option<String>,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl ContentService {
    /// `revalidate_secret` guards [`ContentService::revalidate`]; without it
    /// every revalidation is refused.
    pub fn new(
        source: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
        policy: CachePolicy,
        revalidate_secret: Option<String>,
    ) -> Self {
        Self {
            source,
            clock,
            policy,
            revalidate_secret: revalidate_secret.filter(|s| !s.is_empty()),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// A page of posts, newest first.
    pub async fn list(&self, limit: Option<u32>, offset: Option<u32>) -> Result<BlogPage, Error> {
        let query = BlogQuery {
            limit: limit.unwrap_or(DEFAULT_BLOG_LIMIT).clamp(1, MAX_BLOG_LIMIT),
            offset: offset.unwrap_or(0),
        };
        let key = CacheKey::List(query);
        if let Some(Cached::List(page)) = self.lookup(&key) {
            return Ok(page);
        }
        let page = self
            .source
            .list_posts(&query)
            .await
            .map_err(map_source_error)?;
        self.store(key, Cached::List(page.clone()));
        Ok(page)
    }

    /// One post by id.
    pub async fn get(&self, id: &str) -> Result<BlogPost, Error> {
        let key = CacheKey::Post(id.to_owned());
        let post = match self.lookup(&key) {
            Some(Cached::Post(post)) => post,
            _ => {
                let post = self.source.get_post(id).await.map_err(map_source_error)?;
                self.store(key, Cached::Post(post.clone()));
                post
            }
        };
        post.ok_or_else(|| Error::not_found("post not found"))
    }

    /// Clear the cache after checking the shared secret or a hex
    /// HMAC-SHA256 signature of `body`.
    pub fn revalidate(
        &self,
        query_secret: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<DateTime<Utc>, Error> {
        let Some(secret) = self.revalidate_secret.as_deref() else {
            return Err(Error::unauthorized("Invalid token"));
        };
        let by_query = query_secret.is_some_and(|given| given == secret);
        let by_signature = signature.is_some_and(|sig| signature_matches(secret, body, sig));
        if !(by_query || by_signature) {
            return Err(Error::unauthorized("Invalid token"));
        }

        let cleared = {
            let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
            let count = entries.len();
            entries.clear();
            count
        };
        info!(cleared, "content cache revalidated");
        Ok(self.clock.utc())
    }

    fn lookup(&self, key: &CacheKey) -> Option<Cached> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(key)?;
        if entry.expires_at <= self.clock.utc() {
            return None;
        }
        debug!(?key, "content cache hit");
        Some(entry.value.clone())
    }

    fn store(&self, key: CacheKey, value: Cached) {
        let jitter_ms = u64::try_from(self.policy.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms));
        let lifetime = chrono::Duration::from_std(self.policy.ttl + jitter)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let expires_at = self.clock.utc() + lifetime;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| entry.expires_at > expires_at - lifetime);
        entries.insert(key, Entry { value, expires_at });
    }
}

/// Constant-time check of a hex HMAC-SHA256 signature.
pub fn signature_matches(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::MockContentSource;
    use mockable::MockClock;
    use rstest::rstest;
    use std::sync::Mutex;

    /// Clock whose time can be moved by tests.
    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl SteppingClock {
        fn advance(&self, by: chrono::Duration) {
            let mut now = self.0.lock().expect("clock mutex");
            *now += by;
        }
    }

    impl Clock for SteppingClock {
        fn local(&self) -> DateTime<chrono::Local> {
            self.utc().with_timezone(&chrono::Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.0.lock().expect("clock mutex")
        }
    }

    fn page() -> BlogPage {
        BlogPage {
            contents: Vec::new(),
            total_count: 0,
            limit: 10,
            offset: 0,
        }
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        clock.expect_utc().return_const(Utc::now());
        Arc::new(clock)
    }

    #[tokio::test]
    async fn listing_is_served_from_cache_until_expiry() {
        let mut source = MockContentSource::new();
        source.expect_list_posts().times(2).returning(|_| Ok(page()));
        let clock = Arc::new(SteppingClock(Mutex::new(Utc::now())));
        let service = ContentService::new(
            Arc::new(source),
            clock.clone(),
            CachePolicy::default(),
            None,
        );

        service.list(None, None).await.expect("first fetch");
        service.list(None, None).await.expect("cached");
        clock.advance(chrono::Duration::seconds(71));
        service.list(None, None).await.expect("refetched");
    }

    #[tokio::test]
    async fn missing_post_is_not_found() {
        let mut source = MockContentSource::new();
        source.expect_get_post().times(1).returning(|_| Ok(None));
        let service = ContentService::new(
            Arc::new(source),
            fixed_clock(),
            CachePolicy::default(),
            None,
        );

        let error = service.get("abc").await.expect_err("missing");

        assert_eq!(error.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[case::query_secret(Some("s3cret"), None, true)]
    #[case::wrong_secret(Some("nope"), None, false)]
    #[case::signature(None, Some("bad-hex"), false)]
    fn revalidation_checks_credentials(
        #[case] secret: Option<&str>,
        #[case] signature: Option<&str>,
        #[case] accepted: bool,
    ) {
        let service = ContentService::new(
            Arc::new(MockContentSource::new()),
            fixed_clock(),
            CachePolicy::default(),
            Some("s3cret".to_owned()),
        );

        let outcome = service.revalidate(secret, signature, b"{}");

        assert_eq!(outcome.is_ok(), accepted);
    }

    #[rstest]
    fn webhook_signature_is_hex_hmac() {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"s3cret").expect("hmac key");
        mac.update(b"{\"api\":\"blogs\"}");
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(signature_matches("s3cret", b"{\"api\":\"blogs\"}", &signature));
        assert!(!signature_matches("other", b"{\"api\":\"blogs\"}", &signature));
    }
}
