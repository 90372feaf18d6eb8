//! Request-scoped trace identifier.
//!
//! The identifier lives in a Tokio task-local so error envelopes and log
//! lines can reach it without threading it through every call. Task-locals do
//! not follow `tokio::spawn`; detached work such as the writing-check counter
//! re-enters the scope with [`TraceId::scope`].

use std::fmt;
use std::future::Future;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    pub(crate) static TRACE_ID: TraceId;
}

/// Per-request correlation id, echoed to clients in the `trace-id` header.
///
/// # Examples
/// ```
/// use edulens::TraceId;
///
/// async fn handler() -> Option<String> {
///     TraceId::current().map(|id| id.to_string())
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(pub(crate) Uuid);

impl TraceId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Accept an id forwarded by a proxy. Only well-formed, non-nil UUIDs
    /// are trusted; anything else gets a fresh id.
    pub fn from_header(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .filter(|uuid| !uuid.is_nil())
            .map(Self)
    }

    /// The id in scope, if any.
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Run `fut` with `trace_id` in scope.
    pub async fn scope<Fut: Future>(trace_id: Self, fut: Fut) -> Fut::Output {
        TRACE_ID.scope(trace_id, fut).await
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[tokio::test]
    async fn current_follows_the_scope() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected, async move { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
        assert!(TraceId::current().is_none());
    }

    #[tokio::test]
    async fn spawned_work_must_re_enter_the_scope() {
        let trace_id = TraceId::generate();
        let (bare, scoped) = TraceId::scope(trace_id, async move {
            let bare = tokio::spawn(async { TraceId::current() })
                .await
                .expect("task joins");
            let scoped = tokio::spawn(TraceId::scope(trace_id, async { TraceId::current() }))
                .await
                .expect("task joins");
            (bare, scoped)
        })
        .await;

        assert!(bare.is_none());
        assert_eq!(scoped, Some(trace_id));
    }

    #[rstest]
    #[case::hyphenated(" 6f1c2d3e-4b5a-4c6d-8e7f-901a2b3c4d5e ", true)]
    #[case::nil("00000000-0000-0000-0000-000000000000", false)]
    #[case::opaque("req_81bd", false)]
    fn upstream_ids_must_be_uuids(#[case] raw: &str, #[case] accepted: bool) {
        assert_eq!(TraceId::from_header(raw).is_some(), accepted);
    }
}
