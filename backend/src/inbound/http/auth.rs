//! Caller identity for HTTP handlers.
//!
//! Clients send the auth provider's access token as `Authorization: Bearer
//! <token>`. The extractors here resolve it through the
//! [`AuthGateway`](crate::domain::ports::AuthGateway) and attach the caller's
//! profile, so handlers only ever see a [`Viewer`].

use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

use crate::domain::ports::AuthGatewayError;
use crate::domain::{Error, Viewer};
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

const BEARER_PREFIX: &str = "Bearer ";

/// Token from the `Authorization` header, if it is a non-empty bearer token.
pub(crate) fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn map_gateway_error(error: AuthGatewayError) -> Error {
    warn!(%error, "token verification failed");
    Error::service_unavailable("authentication is temporarily unavailable")
}

/// Resolve an optional token into a viewer.
///
/// Unknown or expired tokens resolve to `None`; the caller is then treated
/// as a guest.
pub async fn resolve_viewer(state: &HttpState, token: Option<&str>) -> ApiResult<Option<Viewer>> {
    let Some(token) = token else {
        return Ok(None);
    };
    let Some(user) = state
        .auth
        .verify_token(token)
        .await
        .map_err(map_gateway_error)?
    else {
        debug!("bearer token not recognised");
        return Ok(None);
    };
    let profile = state.profiles.find(&user.id).await?;
    Ok(Some(Viewer {
        user_id: user.id,
        email: user.email,
        profile,
    }))
}

fn state_from(req: &HttpRequest) -> ApiResult<web::Data<HttpState>> {
    req.app_data::<web::Data<HttpState>>()
        .cloned()
        .ok_or_else(|| Error::internal("HTTP state is not registered"))
}

/// A signed-in caller. Extraction fails with `401` for guests.
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Viewer);

/// A caller who may be a guest.
#[derive(Debug, Clone)]
pub struct MaybeViewer(pub Option<Viewer>);

impl FromRequest for MaybeViewer {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = state_from(req);
        let token = bearer_token(req);
        Box::pin(async move {
            let state = state?;
            resolve_viewer(&state, token.as_deref()).await.map(MaybeViewer)
        })
    }
}

impl FromRequest for CurrentViewer {
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = MaybeViewer::from_request(req, payload);
        Box::pin(async move {
            fut.await?
                .0
                .map(CurrentViewer)
                .ok_or_else(|| Error::unauthorized("login required"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Profile, Role};
    use crate::inbound::http::test_utils::TestContext;
    use actix_web::http::StatusCode;
    use actix_web::{App, HttpResponse, test};
    use chrono::Utc;

    async fn whoami(viewer: MaybeViewer) -> HttpResponse {
        match viewer.0 {
            Some(viewer) => HttpResponse::Ok().body(viewer.role().as_str()),
            None => HttpResponse::Ok().body("guest"),
        }
    }

    async fn private(viewer: CurrentViewer) -> HttpResponse {
        HttpResponse::Ok().body(viewer.0.user_id.to_string())
    }

    #[actix_web::test]
    async fn missing_or_unknown_tokens_are_guests() {
        let ctx = TestContext::new();
        let app = test::init_service(
            App::new()
                .app_data(ctx.data())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        for request in [
            test::TestRequest::get().uri("/whoami"),
            test::TestRequest::get()
                .uri("/whoami")
                .insert_header((header::AUTHORIZATION, "Bearer not-issued")),
            test::TestRequest::get()
                .uri("/whoami")
                .insert_header((header::AUTHORIZATION, "Basic abc")),
        ] {
            let body = test::call_and_read_body(&app, request.to_request()).await;
            assert_eq!(body, "guest");
        }
    }

    #[actix_web::test]
    async fn valid_tokens_carry_the_profile() {
        let ctx = TestContext::new();
        let (token, user) = ctx.sign_up("teacher@example.com").await;
        ctx.seed_profile(Profile::new(user, Role::Teacher, Utc::now())).await;
        let app = test::init_service(
            App::new()
                .app_data(ctx.data())
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let request = test::TestRequest::get()
            .uri("/whoami")
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, request).await;
        assert_eq!(body, "teacher");
    }

    #[actix_web::test]
    async fn required_viewer_rejects_guests() {
        let ctx = TestContext::new();
        let app = test::init_service(
            App::new()
                .app_data(ctx.data())
                .route("/private", web::get().to(private)),
        )
        .await;

        let res =
            test::call_service(&app, test::TestRequest::get().uri("/private").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
