use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{
    models::login_token::AuthContext,
    responses::JsonResponse,
    services::login_link::{ErrorKind, IssueError, MessageSettings, RedeemError},
    session::{create_session_token, AuthSession, SESSION_COOKIE},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginLinkRequest {
    pub email: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Deserialize)]
pub struct RedeemLoginLinkRequest {
    pub token: String,
}

pub async fn handle_request_login_link(
    State(state): State<AppState>,
    Json(payload): Json<LoginLinkRequest>,
) -> Response {
    let email = payload.email.trim();
    let settings = MessageSettings {
        // only paths on the configured origin
        target: payload
            .target
            .map(|t| t.trim().to_string())
            .filter(|t| t.starts_with('/')),
        ..MessageSettings::default()
    };

    match state
        .login_links
        .issue(email, AuthContext::Frontend, &settings)
        .await
    {
        Ok(()) => {
            JsonResponse::success(&format!("A login link has been sent to {}.", email))
                .into_response()
        }
        Err(err) => issue_error_response(&err),
    }
}

fn issue_error_response(err: &IssueError) -> Response {
    match err.kind() {
        ErrorKind::Validation => {
            JsonResponse::bad_request_with_code(&err.to_string(), err.code()).into_response()
        }
        ErrorKind::Transport => JsonResponse::service_unavailable(
            "The login link could not be sent right now. Please try again later.",
        )
        .into_response(),
        ErrorKind::Configuration | ErrorKind::Storage => {
            JsonResponse::server_error("Something went wrong").into_response()
        }
    }
}

pub async fn handle_redeem_login_link(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RedeemLoginLinkRequest>,
) -> Response {
    let account_id = match state
        .login_links
        .redeem(&payload.token, AuthContext::Frontend)
        .await
    {
        Ok(id) => id,
        Err(err) => return redeem_error_response(&err),
    };

    let session_ttl = state.config.session_ttl;
    let token = match create_session_token(
        account_id,
        AuthContext::Frontend,
        &state.jwt_keys,
        session_ttl,
    ) {
        Ok(token) => token,
        Err(e) => {
            error!(account_id, "failed to create session token: {}", e);
            return JsonResponse::server_error("Session creation failed").into_response();
        }
    };

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(state.config.auth_cookie_secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(session_ttl)
        .build();

    (
        StatusCode::OK,
        jar.add(cookie),
        Json(json!({
            "success": true,
            "account_id": account_id,
        })),
    )
        .into_response()
}

fn redeem_error_response(err: &RedeemError) -> Response {
    match err.kind() {
        ErrorKind::Validation => {
            JsonResponse::unauthorized_with_code(&err.to_string(), err.code()).into_response()
        }
        _ => JsonResponse::server_error("Something went wrong").into_response(),
    }
}

pub async fn handle_session(AuthSession(claims): AuthSession) -> Response {
    match claims.account_id() {
        Some(account_id) => Json(json!({
            "success": true,
            "account_id": account_id,
            "auth_context": claims.ctx,
        }))
        .into_response(),
        None => JsonResponse::unauthorized("Invalid session").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
        routing::{get, post},
        Router,
    };
    use std::sync::Arc;
    use time::Duration;
    use tower::ServiceExt;

    use crate::{
        config::{Config, LoginLinkSettings, RateLimitSettings, SenderSettings},
        db::mock_db::{InMemoryAccountDirectory, InMemoryTokenRepository},
        models::account::Account,
        services::{
            link_builder::QueryLinkBuilder, login_link::LoginLinkService,
            smtp_mailer::MockMailer, token_generator::TokenGenerator,
        },
        session::JwtKeys,
    };

    struct FixedTokenGenerator;

    impl TokenGenerator for FixedTokenGenerator {
        fn generate(&self) -> String {
            "fixedtoken123".to_string()
        }
    }

    fn test_config(login_link: LoginLinkSettings) -> Arc<Config> {
        Arc::new(Config {
            database_url: String::new(),
            frontend_origin: "http://localhost".into(),
            bind_addr: "127.0.0.1:0".into(),
            jwt_secret: "0123456789abcdef0123456789abcdef".into(),
            session_ttl: Duration::hours(1),
            auth_cookie_secure: false,
            login_link,
            link_rate_limit: RateLimitSettings {
                per_second: 1,
                burst_size: 5,
            },
        })
    }

    fn accounts() -> Vec<Account> {
        let account = |id: i64, email: &str, disabled: bool| Account {
            id,
            email: email.into(),
            disabled,
            deleted: false,
            partition_id: None,
        };
        vec![
            account(42, "a@x.com", false),
            account(1, "dup@x.com", false),
            account(2, "dup@x.com", false),
        ]
    }

    fn make_app(with_sender: bool, mailer: MockMailer) -> Router {
        let mut settings = LoginLinkSettings::default();
        if with_sender {
            settings.sender = SenderSettings {
                from_address: Some("noreply@example.com".into()),
                from_name: None,
            };
        }
        let config = test_config(settings.clone());
        let service = LoginLinkService::new(
            Arc::new(InMemoryTokenRepository::default()),
            Arc::new(InMemoryAccountDirectory::with_accounts(accounts())),
            Arc::new(FixedTokenGenerator),
            Arc::new(QueryLinkBuilder::new(config.frontend_origin.clone())),
            Arc::new(mailer),
            settings,
        );
        let state = AppState {
            login_links: Arc::new(service),
            jwt_keys: Arc::new(JwtKeys::from_secret(&config.jwt_secret).unwrap()),
            config,
        };

        Router::new()
            .route("/login-link", post(handle_request_login_link))
            .route("/login-link/redeem", post(handle_redeem_login_link))
            .route("/login-link/session", get(handle_session))
            .with_state(state)
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_request_link_success() {
        let app = make_app(true, MockMailer::default());

        let response = app
            .oneshot(json_post("/login-link", json!({ "email": "a@x.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["message"], "A login link has been sent to a@x.com.");
    }

    #[tokio::test]
    async fn test_request_link_validation_error_has_code() {
        let app = make_app(true, MockMailer::default());

        let response = app
            .oneshot(json_post("/login-link", json!({ "email": "dup@x.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "1704878342");
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn test_request_link_mail_failure_is_503() {
        let app = make_app(true, MockMailer::failing());

        let response = app
            .oneshot(json_post("/login-link", json!({ "email": "a@x.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_request_link_without_sender_is_500() {
        let app = make_app(false, MockMailer::default());

        let response = app
            .oneshot(json_post("/login-link", json!({ "email": "a@x.com" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_redeem_sets_session_cookie_once() {
        let app = make_app(true, MockMailer::default());

        let response = app
            .clone()
            .oneshot(json_post("/login-link", json!({ "email": "a@x.com" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_post(
                "/login-link/redeem",
                json!({ "token": "fixedtoken123" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("auth_token="));
        assert!(set_cookie.contains("HttpOnly"));
        let json = body_json(response).await;
        assert_eq!(json["account_id"], 42);

        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/login-link/session")
                    .header(header::COOKIE, cookie_pair)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["account_id"], 42);
        assert_eq!(json["auth_context"], "fe");

        let response = app
            .oneshot(json_post(
                "/login-link/redeem",
                json!({ "token": "fixedtoken123" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "1704878352");
    }

    #[tokio::test]
    async fn test_redeem_unknown_token_is_unauthorized() {
        let app = make_app(true, MockMailer::default());

        let response = app
            .oneshot(json_post("/login-link/redeem", json!({ "token": "nope" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_session_requires_cookie() {
        let app = make_app(true, MockMailer::default());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/login-link/session")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
