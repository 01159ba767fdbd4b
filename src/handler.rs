use std::any::Any;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;

use crate::api::LoginResults;
use crate::auth::TokenValidator;
use crate::config::Login;
use crate::db::Database;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub validator: Arc<TokenValidator>,
    pub login: Option<Arc<Login>>,
}

#[derive(Debug, Deserialize)]
pub struct LoginParams {
    pub access_token: Option<String>,
    pub expires_in: Option<String>,
    pub token_type: Option<String>,
}

/// Implicit-grant authorize URL of the identity provider.
pub fn authorize_url(login: &Login) -> String {
    let audience = login.audience.as_deref().unwrap_or_default();
    format!(
        "https://{}/authorize?audience={}&response_type=token&client_id={}&redirect_uri={}",
        login.domain,
        urlencoding::encode(audience),
        urlencoding::encode(&login.client_id),
        urlencoding::encode(&login.callback_url),
    )
}

pub async fn login(State(state): State<AppState>) -> Response {
    match &state.login {
        Some(login) => {
            let url = authorize_url(login);
            tracing::info!("redirecting to identity provider");
            (StatusCode::FOUND, [(header::LOCATION, url)]).into_response()
        }
        None => ApiError::NotFound.into_response(),
    }
}

pub async fn login_results(Query(params): Query<LoginParams>) -> Response {
    match params.access_token {
        Some(access_token) => Json(LoginResults {
            access_token,
            expires_in: params.expires_in,
            token_type: params.token_type,
        })
        .into_response(),
        None => Html(FRAGMENT_FORWARDER).into_response(),
    }
}

// The provider returns the token in the URL fragment, which never reaches the
// server; this page moves it into the query string.
const FRAGMENT_FORWARDER: &str = r#"
<!doctype html>
<html>
    <body>
        <script>
            if (window.location.hash) {
                var fragment = window.location.hash.substring(1);
                window.location.href = '/login-results?' + fragment;
            } else {
                document.body.innerHTML = "No fragment found in URL.";
            }
        </script>
    </body>
</html>
"#;

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

/// Gives axum's bare 405 responses the error envelope, keeping `Allow`.
pub async fn method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut envelope = ApiError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        envelope.headers_mut().insert(header::ALLOW, allow);
    }
    envelope
}

pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    ApiError::Internal.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::routing::get;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tower_http::catch_panic::CatchPanicLayer;

    #[test]
    fn authorize_url_encodes_parameters() {
        let login = Login {
            domain: "tenant.example.com".into(),
            client_id: "abc 123".into(),
            callback_url: "http://localhost:5000/login-results".into(),
            audience: Some("readlog".into()),
        };
        assert_eq!(
            authorize_url(&login),
            "https://tenant.example.com/authorize?audience=readlog&response_type=token\
             &client_id=abc%20123&redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Flogin-results"
        );
    }

    #[tokio::test]
    async fn bare_method_not_allowed_gets_envelope() {
        let bare = (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET,HEAD")]).into_response();
        let response = method_not_allowed(bare).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET,HEAD");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        let ok = method_not_allowed(StatusCode::OK.into_response()).await;
        assert_eq!(ok.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn handler_panic_becomes_internal_error_envelope() {
        async fn explode() -> &'static str {
            panic!("boom")
        }

        let app = Router::new()
            .route("/explode", get(explode))
            .layer(CatchPanicLayer::custom(panic_response));
        let request = Request::builder().uri("/explode").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            json!({"success": false, "error": 500, "message": "Internal Server Error"})
        );
    }
}
