use crate::AppState;
use crate::utils::auth::{Identity, validate_jwt};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

pub const SESSION_COOKIE: &str = "session";

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

/// Lets authenticated requests through with an [`Identity`] attached; sends everyone
/// else to the external sign-in flow before any of the body is read.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let claims = session_token(&req).and_then(|token| {
        validate_jwt(&token, &state.config.jwt_secret)
            .map_err(|e| tracing::debug!("Rejected session token: {}", e))
            .ok()
    });

    match claims {
        Some(claims) => {
            req.extensions_mut().insert(Identity::from(claims));
            next.run(req).await
        }
        None => {
            tracing::info!(
                "🔒 Unauthenticated {} {}, redirecting to {}",
                req.method(),
                req.uri().path(),
                state.config.auth_entry_url
            );
            Redirect::to(&state.config.auth_entry_url).into_response()
        }
    }
}

fn session_token(req: &Request) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.to_string());
    if bearer.is_some() {
        return bearer;
    }

    let cookie = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string());
    if cookie.is_some() {
        return cookie;
    }

    // Try query parameter
    let query = req.uri().query().unwrap_or_default();
    serde_urlencoded::from_str::<AuthQuery>(query)
        .ok()
        .and_then(|q| q.token)
}
