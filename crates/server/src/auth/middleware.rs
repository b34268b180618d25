use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use super::{cookies, refresh_session, Session};
use crate::db::AppState;

/// Routes that manage sessions themselves and never get a transparent refresh.
const AUTH_ROUTES: &str = "/api/auth/";

/// Permissive auth middleware.
///
/// Resolves the caller `Identity` from the Bearer header or access cookie
/// and stores it in request extensions. When the access token is missing or
/// no longer valid and a refresh cookie is present, the session is rotated
/// and the new cookies are written on the response. Never rejects a request;
/// extractors decide authorization.
pub async fn auth_middleware(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let headers = req.headers();
    let access = cookies::extract_access_token(headers);
    let refresh = cookies::extract_refresh_token(headers);

    let identity = access.and_then(|token| state.tokens.verify_access(&token).ok());
    let mut refreshed: Option<Session> = None;

    match identity {
        Some(identity) => {
            req.extensions_mut().insert(identity);
        }
        None if !req.uri().path().starts_with(AUTH_ROUTES) => {
            if let Some(token) = refresh {
                match refresh_session(&state.engine, &state.tokens, &token).await {
                    Ok(session) => {
                        tracing::debug!(user_id = %session.user.id, "Session refreshed transparently");
                        req.extensions_mut().insert(shared_types::Identity {
                            user_id: session.user.id,
                            role: session.user.role,
                        });
                        refreshed = Some(session);
                    }
                    Err(e) => tracing::debug!(error = %e, "Transparent refresh refused"),
                }
            }
        }
        None => {}
    }

    let mut response = next.run(req).await;
    if let Some(session) = refreshed {
        session.set_cookies(response.headers_mut(), &state.tokens);
    }
    response
}
