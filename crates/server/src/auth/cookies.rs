use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{Cookie, SameSite};

pub const INTAKE_ACCESS: &str = "intake_access";
pub const INTAKE_REFRESH: &str = "intake_refresh";

fn cookie_domain() -> Option<String> {
    std::env::var("COOKIE_DOMAIN").ok().filter(|d| !d.is_empty())
}

/// Set-Cookie value for an HttpOnly auth cookie. `None` only if the token
/// contains bytes a header cannot carry, which signed JWTs never do.
fn build_cookie(name: &'static str, value: &str, max_age_secs: i64, secure: bool) -> Option<HeaderValue> {
    let mut cookie = Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(cookie::time::Duration::seconds(max_age_secs.max(0)))
        .secure(secure);
    if let Some(domain) = cookie_domain() {
        cookie = cookie.domain(domain);
    }
    HeaderValue::from_str(&cookie.build().to_string()).ok()
}

/// Append both auth cookies to a response.
pub fn set_auth_cookies(
    headers: &mut HeaderMap,
    access_token: &str,
    access_max_age_secs: i64,
    refresh_token: &str,
    refresh_max_age_secs: i64,
    secure: bool,
) {
    let pairs = [
        (INTAKE_ACCESS, access_token, access_max_age_secs),
        (INTAKE_REFRESH, refresh_token, refresh_max_age_secs),
    ];
    for (name, value, max_age) in pairs {
        match build_cookie(name, value, max_age, secure) {
            Some(v) => {
                headers.append(header::SET_COOKIE, v);
            }
            None => tracing::warn!(cookie = name, "Skipping unrepresentable auth cookie"),
        }
    }
}

/// Expire both auth cookies.
pub fn clear_auth_cookies(headers: &mut HeaderMap, secure: bool) {
    for name in [INTAKE_ACCESS, INTAKE_REFRESH] {
        if let Some(v) = build_cookie(name, "", 0, secure) {
            headers.append(header::SET_COOKIE, v);
        }
    }
}

/// Access token from the `Authorization: Bearer` header, else the cookie.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| extract_cookie(headers, INTAKE_ACCESS))
}

pub fn extract_refresh_token(headers: &HeaderMap) -> Option<String> {
    extract_cookie(headers, INTAKE_REFRESH)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|piece| Cookie::parse(piece.trim().to_string()).ok())
        .find(|c| c.name() == name && !c.value().is_empty())
        .map(|c| c.value().to_string())
}
