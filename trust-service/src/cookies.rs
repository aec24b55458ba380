//! Session cookie construction.
//!
//! Both cookies are HttpOnly, SameSite=Strict, Path=/ and Secure
//! outside dev. The access cookie lives exactly as long as the access
//! token; the refresh cookie is pinned to seven days.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::services::session::SessionTokens;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// 7 days, fixed by contract with the frontend.
const REFRESH_COOKIE_MAX_AGE_SECONDS: i64 = 604_800;

fn base_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(SameSite::Strict);
    cookie.set_path("/");
    cookie
}

/// Build the pair of session cookies for a freshly issued token pair.
pub fn session_cookies(
    tokens: &SessionTokens,
    secure: bool,
) -> (Cookie<'static>, Cookie<'static>) {
    let mut access = base_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone(), secure);
    access.set_max_age(Duration::seconds(tokens.expires_in));

    let mut refresh = base_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone(), secure);
    refresh.set_max_age(Duration::seconds(REFRESH_COOKIE_MAX_AGE_SECONDS));

    (access, refresh)
}

/// Expired cookies clearing the session on logout.
pub fn removal_cookies(secure: bool) -> (Cookie<'static>, Cookie<'static>) {
    let mut access = base_cookie(ACCESS_TOKEN_COOKIE, String::new(), secure);
    access.set_max_age(Duration::ZERO);

    let mut refresh = base_cookie(REFRESH_TOKEN_COOKIE, String::new(), secure);
    refresh.set_max_age(Duration::ZERO);

    (access, refresh)
}
