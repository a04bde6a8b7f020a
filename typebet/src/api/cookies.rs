//! Cookie helpers for the session and round capsules.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

/// Cookie holding the session id.
pub const SESSION_COOKIE: &str = "typebet-session";

/// Prefix of the per-round capsule cookie; the round id follows.
pub const ROUND_COOKIE_PREFIX: &str = "typebet-round-";

/// Cookie attributes shared by every cookie the API sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSettings {
    pub secure: bool,
}

impl CookieSettings {
    /// `Set-Cookie` value for `name=value` living `max_age_secs`.
    pub fn build(&self, name: &str, value: &str, max_age_secs: i64) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            max_age_secs.max(0)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }

    /// `Set-Cookie` value that deletes `name`.
    pub fn clear(&self, name: &str) -> Option<HeaderValue> {
        self.build(name, "", 0)
    }
}

pub fn round_cookie_name(round_id: &str) -> String {
    format!("{ROUND_COOKIE_PREFIX}{round_id}")
}

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; typebet-session=abc-123; typebet-round-R1=tok"),
        );

        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc-123"));
        assert_eq!(
            read_cookie(&headers, &round_cookie_name("R1")).as_deref(),
            Some("tok")
        );
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("typebet-session="));
        assert_eq!(read_cookie(&headers, SESSION_COOKIE), None);
    }

    #[test]
    fn test_build_and_clear() {
        let settings = CookieSettings { secure: true };
        let cookie = settings.build(SESSION_COOKIE, "abc", 300).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("typebet-session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=300"));
        assert!(cookie.ends_with("; Secure"));

        let cleared = CookieSettings::default().clear(SESSION_COOKIE).unwrap();
        assert_eq!(
            cleared.to_str().unwrap(),
            "typebet-session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
