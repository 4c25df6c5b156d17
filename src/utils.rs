use std::sync::LazyLock;

use axum_extra::extract::cookie::{Cookie, SameSite};
use regex::Regex;
use time::Duration;

use crate::{config::Config, error::Error};

pub static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

pub const SESSION_COOKIE: &str = "jwt";

pub const MIN_PASSWORD_LENGTH: usize = 8;

// Column widths of the users table
pub const MAX_NAME_LENGTH: usize = 64;
pub const MAX_EMAIL_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_LANGUAGE_LENGTH: usize = 64;
pub const MAX_LOCATION_LENGTH: usize = 128;

/// Rejects `value` with a 400 when it is longer than `max` characters
pub fn check_length(field: &str, value: &str, max: usize) -> Result<(), Error> {
    if value.chars().count() > max {
        return Err(Error::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }

    Ok(())
}

pub fn session_cookie(config: &Config, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .secure(config.web.secure_cookies)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(Duration::seconds(config.auth.token_lifetime.num_seconds()))
        .build()
}

pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// `%search%` for ILIKE with the wildcards in `search` escaped
pub fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);

    pattern.push('%');

    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }

    pattern.push('%');

    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ana"), "%ana%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn length_is_counted_in_characters() {
        assert!(check_length("name", &"ñ".repeat(64), MAX_NAME_LENGTH).is_ok());
        assert!(matches!(
            check_length("name", &"a".repeat(65), MAX_NAME_LENGTH),
            Err(Error::BadRequest(message)) if message == "name must be at most 64 characters"
        ));
    }

    #[test]
    fn email_regex() {
        assert!(EMAIL_REGEX.is_match("ana@example.com"));
        assert!(EMAIL_REGEX.is_match("ana.lopez+lingo@mail.example.co"));
        assert!(!EMAIL_REGEX.is_match("ana@example"));
        assert!(!EMAIL_REGEX.is_match("ana example.com"));
        assert!(!EMAIL_REGEX.is_match("@example.com"));
    }
}
