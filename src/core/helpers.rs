use std::sync::OnceLock;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use argon2::password_hash::SaltString;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use regex::Regex;
use serde::Serialize;
use spin_sdk::http::Response;
use uuid::Uuid;

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Display form used in serialized posts, e.g. `Jan 5 2024, 3:07 PM`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%b %-d %Y, %-I:%M %p").to_string()
}

pub fn json_response<T: Serialize>(status: u16, value: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(value)?)
        .build())
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::PasswordHash;

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Trailing identifier of a `/prefix/{id}` path, without any query string.
pub fn path_id<'a>(path: &'a str, prefix: &str) -> &'a str {
    let path = path.split('?').next().unwrap_or_default();
    path.strip_prefix(prefix)
        .unwrap_or_default()
        .trim_end_matches('/')
}

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Regex should compile"))
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile")
    })
}

pub fn is_valid_username(username: &str) -> bool {
    username_regex().is_match(username)
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}
