use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, verify_password};
use crate::core::query_params::{get_string, read_fields};
use crate::core::store::KvStore;
use crate::models::models::{TokenData, User};
use crate::users::{build_user_view, create_account, find_by_username, get_user};

pub fn authenticate<S: KvStore>(store: &S, username: &str, password: &str) -> Result<User, ApiError> {
    match find_by_username(store, username)? {
        Some(u) if verify_password(password, &u.password) => Ok(u),
        _ => {
            tracing::info!(username, "login rejected");
            Err(ApiError::InvalidCredentials)
        }
    }
}

fn is_expired(data: &TokenData) -> bool {
    match chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        Ok(created) => {
            let age_hours = (chrono::Utc::now() - created.with_timezone(&chrono::Utc)).num_hours();
            age_hours > token_expiration_hours()
        }
        Err(_) => false,
    }
}

/// Deletes expired and dangling tokens, returning how many were dropped.
pub fn prune_expired_tokens<S: KvStore>(store: &S) -> anyhow::Result<usize> {
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut dead = Vec::new();
    for token in tokens {
        let keep = match store.get_json::<TokenData>(&token_key(&token))? {
            Some(data) => !is_expired(&data),
            None => false,
        };
        if !keep {
            store.delete(&token_key(&token))?;
            dead.push(token);
        }
    }

    if !dead.is_empty() {
        store.update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| {
            tokens.retain(|t| !dead.contains(t))
        })?;
    }
    Ok(dead.len())
}

fn issue_token<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<String> {
    prune_expired_tokens(store)?;

    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;
    store.update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| tokens.push(token.clone()))?;

    Ok(token)
}

fn session_cookie(token: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, token)
}

fn session_response(status: u16, token: &str, body: &serde_json::Value) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Set-Cookie", session_cookie(token))
        .body(serde_json::to_vec(body)?)
        .build())
}

/// Token presented by the request: bearer header first, then session cookie.
pub fn session_token(req: &Request) -> Option<String> {
    if let Some(token) = req
        .header("Authorization")
        .and_then(|h| h.as_str())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    let cookies = req.header("Cookie").and_then(|h| h.as_str())?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

pub fn validate_token<S: KvStore>(store: &S, token: &str) -> anyhow::Result<Option<String>> {
    let data = match store.get_json::<TokenData>(&token_key(token))? {
        Some(d) => d,
        None => return Ok(None),
    };

    if is_expired(&data) {
        return Ok(None);
    }

    Ok(Some(data.user_id))
}

/// The authenticated user behind the request, if any.
pub fn current_user<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Option<User>> {
    let token = match session_token(req) {
        Some(t) => t,
        None => return Ok(None),
    };
    match validate_token(store, &token)? {
        // Tokens of deleted users resolve to nobody
        Some(user_id) => get_user(store, &user_id),
        None => Ok(None),
    }
}

// === HTTP Handlers ===

pub fn register<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let fields = match read_fields(req) {
        Ok(f) => f,
        Err(e) => return Ok(e.into()),
    };

    let username = get_string(&fields, "username", None);
    let email = get_string(&fields, "email", Some("")).unwrap_or_default();
    let password = get_string(&fields, "password", None);
    let confirmation = get_string(&fields, "confirmation", None);

    let (username, password, confirmation) = match (username, password, confirmation) {
        (Some(u), Some(p), Some(c)) => (u, p, c),
        _ => {
            return Ok(ApiError::BadRequest(
                "username, password and confirmation are required".to_string(),
            )
            .into())
        }
    };

    if password != confirmation {
        return Ok(ApiError::PasswordMismatch.into());
    }

    let user = match create_account(store, &username, &email, &password) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let token = issue_token(store, &user.id)?;
    let mut body = serde_json::to_value(build_user_view(store, &user)?)?;
    body["token"] = serde_json::Value::String(token.clone());

    session_response(201, &token, &body)
}

pub fn login_user<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let fields = match read_fields(req) {
        Ok(f) => f,
        Err(e) => return Ok(e.into()),
    };
    let username = get_string(&fields, "username", Some("")).unwrap_or_default();
    let password = get_string(&fields, "password", Some("")).unwrap_or_default();

    let user = match authenticate(store, &username, &password) {
        Ok(u) => u,
        Err(e) => return Ok(e.into()),
    };

    let token = issue_token(store, &user.id)?;
    tracing::info!(user_id = %user.id, "logged in");

    session_response(
        200,
        &token,
        &serde_json::json!({
            "token": token,
            "user_id": user.id,
        }),
    )
}

pub fn logout_user<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    if let Some(token) = session_token(req) {
        store.delete(&token_key(&token))?;
        store.update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| {
            tokens.retain(|t| t != &token)
        })?;
    }

    Ok(Response::builder()
        .status(302)
        .header("Location", "/")
        .header("Set-Cookie", format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE))
        .body(Vec::new())
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use spin_sdk::http::Method;

    fn get_with(header: &str, value: &str) -> Request {
        Request::builder()
            .method(Method::Get)
            .uri("/following")
            .header(header, value)
            .build()
    }

    #[test]
    fn authenticate_checks_password() {
        let store = MemoryStore::new();
        let user = create_account(&store, "carol", "", "pw").unwrap();

        assert_eq!(authenticate(&store, "carol", "pw").unwrap(), user);
        assert!(matches!(authenticate(&store, "carol", "nope"), Err(ApiError::InvalidCredentials)));
        assert!(matches!(authenticate(&store, "nobody", "pw"), Err(ApiError::InvalidCredentials)));
    }

    #[test]
    fn bearer_and_cookie_resolve_the_same_user() {
        let store = MemoryStore::new();
        let user = create_account(&store, "carol", "", "pw").unwrap();
        let token = issue_token(&store, &user.id).unwrap();

        let bearer = get_with("Authorization", &format!("Bearer {}", token));
        let cookie = get_with("Cookie", &format!("theme=dark; session={}", token));

        assert_eq!(current_user(&store, &bearer).unwrap(), Some(user.clone()));
        assert_eq!(current_user(&store, &cookie).unwrap(), Some(user));
    }

    #[test]
    fn unknown_or_expired_tokens_resolve_to_nobody() {
        let store = MemoryStore::new();
        let user = create_account(&store, "carol", "", "pw").unwrap();

        let req = get_with("Authorization", "Bearer not-a-token");
        assert_eq!(current_user(&store, &req).unwrap(), None);

        let stale = TokenData {
            user_id: user.id.clone(),
            created_at: (chrono::Utc::now() - chrono::Duration::hours(1000)).to_rfc3339(),
        };
        store.set_json(&token_key("stale"), &stale).unwrap();
        let req = get_with("Authorization", "Bearer stale");
        assert_eq!(current_user(&store, &req).unwrap(), None);
    }

    #[test]
    fn issuing_a_token_prunes_expired_ones() {
        let store = MemoryStore::new();
        let user = create_account(&store, "carol", "", "pw").unwrap();
        let live = issue_token(&store, &user.id).unwrap();

        let stale = TokenData {
            user_id: user.id.clone(),
            created_at: (chrono::Utc::now() - chrono::Duration::hours(1000)).to_rfc3339(),
        };
        store.set_json(&token_key("stale"), &stale).unwrap();
        store
            .update_json(TOKENS_LIST_KEY, |tokens: &mut Vec<String>| {
                tokens.push("stale".to_string());
                tokens.push("dangling".to_string());
            })
            .unwrap();

        let fresh = issue_token(&store, &user.id).unwrap();

        let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY).unwrap().unwrap();
        assert_eq!(tokens, vec![live.clone(), fresh]);
        assert!(store.get_json::<TokenData>(&token_key("stale")).unwrap().is_none());
        assert!(store.get_json::<TokenData>(&token_key(&live)).unwrap().is_some());
    }
}
