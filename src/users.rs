use chrono::Utc;
use spin_sdk::http::Response;
use uuid::Uuid;

use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, is_valid_email, is_valid_username, json_response, path_id, validate_uuid};
use crate::core::store::KvStore;
use crate::follow::{get_followers, get_followings};
use crate::models::models::{User, UserView};

pub fn get_user<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Option<User>> {
    if !validate_uuid(user_id) {
        return Ok(None);
    }
    store.get_json::<User>(&user_key(user_id))
}

pub fn find_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<Option<User>> {
    match store.get_json::<String>(&username_key(username))? {
        Some(id) => get_user(store, &id),
        None => Ok(None),
    }
}

/// Usernames for a list of user ids, skipping ids that no longer resolve.
pub fn usernames<S: KvStore>(store: &S, ids: &[String]) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(u) = get_user(store, id)? {
            names.push(u.username);
        }
    }
    Ok(names)
}

pub fn create_account<S: KvStore>(
    store: &S,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, ApiError> {
    if username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH || !is_valid_username(username) {
        return Err(ApiError::BadRequest(
            "Username may contain only letters, digits and @/./+/-/_ (150 max)".to_string(),
        ));
    }
    if password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }
    if !email.is_empty() && !is_valid_email(email) {
        return Err(ApiError::BadRequest("Enter a valid email address".to_string()));
    }

    // Claim the name before hashing; every other claimant gets DuplicateUsername
    let id = Uuid::new_v4().to_string();
    if !store.insert_if_absent(&username_key(username), &id)? {
        return Err(ApiError::DuplicateUsername);
    }

    let password = match hash_password(password) {
        Ok(hash) => hash,
        Err(e) => {
            store.delete(&username_key(username))?;
            return Err(e.into());
        }
    };

    let user = User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password,
        created_at: Utc::now(),
    };

    store.set_json(&user_key(&user.id), &user)?;
    store.update_json(USERS_LIST_KEY, |users: &mut Vec<String>| users.push(user.id.clone()))?;

    tracing::info!(user_id = %user.id, username = %user.username, "account created");
    Ok(user)
}

pub fn build_user_view<S: KvStore>(store: &S, user: &User) -> anyhow::Result<UserView> {
    Ok(UserView {
        id: user.id.clone(),
        username: user.username.clone(),
        followers: usernames(store, &get_followers(store, &user.id)?)?,
        following: usernames(store, &get_followings(store, &user.id)?)?,
    })
}

// === HTTP Handlers ===

pub fn get_user_details<S: KvStore>(store: &S, path: &str) -> anyhow::Result<Response> {
    let user_id = path_id(path, "/users/");

    match get_user(store, user_id)? {
        Some(user) => json_response(200, &build_user_view(store, &user)?),
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}
