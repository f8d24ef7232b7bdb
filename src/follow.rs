use serde::Serialize;
use spin_sdk::http::{Request, Response};

use crate::auth::current_user;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, path_id};
use crate::core::store::KvStore;
use crate::models::models::{Followers, Followings, User};
use crate::users::get_user;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowOutcome {
    pub followers: usize,
    pub followed: bool,
}

pub fn get_followings<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Followings> {
    Ok(store.get_json(&followings_key(user_id))?.unwrap_or_default())
}

pub fn get_followers<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Followers> {
    Ok(store.get_json(&followers_key(user_id))?.unwrap_or_default())
}

pub fn is_following<S: KvStore>(store: &S, follower_id: &str, target_id: &str) -> anyhow::Result<bool> {
    Ok(get_followers(store, target_id)?.iter().any(|id| id == follower_id))
}

/// Flips `viewer`'s membership in the target's followers.
///
/// Both edge lists (`followers:{target}` and `followings:{viewer}`) are
/// rewritten so either direction can be read without a scan.
pub fn toggle_follow<S: KvStore>(store: &S, viewer: &User, target_id: &str) -> Result<FollowOutcome, ApiError> {
    let target = get_user(store, target_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if target.id == viewer.id {
        return Err(ApiError::SelfFollow);
    }

    // The followers list decides the toggle; the followings side mirrors it
    let outcome = store.update_json(&followers_key(&target.id), |followers: &mut Followers| {
        let followed = if followers.contains(&viewer.id) {
            followers.retain(|id| id != &viewer.id);
            false
        } else {
            followers.push(viewer.id.clone());
            true
        };
        FollowOutcome {
            followers: followers.len(),
            followed,
        }
    })?;

    store.update_json(&followings_key(&viewer.id), |followings: &mut Followings| {
        followings.retain(|id| id != &target.id);
        if outcome.followed {
            followings.push(target.id.clone());
        }
    })?;

    tracing::info!(follower = %viewer.id, target = %target.id, followed = outcome.followed, "follow toggled");
    Ok(outcome)
}

// === HTTP Handlers ===

pub fn handle_follow<S: KvStore>(store: &S, req: &Request) -> anyhow::Result<Response> {
    let viewer = match current_user(store, req)? {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let target_id = path_id(req.path(), "/follow/");
    if target_id.is_empty() {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    match toggle_follow(store, &viewer, target_id) {
        Ok(outcome) => {
            let message = if outcome.followed {
                "User followed successfully."
            } else {
                "User unfollowed successfully."
            };
            json_response(
                201,
                &serde_json::json!({
                    "message": message,
                    "followers": outcome.followers,
                    "followed": outcome.followed,
                }),
            )
        }
        Err(e) => Ok(e.into()),
    }
}
